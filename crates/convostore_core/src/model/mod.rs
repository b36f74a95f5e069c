//! Conversation document model.
//!
//! # Responsibility
//! - Define the fixed shape of a stored conversation and its message pairs.
//! - Own the mapping between domain records and the stored document format.
//!
//! # Invariants
//! - `messages` only grows through the public store contract.
//! - `updated_at >= created_at` for every valid record.

pub mod conversation;
