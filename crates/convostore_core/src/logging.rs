//! Process-wide logging bootstrap.
//!
//! # Responsibility
//! - Initialize the `log` backend exactly once per process, either to stderr
//!   or to size-rotated files in a directory.
//! - Capture panics as sanitized log events.
//!
//! # Invariants
//! - Logging init is idempotent for the same level and target.
//! - Re-initialization with a different level or target is rejected.
//! - Logging initialization must not panic.
//! - Store events carry ids and counts only, never message text.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const LOG_FILE_BASENAME: &str = "convostore";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static ACTIVE_LOGGER: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

/// Where log records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Absolute directory holding rotated `convostore*.log` files.
    Directory(PathBuf),
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stderr => write!(f, "stderr"),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

struct ActiveLogger {
    level: &'static str,
    target: LogTarget,
    _handle: LoggerHandle,
}

/// Initializes logging with `level` (`trace|debug|info|warn|error`).
///
/// # Errors
/// - Returns an error when `level` is unsupported.
/// - Returns an error when a directory target is relative or cannot be
///   created.
/// - Returns an error when logging is already active with another level or
///   target.
pub fn init_logging(level: &str, target: LogTarget) -> Result<(), String> {
    let level = normalize_level(level)?;
    let target = normalize_target(target)?;

    let active = ACTIVE_LOGGER.get_or_try_init(|| start_logger(level, target.clone()))?;
    if active.target != target {
        return Err(format!(
            "logging already initialized to `{}`; refusing to switch to `{}`",
            active.target, target
        ));
    }
    if active.level != level {
        return Err(format!(
            "logging already initialized with level `{}`; refusing to switch to `{}`",
            active.level, level
        ));
    }
    Ok(())
}

/// Returns `(level, target)` of the active logger, or `None` before init.
pub fn logging_status() -> Option<(&'static str, LogTarget)> {
    ACTIVE_LOGGER
        .get()
        .map(|active| (active.level, active.target.clone()))
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(level: &'static str, target: LogTarget) -> Result<ActiveLogger, String> {
    let logger =
        Logger::try_with_str(level).map_err(|err| format!("invalid log level `{level}`: {err}"))?;

    let handle = match &target {
        LogTarget::Stderr => logger
            .format(flexi_logger::detailed_format)
            .start()
            .map_err(|err| format!("failed to start logger: {err}"))?,
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| {
                format!("failed to create log directory `{}`: {err}", dir.display())
            })?;
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir.as_path())
                        .basename(LOG_FILE_BASENAME),
                )
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
                .start()
                .map_err(|err| format!("failed to start logger: {err}"))?
        }
    };

    install_panic_hook_once();
    info!(
        "event=logging_init module=logging status=ok level={} target={} version={}",
        level,
        target,
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        level,
        target,
        _handle: handle,
    })
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn normalize_target(target: LogTarget) -> Result<LogTarget, String> {
    match target {
        LogTarget::Stderr => Ok(LogTarget::Stderr),
        LogTarget::Directory(dir) => {
            if dir.as_os_str().is_empty() {
                return Err("log directory cannot be empty".to_string());
            }
            if !dir.is_absolute() {
                return Err(format!(
                    "log directory must be an absolute path, got `{}`",
                    dir.display()
                ));
            }
            Ok(LogTarget::Directory(dir))
        }
    }
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.set(()).is_err() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            "event=panic_captured module=logging status=error location={} payload={}",
            location,
            panic_payload_summary(panic_info)
        );
        previous_hook(panic_info);
    }));
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

/// Flattens newlines and caps the length of free text before logging it.
fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}
