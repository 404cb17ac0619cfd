//! Logging initialization.
//!
//! Thin wrapper over the observability crate: structured JSONL to
//! the runtime log file, level from `RUST_LOG` or the given
//! default, compact stderr mirror unless `MINIAPP_LOG_STDERR=0`.

use observability::LogConfig;
use std::path::{Path, PathBuf};

/// Initialize logging for the `notes-miniapp` binary, writing JSONL to
/// `log_file`.
///
/// ```ignore
/// init_logging("info", &paths.log_file());
/// tracing::info!("client started");
/// ```
pub fn init_logging(level: &str, log_file: &Path) {
    init_logging_for_service("notes-miniapp", level, Some(log_file.to_path_buf()));
}

/// Initialize logging with a custom service name. `None` uses the default
/// dev log path.
pub fn init_logging_for_service(service_name: &str, level: &str, log_path: Option<PathBuf>) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path,
        also_stderr: stderr_enabled(std::env::var("MINIAPP_LOG_STDERR").ok()),
    });
}

fn stderr_enabled(raw: Option<String>) -> bool {
    match raw.as_deref().map(str::trim) {
        Some("0") | Some("false") | Some("off") => false,
        _ => true,
    }
}
