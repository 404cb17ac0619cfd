//! Tracing subscriber setup for the notes mini-app client.
//!
//! The binary calls [`init_with_config`] once; library crates only emit
//! `tracing` events. With the `dev` feature (default) events go to an
//! append-only JSONL file, one object per line, flushed per write, with an
//! optional compact stderr mirror. Without it a plain `fmt` subscriber
//! writes to stdout.

#[cfg(feature = "dev")]
mod dev;

mod json_layer;

pub use json_layer::LogEntry;

use std::path::PathBuf;

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Written as `service` on every line.
    pub service_name: String,
    /// Filter used when `RUST_LOG` is unset.
    pub default_level: String,
    /// JSONL destination; `~/.notes-miniapp/logs/dev.jsonl` when `None`.
    pub log_path: Option<PathBuf>,
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Install the global subscriber. Later calls in the same process are no-ops.
pub fn init_with_config(config: LogConfig) {
    #[cfg(feature = "dev")]
    {
        dev::init_dev_subscriber(&config);
    }

    #[cfg(not(feature = "dev"))]
    {
        use tracing_subscriber::util::SubscriberInitExt;
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.default_level)),
            )
            .with_target(true)
            .compact()
            .finish()
            .try_init()
            .ok();
    }
}
