//! Structured logging foundation.
//!
//! Dual-mode output on stderr: human-readable console lines for
//! interactive use, JSON lines for service deployments. stdout stays
//! reserved for the action stream so `lsa analyze` output can be piped.
//!
//! Respects `LSA_LOG` / `RUST_LOG` for the filter and `LSA_LOG_FORMAT`
//! (`human` or `json`) for the format.

use std::io::IsTerminal;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl LogFormat {
    /// Parse from a config/env value; unknown values fall back to human.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            _ => LogFormat::Human,
        }
    }
}

/// Logging configuration resolved from the environment.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Default filter directive when no env filter is set.
    pub default_filter: Option<String>,
}

impl LogConfig {
    pub fn from_env() -> Self {
        let format = std::env::var("LSA_LOG_FORMAT")
            .map(|v| LogFormat::from_str_lossy(&v))
            .unwrap_or_default();
        Self {
            format,
            default_filter: None,
        }
    }
}

/// Initialize the logging subsystem. Call once at startup.
pub fn init_logging(config: &LogConfig) {
    let default_filter = config.default_filter.as_deref().unwrap_or("lsa_core=info");
    let filter = EnvFilter::try_from_env("LSA_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
        LogFormat::Json => {
            let json_layer = fmt::layer().with_writer(std::io::stderr).json();
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .init();
        }
    }
}
