//! Logging utilities
//!
//! Tracing subscriber setup and log level selection.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Debug when verbose, otherwise the given level
    pub fn or_verbose(self, verbose: bool) -> Self {
        if verbose {
            LogLevel::Debug
        } else {
            self
        }
    }

    fn directive(self) -> String {
        format!("galen_runner={}", self.to_tracing_level())
    }
}

/// Initialize the logger; `RUST_LOG` wins over `level` when set.
/// Logs go to stderr so stdout carries only the report.
pub fn init_logger(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("info"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("unknown"), None);
    }

    #[test]
    fn test_verbose_override() {
        assert_eq!(LogLevel::Info.or_verbose(true), LogLevel::Debug);
        assert_eq!(LogLevel::Warn.or_verbose(false), LogLevel::Warn);
        assert_eq!(LogLevel::Info.directive(), "galen_runner=INFO");
    }
}
