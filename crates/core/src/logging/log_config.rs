use std::str::FromStr;

use crate::config::ObservabilityConfig;
use crate::errors::ApsError;

/// Minimum level passed to `EnvFilter`, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

const LEVEL_NAMES: [(LogLevel, &str); 5] = [
    (LogLevel::Trace, "trace"),
    (LogLevel::Debug, "debug"),
    (LogLevel::Info, "info"),
    (LogLevel::Warn, "warn"),
    (LogLevel::Error, "error"),
];

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        LEVEL_NAMES
            .iter()
            .find(|(level, _)| level == self)
            .map_or("info", |(_, name)| *name)
    }
}

impl FromStr for LogLevel {
    type Err = ApsError;

    /// `warning` is accepted as an alias of `warn`.
    fn from_str(level: &str) -> Result<Self, Self::Err> {
        let wanted = level.trim().to_lowercase();
        let wanted = if wanted == "warning" { "warn" } else { wanted.as_str() };

        LEVEL_NAMES
            .iter()
            .find(|(_, name)| *name == wanted)
            .map(|(level, _)| *level)
            .ok_or_else(|| ApsError::Configuration(format!("无效的日志级别: {level}")))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: LogLevel,
    /// Output format for logs
    pub format: LogFormat,
}

/// Output format for log entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Multi-line human readable output
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ApsError;

    fn from_str(format: &str) -> Result<Self, Self::Err> {
        match format.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(ApsError::Configuration(format!(
                "不支持的日志格式: {format}"
            ))),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
        }
    }
}

impl LogConfig {
    pub fn from_observability(config: &ObservabilityConfig) -> Result<Self, ApsError> {
        Ok(Self {
            level: config.log_level.parse()?,
            format: config.log_format.parse()?,
        })
    }

    /// Create configuration from `LOG_LEVEL` / `LOG_FORMAT`, ignoring unparsable values
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            if let Ok(level) = level.parse() {
                config.level = level;
            }
        }

        if let Ok(format) = std::env::var("LOG_FORMAT") {
            if let Ok(format) = format.parse() {
                config.format = format;
            }
        }

        config
    }
}
