//! Pipeline settings
//!
//! `LogOptions` is the plain-data half of the logger configuration; sinks are
//! attached separately through [`LoggerBuilder`](crate::LoggerBuilder). Every
//! field has a default, so a partial JSON or TOML document deserializes into
//! a complete value.

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::output_format::OutputFormat;
use super::overflow_policy::OverflowPolicy;
use super::redaction::RedactionRule;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

pub const DEFAULT_SLOW_THRESHOLD_MS: u64 = 1000;
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 4000;
pub const DEFAULT_DISPATCH_CAPACITY: usize = 10_000;

/// Default shutdown timeout for logger cleanup (5 seconds)
///
/// Bounds how long shutdown waits for in-flight dispatches before cancelling
/// them and flushing the sinks.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Read-only logger settings
///
/// # Example
///
/// ```
/// use rust_logger_pipeline::{LogLevel, LogOptions, OutputFormat};
///
/// let options = LogOptions::from_json(
///     r#"{ "minimumLevel": "debug", "outputFormat": "json", "redactionPatterns": ["password"] }"#,
/// )
/// .unwrap();
///
/// assert_eq!(options.minimum_level, LogLevel::Debug);
/// assert_eq!(options.output_format, OutputFormat::Json);
/// assert_eq!(options.sample_rate, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogOptions {
    #[serde(alias = "minimum_level", deserialize_with = "deserialize_level")]
    pub minimum_level: LogLevel,

    #[serde(alias = "output_format")]
    pub output_format: OutputFormat,

    /// Elapsed time at or above which a measurement is flagged slow
    #[serde(alias = "slow_threshold_ms")]
    pub slow_threshold_ms: u64,

    /// Admit about one event in N; 1 admits all
    #[serde(alias = "sample_rate")]
    pub sample_rate: u32,

    #[serde(alias = "max_message_length")]
    pub max_message_length: usize,

    /// Property-name patterns, classified as literal or regex on build
    #[serde(alias = "redaction_patterns")]
    pub redaction_patterns: Vec<String>,

    #[serde(alias = "include_scopes")]
    pub include_scopes: bool,

    #[serde(alias = "include_caller")]
    pub include_caller: bool,

    /// Maximum number of events in flight towards the sinks
    #[serde(alias = "dispatch_capacity")]
    pub dispatch_capacity: usize,

    #[serde(alias = "overflow_policy")]
    pub overflow_policy: OverflowPolicy,

    #[serde(alias = "shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            minimum_level: LogLevel::Info,
            output_format: OutputFormat::Text,
            slow_threshold_ms: DEFAULT_SLOW_THRESHOLD_MS,
            sample_rate: 1,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            redaction_patterns: Vec::new(),
            include_scopes: true,
            include_caller: true,
            dispatch_capacity: DEFAULT_DISPATCH_CAPACITY,
            overflow_policy: OverflowPolicy::AlertAndDrop,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT.as_millis() as u64,
        }
    }
}

impl LogOptions {
    /// Parse settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let options: LogOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reject settings the pipeline cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(LoggerError::config("sample_rate", "must be at least 1"));
        }
        if self.max_message_length == 0 {
            return Err(LoggerError::config(
                "max_message_length",
                "must be at least 1",
            ));
        }
        if self.dispatch_capacity == 0 {
            return Err(LoggerError::config(
                "dispatch_capacity",
                "must be at least 1",
            ));
        }
        if self.redaction_patterns.iter().any(String::is_empty) {
            return Err(LoggerError::config(
                "redaction_patterns",
                "patterns must not be empty",
            ));
        }
        Ok(())
    }

    pub fn slow_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_threshold_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Redaction rules in registration order
    pub fn redaction_rules(&self) -> Vec<RedactionRule> {
        self.redaction_patterns
            .iter()
            .map(|pattern| RedactionRule::auto(pattern.as_str()))
            .collect()
    }
}

fn deserialize_level<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<LogLevel, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RuleMode;

    #[test]
    fn test_defaults() {
        let options = LogOptions::default();
        assert_eq!(options.minimum_level, LogLevel::Info);
        assert_eq!(options.output_format, OutputFormat::Text);
        assert_eq!(options.slow_threshold(), Duration::from_secs(1));
        assert_eq!(options.sample_rate, 1);
        assert_eq!(options.max_message_length, 4000);
        assert!(options.include_scopes);
        assert!(options.include_caller);
        assert_eq!(options.shutdown_timeout(), DEFAULT_SHUTDOWN_TIMEOUT);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options = LogOptions::from_json(r#"{ "sample_rate": 10, "includeCaller": false }"#)
            .unwrap();
        assert_eq!(options.sample_rate, 10);
        assert!(!options.include_caller);
        assert_eq!(options.max_message_length, DEFAULT_MAX_MESSAGE_LENGTH);
    }

    #[test]
    fn test_level_parsing_is_lenient() {
        let options = LogOptions::from_json(r#"{ "minimumLevel": "Warning" }"#).unwrap();
        assert_eq!(options.minimum_level, LogLevel::Warn);

        assert!(LogOptions::from_json(r#"{ "minimumLevel": "loud" }"#).is_err());
    }

    #[test]
    fn test_validation() {
        let err = LogOptions::from_json(r#"{ "sampleRate": 0 }"#).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let options = LogOptions {
            max_message_length: 0,
            ..LogOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_redaction_rules_are_classified() {
        let options = LogOptions {
            redaction_patterns: vec!["password".into(), "^api[_-]?key$".into()],
            ..LogOptions::default()
        };
        let rules = options.redaction_rules();
        assert_eq!(rules[0].mode(), RuleMode::Literal);
        assert_eq!(rules[1].mode(), RuleMode::Regex);
    }
}
