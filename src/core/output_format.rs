//! Output format configuration for log events
//!
//! Provides the two line formats understood by every sink:
//! - Text: Human-readable format (default)
//! - Json: Machine-readable JSON object, one per line

use super::log_event::{CallerInfo, ExceptionInfo, LogEvent};
use super::properties::Properties;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};
use std::str::FromStr;

/// Output format for log events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format (default)
    ///
    /// Example: `[10:30:45.123] [INF] [corr:0e0e4736] [handle@api.rs:42] Request processed | Props: Id=7`
    #[default]
    Text,

    /// JSON format for machine processing
    ///
    /// Example: `{"timestamp":"2025-01-08T10:30:45.123Z","level":"INFO","message":"Request processed",...}`
    Json,
}

impl OutputFormat {
    /// Render `event` as a single line without a trailing newline
    pub fn format(&self, event: &LogEvent) -> String {
        match self {
            OutputFormat::Text => format_text(event),
            OutputFormat::Json => format_json(event),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: '{}'", s)),
        }
    }
}

/// Escape line breaks and tabs so one event always occupies one line
///
/// Prevents log injection through user-supplied message content.
fn sanitize(text: &str) -> std::borrow::Cow<'_, str> {
    if !text.contains(['\n', '\r', '\t']) {
        return std::borrow::Cow::Borrowed(text);
    }
    std::borrow::Cow::Owned(
        text.replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t"),
    )
}

fn format_text(event: &LogEvent) -> String {
    let mut line = String::with_capacity(64 + event.message().len());

    // Writing into a String cannot fail
    let _ = write!(
        line,
        "[{}] [{}] [corr:{}]",
        event.timestamp().format("%H:%M:%S%.3f"),
        event.level().short_str(),
        event.correlation_id()
    );

    if let Some(caller) = event.caller() {
        let _ = write!(
            line,
            " [{}@{}:{}]",
            caller.member,
            caller.file_name(),
            caller.line
        );
    }

    line.push(' ');
    line.push_str(&sanitize(event.message()));

    if !event.properties().is_empty() {
        line.push_str(" | Props: ");
        line.push_str(&sanitize(&event.properties().format_fields()));
    }

    if let Some(elapsed_ms) = event.elapsed_ms() {
        let _ = write!(line, " | Elapsed: {:.2}ms", elapsed_ms);
        if event.is_slow() {
            line.push_str(" [SLOW]");
        }
    }

    if let Some(exception) = event.exception() {
        let _ = write!(
            line,
            " | Exception: {}: {}",
            exception.type_name,
            sanitize(&exception.message)
        );
    }

    line
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonLine<'a> {
    timestamp: String,
    level: &'static str,
    message: &'a str,
    correlation_id: &'a str,
    thread_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope_depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caller: Option<JsonCaller<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_slow: Option<bool>,
    #[serde(skip_serializing_if = "Properties::is_empty")]
    properties: &'a Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<JsonException<'a>>,
}

#[derive(Serialize)]
struct JsonCaller<'a> {
    member: &'a str,
    file: &'a str,
    line: u32,
}

impl<'a> From<&'a CallerInfo> for JsonCaller<'a> {
    fn from(caller: &'a CallerInfo) -> Self {
        Self {
            member: &caller.member,
            file: caller.file_name(),
            line: caller.line,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonException<'a> {
    #[serde(rename = "type")]
    type_name: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack_trace: Option<&'a str>,
}

impl<'a> From<&'a ExceptionInfo> for JsonException<'a> {
    fn from(exception: &'a ExceptionInfo) -> Self {
        Self {
            type_name: &exception.type_name,
            message: &exception.message,
            stack_trace: exception.stack_trace.as_deref(),
        }
    }
}

fn format_json(event: &LogEvent) -> String {
    let elapsed_ms = event.elapsed_ms();
    let line = JsonLine {
        timestamp: event
            .timestamp()
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        level: event.level().to_str(),
        message: event.message(),
        correlation_id: event.correlation_id(),
        thread_id: event.thread_id(),
        task_id: event.task_id(),
        scope_depth: event.scope_depth(),
        caller: event.caller().map(JsonCaller::from),
        elapsed_ms,
        is_slow: elapsed_ms.map(|_| event.is_slow()),
        properties: event.properties(),
        exception: event.exception().map(JsonException::from),
    };

    serde_json::to_string(&line).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogLevel, REDACTED_MARKER};
    use chrono::TimeZone;
    use std::time::Duration;

    fn fixed_event() -> LogEvent {
        let ts = chrono::Utc
            .with_ymd_and_hms(2025, 1, 8, 10, 30, 45)
            .unwrap()
            + chrono::Duration::milliseconds(123);
        LogEvent::new(LogLevel::Info, "Request processed")
            .with_timestamp(ts)
            .with_correlation_id("0e0e4736")
    }

    #[test]
    fn test_text_format_minimal() {
        let line = OutputFormat::Text.format(&fixed_event());
        assert_eq!(line, "[10:30:45.123] [INF] [corr:0e0e4736] Request processed");
    }

    #[test]
    fn test_text_format_full() {
        let event = fixed_event()
            .with_caller(CallerInfo::new("handle", "src/api/handler.rs", 42))
            .with_properties(Properties::new().with("UserId", 7).with("Path", "/users"))
            .with_elapsed(Duration::from_micros(1_500_250), Duration::from_secs(1))
            .with_exception(ExceptionInfo::new("io::Error", "disk full"));

        let line = OutputFormat::Text.format(&event);
        assert_eq!(
            line,
            "[10:30:45.123] [INF] [corr:0e0e4736] [handle@handler.rs:42] Request processed \
             | Props: UserId=7 Path=/users | Elapsed: 1500.25ms [SLOW] \
             | Exception: io::Error: disk full"
        );
    }

    #[test]
    fn test_text_format_escapes_line_breaks() {
        let event = LogEvent::new(LogLevel::Warn, "first\nFAKE ENTRY\r\tx");
        let line = OutputFormat::Text.format(&event);
        assert!(!line.contains('\n'));
        assert!(line.contains("first\\nFAKE ENTRY\\r\\tx"));
        // The event itself keeps the original text
        assert_eq!(event.message(), "first\nFAKE ENTRY\r\tx");
    }

    #[test]
    fn test_json_format_minimal() {
        let line = OutputFormat::Json.format(&fixed_event());
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(parsed["timestamp"], "2025-01-08T10:30:45.123Z");
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(parsed["message"], "Request processed");
        assert_eq!(parsed["correlationId"], "0e0e4736");
        assert!(parsed["threadId"].is_string());
        assert!(parsed.get("elapsedMs").is_none());
        assert!(parsed.get("isSlow").is_none());
        assert!(parsed.get("properties").is_none());
        assert!(parsed.get("exception").is_none());
    }

    #[test]
    fn test_json_format_full() {
        let event = fixed_event()
            .with_scope_depth(2)
            .with_caller(CallerInfo::new("handle", "src/api/handler.rs", 42))
            .with_properties(
                Properties::new()
                    .with("Zeta", 1)
                    .with("Alpha", "a")
                    .with("Password", REDACTED_MARKER),
            )
            .with_elapsed(Duration::from_millis(20), Duration::from_secs(1))
            .with_exception(
                ExceptionInfo::new("io::Error", "disk full").with_stack_trace("caused by: x"),
            );

        let line = OutputFormat::Json.format(&event);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(parsed["scopeDepth"], 2);
        assert_eq!(parsed["caller"]["member"], "handle");
        assert_eq!(parsed["caller"]["file"], "handler.rs");
        assert_eq!(parsed["caller"]["line"], 42);
        assert_eq!(parsed["elapsedMs"], 20.0);
        assert_eq!(parsed["isSlow"], false);
        assert_eq!(parsed["properties"]["Password"], REDACTED_MARKER);
        assert_eq!(parsed["exception"]["type"], "io::Error");
        assert_eq!(parsed["exception"]["stackTrace"], "caused by: x");

        // Properties keep insertion order
        let zeta = line.find("\"Zeta\"").unwrap();
        let alpha = line.find("\"Alpha\"").unwrap();
        assert!(zeta < alpha);
    }

    #[test]
    fn test_json_format_escapes_control_characters() {
        let event = LogEvent::new(LogLevel::Info, "line1\nline2 \"quoted\"");
        let line = OutputFormat::Json.format(&event);
        assert!(!line.contains('\n'));

        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["message"], "line1\nline2 \"quoted\"");
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("logfmt".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
