//! Immutable log event structure

use super::log_level::LogLevel;
use super::properties::Properties;
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::error::Error as StdError;
use std::time::Duration;

// Thread-local cache for the thread identifier to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Get the cached thread identifier (thread name when set, otherwise its id)
pub(crate) fn current_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| {
                let thread = std::thread::current();
                match thread.name() {
                    Some(name) => name.to_string(),
                    None => format!("{:?}", thread.id()),
                }
            })
            .clone()
    })
}

/// Identifier of the tokio task the caller runs in, if any
pub(crate) fn current_task_id() -> Option<String> {
    tokio::task::try_id().map(|id| id.to_string())
}

/// Call-site location, supplied by the caller (see the crate macros)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerInfo {
    pub member: String,
    pub file: String,
    pub line: u32,
}

impl CallerInfo {
    pub fn new(member: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            member: member.into(),
            file: file.into(),
            line,
        }
    }

    /// File name without its directory components
    pub fn file_name(&self) -> &str {
        self.file
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.file.as_str())
    }
}

/// Structured error payload attached to an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    pub type_name: String,
    pub message: String,
    /// Chain of underlying causes, one per line
    pub stack_trace: Option<String>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            stack_trace: None,
        }
    }

    /// Capture an error value, its concrete type name and its source chain
    pub fn from_error<E: StdError + ?Sized>(error: &E) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        Self {
            type_name: std::any::type_name::<E>().to_string(),
            message: error.to_string(),
            stack_trace: if causes.is_empty() {
                None
            } else {
                Some(causes.join("\n"))
            },
        }
    }

    #[must_use]
    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }
}

/// One fully formatted log record ready for sink delivery
///
/// Events are built once by the pipeline and then shared behind an `Arc`
/// with every sink; there is no way to mutate one after construction.
#[derive(Debug, Clone)]
pub struct LogEvent {
    timestamp: DateTime<Utc>,
    level: LogLevel,
    message: String,
    exception: Option<ExceptionInfo>,
    caller: Option<CallerInfo>,
    correlation_id: String,
    thread_id: String,
    task_id: Option<String>,
    scope_depth: Option<usize>,
    properties: Properties,
    elapsed: Option<Duration>,
    is_slow: bool,
}

impl LogEvent {
    /// Create an event stamped with the current time and calling thread
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            exception: None,
            caller: None,
            correlation_id: String::new(),
            thread_id: current_thread_id(),
            task_id: current_task_id(),
            scope_depth: None,
            properties: Properties::new(),
            elapsed: None,
            is_slow: false,
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    #[must_use]
    pub fn with_caller(mut self, caller: CallerInfo) -> Self {
        self.caller = Some(caller);
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    #[must_use]
    pub fn with_scope_depth(mut self, depth: usize) -> Self {
        self.scope_depth = Some(depth);
        self
    }

    #[must_use]
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Attach an elapsed measurement; the slow flag is derived from `slow_threshold`
    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration, slow_threshold: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self.is_slow = elapsed >= slow_threshold;
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exception(&self) -> Option<&ExceptionInfo> {
        self.exception.as_ref()
    }

    pub fn caller(&self) -> Option<&CallerInfo> {
        self.caller.as_ref()
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn scope_depth(&self) -> Option<usize> {
        self.scope_depth
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Elapsed time in fractional milliseconds
    pub fn elapsed_ms(&self) -> Option<f64> {
        self.elapsed.map(|d| d.as_secs_f64() * 1000.0)
    }

    pub fn is_slow(&self) -> bool {
        self.is_slow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "connection reset")
        }
    }

    impl StdError for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "request failed")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_exception_from_error_captures_chain() {
        let info = ExceptionInfo::from_error(&Outer(Inner));
        assert!(info.type_name.ends_with("Outer"));
        assert_eq!(info.message, "request failed");
        assert_eq!(
            info.stack_trace.as_deref(),
            Some("caused by: connection reset")
        );
    }

    #[test]
    fn test_slow_flag_follows_threshold() {
        let threshold = Duration::from_millis(100);

        let fast = LogEvent::new(LogLevel::Info, "fast")
            .with_elapsed(Duration::from_millis(99), threshold);
        assert!(!fast.is_slow());

        let exact = LogEvent::new(LogLevel::Info, "exact")
            .with_elapsed(Duration::from_millis(100), threshold);
        assert!(exact.is_slow());
        assert_eq!(exact.elapsed_ms(), Some(100.0));
    }

    #[test]
    fn test_caller_file_name() {
        let caller = CallerInfo::new("app::handler", "src/api/handler.rs", 42);
        assert_eq!(caller.file_name(), "handler.rs");
    }

    #[test]
    fn test_thread_id_is_cached() {
        assert_eq!(current_thread_id(), current_thread_id());
        assert!(!current_thread_id().is_empty());
    }
}
