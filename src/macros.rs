//! Logging macros that capture the call site.
//!
//! Arguments are positional and matched to `{Name}` placeholders in order;
//! anything convertible into [`FieldValue`](crate::FieldValue) is accepted.
//! The level check runs first, so disabled calls never convert their
//! arguments or record caller information.
//!
//! # Examples
//!
//! ```
//! use rust_logger_pipeline::prelude::*;
//! use rust_logger_pipeline::{error, info};
//! use std::sync::Arc;
//!
//! let memory = Arc::new(MemorySink::new());
//! let logger = Logger::builder().shared_sink(memory.clone()).build().unwrap();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With template arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {Port}", port);
//!
//! // With an error attached
//! let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
//! error!(logger, err = &err, "Failed to write {File}", "data.bin");
//!
//! logger.shutdown_blocking();
//! assert_eq!(memory.len(), 3);
//! ```

/// Name of the function enclosing a macro call site
///
/// `item` is a nested fn item declared at the call site; its type name is the
/// full path through the enclosing function and any closures.
#[doc(hidden)]
pub fn enclosing_function<F>(_item: F) -> &'static str {
    let mut path = std::any::type_name::<F>();
    path = path.strip_suffix("::__here").unwrap_or(path);
    while let Some(outer) = path.strip_suffix("::{{closure}}") {
        path = outer;
    }
    path.rsplit("::").next().unwrap_or(path)
}

/// Caller information for the current call site
#[doc(hidden)]
#[macro_export]
macro_rules! __caller {
    () => {{
        fn __here() {}
        $crate::CallerInfo::new(
            $crate::macros::enclosing_function(__here),
            ::std::file!(),
            ::std::line!(),
        )
    }};
}

/// Log a message template at an explicit level.
///
/// # Examples
///
/// ```
/// # use rust_logger_pipeline::prelude::*;
/// # let logger = Logger::builder().build().unwrap();
/// use rust_logger_pipeline::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {Code}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, err = $err:expr, $template:expr $(, $arg:expr)* $(,)?) => {{
        let logger = &$logger;
        let level: $crate::LogLevel = $level;
        if logger.is_enabled(level) {
            let args: &[$crate::FieldValue] = &[$($crate::FieldValue::from($arg)),*];
            logger.log_record(
                $crate::LogRecord::new(level, $template, args)
                    .with_caller($crate::__caller!())
                    .with_exception($crate::ExceptionInfo::from_error($err)),
            );
        }
    }};
    ($logger:expr, $level:expr, $template:expr $(, $arg:expr)* $(,)?) => {{
        let logger = &$logger;
        let level: $crate::LogLevel = $level;
        if logger.is_enabled(level) {
            let args: &[$crate::FieldValue] = &[$($crate::FieldValue::from($arg)),*];
            logger.log_record(
                $crate::LogRecord::new(level, $template, args).with_caller($crate::__caller!()),
            );
        }
    }};
}

/// Log a trace-level message.
///
/// # Examples
///
/// ```
/// # use rust_logger_pipeline::prelude::*;
/// # let logger = Logger::builder().min_level(LogLevel::Trace).build().unwrap();
/// use rust_logger_pipeline::trace;
/// trace!(logger, "Entering calculate()");
/// trace!(logger, "Variable value: {Value}", 42);
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use rust_logger_pipeline::prelude::*;
/// # let logger = Logger::builder().build().unwrap();
/// use rust_logger_pipeline::debug;
/// debug!(logger, "Debug information");
/// debug!(logger, "Counter value: {Counter}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use rust_logger_pipeline::prelude::*;
/// # let logger = Logger::builder().build().unwrap();
/// use rust_logger_pipeline::info;
/// info!(logger, "Application started");
/// info!(logger, "Processing {Count} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use rust_logger_pipeline::prelude::*;
/// # let logger = Logger::builder().build().unwrap();
/// use rust_logger_pipeline::warn;
/// warn!(logger, "Low disk space");
/// warn!(logger, "Retry attempt {Attempt} of {Max}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use rust_logger_pipeline::prelude::*;
/// # let logger = Logger::builder().build().unwrap();
/// use rust_logger_pipeline::error;
/// error!(logger, "Failed to connect to database");
/// error!(logger, "Error code: {Code}, message: {Reason}", 500, "Internal error");
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message.
///
/// # Examples
///
/// ```
/// # use rust_logger_pipeline::prelude::*;
/// # let logger = Logger::builder().build().unwrap();
/// use rust_logger_pipeline::fatal;
/// fatal!(logger, "Critical system failure");
/// fatal!(logger, "Unable to recover from error: {Reason}", "disk full");
/// ```
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}
