//! # Rust Logger Pipeline
//!
//! A structured, context-aware logging pipeline: message templates with named
//! placeholders, property redaction, sampling, scope depth and correlation ids,
//! with non-blocking fan-out to multiple sinks.
//!
//! ## Features
//!
//! - **Message Templates**: `"User {UserId} logged in"` renders the message and
//!   captures `UserId` as a structured property
//! - **Redaction**: Literal or regex property-name rules replace sensitive
//!   values before they reach any sink
//! - **Non-blocking**: The calling thread never waits for sink I/O
//! - **Multiple Sinks**: Console, rotating file and in-memory sinks, or any
//!   [`Sink`](sinks::Sink) implementation
//! - **Failure Isolation**: A failing or panicking sink never affects the
//!   caller or the other sinks
//!
//! ## Example
//!
//! ```
//! use rust_logger_pipeline::prelude::*;
//! use rust_logger_pipeline::info;
//!
//! let logger = Logger::builder()
//!     .min_level(LogLevel::Info)
//!     .redact("password")
//!     .console()
//!     .build()
//!     .unwrap();
//!
//! info!(logger, "User {UserId} logged in from {IpAddress}", 42, "10.0.0.1");
//!
//! {
//!     let _scope = logger.begin_scope("checkout");
//!     logger.info("Charging {Amount}", &[19.99.into()]);
//! }
//!
//! logger.shutdown_blocking();
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        FieldValue, LogEvent, LogLevel, LogOptions, LogRecord, LogScope, Logger, LoggerBuilder,
        LoggerError, LoggerMetrics, OutputFormat, OverflowPolicy, RedactionRule, Result,
        ScopeContext, TraceContext,
    };
    pub use crate::sinks::{ConsoleSink, FileSink, FileSinkOptions, MemorySink, Sink};
}

pub use core::{
    CallerInfo, ExceptionInfo, FieldValue, LogEvent, LogLevel, LogOptions, LogPriority,
    LogRecord, LogSampler, LogScope, Logger, LoggerBuilder, LoggerError, LoggerMetrics,
    OutputFormat, OverflowCallback, OverflowPolicy, Properties, RedactionRule, Result,
    SamplerMetrics, ScopeContext, TraceContext, DEFAULT_SHUTDOWN_TIMEOUT, REDACTED_MARKER,
};
pub use sinks::{ConsoleSink, FileSink, FileSinkOptions, MemorySink, Sink};
