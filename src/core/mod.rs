//! Core logger types

pub mod error;
pub mod log_event;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod options;
pub mod output_format;
pub mod overflow_policy;
pub mod properties;
pub mod redaction;
pub mod sampling;
pub mod scope;
pub mod template;
pub mod trace_context;

pub use error::{LoggerError, Result};
pub use log_event::{CallerInfo, ExceptionInfo, LogEvent};
pub use log_level::LogLevel;
pub use logger::{LogRecord, LogScope, Logger, LoggerBuilder};
pub use metrics::LoggerMetrics;
pub use options::{LogOptions, DEFAULT_SHUTDOWN_TIMEOUT};
pub use output_format::OutputFormat;
pub use overflow_policy::{LogPriority, OverflowCallback, OverflowPolicy};
pub use properties::{FieldValue, Properties};
pub use redaction::{RedactionRule, RuleMode, REDACTED_MARKER};
pub use sampling::{LogSampler, SamplerMetrics};
pub use scope::{ScopeContext, ScopeToken};
pub use template::{format_template, FormattedMessage};
pub use trace_context::{correlation_id, TraceContext, TraceGuard};
