//! Overflow policies for bounded event dispatch
//!
//! Dispatch is fire-and-forget, but the number of events in flight towards
//! the sinks is bounded. When the bound is reached these policies decide what
//! happens to new events.

use super::log_level::LogLevel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Policy for events arriving while the dispatch bound is exhausted
///
/// Critical events (Error, Fatal) are dispatched regardless of the policy.
///
/// # Example
///
/// ```
/// use rust_logger_pipeline::OverflowPolicy;
///
/// // Default behavior: alert and drop
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::AlertAndDrop);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the new event silently; only metrics record the loss
    DropNewest,

    /// Drop the new event, warn through diagnostics and invoke the overflow
    /// callback on the first drop and every 1000th thereafter
    #[default]
    AlertAndDrop,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::AlertAndDrop => write!(f, "AlertAndDrop"),
        }
    }
}

/// Priority level for event preservation during overflow
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum LogPriority {
    /// Normal priority (Trace, Debug, Info)
    #[default]
    Normal = 0,
    /// High priority (Warn)
    High = 1,
    /// Critical priority (Error, Fatal) - never dropped
    Critical = 2,
}

impl LogPriority {
    pub fn from_level(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace | LogLevel::Debug | LogLevel::Info => LogPriority::Normal,
            LogLevel::Warn => LogPriority::High,
            LogLevel::Error | LogLevel::Fatal => LogPriority::Critical,
        }
    }
}

impl fmt::Display for LogPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogPriority::Normal => write!(f, "Normal"),
            LogPriority::High => write!(f, "High"),
            LogPriority::Critical => write!(f, "Critical"),
        }
    }
}

/// Callback type for overflow notifications
///
/// Called when events are dropped because the dispatch bound was reached.
/// The parameter is the total count of dropped events so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Whether the `count`-th drop (1-based) should raise an alert
#[inline]
pub(crate) fn should_alert(count: u64) -> bool {
    count == 1 || count.is_multiple_of(1000)
}
