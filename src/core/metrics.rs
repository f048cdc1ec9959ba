//! Logger metrics for observability
//!
//! Counters describing what happened to emitted events: how many were
//! dispatched, dropped because the dispatch bound was reached, or failed in a
//! sink.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use rust_logger_pipeline::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_dispatched();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.dispatched_count(), 1);
/// assert_eq!(metrics.dropped_count(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Events assembled by the pipeline (after level and sampling gates)
    emitted_count: AtomicU64,

    /// Events handed to the fan-out stage
    dispatched_count: AtomicU64,

    /// Events dropped because the in-flight dispatch bound was reached
    dropped_count: AtomicU64,

    /// Number of times the dispatch bound was hit
    capacity_exhausted_events: AtomicU64,

    /// Critical events dispatched past an exhausted bound
    critical_bypass_count: AtomicU64,

    /// Individual sink writes that failed or panicked
    sink_failures: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            emitted_count: AtomicU64::new(0),
            dispatched_count: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            capacity_exhausted_events: AtomicU64::new(0),
            critical_bypass_count: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn emitted_count(&self) -> u64 {
        self.emitted_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dispatched_count(&self) -> u64 {
        self.dispatched_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn capacity_exhausted_events(&self) -> u64 {
        self.capacity_exhausted_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn critical_bypass_count(&self) -> u64 {
        self.critical_bypass_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_emitted(&self) -> u64 {
        self.emitted_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.dispatched_count.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a dropped event, returning the previous drop count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_capacity_exhausted(&self) -> u64 {
        self.capacity_exhausted_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_critical_bypass(&self) -> u64 {
        self.critical_bypass_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_failure(&self) -> u64 {
        self.sink_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if no events have been emitted.
    pub fn drop_rate(&self) -> f64 {
        let emitted = self.emitted_count() as f64;
        if emitted == 0.0 {
            0.0
        } else {
            (self.dropped_count() as f64 / emitted) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.emitted_count.store(0, Ordering::Relaxed);
        self.dispatched_count.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
        self.capacity_exhausted_events.store(0, Ordering::Relaxed);
        self.critical_bypass_count.store(0, Ordering::Relaxed);
        self.sink_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            emitted_count: AtomicU64::new(self.emitted_count()),
            dispatched_count: AtomicU64::new(self.dispatched_count()),
            dropped_count: AtomicU64::new(self.dropped_count()),
            capacity_exhausted_events: AtomicU64::new(self.capacity_exhausted_events()),
            critical_bypass_count: AtomicU64::new(self.critical_bypass_count()),
            sink_failures: AtomicU64::new(self.sink_failures()),
        }
    }
}
