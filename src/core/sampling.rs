//! Log sampling for high-volume scenarios
//!
//! A sampler with rate `N` admits roughly one message in `N`. Each call draws
//! a fresh uniform integer in `[0, N)` and admits on zero, so the admission
//! fraction converges to `1/N` over many calls but short bursts can deviate.
//! A rate of 1 admits everything without drawing.
//!
//! # Example
//!
//! ```
//! use rust_logger_pipeline::LogSampler;
//!
//! let sampler = LogSampler::new(1);
//! assert!(sampler.should_sample());
//!
//! let sampler = LogSampler::new(10);
//! let admitted = (0..10_000).filter(|_| sampler.should_sample()).count();
//! assert!(admitted > 0 && admitted < 10_000);
//! ```

use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for sampling observability
///
/// Tracks how many logs were sampled vs dropped, allowing monitoring
/// of sampling effectiveness.
#[derive(Debug)]
pub struct SamplerMetrics {
    /// Number of logs that passed sampling
    sampled_count: AtomicU64,

    /// Number of logs dropped by sampling
    dropped_count: AtomicU64,
}

impl SamplerMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            sampled_count: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn sampled_count(&self) -> u64 {
        self.sampled_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total_count(&self) -> u64 {
        self.sampled_count() + self.dropped_count()
    }

    #[inline]
    pub(crate) fn record_sampled(&self) {
        self.sampled_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dropped(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Observed admission fraction
    ///
    /// Returns 1.0 if no logs have been processed yet.
    pub fn effective_sample_rate(&self) -> f64 {
        let total = self.total_count();
        if total == 0 {
            1.0
        } else {
            self.sampled_count() as f64 / total as f64
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.sampled_count.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
    }
}

impl Default for SamplerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SamplerMetrics {
    fn clone(&self) -> Self {
        Self {
            sampled_count: AtomicU64::new(self.sampled_count()),
            dropped_count: AtomicU64::new(self.dropped_count()),
        }
    }
}

/// One-in-N log sampler
///
/// Thread-safe: counters are atomic and the random generator is the
/// calling thread's own.
pub struct LogSampler {
    rate: u32,
    metrics: SamplerMetrics,
}

impl LogSampler {
    /// Create a sampler admitting about one in `rate` calls; 0 is treated as 1
    pub fn new(rate: u32) -> Self {
        Self {
            rate: rate.max(1),
            metrics: SamplerMetrics::new(),
        }
    }

    /// Decide whether the current call is admitted
    pub fn should_sample(&self) -> bool {
        if self.rate == 1 {
            self.metrics.record_sampled();
            return true;
        }

        let sample = rand::thread_rng().gen_range(0..self.rate) == 0;
        if sample {
            self.metrics.record_sampled();
        } else {
            self.metrics.record_dropped();
        }
        sample
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn metrics(&self) -> &SamplerMetrics {
        &self.metrics
    }

    pub fn effective_sample_rate(&self) -> f64 {
        self.metrics.effective_sample_rate()
    }
}

impl std::fmt::Debug for LogSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSampler")
            .field("rate", &self.rate)
            .field("metrics", &self.metrics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_metrics() {
        let metrics = SamplerMetrics::new();
        assert_eq!(metrics.total_count(), 0);
        assert_eq!(metrics.effective_sample_rate(), 1.0);

        metrics.record_sampled();
        metrics.record_sampled();
        metrics.record_dropped();

        assert_eq!(metrics.sampled_count(), 2);
        assert_eq!(metrics.dropped_count(), 1);
        assert_eq!(metrics.total_count(), 3);
        assert!((metrics.effective_sample_rate() - 0.666).abs() < 0.01);

        metrics.reset();
        assert_eq!(metrics.total_count(), 0);
    }

    #[test]
    fn test_rate_one_admits_everything() {
        let sampler = LogSampler::new(1);
        for _ in 0..1000 {
            assert!(sampler.should_sample());
        }
        assert_eq!(sampler.metrics().dropped_count(), 0);
    }

    #[test]
    fn test_rate_zero_is_clamped() {
        let sampler = LogSampler::new(0);
        assert_eq!(sampler.rate(), 1);
        assert!(sampler.should_sample());
    }

    #[test]
    fn test_statistical_rate() {
        let sampler = LogSampler::new(4);
        let total = 40_000;
        let sampled = (0..total).filter(|_| sampler.should_sample()).count();

        // Expected 10_000, standard deviation ~87; allow a wide margin
        let rate = sampled as f64 / total as f64;
        assert!(
            (0.22..=0.28).contains(&rate),
            "Expected ~25% admission, got {:.2}%",
            rate * 100.0
        );
        assert_eq!(sampler.metrics().total_count(), total as u64);
    }

    #[test]
    fn test_sampler_debug() {
        let sampler = LogSampler::new(5);
        let debug_str = format!("{:?}", sampler);
        assert!(debug_str.contains("LogSampler"));
        assert!(debug_str.contains("rate"));
    }
}
