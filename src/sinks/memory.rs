//! In-process capture sink
//!
//! Keeps every delivered event in memory so tests and diagnostics tools can
//! inspect exactly what the pipeline produced. Failure and latency can be
//! injected to exercise sink isolation and shutdown behaviour.

use super::Sink;
use crate::core::{LogEvent, LoggerError, OutputFormat, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    None,
    Error,
    Panic,
}

pub struct MemorySink {
    name: String,
    events: Mutex<Vec<LogEvent>>,
    fault: Fault,
    delay: Option<Duration>,
    flush_count: AtomicU64,
    closed: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::named("memory")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: Mutex::new(Vec::new()),
            fault: Fault::None,
            delay: None,
            flush_count: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Every write returns an error instead of capturing
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fault = Fault::Error;
        self
    }

    /// Every write panics
    #[must_use]
    pub fn panicking(mut self) -> Self {
        self.fault = Fault::Panic;
        self
    }

    /// Sleep for `delay` before capturing each event
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Snapshot of captured events in arrival order
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().clone()
    }

    /// Captured events rendered with `format`
    pub fn lines(&self, format: OutputFormat) -> Vec<String> {
        self.events.lock().iter().map(|e| format.format(e)).collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|e| e.message().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn flush_count(&self) -> u64 {
        self.flush_count.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn write(&self, event: &LogEvent, cancel: &CancellationToken) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if cancel.is_cancelled() {
            return Ok(());
        }
        if self.is_closed() {
            return Err(LoggerError::sink_closed(&self.name));
        }

        match self.fault {
            Fault::Error => Err(LoggerError::writer(format!(
                "injected failure in sink '{}'",
                self.name
            ))),
            Fault::Panic => panic!("injected panic in sink '{}'", self.name),
            Fault::None => {
                self.events.lock().push(event.clone());
                Ok(())
            }
        }
    }

    async fn flush(&self, cancel: &CancellationToken) -> Result<()> {
        if !cancel.is_cancelled() {
            self.flush_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
