//! Main logger implementation
//!
//! Every accepted call is turned into an immutable [`LogEvent`] on the
//! caller's thread and then handed to a tracked background task that writes
//! it to every sink concurrently. The caller never waits for a sink.

use super::{
    error::{LoggerError, Result},
    log_event::{CallerInfo, ExceptionInfo, LogEvent},
    log_level::LogLevel,
    metrics::LoggerMetrics,
    options::LogOptions,
    output_format::OutputFormat,
    overflow_policy::{should_alert, LogPriority, OverflowCallback, OverflowPolicy},
    properties::{FieldValue, Properties},
    redaction::{matches_any, RedactionRule, REDACTED_MARKER},
    sampling::{LogSampler, SamplerMetrics},
    scope::{ScopeContext, ScopeToken},
    template::format_template,
    trace_context,
};
use crate::sinks::{ConsoleSink, FileSink, FileSinkOptions, Sink};
use std::error::Error as StdError;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

const SCOPE_STARTED: &str = "scope started";
const SCOPE_COMPLETED: &str = "scope completed";
const SCOPE_NAME_PROPERTY: &str = "ScopeName";
const DISPATCH_WORKER_THREADS: usize = 2;

/// One log call as supplied by the call site
///
/// The logging macros build these so that caller information is captured
/// only for calls that pass the level check.
#[derive(Debug, Clone)]
pub struct LogRecord<'a> {
    level: LogLevel,
    template: &'a str,
    args: &'a [FieldValue],
    caller: Option<CallerInfo>,
    exception: Option<ExceptionInfo>,
    elapsed: Option<Duration>,
    properties: Properties,
}

impl<'a> LogRecord<'a> {
    pub fn new(level: LogLevel, template: &'a str, args: &'a [FieldValue]) -> Self {
        Self {
            level,
            template,
            args,
            caller: None,
            exception: None,
            elapsed: None,
            properties: Properties::new(),
        }
    }

    #[must_use]
    pub fn with_caller(mut self, caller: CallerInfo) -> Self {
        self.caller = Some(caller);
        self
    }

    #[must_use]
    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    /// Attach a property not named by the template; template placeholders
    /// win on a key clash
    #[must_use]
    pub fn with_property(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.properties.insert(key, value);
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }
}

/// State shared between the logger and its dispatch tasks
struct Inner {
    options: LogOptions,
    rules: Vec<RedactionRule>,
    sinks: Vec<Arc<dyn Sink>>,
    sampler: LogSampler,
    metrics: LoggerMetrics,
    on_overflow: Option<OverflowCallback>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    in_flight: AtomicUsize,
    idle: Notify,
    cancel: CancellationToken,
    shut_down: AtomicBool,
    handle: Handle,
}

/// Counts one dispatch task as in flight until it completes or is dropped
struct DispatchGuard(Arc<Inner>);

impl DispatchGuard {
    fn new(inner: Arc<Inner>) -> Self {
        inner.in_flight.fetch_add(1, Ordering::AcqRel);
        Self(inner)
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl Inner {
    /// Resolve once no dispatch task is in flight
    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before the check
            notified.as_mut().enable();
            if self.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Write `event` to every sink concurrently, isolating failures
    async fn fan_out(self: Arc<Self>, event: Arc<LogEvent>) {
        let writes: Vec<_> = self
            .sinks
            .iter()
            .map(|sink| {
                let sink = Arc::clone(sink);
                let event = Arc::clone(&event);
                let cancel = self.cancel.clone();
                tokio::spawn(async move { sink.write(&event, &cancel).await })
            })
            .collect();

        for (idx, write) in writes.into_iter().enumerate() {
            let sink = self.sinks[idx].name();
            match write.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.metrics.record_sink_failure();
                    tracing::warn!(sink, error = %e, "log sink write failed");
                }
                Err(join_error) => {
                    self.metrics.record_sink_failure();
                    let reason = if join_error.is_panic() {
                        panic_message(join_error.into_panic())
                    } else {
                        "cancelled".to_string()
                    };
                    tracing::error!(
                        sink,
                        reason = %reason,
                        "log sink panicked; other sinks continue to function"
                    );
                }
            }
        }
    }

    fn handle_overflow(&self) {
        let dropped = self.metrics.record_dropped() + 1;

        match self.options.overflow_policy {
            OverflowPolicy::DropNewest => {
                // Silently drop but track metrics
            }
            OverflowPolicy::AlertAndDrop => {
                if should_alert(dropped) {
                    tracing::warn!(
                        dropped,
                        capacity = self.options.dispatch_capacity,
                        "log dispatch capacity exhausted, dropping events; \
                         consider increasing dispatch capacity"
                    );
                    if let Some(ref callback) = self.on_overflow {
                        callback(dropped);
                    }
                }
            }
        }
    }

    /// Drain in-flight dispatches, then flush and close every sink
    ///
    /// Returns `false` when the drain timed out and pending writes were
    /// cancelled. Per-sink errors are reported and discarded.
    async fn finish(self: Arc<Self>) -> bool {
        self.tracker.close();

        let timeout = self.options.shutdown_timeout();
        let drained = tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok();
        if !drained {
            tracing::warn!(
                ?timeout,
                pending = self.tracker.len(),
                "log dispatch did not drain within timeout; cancelling pending writes"
            );
            self.cancel.cancel();
        }

        let closing: Vec<_> = self
            .sinks
            .iter()
            .map(|sink| {
                let sink = Arc::clone(sink);
                tokio::spawn(async move {
                    let flush = sink.flush(&CancellationToken::new()).await;
                    let close = sink.close().await;
                    flush.and(close)
                })
            })
            .collect();

        for (idx, task) in closing.into_iter().enumerate() {
            let sink = self.sinks[idx].name();
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(sink, error = %e, "log sink failed to close cleanly"),
                Err(e) => tracing::error!(sink, error = %e, "log sink panicked while closing"),
            }
        }

        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            tracing::warn!(
                dropped,
                drop_rate = self.metrics.drop_rate(),
                "logger shut down with dropped events"
            );
        }

        drained
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Structured logging pipeline
///
/// # Example
///
/// ```
/// use rust_logger_pipeline::prelude::*;
/// use std::sync::Arc;
///
/// let memory = Arc::new(MemorySink::new());
/// let logger = Logger::builder()
///     .min_level(LogLevel::Debug)
///     .redact("password")
///     .shared_sink(memory.clone())
///     .build()
///     .unwrap();
///
/// logger.info("Login attempt: {Username} with {Password}", &["john.doe".into(), "secret123".into()]);
/// logger.shutdown_blocking();
///
/// assert_eq!(memory.messages(), vec!["Login attempt: john.doe with ***REDACTED***"]);
/// ```
pub struct Logger {
    inner: Arc<Inner>,
    /// Present when the logger was built outside any tokio runtime
    runtime: Option<Runtime>,
}

impl Logger {
    /// Create a builder for Logger
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Whether events at `level` pass the minimum level
    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.inner.options.minimum_level
    }

    #[inline]
    pub fn log(&self, level: LogLevel, template: &str, args: &[FieldValue]) {
        if self.is_enabled(level) {
            self.log_record(LogRecord::new(level, template, args));
        }
    }

    /// Log with an error attached as the event's exception payload
    pub fn log_error<E: StdError + ?Sized>(
        &self,
        level: LogLevel,
        error: &E,
        template: &str,
        args: &[FieldValue],
    ) {
        if self.is_enabled(level) {
            self.log_record(
                LogRecord::new(level, template, args).with_exception(ExceptionInfo::from_error(error)),
            );
        }
    }

    /// Log a timing measurement; the event is flagged slow at or above the
    /// configured threshold
    pub fn log_elapsed(&self, level: LogLevel, elapsed: Duration, template: &str, args: &[FieldValue]) {
        if self.is_enabled(level) {
            self.log_record(LogRecord::new(level, template, args).with_elapsed(elapsed));
        }
    }

    /// Run the full pipeline for one call
    ///
    /// Never blocks on sink I/O and never fails; problems are counted in
    /// [`metrics`](Self::metrics).
    pub fn log_record(&self, record: LogRecord<'_>) {
        let inner = &self.inner;
        if inner.shut_down.load(Ordering::Acquire) {
            return;
        }
        if !self.is_enabled(record.level) {
            return;
        }
        if !inner.sampler.should_sample() {
            return;
        }

        let correlation_id = trace_context::correlation_id();
        let formatted = format_template(
            record.template,
            record.args,
            &inner.rules,
            inner.options.max_message_length,
        );

        let mut properties = formatted.properties;
        for (key, value) in record.properties.iter() {
            if properties.contains_key(key) {
                continue;
            }
            if matches_any(&inner.rules, key) {
                properties.insert(key, REDACTED_MARKER);
            } else {
                properties.insert(key, value.clone());
            }
        }

        let mut event = LogEvent::new(record.level, formatted.message)
            .with_correlation_id(correlation_id)
            .with_properties(properties);

        if inner.options.include_caller {
            if let Some(caller) = record.caller {
                event = event.with_caller(caller);
            }
        }
        if inner.options.include_scopes {
            event = event.with_scope_depth(ScopeContext::current_depth());
        }
        if let Some(exception) = record.exception {
            event = event.with_exception(exception);
        }
        if let Some(elapsed) = record.elapsed {
            event = event.with_elapsed(elapsed, inner.options.slow_threshold());
        }

        inner.metrics.record_emitted();
        self.dispatch(event);
    }

    fn dispatch(&self, event: LogEvent) {
        let inner = &self.inner;
        if inner.sinks.is_empty() {
            return;
        }

        let permit: Option<OwnedSemaphorePermit> =
            match Arc::clone(&inner.permits).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    inner.metrics.record_capacity_exhausted();
                    // Critical events (Error, Fatal) are never dropped
                    if event.level().priority() == LogPriority::Critical {
                        inner.metrics.record_critical_bypass();
                        None
                    } else {
                        inner.handle_overflow();
                        return;
                    }
                }
            };

        inner.metrics.record_dispatched();
        let event = Arc::new(event);
        let guard = DispatchGuard::new(Arc::clone(inner));
        inner.tracker.spawn_on(
            async move {
                let _permit = permit;
                Arc::clone(&guard.0).fan_out(event).await;
            },
            &inner.handle,
        );
    }

    #[inline]
    pub fn trace(&self, template: &str, args: &[FieldValue]) {
        self.log(LogLevel::Trace, template, args);
    }

    #[inline]
    pub fn debug(&self, template: &str, args: &[FieldValue]) {
        self.log(LogLevel::Debug, template, args);
    }

    #[inline]
    pub fn info(&self, template: &str, args: &[FieldValue]) {
        self.log(LogLevel::Info, template, args);
    }

    #[inline]
    pub fn warn(&self, template: &str, args: &[FieldValue]) {
        self.log(LogLevel::Warn, template, args);
    }

    #[inline]
    pub fn error(&self, template: &str, args: &[FieldValue]) {
        self.log(LogLevel::Error, template, args);
    }

    #[inline]
    pub fn fatal(&self, template: &str, args: &[FieldValue]) {
        self.log(LogLevel::Fatal, template, args);
    }

    /// Open a scope on the current call chain
    ///
    /// Emits a Debug "scope started" event now and a "scope completed" event
    /// carrying the elapsed time when the guard drops, including during
    /// unwinding. Both carry the name in the `ScopeName` property. The depth
    /// belongs to the current task (or thread outside a runtime), so a guard
    /// held across `.await` is never seen by sibling tasks.
    pub fn begin_scope(&self, name: impl Into<String>) -> LogScope<'_> {
        let name = name.into();
        let token = ScopeContext::enter();
        if self.is_enabled(LogLevel::Debug) {
            self.log_record(
                LogRecord::new(LogLevel::Debug, SCOPE_STARTED, &[])
                    .with_property(SCOPE_NAME_PROPERTY, name.as_str()),
            );
        }
        LogScope {
            logger: self,
            name,
            started: Instant::now(),
            token: Some(token),
        }
    }

    /// Run `future` in its own forked chain inside a named scope
    pub async fn scoped<F: Future>(&self, name: impl Into<String>, future: F) -> F::Output {
        let name = name.into();
        ScopeContext::fork(async move {
            let _scope = self.begin_scope(name);
            future.await
        })
        .await
    }

    /// Get the logger metrics for detailed observability
    ///
    /// # Example
    ///
    /// ```
    /// use rust_logger_pipeline::Logger;
    ///
    /// let logger = Logger::builder().build().unwrap();
    ///
    /// // After logging operations...
    /// let metrics = logger.metrics();
    /// println!("Dropped: {}", metrics.dropped_count());
    /// println!("Sink failures: {}", metrics.sink_failures());
    /// println!("Drop rate: {:.2}%", metrics.drop_rate());
    /// ```
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.inner.metrics
    }

    pub fn sampler_metrics(&self) -> &SamplerMetrics {
        self.inner.sampler.metrics()
    }

    pub fn options(&self) -> &LogOptions {
        &self.inner.options
    }

    pub fn redaction_rules(&self) -> &[RedactionRule] {
        &self.inner.rules
    }

    pub fn sink_count(&self) -> usize {
        self.inner.sinks.len()
    }

    /// Number of dispatches currently in flight
    pub fn pending(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }

    /// Wait for in-flight dispatches, then flush every sink
    ///
    /// Waits at most the configured shutdown timeout for dispatches. Returns
    /// the first sink error, if any; every sink is flushed regardless.
    pub async fn flush(&self) -> Result<()> {
        let inner = &self.inner;
        let timeout = inner.options.shutdown_timeout();
        let drained = tokio::time::timeout(timeout, inner.wait_idle())
            .await
            .is_ok();

        let cancel = CancellationToken::new();
        let mut first_error = None;
        for sink in &inner.sinks {
            if let Err(e) = sink.flush(&cancel).await {
                tracing::warn!(sink = sink.name(), error = %e, "log sink flush failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None if !drained => Err(LoggerError::other(format!(
                "timed out after {:?} waiting for in-flight log events",
                timeout
            ))),
            None => Ok(()),
        }
    }

    /// Blocking variant of [`flush`](Self::flush) for code outside any runtime
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::RuntimeUnavailable`] when called from inside a
    /// tokio runtime; use `flush().await` there.
    pub fn flush_blocking(&self) -> Result<()> {
        if Handle::try_current().is_ok() {
            return Err(LoggerError::RuntimeUnavailable(
                "flush_blocking called from within a tokio runtime".to_string(),
            ));
        }
        match &self.runtime {
            Some(runtime) => runtime.block_on(self.flush()),
            None => self.inner.handle.block_on(self.flush()),
        }
    }

    /// Gracefully shut the logger down
    ///
    /// Stops accepting events, waits up to the configured timeout (default
    /// [`DEFAULT_SHUTDOWN_TIMEOUT`](super::options::DEFAULT_SHUTDOWN_TIMEOUT))
    /// for in-flight dispatches, then flushes and closes every sink. Sink
    /// errors are reported and swallowed.
    ///
    /// # Returns
    ///
    /// `true` if every dispatch completed within the timeout, `false` if
    /// pending writes had to be cancelled
    pub async fn shutdown(&self) -> bool {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return true;
        }
        Arc::clone(&self.inner).finish().await
    }

    /// Shut down from synchronous code
    ///
    /// Inside a current-thread runtime blocking would deadlock the dispatch
    /// tasks, so the shutdown is started in the background and `false` is
    /// returned immediately.
    pub fn shutdown_blocking(&self) -> bool {
        if self.is_shut_down() {
            return true;
        }

        match (&self.runtime, Handle::try_current().ok()) {
            (Some(runtime), None) => runtime.block_on(self.shutdown()),
            (Some(_), Some(_)) => {
                // Owned runtime, but we are inside another one: drive the
                // shutdown on the owned runtime from a helper thread
                self.inner.shut_down.store(true, Ordering::Release);
                let inner = Arc::clone(&self.inner);
                let handle = inner.handle.clone();
                std::thread::Builder::new()
                    .name("logger-shutdown".to_string())
                    .spawn(move || handle.block_on(inner.finish()))
                    .ok()
                    .and_then(|worker| worker.join().ok())
                    .unwrap_or(false)
            }
            (None, Some(current)) if current.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| current.block_on(self.shutdown()))
            }
            (None, Some(_)) => {
                self.inner.shut_down.store(true, Ordering::Release);
                let inner = Arc::clone(&self.inner);
                inner.handle.clone().spawn(inner.finish());
                false
            }
            (None, None) => self.inner.handle.block_on(self.shutdown()),
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.shutdown_blocking();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("options", &self.inner.options)
            .field("sinks", &self.inner.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("owns_runtime", &self.runtime.is_some())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// RAII guard for a named scope, see [`Logger::begin_scope`]
#[must_use = "the scope ends as soon as the guard is dropped"]
pub struct LogScope<'a> {
    logger: &'a Logger,
    name: String,
    started: Instant,
    token: Option<ScopeToken>,
}

impl LogScope<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for LogScope<'_> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        let level = if elapsed >= self.logger.options().slow_threshold() {
            LogLevel::Warn
        } else {
            LogLevel::Debug
        };

        if self.logger.is_enabled(level) {
            self.logger.log_record(
                LogRecord::new(level, SCOPE_COMPLETED, &[])
                    .with_elapsed(elapsed)
                    .with_property(SCOPE_NAME_PROPERTY, self.name.as_str()),
            );
        }

        if let Some(token) = self.token.take() {
            ScopeContext::exit(token);
        }
    }
}

enum SinkSpec {
    Shared(Arc<dyn Sink>),
    Console,
    File(PathBuf),
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use rust_logger_pipeline::prelude::*;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let logger = Logger::builder()
///     .min_level(LogLevel::Debug)
///     .output_format(OutputFormat::Json)
///     .slow_threshold(Duration::from_millis(250))
///     .redact("password")
///     .redact(r"^api[_-]?key$")
///     .sink(MemorySink::new())
///     .dispatch_capacity(1000)
///     .overflow_policy(OverflowPolicy::AlertAndDrop)
///     .on_overflow(Arc::new(|count| {
///         eprintln!("ALERT: {} log events dropped", count);
///     }))
///     .build()
///     .unwrap();
/// # logger.shutdown_blocking();
/// ```
pub struct LoggerBuilder {
    options: LogOptions,
    rules: Vec<RedactionRule>,
    sinks: Vec<SinkSpec>,
    on_overflow: Option<OverflowCallback>,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            options: LogOptions::default(),
            rules: Vec::new(),
            sinks: Vec::new(),
            on_overflow: None,
        }
    }

    /// Replace all settings at once, e.g. with deserialized options
    #[must_use = "builder methods return a new value"]
    pub fn options(mut self, options: LogOptions) -> Self {
        self.options = options;
        self
    }

    /// Set minimum log level
    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.options.minimum_level = level;
        self
    }

    /// Line format used by sinks added through [`console`](Self::console)
    /// and [`file`](Self::file)
    #[must_use = "builder methods return a new value"]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.options.output_format = format;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.options.slow_threshold_ms = threshold.as_millis() as u64;
        self
    }

    /// Admit about one event in `rate`
    #[must_use = "builder methods return a new value"]
    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.options.sample_rate = rate;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_message_length(mut self, length: usize) -> Self {
        self.options.max_message_length = length;
        self
    }

    /// Append a redaction pattern, classified as literal or regex
    ///
    /// Rules from [`options`](Self::options) come first, then these in call
    /// order.
    #[must_use = "builder methods return a new value"]
    pub fn redact(mut self, pattern: impl Into<String>) -> Self {
        self.rules.push(RedactionRule::auto(pattern));
        self
    }

    /// Append an explicit redaction rule
    #[must_use = "builder methods return a new value"]
    pub fn redact_rule(mut self, rule: RedactionRule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn include_scopes(mut self, include: bool) -> Self {
        self.options.include_scopes = include;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn include_caller(mut self, include: bool) -> Self {
        self.options.include_caller = include;
        self
    }

    /// Maximum number of non-critical events in flight towards the sinks
    #[must_use = "builder methods return a new value"]
    pub fn dispatch_capacity(mut self, capacity: usize) -> Self {
        self.options.dispatch_capacity = capacity;
        self
    }

    /// Set the overflow policy for an exhausted dispatch capacity
    ///
    /// Default is `AlertAndDrop`.
    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.options.overflow_policy = policy;
        self
    }

    /// Set a callback for overflow notifications
    ///
    /// The callback is invoked with the total drop count on the first drop
    /// and every 1000th thereafter (`AlertAndDrop` only).
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.options.shutdown_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Add a sink owned by the logger
    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(SinkSpec::Shared(Arc::new(sink)));
        self
    }

    /// Add a sink the caller keeps a handle to
    #[must_use = "builder methods return a new value"]
    pub fn shared_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(SinkSpec::Shared(sink));
        self
    }

    /// Add a console sink using the configured output format
    #[must_use = "builder methods return a new value"]
    pub fn console(mut self) -> Self {
        self.sinks.push(SinkSpec::Console);
        self
    }

    /// Add a rotating file sink using the configured output format
    ///
    /// The sink is constructed, and its configuration checked, by
    /// [`build`](Self::build).
    #[must_use = "builder methods return a new value"]
    pub fn file(mut self, path_template: impl Into<PathBuf>) -> Self {
        self.sinks.push(SinkSpec::File(path_template.into()));
        self
    }

    /// Build the Logger
    ///
    /// Uses the ambient tokio runtime when called inside one, otherwise
    /// starts a small dedicated runtime for dispatch.
    ///
    /// # Errors
    ///
    /// Returns error if the settings are invalid, a sink cannot be
    /// constructed, or no runtime can be started
    pub fn build(self) -> Result<Logger> {
        self.options.validate()?;

        let format = self.options.output_format;
        let sinks = self
            .sinks
            .into_iter()
            .map(|spec| -> Result<Arc<dyn Sink>> {
                let sink: Arc<dyn Sink> = match spec {
                    SinkSpec::Shared(sink) => sink,
                    SinkSpec::Console => Arc::new(ConsoleSink::new().with_output_format(format)),
                    SinkSpec::File(path) => Arc::new(FileSink::with_options(
                        FileSinkOptions::new(path).with_output_format(format),
                    )?),
                };
                Ok(sink)
            })
            .collect::<Result<Vec<_>>>()?;

        let (handle, runtime) = match Handle::try_current() {
            Ok(handle) => (handle, None),
            Err(_) => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(DISPATCH_WORKER_THREADS)
                    .thread_name("logger-dispatch")
                    .enable_all()
                    .build()
                    .map_err(|e| LoggerError::RuntimeUnavailable(e.to_string()))?;
                (runtime.handle().clone(), Some(runtime))
            }
        };

        let mut rules = self.options.redaction_rules();
        rules.extend(self.rules);

        let inner = Inner {
            sampler: LogSampler::new(self.options.sample_rate),
            permits: Arc::new(Semaphore::new(self.options.dispatch_capacity)),
            options: self.options,
            rules,
            sinks,
            metrics: LoggerMetrics::new(),
            on_overflow: self.on_overflow,
            tracker: TaskTracker::new(),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
            cancel: CancellationToken::new(),
            shut_down: AtomicBool::new(false),
            handle,
        };

        Ok(Logger {
            inner: Arc::new(inner),
            runtime,
        })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
