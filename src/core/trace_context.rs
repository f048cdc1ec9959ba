//! Ambient distributed-trace identifier and correlation id resolution

use rand::Rng;
use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;

/// Length of every correlation id
pub const CORRELATION_ID_LEN: usize = 8;

tokio::task_local! {
    static TASK_TRACE: Option<Arc<str>>;
}

thread_local! {
    static THREAD_TRACE: RefCell<Option<Arc<str>>> = const { RefCell::new(None) };
}

/// Access point for the active trace identifier
///
/// # Example
///
/// ```
/// use rust_logger_pipeline::core::trace_context::{correlation_id, TraceContext};
///
/// {
///     let _trace = TraceContext::enter("4bf92f3577b34da6a3ce929d0e0e4736");
///     assert_eq!(correlation_id(), "0e0e4736");
/// }
/// assert!(TraceContext::current().is_none());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceContext;

impl TraceContext {
    /// Trace id active for the current call chain, if any
    pub fn current() -> Option<Arc<str>> {
        match TASK_TRACE.try_with(Clone::clone) {
            Ok(trace) => trace,
            Err(_) => THREAD_TRACE.with(|cell| cell.borrow().clone()),
        }
    }

    /// Make `trace_id` active on this thread until the guard is dropped
    pub fn enter(trace_id: impl Into<Arc<str>>) -> TraceGuard {
        let previous = THREAD_TRACE.with(|cell| cell.replace(Some(trace_id.into())));
        TraceGuard { previous }
    }

    /// Run `future` with `trace_id` active for its whole call chain
    pub fn scope<F: Future>(
        trace_id: impl Into<Arc<str>>,
        future: F,
    ) -> impl Future<Output = F::Output> {
        TASK_TRACE.scope(Some(trace_id.into()), future)
    }
}

/// Restores the previously active thread trace id on drop
#[derive(Debug)]
#[must_use = "the trace id is only active while the guard is alive"]
pub struct TraceGuard {
    previous: Option<Arc<str>>,
}

impl Drop for TraceGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        THREAD_TRACE.with(|cell| *cell.borrow_mut() = previous);
    }
}

/// Resolve the correlation id for one log call
///
/// Uses the trailing characters of the active trace id, or a fresh random
/// hexadecimal id when no trace is active.
pub fn correlation_id() -> String {
    match TraceContext::current() {
        Some(trace) if !trace.is_empty() => trailing_chars(&trace, CORRELATION_ID_LEN),
        _ => random_correlation_id(),
    }
}

/// Fresh random 8-character lowercase hexadecimal id
pub fn random_correlation_id() -> String {
    format!("{:08x}", rand::thread_rng().gen::<u32>())
}

fn trailing_chars(s: &str, count: usize) -> String {
    let total = s.chars().count();
    s.chars().skip(total.saturating_sub(count)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids_are_hex_and_fresh() {
        let id = correlation_id();
        assert_eq!(id.len(), CORRELATION_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));

        let ids: std::collections::HashSet<String> = (0..16).map(|_| correlation_id()).collect();
        assert!(ids.len() > 1);
    }

    #[test]
    fn test_trace_guard_restores_previous() {
        let outer = TraceContext::enter("trace-outer-0000aaaa");
        assert_eq!(correlation_id(), "0000aaaa");
        {
            let _inner = TraceContext::enter("trace-inner-1111bbbb");
            assert_eq!(correlation_id(), "1111bbbb");
        }
        assert_eq!(correlation_id(), "0000aaaa");
        drop(outer);
        assert!(TraceContext::current().is_none());
    }

    #[test]
    fn test_short_trace_id_used_whole() {
        let _trace = TraceContext::enter("abc");
        assert_eq!(correlation_id(), "abc");
    }

    #[tokio::test]
    async fn test_task_scope_overrides_thread() {
        let _thread = TraceContext::enter("thread-level-22222222");
        let inside = TraceContext::scope("task-level-33333333", async { correlation_id() }).await;
        assert_eq!(inside, "33333333");
        assert_eq!(correlation_id(), "22222222");
    }
}
