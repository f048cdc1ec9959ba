//! Per-call-chain scope depth
//!
//! The depth lives in a tokio task-local for futures run through
//! [`ScopeContext::fork`] / [`ScopeContext::spawn`]. Any other tokio task
//! keeps its depth in a table keyed by task id, and code outside a task uses
//! a thread-local. Forking copies the current value into the child chain;
//! changes made by the child are never visible to its parent or siblings.

use parking_lot::Mutex;
use std::cell::Cell;
use std::collections::HashMap;
use std::future::Future;
use std::sync::OnceLock;
use tokio::task::{self, JoinHandle};

tokio::task_local! {
    static TASK_DEPTH: Cell<usize>;
}

thread_local! {
    static THREAD_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Depth of unforked tasks; an entry exists only while its depth is non-zero
static UNFORKED_TASK_DEPTHS: OnceLock<Mutex<HashMap<task::Id, usize>>> = OnceLock::new();

fn unforked_task_depths() -> &'static Mutex<HashMap<task::Id, usize>> {
    UNFORKED_TASK_DEPTHS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Restore token returned by [`ScopeContext::enter`]
///
/// Holds the depth that was current before the scope was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "pass the token to ScopeContext::exit to restore the depth"]
pub struct ScopeToken(usize);

impl ScopeToken {
    pub fn previous_depth(&self) -> usize {
        self.0
    }
}

/// Access point for the ambient scope depth
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeContext;

impl ScopeContext {
    /// Depth visible to the current call chain
    pub fn current_depth() -> usize {
        if let Ok(depth) = TASK_DEPTH.try_with(Cell::get) {
            return depth;
        }
        match task::try_id() {
            Some(id) => unforked_task_depths()
                .lock()
                .get(&id)
                .copied()
                .unwrap_or(0),
            None => THREAD_DEPTH.with(Cell::get),
        }
    }

    fn set_depth(depth: usize) {
        if TASK_DEPTH.try_with(|cell| cell.set(depth)).is_ok() {
            return;
        }
        match task::try_id() {
            Some(id) => {
                let mut depths = unforked_task_depths().lock();
                if depth == 0 {
                    depths.remove(&id);
                } else {
                    depths.insert(id, depth);
                }
            }
            None => THREAD_DEPTH.with(|cell| cell.set(depth)),
        }
    }

    /// Increment the depth and return the value to restore on exit
    pub fn enter() -> ScopeToken {
        let previous = Self::current_depth();
        Self::set_depth(previous.saturating_add(1));
        ScopeToken(previous)
    }

    /// Restore the depth captured by `token`
    pub fn exit(token: ScopeToken) {
        Self::set_depth(token.0);
    }

    /// Run `future` as a child chain starting at the depth current at this call
    pub fn fork<F: Future>(future: F) -> impl Future<Output = F::Output> {
        Self::fork_at(Self::current_depth(), future)
    }

    /// Run `future` as a child chain starting at `depth`
    pub fn fork_at<F: Future>(depth: usize, future: F) -> impl Future<Output = F::Output> {
        TASK_DEPTH.scope(Cell::new(depth), future)
    }

    /// Spawn `future` on the current runtime as a forked child chain
    pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let depth = Self::current_depth();
        tokio::spawn(TASK_DEPTH.scope(Cell::new(depth), future))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_nested_enter_exit_restores() {
        let base = ScopeContext::current_depth();

        let outer = ScopeContext::enter();
        assert_eq!(ScopeContext::current_depth(), base + 1);

        let inner = ScopeContext::enter();
        assert_eq!(ScopeContext::current_depth(), base + 2);
        assert_eq!(inner.previous_depth(), base + 1);

        ScopeContext::exit(inner);
        assert_eq!(ScopeContext::current_depth(), base + 1);

        ScopeContext::exit(outer);
        assert_eq!(ScopeContext::current_depth(), base);
    }

    #[test]
    fn test_threads_do_not_share_depth() {
        let token = ScopeContext::enter();
        let depth_here = ScopeContext::current_depth();

        let other = std::thread::spawn(ScopeContext::current_depth)
            .join()
            .unwrap();

        assert_eq!(other, 0);
        assert!(depth_here >= 1);
        ScopeContext::exit(token);
    }

    #[tokio::test]
    async fn test_fork_copies_parent_depth() {
        ScopeContext::fork_at(0, async {
            let token = ScopeContext::enter();
            assert_eq!(ScopeContext::current_depth(), 1);

            let child = ScopeContext::spawn(async {
                let inherited = ScopeContext::current_depth();
                let _t = ScopeContext::enter();
                let _t2 = ScopeContext::enter();
                (inherited, ScopeContext::current_depth())
            });

            let (inherited, child_final) = child.await.unwrap();
            assert_eq!(inherited, 1);
            assert_eq!(child_final, 3);

            // Child mutations never leak back
            assert_eq!(ScopeContext::current_depth(), 1);
            ScopeContext::exit(token);
            assert_eq!(ScopeContext::current_depth(), 0);
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sibling_chains_are_isolated() {
        let mut handles = Vec::new();
        for i in 0..8usize {
            handles.push(ScopeContext::spawn(async move {
                let mut tokens = Vec::new();
                for _ in 0..=i {
                    tokens.push(ScopeContext::enter());
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                let observed = ScopeContext::current_depth();
                while let Some(token) = tokens.pop() {
                    ScopeContext::exit(token);
                }
                (i, observed, ScopeContext::current_depth())
            }));
        }

        for handle in handles {
            let (i, observed, after) = handle.await.unwrap();
            assert_eq!(observed, i + 1);
            assert_eq!(after, 0);
        }
    }

    #[tokio::test]
    async fn test_unforked_siblings_are_isolated() {
        let holder = tokio::spawn(async {
            let token = ScopeContext::enter();
            tokio::time::sleep(Duration::from_millis(50)).await;
            let held = ScopeContext::current_depth();
            ScopeContext::exit(token);
            (held, ScopeContext::current_depth())
        });
        let sibling = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            ScopeContext::current_depth()
        });

        assert_eq!(sibling.await.unwrap(), 0);
        assert_eq!(holder.await.unwrap(), (1, 0));
        // Thread-local depth of the test body is untouched
        assert_eq!(ScopeContext::current_depth(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unforked_depth_follows_task_across_threads() {
        let handles: Vec<_> = (0..16usize)
            .map(|i| {
                tokio::spawn(async move {
                    let token = ScopeContext::enter();
                    for _ in 0..5 {
                        tokio::task::yield_now().await;
                        assert_eq!(ScopeContext::current_depth(), 1, "task {}", i);
                    }
                    ScopeContext::exit(token);
                    task::id()
                })
            })
            .collect();

        for handle in handles {
            let id = handle.await.unwrap();
            assert!(!unforked_task_depths().lock().contains_key(&id));
        }
    }
}
