//! Bounded admission for outbound calls.

use std::future::Future;
use std::sync::Arc;

use conduit_core::{context, ConduitError, ConduitResult, ConfigError};
use tokio::sync::Semaphore;

/// Caps the number of simultaneously running tasks at a fixed limit.
///
/// Backed by a tokio [`Semaphore`], which hands out permits in the order
/// waiters arrived, so queued callers are admitted FIFO. The permit is an RAII
/// guard: it is returned when the task settles, whether it succeeded, failed
/// or panicked.
///
/// Cloning yields another handle to the same gate.
#[derive(Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `limit` concurrent tasks.
    pub fn new(limit: usize) -> ConduitResult<Self> {
        if limit == 0 || limit > Semaphore::MAX_PERMITS {
            return Err(ConfigError::invalid(
                "concurrency_limit",
                limit,
                "must be at least 1 and fit a semaphore",
            )
            .into());
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Tasks currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.limit - self.available()
    }

    /// Run `task` once a slot is free and return whatever it returns.
    ///
    /// The task's error is propagated untouched; the gate does not interpret
    /// outcomes.
    pub async fn schedule<F, Fut, T>(&self, task: F) -> ConduitResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ConduitResult<T>>,
    {
        if self.semaphore.available_permits() == 0 {
            tracing::debug!(
                limit = self.limit,
                correlation_id = context::correlation_id().as_deref().unwrap_or("-"),
                "Concurrency gate full, queueing"
            );
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ConduitError::GateClosed)?;

        task().await
    }
}

impl std::fmt::Debug for ConcurrencyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencyGate")
            .field("limit", &self.limit)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::TransientError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn test_zero_limit_is_rejected() {
        let err = ConcurrencyGate::new(0).unwrap_err();
        assert!(matches!(err, ConduitError::Config(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_limit_and_all_complete() {
        let gate = ConcurrencyGate::new(3).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let gate = gate.clone();
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let done = Arc::clone(&done);
            handles.push(tokio::spawn(async move {
                gate.schedule(|| async {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(done.load(Ordering::SeqCst), 10);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(gate.available(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_are_admitted_fifo() {
        let gate = ConcurrencyGate::new(1).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..5 {
            let gate = gate.clone();
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                gate.schedule(|| async {
                    order.lock().unwrap().push(i);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok(())
                })
                .await
            }));
            // Let each task reach the semaphore queue before the next arrives.
            tokio::task::yield_now().await;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_failure_propagates_and_releases_slot() {
        let gate = ConcurrencyGate::new(1).unwrap();
        let err = gate
            .schedule(|| async {
                Err::<(), _>(ConduitError::from(TransientError::Transport {
                    endpoint: "http://data.local/1".to_string(),
                    reason: "connection reset".to_string(),
                }))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ConduitError::Transient(_)));
        assert_eq!(gate.available(), 1);
        assert_eq!(gate.schedule(|| async { Ok(7) }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_panicking_task_still_releases_slot() {
        let gate = ConcurrencyGate::new(1).unwrap();
        let panicking = gate.clone();
        let joined = tokio::spawn(async move {
            panicking
                .schedule(|| -> std::future::Ready<ConduitResult<()>> {
                    panic!("task blew up before suspending")
                })
                .await
        })
        .await;

        assert!(joined.is_err());
        assert_eq!(gate.available(), 1);
        assert_eq!(gate.in_flight(), 0);
    }
}
