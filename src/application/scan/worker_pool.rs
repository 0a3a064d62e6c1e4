use crate::domain::errors::{ScanError, ScoreError};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tokio::sync::oneshot;

/// Fixed-size pool for CPU-bound scoring work.
///
/// Jobs run on dedicated rayon threads, never on the tokio runtime, so model
/// fitting cannot starve the I/O tasks. At most `workers` jobs run at once;
/// the rest wait in the pool's queue.
pub struct CpuPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

/// Receiving end of one job submitted to a [`CpuPool`]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T, ScoreError>>,
}

impl<T> TaskHandle<T> {
    /// Waits for the job's outcome.
    ///
    /// A panic inside the job surfaces as [`ScoreError::Panicked`].
    pub async fn join(self) -> Result<T, ScoreError> {
        self.rx.await.unwrap_or(Err(ScoreError::WorkerGone))
    }
}

impl CpuPool {
    pub fn new(workers: usize) -> Result<Self, ScanError> {
        if workers == 0 {
            return Err(ScanError::WorkerPool {
                workers,
                reason: "at least one worker is required".to_string(),
            });
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("scan-worker-{}", i))
            .build()
            .map_err(|e| ScanError::WorkerPool {
                workers,
                reason: e.to_string(),
            })?;

        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn spawn<T, F>(&self, job: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ScoreError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.pool.spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|payload| {
                Err(ScoreError::Panicked {
                    message: panic_message(payload.as_ref()),
                })
            });
            // Receiver gone means the orchestrator stopped waiting
            let _ = tx.send(outcome);
        });
        TaskHandle { rx }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_job_result_is_delivered() {
        let pool = CpuPool::new(2).unwrap();
        let handle = pool.spawn(|| Ok(21 * 2));

        assert_eq!(handle.join().await, Ok(42));
    }

    #[tokio::test]
    async fn test_panic_becomes_score_error() {
        let pool = CpuPool::new(1).unwrap();
        let handle = pool.spawn::<(), _>(|| panic!("model exploded"));

        match handle.join().await {
            Err(ScoreError::Panicked { message }) => assert!(message.contains("model exploded")),
            other => panic!("unexpected outcome: {:?}", other),
        }

        // The worker survives the panic
        assert_eq!(pool.spawn(|| Ok(1)).join().await, Ok(1));
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_workers() {
        let pool = CpuPool::new(2).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                pool.spawn(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            handle.join().await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            CpuPool::new(0),
            Err(ScanError::WorkerPool { workers: 0, .. })
        ));
    }
}
