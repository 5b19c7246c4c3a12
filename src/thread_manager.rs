use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::task::{self, JoinHandle};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

/// Decrements the live-worker counter when a worker leaves its loop, panics included.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(active))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A batch of blocking workers spawned together for one run.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `count` blocking workers, each running `job(worker_id)`.
    ///
    /// `active` is incremented before `spawn` returns, so callers observing it
    /// right after a start never see a transient zero.
    pub fn spawn<F>(count: usize, active: &Arc<AtomicUsize>, job: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let job = Arc::new(job);
        let mut handles = Vec::with_capacity(count);

        for worker_id in 0..count {
            let guard = ActiveGuard::enter(active);
            let job = Arc::clone(&job);

            handles.push(task::spawn_blocking(move || {
                let _guard = guard;
                job(worker_id);
                debug!(worker_id, "worker exited");
            }));
        }

        Self { handles }
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_finished(&self) -> bool {
        self.handles.iter().all(JoinHandle::is_finished)
    }

    /// Waits for every worker until `deadline`. Returns how many were still running.
    pub async fn join(self, deadline: Instant) -> usize {
        let mut stragglers = 0;

        for handle in self.handles {
            match timeout_at(deadline, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("worker ended abnormally: {}", e),
                Err(_) => stragglers += 1,
            }
        }

        stragglers
    }
}
