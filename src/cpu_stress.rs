use std::f64::consts::PI;
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::StressError;
use crate::thread_manager::WorkerPool;

pub const MIN_TARGET_PERCENT: u32 = 10;
pub const MAX_TARGET_PERCENT: u32 = 95;
pub const DEFAULT_TARGET_PERCENT: u32 = 60;

/// One busy+sleep cycle, in milliseconds.
pub const CYCLE_MILLIS: u32 = 100;

/// Point-in-time view of the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorStatus {
    pub is_stressing: bool,
    pub current_target: u32,
    pub workers: usize,
    pub active_workers: usize,
}

struct ActiveRun {
    token: CancellationToken,
    pool: WorkerPool,
}

#[derive(Default)]
struct GeneratorState {
    target: u32,
    run: Option<ActiveRun>,
    // Pools from stopped runs whose workers may still be finishing a cycle.
    retired: Vec<WorkerPool>,
}

impl GeneratorState {
    fn prune_retired(&mut self) {
        self.retired.retain(|pool| !pool.is_finished());
    }
}

/// Duty-cycle CPU load generator.
///
/// Each run spawns `workers` blocking workers that spin for `target` ms and
/// then sleep for `100 - target` ms until the run is cancelled.
pub struct LoadGenerator {
    workers: usize,
    root: CancellationToken,
    active: Arc<AtomicUsize>,
    state: Mutex<GeneratorState>,
}

impl LoadGenerator {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            root: CancellationToken::new(),
            active: Arc::new(AtomicUsize::new(0)),
            state: Mutex::new(GeneratorState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GeneratorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a run at `target` percent. Returns the accepted target.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, target: i64) -> Result<u32, StressError> {
        let mut state = self.lock();

        if state.run.is_some() {
            return Err(StressError::AlreadyRunning);
        }
        let target = validate_target(target)?;
        if self.root.is_cancelled() {
            return Err(StressError::ShuttingDown);
        }

        state.prune_retired();

        let token = self.root.child_token();
        let worker_token = token.clone();
        let pool = WorkerPool::spawn(self.workers, &self.active, move |_| {
            burn_cycles(target, &worker_token);
        });

        info!(
            target_percent = target,
            workers = pool.len(),
            "CPU stress test started"
        );

        state.target = target;
        state.run = Some(ActiveRun { token, pool });

        Ok(target)
    }

    /// Signals the current run to stop. Workers leave within one cycle.
    pub fn stop(&self) -> Result<(), StressError> {
        let mut state = self.lock();

        let Some(run) = state.run.take() else {
            warn!("stop requested but no stress test is running");
            return Err(StressError::NotRunning);
        };

        run.token.cancel();
        info!(target_percent = state.target, "CPU stress test stopped");

        state.target = 0;
        state.prune_retired();
        state.retired.push(run.pool);

        Ok(())
    }

    pub fn status(&self) -> GeneratorStatus {
        let state = self.lock();

        GeneratorStatus {
            is_stressing: state.run.is_some(),
            current_target: state.target,
            workers: self.workers,
            active_workers: self.active_workers(),
        }
    }

    pub fn is_stressing(&self) -> bool {
        self.lock().run.is_some()
    }

    /// Workers that have not left their loop yet, stopped runs included.
    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits until no worker is left or `timeout` elapses. Returns true when idle.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        while self.active_workers() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        true
    }

    /// Cancels everything and joins all workers within `grace`.
    ///
    /// Workers still running after the deadline are left to die with the process.
    pub async fn shutdown(&self, grace: Duration) {
        self.root.cancel();

        let pools: Vec<WorkerPool> = {
            let mut state = self.lock();
            state.target = 0;
            let mut pools = std::mem::take(&mut state.retired);
            pools.extend(state.run.take().map(|run| run.pool));
            pools
        };

        let deadline = Instant::now() + grace;
        let mut stragglers = 0;
        for pool in pools {
            stragglers += pool.join(deadline).await;
        }

        if stragglers > 0 {
            warn!(
                stragglers,
                "workers did not exit within {:?}, abandoning them", grace
            );
        } else {
            info!("all stress workers stopped");
        }
    }
}

fn validate_target(target: i64) -> Result<u32, StressError> {
    u32::try_from(target)
        .ok()
        .filter(|t| (MIN_TARGET_PERCENT..=MAX_TARGET_PERCENT).contains(t))
        .ok_or(StressError::TargetOutOfRange { target })
}

/// Worker loop: spin for `target` ms, sleep for the rest of the cycle, until cancelled.
fn burn_cycles(target: u32, token: &CancellationToken) {
    let busy = Duration::from_millis(u64::from(target));
    let idle = Duration::from_millis(u64::from(CYCLE_MILLIS.saturating_sub(target)));
    let mut rng = rand::rng();

    while !token.is_cancelled() {
        let started = std::time::Instant::now();
        while started.elapsed() < busy {
            black_box(churn(&mut rng));
        }

        thread::sleep(idle);
    }
}

// Throwaway float and string work.
fn churn<R: Rng>(rng: &mut R) -> f64 {
    let a = (rng.random::<f64>() * PI).sin();
    let b = (rng.random::<f64>() * 1000.0).sqrt();
    let c = (rng.random::<f64>() * PI).cos();

    let dummy = format!("stress-test-{}", rng.random::<f64>());
    let folded = dummy.to_uppercase().to_lowercase();

    a + b + c + folded.trim().len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTLE: Duration = Duration::from_secs(2);

    #[test]
    fn target_bounds_are_inclusive() {
        assert_eq!(validate_target(10), Ok(10));
        assert_eq!(validate_target(95), Ok(95));
        assert_eq!(
            validate_target(5),
            Err(StressError::TargetOutOfRange { target: 5 })
        );
        assert_eq!(
            validate_target(96),
            Err(StressError::TargetOutOfRange { target: 96 })
        );
        assert_eq!(
            validate_target(-20),
            Err(StressError::TargetOutOfRange { target: -20 })
        );
    }

    #[test]
    fn churn_produces_finite_values() {
        let mut rng = rand::rng();
        for _ in 0..100 {
            assert!(churn(&mut rng).is_finite());
        }
    }

    #[test]
    fn idle_generator_status() {
        let generator = LoadGenerator::new(2);
        let status = generator.status();

        assert!(!status.is_stressing);
        assert_eq!(status.current_target, 0);
        assert_eq!(status.workers, 2);
        assert_eq!(status.active_workers, 0);
    }

    #[test]
    fn zero_workers_is_clamped_to_one() {
        assert_eq!(LoadGenerator::new(0).status().workers, 1);
    }

    #[tokio::test]
    async fn start_within_range_runs_with_target() {
        let generator = LoadGenerator::new(2);

        assert_eq!(generator.start(10), Ok(10));

        let status = generator.status();
        assert!(status.is_stressing);
        assert_eq!(status.current_target, 10);
        assert_eq!(status.active_workers, 2);

        generator.shutdown(SETTLE).await;
    }

    #[tokio::test]
    async fn start_while_running_is_rejected() {
        let generator = LoadGenerator::new(1);
        generator.start(20).unwrap();

        assert_eq!(generator.start(50), Err(StressError::AlreadyRunning));
        assert_eq!(generator.status().current_target, 20);
        assert!(generator.is_stressing());

        generator.shutdown(SETTLE).await;
    }

    #[tokio::test]
    async fn already_running_wins_over_range_check() {
        let generator = LoadGenerator::new(1);
        generator.start(20).unwrap();

        assert_eq!(generator.start(200), Err(StressError::AlreadyRunning));

        generator.shutdown(SETTLE).await;
    }

    #[tokio::test]
    async fn out_of_range_start_leaves_generator_idle() {
        let generator = LoadGenerator::new(1);

        for target in [5, 96] {
            assert_eq!(
                generator.start(target),
                Err(StressError::TargetOutOfRange { target })
            );
        }

        let status = generator.status();
        assert!(!status.is_stressing);
        assert_eq!(status.current_target, 0);
        assert_eq!(status.active_workers, 0);
    }

    #[test]
    fn stop_while_idle_warns() {
        let generator = LoadGenerator::new(1);

        assert_eq!(generator.stop(), Err(StressError::NotRunning));
        assert!(!generator.is_stressing());
        assert_eq!(generator.status().current_target, 0);
    }

    #[tokio::test]
    async fn stop_resets_target_and_workers_exit() {
        let generator = LoadGenerator::new(2);
        generator.start(50).unwrap();

        assert_eq!(generator.stop(), Ok(()));

        let status = generator.status();
        assert!(!status.is_stressing);
        assert_eq!(status.current_target, 0);

        assert!(generator.wait_idle(SETTLE).await);
        assert_eq!(generator.active_workers(), 0);
    }

    #[test]
    fn cancelled_token_skips_the_busy_phase() {
        let token = CancellationToken::new();
        token.cancel();

        let started = std::time::Instant::now();
        burn_cycles(MAX_TARGET_PERCENT, &token);

        assert!(started.elapsed() < Duration::from_millis(u64::from(MAX_TARGET_PERCENT)));
    }

    #[test]
    fn one_cycle_spans_busy_plus_idle() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        burn_cycles(30, &token);
        let elapsed = started.elapsed();
        stopper.join().unwrap();

        // Cancelled mid-spin: the cycle still runs its 30 ms busy and 70 ms idle.
        assert!(elapsed >= Duration::from_millis(u64::from(CYCLE_MILLIS)));
        assert!(elapsed < Duration::from_millis(u64::from(2 * CYCLE_MILLIS)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn workers_leave_within_one_cycle_of_stop() {
        let generator = LoadGenerator::new(2);
        generator.start(95).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        generator.stop().unwrap();

        assert!(generator.wait_idle(Duration::from_millis(250)).await);
    }

    #[tokio::test]
    async fn can_restart_after_stop() {
        let generator = LoadGenerator::new(1);
        generator.start(30).unwrap();
        generator.stop().unwrap();

        assert_eq!(generator.start(40), Ok(40));
        assert_eq!(generator.status().current_target, 40);

        generator.shutdown(SETTLE).await;
        assert_eq!(generator.active_workers(), 0);
    }

    #[tokio::test]
    async fn shutdown_stops_active_run() {
        let generator = LoadGenerator::new(2);
        generator.start(95).unwrap();

        generator.shutdown(SETTLE).await;

        let status = generator.status();
        assert!(!status.is_stressing);
        assert_eq!(status.current_target, 0);
        assert_eq!(status.active_workers, 0);
    }

    #[tokio::test]
    async fn start_after_shutdown_is_refused() {
        let generator = LoadGenerator::new(1);
        generator.shutdown(SETTLE).await;

        assert_eq!(generator.start(50), Err(StressError::ShuttingDown));
        assert!(!generator.is_stressing());
    }
}
