//! Simulated progress for an outstanding generation.
//!
//! The remote call gives no progress signal, so the estimator advances a
//! decelerating curve on a fixed tick and stalls at [`PROGRESS_CEILING`]
//! until the orchestrator reports the real outcome. It is cosmetic only.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// The estimator never moves past this value on its own.
pub const PROGRESS_CEILING: f64 = 90.0;

/// Value reported once the generation is confirmed complete.
pub const PROGRESS_COMPLETE: f64 = 100.0;

const MIN_STEP: f64 = 0.5;

/// One estimator step: jump by `max(0.5, (95 - current) / 15)`, capped at the
/// ceiling. At or above the ceiling the value holds.
pub fn next_progress(current: f64) -> f64 {
    if current >= PROGRESS_CEILING {
        return current;
    }
    let jump = ((95.0 - current) / 15.0).max(MIN_STEP);
    (current + jump).min(PROGRESS_CEILING)
}

/// Handle to a running estimator task.
///
/// The task calls `step` once per tick. `step` receives the stop flag so it can
/// re-check it while holding whatever lock guards the progress value; returning
/// `false` ends the task. Dropping the handle stops the task.
pub struct ProgressEstimator {
    stopped: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ProgressEstimator {
    /// Spawn the ticking task. Must be called inside a tokio runtime.
    pub fn start<F>(interval: Duration, mut step: F) -> Self
    where
        F: FnMut(&AtomicBool) -> bool + Send + 'static,
    {
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; progress starts at 0.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if flag.load(Ordering::SeqCst) || !step(&flag) {
                    break;
                }
            }
            tracing::trace!("progress estimator finished");
        });

        Self {
            stopped,
            task: Some(task),
        }
    }

    /// Stop ticking. Idempotent.
    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for ProgressEstimator {
    fn drop(&mut self) {
        self.stop();
    }
}
