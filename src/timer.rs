//! Cancellable one-shot timers for deferred session actions

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, warn};

/// Shared flag that stops a scheduled task from running
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Cancel and report whether this call was the first to do so.
    /// Lets two paths race for one task and only the winner run it.
    pub fn claim(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }
}

pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs a task once after a delay unless its token was cancelled first
pub trait Timer: Send + Sync {
    fn schedule(&self, delay: Duration, token: CancelToken, task: TimerTask);
}

/// Timer backed by the tokio runtime
pub struct TokioTimer {
    handle: tokio::runtime::Handle,
}

impl TokioTimer {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running on
    pub fn current() -> Result<Self> {
        Ok(Self::new(tokio::runtime::Handle::try_current()?))
    }
}

impl Timer for TokioTimer {
    fn schedule(&self, delay: Duration, token: CancelToken, task: TimerTask) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if token.is_cancelled() {
                debug!("timer task cancelled");
                return;
            }
            task();
        });
    }
}

struct PendingTask {
    due: Duration,
    token: CancelToken,
    task: TimerTask,
}

/// Timer driven by hand: tasks run only when `advance` passes their deadline
#[derive(Default)]
pub struct ManualTimer {
    now: Mutex<Duration>,
    pending: Mutex<Vec<PendingTask>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks still waiting (cancelled ones included)
    pub fn pending(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Move the clock forward and run every task that became due.
    /// Returns how many tasks actually ran.
    pub fn advance(&self, by: Duration) -> usize {
        let now = match self.now.lock() {
            Ok(mut now) => {
                *now += by;
                *now
            }
            Err(e) => {
                warn!("manual timer clock poisoned: {}", e);
                return 0;
            }
        };

        let due: Vec<PendingTask> = match self.pending.lock() {
            Ok(mut pending) => {
                let (due, waiting): (Vec<_>, Vec<_>) =
                    pending.drain(..).partition(|t| t.due <= now);
                *pending = waiting;
                due
            }
            Err(e) => {
                warn!("manual timer queue poisoned: {}", e);
                return 0;
            }
        };

        let mut ran = 0;
        for pending in due {
            if pending.token.is_cancelled() {
                continue;
            }
            (pending.task)();
            ran += 1;
        }
        ran
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, token: CancelToken, task: TimerTask) {
        let now = self.now.lock().map(|n| *n).unwrap_or_default();
        if let Ok(mut pending) = self.pending.lock() {
            pending.push(PendingTask {
                due: now + delay,
                token,
                task,
            });
        }
    }
}
