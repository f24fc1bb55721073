//! Periodic Task Scheduler
//!
//! Drives the background samplers on their own cadences:
//!
//! - **Fixed delay**: the next run starts `delay` after the previous one
//!   finished, so a slow run pushes the schedule back and runs never overlap.
//! - **Fixed rate**: runs are aligned to absolute `period` boundaries
//!   regardless of how long each run takes; missed ticks fire in a burst.
//!
//! Every task stops at its next await point once the scheduler's
//! cancellation token fires.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Work executed on a schedule
#[async_trait]
pub trait PeriodicTask: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Execute one run
    async fn run(&self);
}

/// Scheduling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Wait this long after each run completes
    FixedDelay(Duration),
    /// Start a run every period
    FixedRate(Duration),
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::FixedDelay(d) => write!(f, "fixed-delay {:?}", d),
            Cadence::FixedRate(d) => write!(f, "fixed-rate {:?}", d),
        }
    }
}

/// Owns the background loops for all periodic tasks
pub struct Scheduler {
    token: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler with its own cancellation token
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Create a scheduler stopped by `token`
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Token that stops every scheduled task when cancelled
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Number of scheduled tasks
    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }

    /// Start running `task` on `cadence`. The first run happens immediately.
    pub fn schedule(&self, task: Arc<dyn PeriodicTask>, cadence: Cadence) {
        info!("Scheduling {} ({})", task.name(), cadence);
        let token = self.token.clone();
        let handle = match cadence {
            Cadence::FixedDelay(delay) => tokio::spawn(run_fixed_delay(task, delay, token)),
            Cadence::FixedRate(period) => tokio::spawn(run_fixed_rate(task, period, token)),
        };
        self.handles.lock().push(handle);
    }

    /// Stop all tasks and wait for their loops to exit
    pub async fn shutdown(&self) {
        self.token.cancel();
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Scheduled task ended abnormally: {}", e);
            }
        }
        info!("Scheduler stopped");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_fixed_delay(task: Arc<dyn PeriodicTask>, delay: Duration, token: CancellationToken) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = task.run() => {}
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = sleep(delay) => {}
        }
    }
    debug!("{} shutting down", task.name());
}

async fn run_fixed_rate(task: Arc<dyn PeriodicTask>, period: Duration, token: CancellationToken) {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tick.tick() => task.run().await,
        }
    }
    debug!("{} shutting down", task.name());
}

// =============================================================================
// Tests
// =============================================================================
