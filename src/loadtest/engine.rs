//! Run controller: spawns virtual users, drives their lifecycle, and
//! aggregates their outcomes.
//!
//! [`RunController`] is the top-level orchestrator that:
//! - Spawns N virtual users as tokio tasks via [`TaskTracker`], staggered
//!   linearly over the ramp-up period
//! - Shares one [`RunStatistics`] aggregate that can be snapshotted at any
//!   time; it is cleared when each run starts
//! - Ends the run on the first of: duration elapsed, iteration budget spent,
//!   or Ctrl+C (when signal handling is enabled)
//! - Stops every user cooperatively and waits for in-flight scenarios

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::loadtest::client::ServiceClient;
use crate::loadtest::config::LoadTestConfig;
use crate::loadtest::error::LoadTestError;
use crate::loadtest::metrics::{RunStatistics, StatisticsSnapshot};
use crate::loadtest::scenario::UserBehavior;
use crate::loadtest::vu::{ActiveVuCounter, IterationBudget, VirtualUser, VuControl};

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Final statistics, taken after every user stopped.
    pub snapshot: StatisticsSnapshot,
    /// Wall-clock time from start to the last user stopping.
    pub elapsed: Duration,
    /// Users actually spawned (fewer than requested when the run ended
    /// during ramp-up).
    pub users_started: u32,
    /// Users still active when the run returned. Always 0 after a clean drain.
    pub final_active_vus: u32,
}

/// Spawns and supervises the virtual users of one run.
pub struct RunController {
    behavior: Arc<UserBehavior>,
    client: ServiceClient,
    statistics: RunStatistics,
    active_vus: ActiveVuCounter,
    max_iterations: Option<u64>,
    seed: Option<u64>,
    signal_handling: bool,
}

impl RunController {
    /// Creates a controller for `behavior` against `client`'s target.
    ///
    /// Fails with [`LoadTestError::Configuration`] when the behaviour has no
    /// scenarios, so nothing is spawned for an unusable setup.
    pub fn new(behavior: UserBehavior, client: ServiceClient) -> Result<Self, LoadTestError> {
        behavior.validate()?;
        Ok(Self {
            behavior: Arc::new(behavior),
            client,
            statistics: RunStatistics::new(),
            active_vus: ActiveVuCounter::new(),
            max_iterations: None,
            seed: None,
            signal_handling: false,
        })
    }

    /// Creates a controller from a validated configuration and target URL.
    pub fn from_config(config: &LoadTestConfig, base_url: &str) -> Result<Self, LoadTestError> {
        config.validate()?;
        let behavior = config.build_behavior()?;
        let client = ServiceClient::new(base_url, config.settings.timeout_as_duration())?;
        let controller = Self::new(behavior, client)?;
        Ok(match config.settings.seed {
            Some(seed) => controller.with_seed(seed),
            None => controller,
        })
    }

    /// Sets an iteration limit. The run stops after this many total scenario
    /// executions across all users (first-limit-wins with duration).
    pub fn with_iterations(mut self, n: u64) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Seeds every user's random source with `seed + user_id`, making
    /// scenario selection and pauses reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Stop the run on Ctrl+C; a second Ctrl+C aborts the process.
    pub fn with_signal_handling(mut self, enabled: bool) -> Self {
        self.signal_handling = enabled;
        self
    }

    pub fn behavior(&self) -> &UserBehavior {
        &self.behavior
    }

    pub fn max_iterations(&self) -> Option<u64> {
        self.max_iterations
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Handle on the shared statistics, for observing a run in progress.
    /// The handle stays valid across runs and always shows the latest one.
    pub fn statistics(&self) -> RunStatistics {
        self.statistics.clone()
    }

    /// Read-only copy of the statistics recorded so far.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        self.statistics.snapshot()
    }

    /// Number of users currently running.
    pub fn active_vus(&self) -> u32 {
        self.active_vus.get()
    }

    /// Run `user_count` users for `duration`, starting user `i` at
    /// `ramp_up * i / user_count`. Statistics from a previous run are
    /// discarded.
    pub async fn run(&self, user_count: u32, duration: Duration, ramp_up: Duration) -> RunResult {
        self.statistics.reset();
        let start = Instant::now();
        if user_count == 0 {
            debug!("run requested with zero users");
            return RunResult {
                snapshot: self.statistics.snapshot(),
                elapsed: start.elapsed(),
                users_started: 0,
                final_active_vus: 0,
            };
        }

        info!(
            users = user_count,
            duration_secs = duration.as_secs_f64(),
            ramp_up_secs = ramp_up.as_secs_f64(),
            behavior = self.behavior.name(),
            "load test starting"
        );

        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let budget = self
            .max_iterations
            .map(|n| Arc::new(IterationBudget::new(n, cancel.clone())));
        let signal_task = self
            .signal_handling
            .then(|| tokio::spawn(handle_ctrl_c(cancel.clone())));

        let mut controls: Vec<VuControl> = Vec::with_capacity(user_count as usize);
        let spawn_and_wait = async {
            for i in 0..user_count {
                let offset = ramp_offset(ramp_up, i, user_count);
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline(start, offset)) => {},
                    _ = cancel.cancelled() => break,
                }

                let control = VuControl::child_of(&cancel);
                let mut vu = VirtualUser::new(
                    i,
                    self.behavior.clone(),
                    self.client.clone(),
                    self.statistics.clone(),
                    control.clone(),
                )
                .with_active_counter(self.active_vus.clone());
                if let Some(seed) = self.seed {
                    vu = vu.with_seed(seed.wrapping_add(u64::from(i)));
                }
                if let Some(budget) = &budget {
                    vu = vu.with_iteration_budget(budget.clone());
                }

                controls.push(control);
                tracker.spawn(vu.run());
                debug!(vu_id = i, offset_ms = offset.as_millis() as u64, "virtual user spawned");
            }
            // Iteration budget or Ctrl+C
            cancel.cancelled().await;
        };

        tokio::select! {
            _ = tokio::time::sleep_until(deadline(start, duration)) => {
                debug!("run duration elapsed");
            },
            _ = spawn_and_wait => {},
        }

        cancel.cancel();
        for control in &controls {
            control.stop();
        }
        tracker.close();
        tracker.wait().await;

        if let Some(task) = signal_task {
            task.abort();
        }

        let snapshot = self.statistics.snapshot();
        let elapsed = start.elapsed();
        info!(
            users = controls.len(),
            attempts = snapshot.total_attempts,
            failures = snapshot.total_failures,
            elapsed_secs = elapsed.as_secs_f64(),
            "load test finished"
        );

        RunResult {
            snapshot,
            elapsed,
            users_started: controls.len() as u32,
            final_active_vus: self.active_vus.get(),
        }
    }
}

/// Start offset of user `i` out of `user_count` over `ramp_up`.
fn ramp_offset(ramp_up: Duration, i: u32, user_count: u32) -> Duration {
    match ramp_up.checked_mul(i) {
        Some(scaled) => scaled / user_count,
        None => {
            let fraction = f64::from(i) / f64::from(user_count);
            Duration::try_from_secs_f64(ramp_up.as_secs_f64() * fraction).unwrap_or(ramp_up)
        },
    }
}

/// `start + after`, clamped to roughly 30 years out when that overflows.
fn deadline(start: Instant, after: Duration) -> Instant {
    start
        .checked_add(after)
        .unwrap_or_else(|| start + Duration::from_secs(86400 * 365 * 30))
}

/// First Ctrl+C stops the run gracefully; the second aborts the process.
async fn handle_ctrl_c(cancel: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "failed to install Ctrl+C handler");
        return;
    }
    eprintln!("\nReceived Ctrl+C, stopping gracefully...");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        eprintln!("\nReceived second Ctrl+C, aborting immediately.");
        std::process::exit(1);
    }
}
