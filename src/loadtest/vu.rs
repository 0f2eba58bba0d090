//! Virtual user (VU) actor for load test execution.
//!
//! Each VU owns its session state and random source, runs the behaviour's
//! on-start hook once, then repeatedly picks a weighted scenario, executes
//! it, records the outcome into the shared [`RunStatistics`], and pauses.
//! Stopping is cooperative: a stop request never interrupts an in-flight
//! scenario, only the pause between scenarios.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use rand::prelude::*;
use rand::rngs::StdRng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::loadtest::client::ServiceClient;
use crate::loadtest::metrics::RunStatistics;
use crate::loadtest::scenario::{Outcome, ScenarioAction, ScenarioContext, UserBehavior};
use crate::loadtest::state::VirtualUserState;

/// Lifecycle phase of a virtual user.
///
/// `Created → Starting → Running → Stopping → Stopped`. A user stopped
/// before it starts goes `Created → Stopping → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VuPhase {
    Created = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
    Stopped = 4,
}

impl VuPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Handle for observing and stopping one virtual user from outside its task.
#[derive(Debug, Clone)]
pub struct VuControl {
    cancel: CancellationToken,
    phase: Arc<AtomicU8>,
}

impl VuControl {
    /// A control with its own, unparented cancellation token.
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// A control that is also stopped when `parent` is cancelled.
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self::with_token(parent.child_token())
    }

    fn with_token(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            phase: Arc::new(AtomicU8::new(VuPhase::Created as u8)),
        }
    }

    /// Request a cooperative stop. Idempotent, and a no-op once stopped.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn phase(&self) -> VuPhase {
        VuPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    fn set_phase(&self, phase: VuPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }
}

impl Default for VuControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Global cap on scenario executions across all virtual users.
///
/// Acquiring the last iteration cancels the run token, so the run ends as
/// soon as the in-flight executions finish (first limit wins against the
/// run duration).
#[derive(Debug)]
pub struct IterationBudget {
    used: AtomicU64,
    max: u64,
    run_cancel: CancellationToken,
}

impl IterationBudget {
    pub fn new(max: u64, run_cancel: CancellationToken) -> Self {
        if max == 0 {
            run_cancel.cancel();
        }
        Self {
            used: AtomicU64::new(0),
            max,
            run_cancel,
        }
    }

    /// Claim one execution. Returns `false` once the budget is spent.
    pub fn try_acquire(&self) -> bool {
        let prev = self.used.fetch_add(1, Ordering::Relaxed);
        if prev >= self.max {
            self.run_cancel.cancel();
            return false;
        }
        if prev + 1 == self.max {
            self.run_cancel.cancel();
        }
        true
    }

    /// Executions claimed so far (never above the limit).
    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Relaxed).min(self.max)
    }

    pub fn max(&self) -> u64 {
        self.max
    }
}

/// Atomic counter tracking the number of currently active virtual users.
///
/// Lightweight wrapper around `Arc<AtomicU32>` for clone-friendly sharing
/// across VU tasks and the run controller.
#[derive(Debug, Clone)]
pub struct ActiveVuCounter(Arc<AtomicU32>);

impl ActiveVuCounter {
    /// Creates a new counter initialized to zero.
    pub fn new() -> Self {
        Self(Arc::new(AtomicU32::new(0)))
    }

    /// Increments the active VU count by one.
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements the active VU count by one.
    pub fn decrement(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }

    /// Returns the current number of active VUs.
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for ActiveVuCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// One simulated user.
pub struct VirtualUser {
    id: u32,
    behavior: Arc<UserBehavior>,
    client: ServiceClient,
    statistics: RunStatistics,
    state: VirtualUserState,
    rng: StdRng,
    control: VuControl,
    budget: Option<Arc<IterationBudget>>,
    active: Option<ActiveVuCounter>,
}

impl VirtualUser {
    /// Create a user with an entropy-seeded random source.
    pub fn new(
        id: u32,
        behavior: Arc<UserBehavior>,
        client: ServiceClient,
        statistics: RunStatistics,
        control: VuControl,
    ) -> Self {
        Self {
            id,
            behavior,
            client,
            statistics,
            state: VirtualUserState::new(),
            rng: StdRng::from_rng(&mut rand::rng()),
            control,
            budget: None,
            active: None,
        }
    }

    /// Use a deterministic random source for scenario selection and pauses.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_iteration_budget(mut self, budget: Arc<IterationBudget>) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_active_counter(mut self, active: ActiveVuCounter) -> Self {
        self.active = Some(active);
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn control(&self) -> &VuControl {
        &self.control
    }

    pub fn state(&self) -> &VirtualUserState {
        &self.state
    }

    /// Run the on-start hook. A failing or panicking hook is logged and
    /// counted; the user still proceeds to its scenarios.
    pub async fn start(&mut self) {
        if self.control.phase() != VuPhase::Created {
            return;
        }
        self.control.set_phase(VuPhase::Starting);
        debug!(vu_id = self.id, behavior = self.behavior.name(), "virtual user starting");

        let Some(hook) = self.behavior.on_start() else {
            return;
        };
        let mut ctx = ScenarioContext {
            vu_id: self.id,
            client: &self.client,
            state: &mut self.state,
            rng: &mut self.rng,
        };
        if let Outcome::Failure(reason) = execute_guarded(hook, &mut ctx).await {
            warn!(vu_id = self.id, %reason, "on-start hook failed");
            self.statistics.record_on_start_failure();
        }
    }

    /// Pick, execute, record, and pause until stopped or the iteration
    /// budget is spent. Executions of one user never overlap.
    pub async fn run_loop(&mut self) {
        if self.control.is_stop_requested() {
            return;
        }
        self.control.set_phase(VuPhase::Running);
        let wait_time = self.behavior.wait_time();

        loop {
            if self.control.is_stop_requested() {
                break;
            }
            if let Some(budget) = &self.budget {
                if !budget.try_acquire() {
                    break;
                }
            }

            let Some(scenario) = self.behavior.registry().pick(&mut self.rng) else {
                break;
            };

            let mut ctx = ScenarioContext {
                vu_id: self.id,
                client: &self.client,
                state: &mut self.state,
                rng: &mut self.rng,
            };
            let started = Instant::now();
            let outcome = execute_guarded(scenario.action(), &mut ctx).await;
            let latency = started.elapsed();
            self.statistics.record(scenario.name(), &outcome, latency);

            let pause = wait_time.sample(&mut self.rng);
            if pause.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    _ = tokio::time::sleep(pause) => {},
                    _ = self.control.cancel.cancelled() => break,
                }
            }
        }
    }

    /// Full lifecycle: start, loop until stopped, then release the session
    /// state.
    pub async fn run(mut self) {
        if let Some(active) = &self.active {
            active.increment();
        }

        if self.control.is_stop_requested() {
            debug!(vu_id = self.id, "virtual user stopped before start");
        } else {
            self.start().await;
            self.run_loop().await;
        }

        self.control.set_phase(VuPhase::Stopping);
        let VirtualUser {
            id,
            state,
            control,
            active,
            ..
        } = self;
        drop(state);
        control.set_phase(VuPhase::Stopped);
        debug!(vu_id = id, "virtual user stopped");

        if let Some(active) = active {
            active.decrement();
        }
    }
}

/// Execute one action, converting errors and panics into failure outcomes.
async fn execute_guarded(action: &dyn ScenarioAction, ctx: &mut ScenarioContext<'_>) -> Outcome {
    match AssertUnwindSafe(action.execute(ctx)).catch_unwind().await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => {
            let reason = err.to_string();
            if reason.is_empty() {
                Outcome::failure("scenario failed")
            } else {
                Outcome::Failure(reason)
            }
        },
        Err(payload) => Outcome::Failure(format!("panicked: {}", panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
