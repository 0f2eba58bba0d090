//! Scenarios, weighted selection, and user behaviours.
//!
//! A [`Scenario`] is a named, weighted [`ScenarioAction`]. A
//! [`ScenarioRegistry`] holds the scenarios of one user class and picks one
//! at random in proportion to its weight. A [`UserBehavior`] bundles the
//! registry with the wait-time policy and the optional on-start hook that
//! every virtual user of that class follows.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::distr::weighted::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::loadtest::client::ServiceClient;
use crate::loadtest::error::{ConfigurationError, ScenarioError};
use crate::loadtest::state::VirtualUserState;

/// Classification of one scenario execution. Used for reporting only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The response satisfied the scenario's predicate.
    Success,
    /// The response failed the predicate, or the request never completed.
    Failure(String),
    /// The scenario issued no request because the state it depends on is
    /// missing (e.g. nothing was created yet). Not counted as an attempt.
    Skipped,
}

impl Outcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// Everything a scenario action may touch during one execution.
pub struct ScenarioContext<'a> {
    /// Id of the executing virtual user.
    pub vu_id: u32,
    /// Shared HTTP client for the target.
    pub client: &'a ServiceClient,
    /// The executing actor's own session state.
    pub state: &'a mut VirtualUserState,
    /// The executing actor's random source (seedable).
    pub rng: &'a mut StdRng,
}

/// The body of a scenario (or of an on-start hook).
///
/// Returning `Err` is equivalent to returning `Outcome::Failure` with the
/// error's message; the virtual user loop performs the conversion.
#[async_trait]
pub trait ScenarioAction: Send + Sync {
    async fn execute(&self, ctx: &mut ScenarioContext<'_>) -> Result<Outcome, ScenarioError>;
}

/// Adapter turning a synchronous closure into a [`ScenarioAction`].
pub struct FnAction<F>(F);

/// Wrap a synchronous closure as a [`ScenarioAction`]. Useful for actions
/// that only touch state, and in tests.
pub fn action_fn<F>(f: F) -> FnAction<F>
where
    F: Fn(&mut ScenarioContext<'_>) -> Result<Outcome, ScenarioError> + Send + Sync,
{
    FnAction(f)
}

#[async_trait]
impl<F> ScenarioAction for FnAction<F>
where
    F: Fn(&mut ScenarioContext<'_>) -> Result<Outcome, ScenarioError> + Send + Sync,
{
    async fn execute(&self, ctx: &mut ScenarioContext<'_>) -> Result<Outcome, ScenarioError> {
        (self.0)(ctx)
    }
}

/// A named, weighted action. Immutable once registered.
#[derive(Clone)]
pub struct Scenario {
    name: String,
    weight: u32,
    action: Arc<dyn ScenarioAction>,
}

impl Scenario {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn action(&self) -> &dyn ScenarioAction {
        self.action.as_ref()
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// The scenarios of one user class with weighted random selection.
#[derive(Clone, Debug, Default)]
pub struct ScenarioRegistry {
    scenarios: Vec<Scenario>,
    index: Option<WeightedIndex<u32>>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scenario.
    ///
    /// Fails with [`ConfigurationError::ZeroWeight`] for weight 0 and with
    /// [`ConfigurationError::DuplicateScenario`] when the name is taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        weight: u32,
        action: impl ScenarioAction + 'static,
    ) -> Result<(), ConfigurationError> {
        self.register_arc(name, weight, Arc::new(action))
    }

    /// Register a scenario whose action is already shared.
    pub fn register_arc(
        &mut self,
        name: impl Into<String>,
        weight: u32,
        action: Arc<dyn ScenarioAction>,
    ) -> Result<(), ConfigurationError> {
        let name = name.into();
        if weight == 0 {
            return Err(ConfigurationError::ZeroWeight { name });
        }
        if self.scenarios.iter().any(|s| s.name == name) {
            return Err(ConfigurationError::DuplicateScenario { name });
        }

        self.scenarios.push(Scenario {
            name,
            weight,
            action,
        });
        // Every weight is positive, so the index always builds.
        self.index = WeightedIndex::new(self.scenarios.iter().map(|s| s.weight)).ok();
        Ok(())
    }

    /// Pick one scenario with probability proportional to its weight.
    ///
    /// Returns `None` only when nothing is registered.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Scenario> {
        let index = self.index.as_ref()?;
        self.scenarios.get(index.sample(rng))
    }

    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Sum of all registered weights.
    pub fn total_weight(&self) -> u64 {
        self.scenarios.iter().map(|s| u64::from(s.weight)).sum()
    }
}

/// Pause between two scenario executions of the same virtual user, drawn
/// uniformly from `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTime {
    min: Duration,
    max: Duration,
}

impl WaitTime {
    pub fn between(min: Duration, max: Duration) -> Result<Self, ConfigurationError> {
        if min > max {
            return Err(ConfigurationError::InvalidWaitTime {
                min_ms: min.as_millis() as u64,
                max_ms: max.as_millis() as u64,
            });
        }
        Ok(Self { min, max })
    }

    pub fn between_millis(min_ms: u64, max_ms: u64) -> Result<Self, ConfigurationError> {
        Self::between(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    /// Always wait exactly `pause`.
    pub fn constant(pause: Duration) -> Self {
        Self {
            min: pause,
            max: pause,
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            self.min
        } else {
            rng.random_range(self.min..=self.max)
        }
    }
}

impl Default for WaitTime {
    /// One to three seconds, the pacing of the regular service users.
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(3),
        }
    }
}

/// What every virtual user of one class does: its scenarios, its pacing,
/// and an optional hook run once when the user starts.
#[derive(Clone)]
pub struct UserBehavior {
    name: String,
    wait_time: WaitTime,
    on_start: Option<Arc<dyn ScenarioAction>>,
    registry: ScenarioRegistry,
}

impl fmt::Debug for UserBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserBehavior")
            .field("name", &self.name)
            .field("wait_time", &self.wait_time)
            .field("on_start", &self.on_start.is_some())
            .field("registry", &self.registry)
            .finish()
    }
}

impl UserBehavior {
    pub fn new(name: impl Into<String>, wait_time: WaitTime) -> Self {
        Self {
            name: name.into(),
            wait_time,
            on_start: None,
            registry: ScenarioRegistry::new(),
        }
    }

    pub fn with_on_start(mut self, action: impl ScenarioAction + 'static) -> Self {
        self.on_start = Some(Arc::new(action));
        self
    }

    pub fn with_wait_time(mut self, wait_time: WaitTime) -> Self {
        self.wait_time = wait_time;
        self
    }

    /// Builder-style [`ScenarioRegistry::register`].
    pub fn scenario(
        mut self,
        name: impl Into<String>,
        weight: u32,
        action: impl ScenarioAction + 'static,
    ) -> Result<Self, ConfigurationError> {
        self.registry.register(name, weight, action)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wait_time(&self) -> WaitTime {
        self.wait_time
    }

    pub fn set_wait_time(&mut self, wait_time: WaitTime) {
        self.wait_time = wait_time;
    }

    pub fn on_start(&self) -> Option<&dyn ScenarioAction> {
        self.on_start.as_deref()
    }

    pub fn registry(&self) -> &ScenarioRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ScenarioRegistry {
        &mut self.registry
    }

    /// Check that the behaviour can drive a run.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.registry.is_empty() {
            return Err(ConfigurationError::EmptyRegistry {
                behavior: self.name.clone(),
            });
        }
        Ok(())
    }
}
