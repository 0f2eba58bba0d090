//! TOML-based load test configuration.
//!
//! A config selects what the virtual users do (a built-in [`Profile`],
//! declarative `[[scenario]]` steps, or both) and how hard they do it
//! (user count, duration, ramp-up, pacing).
//!
//! # Example TOML
//!
//! ```toml
//! [settings]
//! virtual_users = 10
//! duration_secs = 60
//! ramp_up_secs = 10
//! timeout_ms = 5000
//! profile = "user-service"
//!
//! [settings.wait_time]
//! min_ms = 1000
//! max_ms = 3000
//!
//! [[scenario]]
//! name = "list products"
//! weight = 2
//! path = "/product-service/api/products"
//! expect = { status = [200], json_key = "collection" }
//! ```
//!
//! Note: The target base URL is NOT part of the config file. It is given on
//! the command line so one config can be pointed at any environment.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::loadtest::error::LoadTestError;
use crate::loadtest::scenario::{UserBehavior, WaitTime};
use crate::loadtest::step::HttpStep;
use crate::profiles::Profile;

/// Name of the behaviour built from `[[scenario]]` steps alone.
pub const CUSTOM_BEHAVIOR_NAME: &str = "custom";

/// Top-level load test configuration parsed from a TOML file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoadTestConfig {
    /// General load test settings.
    pub settings: Settings,
    /// Declarative HTTP steps. The field name is `scenario` (not `scenarios`)
    /// because TOML `[[scenario]]` array-of-tables syntax creates a key
    /// called `scenario`.
    #[serde(default)]
    pub scenario: Vec<HttpStep>,
}

/// General load test settings controlling execution parameters.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Number of concurrent virtual users to simulate.
    pub virtual_users: u32,
    /// Total test duration in seconds.
    pub duration_secs: u64,
    /// Period over which user starts are spread linearly.
    #[serde(default)]
    pub ramp_up_secs: u64,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Base seed for reproducible scenario selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Built-in user class to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    /// Pause between scenarios. Overrides the profile's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_time: Option<WaitTimeConfig>,
}

/// Default per-request timeout: 5 seconds.
fn default_timeout_ms() -> u64 {
    5000
}

/// `[settings.wait_time]` bounds in milliseconds.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl WaitTimeConfig {
    pub fn to_wait_time(self) -> Result<WaitTime, LoadTestError> {
        Ok(WaitTime::between_millis(self.min_ms, self.max_ms)?)
    }
}

impl LoadTestConfig {
    /// Parse a TOML string into a validated [`LoadTestConfig`].
    ///
    /// Returns an error if the TOML is malformed or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, LoadTestError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a [`LoadTestConfig`] from a file path.
    ///
    /// Returns [`LoadTestError::ConfigIo`] if the file cannot be read,
    /// [`LoadTestError::ConfigParse`] if the TOML is malformed, or
    /// [`LoadTestError::ConfigValidation`] if validation fails.
    pub fn load(path: &Path) -> Result<Self, LoadTestError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadTestError::ConfigIo {
            source,
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// A config that runs `profile` with its default pacing.
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            settings: Settings {
                virtual_users: 10,
                duration_secs: 60,
                ramp_up_secs: 0,
                timeout_ms: default_timeout_ms(),
                seed: None,
                profile: Some(profile),
                wait_time: None,
            },
            scenario: Vec::new(),
        }
    }

    /// Steps that take part in scheduling (weight above zero).
    pub fn enabled_steps(&self) -> impl Iterator<Item = &HttpStep> {
        self.scenario.iter().filter(|step| step.weight > 0)
    }

    /// Validate that the config is semantically correct.
    ///
    /// Checks:
    /// - A profile or at least one step with positive weight is present
    /// - `timeout_ms` is positive
    /// - Wait-time bounds satisfy `min_ms <= max_ms`
    /// - Step names are unique and step paths start with `/`
    /// - Step header names and values are valid HTTP headers
    pub fn validate(&self) -> Result<(), LoadTestError> {
        if self.settings.profile.is_none() && self.enabled_steps().next().is_none() {
            return Err(LoadTestError::ConfigValidation {
                message: "Config must set settings.profile or contain at least one \
                          [[scenario]] step with weight > 0"
                    .to_string(),
            });
        }

        if self.settings.timeout_ms == 0 {
            return Err(LoadTestError::ConfigValidation {
                message: "settings.timeout_ms must be greater than 0".to_string(),
            });
        }

        if let Some(wait) = self.settings.wait_time {
            if wait.min_ms > wait.max_ms {
                return Err(LoadTestError::ConfigValidation {
                    message: format!(
                        "settings.wait_time.min_ms ({}) exceeds max_ms ({})",
                        wait.min_ms, wait.max_ms
                    ),
                });
            }
        }

        let mut names = HashSet::new();
        for (i, step) in self.scenario.iter().enumerate() {
            if !step.path.starts_with('/') {
                return Err(LoadTestError::ConfigValidation {
                    message: format!(
                        "Scenario {} ('{}') path '{}' must start with '/'",
                        i + 1,
                        step.name,
                        step.path
                    ),
                });
            }
            for (name, value) in &step.headers {
                if HeaderName::from_bytes(name.as_bytes()).is_err() {
                    return Err(LoadTestError::ConfigValidation {
                        message: format!(
                            "Scenario '{}' header name '{}' is not a valid HTTP header",
                            step.name, name
                        ),
                    });
                }
                if HeaderValue::from_str(value).is_err() {
                    return Err(LoadTestError::ConfigValidation {
                        message: format!(
                            "Scenario '{}' header '{}' has an invalid value",
                            step.name, name
                        ),
                    });
                }
            }
            if !names.insert(step.name.as_str()) {
                return Err(LoadTestError::ConfigValidation {
                    message: format!("Scenario name '{}' is used more than once", step.name),
                });
            }
        }

        Ok(())
    }

    /// Build the user behaviour this config describes.
    ///
    /// Starts from the profile (if any), adds every enabled step, and
    /// applies the wait-time override. Step names colliding with profile
    /// scenarios are rejected.
    pub fn build_behavior(&self) -> Result<UserBehavior, LoadTestError> {
        let mut behavior = match self.settings.profile {
            Some(profile) => profile.build()?,
            None => UserBehavior::new(CUSTOM_BEHAVIOR_NAME, WaitTime::default()),
        };

        for step in self.enabled_steps() {
            behavior
                .registry_mut()
                .register_arc(step.name.clone(), step.weight, Arc::new(step.clone()))?;
        }

        if let Some(wait) = self.settings.wait_time {
            behavior.set_wait_time(wait.to_wait_time()?);
        }

        behavior.validate()?;
        Ok(behavior)
    }
}

impl Settings {
    /// Convert the `timeout_ms` field to a [`Duration`].
    pub fn timeout_as_duration(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn ramp_up(&self) -> Duration {
        Duration::from_secs(self.ramp_up_secs)
    }
}
