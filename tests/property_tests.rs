//! Property-based tests for scenario selection, pacing, and config parsing.
//!
//! Uses proptest to verify invariants across randomized inputs:
//! - Weighted selection never yields a zero-weight scenario and follows weights
//! - Sampled pauses stay within their bounds
//! - Validation rejects semantically invalid configs

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::time::Duration;

use svcload::loadtest::config::LoadTestConfig;
use svcload::loadtest::error::{ConfigurationError, LoadTestError};
use svcload::loadtest::scenario::{action_fn, Outcome, ScenarioRegistry, WaitTime};

fn registry_with(weights: &[u32]) -> Result<ScenarioRegistry, ConfigurationError> {
    let mut registry = ScenarioRegistry::new();
    for (i, weight) in weights.iter().enumerate() {
        registry.register(format!("s{i}"), *weight, action_fn(|_ctx| Ok(Outcome::Success)))?;
    }
    Ok(registry)
}

proptest! {
    /// Picks always come from the registered set, and a scenario is picked
    /// at all only if it is registered.
    #[test]
    fn prop_pick_returns_registered_scenario(
        weights in prop::collection::vec(1u32..=50, 1..8),
        seed in any::<u64>(),
    ) {
        let registry = registry_with(&weights).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..100 {
            let picked = registry.pick(&mut rng).unwrap();
            prop_assert!(picked.weight() > 0);
            prop_assert!(registry.get(picked.name()).is_some());
        }
    }

    /// Registering a zero weight anywhere fails and leaves earlier entries.
    #[test]
    fn prop_zero_weight_rejected(
        weights in prop::collection::vec(1u32..=50, 0..5),
    ) {
        let mut registry = registry_with(&weights).unwrap();
        let err = registry
            .register("disabled", 0, action_fn(|_ctx| Ok(Outcome::Success)))
            .unwrap_err();
        let is_zero_weight = matches!(err, ConfigurationError::ZeroWeight { .. });
        prop_assert!(is_zero_weight);
        prop_assert_eq!(registry.len(), weights.len());
        prop_assert!(registry.get("disabled").is_none());
    }

    /// Empirical pick frequencies converge to the weight proportions.
    #[test]
    fn prop_pick_distribution_follows_weights(
        weights in prop::collection::vec(1u32..=10, 2..5),
        seed in any::<u64>(),
    ) {
        let registry = registry_with(&weights).unwrap();
        let total = registry.total_weight() as f64;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut counts: HashMap<String, u32> = HashMap::new();
        let picks = 20_000;
        for _ in 0..picks {
            let picked = registry.pick(&mut rng).unwrap();
            *counts.entry(picked.name().to_string()).or_insert(0) += 1;
        }
        for scenario in registry.iter() {
            let expected = f64::from(scenario.weight()) / total;
            let observed = f64::from(counts.get(scenario.name()).copied().unwrap_or(0))
                / f64::from(picks);
            prop_assert!(
                (observed - expected).abs() < 0.03,
                "{} expected {:.3} observed {:.3}",
                scenario.name(),
                expected,
                observed
            );
        }
    }

    /// Sampled pauses stay within `[min, max]`.
    #[test]
    fn prop_wait_time_sample_in_bounds(
        min_ms in 0u64..5_000,
        span_ms in 0u64..5_000,
        seed in any::<u64>(),
    ) {
        let wait = WaitTime::between_millis(min_ms, min_ms + span_ms).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..50 {
            let pause = wait.sample(&mut rng);
            prop_assert!(pause >= Duration::from_millis(min_ms));
            prop_assert!(pause <= Duration::from_millis(min_ms + span_ms));
        }
    }

    /// Inverted wait bounds are a configuration error.
    #[test]
    fn prop_inverted_wait_time_rejected(
        max_ms in 0u64..5_000,
        excess in 1u64..5_000,
    ) {
        let err = WaitTime::between_millis(max_ms + excess, max_ms).unwrap_err();
        prop_assert_eq!(
            err,
            ConfigurationError::InvalidWaitTime { min_ms: max_ms + excess, max_ms }
        );
    }

    /// Valid settings with one step parse and keep their values.
    #[test]
    fn prop_valid_config_parses(
        virtual_users in 1u32..=1000,
        duration_secs in 1u64..=3600,
        ramp_up_secs in 0u64..=600,
        timeout_ms in 100u64..=30000,
        step_name in "[a-z]{1,10}",
        weight in 1u32..=100,
    ) {
        let toml_str = format!(
            r#"[settings]
virtual_users = {virtual_users}
duration_secs = {duration_secs}
ramp_up_secs = {ramp_up_secs}
timeout_ms = {timeout_ms}

[[scenario]]
name = "{step_name}"
weight = {weight}
path = "/{step_name}"
"#
        );
        let config = LoadTestConfig::from_toml(&toml_str).unwrap();
        prop_assert_eq!(config.settings.virtual_users, virtual_users);
        prop_assert_eq!(config.settings.duration_secs, duration_secs);
        prop_assert_eq!(config.settings.ramp_up_secs, ramp_up_secs);
        prop_assert_eq!(config.settings.timeout_ms, timeout_ms);
        prop_assert_eq!(config.scenario[0].weight, weight);

        let behavior = config.build_behavior().unwrap();
        prop_assert_eq!(behavior.registry().total_weight(), u64::from(weight));
    }

    /// A config whose every step has weight 0 and no profile is rejected.
    #[test]
    fn prop_all_zero_weights_rejected(
        step_count in 1usize..5,
    ) {
        let mut toml_str = String::from("[settings]\nvirtual_users = 1\nduration_secs = 1\n");
        for i in 0..step_count {
            toml_str.push_str(&format!(
                "\n[[scenario]]\nname = \"step{i}\"\nweight = 0\npath = \"/step{i}\"\n"
            ));
        }
        let err = LoadTestConfig::from_toml(&toml_str).unwrap_err();
        let is_validation = matches!(err, LoadTestError::ConfigValidation { .. });
        prop_assert!(is_validation);
    }
}
