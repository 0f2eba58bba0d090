//! Property-based tests for run statistics invariants.

use proptest::prelude::*;
use std::time::Duration;

use svcload::loadtest::metrics::{RunStatistics, MAX_FAILURE_REASONS};
use svcload::loadtest::scenario::Outcome;

proptest! {
    /// Attempts equal successes plus failures; skipped executions are
    /// counted apart and never as attempts.
    #[test]
    fn counts_are_consistent(
        successes in 0u32..100,
        failures in 0u32..50,
        skipped in 0u32..20,
    ) {
        let stats = RunStatistics::new();
        for _ in 0..successes {
            stats.record("list users", &Outcome::Success, Duration::from_millis(5));
        }
        for _ in 0..failures {
            stats.record("list users", &Outcome::failure("Got status code 500"), Duration::from_millis(5));
        }
        for _ in 0..skipped {
            stats.record("list users", &Outcome::Skipped, Duration::ZERO);
        }

        let snap = stats.snapshot();
        prop_assert_eq!(snap.total_successes, u64::from(successes));
        prop_assert_eq!(snap.total_failures, u64::from(failures));
        prop_assert_eq!(snap.total_skipped, u64::from(skipped));
        prop_assert_eq!(snap.total_attempts, u64::from(successes + failures));
        prop_assert_eq!(stats.executions(), u64::from(successes + failures + skipped));
    }

    /// Failure rate is always between 0.0 and 1.0 inclusive.
    #[test]
    fn failure_rate_bounded(
        successes in 0u32..100,
        failures in 0u32..100,
    ) {
        let stats = RunStatistics::new();
        for _ in 0..successes {
            stats.record("get product", &Outcome::Success, Duration::from_millis(1));
        }
        for _ in 0..failures {
            stats.record("get product", &Outcome::failure("timeout"), Duration::from_millis(1));
        }
        let snap = stats.snapshot();
        prop_assert!(snap.failure_rate >= 0.0);
        prop_assert!(snap.failure_rate <= 1.0);
    }

    /// p50 <= p95 <= p99 and min <= max for any latency mix.
    #[test]
    fn percentiles_monotonic(
        latencies in prop::collection::vec(1u64..10_000, 1..200),
    ) {
        let stats = RunStatistics::new();
        for ms in &latencies {
            stats.record("search products", &Outcome::Success, Duration::from_millis(*ms));
        }
        let snap = stats.snapshot();
        let scenario = snap.scenario("search products").unwrap();
        prop_assert!(scenario.p50 <= scenario.p95);
        prop_assert!(scenario.p95 <= scenario.p99);
        prop_assert!(scenario.min <= scenario.max);
    }

    /// Only a bounded number of distinct failure reasons is kept per
    /// scenario, each with a positive count.
    #[test]
    fn failure_reasons_bounded(
        codes in prop::collection::vec(400u16..600, 1..100),
    ) {
        let stats = RunStatistics::new();
        for code in &codes {
            stats.record(
                "create user",
                &Outcome::failure(format!("Got status code {code}")),
                Duration::from_millis(3),
            );
        }
        let snap = stats.snapshot();
        let scenario = snap.scenario("create user").unwrap();
        prop_assert!(!scenario.failure_reasons.is_empty());
        prop_assert!(scenario.failure_reasons.len() <= MAX_FAILURE_REASONS);
        prop_assert!(scenario.failure_reasons.iter().all(|(_, count)| *count > 0));
    }
}
