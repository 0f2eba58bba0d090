//! Shared run statistics backed by HdrHistogram.
//!
//! [`RunStatistics`] is the one piece of mutable state shared by every
//! virtual user. Each [`RunStatistics::record`] call is a single
//! lock-guarded update, so counts are exact and a [`StatisticsSnapshot`]
//! taken mid-run is always internally consistent.
//!
//! Latencies are recorded in milliseconds, once per execution. Skipped
//! executions issue no request and carry no latency.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hdrhistogram::Histogram;
use parking_lot::Mutex;

use crate::loadtest::scenario::Outcome;

/// Distinct failure reasons kept per scenario. Further distinct reasons are
/// still counted as failures but not listed.
pub const MAX_FAILURE_REASONS: usize = 5;

/// Counters and latency histogram of one scenario.
struct ScenarioStats {
    histogram: Histogram<u64>,
    successes: u64,
    failures: u64,
    skipped: u64,
    failure_reasons: Vec<(String, u64)>,
}

impl ScenarioStats {
    fn new() -> Self {
        let mut histogram = Histogram::<u64>::new(3).expect("3 sigfigs is always valid");
        histogram.auto(true);

        Self {
            histogram,
            successes: 0,
            failures: 0,
            skipped: 0,
            failure_reasons: Vec::new(),
        }
    }

    fn note_failure_reason(&mut self, reason: &str) {
        if let Some((_, count)) = self.failure_reasons.iter_mut().find(|(r, _)| r == reason) {
            *count += 1;
        } else if self.failure_reasons.len() < MAX_FAILURE_REASONS {
            self.failure_reasons.push((reason.to_string(), 1));
        }
    }

    fn quantile(&self, q: f64) -> u64 {
        if self.histogram.is_empty() {
            return 0;
        }
        self.histogram.value_at_quantile(q)
    }

    fn snapshot(&self, name: &str) -> ScenarioSnapshot {
        let attempts = self.successes + self.failures;
        let failure_rate = if attempts == 0 {
            0.0
        } else {
            self.failures as f64 / attempts as f64
        };
        let (min, max, mean) = if self.histogram.is_empty() {
            (0, 0, 0.0)
        } else {
            (
                self.histogram.min(),
                self.histogram.max(),
                self.histogram.mean(),
            )
        };

        ScenarioSnapshot {
            name: name.to_string(),
            attempts,
            successes: self.successes,
            failures: self.failures,
            skipped: self.skipped,
            failure_rate,
            p50: self.quantile(0.50),
            p95: self.quantile(0.95),
            p99: self.quantile(0.99),
            min,
            max,
            mean,
            failure_reasons: self.failure_reasons.clone(),
        }
    }
}

#[derive(Default)]
struct StatsInner {
    scenarios: HashMap<String, ScenarioStats>,
    on_start_failures: u64,
}

/// Aggregate pass/fail counts and latencies for a run. Cloning shares the
/// same underlying statistics.
#[derive(Clone, Default)]
pub struct RunStatistics {
    inner: Arc<Mutex<StatsInner>>,
}

impl std::fmt::Debug for RunStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RunStatistics")
            .field("scenarios", &inner.scenarios.len())
            .field("on_start_failures", &inner.on_start_failures)
            .finish()
    }
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one execution of `scenario`.
    pub fn record(&self, scenario: &str, outcome: &Outcome, latency: Duration) {
        let ms = latency.as_millis() as u64;
        let mut inner = self.inner.lock();
        // Avoid allocating the key on the hot path once the scenario exists.
        if !inner.scenarios.contains_key(scenario) {
            inner
                .scenarios
                .insert(scenario.to_string(), ScenarioStats::new());
        }
        let Some(stats) = inner.scenarios.get_mut(scenario) else {
            return;
        };

        match outcome {
            Outcome::Success => {
                let _ = stats.histogram.record(ms);
                stats.successes += 1;
            },
            Outcome::Failure(reason) => {
                let _ = stats.histogram.record(ms);
                stats.failures += 1;
                stats.note_failure_reason(reason);
            },
            Outcome::Skipped => {
                stats.skipped += 1;
            },
        }
    }

    /// Discard everything recorded so far. Handles cloned earlier observe
    /// the cleared statistics.
    pub fn reset(&self) {
        *self.inner.lock() = StatsInner::default();
    }

    /// Count an on-start hook that failed or panicked.
    pub fn record_on_start_failure(&self) {
        self.inner.lock().on_start_failures += 1;
    }

    /// Total executions recorded so far, skipped ones included.
    pub fn executions(&self) -> u64 {
        self.inner
            .lock()
            .scenarios
            .values()
            .map(|s| s.successes + s.failures + s.skipped)
            .sum()
    }

    /// Point-in-time copy of all statistics. Scenarios are sorted by name.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let (mut scenarios, on_start_failures) = {
            let inner = self.inner.lock();
            let scenarios: Vec<ScenarioSnapshot> = inner
                .scenarios
                .iter()
                .map(|(name, stats)| stats.snapshot(name))
                .collect();
            (scenarios, inner.on_start_failures)
        };

        scenarios.sort_by(|a, b| a.name.cmp(&b.name));
        StatisticsSnapshot::from_scenarios(scenarios, on_start_failures)
    }
}

/// Statistics of one scenario at a point in time. Latencies are in
/// milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSnapshot {
    pub name: String,
    /// Successes plus failures. Skipped executions are not attempts.
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub skipped: u64,
    /// Failures as a fraction of attempts (0.0..=1.0).
    pub failure_rate: f64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    /// Up to [`MAX_FAILURE_REASONS`] distinct reasons, in order of first
    /// occurrence, with their counts.
    pub failure_reasons: Vec<(String, u64)>,
}

/// Statistics of a whole run at a point in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatisticsSnapshot {
    /// Per-scenario statistics, sorted by name.
    pub scenarios: Vec<ScenarioSnapshot>,
    pub total_attempts: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub total_skipped: u64,
    pub on_start_failures: u64,
    /// Failures as a fraction of all attempts (0.0..=1.0).
    pub failure_rate: f64,
}

impl StatisticsSnapshot {
    fn from_scenarios(scenarios: Vec<ScenarioSnapshot>, on_start_failures: u64) -> Self {
        let total_successes = scenarios.iter().map(|s| s.successes).sum();
        let total_failures: u64 = scenarios.iter().map(|s| s.failures).sum();
        let total_skipped = scenarios.iter().map(|s| s.skipped).sum();
        let total_attempts: u64 = scenarios.iter().map(|s| s.attempts).sum();
        let failure_rate = if total_attempts == 0 {
            0.0
        } else {
            total_failures as f64 / total_attempts as f64
        };

        Self {
            scenarios,
            total_attempts,
            total_successes,
            total_failures,
            total_skipped,
            on_start_failures,
            failure_rate,
        }
    }

    /// Statistics of the scenario called `name`, if it ever ran.
    pub fn scenario(&self, name: &str) -> Option<&ScenarioSnapshot> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// `true` when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty() && self.on_start_failures == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_new_statistics_are_empty() {
        let stats = RunStatistics::new();
        let snap = stats.snapshot();
        assert!(snap.is_empty());
        assert_eq!(snap.total_attempts, 0);
        assert_eq!(snap.failure_rate, 0.0);
    }

    #[test]
    fn test_reset_clears_shared_handles() {
        let stats = RunStatistics::new();
        let observer = stats.clone();
        stats.record("list users", &Outcome::Success, ms(10));
        stats.record_on_start_failure();

        stats.reset();
        assert!(observer.snapshot().is_empty());
        assert_eq!(observer.snapshot().on_start_failures, 0);

        stats.record("list users", &Outcome::Success, ms(10));
        assert_eq!(observer.snapshot().total_attempts, 1);
    }

    #[test]
    fn test_record_counts_by_outcome() {
        let stats = RunStatistics::new();
        stats.record("list users", &Outcome::Success, ms(10));
        stats.record("list users", &Outcome::Success, ms(20));
        stats.record("list users", &Outcome::failure("Got status code 500"), ms(30));
        stats.record("update user", &Outcome::Skipped, Duration::ZERO);

        let snap = stats.snapshot();
        let list = snap.scenario("list users").unwrap();
        assert_eq!(list.attempts, 3);
        assert_eq!(list.successes, 2);
        assert_eq!(list.failures, 1);
        assert!((list.failure_rate - 1.0 / 3.0).abs() < 1e-9);

        let update = snap.scenario("update user").unwrap();
        assert_eq!(update.attempts, 0);
        assert_eq!(update.skipped, 1);

        assert_eq!(snap.total_attempts, 3);
        assert_eq!(snap.total_skipped, 1);
        assert_eq!(stats.executions(), 4);
    }

    #[test]
    fn test_snapshot_sorted_by_name() {
        let stats = RunStatistics::new();
        for name in ["zeta", "alpha", "mid"] {
            stats.record(name, &Outcome::Success, ms(1));
        }
        let names: Vec<_> = stats
            .snapshot()
            .scenarios
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_failure_reasons_are_capped_and_counted() {
        let stats = RunStatistics::new();
        for i in 0..8 {
            stats.record("s", &Outcome::failure(format!("reason {i}")), ms(1));
        }
        stats.record("s", &Outcome::failure("reason 0"), ms(1));

        let snap = stats.snapshot();
        let s = snap.scenario("s").unwrap();
        assert_eq!(s.failures, 9);
        assert_eq!(s.failure_reasons.len(), MAX_FAILURE_REASONS);
        assert_eq!(s.failure_reasons[0], ("reason 0".to_string(), 2));
    }

    #[test]
    fn test_percentiles_known_distribution() {
        let stats = RunStatistics::new();
        for i in 1..=100 {
            stats.record("s", &Outcome::Success, ms(i));
        }
        let snap = stats.snapshot();
        let s = snap.scenario("s").unwrap();
        assert!((s.p50 as i64 - 50).abs() <= 1, "p50 was {}", s.p50);
        assert!((s.p95 as i64 - 95).abs() <= 1, "p95 was {}", s.p95);
        assert!((s.p99 as i64 - 99).abs() <= 1, "p99 was {}", s.p99);
        assert_eq!(s.min, 1);
        assert_eq!(s.max, 100);
    }

    #[test]
    fn test_on_start_failures_counted() {
        let stats = RunStatistics::new();
        stats.record_on_start_failure();
        stats.record_on_start_failure();
        let snap = stats.snapshot();
        assert_eq!(snap.on_start_failures, 2);
        assert!(!snap.is_empty());
        assert!(snap.scenarios.is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let stats = RunStatistics::new();
        let other = stats.clone();
        other.record("s", &Outcome::Success, ms(5));
        assert_eq!(stats.snapshot().total_successes, 1);
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let stats = RunStatistics::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        stats.record("s", &Outcome::Success, ms(1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.snapshot().total_successes, 4_000);
    }
}
