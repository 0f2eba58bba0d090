//! JSON report serialization for run results.
//!
//! Produces a schema-versioned JSON report containing per-scenario counts,
//! latency percentiles, representative failure reasons, and the resolved
//! config for reproducibility. Designed for CI pipeline consumption.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::loadtest::config::{LoadTestConfig, CUSTOM_BEHAVIOR_NAME};
use crate::loadtest::engine::RunResult;
use crate::loadtest::metrics::ScenarioSnapshot;

/// Schema version for the JSON report format.
///
/// Increment when making breaking changes to the report structure.
const SCHEMA_VERSION: &str = "1.0";

/// Top-level JSON report structure.
#[derive(Debug, Serialize)]
pub struct LoadTestReport {
    /// Report format version for parser compatibility.
    pub schema_version: String,
    /// RFC 3339 timestamp when the report was generated.
    pub timestamp: String,
    /// Target base URL that was tested.
    pub target_url: String,
    /// Actual run duration in seconds.
    pub duration_secs: f64,
    /// Resolved configuration (with CLI overrides applied).
    pub config: ReportConfig,
    /// Aggregate counts over all scenarios.
    pub metrics: ReportMetrics,
    /// Per-scenario metrics keyed by scenario name.
    pub per_scenario: BTreeMap<String, ScenarioReportMetrics>,
}

/// Resolved run configuration embedded in the report.
#[derive(Debug, Serialize)]
pub struct ReportConfig {
    /// Built-in profile name, or `"custom"`.
    pub behavior: String,
    pub virtual_users: u32,
    /// Configured duration in seconds (not actual).
    pub duration_secs: u64,
    pub ramp_up_secs: u64,
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Declarative steps as JSON values for stable serialization.
    pub scenario: Vec<serde_json::Value>,
}

/// Aggregate metrics in the report.
#[derive(Debug, Serialize)]
pub struct ReportMetrics {
    pub attempts: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub skipped_count: u64,
    pub on_start_failures: u64,
    /// Failures as a fraction of attempts (0.0..=1.0).
    pub failure_rate: f64,
    /// Attempts per second over the actual duration.
    pub throughput_rps: f64,
    pub users_started: u32,
}

/// Metrics of one scenario in the report.
#[derive(Debug, Serialize)]
pub struct ScenarioReportMetrics {
    pub attempts: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub skipped_count: u64,
    pub failure_rate: f64,
    pub latency: LatencyMetrics,
    /// Representative failure reasons with occurrence counts.
    pub failures: Vec<FailureReason>,
}

/// Latency metrics in milliseconds.
#[derive(Debug, Serialize)]
pub struct LatencyMetrics {
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub mean_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct FailureReason {
    pub reason: String,
    pub count: u64,
}

impl From<&ScenarioSnapshot> for ScenarioReportMetrics {
    fn from(s: &ScenarioSnapshot) -> Self {
        Self {
            attempts: s.attempts,
            success_count: s.successes,
            failure_count: s.failures,
            skipped_count: s.skipped,
            failure_rate: s.failure_rate,
            latency: LatencyMetrics {
                p50_ms: s.p50,
                p95_ms: s.p95,
                p99_ms: s.p99,
                min_ms: s.min,
                max_ms: s.max,
                mean_ms: s.mean,
            },
            failures: s
                .failure_reasons
                .iter()
                .map(|(reason, count)| FailureReason {
                    reason: reason.clone(),
                    count: *count,
                })
                .collect(),
        }
    }
}

impl LoadTestReport {
    /// Build a report from a run result, the resolved config, and target URL.
    pub fn from_result(result: &RunResult, config: &LoadTestConfig, url: &str) -> Self {
        let snap = &result.snapshot;
        let elapsed_secs = result.elapsed.as_secs_f64();
        let throughput_rps = if elapsed_secs > 0.0 {
            snap.total_attempts as f64 / elapsed_secs
        } else {
            0.0
        };

        let scenario_values: Vec<serde_json::Value> = config
            .scenario
            .iter()
            .map(|step| serde_json::to_value(step).unwrap_or(serde_json::Value::Null))
            .collect();

        let per_scenario = snap
            .scenarios
            .iter()
            .map(|s| (s.name.clone(), ScenarioReportMetrics::from(s)))
            .collect();

        let settings = &config.settings;
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            target_url: url.to_string(),
            duration_secs: elapsed_secs,
            config: ReportConfig {
                behavior: settings
                    .profile
                    .map_or_else(|| CUSTOM_BEHAVIOR_NAME.to_string(), |p| p.to_string()),
                virtual_users: settings.virtual_users,
                duration_secs: settings.duration_secs,
                ramp_up_secs: settings.ramp_up_secs,
                timeout_ms: settings.timeout_ms,
                seed: settings.seed,
                scenario: scenario_values,
            },
            metrics: ReportMetrics {
                attempts: snap.total_attempts,
                success_count: snap.total_successes,
                failure_count: snap.total_failures,
                skipped_count: snap.total_skipped,
                on_start_failures: snap.on_start_failures,
                failure_rate: snap.failure_rate,
                throughput_rps,
                users_started: result.users_started,
            },
            per_scenario,
        }
    }
}

/// Write a JSON report file to the `.svcload/reports/` directory.
///
/// Creates the reports directory if it does not exist. The filename is
/// timestamped (see [`report_filename`]). Returns the path written.
pub fn write_report(report: &LoadTestReport, base_dir: &Path) -> Result<PathBuf, std::io::Error> {
    let reports_dir = base_dir.join(".svcload").join("reports");
    if !reports_dir.exists() {
        std::fs::create_dir_all(&reports_dir)?;
    }

    let report_path = reports_dir.join(report_filename(&chrono::Utc::now()));
    let json = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
    std::fs::write(&report_path, json)?;

    Ok(report_path)
}

/// Report filename for a given timestamp: `loadtest-YYYY-MM-DDTHH-MM-SS.json`
/// (hyphens, not colons, for Windows compatibility).
pub fn report_filename(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    format!("loadtest-{}.json", timestamp.format("%Y-%m-%dT%H-%M-%S"))
}
