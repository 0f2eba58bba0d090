//! k6-style terminal summary renderer for run results.
//!
//! [`render_summary`] is a pure function: it takes the run result and the
//! resolved config and returns a formatted [`String`]. Color coding goes
//! through the `colored` crate, which respects the global override set by
//! `colored::control::set_override(false)` when `--no-color` is active or
//! stdout is piped.

use colored::Colorize;

use crate::loadtest::config::{LoadTestConfig, CUSTOM_BEHAVIOR_NAME};
use crate::loadtest::engine::RunResult;
use crate::loadtest::metrics::ScenarioSnapshot;

/// Width for dotted metric row padding.
const PAD_WIDTH: usize = 40;

/// Widest scenario name shown in the per-scenario table.
const NAME_WIDTH: usize = 28;

/// Render a k6-style terminal summary.
///
/// # Layout
///
/// ```text
///           /\      |  svcload
///          /  \     |
///     /\  /    \    |  target:    http://localhost:8080
///    /  \/      \   |  vus:       10
///   /    \       \  |  duration:  60s
///  /      \       \ |  behavior:  user-service
///
///   svc_req_attempts............: 1000
///   svc_req_success_count.......: 950
///   svc_req_failure_count.......: 50
///   svc_req_failure_rate........: 5.0%
///   svc_req_skipped.............: 12
///   svc_req_throughput..........: 16.7 req/s
///   svc_req_elapsed.............: 60.0s
///
///   per-scenario metrics:
///   ...
///
///   failures:
///     list users > Got status code 500 (50)
/// ```
pub fn render_summary(result: &RunResult, config: &LoadTestConfig, url: &str) -> String {
    let snap = &result.snapshot;
    let mut lines = Vec::new();

    let behavior = config
        .settings
        .profile
        .map_or_else(|| CUSTOM_BEHAVIOR_NAME.to_string(), |p| p.to_string());
    lines.push(render_header(
        url,
        config.settings.virtual_users,
        config.settings.duration_secs,
        &behavior,
    ));

    lines.push(format_metric_row(
        "svc_req_attempts",
        &snap.total_attempts.to_string(),
        PAD_WIDTH,
    ));
    lines.push(format_metric_row(
        "svc_req_success_count",
        &snap.total_successes.to_string().green().to_string(),
        PAD_WIDTH,
    ));

    let failure_count = if snap.total_failures > 0 {
        snap.total_failures.to_string().red().to_string()
    } else {
        snap.total_failures.to_string()
    };
    lines.push(format_metric_row(
        "svc_req_failure_count",
        &failure_count,
        PAD_WIDTH,
    ));
    lines.push(format_metric_row(
        "svc_req_failure_rate",
        &colored_rate(snap.failure_rate * 100.0, 0),
        PAD_WIDTH,
    ));

    if snap.total_skipped > 0 {
        lines.push(format_metric_row(
            "svc_req_skipped",
            &snap.total_skipped.to_string().yellow().to_string(),
            PAD_WIDTH,
        ));
    }
    if snap.on_start_failures > 0 {
        lines.push(format_metric_row(
            "svc_on_start_failures",
            &snap.on_start_failures.to_string().red().to_string(),
            PAD_WIDTH,
        ));
    }

    let elapsed_secs = result.elapsed.as_secs_f64();
    lines.push(format_metric_row(
        "svc_req_throughput",
        &format!("{:.1} req/s", throughput(snap.total_attempts, elapsed_secs))
            .green()
            .to_string(),
        PAD_WIDTH,
    ));
    lines.push(format_metric_row(
        "svc_req_elapsed",
        &format!("{elapsed_secs:.1}s"),
        PAD_WIDTH,
    ));
    lines.push(format_metric_row(
        "svc_vus_started",
        &result.users_started.to_string(),
        PAD_WIDTH,
    ));

    if !snap.scenarios.is_empty() {
        lines.push(String::new());
        lines.push("  per-scenario metrics:".to_string());
        lines.push(String::new());
        lines.push(format!(
            "  {:<NAME_WIDTH$} {:>6} {:>6} {:>6} {} {:>7} {:>7} {}",
            "scenario", "reqs", "fails", "skip", "fail%", "p50", "p95", "p99"
        ));
        lines.push(format!("  {}", "\u{2500}".repeat(NAME_WIDTH + 52)));
        for scenario in &snap.scenarios {
            lines.push(render_scenario_row(scenario));
        }
    }

    let failing: Vec<&ScenarioSnapshot> = snap
        .scenarios
        .iter()
        .filter(|s| !s.failure_reasons.is_empty())
        .collect();
    if !failing.is_empty() {
        lines.push(String::new());
        lines.push("  failures:".to_string());
        for scenario in failing {
            for (reason, count) in &scenario.failure_reasons {
                lines.push(format!(
                    "    {} > {} ({})",
                    scenario.name,
                    reason,
                    count.to_string().red()
                ));
            }
        }
    }

    lines.join("\n")
}

fn render_scenario_row(scenario: &ScenarioSnapshot) -> String {
    let display_name = if scenario.name.chars().count() > NAME_WIDTH {
        let truncated: String = scenario.name.chars().take(NAME_WIDTH - 3).collect();
        format!("{truncated}...")
    } else {
        scenario.name.clone()
    };

    // Pad the plain text; escape codes count toward format widths.
    let p99 = format!("{:>7}", format!("{}ms", scenario.p99));
    let p99 = if scenario.p99 > 1000 {
        p99.yellow().to_string()
    } else {
        p99.green().to_string()
    };

    format!(
        "  {:<NAME_WIDTH$} {:>6} {:>6} {:>6} {} {:>7} {:>7} {}",
        display_name,
        scenario.attempts,
        scenario.failures,
        scenario.skipped,
        colored_rate(scenario.failure_rate * 100.0, 7),
        format!("{}ms", scenario.p50),
        format!("{}ms", scenario.p95),
        p99,
    )
}

/// Failure percentage right-aligned to `width`, colored green (≤1%),
/// yellow (≤5%) or red.
fn colored_rate(pct: f64, width: usize) -> String {
    let text = format!("{:>width$}", format!("{pct:.1}%"));
    if pct > 5.0 {
        text.red().to_string()
    } else if pct > 1.0 {
        text.yellow().to_string()
    } else {
        text.green().to_string()
    }
}

fn throughput(attempts: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        attempts as f64 / elapsed_secs
    } else {
        0.0
    }
}

/// Render the ASCII art header with run configuration details.
fn render_header(url: &str, vus: u32, duration_secs: u64, behavior: &str) -> String {
    format!(
        r#"
          /\      |  {}
         /  \     |
    /\  /    \    |  target:    {}
   /  \/      \   |  vus:       {}
  /    \       \  |  duration:  {}s
 /      \       \ |  behavior:  {}
"#,
        "svcload".bold(),
        url,
        vus,
        duration_secs,
        behavior,
    )
}

/// Format a single metric row with dot-padding.
///
/// Produces: `"  metric_name..................: value_string"`
fn format_metric_row(name: &str, value: &str, pad_width: usize) -> String {
    format!("  {name:.<pad_width$}: {value}")
}
