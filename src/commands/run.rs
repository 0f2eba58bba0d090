//! `svcload run` command implementation.

use anyhow::Result;
use std::io::IsTerminal;
use std::path::PathBuf;

use svcload::loadtest::config::LoadTestConfig;
use svcload::loadtest::engine::RunController;
use svcload::loadtest::report::{write_report, LoadTestReport};
use svcload::loadtest::summary::render_summary;
use svcload::profiles::Profile;

use super::RunArgs;

/// Execute the `run` command.
///
/// Resolves the config (explicit path, auto-discovery, or a bare profile),
/// applies CLI overrides, runs the controller, and prints the summary.
pub async fn execute_run(args: RunArgs) -> Result<()> {
    let mut config = resolve_config(args.config.as_ref(), args.profile)?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    let mut controller = RunController::from_config(&config, &args.url)?
        .with_signal_handling(true);
    if let Some(n) = args.iterations {
        controller = controller.with_iterations(n);
    }

    let settings = &config.settings;
    eprintln!(
        "Running '{}' with {} virtual users for {}s against {}",
        controller.behavior().name(),
        settings.virtual_users,
        settings.duration_secs,
        args.url
    );

    let result = controller
        .run(settings.virtual_users, settings.duration(), settings.ramp_up())
        .await;

    // Set color override based on --no-color flag and TTY detection
    if args.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let summary = render_summary(&result, &config, &args.url);
    println!("{summary}");

    if !args.no_report {
        let report = LoadTestReport::from_result(&result, &config, &args.url);
        let cwd = std::env::current_dir()?;
        match write_report(&report, &cwd) {
            Ok(path) => {
                eprintln!();
                eprintln!("Report written to: {}", path.display());
            },
            Err(e) => {
                eprintln!();
                eprintln!("Warning: Failed to write report: {}", e);
            },
        }
    }

    Ok(())
}

/// Pick the config to run.
///
/// An explicit `--config` must exist. Otherwise the discovered file is
/// used, and without one a `--profile` alone is enough.
fn resolve_config(
    config_path: Option<&PathBuf>,
    profile: Option<Profile>,
) -> Result<LoadTestConfig> {
    let config_file = match config_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: {}\nUse `svcload init` to create one.",
                    path.display()
                );
            }
            path.clone()
        },
        None => match (discover_config(), profile) {
            (Some(path), _) => path,
            (None, Some(profile)) => {
                eprintln!("No loadtest config found, running profile '{profile}' with defaults");
                return Ok(LoadTestConfig::for_profile(profile));
            },
            (None, None) => {
                anyhow::bail!(
                    "No loadtest config found.\n\
                     Run `svcload init` to create .svcload/loadtest.toml,\n\
                     use `--config path/to/file.toml` to specify one,\n\
                     or pick a built-in profile with `--profile` (see `svcload profiles`)."
                );
            },
        },
    };

    eprintln!("Loading config from: {}", config_file.display());
    LoadTestConfig::load(&config_file)
        .map_err(|e| anyhow::anyhow!("Failed to load config '{}': {}", config_file.display(), e))
}

/// Apply CLI flag overrides to a loaded config.
fn apply_overrides(config: &mut LoadTestConfig, args: &RunArgs) {
    let settings = &mut config.settings;
    if let Some(v) = args.vus {
        settings.virtual_users = v;
    }
    if let Some(d) = args.duration {
        settings.duration_secs = d;
    }
    if let Some(r) = args.ramp_up {
        settings.ramp_up_secs = r;
    }
    if let Some(seed) = args.seed {
        settings.seed = Some(seed);
    }
    if let Some(profile) = args.profile {
        settings.profile = Some(profile);
    }
}

/// Discover `.svcload/loadtest.toml` by walking parent directories.
///
/// Starts from the current working directory and walks up until either
/// the file is found or the filesystem root is reached.
fn discover_config() -> Option<PathBuf> {
    let dir = std::env::current_dir().ok()?;
    discover_config_from(dir)
}

fn discover_config_from(mut dir: PathBuf) -> Option<PathBuf> {
    loop {
        let candidate = dir.join(".svcload").join("loadtest.toml");
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}
