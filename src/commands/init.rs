//! `svcload init` command implementation.

use anyhow::Result;
use std::path::Path;

use svcload::profiles::Profile;

/// Execute the `init` command.
///
/// Creates `.svcload/loadtest.toml` under `base_dir`. Refuses to replace an
/// existing file unless `force` is set.
pub fn execute_init(base_dir: &Path, profile: Option<Profile>, force: bool) -> Result<()> {
    let config_dir = base_dir.join(".svcload");
    let config_path = config_dir.join("loadtest.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}\n\
             Use `--force` to overwrite.",
            config_path.display()
        );
    }

    let content = match profile {
        Some(profile) => generate_profile_template(profile),
        None => generate_default_template(),
    };

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    std::fs::write(&config_path, &content)?;
    eprintln!("Created {}", config_path.display());
    eprintln!("Edit the file to customize your load test.");

    Ok(())
}

const SETTINGS_HEADER: &str = r#"# Load test configuration for svcload
# The target URL is given on the command line: svcload run http://localhost:8080

[settings]
# Number of concurrent virtual users
virtual_users = 10

# Test duration in seconds
duration_secs = 60

# Virtual users are started evenly over this many seconds
ramp_up_secs = 10

# Per-request timeout in milliseconds
timeout_ms = 5000

# Fixed seed for reproducible scenario selection
# seed = 42
"#;

/// Generate a TOML template with gateway list steps and no profile.
fn generate_default_template() -> String {
    format!(
        r#"{SETTINGS_HEADER}
# Pause between scenarios of one virtual user
[settings.wait_time]
min_ms = 1000
max_ms = 3000

# Each step is one weighted request. Weights set the relative frequency.
# `expect` is optional; without it any status below 400 passes.

[[scenario]]
name = "list users"
weight = 4
method = "GET"
path = "/user-service/api/users"
expect = {{ status = [200], json_key = "collection" }}

[[scenario]]
name = "list products"
weight = 4
path = "/product-service/api/products"
expect = {{ status = [200], json_key = "collection" }}

[[scenario]]
name = "list orders"
weight = 4
path = "/order-service/api/orders"
expect = {{ status = [200], json_key = "collection" }}

# [[scenario]]
# name = "place order"
# weight = 1
# method = "POST"
# path = "/order-service/api/orders"
# body = {{ userId = 1, productId = 2, quantity = 1 }}
# expect = {{ status = [200, 201] }}
"#
    )
}

/// Generate a TOML template running a built-in profile.
fn generate_profile_template(profile: Profile) -> String {
    let (min_ms, max_ms) = profile.wait_bounds_ms();
    format!(
        r#"{SETTINGS_HEADER}
# Built-in user class: {description}
profile = "{profile}"

# Override the profile's pause between scenarios
# [settings.wait_time]
# min_ms = {min_ms}
# max_ms = {max_ms}

# Extra steps run next to the profile's own scenarios.
# [[scenario]]
# name = "health check"
# weight = 1
# path = "/actuator/health"
"#,
        description = profile.description(),
    )
}
