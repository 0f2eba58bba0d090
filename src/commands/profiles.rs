//! `svcload profiles` command implementation.

use colored::Colorize;

use svcload::profiles::Profile;

/// Print every built-in profile with its pacing and weighted scenarios.
pub fn execute_profiles() {
    for profile in Profile::ALL {
        println!("{}", render_profile(profile));
    }
}

fn render_profile(profile: Profile) -> String {
    let (min_ms, max_ms) = profile.wait_bounds_ms();
    let mut lines = vec![
        format!("{}  {}", profile.name().bold(), profile.description()),
        format!("  wait: {min_ms}-{max_ms} ms"),
    ];

    match profile.build() {
        Ok(behavior) => {
            let registry = behavior.registry();
            for scenario in registry.iter() {
                lines.push(format!(
                    "  {:>3}/{:<3} {}",
                    scenario.weight(),
                    registry.total_weight(),
                    scenario.name()
                ));
            }
        },
        Err(e) => lines.push(format!("  {}", e.to_string().red())),
    }

    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_profile_lists_scenarios() {
        colored::control::set_override(false);
        let output = render_profile(Profile::ProductService);
        assert!(output.starts_with("product-service"));
        assert!(output.contains("wait: 1000-5000 ms"));
        assert!(output.contains("  2/4   list products"));
        assert!(output.contains("search products"));
    }
}
