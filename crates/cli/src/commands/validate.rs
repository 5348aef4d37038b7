//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::SuiteConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<SuiteConfig>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            config: None,
        };
    }

    match ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                config: Some(config),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            config: None,
        },
    }
}

/// Non-fatal issues: settings that make healthy HALs fail or skip.
fn collect_warnings(config: &SuiteConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.streaming.duration_ms < 1000 {
        warnings.push(format!(
            "streaming.duration_ms = {} yields few samples at the slow rate",
            config.streaming.duration_ms
        ));
    }
    if config.timeouts.flush_wait_ms < 100 {
        warnings.push("timeouts.flush_wait_ms below 100 ms may miss flush markers".to_string());
    }
    if config.hot_switch.settle_ms == 0 {
        warnings.push("hot_switch.settle_ms = 0 mixes samples from both periods".to_string());
    }
    let selected = conformance::scenario_matrix()
        .iter()
        .filter(|s| config.filter.selects(s.name()))
        .count();
    if selected == 0 {
        warnings.push("filter selects no scenario".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref config) = result.config {
            println!("\n  Flush wait: {} ms", config.timeouts.flush_wait_ms);
            println!("  Streaming duration: {} ms", config.streaming.duration_ms);
            println!(
                "  Direct report: {} ms + {} ms slack, {} records",
                config.direct_report.nominal_test_ms,
                config.direct_report.init_slack_ms,
                config.direct_report.ring_capacity
            );
            if !config.filter.include.is_empty() {
                println!("  Include: {}", config.filter.include.join(", "));
            }
            if !config.filter.exclude.is_empty() {
                println!("  Exclude: {}", config.filter.exclude.join(", "));
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
