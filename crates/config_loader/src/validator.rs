//! Suite configuration validation
//!
//! Rules:
//! - Per-field ranges declared on the contract types (`validator` derive)
//! - The direct report ring holds a full run at the fastest rate
//! - The staleness gap fits inside the quiescent interval
//! - Filter patterns are not empty

use contracts::{ContractError, RateLevel, SuiteConfig};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a parsed `SuiteConfig`.
///
/// Returns the first violation in field order.
pub fn validate(config: &SuiteConfig) -> Result<(), ContractError> {
    validate_ranges(config)?;
    validate_ring_capacity(config)?;
    validate_staleness(config)?;
    validate_filter(config)?;
    Ok(())
}

fn validate_ranges(config: &SuiteConfig) -> Result<(), ContractError> {
    let Err(errors) = config.validate() else {
        return Ok(());
    };
    let mut violations = Vec::new();
    flatten(&errors, "", &mut violations);
    violations.sort();
    let (field, message) = violations
        .into_iter()
        .next()
        .unwrap_or_else(|| ("config".to_string(), errors.to_string()));
    Err(ContractError::config_validation(field, message))
}

/// Collect `(path, message)` for every leaf violation.
fn flatten(errors: &ValidationErrors, prefix: &str, out: &mut Vec<(String, String)>) {
    for (key, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        };
        match kind {
            ValidationErrorsKind::Struct(nested) => flatten(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    flatten(nested, &format!("{path}[{index}]"), out);
                }
            }
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = match (error.params.get("min"), error.params.get("max")) {
                        (Some(min), Some(max)) => format!("must be within {min}..={max}"),
                        (Some(min), None) => format!("must be >= {min}"),
                        (None, Some(max)) => format!("must be <= {max}"),
                        (None, None) => format!("failed `{}` check", error.code),
                    };
                    out.push((path.clone(), message));
                }
            }
        }
    }
}

/// At 2.2 × the very fast rate the ring must not wrap within one run.
fn validate_ring_capacity(config: &SuiteConfig) -> Result<(), ContractError> {
    let direct = &config.direct_report;
    let total_secs = (direct.nominal_test_ms + direct.init_slack_ms) as f64 / 1000.0;
    let required = (f64::from(RateLevel::VeryFast.nominal_hz())
        * RateLevel::MAX_RATE_FACTOR
        * total_secs)
        .ceil() as usize;
    if direct.ring_capacity < required {
        return Err(ContractError::config_validation(
            "direct_report.ring_capacity",
            format!(
                "{} records cannot hold {:.1} s at the very fast rate, need {}",
                direct.ring_capacity, total_secs, required
            ),
        ));
    }
    Ok(())
}

fn validate_staleness(config: &SuiteConfig) -> Result<(), ContractError> {
    let staleness = &config.staleness;
    if staleness.min_gap_ms > staleness.quiescent_ms {
        return Err(ContractError::config_validation(
            "staleness.min_gap_ms",
            format!(
                "min_gap_ms ({}) must be <= quiescent_ms ({})",
                staleness.min_gap_ms, staleness.quiescent_ms
            ),
        ));
    }
    Ok(())
}

fn validate_filter(config: &SuiteConfig) -> Result<(), ContractError> {
    let filter = &config.filter;
    for (name, patterns) in [("include", &filter.include), ("exclude", &filter.exclude)] {
        if let Some(index) = patterns.iter().position(|p| p.trim().is_empty()) {
            return Err(ContractError::config_validation(
                format!("filter.{name}[{index}]"),
                "pattern cannot be empty",
            ));
        }
    }
    Ok(())
}
