//! `run` command implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use conformance::{ConformanceSuite, ScenarioStatus, SuiteReport};
use config_loader::ConfigLoader;
use contracts::SuiteConfig;
use mock_hal::{MockConfig, MockSensorsHal};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;

/// Execute the `run` command
pub async fn run_suite(args: &RunArgs) -> Result<()> {
    let config = load_config(args)?;

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!(port = args.metrics_port, "Metrics endpoint available");
    }

    let hal = MockSensorsHal::with_config(MockConfig::with_faults(&args.faults))
        .map_err(CliError::from)?;
    let suite = ConformanceSuite::new(Arc::new(hal), config);
    info!(
        selected = suite.selected().len(),
        faults = ?args.faults,
        "Starting conformance suite"
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let mut task = tokio::task::spawn_blocking({
        let cancel = cancel.clone();
        move || suite.run_with_cancel(&cancel)
    });

    let joined = tokio::select! {
        joined = &mut task => joined,
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, finishing current scenario...");
            cancel.store(true, Ordering::Relaxed);
            task.await
        }
    };
    let report = joined
        .context("Suite task panicked")?
        .context("Suite could not start")?;

    if args.json {
        println!("{}", report.to_json().context("Failed to serialize report")?);
    } else {
        print_report(&report);
    }
    if let Some(path) = &args.report {
        let json = report.to_json().context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Report written");
    }

    check_report(&report)?;
    info!("sensors-vts finished");
    Ok(())
}

/// Defaults or the config file, then CLI filter overrides, then validation.
fn load_config(args: &RunArgs) -> Result<SuiteConfig> {
    let mut config = match &args.config {
        Some(path) if !path.exists() => {
            return Err(CliError::config_not_found(path.display().to_string()).into())
        }
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            ConfigLoader::load_from_path(path).map_err(CliError::from)?
        }
        None => SuiteConfig::default(),
    };

    if !args.filter.is_empty() {
        config.filter.include = args.filter.clone();
    }
    config.filter.exclude.extend(args.exclude.iter().cloned());
    ConfigLoader::validate(&config).map_err(CliError::from)?;
    Ok(config)
}

fn check_report(report: &SuiteReport) -> crate::error::Result<()> {
    if report.cancelled {
        return Err(CliError::Cancelled {
            completed: report.results.len(),
        });
    }
    if !report.is_success() {
        return Err(CliError::ScenariosFailed {
            failed: report.failed(),
            total: report.results.len(),
        });
    }
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn print_report(report: &SuiteReport) {
    println!("\n=== Scenarios ===\n");
    for result in &report.results {
        let mark = match result.status {
            ScenarioStatus::Passed => "PASS",
            ScenarioStatus::Skipped => "SKIP",
            ScenarioStatus::Failed => "FAIL",
        };
        match &result.message {
            Some(message) => println!(
                "  [{mark}] {} ({:.0} ms): {message}",
                result.name, result.duration_ms
            ),
            None => println!("  [{mark}] {} ({:.0} ms)", result.name, result.duration_ms),
        }
    }
    println!("\n{}", report.summary());
    if report.cancelled {
        println!("Run cancelled before all scenarios completed.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock_hal::MockFault;
    use std::io::Write;

    fn args(filter: &[&str]) -> RunArgs {
        RunArgs {
            filter: filter.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_cli_filter_overrides_config() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"[filter]\ninclude = [\"batch\"]\nexclude = [\"*_fast\"]\n")
            .unwrap();

        let mut run_args = args(&["activate"]);
        run_args.config = Some(file.path().to_path_buf());
        run_args.exclude = vec!["*_slow".into()];
        let config = load_config(&run_args).unwrap();
        assert_eq!(config.filter.include, vec!["activate"]);
        assert_eq!(config.filter.exclude, vec!["*_fast", "*_slow"]);
    }

    #[test]
    fn test_missing_config_file() {
        let mut run_args = args(&[]);
        run_args.config = Some("/nonexistent/sensors-vts.toml".into());
        let err = load_config(&run_args).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_run_healthy_subset() {
        run_suite(&args(&["sensor_list_valid", "activate", "batch"]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_reports_failure() {
        let mut run_args = args(&["activate"]);
        run_args.faults = vec![MockFault::AcceptInvalidHandles];
        let err = run_suite(&run_args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::ScenariosFailed { failed: 1, total: 1 })
        ));
    }

    #[tokio::test]
    async fn test_run_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut run_args = args(&["sensor_list_valid"]);
        run_args.report = Some(path.clone());
        run_suite(&run_args).await.unwrap();

        let report: SuiteReport =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(report.passed(), 1);
    }
}
