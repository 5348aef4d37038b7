//! Scenario driver
//!
//! Builds the scenario matrix, runs every selected scenario against one
//! `SensorsSession` and records a `SuiteReport`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use collector::SensorsSession;
use contracts::{RateLevel, SensorType, SensorsHal, SharedMemType, SuiteConfig};
use observability::{record_scenario, record_suite_finished, MetricsSummary, SuiteMetricsAggregator};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::checker::checker_for;
use crate::context::ScenarioContext;
use crate::error::Result;
use crate::outcome::{Outcome, ScenarioStatus};
use crate::scenarios::{
    activation, batching, direct, flush, injection, isolation, rate_switch, sensor_list,
    staleness, streaming,
};

/// Sensor types with a per-type scenario row, by scenario name prefix.
pub const MATRIX_SENSORS: [(SensorType, &str); 3] = [
    (SensorType::Accelerometer, "accelerometer"),
    (SensorType::Gyroscope, "gyroscope"),
    (SensorType::MagneticField, "magnetometer"),
];

const STREAMING_PERIODS: [(&str, Duration); 3] = [
    ("slow", Duration::from_millis(200)),
    ("normal", Duration::from_millis(20)),
    ("fast", Duration::from_millis(5)),
];

const DIRECT_MEM_TYPES: [SharedMemType; 2] = [SharedMemType::Ashmem, SharedMemType::Gralloc];

const DIRECT_RATES: [(&str, RateLevel); 3] = [
    ("normal", RateLevel::Normal),
    ("fast", RateLevel::Fast),
    ("very_fast", RateLevel::VeryFast),
];

type ScenarioFn = Box<dyn Fn(&ScenarioContext<'_>) -> Result<Outcome> + Send + Sync>;

/// Named scenario.
pub struct Scenario {
    name: String,
    run: ScenarioFn,
}

impl Scenario {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&ScenarioContext<'_>) -> Result<Outcome> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario").field("name", &self.name).finish()
    }
}

/// The full scenario matrix in execution order.
pub fn scenario_matrix() -> Vec<Scenario> {
    let mut scenarios = vec![
        Scenario::new("sensor_list_valid", sensor_list::sensor_list_valid),
        Scenario::new("set_operation_mode", injection::set_operation_mode),
        Scenario::new("inject_sensor_event_data", injection::inject_sensor_event_data),
        Scenario::new("call_initialize_twice", isolation::call_initialize_twice),
        Scenario::new("activate", activation::activate),
        Scenario::new("batch", activation::batch),
        Scenario::new("flush_sensor", flush::flush_sensor),
        Scenario::new("flush_one_shot_sensor", flush::flush_one_shot_sensor),
        Scenario::new("flush_inactive_sensor", flush::flush_inactive_sensor),
        Scenario::new("flush_nonexistent_sensor", flush::flush_nonexistent_sensor),
        Scenario::new("no_stale_events", staleness::no_stale_events),
    ];

    for (sensor_type, prefix) in MATRIX_SENSORS {
        for (speed, period) in STREAMING_PERIODS {
            scenarios.push(Scenario::new(
                format!("{prefix}_streaming_operation_{speed}"),
                move |ctx: &ScenarioContext<'_>| {
                    streaming::run_streaming(ctx, sensor_type, period, &*checker_for(sensor_type))
                },
            ));
        }
        scenarios.push(Scenario::new(
            format!("{prefix}_sampling_period_hot_switch_operation"),
            move |ctx: &ScenarioContext<'_>| rate_switch::run_hot_switch(ctx, sensor_type),
        ));
        scenarios.push(Scenario::new(
            format!("{prefix}_batching_operation"),
            move |ctx: &ScenarioContext<'_>| batching::run_batching(ctx, sensor_type),
        ));
        for mem_type in DIRECT_MEM_TYPES {
            for (speed, rate) in DIRECT_RATES {
                scenarios.push(Scenario::new(
                    format!("{prefix}_{mem_type}_direct_report_operation_{speed}"),
                    move |ctx: &ScenarioContext<'_>| {
                        direct::run_direct_report(
                            ctx,
                            sensor_type,
                            mem_type,
                            rate,
                            &*checker_for(sensor_type),
                        )
                    },
                ));
            }
        }
    }
    scenarios
}

/// Record of one scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub status: ScenarioStatus,
    /// Skip reason or failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: f64,
}

/// Result of a suite run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: f64,
    /// Stopped before every selected scenario ran
    pub cancelled: bool,
    pub results: Vec<ScenarioReport>,
}

impl SuiteReport {
    pub fn count(&self, status: ScenarioStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn passed(&self) -> usize {
        self.count(ScenarioStatus::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(ScenarioStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(ScenarioStatus::Skipped)
    }

    /// Whether no scenario failed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn get(&self, name: &str) -> Option<&ScenarioReport> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioReport> {
        self.results
            .iter()
            .filter(|r| r.status == ScenarioStatus::Failed)
    }

    pub fn summary(&self) -> MetricsSummary {
        let mut aggregator = SuiteMetricsAggregator::new();
        for result in &self.results {
            aggregator.update(&result.name, result.status.as_str(), result.duration_ms);
        }
        aggregator.summary()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Conformance suite bound to one HAL.
pub struct ConformanceSuite {
    hal: Arc<dyn SensorsHal>,
    config: SuiteConfig,
    scenarios: Vec<Scenario>,
}

impl ConformanceSuite {
    /// Suite running the full scenario matrix.
    pub fn new(hal: Arc<dyn SensorsHal>, config: SuiteConfig) -> Self {
        Self::with_scenarios(hal, config, scenario_matrix())
    }

    pub fn with_scenarios(
        hal: Arc<dyn SensorsHal>,
        config: SuiteConfig,
        scenarios: Vec<Scenario>,
    ) -> Self {
        Self {
            hal,
            config,
            scenarios,
        }
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn scenario_names(&self) -> Vec<&str> {
        self.scenarios.iter().map(Scenario::name).collect()
    }

    /// Scenarios selected by the configured filter.
    pub fn selected(&self) -> Vec<&str> {
        self.scenario_names()
            .into_iter()
            .filter(|name| self.config.filter.selects(name))
            .collect()
    }

    pub fn run(&self) -> Result<SuiteReport> {
        self.run_with_cancel(&AtomicBool::new(false))
    }

    /// Run every selected scenario, checking `cancel` before each one.
    ///
    /// Fails only if the session cannot be connected; scenario failures and
    /// panics are recorded in the report.
    #[instrument(name = "suite_run", skip(self, cancel), fields(scenarios = self.scenarios.len()))]
    pub fn run_with_cancel(&self, cancel: &AtomicBool) -> Result<SuiteReport> {
        let started_at = Utc::now();
        let start = Instant::now();
        let session = SensorsSession::connect(self.hal.clone(), &self.config.session)?;

        let mut results = Vec::new();
        let mut cancelled = false;
        for scenario in &self.scenarios {
            if !self.config.filter.selects(&scenario.name) {
                continue;
            }
            if cancel.load(Ordering::Relaxed) {
                warn!(next = %scenario.name, "suite cancelled");
                cancelled = true;
                break;
            }
            let report = self.run_scenario(scenario, &session);
            record_scenario(report.status.as_str(), report.duration_ms);
            results.push(report);
        }

        let report = SuiteReport {
            started_at,
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
            cancelled,
            results,
        };
        record_suite_finished(
            report.passed() as u64,
            report.failed() as u64,
            report.skipped() as u64,
        );
        info!(
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped(),
            cancelled,
            "suite finished"
        );
        Ok(report)
    }

    fn run_scenario(&self, scenario: &Scenario, session: &SensorsSession) -> ScenarioReport {
        let start = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let ctx = ScenarioContext::new(&self.hal, session, &self.config);
            (scenario.run)(&ctx)
        }));
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        let (status, message) = match result {
            Ok(Ok(Outcome::Passed)) => (ScenarioStatus::Passed, None),
            Ok(Ok(Outcome::Skipped { reason })) => (ScenarioStatus::Skipped, Some(reason)),
            Ok(Err(e)) => (ScenarioStatus::Failed, Some(e.to_string())),
            Err(payload) => (
                ScenarioStatus::Failed,
                Some(format!("panicked: {}", panic_message(payload.as_ref()))),
            ),
        };
        match (&status, &message) {
            (ScenarioStatus::Failed, Some(message)) => {
                warn!(scenario = %scenario.name, duration_ms, %message, "scenario failed")
            }
            _ => info!(scenario = %scenario.name, %status, duration_ms, "scenario finished"),
        }

        ScenarioReport {
            name: scenario.name.clone(),
            status,
            message,
            duration_ms,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConformanceError;
    use contracts::{FilterConfig, SensorHandle};
    use mock_hal::MockSensorsHal;
    use std::collections::HashSet;

    fn mock() -> Arc<dyn SensorsHal> {
        Arc::new(MockSensorsHal::new().unwrap())
    }

    fn fast_config() -> SuiteConfig {
        let mut config = SuiteConfig::default();
        config.timeouts.flush_wait_ms = 200;
        config
    }

    #[test]
    fn test_matrix_names() {
        let matrix = scenario_matrix();
        assert_eq!(matrix.len(), 11 + 3 * 11);

        let names: HashSet<&str> = matrix.iter().map(Scenario::name).collect();
        assert_eq!(names.len(), matrix.len());
        for name in [
            "no_stale_events",
            "accelerometer_streaming_operation_fast",
            "gyroscope_sampling_period_hot_switch_operation",
            "magnetometer_batching_operation",
            "accelerometer_gralloc_direct_report_operation_very_fast",
        ] {
            assert!(names.contains(name), "{name} missing");
        }
    }

    #[test]
    fn test_filter_selection() {
        let mut config = fast_config();
        config.filter = FilterConfig {
            include: vec!["*_direct_report_*".into()],
            exclude: vec!["*_very_fast".into()],
        };
        let suite = ConformanceSuite::new(mock(), config);
        let selected = suite.selected();
        assert_eq!(selected.len(), 3 * 2 * 2);
        assert!(selected.iter().all(|n| !n.ends_with("very_fast")));
    }

    #[test]
    fn test_status_scenarios_pass_on_mock() {
        let mut config = fast_config();
        config.filter.include = vec![
            "sensor_list_valid".into(),
            "activate".into(),
            "batch".into(),
            "flush_*".into(),
        ];
        let report = ConformanceSuite::new(mock(), config).run().unwrap();
        assert_eq!(report.results.len(), 7);
        assert!(report.is_success(), "{:?}", report.failures().collect::<Vec<_>>());
        assert!(!report.cancelled);
    }

    #[test]
    fn test_failures_and_panics_are_recorded() {
        let scenarios = vec![
            Scenario::new("passes", |_: &ScenarioContext<'_>| Ok(Outcome::Passed)),
            Scenario::new("skips", |_: &ScenarioContext<'_>| {
                Ok(Outcome::skipped("nothing to do"))
            }),
            Scenario::new("fails", |_: &ScenarioContext<'_>| {
                Err(ConformanceError::NoEvents {
                    handle: SensorHandle::new(1),
                    window: "while testing",
                })
            }),
            Scenario::new("panics", |_: &ScenarioContext<'_>| panic!("boom")),
        ];
        let suite = ConformanceSuite::with_scenarios(mock(), fast_config(), scenarios);
        let report = suite.run().unwrap();

        assert_eq!((report.passed(), report.skipped(), report.failed()), (1, 1, 2));
        assert!(!report.is_success());
        assert_eq!(
            report.get("skips").and_then(|r| r.message.as_deref()),
            Some("nothing to do")
        );
        let panicked = report.get("panics").and_then(|r| r.message.clone()).unwrap();
        assert!(panicked.contains("boom"));

        let summary = report.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.failed, 2);
    }

    #[test]
    fn test_cancelled_before_start() {
        let suite = ConformanceSuite::new(mock(), fast_config());
        let report = suite.run_with_cancel(&AtomicBool::new(true)).unwrap();
        assert!(report.cancelled);
        assert!(report.results.is_empty());
    }

    #[test]
    fn test_report_json() {
        let report = SuiteReport {
            started_at: Utc::now(),
            duration_ms: 12.5,
            cancelled: false,
            results: vec![ScenarioReport {
                name: "activate".into(),
                status: ScenarioStatus::Passed,
                message: None,
                duration_ms: 12.5,
            }],
        };
        let json = report.to_json().unwrap();
        assert!(json.contains("\"status\": \"passed\""));
        assert!(!json.contains("message"));
        let back: SuiteReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.results, report.results);
    }
}
