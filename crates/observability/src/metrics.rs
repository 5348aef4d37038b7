//! Suite metrics
//!
//! Thin helpers over the `metrics` facade plus an in-memory aggregator used
//! for the end-of-run summary.

use std::collections::HashMap;

use metrics::{counter, gauge, histogram};

/// Record delivered events of one kind (`data`, `flush_complete`, `info`).
pub fn record_events_received(kind: &'static str, count: u64) {
    if count > 0 {
        counter!("sensors_vts_events_received_total", "kind" => kind).increment(count);
    }
}

/// Record one finished scenario.
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_scenario;
///
/// let started = Instant::now();
/// let status = run(&scenario);
/// record_scenario(status.as_str(), started.elapsed().as_secs_f64() * 1000.0);
/// ```
pub fn record_scenario(status: &'static str, duration_ms: f64) {
    counter!("sensors_vts_scenarios_total", "status" => status).increment(1);
    histogram!("sensors_vts_scenario_duration_ms").record(duration_ms);
}

/// Record the totals of a finished run.
pub fn record_suite_finished(passed: u64, failed: u64, skipped: u64) {
    gauge!("sensors_vts_last_run_scenarios", "status" => "passed").set(passed as f64);
    gauge!("sensors_vts_last_run_scenarios", "status" => "failed").set(failed as f64);
    gauge!("sensors_vts_last_run_scenarios", "status" => "skipped").set(skipped as f64);
}

/// Scenario outcome aggregator
///
/// Tallies statuses and durations in memory for the run summary.
#[derive(Debug, Clone, Default)]
pub struct SuiteMetricsAggregator {
    /// Scenarios per status
    pub status_counts: HashMap<&'static str, u64>,

    /// Scenario durations (ms)
    pub duration_stats: RunningStats,

    /// Slowest scenario so far
    pub slowest: Option<(String, f64)>,
}

impl SuiteMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, name: &str, status: &'static str, duration_ms: f64) {
        *self.status_counts.entry(status).or_insert(0) += 1;
        self.duration_stats.push(duration_ms);

        let slower = self
            .slowest
            .as_ref()
            .is_none_or(|(_, slowest)| duration_ms > *slowest);
        if slower {
            self.slowest = Some((name.to_string(), duration_ms));
        }
    }

    fn count(&self, status: &str) -> u64 {
        self.status_counts.get(status).copied().unwrap_or(0)
    }

    pub fn summary(&self) -> MetricsSummary {
        let total = self.duration_stats.count();
        let passed = self.count("passed");
        let failed = self.count("failed");
        MetricsSummary {
            total,
            passed,
            failed,
            skipped: self.count("skipped"),
            pass_rate: if total > 0 {
                passed as f64 / (passed + failed).max(1) as f64 * 100.0
            } else {
                0.0
            },
            duration_ms: StatsSummary::from(&self.duration_stats),
            slowest: self.slowest.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Run summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    /// Passed share of the scenarios that were not skipped (%)
    pub pass_rate: f64,
    pub duration_ms: StatsSummary,
    pub slowest: Option<(String, f64)>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Conformance Summary ===")?;
        writeln!(f, "Scenarios: {}", self.total)?;
        writeln!(
            f,
            "Passed: {}  Failed: {}  Skipped: {} ({:.1}% pass)",
            self.passed, self.failed, self.skipped, self.pass_rate
        )?;
        writeln!(f, "Duration (ms): {}", self.duration_ms)?;
        if let Some((name, ms)) = &self.slowest {
            writeln!(f, "Slowest: {} ({:.0} ms)", name, ms)?;
        }
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = SuiteMetricsAggregator::new();
        aggregator.update("flush_sensor", "passed", 1200.0);
        aggregator.update("batch", "failed", 10.0);
        aggregator.update("magnetometer_streaming_operation_fast", "skipped", 0.5);
        aggregator.update("activate", "passed", 3.0);

        let summary = aggregator.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.slowest, Some(("flush_sensor".to_string(), 1200.0)));
        assert!((summary.pass_rate - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_display() {
        let summary = MetricsSummary {
            total: 10,
            passed: 8,
            failed: 1,
            skipped: 1,
            pass_rate: 88.888,
            duration_ms: StatsSummary {
                count: 10,
                min: 1.0,
                max: 5000.0,
                mean: 700.0,
                std_dev: 1500.0,
            },
            slowest: Some(("accelerometer_streaming_operation_slow".to_string(), 5000.0)),
        };

        let output = format!("{}", summary);
        assert!(output.contains("Scenarios: 10"));
        assert!(output.contains("88.9% pass"));
        assert!(output.contains("Slowest: accelerometer_streaming_operation_slow"));
    }
}
