//! # Integration Tests
//!
//! Cross-crate end-to-end tests.
//!
//! Responsibilities:
//! - Contract snapshot tests
//! - Full suite runs against the healthy reference HAL
//! - Fault detection: every injected contract violation fails its scenario

#[cfg(test)]
mod contract_tests {
    use contracts::{DirectReportRecord, SensorEvent, SensorHandle, SensorType, Vec3};

    #[test]
    fn test_direct_record_layout() {
        assert_eq!(DirectReportRecord::SIZE, 104);
    }

    #[test]
    fn test_event_json_shape() {
        let event = SensorEvent::vec3(
            SensorHandle::new(1),
            SensorType::Accelerometer,
            42,
            Vec3::new(0.0, 0.0, 9.8),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["sensor_handle"], 1);
        assert_eq!(json["sensor_type"], "accelerometer");
        assert!(json["payload"]["vec3"].is_object());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use conformance::{ConformanceSuite, ScenarioStatus, SuiteReport};
    use contracts::{SensorsHal, SuiteConfig};
    use mock_hal::{MockConfig, MockFault, MockSensorsHal};

    /// Defaults shortened so a full matrix finishes in well under a minute.
    fn quick_config() -> SuiteConfig {
        let mut config = SuiteConfig::default();
        config.timeouts.flush_wait_ms = 500;
        config.streaming.duration_ms = 1000;
        config.hot_switch.settle_ms = 200;
        config.hot_switch.sample_count = 5;
        config.direct_report.nominal_test_ms = 300;
        config.direct_report.init_slack_ms = 100;
        config
    }

    fn run(faults: &[MockFault], include: &[&str]) -> SuiteReport {
        let mut config = quick_config();
        config.filter.include = include.iter().map(|s| s.to_string()).collect();
        let hal: Arc<dyn SensorsHal> =
            Arc::new(MockSensorsHal::with_config(MockConfig::with_faults(faults)).unwrap());
        ConformanceSuite::new(hal, config).run().unwrap()
    }

    fn status(report: &SuiteReport, name: &str) -> ScenarioStatus {
        report
            .get(name)
            .unwrap_or_else(|| panic!("{name} did not run"))
            .status
    }

    #[test]
    fn test_quick_config_is_valid() {
        ConfigLoader::validate(&quick_config()).unwrap();
    }

    /// Every scenario passes or skips against the healthy reference HAL.
    #[test]
    fn test_full_matrix_on_healthy_hal() {
        let report = run(&[], &[]);
        let failures: Vec<_> = report.failures().collect();
        assert!(failures.is_empty(), "{failures:#?}");
        assert_eq!(report.results.len(), 44);

        for name in [
            "sensor_list_valid",
            "set_operation_mode",
            "inject_sensor_event_data",
            "call_initialize_twice",
            "activate",
            "batch",
            "flush_sensor",
            "flush_one_shot_sensor",
            "flush_inactive_sensor",
            "flush_nonexistent_sensor",
            "no_stale_events",
            "accelerometer_streaming_operation_fast",
            "gyroscope_sampling_period_hot_switch_operation",
            "magnetometer_batching_operation",
            "accelerometer_gralloc_direct_report_operation_very_fast",
            "magnetometer_ashmem_direct_report_operation_fast",
        ] {
            assert_eq!(status(&report, name), ScenarioStatus::Passed, "{name}");
        }

        // optional capabilities the reference magnetometer lacks
        for name in [
            "magnetometer_streaming_operation_fast",
            "magnetometer_gralloc_direct_report_operation_normal",
            "magnetometer_ashmem_direct_report_operation_very_fast",
        ] {
            assert_eq!(status(&report, name), ScenarioStatus::Skipped, "{name}");
        }
    }

    #[test]
    fn test_dropped_flush_markers_detected() {
        let report = run(&[MockFault::DropFlushMarkers], &["flush_sensor"]);
        assert_eq!(status(&report, "flush_sensor"), ScenarioStatus::Failed);
    }

    #[test]
    fn test_duplicated_flush_markers_detected() {
        let report = run(&[MockFault::DuplicateFlushMarkers], &["flush_sensor"]);
        assert_eq!(status(&report, "flush_sensor"), ScenarioStatus::Failed);
        let message = report.get("flush_sensor").and_then(|r| r.message.clone()).unwrap();
        assert!(message.contains("flush-complete"), "{message}");
    }

    #[test]
    fn test_stale_replay_detected() {
        let report = run(&[MockFault::ReplayStaleEvents], &["no_stale_events"]);
        assert_eq!(status(&report, "no_stale_events"), ScenarioStatus::Failed);
    }

    #[test]
    fn test_accepting_invalid_handles_detected() {
        let report = run(
            &[MockFault::AcceptInvalidHandles],
            &["activate", "batch", "flush_nonexistent_sensor"],
        );
        assert_eq!(report.failed(), 3);
    }

    #[test]
    fn test_biased_accelerometer_detected() {
        let report = run(
            &[MockFault::AccelerometerBias],
            &["accelerometer_streaming_operation_normal", "gyroscope_streaming_operation_normal"],
        );
        assert_eq!(
            status(&report, "accelerometer_streaming_operation_normal"),
            ScenarioStatus::Failed
        );
        assert_eq!(
            status(&report, "gyroscope_streaming_operation_normal"),
            ScenarioStatus::Passed
        );
    }

    #[test]
    fn test_ignored_reinitialize_detected() {
        let report = run(&[MockFault::IgnoreReinitialize], &["call_initialize_twice"]);
        assert_eq!(status(&report, "call_initialize_twice"), ScenarioStatus::Failed);
    }

    #[test]
    fn test_rejected_direct_channel_detected() {
        let report = run(
            &[MockFault::RejectDirectChannels],
            &["accelerometer_ashmem_direct_report_operation_normal"],
        );
        assert!(!report.is_success());
    }

    #[test]
    fn test_suite_from_config_file_text() {
        let toml = r#"
[timeouts]
flush_wait_ms = 300

[filter]
include = ["flush_*"]
exclude = ["flush_nonexistent_sensor"]
"#;
        let config = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let hal: Arc<dyn SensorsHal> = Arc::new(MockSensorsHal::new().unwrap());
        let suite = ConformanceSuite::new(hal, config);
        assert_eq!(suite.selected().len(), 3);

        let report = suite.run().unwrap();
        assert!(report.is_success());
        assert_eq!(report.passed(), 3);
    }

    #[tokio::test]
    async fn test_cancel_between_scenarios() {
        let mut config = quick_config();
        config.filter.include = vec!["flush_*".into()];
        let hal: Arc<dyn SensorsHal> = Arc::new(MockSensorsHal::new().unwrap());
        let suite = ConformanceSuite::new(hal, config);

        let cancel = Arc::new(AtomicBool::new(false));
        let task = tokio::task::spawn_blocking({
            let cancel = cancel.clone();
            move || suite.run_with_cancel(&cancel)
        });
        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.store(true, Ordering::Relaxed);

        let report = task.await.unwrap().unwrap();
        assert!(report.cancelled);
        assert!(report.results.len() < 4);
        assert!(report.is_success());
    }
}
