//! `list` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use conformance::ConformanceSuite;
use contracts::{SensorDescriptor, SensorsHal, SuiteConfig};
use mock_hal::MockSensorsHal;
use serde::Serialize;
use tracing::info;

use crate::cli::ListArgs;
use crate::error::CliError;

/// Sensor entry for JSON output
#[derive(Serialize)]
struct SensorInfo {
    handle: i32,
    name: String,
    sensor_type: String,
    reporting_mode: String,
    min_delay_us: i32,
    max_delay_us: i32,
    fifo_reserved: u32,
    fifo_max: u32,
    wake_up: bool,
    data_injection: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_direct_rate: Option<String>,
}

impl From<&SensorDescriptor> for SensorInfo {
    fn from(sensor: &SensorDescriptor) -> Self {
        Self {
            handle: sensor.handle.raw(),
            name: sensor.name.clone(),
            sensor_type: sensor.sensor_type.to_string(),
            reporting_mode: format!("{:?}", sensor.reporting_mode()),
            min_delay_us: sensor.min_delay_us,
            max_delay_us: sensor.max_delay_us,
            fifo_reserved: sensor.fifo_reserved_event_count,
            fifo_max: sensor.fifo_max_event_count,
            wake_up: sensor.is_wake_up(),
            data_injection: sensor.supports_data_injection(),
            max_direct_rate: sensor.max_direct_rate().map(|r| format!("{r:?}")),
        }
    }
}

/// Execute the `list` command
pub fn run_list(args: &ListArgs) -> Result<()> {
    let hal = MockSensorsHal::new().map_err(CliError::from)?;

    if args.scenarios {
        let suite = ConformanceSuite::new(Arc::new(hal), SuiteConfig::default());
        let names = suite.scenario_names();
        info!(scenarios = names.len(), "Listing scenarios");
        if args.json {
            let json = serde_json::to_string_pretty(&names)
                .context("Failed to serialize scenario names")?;
            println!("{json}");
        } else {
            for name in names {
                println!("{name}");
            }
        }
        return Ok(());
    }

    let sensors: Vec<SensorInfo> = hal.get_sensors_list().iter().map(SensorInfo::from).collect();
    info!(sensors = sensors.len(), "Listing sensors");
    if args.json {
        let json =
            serde_json::to_string_pretty(&sensors).context("Failed to serialize sensor list")?;
        println!("{json}");
    } else {
        print_sensors(&sensors);
    }
    Ok(())
}

fn print_sensors(sensors: &[SensorInfo]) {
    println!("\n=== Sensors ({}) ===\n", sensors.len());
    for sensor in sensors {
        println!(
            "  0x{:08x}  {:<22} {:<20} {:<10} delay {}..{} us, fifo {}/{}",
            sensor.handle,
            sensor.name,
            sensor.sensor_type,
            sensor.reporting_mode,
            sensor.min_delay_us,
            sensor.max_delay_us,
            sensor.fifo_reserved,
            sensor.fifo_max
        );
        let mut traits = Vec::new();
        if sensor.wake_up {
            traits.push("wake-up".to_string());
        }
        if sensor.data_injection {
            traits.push("injection".to_string());
        }
        if let Some(rate) = &sensor.max_direct_rate {
            traits.push(format!("direct up to {rate}"));
        }
        if !traits.is_empty() {
            println!("              {}", traits.join(", "));
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock_hal::default_catalog;

    #[test]
    fn test_sensor_info() {
        let catalog = default_catalog();
        let accel = SensorInfo::from(&catalog[0]);
        assert_eq!(accel.handle, 1);
        assert_eq!(accel.sensor_type, "accelerometer");
        assert!(accel.data_injection);
        assert_eq!(accel.max_direct_rate.as_deref(), Some("VeryFast"));

        let json = serde_json::to_value(SensorInfo::from(&catalog[3])).unwrap();
        assert!(json.get("max_direct_rate").is_none());
    }

    #[test]
    fn test_list_runs() {
        run_list(&ListArgs::default()).unwrap();
        run_list(&ListArgs {
            scenarios: true,
            json: true,
        })
        .unwrap();
    }
}
