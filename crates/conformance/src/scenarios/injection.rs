//! Operation mode and data injection scenarios

use std::thread;
use std::time::Duration;

use contracts::{elapsed_realtime_nanos, OperationMode, SensorEvent, SensorType, Vec3};
use tracing::{debug, instrument};

use crate::context::ScenarioContext;
use crate::error::{require_ok, Result};
use crate::outcome::Outcome;

/// Sensor types the injection scenario feeds.
const INJECTED_TYPES: [SensorType; 3] = [
    SensorType::Accelerometer,
    SensorType::Gyroscope,
    SensorType::MagneticField,
];

/// NORMAL, DATA_INJECTION and back to NORMAL must all be accepted when any
/// sensor supports injection.
pub fn set_operation_mode(ctx: &ScenarioContext<'_>) -> Result<Outcome> {
    if ctx.catalog.injectable().is_empty() {
        return Ok(Outcome::skipped("no sensor supports data injection"));
    }
    let mut guard = ctx.guard();
    for mode in [
        OperationMode::Normal,
        OperationMode::DataInjection,
        OperationMode::Normal,
    ] {
        require_ok("set_operation_mode", format!("{mode:?}"), guard.set_operation_mode(mode))?;
    }
    Ok(Outcome::Passed)
}

/// Inject one vec3 sample into every injection-capable motion sensor.
#[instrument(name = "inject_sensor_event_data", skip(ctx))]
pub fn inject_sensor_event_data(ctx: &ScenarioContext<'_>) -> Result<Outcome> {
    let targets: Vec<_> = ctx
        .catalog
        .injectable()
        .into_iter()
        .filter(|s| INJECTED_TYPES.contains(&s.sensor_type))
        .collect();
    if targets.is_empty() {
        return Ok(Outcome::skipped("no injectable motion sensor"));
    }

    let mut guard = ctx.guard();
    require_ok(
        "set_operation_mode",
        "DataInjection",
        guard.set_operation_mode(OperationMode::DataInjection),
    )?;

    let delay = Duration::from_millis(ctx.config.injection.delay_ms);
    for sensor in &targets {
        thread::sleep(delay);
        let event = SensorEvent::vec3(
            sensor.handle,
            sensor.sensor_type,
            elapsed_realtime_nanos(),
            Vec3::new(1.0, 2.0, 3.0),
        );
        require_ok("inject_sensor_data", sensor.handle, guard.hal().inject_sensor_data(&event))?;
        debug!(handle = %sensor.handle, "sample injected");
    }

    require_ok(
        "set_operation_mode",
        "Normal",
        guard.set_operation_mode(OperationMode::Normal),
    )?;
    Ok(Outcome::Passed)
}
