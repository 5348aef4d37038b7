//! StreamingValidator

use std::time::Duration;

use contracts::SensorType;
use tracing::{debug, instrument};

use super::{check_events, duration_ns};
use crate::checker::EventChecker;
use crate::context::ScenarioContext;
use crate::error::{require_ok, ConformanceError, Result};
use crate::outcome::Outcome;

/// Stream the default sensor of `sensor_type` at `period` for the configured
/// duration and check every delivered sample.
#[instrument(name = "streaming", skip(ctx, checker), fields(sensor_type = %sensor_type, period_ms = period.as_millis() as u64))]
pub fn run_streaming(
    ctx: &ScenarioContext<'_>,
    sensor_type: SensorType,
    period: Duration,
    checker: &dyn EventChecker,
) -> Result<Outcome> {
    let Some(sensor) = ctx.catalog.default_sensor(sensor_type).cloned() else {
        return Ok(Outcome::skipped(format!("no {sensor_type} sensor")));
    };
    let period_ns = duration_ns(period);
    if sensor.min_delay_ns() > period_ns {
        return Ok(Outcome::skipped(format!(
            "min delay {} ns is slower than {} ns",
            sensor.min_delay_ns(),
            period_ns
        )));
    }

    let duration = ctx.config.streaming.duration();
    let expected = (duration.as_nanos() / period.as_nanos().max(1)) as usize;
    let handle = sensor.handle;

    let events = {
        let subscription = ctx.subscribe();
        let mut guard = ctx.guard();
        require_ok("batch", handle, guard.hal().batch(handle, period_ns, 0))?;
        require_ok("activate", handle, guard.activate(handle, true))?;
        subscription.wait_for_event_count(handle, expected, duration);
        require_ok("activate", handle, guard.activate(handle, false))?;
        subscription.events(handle)
    };
    debug!(received = events.len(), expected, "streaming finished");

    if events.is_empty() {
        return Err(ConformanceError::NoEvents {
            handle,
            window: "while streaming",
        });
    }
    if let Some(foreign) = events.iter().find(|e| e.sensor_type != sensor.sensor_type) {
        return Err(ConformanceError::ForeignEvent {
            handle,
            expected: sensor.sensor_type.to_string(),
            actual: foreign.sensor_type.to_string(),
        });
    }
    check_events(&events, checker)?;

    if events.len() * 2 < expected {
        return Err(ConformanceError::TooFewEvents {
            handle,
            expected: expected.div_ceil(2),
            actual: events.len(),
        });
    }
    Ok(Outcome::Passed)
}
