//! No stale events after a disable/re-enable cycle

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use tracing::{debug, instrument};

use super::{duration_ns, ns_duration};
use crate::catalog::SensorCatalog;
use crate::context::ScenarioContext;
use crate::error::{ConformanceError, Result};
use crate::outcome::Outcome;

/// Activate every streaming sensor, remember its last timestamp, stay
/// quiescent, reactivate and require the first new event to be at least
/// `min_gap + 3 × min_delay` later than the remembered one.
///
/// A sensor that delivers nothing in either window fails the scenario.
#[instrument(name = "no_stale_events", skip(ctx))]
pub fn no_stale_events(ctx: &ScenarioContext<'_>) -> Result<Outcome> {
    let sensors = ctx.catalog.streaming();
    if sensors.is_empty() {
        return Ok(Outcome::skipped("no continuous or on-change sensors"));
    }
    let max_min_delay_ns = SensorCatalog::from_sensors(sensors.clone()).max_min_delay_ns();
    let first_event_wait =
        ctx.config.timeouts.first_event() + ns_duration(5 * max_min_delay_ns);
    let quiescent = Duration::from_millis(ctx.config.staleness.quiescent_ms)
        + ns_duration(5 * max_min_delay_ns);
    let min_gap_ns = duration_ns(Duration::from_millis(ctx.config.staleness.min_gap_ms));

    let subscription = ctx.subscribe();
    let mut guard = ctx.guard();

    guard.activate_all(&sensors, true);
    subscription.wait_for_events(&sensors, first_event_wait);
    guard.activate_all(&sensors, false);

    let mut last_timestamps = HashMap::new();
    for sensor in &sensors {
        let last = subscription
            .events(sensor.handle)
            .last()
            .map(|e| e.timestamp_ns)
            .ok_or(ConformanceError::NoEvents {
                handle: sensor.handle,
                window: "before deactivation",
            })?;
        last_timestamps.insert(sensor.handle, last);
    }

    debug!(quiescent_ms = quiescent.as_millis() as u64, "sensors quiescent");
    thread::sleep(quiescent);
    subscription.reset();

    guard.activate_all(&sensors, true);
    subscription.wait_for_events(&sensors, first_event_wait);
    guard.activate_all(&sensors, false);

    for sensor in &sensors {
        let first = subscription
            .events(sensor.handle)
            .first()
            .map(|e| e.timestamp_ns)
            .ok_or(ConformanceError::NoEvents {
                handle: sensor.handle,
                window: "after reactivation",
            })?;
        let delta_ns = first - last_timestamps[&sensor.handle];
        let required = min_gap_ns + 3 * sensor.min_delay_ns();
        if delta_ns < required {
            return Err(ConformanceError::StaleEvent {
                handle: sensor.handle,
                delta_ns,
                min_gap_ns: required,
            });
        }
    }
    Ok(Outcome::Passed)
}
