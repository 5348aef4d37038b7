//! Batching through the reserved FIFO

use std::thread;
use std::time::Duration;

use contracts::SensorType;
use tracing::{debug, instrument};

use super::ns_duration;
use crate::context::ScenarioContext;
use crate::error::{require_ok, ConformanceError, Result};
use crate::outcome::Outcome;

/// Shortest batching period worth testing.
const MIN_BATCHING_PERIOD: Duration = Duration::from_secs(1);

/// Batch the default sensor of `sensor_type` at its fastest rate with an
/// unbounded report latency and require that a flush after `1.6 ×` the
/// batching period delivers more than 90 % of the reserved FIFO to a collector
/// registered halfway through.
#[instrument(name = "batching", skip(ctx), fields(sensor_type = %sensor_type))]
pub fn run_batching(ctx: &ScenarioContext<'_>, sensor_type: SensorType) -> Result<Outcome> {
    let Some(sensor) = ctx.catalog.default_sensor(sensor_type).cloned() else {
        return Ok(Outcome::skipped(format!("no {sensor_type} sensor")));
    };
    let fifo = sensor.fifo_reserved_event_count as usize;
    let min_delay_ns = sensor.min_delay_ns();
    let period = ns_duration((fifo as i64).saturating_mul(min_delay_ns));
    if period < MIN_BATCHING_PERIOD {
        return Ok(Outcome::skipped(format!(
            "reserved fifo covers only {} ms",
            period.as_millis()
        )));
    }
    let config = &ctx.config.batching;
    let period = period.min(Duration::from_millis(config.max_period_ms));
    let handle = sensor.handle;

    let subscription = ctx.subscribe();
    let mut guard = ctx.guard();
    require_ok("batch", handle, guard.hal().batch(handle, min_delay_ns, i64::MAX))?;
    require_ok("activate", handle, guard.activate(handle, true))?;

    thread::sleep(Duration::from_millis(config.init_ms));
    require_ok("flush", handle, guard.hal().flush(handle))?;
    thread::sleep(period.mul_f64(0.8));

    // unregister the old collector before the new one takes its place
    drop(subscription);
    let subscription = ctx.subscribe();
    thread::sleep(period.mul_f64(0.8));
    require_ok("flush", handle, guard.hal().flush(handle))?;

    let wait = ctx.config.timeouts.batch_delivery().max(period / 10);
    subscription.wait_for_event_count(handle, fifo, wait);
    require_ok("activate", handle, guard.activate(handle, false))?;

    let actual = subscription.event_count(handle);
    debug!(actual, fifo, period_ms = period.as_millis() as u64, "batch delivered");
    if actual * 10 <= fifo * 9 {
        return Err(ConformanceError::TooFewEvents {
            handle,
            expected: fifo * 9 / 10 + 1,
            actual,
        });
    }
    Ok(Outcome::Passed)
}
