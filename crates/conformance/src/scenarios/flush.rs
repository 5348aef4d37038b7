//! FlushValidator
//!
//! | sensor | immediate status | markers per call |
//! |---|---|---|
//! | active, not one-shot | OK | 1 |
//! | one-shot | BAD_VALUE | 0 |
//! | inactive | BAD_VALUE | 0 |
//! | nonexistent handle | BAD_VALUE | 0 |

use contracts::{HalError, SensorDescriptor};
use tracing::{debug, instrument};

use crate::context::ScenarioContext;
use crate::error::{log_status, require_status, ConformanceError, Result};
use crate::outcome::Outcome;

/// Batch each sensor at its max interval, set its active state, flush it
/// `num_flush_calls` times expecting `expected_immediate` from every call,
/// deactivate, then require exactly `expected_completions` markers per sensor.
#[instrument(name = "flush_test", skip(ctx, sensors), fields(sensors = sensors.len()))]
pub fn run_flush_test(
    ctx: &ScenarioContext<'_>,
    sensors: &[SensorDescriptor],
    activate_first: bool,
    num_flush_calls: u32,
    expected_completions: u32,
    expected_immediate: Option<HalError>,
) -> Result<()> {
    let subscription = ctx.subscribe();
    {
        let mut guard = ctx.guard();
        for sensor in sensors {
            let handle = sensor.handle;
            log_status("batch", handle, guard.hal().batch(handle, sensor.max_delay_ns(), 0));
            log_status("activate", handle, guard.activate(handle, activate_first));

            for _ in 0..num_flush_calls {
                require_status("flush", handle, guard.hal().flush(handle), expected_immediate)?;
            }
            log_status("activate", handle, guard.activate(handle, false));
        }
    }

    let satisfied =
        subscription.wait_for_flush_events(sensors, num_flush_calls, ctx.config.timeouts.flush_wait());
    debug!(satisfied, "flush wait finished");

    for sensor in sensors {
        let actual = subscription.flush_count(sensor.handle);
        if actual != expected_completions {
            return Err(ConformanceError::FlushCount {
                handle: sensor.handle,
                expected: expected_completions,
                actual,
            });
        }
    }
    Ok(())
}

/// One flush then five flushes on every active non-one-shot sensor.
pub fn flush_sensor(ctx: &ScenarioContext<'_>) -> Result<Outcome> {
    let sensors = ctx.catalog.non_one_shot();
    if sensors.is_empty() {
        return Ok(Outcome::skipped("no non-one-shot sensors"));
    }
    const FLUSHES: u32 = 5;
    run_flush_test(ctx, &sensors, true, 1, 1, None)?;
    run_flush_test(ctx, &sensors, true, FLUSHES, FLUSHES, None)?;
    Ok(Outcome::Passed)
}

pub fn flush_one_shot_sensor(ctx: &ScenarioContext<'_>) -> Result<Outcome> {
    let sensors = ctx.catalog.one_shot();
    if sensors.is_empty() {
        return Ok(Outcome::skipped("no one-shot sensors"));
    }
    run_flush_test(ctx, &sensors, true, 1, 0, Some(HalError::BadValue))?;
    Ok(Outcome::Passed)
}

pub fn flush_inactive_sensor(ctx: &ScenarioContext<'_>) -> Result<Outcome> {
    let mut sensors = ctx.catalog.non_one_shot();
    if sensors.is_empty() {
        sensors = ctx.catalog.one_shot();
    }
    if sensors.is_empty() {
        return Ok(Outcome::skipped("no sensors"));
    }
    run_flush_test(ctx, &sensors, false, 1, 0, Some(HalError::BadValue))?;
    Ok(Outcome::Passed)
}

/// Flush a handle that is not in the sensor list.
pub fn flush_nonexistent_sensor(ctx: &ScenarioContext<'_>) -> Result<Outcome> {
    let template = ctx
        .catalog
        .non_one_shot()
        .into_iter()
        .next()
        .or_else(|| ctx.catalog.one_shot().into_iter().next());
    let Some(mut sensor) = template else {
        return Ok(Outcome::skipped("no sensors"));
    };
    sensor.handle = ctx.catalog.invalid_handle();
    run_flush_test(ctx, &[sensor], false, 1, 0, Some(HalError::BadValue))?;
    Ok(Outcome::Passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use collector::SensorsSession;
    use contracts::{SensorsHal, SuiteConfig};
    use mock_hal::MockSensorsHal;

    #[test]
    fn test_rejected_batch_does_not_abort() {
        let hal: Arc<dyn SensorsHal> = Arc::new(MockSensorsHal::new().unwrap());
        let mut config = SuiteConfig::default();
        config.timeouts.flush_wait_ms = 200;
        let session = SensorsSession::connect(hal.clone(), &config.session).unwrap();
        let ctx = ScenarioContext::new(&hal, &session, &config);

        // batch and activate both fail with BAD_VALUE on an unknown handle
        let mut unknown = ctx.catalog.sensors()[0].clone();
        unknown.handle = ctx.catalog.invalid_handle();
        run_flush_test(&ctx, &[unknown], true, 1, 0, Some(HalError::BadValue)).unwrap();

        let accel = ctx.catalog.sensors()[0].clone();
        run_flush_test(&ctx, &[accel], true, 1, 1, None).unwrap();
        session.tear_down();
    }
}
