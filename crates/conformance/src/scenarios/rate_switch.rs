//! Sampling period hot switch

use std::thread;
use std::time::Duration;

use contracts::{SensorDescriptor, SensorType};
use tracing::{debug, instrument};

use super::ns_duration;
use crate::context::ScenarioContext;
use crate::error::{require_ok, ConformanceError, Result};
use crate::guard::HalGuard;
use crate::outcome::Outcome;

/// Mean interval between consecutive timestamps.
pub fn average_interval_ns(timestamps: &[i64]) -> Option<i64> {
    match timestamps {
        [first, .., last] => Some((last - first) / (timestamps.len() as i64 - 1)),
        _ => None,
    }
}

/// Switch the default sensor of `sensor_type` between its fastest and
/// slowest period without deactivating it, in both directions.
#[instrument(name = "sampling_period_hot_switch", skip(ctx), fields(sensor_type = %sensor_type))]
pub fn run_hot_switch(ctx: &ScenarioContext<'_>, sensor_type: SensorType) -> Result<Outcome> {
    let Some(sensor) = ctx.catalog.default_sensor(sensor_type).cloned() else {
        return Ok(Outcome::skipped(format!("no {sensor_type} sensor")));
    };
    let fast_ns = sensor.min_delay_ns();
    let slow_ns = sensor.max_delay_ns();
    if fast_ns <= 0 || slow_ns <= fast_ns {
        return Ok(Outcome::skipped("single sampling rate"));
    }

    for fast_to_slow in [true, false] {
        let (first, second) = if fast_to_slow {
            (fast_ns, slow_ns)
        } else {
            (slow_ns, fast_ns)
        };

        let mut guard = ctx.guard();
        let first_avg = measure(ctx, &mut guard, &sensor, first, true)?;
        let second_avg = measure(ctx, &mut guard, &sensor, second, false)?;
        require_ok("activate", sensor.handle, guard.activate(sensor.handle, false))?;

        let (fast_avg, slow_avg) = if fast_to_slow {
            (first_avg, second_avg)
        } else {
            (second_avg, first_avg)
        };
        debug!(fast_to_slow, fast_avg, slow_avg, "hot switch measured");

        if slow_avg - fast_avg <= fast_avg / 10 {
            return Err(ConformanceError::RateSwitchIndistinct {
                handle: sensor.handle,
                fast_ns: fast_avg,
                slow_ns: slow_avg,
            });
        }
        for (requested_ns, measured_ns) in [(fast_ns, fast_avg), (slow_ns, slow_avg)] {
            if (measured_ns - requested_ns).abs() > requested_ns / 10 {
                return Err(ConformanceError::RateMismatch {
                    handle: sensor.handle,
                    requested_ns,
                    measured_ns,
                });
            }
        }
    }
    Ok(Outcome::Passed)
}

/// Set `period_ns`, let the sensor settle, collect and average.
fn measure(
    ctx: &ScenarioContext<'_>,
    guard: &mut HalGuard,
    sensor: &SensorDescriptor,
    period_ns: i64,
    activate: bool,
) -> Result<i64> {
    let handle = sensor.handle;
    let config = &ctx.config.hot_switch;
    require_ok("batch", handle, guard.hal().batch(handle, period_ns, 0))?;
    if activate {
        require_ok("activate", handle, guard.activate(handle, true))?;
    }
    thread::sleep(Duration::from_millis(config.settle_ms));

    let count = config.sample_count as usize;
    let timeout = ns_duration(period_ns.saturating_mul(config.sample_count as i64));
    let timestamps: Vec<i64> = ctx
        .session
        .collect_events(timeout, count)
        .iter()
        .filter(|e| e.sensor_handle == handle && e.is_data())
        .map(|e| e.timestamp_ns)
        .collect();

    if timestamps.len() <= 2 {
        return Err(ConformanceError::TooFewEvents {
            handle,
            expected: 3,
            actual: timestamps.len(),
        });
    }
    average_interval_ns(&timestamps).ok_or(ConformanceError::TooFewEvents {
        handle,
        expected: 3,
        actual: timestamps.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_interval() {
        assert_eq!(average_interval_ns(&[0, 10, 20, 30]), Some(10));
        assert_eq!(average_interval_ns(&[100, 300]), Some(200));
        assert_eq!(average_interval_ns(&[5]), None);
        assert_eq!(average_interval_ns(&[]), None);
    }
}
