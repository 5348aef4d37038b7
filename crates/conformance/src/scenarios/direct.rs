//! DirectChannelValidator
//!
//! Reads the shared memory ring directly; independent of the event queue.

use std::thread;

use contracts::{
    DirectReportRecord, RateLevel, ReportToken, SensorDescriptor, SensorType, SharedMemInfo,
    SharedMemType,
};
use tracing::{debug, instrument};

use crate::checker::EventChecker;
use crate::context::ScenarioContext;
use crate::error::{require_ok, ConformanceError, Result};
use crate::outcome::Outcome;

/// Byte the region is filled with before registration.
const POISON: u8 = 0xCC;

/// Decode the records written so far.
///
/// Stops at the first slot whose size field is wrong or whose counter does
/// not increase, i.e. the first slot the HAL has not written yet.
pub fn parse_direct_records(region: &[u8]) -> Vec<DirectReportRecord> {
    let mut records: Vec<DirectReportRecord> = Vec::new();
    let mut index = 0;
    while let Some(record) = DirectReportRecord::read_at(region, index) {
        let fresh = record.size as usize == DirectReportRecord::SIZE
            && records.last().map_or(record.counter > 0, |prev| record.counter > prev.counter);
        if !fresh {
            break;
        }
        records.push(record);
        index += 1;
    }
    records
}

/// Check the parsed records of one report against its token, type, cadence
/// and checker.
pub fn validate_direct_records(
    sensor: &SensorDescriptor,
    token: ReportToken,
    rate: RateLevel,
    records: &[DirectReportRecord],
    nominal_secs: f64,
    total_secs: f64,
    checker: &dyn EventChecker,
) -> Result<()> {
    let handle = sensor.handle;
    let mismatch = |index: usize, message: String| ConformanceError::DirectRecord {
        handle,
        index,
        message,
    };

    for (index, record) in records.iter().enumerate() {
        if record.report_token != token {
            return Err(mismatch(
                index,
                format!("token {} instead of {}", record.report_token, token),
            ));
        }
        if record.sensor_type != sensor.sensor_type.code() {
            return Err(mismatch(
                index,
                format!(
                    "sensor type {} instead of {}",
                    record.sensor_type,
                    sensor.sensor_type.code()
                ),
            ));
        }
        if let Some(prev) = index.checked_sub(1).map(|i| &records[i]) {
            if record.timestamp <= prev.timestamp {
                return Err(ConformanceError::TimestampNotIncreasing {
                    handle,
                    index,
                    previous: prev.timestamp,
                    current: record.timestamp,
                });
            }
            if record.counter != prev.counter.wrapping_add(1) {
                return Err(mismatch(
                    index,
                    format!("counter {} after {}", record.counter, prev.counter),
                ));
            }
        }
        checker
            .check(&record.data)
            .map_err(|message| ConformanceError::CheckFailed {
                handle,
                timestamp_ns: record.timestamp,
                message,
            })?;
    }

    let nominal_hz = f64::from(rate.nominal_hz());
    let min = (nominal_hz * RateLevel::MIN_RATE_FACTOR * nominal_secs) as usize;
    let max = (nominal_hz * RateLevel::MAX_RATE_FACTOR * total_secs).ceil() as usize;
    let count = records.len();
    if count <= min || count >= max {
        return Err(ConformanceError::DirectRateOutOfRange {
            handle,
            rate,
            count,
            min,
            max,
        });
    }
    Ok(())
}

/// Report the default sensor of `sensor_type` through a `mem_type` channel at
/// `rate` and validate the records.
#[instrument(name = "direct_report", skip(ctx, checker), fields(sensor_type = %sensor_type, mem_type = %mem_type, rate = ?rate))]
pub fn run_direct_report(
    ctx: &ScenarioContext<'_>,
    sensor_type: SensorType,
    mem_type: SharedMemType,
    rate: RateLevel,
    checker: &dyn EventChecker,
) -> Result<Outcome> {
    let Some(sensor) = ctx.catalog.default_sensor(sensor_type).cloned() else {
        return Ok(Outcome::skipped(format!("no {sensor_type} sensor")));
    };
    if !sensor.supports_channel(mem_type) {
        return Ok(Outcome::skipped(format!("{mem_type} channels unsupported")));
    }
    if !sensor.supports_direct_rate(rate) {
        return Ok(Outcome::skipped(format!("rate {rate:?} unsupported")));
    }

    let config = &ctx.config.direct_report;
    let handle = sensor.handle;
    let mem = SharedMemInfo::with_record_capacity(mem_type, config.ring_capacity);
    mem.memory.fill(POISON);

    let mut guard = ctx.guard();
    let channel = require_ok("register_direct_channel", mem_type, guard.register_direct_channel(&mem))?;
    if channel <= 0 {
        return Err(ConformanceError::InvalidChannelHandle(channel));
    }
    if let Some(offset) = mem.memory.snapshot().iter().position(|b| *b != 0) {
        return Err(ConformanceError::DirectMemoryNotZeroed { offset });
    }

    let token = require_ok(
        "config_direct_report",
        handle,
        guard.config_direct_report(handle, channel, rate),
    )?;
    if token <= 0 {
        return Err(ConformanceError::InvalidReportToken { handle, token });
    }

    let nominal = std::time::Duration::from_millis(config.nominal_test_ms);
    let total = nominal + std::time::Duration::from_millis(config.init_slack_ms);
    thread::sleep(total);

    require_ok(
        "config_direct_report",
        handle,
        guard.config_direct_report(handle, channel, RateLevel::Stop),
    )?;
    let records = parse_direct_records(&mem.memory.snapshot());
    debug!(records = records.len(), "direct report stopped");

    validate_direct_records(
        &sensor,
        token,
        rate,
        &records,
        nominal.as_secs_f64(),
        total.as_secs_f64(),
        checker,
    )?;
    require_ok("unregister_direct_channel", channel, guard.unregister_direct_channel(channel))?;
    Ok(Outcome::Passed)
}
