//! Conformance scenarios
//!
//! Every scenario takes a `ScenarioContext`, acquires HAL state through a
//! `HalGuard` and returns `Ok(Outcome)` or the first violated property.

pub mod activation;
pub mod batching;
pub mod direct;
pub mod flush;
pub mod injection;
pub mod isolation;
pub mod rate_switch;
pub mod sensor_list;
pub mod staleness;
pub mod streaming;

use std::time::Duration;

use contracts::SensorEvent;

use crate::checker::EventChecker;
use crate::error::{ConformanceError, Result};

pub(crate) fn duration_ns(d: Duration) -> i64 {
    i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
}

pub(crate) fn ns_duration(ns: i64) -> Duration {
    Duration::from_nanos(ns.max(0) as u64)
}

/// Run `checker` over every event.
pub(crate) fn check_events(events: &[SensorEvent], checker: &dyn EventChecker) -> Result<()> {
    for event in events {
        checker
            .check(&event.payload.values())
            .map_err(|message| ConformanceError::CheckFailed {
                handle: event.sensor_handle,
                timestamp_ns: event.timestamp_ns,
                message,
            })?;
    }
    Ok(())
}
