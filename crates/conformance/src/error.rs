//! Conformance error types
//!
//! One variant per violated property; a scenario stops at the first one.

use contracts::{HalError, HalResult, RateLevel, SensorHandle};
use thiserror::Error;
use tracing::debug;

/// Contract violation found by a scenario.
#[derive(Debug, Error)]
pub enum ConformanceError {
    /// Malformed descriptor field
    #[error("sensor {handle} ({name}): {field} {message}")]
    InvalidDescriptor {
        handle: SensorHandle,
        name: String,
        field: &'static str,
        message: String,
    },

    /// Immediate status differs from the one the contract requires
    #[error("{operation}({target}): expected {}, got {}", status_name(.expected), status_name(.actual))]
    UnexpectedStatus {
        operation: &'static str,
        target: String,
        expected: Option<HalError>,
        actual: Option<HalError>,
    },

    /// Flush-completion markers lost or duplicated
    #[error("sensor {handle}: expected {expected} flush-complete markers, got {actual}")]
    FlushCount {
        handle: SensorHandle,
        expected: u32,
        actual: u32,
    },

    #[error("sensor {handle}: no events {window}")]
    NoEvents {
        handle: SensorHandle,
        window: &'static str,
    },

    #[error("sensor {handle}: expected at least {expected} events, got {actual}")]
    TooFewEvents {
        handle: SensorHandle,
        expected: usize,
        actual: usize,
    },

    /// Event attributed to the wrong sensor type
    #[error("sensor {handle}: event of type {actual} delivered for a {expected} sensor")]
    ForeignEvent {
        handle: SensorHandle,
        expected: String,
        actual: String,
    },

    /// Sample outside the physical bounds of its checker
    #[error("sensor {handle}: sample at {timestamp_ns} ns rejected: {message}")]
    CheckFailed {
        handle: SensorHandle,
        timestamp_ns: i64,
        message: String,
    },

    /// Pre-deactivation sample replayed after reactivation
    #[error("sensor {handle}: first event after reactivation is {delta_ns} ns after the last one, need {min_gap_ns} ns")]
    StaleEvent {
        handle: SensorHandle,
        delta_ns: i64,
        min_gap_ns: i64,
    },

    #[error("sensor {handle}: requested period {requested_ns} ns, measured {measured_ns} ns")]
    RateMismatch {
        handle: SensorHandle,
        requested_ns: i64,
        measured_ns: i64,
    },

    /// Sampling period switch without deactivation had no visible effect
    #[error("sensor {handle}: fast interval {fast_ns} ns and slow interval {slow_ns} ns are not distinct")]
    RateSwitchIndistinct {
        handle: SensorHandle,
        fast_ns: i64,
        slow_ns: i64,
    },

    #[error("invalid direct channel handle {0}")]
    InvalidChannelHandle(i32),

    #[error("sensor {handle}: invalid report token {token}")]
    InvalidReportToken { handle: SensorHandle, token: i32 },

    /// Shared memory not cleared by channel registration
    #[error("direct channel memory not zeroed at byte {offset}")]
    DirectMemoryNotZeroed { offset: usize },

    #[error("sensor {handle}: direct report record {index}: {message}")]
    DirectRecord {
        handle: SensorHandle,
        index: usize,
        message: String,
    },

    #[error("sensor {handle}: {count} direct report records at {rate:?}, expected between {min} and {max}")]
    DirectRateOutOfRange {
        handle: SensorHandle,
        rate: RateLevel,
        count: usize,
        min: usize,
        max: usize,
    },

    #[error("sensor {handle}: timestamp {current} at index {index} does not follow {previous}")]
    TimestampNotIncreasing {
        handle: SensorHandle,
        index: usize,
        previous: i64,
        current: i64,
    },

    /// Events written to a queue the HAL was told to stop using
    #[error("replaced session still received {count} events")]
    StaleSessionReceived { count: usize },

    #[error("{session} session received no events")]
    SessionStarved { session: &'static str },

    #[error("session error: {0}")]
    Collector(#[from] collector::CollectorError),
}

fn status_name(status: &Option<HalError>) -> String {
    status.map_or_else(|| "OK".to_string(), |e| e.to_string())
}

impl ConformanceError {
    pub fn invalid_descriptor(
        descriptor: &contracts::SensorDescriptor,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidDescriptor {
            handle: descriptor.handle,
            name: descriptor.name.clone(),
            field,
            message: message.into(),
        }
    }
}

/// Result type alias for scenarios
pub type Result<T> = std::result::Result<T, ConformanceError>;

/// Require OK, yielding the call's value.
pub(crate) fn require_ok<T>(
    operation: &'static str,
    target: impl std::fmt::Display,
    result: HalResult<T>,
) -> Result<T> {
    result.map_err(|e| ConformanceError::UnexpectedStatus {
        operation,
        target: target.to_string(),
        expected: None,
        actual: Some(e),
    })
}

/// Require a specific status (`None` meaning OK).
pub(crate) fn require_status<T>(
    operation: &'static str,
    target: impl std::fmt::Display,
    result: HalResult<T>,
    expected: Option<HalError>,
) -> Result<()> {
    let actual = result.err();
    if actual == expected {
        Ok(())
    } else {
        Err(ConformanceError::UnexpectedStatus {
            operation,
            target: target.to_string(),
            expected,
            actual,
        })
    }
}

/// Log a non-OK status without failing the scenario; `true` when OK.
pub(crate) fn log_status<T>(
    operation: &'static str,
    target: impl std::fmt::Display,
    result: HalResult<T>,
) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            debug!(operation, target = %target, error = %e, "status not asserted");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = require_status("flush", SensorHandle::new(3), Ok(()), Some(HalError::BadValue))
            .unwrap_err();
        assert_eq!(err.to_string(), "flush(0x00000003): expected BAD_VALUE, got OK");

        let err = require_ok("activate", SensorHandle::new(1), Err::<(), _>(HalError::NoMemory))
            .unwrap_err();
        assert_eq!(err.to_string(), "activate(0x00000001): expected OK, got NO_MEMORY");
    }

    #[test]
    fn test_matching_status() {
        assert!(require_status("batch", 7, Err::<(), _>(HalError::BadValue), Some(HalError::BadValue)).is_ok());
        assert!(require_status("batch", 7, Ok(()), None).is_ok());
        assert_eq!(require_ok("register", "ashmem", Ok(5)).unwrap(), 5);
    }

    #[test]
    fn test_log_status() {
        assert!(log_status("batch", SensorHandle::new(1), Ok(())));
        assert!(!log_status("batch", SensorHandle::new(9), Err::<(), _>(HalError::BadValue)));
    }
}
