//! Mock HAL configuration
//!
//! Every fault field breaks exactly one part of the HAL contract so that the
//! scenario guarding it can be shown to fail.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MockHalError;

/// Mock HAL configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Acknowledge flush requests without ever emitting the marker
    pub drop_flush_markers: bool,
    /// Emit two markers per flush request
    pub duplicate_flush_markers: bool,
    /// Re-deliver the last pre-deactivation sample on reactivation
    pub replay_stale_events: bool,
    /// Return OK for calls on handles that do not exist
    pub accept_invalid_handles: bool,
    /// Constant offset (m/s^2) added to every accelerometer sample's z axis
    pub accelerometer_bias: f32,
    /// Keep writing into the first queue across `initialize` calls
    pub ignore_reinitialize: bool,
    /// Fail every `register_direct_channel` with NO_MEMORY
    pub reject_direct_channels: bool,
    /// Uniform noise amplitude applied to every axis
    pub noise: f32,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            drop_flush_markers: false,
            duplicate_flush_markers: false,
            replay_stale_events: false,
            accept_invalid_handles: false,
            accelerometer_bias: 0.0,
            ignore_reinitialize: false,
            reject_direct_channels: false,
            noise: 0.02,
        }
    }
}

impl MockConfig {
    /// Configuration with `faults` switched on.
    pub fn with_faults(faults: &[MockFault]) -> Self {
        let mut config = Self::default();
        for fault in faults {
            fault.apply(&mut config);
        }
        config
    }

    /// Whether any contract violation is configured.
    pub fn is_faulty(&self) -> bool {
        MockFault::ALL.iter().any(|f| f.is_set(self))
    }
}

/// Named contract violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MockFault {
    DropFlushMarkers,
    DuplicateFlushMarkers,
    ReplayStaleEvents,
    AcceptInvalidHandles,
    AccelerometerBias,
    IgnoreReinitialize,
    RejectDirectChannels,
}

impl MockFault {
    pub const ALL: [MockFault; 7] = [
        MockFault::DropFlushMarkers,
        MockFault::DuplicateFlushMarkers,
        MockFault::ReplayStaleEvents,
        MockFault::AcceptInvalidHandles,
        MockFault::AccelerometerBias,
        MockFault::IgnoreReinitialize,
        MockFault::RejectDirectChannels,
    ];

    /// Bias used by `AccelerometerBias`, large enough to leave the gravity band.
    pub const ACCELEROMETER_BIAS: f32 = 3.0;

    pub const fn name(self) -> &'static str {
        match self {
            MockFault::DropFlushMarkers => "drop-flush-markers",
            MockFault::DuplicateFlushMarkers => "duplicate-flush-markers",
            MockFault::ReplayStaleEvents => "replay-stale-events",
            MockFault::AcceptInvalidHandles => "accept-invalid-handles",
            MockFault::AccelerometerBias => "accelerometer-bias",
            MockFault::IgnoreReinitialize => "ignore-reinitialize",
            MockFault::RejectDirectChannels => "reject-direct-channels",
        }
    }

    pub fn apply(self, config: &mut MockConfig) {
        match self {
            MockFault::DropFlushMarkers => config.drop_flush_markers = true,
            MockFault::DuplicateFlushMarkers => config.duplicate_flush_markers = true,
            MockFault::ReplayStaleEvents => config.replay_stale_events = true,
            MockFault::AcceptInvalidHandles => config.accept_invalid_handles = true,
            MockFault::AccelerometerBias => config.accelerometer_bias = Self::ACCELEROMETER_BIAS,
            MockFault::IgnoreReinitialize => config.ignore_reinitialize = true,
            MockFault::RejectDirectChannels => config.reject_direct_channels = true,
        }
    }

    fn is_set(self, config: &MockConfig) -> bool {
        match self {
            MockFault::DropFlushMarkers => config.drop_flush_markers,
            MockFault::DuplicateFlushMarkers => config.duplicate_flush_markers,
            MockFault::ReplayStaleEvents => config.replay_stale_events,
            MockFault::AcceptInvalidHandles => config.accept_invalid_handles,
            MockFault::AccelerometerBias => config.accelerometer_bias != 0.0,
            MockFault::IgnoreReinitialize => config.ignore_reinitialize,
            MockFault::RejectDirectChannels => config.reject_direct_channels,
        }
    }
}

impl fmt::Display for MockFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MockFault {
    type Err = MockHalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MockFault::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| MockHalError::UnknownFault(s.to_string()))
    }
}
