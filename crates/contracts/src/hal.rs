//! SensorsHal - the interface under test
//!
//! Request/response calls are synchronous and must return promptly; events
//! are delivered out of band through the `EventQueueWriter` handed over by
//! `initialize`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    ChannelHandle, EventQueueWriter, ReportToken, SensorDescriptor, SensorEvent, SensorHandle,
    SharedMemInfo,
};

/// Non-OK status codes of the interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HalError {
    /// Invalid handle/parameter or disallowed state transition
    #[error("BAD_VALUE")]
    BadValue,

    #[error("INVALID_OPERATION")]
    InvalidOperation,

    #[error("NO_MEMORY")]
    NoMemory,

    #[error("PERMISSION_DENIED")]
    PermissionDenied,
}

/// Status of a HAL call, `Ok` meaning OK.
pub type HalResult<T> = std::result::Result<T, HalError>;

/// Global operation mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    #[default]
    Normal,
    DataInjection,
}

/// Direct report rate tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLevel {
    Stop,
    Normal,
    Fast,
    VeryFast,
}

impl RateLevel {
    /// Lower bound factor applied to the nominal rate.
    pub const MIN_RATE_FACTOR: f64 = 0.55;
    /// Upper bound factor applied to the nominal rate.
    pub const MAX_RATE_FACTOR: f64 = 2.2;

    /// Level as encoded in descriptor flags.
    pub const fn level(self) -> u32 {
        match self {
            RateLevel::Stop => 0,
            RateLevel::Normal => 1,
            RateLevel::Fast => 2,
            RateLevel::VeryFast => 3,
        }
    }

    /// Decode a running rate level (1..=3). `0` means no direct report.
    pub const fn from_level(level: u32) -> Option<Self> {
        match level {
            1 => Some(RateLevel::Normal),
            2 => Some(RateLevel::Fast),
            3 => Some(RateLevel::VeryFast),
            _ => None,
        }
    }

    /// Nominal delivery rate in Hz (0 for `Stop`).
    pub const fn nominal_hz(self) -> u32 {
        match self {
            RateLevel::Stop => 0,
            RateLevel::Normal => 50,
            RateLevel::Fast => 200,
            RateLevel::VeryFast => 800,
        }
    }

    /// Nominal interval between two reports, `None` for `Stop`.
    pub fn period_ns(self) -> Option<i64> {
        match self.nominal_hz() {
            0 => None,
            hz => Some(1_000_000_000 / i64::from(hz)),
        }
    }
}

/// The sensor abstraction interface.
///
/// Implementations must be shareable across the caller thread and their own
/// delivery thread.
pub trait SensorsHal: Send + Sync {
    fn get_sensors_list(&self) -> Vec<SensorDescriptor>;

    fn set_operation_mode(&self, mode: OperationMode) -> HalResult<()>;

    fn activate(&self, handle: SensorHandle, enabled: bool) -> HalResult<()>;

    fn batch(
        &self,
        handle: SensorHandle,
        sampling_period_ns: i64,
        max_report_latency_ns: i64,
    ) -> HalResult<()>;

    /// Request a flush-completion marker for `handle`.
    fn flush(&self, handle: SensorHandle) -> HalResult<()>;

    /// Only valid in `OperationMode::DataInjection` (except additional info).
    fn inject_sensor_data(&self, event: &SensorEvent) -> HalResult<()>;

    fn register_direct_channel(&self, mem: &SharedMemInfo) -> HalResult<ChannelHandle>;

    fn unregister_direct_channel(&self, channel: ChannelHandle) -> HalResult<()>;

    /// Start, retune or stop (`RateLevel::Stop`) reporting `handle` into `channel`.
    fn config_direct_report(
        &self,
        handle: SensorHandle,
        channel: ChannelHandle,
        rate: RateLevel,
    ) -> HalResult<ReportToken>;

    /// Attach a new event queue. Any previous queue is detached and every
    /// sensor is deactivated.
    fn initialize(&self, queue: EventQueueWriter) -> HalResult<()>;
}
