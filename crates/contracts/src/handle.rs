//! SensorHandle - Opaque sensor identifier
//!
//! Handles are assigned by the HAL and are only unique within one session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direct channel handle returned by `register_direct_channel`
pub type ChannelHandle = i32;

/// Report token returned by `config_direct_report`
pub type ReportToken = i32;

/// Sensor handle.
///
/// Wraps the raw `i32` the HAL hands out so that handles cannot be mixed up
/// with channel handles, report tokens or sensor type codes.
///
/// # Examples
/// ```
/// use contracts::SensorHandle;
///
/// let handle = SensorHandle::new(0x11);
/// assert_eq!(handle.raw(), 17);
/// assert_eq!(handle.to_string(), "0x00000011");
/// ```
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SensorHandle(i32);

impl SensorHandle {
    /// Create a handle from its raw value.
    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Handle directly following this one (saturating).
    #[inline]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl From<i32> for SensorHandle {
    #[inline]
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl From<SensorHandle> for i32 {
    #[inline]
    fn from(handle: SensorHandle) -> Self {
        handle.0
    }
}

impl fmt::Display for SensorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl fmt::Debug for SensorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensorHandle({})", self)
    }
}
