//! SensorEvent - HAL output
//!
//! One observation delivered through the event queue.

use serde::{Deserialize, Serialize};

use crate::{SensorHandle, SensorType};

/// Sensor event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorEvent {
    /// Handle of the producing sensor
    pub sensor_handle: SensorHandle,

    /// Type of the producing sensor, `MetaData` for flush markers
    pub sensor_type: SensorType,

    /// Monotonic timestamp (nanoseconds)
    pub timestamp_ns: i64,

    pub payload: EventPayload,
}

/// Type-tagged event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPayload {
    /// 3-axis vector (accelerometer, gyroscope, magnetometer, ...)
    Vec3(Vec3),

    /// Single value (light, proximity, pressure, ...)
    Scalar(f32),

    /// Step counter
    StepCount(u64),

    /// Metadata
    Meta(MetaDataEvent),
}

impl EventPayload {
    /// Measurement values in the order a direct report record carries them.
    pub fn values(&self) -> Vec<f32> {
        match self {
            Self::Vec3(v) => v.as_array().to_vec(),
            Self::Scalar(x) => vec![*x],
            Self::StepCount(n) => vec![*n as f32],
            Self::Meta(_) => Vec::new(),
        }
    }
}

/// 3-axis sample with accuracy status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub status: SensorStatus,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            status: SensorStatus::AccuracyHigh,
        }
    }

    pub const fn as_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Sample accuracy status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorStatus {
    NoContact,
    Unreliable,
    AccuracyLow,
    AccuracyMedium,
    #[default]
    AccuracyHigh,
}

/// Metadata event body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaDataEvent {
    pub what: MetaDataKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaDataKind {
    /// All buffered data for the handle up to now has been delivered
    FlushComplete,
}

impl SensorEvent {
    /// Build a flush-completion marker for `handle`.
    pub fn flush_complete(handle: SensorHandle, timestamp_ns: i64) -> Self {
        Self {
            sensor_handle: handle,
            sensor_type: SensorType::MetaData,
            timestamp_ns,
            payload: EventPayload::Meta(MetaDataEvent {
                what: MetaDataKind::FlushComplete,
            }),
        }
    }

    /// Build a 3-axis data event.
    pub fn vec3(
        handle: SensorHandle,
        sensor_type: SensorType,
        timestamp_ns: i64,
        value: Vec3,
    ) -> Self {
        Self {
            sensor_handle: handle,
            sensor_type,
            timestamp_ns,
            payload: EventPayload::Vec3(value),
        }
    }

    /// Build a scalar data event.
    pub fn scalar(
        handle: SensorHandle,
        sensor_type: SensorType,
        timestamp_ns: i64,
        value: f32,
    ) -> Self {
        Self {
            sensor_handle: handle,
            sensor_type,
            timestamp_ns,
            payload: EventPayload::Scalar(value),
        }
    }

    /// Whether this is a flush-completion marker.
    pub fn is_flush_complete(&self) -> bool {
        self.sensor_type == SensorType::MetaData
            && matches!(
                self.payload,
                EventPayload::Meta(MetaDataEvent {
                    what: MetaDataKind::FlushComplete
                })
            )
    }

    /// Whether this event carries a measurement.
    ///
    /// Meta and additional-info events are neither data nor flush markers.
    pub fn is_data(&self) -> bool {
        !self.sensor_type.is_meta() && !matches!(self.payload, EventPayload::Meta(_))
    }

    /// The 3-axis sample, if any.
    pub fn as_vec3(&self) -> Option<&Vec3> {
        match &self.payload {
            EventPayload::Vec3(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let handle = SensorHandle::new(3);
        let marker = SensorEvent::flush_complete(handle, 10);
        assert!(marker.is_flush_complete());
        assert!(!marker.is_data());

        let data = SensorEvent::vec3(handle, SensorType::Gyroscope, 11, Vec3::new(0.0, 0.0, 0.0));
        assert!(data.is_data());
        assert!(!data.is_flush_complete());

        let info = SensorEvent::scalar(handle, SensorType::AdditionalInfo, 12, 1.0);
        assert!(!info.is_data());
        assert!(!info.is_flush_complete());
    }

    #[test]
    fn test_serde_tagged_payload() {
        let event = SensorEvent::scalar(SensorHandle::new(4), SensorType::Light, 99, 120.5);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["payload"]["scalar"], 120.5);
        assert_eq!(json["sensor_type"], "light");

        let parsed: SensorEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }
}
