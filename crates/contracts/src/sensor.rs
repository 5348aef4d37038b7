//! Sensor metadata
//!
//! `SensorType` codes, reporting modes, descriptor flag layout and the
//! immutable `SensorDescriptor` returned by `get_sensors_list`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::SensorHandle;

/// Prefix reserved for the canonical type strings of standard sensor types.
pub const STANDARD_TYPE_PREFIX: &str = "android.sensor.";

/// First code available to device private sensor types.
pub const DEVICE_PRIVATE_BASE: i32 = 0x10000;

/// Reporting mode of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportingMode {
    Continuous,
    OnChange,
    OneShot,
    Special,
}

macro_rules! define_sensor_types {
    (
        $(
            $variant:ident = $code:literal, $type_str:literal, $mode:ident;
        )+
    ) => {
        /// Sensor type classification.
        ///
        /// Standard types carry the numeric code of the interface; codes at or
        /// above [`DEVICE_PRIVATE_BASE`] are vendor private.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum SensorType {
            $($variant,)+
            DevicePrivate(i32),
        }

        impl SensorType {
            /// Numeric code of this type.
            pub const fn code(self) -> i32 {
                match self {
                    $(SensorType::$variant => $code,)+
                    SensorType::DevicePrivate(code) => code,
                }
            }

            /// Resolve a numeric code. Unknown codes below the private range are rejected.
            pub fn from_code(code: i32) -> Option<Self> {
                match code {
                    $($code => Some(SensorType::$variant),)+
                    c if c >= DEVICE_PRIVATE_BASE => Some(SensorType::DevicePrivate(c)),
                    _ => None,
                }
            }

            /// Canonical type string, `None` for private types.
            pub const fn canonical_string(self) -> Option<&'static str> {
                match self {
                    $(SensorType::$variant => Some($type_str),)+
                    SensorType::DevicePrivate(_) => None,
                }
            }

            /// Reporting mode every implementation must declare for this type.
            ///
            /// `None` for meta types and private types.
            pub const fn expected_reporting_mode(self) -> Option<ReportingMode> {
                match self {
                    $(SensorType::$variant => define_sensor_types!(@mode $mode),)+
                    SensorType::DevicePrivate(_) => None,
                }
            }
        }
    };
    (@mode none) => { None };
    (@mode $mode:ident) => { Some(ReportingMode::$mode) };
}

define_sensor_types! {
    MetaData = 0, "android.sensor.meta_data", none;
    Accelerometer = 1, "android.sensor.accelerometer", Continuous;
    MagneticField = 2, "android.sensor.magnetic_field", Continuous;
    Orientation = 3, "android.sensor.orientation", Continuous;
    Gyroscope = 4, "android.sensor.gyroscope", Continuous;
    Light = 5, "android.sensor.light", OnChange;
    Pressure = 6, "android.sensor.pressure", Continuous;
    Temperature = 7, "android.sensor.temperature", Continuous;
    Proximity = 8, "android.sensor.proximity", OnChange;
    Gravity = 9, "android.sensor.gravity", Continuous;
    LinearAcceleration = 10, "android.sensor.linear_acceleration", Continuous;
    RotationVector = 11, "android.sensor.rotation_vector", Continuous;
    RelativeHumidity = 12, "android.sensor.relative_humidity", OnChange;
    AmbientTemperature = 13, "android.sensor.ambient_temperature", OnChange;
    MagneticFieldUncalibrated = 14, "android.sensor.magnetic_field_uncalibrated", Continuous;
    GameRotationVector = 15, "android.sensor.game_rotation_vector", Continuous;
    GyroscopeUncalibrated = 16, "android.sensor.gyroscope_uncalibrated", Continuous;
    SignificantMotion = 17, "android.sensor.significant_motion", OneShot;
    StepDetector = 18, "android.sensor.step_detector", Special;
    StepCounter = 19, "android.sensor.step_counter", OnChange;
    GeomagneticRotationVector = 20, "android.sensor.geomagnetic_rotation_vector", Continuous;
    HeartRate = 21, "android.sensor.heart_rate", OnChange;
    TiltDetector = 22, "android.sensor.tilt_detector", Special;
    WakeGesture = 23, "android.sensor.wake_gesture", OneShot;
    GlanceGesture = 24, "android.sensor.glance_gesture", OneShot;
    PickUpGesture = 25, "android.sensor.pick_up_gesture", OneShot;
    WristTiltGesture = 26, "android.sensor.wrist_tilt_gesture", Special;
    DeviceOrientation = 27, "android.sensor.device_orientation", OnChange;
    Pose6Dof = 28, "android.sensor.pose_6dof", Continuous;
    StationaryDetect = 29, "android.sensor.stationary_detect", OneShot;
    MotionDetect = 30, "android.sensor.motion_detect", OneShot;
    HeartBeat = 31, "android.sensor.heart_beat", Continuous;
    DynamicSensorMeta = 32, "android.sensor.dynamic_sensor_meta", Special;
    AdditionalInfo = 33, "android.sensor.additional_info", none;
    LowLatencyOffbodyDetect = 34, "android.sensor.low_latency_offbody_detect", OnChange;
    AccelerometerUncalibrated = 35, "android.sensor.accelerometer_uncalibrated", Continuous;
}

impl SensorType {
    /// The two sentinel types that must never appear in a sensor list.
    pub const fn is_meta(self) -> bool {
        matches!(self, SensorType::MetaData | SensorType::AdditionalInfo)
    }

    /// Whether this is a vendor private type.
    pub const fn is_private(self) -> bool {
        matches!(self, SensorType::DevicePrivate(_))
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical_string() {
            Some(s) => f.write_str(s.trim_start_matches(STANDARD_TYPE_PREFIX)),
            None => write!(f, "device_private_0x{:x}", self.code()),
        }
    }
}

/// Descriptor flag bits.
///
/// | bits | meaning |
/// |---|---|
/// | 0 | wake-up |
/// | 1-3 | reporting mode |
/// | 4 | data injection |
/// | 5 | dynamic sensor |
/// | 6 | additional info |
/// | 7-9 | max direct report rate level |
/// | 10 | ashmem direct channel |
/// | 11 | gralloc direct channel |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorFlags(pub u32);

impl SensorFlags {
    pub const WAKE_UP: u32 = 0x1;
    pub const MODE_MASK: u32 = 0xE;
    pub const CONTINUOUS_MODE: u32 = 0x0;
    pub const ON_CHANGE_MODE: u32 = 0x2;
    pub const ONE_SHOT_MODE: u32 = 0x4;
    pub const SPECIAL_REPORTING_MODE: u32 = 0x6;
    pub const DATA_INJECTION: u32 = 0x10;
    pub const DYNAMIC_SENSOR: u32 = 0x20;
    pub const ADDITIONAL_INFO: u32 = 0x40;
    pub const DIRECT_REPORT_MASK: u32 = 0x380;
    pub const DIRECT_REPORT_SHIFT: u32 = 7;
    pub const DIRECT_CHANNEL_ASHMEM: u32 = 0x400;
    pub const DIRECT_CHANNEL_GRALLOC: u32 = 0x800;

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, bits: u32) -> bool {
        self.0 & bits == bits
    }

    /// Builder style helper: set `bits`.
    #[inline]
    pub const fn with(self, bits: u32) -> Self {
        Self(self.0 | bits)
    }

    /// Flags carrying only the given reporting mode.
    pub const fn from_mode(mode: ReportingMode) -> Self {
        Self(match mode {
            ReportingMode::Continuous => Self::CONTINUOUS_MODE,
            ReportingMode::OnChange => Self::ON_CHANGE_MODE,
            ReportingMode::OneShot => Self::ONE_SHOT_MODE,
            ReportingMode::Special => Self::SPECIAL_REPORTING_MODE,
        })
    }

    pub const fn reporting_mode(self) -> ReportingMode {
        match self.0 & Self::MODE_MASK {
            Self::CONTINUOUS_MODE => ReportingMode::Continuous,
            Self::ON_CHANGE_MODE => ReportingMode::OnChange,
            Self::ONE_SHOT_MODE => ReportingMode::OneShot,
            _ => ReportingMode::Special,
        }
    }

    /// Raw max direct report rate level (0 = direct report unsupported).
    pub const fn max_direct_rate_level(self) -> u32 {
        (self.0 & Self::DIRECT_REPORT_MASK) >> Self::DIRECT_REPORT_SHIFT
    }

    /// Builder style helper: encode the max direct report rate level.
    pub const fn with_max_direct_rate_level(self, level: u32) -> Self {
        Self(
            (self.0 & !Self::DIRECT_REPORT_MASK)
                | ((level << Self::DIRECT_REPORT_SHIFT) & Self::DIRECT_REPORT_MASK),
        )
    }
}

/// Immutable description of one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    pub handle: SensorHandle,
    pub name: String,
    pub vendor: String,
    pub version: i32,
    pub sensor_type: SensorType,
    pub type_as_string: String,
    pub max_range: f32,
    pub resolution: f32,
    /// Power draw in mA
    pub power: f32,
    /// Minimum sampling interval in microseconds
    pub min_delay_us: i32,
    pub fifo_reserved_event_count: u32,
    pub fifo_max_event_count: u32,
    pub required_permission: String,
    /// Maximum sampling interval in microseconds
    pub max_delay_us: i32,
    pub flags: SensorFlags,
}

impl SensorDescriptor {
    #[inline]
    pub fn reporting_mode(&self) -> ReportingMode {
        self.flags.reporting_mode()
    }

    #[inline]
    pub fn is_one_shot(&self) -> bool {
        self.reporting_mode() == ReportingMode::OneShot
    }

    #[inline]
    pub fn is_wake_up(&self) -> bool {
        self.flags.contains(SensorFlags::WAKE_UP)
    }

    #[inline]
    pub fn supports_data_injection(&self) -> bool {
        self.flags.contains(SensorFlags::DATA_INJECTION)
    }

    /// Whether the sensor can report into a direct channel of `mem_type`.
    pub fn supports_channel(&self, mem_type: crate::SharedMemType) -> bool {
        match mem_type {
            crate::SharedMemType::Ashmem => self.flags.contains(SensorFlags::DIRECT_CHANNEL_ASHMEM),
            crate::SharedMemType::Gralloc => {
                self.flags.contains(SensorFlags::DIRECT_CHANNEL_GRALLOC)
            }
        }
    }

    /// Highest direct report rate the sensor declares, `None` if it has no direct report.
    pub fn max_direct_rate(&self) -> Option<crate::RateLevel> {
        crate::RateLevel::from_level(self.flags.max_direct_rate_level())
    }

    /// Whether `rate` is within the declared max direct report rate.
    pub fn supports_direct_rate(&self, rate: crate::RateLevel) -> bool {
        self.flags.max_direct_rate_level() >= rate.level()
    }

    /// Minimum sampling interval as nanoseconds, never negative.
    pub fn min_delay_ns(&self) -> i64 {
        i64::from(self.min_delay_us.max(0)) * 1_000
    }

    /// Maximum sampling interval as nanoseconds, never negative.
    pub fn max_delay_ns(&self) -> i64 {
        i64::from(self.max_delay_us.max(0)) * 1_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip_through_table() {
        for code in 0..=35 {
            let ty = SensorType::from_code(code).unwrap();
            assert_eq!(ty.code(), code);
        }
        assert_eq!(SensorType::from_code(36), None);
        assert_eq!(
            SensorType::from_code(0x10001),
            Some(SensorType::DevicePrivate(0x10001))
        );
    }

    #[test]
    fn test_expected_modes() {
        assert_eq!(
            SensorType::Accelerometer.expected_reporting_mode(),
            Some(ReportingMode::Continuous)
        );
        assert_eq!(
            SensorType::Light.expected_reporting_mode(),
            Some(ReportingMode::OnChange)
        );
        assert_eq!(
            SensorType::SignificantMotion.expected_reporting_mode(),
            Some(ReportingMode::OneShot)
        );
        assert_eq!(
            SensorType::StepDetector.expected_reporting_mode(),
            Some(ReportingMode::Special)
        );
        assert_eq!(SensorType::MetaData.expected_reporting_mode(), None);
        assert!(SensorType::AdditionalInfo.is_meta());
        assert!(!SensorType::Gyroscope.is_meta());
    }

    #[test]
    fn test_flags_layout() {
        let flags = SensorFlags::from_mode(ReportingMode::OneShot)
            .with(SensorFlags::WAKE_UP | SensorFlags::DIRECT_CHANNEL_ASHMEM)
            .with_max_direct_rate_level(3);

        assert_eq!(flags.reporting_mode(), ReportingMode::OneShot);
        assert!(flags.contains(SensorFlags::WAKE_UP));
        assert!(!flags.contains(SensorFlags::DIRECT_CHANNEL_GRALLOC));
        assert_eq!(flags.max_direct_rate_level(), 3);
        assert_eq!(flags.bits(), 0x1 | 0x4 | 0x400 | (3 << 7));
    }

    #[test]
    fn test_display() {
        assert_eq!(SensorType::Accelerometer.to_string(), "accelerometer");
        assert_eq!(
            SensorType::DevicePrivate(0x10002).to_string(),
            "device_private_0x10002"
        );
    }
}
