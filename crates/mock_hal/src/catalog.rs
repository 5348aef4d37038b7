//! Default sensor list of the mock HAL

use contracts::{
    RateLevel, ReportingMode, SensorDescriptor, SensorFlags, SensorHandle, SensorType,
};

const VENDOR: &str = "sensors-vts";

#[allow(clippy::too_many_arguments)]
fn descriptor(
    handle: i32,
    name: &str,
    sensor_type: SensorType,
    max_range: f32,
    resolution: f32,
    power: f32,
    delays_us: (i32, i32),
    fifo: (u32, u32),
    flags: SensorFlags,
) -> SensorDescriptor {
    SensorDescriptor {
        handle: SensorHandle::new(handle),
        name: name.to_string(),
        vendor: VENDOR.to_string(),
        version: 1,
        sensor_type,
        type_as_string: sensor_type
            .canonical_string()
            .unwrap_or_default()
            .to_string(),
        max_range,
        resolution,
        power,
        min_delay_us: delays_us.0,
        fifo_reserved_event_count: fifo.0,
        fifo_max_event_count: fifo.1,
        required_permission: String::new(),
        max_delay_us: delays_us.1,
        flags,
    }
}

/// Sensors exposed by a default `MockSensorsHal`.
///
/// | handle | sensor | mode | direct report |
/// |---|---|---|---|
/// | 1 | accelerometer (injectable) | continuous | ashmem + gralloc, up to very fast |
/// | 2 | gyroscope | continuous | ashmem + gralloc, up to very fast |
/// | 3 | magnetometer | continuous | ashmem, up to fast |
/// | 4 | light | on-change | none |
/// | 5 | significant motion (wake-up) | one-shot | none |
pub fn default_catalog() -> Vec<SensorDescriptor> {
    let direct_all = SensorFlags::DIRECT_CHANNEL_ASHMEM | SensorFlags::DIRECT_CHANNEL_GRALLOC;

    vec![
        descriptor(
            1,
            "Mock Accelerometer",
            SensorType::Accelerometer,
            39.226_6,
            0.001_2,
            0.15,
            (5_000, 200_000),
            (300, 3_000),
            SensorFlags::from_mode(ReportingMode::Continuous)
                .with(SensorFlags::DATA_INJECTION | direct_all)
                .with_max_direct_rate_level(RateLevel::VeryFast.level()),
        ),
        descriptor(
            2,
            "Mock Gyroscope",
            SensorType::Gyroscope,
            34.906_6,
            0.001,
            0.45,
            (5_000, 200_000),
            (300, 3_000),
            SensorFlags::from_mode(ReportingMode::Continuous)
                .with(direct_all)
                .with_max_direct_rate_level(RateLevel::VeryFast.level()),
        ),
        descriptor(
            3,
            "Mock Magnetometer",
            SensorType::MagneticField,
            1_300.0,
            0.15,
            0.6,
            (10_000, 200_000),
            (150, 3_000),
            SensorFlags::from_mode(ReportingMode::Continuous)
                .with(SensorFlags::DIRECT_CHANNEL_ASHMEM)
                .with_max_direct_rate_level(RateLevel::Fast.level()),
        ),
        descriptor(
            4,
            "Mock Light",
            SensorType::Light,
            43_000.0,
            1.0,
            0.1,
            (100_000, 1_000_000),
            (0, 0),
            SensorFlags::from_mode(ReportingMode::OnChange),
        ),
        descriptor(
            5,
            "Mock Significant Motion",
            SensorType::SignificantMotion,
            1.0,
            1.0,
            0.3,
            (-1, 0),
            (0, 0),
            SensorFlags::from_mode(ReportingMode::OneShot).with(SensorFlags::WAKE_UP),
        ),
    ]
}
