//! Sensor list field validation

use contracts::{ReportingMode, SensorDescriptor, STANDARD_TYPE_PREFIX};

use crate::error::{ConformanceError, Result};

/// Validate every descriptor, stopping at the first malformed field.
pub fn validate_sensor_list(sensors: &[SensorDescriptor]) -> Result<()> {
    sensors.iter().try_for_each(validate_descriptor)
}

/// Validate one descriptor against the per-type tables.
pub fn validate_descriptor(s: &SensorDescriptor) -> Result<()> {
    let fail = |field: &'static str, message: String| -> Result<()> {
        Err(ConformanceError::invalid_descriptor(s, field, message))
    };

    if s.type_as_string.is_empty() {
        return fail("type_as_string", "is empty".into());
    }
    match s.sensor_type.canonical_string() {
        Some(expected) if s.type_as_string != expected => {
            return fail(
                "type_as_string",
                format!("is {:?}, expected {:?}", s.type_as_string, expected),
            );
        }
        None if s.type_as_string.starts_with(STANDARD_TYPE_PREFIX) => {
            return fail(
                "type_as_string",
                format!("{:?} uses the reserved prefix for a private type", s.type_as_string),
            );
        }
        _ => {}
    }

    if s.name.is_empty() {
        return fail("name", "is empty".into());
    }
    if s.vendor.is_empty() {
        return fail("vendor", "is empty".into());
    }
    if s.power < 0.0 {
        return fail("power", format!("is negative ({})", s.power));
    }
    if s.max_range <= 0.0 {
        return fail("max_range", format!("must be positive ({})", s.max_range));
    }
    if s.sensor_type.is_meta() {
        return fail("sensor_type", format!("{} never appears in a sensor list", s.sensor_type));
    }
    if s.fifo_max_event_count < s.fifo_reserved_event_count {
        return fail(
            "fifo_max_event_count",
            format!(
                "{} is below fifo_reserved_event_count {}",
                s.fifo_max_event_count, s.fifo_reserved_event_count
            ),
        );
    }

    let mode = s.reporting_mode();
    if let Some(expected) = s.sensor_type.expected_reporting_mode() {
        if mode != expected {
            return fail("flags", format!("reporting mode {mode:?}, expected {expected:?}"));
        }
    }

    if s.min_delay_us > s.max_delay_us {
        return fail(
            "min_delay_us",
            format!("{} exceeds max_delay_us {}", s.min_delay_us, s.max_delay_us),
        );
    }
    let delays_ok = match mode {
        ReportingMode::Continuous => s.min_delay_us > 0 && s.max_delay_us >= 0,
        ReportingMode::OnChange => s.min_delay_us >= 0 && s.max_delay_us >= 0,
        ReportingMode::OneShot => s.min_delay_us == -1 && s.max_delay_us == 0,
        ReportingMode::Special => true,
    };
    if !delays_ok {
        return fail(
            "min_delay_us",
            format!(
                "delays ({}, {}) do not match reporting mode {mode:?}",
                s.min_delay_us, s.max_delay_us
            ),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SensorFlags, SensorType};
    use mock_hal::default_catalog;

    fn accel() -> SensorDescriptor {
        default_catalog().remove(0)
    }

    fn field_of(result: Result<()>) -> &'static str {
        match result {
            Err(ConformanceError::InvalidDescriptor { field, .. }) => field,
            other => panic!("expected InvalidDescriptor, got {other:?}"),
        }
    }

    #[test]
    fn test_default_catalog_is_valid() {
        validate_sensor_list(&default_catalog()).unwrap();
    }

    #[test]
    fn test_type_string() {
        let mut s = accel();
        s.type_as_string = "android.sensor.gyroscope".into();
        assert_eq!(field_of(validate_descriptor(&s)), "type_as_string");

        let mut private = accel();
        private.sensor_type = SensorType::DevicePrivate(0x10001);
        private.type_as_string = "android.sensor.custom".into();
        assert_eq!(field_of(validate_descriptor(&private)), "type_as_string");

        private.type_as_string = "com.vendor.custom".into();
        validate_descriptor(&private).unwrap();
    }

    #[test]
    fn test_numeric_fields() {
        let mut s = accel();
        s.power = -0.1;
        assert_eq!(field_of(validate_descriptor(&s)), "power");

        let mut s = accel();
        s.max_range = 0.0;
        assert_eq!(field_of(validate_descriptor(&s)), "max_range");

        let mut s = accel();
        s.fifo_reserved_event_count = s.fifo_max_event_count + 1;
        assert_eq!(field_of(validate_descriptor(&s)), "fifo_max_event_count");

        let mut s = accel();
        s.vendor.clear();
        assert_eq!(field_of(validate_descriptor(&s)), "vendor");
    }

    #[test]
    fn test_meta_type_rejected() {
        let mut s = accel();
        s.sensor_type = SensorType::AdditionalInfo;
        s.type_as_string = "android.sensor.additional_info".into();
        assert_eq!(field_of(validate_descriptor(&s)), "sensor_type");
    }

    #[test]
    fn test_mode_and_delays() {
        let mut s = accel();
        s.flags = SensorFlags::from_mode(ReportingMode::OnChange);
        assert_eq!(field_of(validate_descriptor(&s)), "flags");

        let mut s = accel();
        s.min_delay_us = 0;
        assert_eq!(field_of(validate_descriptor(&s)), "min_delay_us");

        let mut s = accel();
        s.min_delay_us = 300_000;
        assert_eq!(field_of(validate_descriptor(&s)), "min_delay_us");

        let mut motion = default_catalog().remove(4);
        motion.min_delay_us = 0;
        assert_eq!(field_of(validate_descriptor(&motion)), "min_delay_us");
    }
}
