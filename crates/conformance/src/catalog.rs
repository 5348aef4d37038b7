//! SensorCatalog - typed lookup over the sensor list

use contracts::{ReportingMode, SensorDescriptor, SensorHandle, SensorType, SensorsHal};

/// Snapshot of the sensor list of the HAL under test.
#[derive(Debug, Clone, Default)]
pub struct SensorCatalog {
    sensors: Vec<SensorDescriptor>,
}

impl SensorCatalog {
    /// Query the HAL.
    pub fn fetch(hal: &dyn SensorsHal) -> Self {
        Self::from_sensors(hal.get_sensors_list())
    }

    pub fn from_sensors(sensors: Vec<SensorDescriptor>) -> Self {
        Self { sensors }
    }

    pub fn sensors(&self) -> &[SensorDescriptor] {
        &self.sensors
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn get(&self, handle: SensorHandle) -> Option<&SensorDescriptor> {
        self.sensors.iter().find(|s| s.handle == handle)
    }

    /// First sensor of `sensor_type` in list order.
    pub fn default_sensor(&self, sensor_type: SensorType) -> Option<&SensorDescriptor> {
        self.sensors.iter().find(|s| s.sensor_type == sensor_type)
    }

    pub fn by_type(&self, sensor_type: SensorType) -> Vec<SensorDescriptor> {
        self.filtered(|s| s.sensor_type == sensor_type)
    }

    pub fn by_mode(&self, mode: ReportingMode) -> Vec<SensorDescriptor> {
        self.filtered(|s| s.reporting_mode() == mode)
    }

    pub fn one_shot(&self) -> Vec<SensorDescriptor> {
        self.by_mode(ReportingMode::OneShot)
    }

    pub fn non_one_shot(&self) -> Vec<SensorDescriptor> {
        self.filtered(|s| !s.is_one_shot())
    }

    /// Continuous and on-change sensors, the ones with a regular event stream.
    pub fn streaming(&self) -> Vec<SensorDescriptor> {
        self.filtered(|s| {
            matches!(
                s.reporting_mode(),
                ReportingMode::Continuous | ReportingMode::OnChange
            )
        })
    }

    pub fn injectable(&self) -> Vec<SensorDescriptor> {
        self.filtered(SensorDescriptor::supports_data_injection)
    }

    /// A handle not used by any listed sensor: largest handle + 1, or the
    /// highest free handle below it once the list holds `i32::MAX`.
    pub fn invalid_handle(&self) -> SensorHandle {
        let next = self
            .sensors
            .iter()
            .map(|s| s.handle)
            .max()
            .unwrap_or_default()
            .max(SensorHandle::default())
            .next();
        if self.get(next).is_none() {
            return next;
        }
        (i32::MIN..i32::MAX)
            .rev()
            .map(SensorHandle::new)
            .find(|h| self.get(*h).is_none())
            .unwrap_or_default()
    }

    /// Largest `min_delay` across the list, in nanoseconds.
    pub fn max_min_delay_ns(&self) -> i64 {
        self.sensors
            .iter()
            .map(SensorDescriptor::min_delay_ns)
            .max()
            .unwrap_or(0)
    }

    fn filtered(&self, predicate: impl Fn(&SensorDescriptor) -> bool) -> Vec<SensorDescriptor> {
        self.sensors.iter().filter(|s| predicate(s)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock_hal::default_catalog;

    #[test]
    fn test_lookup() {
        let catalog = SensorCatalog::from_sensors(default_catalog());
        assert_eq!(catalog.len(), 5);

        let accel = catalog.default_sensor(SensorType::Accelerometer).unwrap();
        assert_eq!(accel.handle, SensorHandle::new(1));
        assert!(catalog.default_sensor(SensorType::Pressure).is_none());

        assert_eq!(catalog.one_shot().len(), 1);
        assert_eq!(catalog.non_one_shot().len(), 4);
        assert_eq!(catalog.streaming().len(), 4);
        assert_eq!(catalog.injectable().len(), 1);
        assert_eq!(catalog.by_mode(ReportingMode::OnChange).len(), 1);
        assert_eq!(catalog.max_min_delay_ns(), 100_000_000);
    }

    #[test]
    fn test_invalid_handle() {
        let catalog = SensorCatalog::from_sensors(default_catalog());
        let invalid = catalog.invalid_handle();
        assert_eq!(invalid, SensorHandle::new(6));
        assert!(catalog.get(invalid).is_none());

        assert_eq!(SensorCatalog::default().invalid_handle(), SensorHandle::new(1));
    }

    #[test]
    fn test_invalid_handle_at_max() {
        let mut sensors = default_catalog();
        sensors[0].handle = SensorHandle::new(i32::MAX);
        sensors[1].handle = SensorHandle::new(i32::MAX - 1);
        let catalog = SensorCatalog::from_sensors(sensors);

        let invalid = catalog.invalid_handle();
        assert_eq!(invalid, SensorHandle::new(i32::MAX - 2));
        assert!(catalog.get(invalid).is_none());
    }
}
