//! HalGuard - scoped release of session-wide HAL state
//!
//! Tracks activated sensors, registered direct channels, configured direct
//! reports and a non-normal operation mode, and releases all of them when
//! dropped, on every exit path of a scenario including panics. Release
//! failures are logged and never replace the scenario result.

use std::collections::BTreeSet;
use std::sync::Arc;

use contracts::{
    ChannelHandle, HalResult, OperationMode, RateLevel, ReportToken, SensorDescriptor,
    SensorHandle, SensorsHal, SharedMemInfo,
};
use tracing::{debug, trace, warn};

pub struct HalGuard {
    hal: Arc<dyn SensorsHal>,
    activated: BTreeSet<SensorHandle>,
    channels: BTreeSet<ChannelHandle>,
    reports: BTreeSet<(ChannelHandle, SensorHandle)>,
    restore_mode: bool,
}

impl HalGuard {
    pub fn new(hal: Arc<dyn SensorsHal>) -> Self {
        Self {
            hal,
            activated: BTreeSet::new(),
            channels: BTreeSet::new(),
            reports: BTreeSet::new(),
            restore_mode: false,
        }
    }

    /// Untracked calls (batch, flush, inject) go straight to the HAL.
    pub fn hal(&self) -> &dyn SensorsHal {
        self.hal.as_ref()
    }

    /// Activate or deactivate, remembering what needs turning off.
    pub fn activate(&mut self, handle: SensorHandle, enabled: bool) -> HalResult<()> {
        let result = self.hal.activate(handle, enabled);
        if result.is_ok() {
            if enabled {
                self.activated.insert(handle);
            } else {
                self.activated.remove(&handle);
            }
        }
        result
    }

    /// Configure every non-meta sensor at its fastest rate and (de)activate it.
    ///
    /// Individual failures are logged; the scenario asserts on delivery.
    pub fn activate_all(&mut self, sensors: &[SensorDescriptor], enabled: bool) {
        for sensor in sensors.iter().filter(|s| !s.sensor_type.is_meta()) {
            if enabled {
                if let Err(e) = self.hal.batch(sensor.handle, sensor.min_delay_ns(), 0) {
                    debug!(handle = %sensor.handle, error = %e, "batch failed");
                }
            }
            if let Err(e) = self.activate(sensor.handle, enabled) {
                debug!(handle = %sensor.handle, enabled, error = %e, "activate failed");
            }
        }
    }

    pub fn set_operation_mode(&mut self, mode: OperationMode) -> HalResult<()> {
        let result = self.hal.set_operation_mode(mode);
        if result.is_ok() {
            self.restore_mode = mode != OperationMode::Normal;
        } else if mode != OperationMode::Normal {
            // the HAL may have switched partially; restore anyway
            self.restore_mode = true;
        }
        result
    }

    pub fn register_direct_channel(&mut self, mem: &SharedMemInfo) -> HalResult<ChannelHandle> {
        let channel = self.hal.register_direct_channel(mem)?;
        self.channels.insert(channel);
        Ok(channel)
    }

    pub fn unregister_direct_channel(&mut self, channel: ChannelHandle) -> HalResult<()> {
        self.channels.remove(&channel);
        self.reports.retain(|(c, _)| *c != channel);
        self.hal.unregister_direct_channel(channel)
    }

    pub fn config_direct_report(
        &mut self,
        handle: SensorHandle,
        channel: ChannelHandle,
        rate: RateLevel,
    ) -> HalResult<ReportToken> {
        let token = self.hal.config_direct_report(handle, channel, rate)?;
        if rate == RateLevel::Stop {
            self.reports.remove(&(channel, handle));
        } else {
            self.reports.insert((channel, handle));
        }
        Ok(token)
    }

    /// Whether anything is still held.
    pub fn is_clean(&self) -> bool {
        self.activated.is_empty()
            && self.channels.is_empty()
            && self.reports.is_empty()
            && !self.restore_mode
    }
}

impl Drop for HalGuard {
    fn drop(&mut self) {
        if self.is_clean() {
            return;
        }
        trace!(
            sensors = self.activated.len(),
            channels = self.channels.len(),
            reports = self.reports.len(),
            restore_mode = self.restore_mode,
            "releasing HAL state"
        );

        for (channel, handle) in std::mem::take(&mut self.reports) {
            if let Err(e) = self.hal.config_direct_report(handle, channel, RateLevel::Stop) {
                warn!(channel, handle = %handle, error = %e, "failed to stop direct report");
            }
        }
        for channel in std::mem::take(&mut self.channels) {
            if let Err(e) = self.hal.unregister_direct_channel(channel) {
                warn!(channel, error = %e, "failed to unregister direct channel");
            }
        }
        for handle in std::mem::take(&mut self.activated) {
            if let Err(e) = self.hal.activate(handle, false) {
                warn!(handle = %handle, error = %e, "failed to deactivate sensor");
            }
        }
        if self.restore_mode {
            if let Err(e) = self.hal.set_operation_mode(OperationMode::Normal) {
                warn!(error = %e, "failed to restore normal operation mode");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SharedMemType;
    use mock_hal::MockSensorsHal;

    #[test]
    fn test_releases_on_drop() {
        let hal = Arc::new(MockSensorsHal::new().unwrap());
        {
            let mut guard = HalGuard::new(hal.clone());
            guard.activate(SensorHandle::new(1), true).unwrap();
            guard.activate(SensorHandle::new(2), true).unwrap();
            guard.set_operation_mode(OperationMode::DataInjection).unwrap();

            let mem = SharedMemInfo::with_record_capacity(SharedMemType::Ashmem, 64);
            let channel = guard.register_direct_channel(&mem).unwrap();
            guard
                .config_direct_report(SensorHandle::new(1), channel, RateLevel::Normal)
                .unwrap();

            assert_eq!(hal.active_sensors().len(), 2);
            assert_eq!(hal.channel_count(), 1);
            assert!(!guard.is_clean());
        }
        assert!(hal.active_sensors().is_empty());
        assert_eq!(hal.channel_count(), 0);
        assert_eq!(hal.operation_mode(), OperationMode::Normal);
    }

    #[test]
    fn test_releases_on_panic() {
        let hal = Arc::new(MockSensorsHal::new().unwrap());
        let guard_hal = hal.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let mut guard = HalGuard::new(guard_hal);
            guard.activate(SensorHandle::new(3), true).unwrap();
            panic!("assertion failed mid-scenario");
        }));
        assert!(result.is_err());
        assert!(hal.active_sensors().is_empty());
    }

    #[test]
    fn test_explicit_release_untracks() {
        let hal = Arc::new(MockSensorsHal::new().unwrap());
        let mut guard = HalGuard::new(hal.clone());
        guard.activate(SensorHandle::new(1), true).unwrap();
        guard.activate(SensorHandle::new(1), false).unwrap();
        guard.set_operation_mode(OperationMode::DataInjection).unwrap();
        guard.set_operation_mode(OperationMode::Normal).unwrap();
        assert!(guard.is_clean());

        // failed activations are not tracked
        assert!(guard.activate(SensorHandle::new(42), true).is_err());
        assert!(guard.is_clean());
    }
}
