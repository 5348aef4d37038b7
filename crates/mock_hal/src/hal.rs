//! MockSensorsHal - in-process `SensorsHal` with a single delivery thread

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{
    elapsed_realtime_nanos, ChannelHandle, EventQueueWriter, HalError, HalResult, OperationMode,
    RateLevel, ReportToken, SensorDescriptor, SensorEvent, SensorHandle, SensorsHal,
    SharedMemInfo,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, instrument, trace};

use crate::catalog::default_catalog;
use crate::config::MockConfig;
use crate::error::Result;
use crate::signal::SignalGenerator;
use crate::state::HalState;

/// Longest the delivery thread sleeps without a deadline.
const MAX_IDLE: Duration = Duration::from_millis(50);

struct Inner {
    state: Mutex<HalState>,
    wake: Condvar,
    config: MockConfig,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a HAL call, waking the delivery thread afterwards.
    fn with_state<T>(&self, f: impl FnOnce(&mut HalState) -> HalResult<T>) -> HalResult<T> {
        let result = f(&mut self.lock());
        self.wake.notify_all();
        result
    }

    /// Accept an unknown handle when the fault is configured.
    fn tolerate_invalid(&self, handle: SensorHandle, result: HalResult<()>) -> HalResult<()> {
        match result {
            Err(HalError::BadValue)
                if self.config.accept_invalid_handles
                    && !self.lock().sensors.contains_key(&handle) =>
            {
                trace!(handle = %handle, "accepting invalid handle");
                Ok(())
            }
            other => other,
        }
    }
}

/// Reference HAL.
///
/// Events are produced on a fixed schedule (`next_due += period`) by one
/// delivery thread, so timestamps are exact multiples of the sampling period
/// and ordering per handle is guaranteed.
pub struct MockSensorsHal {
    inner: Arc<Inner>,
    thread: Option<JoinHandle<()>>,
}

impl MockSensorsHal {
    /// Healthy HAL with the default catalog.
    pub fn new() -> Result<Self> {
        Self::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Result<Self> {
        Self::with_catalog(config, default_catalog())
    }

    #[instrument(name = "mock_hal_start", skip(config, catalog), fields(sensors = catalog.len(), faulty = config.is_faulty()))]
    pub fn with_catalog(config: MockConfig, catalog: Vec<SensorDescriptor>) -> Result<Self> {
        let signal = SignalGenerator::new(StdRng::seed_from_u64(rand::random()), &config);
        let inner = Arc::new(Inner {
            state: Mutex::new(HalState::new(catalog)),
            wake: Condvar::new(),
            config,
        });

        let thread_inner = inner.clone();
        let thread = thread::Builder::new()
            .name("mock-hal-delivery".into())
            .spawn(move || deliver(thread_inner, signal))?;

        info!("mock sensors HAL started");
        Ok(Self {
            inner,
            thread: Some(thread),
        })
    }

    pub fn config(&self) -> &MockConfig {
        &self.inner.config
    }

    /// Handles currently enabled.
    pub fn active_sensors(&self) -> Vec<SensorHandle> {
        self.inner
            .lock()
            .sensors
            .values()
            .filter(|s| s.enabled)
            .map(|s| s.descriptor.handle)
            .collect()
    }

    pub fn operation_mode(&self) -> OperationMode {
        self.inner.lock().mode
    }

    /// Registered direct channels.
    pub fn channel_count(&self) -> usize {
        self.inner.lock().channel_count()
    }
}

fn deliver(inner: Arc<Inner>, mut signal: SignalGenerator<StdRng>) {
    debug!("delivery thread started");
    let mut state = inner.lock();
    while !state.shutdown {
        let now = elapsed_realtime_nanos();
        let batch = state.advance(now, &mut signal, &inner.config);

        if !batch.is_empty() {
            let writer = state.writer.clone();
            // never hold the state lock while the queue may block
            drop(state);
            match writer {
                Some(writer) if writer.write(&batch) => {
                    trace!(len = batch.len(), "batch written");
                }
                _ => trace!(len = batch.len(), "no attached queue, batch dropped"),
            }
            state = inner.lock();
            continue;
        }

        let wait = state
            .next_deadline()
            .map(|deadline| {
                let nanos = deadline.saturating_sub(elapsed_realtime_nanos()).max(0);
                Duration::from_nanos(nanos as u64).min(MAX_IDLE)
            })
            .unwrap_or(MAX_IDLE);
        if wait.is_zero() {
            continue;
        }
        state = inner
            .wake
            .wait_timeout(state, wait)
            .unwrap_or_else(PoisonError::into_inner)
            .0;
    }
    debug!("delivery thread stopped");
}

impl Drop for MockSensorsHal {
    fn drop(&mut self) {
        self.inner.lock().shutdown = true;
        self.inner.wake.notify_all();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl SensorsHal for MockSensorsHal {
    fn get_sensors_list(&self) -> Vec<SensorDescriptor> {
        self.inner.lock().catalog()
    }

    fn set_operation_mode(&self, mode: OperationMode) -> HalResult<()> {
        debug!(?mode, "set operation mode");
        self.inner.with_state(|state| {
            state.mode = mode;
            Ok(())
        })
    }

    fn activate(&self, handle: SensorHandle, enabled: bool) -> HalResult<()> {
        let config = &self.inner.config;
        let result = self
            .inner
            .with_state(|state| state.activate(handle, enabled, elapsed_realtime_nanos(), config));
        self.inner.tolerate_invalid(handle, result)
    }

    fn batch(
        &self,
        handle: SensorHandle,
        sampling_period_ns: i64,
        max_report_latency_ns: i64,
    ) -> HalResult<()> {
        let result = self.inner.with_state(|state| {
            state.batch(
                handle,
                sampling_period_ns,
                max_report_latency_ns,
                elapsed_realtime_nanos(),
            )
        });
        self.inner.tolerate_invalid(handle, result)
    }

    fn flush(&self, handle: SensorHandle) -> HalResult<()> {
        let result = self.inner.with_state(|state| state.flush(handle));
        self.inner.tolerate_invalid(handle, result)
    }

    fn inject_sensor_data(&self, event: &SensorEvent) -> HalResult<()> {
        let result = self.inner.with_state(|state| state.inject(event));
        self.inner.tolerate_invalid(event.sensor_handle, result)
    }

    fn register_direct_channel(&self, mem: &SharedMemInfo) -> HalResult<ChannelHandle> {
        if self.inner.config.reject_direct_channels {
            return Err(HalError::NoMemory);
        }
        self.inner.with_state(|state| state.register_channel(mem))
    }

    fn unregister_direct_channel(&self, channel: ChannelHandle) -> HalResult<()> {
        self.inner
            .with_state(|state| state.unregister_channel(channel))
    }

    fn config_direct_report(
        &self,
        handle: SensorHandle,
        channel: ChannelHandle,
        rate: RateLevel,
    ) -> HalResult<ReportToken> {
        self.inner.with_state(|state| {
            state.config_report(handle, channel, rate, elapsed_realtime_nanos())
        })
    }

    fn initialize(&self, queue: EventQueueWriter) -> HalResult<()> {
        let config = &self.inner.config;
        self.inner.with_state(|state| {
            state.initialize(queue, config);
            Ok(())
        })
    }
}
