//! Mock HAL state, advanced by the delivery thread and mutated by HAL calls.

use std::collections::BTreeMap;

use contracts::{
    ChannelHandle, DirectReportRecord, EventQueueWriter, HalError, HalResult, OperationMode,
    RateLevel, ReportToken, ReportingMode, SensorDescriptor, SensorEvent, SensorHandle,
    SensorType, SharedMemInfo,
};
use rand::Rng;
use tracing::{debug, trace, warn};

use crate::config::MockConfig;
use crate::signal::SignalGenerator;

/// Fastest schedule used when a descriptor declares no minimum delay.
const MIN_PERIOD_NS: i64 = 1_000_000;

/// Delay before a one-shot sensor fires after activation.
const ONE_SHOT_DELAY_NS: i64 = 20_000_000;

/// Per-sensor state.
#[derive(Debug)]
pub(crate) struct SensorState {
    pub descriptor: SensorDescriptor,
    pub enabled: bool,
    period_ns: i64,
    latency_ns: i64,
    next_due_ns: i64,
    fifo: Vec<SensorEvent>,
    fifo_since_ns: Option<i64>,
    pending_flushes: u32,
    last_event: Option<SensorEvent>,
    replay: Option<SensorEvent>,
}

impl SensorState {
    fn new(descriptor: SensorDescriptor) -> Self {
        let mut state = Self {
            descriptor,
            enabled: false,
            period_ns: 0,
            latency_ns: 0,
            next_due_ns: 0,
            fifo: Vec::new(),
            fifo_since_ns: None,
            pending_flushes: 0,
            last_event: None,
            replay: None,
        };
        state.period_ns = state.effective_period(state.descriptor.max_delay_ns());
        state
    }

    /// Clamp a requested period into what the sensor supports.
    fn effective_period(&self, requested_ns: i64) -> i64 {
        let min = self.descriptor.min_delay_ns().max(MIN_PERIOD_NS);
        let clamped = requested_ns.max(min);
        match self.descriptor.max_delay_ns() {
            0 => clamped,
            max => clamped.min(max.max(min)),
        }
    }

    fn batching(&self) -> bool {
        self.latency_ns > 0 && self.descriptor.fifo_max_event_count > 0
    }

    fn emit<R: Rng>(&mut self, timestamp_ns: i64, signal: &mut SignalGenerator<R>) -> SensorEvent {
        let event = SensorEvent {
            sensor_handle: self.descriptor.handle,
            sensor_type: self.descriptor.sensor_type,
            timestamp_ns,
            payload: signal.payload(self.descriptor.sensor_type, timestamp_ns),
        };
        self.last_event = Some(event.clone());
        event
    }

    fn sample<R: Rng>(&mut self, now: i64, signal: &mut SignalGenerator<R>, out: &mut Vec<SensorEvent>) {
        if self.descriptor.reporting_mode() == ReportingMode::OneShot {
            if self.next_due_ns <= now {
                let event = self.emit(self.next_due_ns, signal);
                out.push(event);
                // one-shot sensors disable themselves after firing
                self.enabled = false;
            }
            return;
        }

        while self.next_due_ns <= now {
            let event = self.emit(self.next_due_ns, signal);
            if self.batching() {
                self.fifo_since_ns.get_or_insert(self.next_due_ns);
                self.fifo.push(event);
            } else {
                out.push(event);
            }
            self.next_due_ns += self.period_ns;
        }

        if self.batching() && !self.fifo.is_empty() {
            let full = self.fifo.len() >= self.descriptor.fifo_max_event_count as usize;
            let expired = self
                .fifo_since_ns
                .is_some_and(|since| now.saturating_sub(since) >= self.latency_ns);
            if full || expired {
                self.drain_fifo(out);
            }
        }
    }

    fn drain_fifo(&mut self, out: &mut Vec<SensorEvent>) {
        out.append(&mut self.fifo);
        self.fifo_since_ns = None;
    }

    fn next_deadline(&self, generating: bool) -> Option<i64> {
        if self.pending_flushes > 0 || self.replay.is_some() {
            return Some(i64::MIN);
        }
        if !(self.enabled && generating) {
            return None;
        }
        let fifo_deadline = self
            .fifo_since_ns
            .map(|since| since.saturating_add(self.latency_ns));
        Some(fifo_deadline.map_or(self.next_due_ns, |d| d.min(self.next_due_ns)))
    }
}

/// One sensor reporting into a direct channel.
#[derive(Debug)]
struct DirectReport {
    token: ReportToken,
    sensor_type: SensorType,
    period_ns: i64,
    next_due_ns: i64,
    counter: u32,
}

#[derive(Debug)]
struct DirectChannel {
    info: SharedMemInfo,
    write_index: usize,
    reports: BTreeMap<SensorHandle, DirectReport>,
}

impl DirectChannel {
    fn advance<R: Rng>(&mut self, now: i64, signal: &mut SignalGenerator<R>) {
        let capacity = self.info.record_capacity();
        if capacity == 0 {
            return;
        }
        for report in self.reports.values_mut() {
            while report.next_due_ns <= now {
                let values = signal.values(report.sensor_type, report.next_due_ns);
                let record = DirectReportRecord::new(
                    report.token,
                    report.sensor_type.code(),
                    report.counter,
                    report.next_due_ns,
                    &values,
                );
                let offset = (self.write_index % capacity) * DirectReportRecord::SIZE;
                if let Err(e) = self.info.memory.write_at(offset, record.as_bytes()) {
                    warn!(error = %e, "direct report write failed");
                    return;
                }
                self.write_index += 1;
                report.counter = report.counter.wrapping_add(1).max(1);
                report.next_due_ns += report.period_ns;
            }
        }
    }

    fn next_deadline(&self) -> Option<i64> {
        self.reports.values().map(|r| r.next_due_ns).min()
    }
}

/// Whole HAL state.
#[derive(Debug)]
pub(crate) struct HalState {
    pub sensors: BTreeMap<SensorHandle, SensorState>,
    pub mode: OperationMode,
    pub writer: Option<EventQueueWriter>,
    pub shutdown: bool,
    injected: Vec<SensorEvent>,
    channels: BTreeMap<ChannelHandle, DirectChannel>,
    next_channel: ChannelHandle,
    next_token: ReportToken,
}

impl HalState {
    pub fn new(catalog: Vec<SensorDescriptor>) -> Self {
        Self {
            sensors: catalog
                .into_iter()
                .map(|d| (d.handle, SensorState::new(d)))
                .collect(),
            mode: OperationMode::Normal,
            writer: None,
            shutdown: false,
            injected: Vec::new(),
            channels: BTreeMap::new(),
            next_channel: 1,
            next_token: 1,
        }
    }

    pub fn catalog(&self) -> Vec<SensorDescriptor> {
        self.sensors.values().map(|s| s.descriptor.clone()).collect()
    }

    fn sensor_mut(&mut self, handle: SensorHandle) -> HalResult<&mut SensorState> {
        self.sensors.get_mut(&handle).ok_or(HalError::BadValue)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Run every schedule up to `now`; returns the batch to deliver.
    pub fn advance<R: Rng>(
        &mut self,
        now: i64,
        signal: &mut SignalGenerator<R>,
        config: &MockConfig,
    ) -> Vec<SensorEvent> {
        let mut out = std::mem::take(&mut self.injected);
        let generating = self.mode == OperationMode::Normal;

        for sensor in self.sensors.values_mut() {
            if let Some(stale) = sensor.replay.take() {
                out.push(stale);
            }
            if sensor.enabled && generating {
                sensor.sample(now, signal, &mut out);
            }
            if sensor.pending_flushes > 0 {
                // buffered data always precedes the marker acknowledging it
                sensor.drain_fifo(&mut out);
                let markers = if config.drop_flush_markers {
                    0
                } else if config.duplicate_flush_markers {
                    sensor.pending_flushes * 2
                } else {
                    sensor.pending_flushes
                };
                for _ in 0..markers {
                    out.push(SensorEvent::flush_complete(sensor.descriptor.handle, now));
                }
                sensor.pending_flushes = 0;
            }
        }

        for channel in self.channels.values_mut() {
            channel.advance(now, signal);
        }
        out
    }

    /// Earliest instant at which `advance` has something to do.
    pub fn next_deadline(&self) -> Option<i64> {
        if !self.injected.is_empty() {
            return Some(i64::MIN);
        }
        let generating = self.mode == OperationMode::Normal;
        self.sensors
            .values()
            .filter_map(|s| s.next_deadline(generating))
            .chain(self.channels.values().filter_map(DirectChannel::next_deadline))
            .min()
    }

    pub fn initialize(&mut self, writer: EventQueueWriter, config: &MockConfig) {
        for sensor in self.sensors.values_mut() {
            sensor.enabled = false;
            sensor.fifo.clear();
            sensor.fifo_since_ns = None;
            sensor.pending_flushes = 0;
            sensor.replay = None;
        }
        self.injected.clear();
        self.mode = OperationMode::Normal;

        let keep_old = config.ignore_reinitialize
            && self.writer.as_ref().is_some_and(|w| !w.is_closed());
        if keep_old {
            debug!("ignoring new event queue");
        } else {
            self.writer = Some(writer);
        }
    }

    pub fn activate(
        &mut self,
        handle: SensorHandle,
        enabled: bool,
        now: i64,
        config: &MockConfig,
    ) -> HalResult<()> {
        let sensor = self.sensor_mut(handle)?;
        match (sensor.enabled, enabled) {
            (false, true) => {
                sensor.enabled = true;
                sensor.next_due_ns = if sensor.descriptor.is_one_shot() {
                    now + ONE_SHOT_DELAY_NS
                } else {
                    now + sensor.period_ns
                };
                if config.replay_stale_events {
                    sensor.replay = sensor.last_event.clone();
                }
            }
            (true, false) => {
                sensor.enabled = false;
                sensor.fifo.clear();
                sensor.fifo_since_ns = None;
            }
            _ => {}
        }
        trace!(handle = %handle, enabled, "activate");
        Ok(())
    }

    pub fn batch(
        &mut self,
        handle: SensorHandle,
        sampling_period_ns: i64,
        max_report_latency_ns: i64,
        now: i64,
    ) -> HalResult<()> {
        if sampling_period_ns < 0 || max_report_latency_ns < 0 {
            return Err(HalError::BadValue);
        }
        let sensor = self.sensor_mut(handle)?;
        sensor.period_ns = sensor.effective_period(sampling_period_ns);
        sensor.latency_ns = max_report_latency_ns;
        if sensor.enabled && !sensor.descriptor.is_one_shot() {
            sensor.next_due_ns = sensor.next_due_ns.min(now + sensor.period_ns);
        }
        if !sensor.batching() && !sensor.fifo.is_empty() {
            let mut drained = std::mem::take(&mut sensor.fifo);
            sensor.fifo_since_ns = None;
            self.injected.append(&mut drained);
        }
        Ok(())
    }

    pub fn flush(&mut self, handle: SensorHandle) -> HalResult<()> {
        let sensor = self.sensor_mut(handle)?;
        if sensor.descriptor.is_one_shot() || !sensor.enabled {
            return Err(HalError::BadValue);
        }
        sensor.pending_flushes += 1;
        Ok(())
    }

    pub fn inject(&mut self, event: &SensorEvent) -> HalResult<()> {
        if event.sensor_type == SensorType::AdditionalInfo {
            return Ok(());
        }
        let mode = self.mode;
        let sensor = self.sensor_mut(event.sensor_handle)?;
        if !sensor.descriptor.supports_data_injection() {
            return Err(HalError::InvalidOperation);
        }
        if mode != OperationMode::DataInjection {
            return Err(HalError::BadValue);
        }
        self.injected.push(event.clone());
        Ok(())
    }

    pub fn register_channel(&mut self, info: &SharedMemInfo) -> HalResult<ChannelHandle> {
        if info.size < DirectReportRecord::SIZE || info.memory.len() < info.size {
            return Err(HalError::BadValue);
        }
        info.memory.fill(0);

        let handle = self.next_channel;
        self.next_channel += 1;
        self.channels.insert(
            handle,
            DirectChannel {
                info: info.clone(),
                write_index: 0,
                reports: BTreeMap::new(),
            },
        );
        debug!(channel = handle, mem_type = %info.mem_type, size = info.size, "direct channel registered");
        Ok(handle)
    }

    pub fn unregister_channel(&mut self, channel: ChannelHandle) -> HalResult<()> {
        self.channels
            .remove(&channel)
            .map(|_| ())
            .ok_or(HalError::BadValue)
    }

    pub fn config_report(
        &mut self,
        handle: SensorHandle,
        channel: ChannelHandle,
        rate: RateLevel,
        now: i64,
    ) -> HalResult<ReportToken> {
        let descriptor = self
            .sensors
            .get(&handle)
            .map(|s| s.descriptor.clone())
            .ok_or(HalError::BadValue)?;
        let next_token = self.next_token;
        let direct = self.channels.get_mut(&channel).ok_or(HalError::BadValue)?;

        let Some(period_ns) = rate.period_ns() else {
            direct.reports.remove(&handle);
            return Ok(0);
        };
        if !descriptor.supports_channel(direct.info.mem_type) || !descriptor.supports_direct_rate(rate) {
            return Err(HalError::BadValue);
        }

        let report = direct.reports.entry(handle).or_insert(DirectReport {
            token: next_token,
            sensor_type: descriptor.sensor_type,
            period_ns,
            next_due_ns: now + period_ns,
            counter: 1,
        });
        report.period_ns = period_ns;
        let token = report.token;
        if token == next_token {
            self.next_token += 1;
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use contracts::{event_queue, SharedMemType};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const MS: i64 = 1_000_000;

    fn setup() -> (HalState, SignalGenerator<StdRng>, MockConfig) {
        let config = MockConfig::default();
        let signal = SignalGenerator::new(StdRng::seed_from_u64(1), &config);
        (HalState::new(default_catalog()), signal, config)
    }

    #[test]
    fn test_fixed_schedule() {
        let (mut state, mut signal, config) = setup();
        let accel = SensorHandle::new(1);
        state.batch(accel, 20 * MS, 0, 0).unwrap();
        state.activate(accel, true, 0, &config).unwrap();

        let out = state.advance(100 * MS, &mut signal, &config);
        let ts: Vec<i64> = out.iter().map(|e| e.timestamp_ns).collect();
        assert_eq!(ts, vec![20 * MS, 40 * MS, 60 * MS, 80 * MS, 100 * MS]);
    }

    #[test]
    fn test_period_is_clamped() {
        let (mut state, mut signal, config) = setup();
        let accel = SensorHandle::new(1);
        state.batch(accel, 1, 0, 0).unwrap();
        state.activate(accel, true, 0, &config).unwrap();
        let out = state.advance(10 * MS, &mut signal, &config);
        assert_eq!(out.len(), 2);
        assert!(state.batch(accel, -1, 0, 0).is_err());
    }

    #[test]
    fn test_flush_marker_follows_fifo_data() {
        let (mut state, mut signal, config) = setup();
        let accel = SensorHandle::new(1);
        state.batch(accel, 5 * MS, i64::MAX, 0).unwrap();
        state.activate(accel, true, 0, &config).unwrap();

        assert!(state.advance(50 * MS, &mut signal, &config).is_empty());
        state.flush(accel).unwrap();
        let out = state.advance(50 * MS, &mut signal, &config);
        assert_eq!(out.len(), 11);
        assert!(out[..10].iter().all(SensorEvent::is_data));
        assert!(out[10].is_flush_complete());
    }

    #[test]
    fn test_fifo_delivers_when_full() {
        let (mut state, mut signal, config) = setup();
        let mag = SensorHandle::new(3);
        state.batch(mag, 10 * MS, i64::MAX, 0).unwrap();
        state.activate(mag, true, 0, &config).unwrap();
        let out = state.advance(30_000 * MS, &mut signal, &config);
        assert_eq!(out.len(), 3_000);
    }

    #[test]
    fn test_flush_rejections() {
        let (mut state, _, config) = setup();
        assert_eq!(state.flush(SensorHandle::new(1)), Err(HalError::BadValue));
        assert_eq!(state.flush(SensorHandle::new(99)), Err(HalError::BadValue));
        state.activate(SensorHandle::new(5), true, 0, &config).unwrap();
        assert_eq!(state.flush(SensorHandle::new(5)), Err(HalError::BadValue));
    }

    #[test]
    fn test_one_shot_fires_once() {
        let (mut state, mut signal, config) = setup();
        let motion = SensorHandle::new(5);
        state.activate(motion, true, 0, &config).unwrap();
        let out = state.advance(1_000 * MS, &mut signal, &config);
        assert_eq!(out.len(), 1);
        assert!(!state.sensors[&motion].enabled);
        assert!(state.advance(2_000 * MS, &mut signal, &config).is_empty());
    }

    #[test]
    fn test_duplicate_and_dropped_markers() {
        let (mut state, mut signal, _) = setup();
        let accel = SensorHandle::new(1);
        let duplicate = MockConfig {
            duplicate_flush_markers: true,
            ..Default::default()
        };
        state.activate(accel, true, 0, &duplicate).unwrap();
        state.flush(accel).unwrap();
        let out = state.advance(0, &mut signal, &duplicate);
        assert_eq!(out.iter().filter(|e| e.is_flush_complete()).count(), 2);

        let dropping = MockConfig {
            drop_flush_markers: true,
            ..Default::default()
        };
        state.flush(accel).unwrap();
        let out = state.advance(0, &mut signal, &dropping);
        assert_eq!(out.iter().filter(|e| e.is_flush_complete()).count(), 0);
    }

    #[test]
    fn test_replay_stale_event() {
        let (mut state, mut signal, _) = setup();
        let config = MockConfig {
            replay_stale_events: true,
            ..Default::default()
        };
        let gyro = SensorHandle::new(2);
        state.batch(gyro, 10 * MS, 0, 0).unwrap();
        state.activate(gyro, true, 0, &config).unwrap();
        let before = state.advance(30 * MS, &mut signal, &config);
        state.activate(gyro, false, 30 * MS, &config).unwrap();

        state.activate(gyro, true, 2_000 * MS, &config).unwrap();
        let after = state.advance(2_000 * MS, &mut signal, &config);
        assert_eq!(after[0].timestamp_ns, before.last().unwrap().timestamp_ns);
    }

    #[test]
    fn test_injection_rules() {
        let (mut state, mut signal, config) = setup();
        let event = SensorEvent::vec3(
            SensorHandle::new(1),
            SensorType::Accelerometer,
            5,
            contracts::Vec3::new(1.0, 2.0, 3.0),
        );
        assert_eq!(state.inject(&event), Err(HalError::BadValue));

        state.mode = OperationMode::DataInjection;
        state.inject(&event).unwrap();
        assert_eq!(state.advance(0, &mut signal, &config), vec![event]);

        let gyro = SensorEvent::vec3(
            SensorHandle::new(2),
            SensorType::Gyroscope,
            5,
            contracts::Vec3::new(0.0, 0.0, 0.0),
        );
        assert_eq!(state.inject(&gyro), Err(HalError::InvalidOperation));
    }

    #[test]
    fn test_direct_report_records() {
        let (mut state, mut signal, config) = setup();
        let info = SharedMemInfo::with_record_capacity(SharedMemType::Ashmem, 64);
        info.memory.fill(0xCC);
        let channel = state.register_channel(&info).unwrap();
        assert!(info.memory.snapshot().iter().all(|b| *b == 0));

        let accel = SensorHandle::new(1);
        let token = state
            .config_report(accel, channel, RateLevel::Normal, 0)
            .unwrap();
        assert!(token > 0);
        state.advance(100 * MS, &mut signal, &config);

        let snapshot = info.memory.snapshot();
        let first = DirectReportRecord::read_at(&snapshot, 0).unwrap();
        let fifth = DirectReportRecord::read_at(&snapshot, 4).unwrap();
        assert_eq!(first.size, 104);
        assert_eq!(first.report_token, token);
        assert_eq!(first.counter, 1);
        assert_eq!(fifth.counter, 5);
        assert_eq!(fifth.timestamp - first.timestamp, 80 * MS);
        assert_eq!(DirectReportRecord::read_at(&snapshot, 5).unwrap().counter, 0);

        assert_eq!(state.config_report(accel, channel, RateLevel::Stop, 0), Ok(0));
        let mag = SensorHandle::new(3);
        assert_eq!(
            state.config_report(mag, channel, RateLevel::VeryFast, 0),
            Err(HalError::BadValue)
        );
        state.unregister_channel(channel).unwrap();
        assert_eq!(state.unregister_channel(channel), Err(HalError::BadValue));
    }

    #[test]
    fn test_initialize_resets_and_swaps_queue() {
        let (mut state, _, config) = setup();
        let (first, _first_reader) = event_queue(1);
        state.initialize(first, &config);
        state.activate(SensorHandle::new(1), true, 0, &config).unwrap();

        let (second, _second_reader) = event_queue(1);
        state.initialize(second, &config);
        assert!(state.sensors.values().all(|s| !s.enabled));

        let sticky = MockConfig {
            ignore_reinitialize: true,
            ..Default::default()
        };
        let (third, third_reader) = event_queue(1);
        state.initialize(third, &sticky);
        state
            .writer
            .as_ref()
            .unwrap()
            .write(&[SensorEvent::flush_complete(SensorHandle::new(1), 0)]);
        assert!(third_reader.is_empty());
    }
}
