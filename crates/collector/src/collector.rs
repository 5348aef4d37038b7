//! EventCollector - per-handle event and flush-marker accumulation
//!
//! Two independent locks, one per map, each paired with its own condvar.
//! The locks are never nested; wait predicates read the guarded map they
//! were handed instead of calling back into the accessors.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{SensorDescriptor, SensorEvent, SensorHandle};
use tracing::{debug, trace};

use crate::metrics::CollectorMetrics;
use crate::sink::EventSink;

/// Collects events delivered by a session.
///
/// Safe to feed from the reader thread while a test thread reads or waits.
#[derive(Debug, Default)]
pub struct EventCollector {
    flushes: Mutex<HashMap<SensorHandle, u32>>,
    flush_cv: Condvar,
    events: Mutex<HashMap<SensorHandle, Vec<SensorEvent>>>,
    event_cv: Condvar,
    metrics: CollectorMetrics,
}

/// Lock ignoring poisoning: a panicking scenario must not wedge the reader thread.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of flush-completion markers received for `handle`.
    pub fn flush_count(&self, handle: SensorHandle) -> u32 {
        lock(&self.flushes).get(&handle).copied().unwrap_or(0)
    }

    /// Snapshot of the data events received for `handle`, in delivery order.
    pub fn events(&self, handle: SensorHandle) -> Vec<SensorEvent> {
        lock(&self.events).get(&handle).cloned().unwrap_or_default()
    }

    /// Number of data events received for `handle`.
    pub fn event_count(&self, handle: SensorHandle) -> usize {
        lock(&self.events).get(&handle).map_or(0, Vec::len)
    }

    /// Block until every sensor has at least `expected_per_sensor` flush
    /// markers or `timeout` elapses.
    ///
    /// Level triggered; returns whether the condition holds on return.
    pub fn wait_for_flush_events(
        &self,
        sensors: &[SensorDescriptor],
        expected_per_sensor: u32,
        timeout: Duration,
    ) -> bool {
        let guard = lock(&self.flushes);
        let (guard, result) = self
            .flush_cv
            .wait_timeout_while(guard, timeout, |flushes| {
                !sensors.iter().all(|s| {
                    flushes.get(&s.handle).copied().unwrap_or(0) >= expected_per_sensor
                })
            })
            .unwrap_or_else(PoisonError::into_inner);
        drop(guard);

        let satisfied = !result.timed_out();
        debug!(
            sensors = sensors.len(),
            expected = expected_per_sensor,
            satisfied,
            "flush wait finished"
        );
        satisfied
    }

    /// Block until every sensor has at least one data event or `timeout` elapses.
    pub fn wait_for_events(&self, sensors: &[SensorDescriptor], timeout: Duration) -> bool {
        let guard = lock(&self.events);
        let (_guard, result) = self
            .event_cv
            .wait_timeout_while(guard, timeout, |events| {
                !sensors
                    .iter()
                    .all(|s| events.get(&s.handle).is_some_and(|v| !v.is_empty()))
            })
            .unwrap_or_else(PoisonError::into_inner);

        let satisfied = !result.timed_out();
        debug!(sensors = sensors.len(), satisfied, "event wait finished");
        satisfied
    }

    /// Block until `handle` has at least `count` data events or `timeout` elapses.
    pub fn wait_for_event_count(
        &self,
        handle: SensorHandle,
        count: usize,
        timeout: Duration,
    ) -> bool {
        let guard = lock(&self.events);
        let (_guard, result) = self
            .event_cv
            .wait_timeout_while(guard, timeout, |events| {
                events.get(&handle).map_or(0, Vec::len) < count
            })
            .unwrap_or_else(PoisonError::into_inner);
        !result.timed_out()
    }

    /// Clear all accumulated state.
    ///
    /// Callers must make sure no delivery is in flight.
    pub fn reset(&self) {
        lock(&self.flushes).clear();
        lock(&self.events).clear();
        self.metrics.reset();
    }

    pub fn metrics(&self) -> &CollectorMetrics {
        &self.metrics
    }
}

impl EventSink for EventCollector {
    fn on_event(&self, event: &SensorEvent) {
        self.on_events(std::slice::from_ref(event));
    }

    /// Each lock is taken at most once per batch, so a waiter never observes
    /// half a batch.
    fn on_events(&self, batch: &[SensorEvent]) {
        let mut flush_markers = 0u64;
        let mut data_events = 0u64;
        let mut info_events = 0u64;

        if batch.iter().any(SensorEvent::is_flush_complete) {
            let mut flushes = lock(&self.flushes);
            for event in batch.iter().filter(|e| e.is_flush_complete()) {
                *flushes.entry(event.sensor_handle).or_insert(0) += 1;
                flush_markers += 1;
            }
        }
        if flush_markers > 0 {
            self.flush_cv.notify_all();
        }

        if batch.iter().any(SensorEvent::is_data) {
            let mut events = lock(&self.events);
            for event in batch.iter().filter(|e| e.is_data()) {
                events
                    .entry(event.sensor_handle)
                    .or_default()
                    .push(event.clone());
                data_events += 1;
            }
        }
        if data_events > 0 {
            self.event_cv.notify_all();
        }

        for event in batch {
            if !event.is_data() && !event.is_flush_complete() {
                trace!(handle = %event.sensor_handle, sensor_type = %event.sensor_type, "info event");
                info_events += 1;
            }
        }

        self.metrics.record_batch();
        self.metrics.record_flush(flush_markers);
        self.metrics.record_data(data_events);
        self.metrics.record_info(info_events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SensorFlags, SensorType, Vec3};
    use rand::Rng;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn descriptor(handle: i32) -> SensorDescriptor {
        SensorDescriptor {
            handle: SensorHandle::new(handle),
            name: format!("sensor {handle}"),
            vendor: "test".into(),
            version: 1,
            sensor_type: SensorType::Accelerometer,
            type_as_string: "android.sensor.accelerometer".into(),
            max_range: 39.2,
            resolution: 0.01,
            power: 0.2,
            min_delay_us: 5000,
            fifo_reserved_event_count: 0,
            fifo_max_event_count: 0,
            required_permission: String::new(),
            max_delay_us: 200_000,
            flags: SensorFlags::default(),
        }
    }

    fn data(handle: i32, ts: i64) -> SensorEvent {
        SensorEvent::vec3(
            SensorHandle::new(handle),
            SensorType::Accelerometer,
            ts,
            Vec3::new(0.0, 0.0, 9.8),
        )
    }

    #[test]
    fn test_unknown_handle_is_empty() {
        let collector = EventCollector::new();
        assert_eq!(collector.flush_count(SensorHandle::new(9)), 0);
        assert!(collector.events(SensorHandle::new(9)).is_empty());
    }

    #[test]
    fn test_classification_and_order() {
        let collector = EventCollector::new();
        collector.on_events(&[
            data(1, 10),
            SensorEvent::flush_complete(SensorHandle::new(1), 11),
            data(1, 12),
            data(2, 13),
            SensorEvent::scalar(SensorHandle::new(1), SensorType::AdditionalInfo, 14, 0.0),
        ]);

        let ts: Vec<i64> = collector
            .events(SensorHandle::new(1))
            .iter()
            .map(|e| e.timestamp_ns)
            .collect();
        assert_eq!(ts, vec![10, 12]);
        assert_eq!(collector.flush_count(SensorHandle::new(1)), 1);
        assert_eq!(collector.event_count(SensorHandle::new(2)), 1);

        let snapshot = collector.metrics().snapshot();
        assert_eq!(snapshot.data_events, 3);
        assert_eq!(snapshot.flush_markers, 1);
        assert_eq!(snapshot.info_events, 1);
        assert_eq!(snapshot.total(), 5);
    }

    #[test]
    fn test_wait_is_level_triggered() {
        let collector = EventCollector::new();
        collector.on_event(&SensorEvent::flush_complete(SensorHandle::new(1), 0));
        collector.on_event(&data(1, 1));

        let start = Instant::now();
        assert!(collector.wait_for_flush_events(&[descriptor(1)], 1, Duration::from_secs(5)));
        assert!(collector.wait_for_events(&[descriptor(1)], Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_times_out_without_error() {
        let collector = EventCollector::new();
        let start = Instant::now();
        assert!(!collector.wait_for_flush_events(
            &[descriptor(1)],
            1,
            Duration::from_millis(50)
        ));
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(!collector.wait_for_events(&[descriptor(1)], Duration::from_millis(10)));
    }

    #[test]
    fn test_wait_wakes_on_delivery() {
        let collector = Arc::new(EventCollector::new());
        let producer = {
            let collector = collector.clone();
            thread::spawn(move || {
                for i in 0..3 {
                    thread::sleep(Duration::from_millis(20));
                    collector.on_event(&SensorEvent::flush_complete(SensorHandle::new(1), i));
                    collector.on_event(&SensorEvent::flush_complete(SensorHandle::new(2), i));
                }
            })
        };

        assert!(collector.wait_for_flush_events(
            &[descriptor(1), descriptor(2)],
            3,
            Duration::from_secs(5)
        ));
        producer.join().unwrap();
        assert_eq!(collector.flush_count(SensorHandle::new(1)), 3);
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        let collector = Arc::new(EventCollector::new());
        let producers: Vec<_> = (1..=4)
            .map(|handle| {
                let collector = collector.clone();
                thread::spawn(move || {
                    let mut rng = rand::rng();
                    let mut ts = 0;
                    while ts < 1000 {
                        let n = rng.random_range(1..=16).min(1000 - ts);
                        let mut batch: Vec<_> = (ts..ts + n).map(|t| data(handle, t)).collect();
                        batch.push(SensorEvent::flush_complete(SensorHandle::new(handle), ts));
                        collector.on_events(&batch);
                        ts += n;
                    }
                })
            })
            .collect();

        assert!(collector.wait_for_event_count(SensorHandle::new(3), 1000, Duration::from_secs(10)));
        for producer in producers {
            producer.join().unwrap();
        }

        for handle in 1..=4 {
            let events = collector.events(SensorHandle::new(handle));
            assert_eq!(events.len(), 1000);
            assert!(events.windows(2).all(|w| w[0].timestamp_ns < w[1].timestamp_ns));
            assert!(collector.flush_count(SensorHandle::new(handle)) > 0);
        }
        assert_eq!(collector.metrics().snapshot().data_events, 4000);
    }

    #[test]
    fn test_reset() {
        let collector = EventCollector::new();
        collector.on_events(&[data(1, 1), SensorEvent::flush_complete(SensorHandle::new(1), 2)]);
        collector.reset();
        assert_eq!(collector.flush_count(SensorHandle::new(1)), 0);
        assert_eq!(collector.event_count(SensorHandle::new(1)), 0);
        assert_eq!(collector.metrics().snapshot(), Default::default());
    }
}
