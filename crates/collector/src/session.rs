//! SensorsSession - explicit owner of the HAL event queue
//!
//! Replaces an ambient "current environment": whoever holds the session
//! owns the queue the HAL writes into, the reader thread draining it and
//! the sink events are forwarded to.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{event_queue, EventQueueReader, SensorEvent, SensorsHal, SessionConfig};
use observability::record_events_received;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{CollectorError, Result};
use crate::sink::EventSink;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Session state shared with the reader thread.
#[derive(Default)]
struct Shared {
    sink: RwLock<Option<Arc<dyn EventSink>>>,
    collection: Mutex<Collection>,
    collection_cv: Condvar,
    batches: AtomicU64,
    events: AtomicU64,
}

#[derive(Default)]
struct Collection {
    enabled: bool,
    events: Vec<SensorEvent>,
}

impl Shared {
    fn collection(&self) -> MutexGuard<'_, Collection> {
        self.collection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, batch: &[SensorEvent]) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.events.fetch_add(batch.len() as u64, Ordering::Relaxed);
        record_batch_metrics(batch);

        let sink = self
            .sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(sink) = sink {
            sink.on_events(batch);
        }

        let mut collection = self.collection();
        if collection.enabled {
            collection.events.extend_from_slice(batch);
            drop(collection);
            self.collection_cv.notify_all();
        }
    }
}

fn record_batch_metrics(batch: &[SensorEvent]) {
    let flushes = batch.iter().filter(|e| e.is_flush_complete()).count() as u64;
    let data = batch.iter().filter(|e| e.is_data()).count() as u64;
    record_events_received("data", data);
    record_events_received("flush_complete", flushes);
    record_events_received("info", batch.len() as u64 - flushes - data);
}

/// Queue reader plus the thread draining it.
struct Reader {
    queue: EventQueueReader,
    active: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl Reader {
    fn spawn(session_id: u64, queue: EventQueueReader, shared: Arc<Shared>) -> Result<Self> {
        let thread_queue = queue.clone();
        let active = Arc::new(AtomicBool::new(true));
        let thread_active = active.clone();
        let thread = thread::Builder::new()
            .name(format!("sensors-session-{session_id}"))
            .spawn(move || {
                debug!(session_id, "event reader started");
                while let Ok(batch) = thread_queue.read_blocking() {
                    // batches still buffered in a detached queue are dropped
                    if !thread_active.load(Ordering::Acquire) {
                        break;
                    }
                    trace!(session_id, len = batch.len(), "batch received");
                    shared.dispatch(&batch);
                }
                debug!(session_id, "event reader stopped");
            })?;
        Ok(Self {
            queue,
            active,
            thread,
        })
    }

    fn stop(self, session_id: u64) {
        self.active.store(false, Ordering::Release);
        self.queue.close();
        if self.thread.join().is_err() {
            warn!(session_id, "event reader thread panicked");
        }
    }
}

/// One HAL connection worth of event demultiplexing.
pub struct SensorsSession {
    id: u64,
    hal: Arc<dyn SensorsHal>,
    queue_capacity: usize,
    shared: Arc<Shared>,
    reader: Mutex<Option<Reader>>,
}

impl SensorsSession {
    /// Create an event queue, hand it to the HAL via `initialize` and start
    /// draining it.
    #[instrument(name = "session_connect", skip(hal, config), fields(queue_capacity = config.queue_capacity))]
    pub fn connect(hal: Arc<dyn SensorsHal>, config: &SessionConfig) -> Result<Self> {
        let session = Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            hal,
            queue_capacity: config.queue_capacity,
            shared: Arc::new(Shared::default()),
            reader: Mutex::new(None),
        };
        session.attach()?;
        info!(session_id = session.id, "sensors session connected");
        Ok(session)
    }

    fn reader(&self) -> MutexGuard<'_, Option<Reader>> {
        self.reader.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Initialize the HAL with a fresh queue and swap readers.
    fn attach(&self) -> Result<()> {
        let (writer, queue) = event_queue(self.queue_capacity);
        self.hal
            .initialize(writer)
            .map_err(CollectorError::Initialize)?;
        let reader = Reader::spawn(self.id, queue, self.shared.clone())?;

        let previous = self.reader().replace(reader);
        if let Some(previous) = previous {
            previous.stop(self.id);
        }
        Ok(())
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The HAL this session is connected to.
    pub fn hal(&self) -> &Arc<dyn SensorsHal> {
        &self.hal
    }

    /// Forward every subsequent batch to `sink`, replacing any previous sink.
    pub fn register_callback(&self, sink: Arc<dyn EventSink>) {
        *self
            .shared
            .sink
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(sink);
        debug!(session_id = self.id, "callback registered");
    }

    /// Stop forwarding events.
    pub fn unregister_callback(&self) {
        self.shared
            .sink
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        debug!(session_id = self.id, "callback unregistered");
    }

    /// Collect every event delivered to this session from now on until `count`
    /// events arrived or `timeout` elapsed.
    pub fn collect_events(&self, timeout: Duration, count: usize) -> Vec<SensorEvent> {
        {
            let mut collection = self.shared.collection();
            collection.enabled = true;
            collection.events.clear();
        }

        let guard = self.shared.collection();
        let (mut collection, _) = self
            .shared
            .collection_cv
            .wait_timeout_while(guard, timeout, |c| c.events.len() < count)
            .unwrap_or_else(PoisonError::into_inner);
        collection.enabled = false;
        let events = std::mem::take(&mut collection.events);
        debug!(session_id = self.id, collected = events.len(), requested = count, "collection finished");
        events
    }

    /// Hand the HAL a new queue. Events written to the previous queue are no
    /// longer observed.
    #[instrument(name = "session_reinitialize", skip(self), fields(session_id = self.id))]
    pub fn reinitialize(&self) -> Result<()> {
        self.attach()?;
        info!("sensors session reinitialized");
        Ok(())
    }

    /// Stop reading. The HAL keeps its writer but nothing observes it.
    pub fn tear_down(&self) {
        if let Some(reader) = self.reader().take() {
            reader.stop(self.id);
            debug!(session_id = self.id, "sensors session torn down");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.reader().is_some()
    }

    /// Batches and events drained since connect.
    pub fn delivered(&self) -> (u64, u64) {
        (
            self.shared.batches.load(Ordering::Relaxed),
            self.shared.events.load(Ordering::Relaxed),
        )
    }
}

impl Drop for SensorsSession {
    fn drop(&mut self) {
        self.tear_down();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventCollector;
    use contracts::{
        ChannelHandle, EventQueueWriter, HalError, HalResult, OperationMode, RateLevel,
        ReportToken, SensorDescriptor, SensorHandle, SensorType, SharedMemInfo,
    };

    /// HAL that only records the queue it was given.
    #[derive(Default)]
    struct QueueOnlyHal {
        writer: Mutex<Option<EventQueueWriter>>,
        reject_initialize: bool,
    }

    impl QueueOnlyHal {
        fn emit(&self, events: &[SensorEvent]) -> bool {
            self.writer
                .lock()
                .unwrap()
                .as_ref()
                .is_some_and(|w| w.write(events))
        }
    }

    impl SensorsHal for QueueOnlyHal {
        fn get_sensors_list(&self) -> Vec<SensorDescriptor> {
            Vec::new()
        }
        fn set_operation_mode(&self, _mode: OperationMode) -> HalResult<()> {
            Ok(())
        }
        fn activate(&self, _handle: SensorHandle, _enabled: bool) -> HalResult<()> {
            Ok(())
        }
        fn batch(&self, _handle: SensorHandle, _period: i64, _latency: i64) -> HalResult<()> {
            Ok(())
        }
        fn flush(&self, _handle: SensorHandle) -> HalResult<()> {
            Ok(())
        }
        fn inject_sensor_data(&self, _event: &SensorEvent) -> HalResult<()> {
            Err(HalError::InvalidOperation)
        }
        fn register_direct_channel(&self, _mem: &SharedMemInfo) -> HalResult<ChannelHandle> {
            Err(HalError::InvalidOperation)
        }
        fn unregister_direct_channel(&self, _channel: ChannelHandle) -> HalResult<()> {
            Err(HalError::InvalidOperation)
        }
        fn config_direct_report(
            &self,
            _handle: SensorHandle,
            _channel: ChannelHandle,
            _rate: RateLevel,
        ) -> HalResult<ReportToken> {
            Err(HalError::InvalidOperation)
        }
        fn initialize(&self, queue: EventQueueWriter) -> HalResult<()> {
            if self.reject_initialize {
                return Err(HalError::NoMemory);
            }
            *self.writer.lock().unwrap() = Some(queue);
            Ok(())
        }
    }

    fn light(handle: i32, ts: i64) -> SensorEvent {
        SensorEvent::scalar(SensorHandle::new(handle), SensorType::Light, ts, 10.0)
    }

    #[test]
    fn test_events_reach_registered_sink() {
        let hal = Arc::new(QueueOnlyHal::default());
        let session = SensorsSession::connect(hal.clone(), &SessionConfig::default()).unwrap();
        let collector = Arc::new(EventCollector::new());
        session.register_callback(collector.clone());

        assert!(hal.emit(&[light(1, 1), light(1, 2)]));
        assert!(collector.wait_for_event_count(SensorHandle::new(1), 2, Duration::from_secs(2)));

        session.unregister_callback();
        assert!(hal.emit(&[light(1, 3)]));
        let collected = session.collect_events(Duration::from_millis(100), 1);
        assert!(collected.is_empty() || collected[0].timestamp_ns == 3);
        assert_eq!(collector.event_count(SensorHandle::new(1)), 2);
    }

    #[test]
    fn test_collect_events_stops_at_count() {
        let hal = Arc::new(QueueOnlyHal::default());
        let session = SensorsSession::connect(hal.clone(), &SessionConfig::default()).unwrap();

        let producer = {
            let hal = hal.clone();
            thread::spawn(move || {
                for ts in 0..20 {
                    thread::sleep(Duration::from_millis(5));
                    if !hal.emit(&[light(2, ts)]) {
                        break;
                    }
                }
            })
        };
        let events = session.collect_events(Duration::from_secs(5), 3);
        producer.join().unwrap();
        assert!(events.len() >= 3);
    }

    #[test]
    fn test_reinitialize_detaches_old_queue() {
        let hal = Arc::new(QueueOnlyHal::default());
        let session = SensorsSession::connect(hal.clone(), &SessionConfig::default()).unwrap();
        let old_writer = hal.writer.lock().unwrap().clone().unwrap();

        session.reinitialize().unwrap();
        assert!(old_writer.is_closed());
        assert!(!old_writer.write(&[light(1, 1)]));
        assert!(hal.emit(&[light(1, 2)]));
    }

    #[test]
    fn test_initialize_failure_is_reported() {
        let hal = Arc::new(QueueOnlyHal {
            reject_initialize: true,
            ..Default::default()
        });
        let err = SensorsSession::connect(hal, &SessionConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, CollectorError::Initialize(HalError::NoMemory)));
    }

    #[test]
    fn test_tear_down_closes_queue() {
        let hal = Arc::new(QueueOnlyHal::default());
        let session = SensorsSession::connect(hal.clone(), &SessionConfig::default()).unwrap();
        session.tear_down();
        assert!(!session.is_connected());
        assert!(!hal.emit(&[light(1, 1)]));
    }
}
