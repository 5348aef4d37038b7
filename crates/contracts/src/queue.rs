//! Event queue between the HAL delivery thread and the suite.
//!
//! Bounded `async_channel` of event batches. The writer blocks when the
//! reader falls behind; a batch is always delivered as a unit.

use async_channel::{Receiver, Sender};

use crate::{ContractError, SensorEvent};

/// Create a queue holding at most `capacity` pending batches.
pub fn event_queue(capacity: usize) -> (EventQueueWriter, EventQueueReader) {
    let (tx, rx) = async_channel::bounded(capacity.max(1));
    (EventQueueWriter { tx }, EventQueueReader { rx })
}

/// HAL side of the event queue.
#[derive(Debug, Clone)]
pub struct EventQueueWriter {
    tx: Sender<Vec<SensorEvent>>,
}

impl EventQueueWriter {
    /// Write one batch, blocking while the queue is full.
    ///
    /// Returns `false` once the reader is gone.
    pub fn write(&self, events: &[SensorEvent]) -> bool {
        if events.is_empty() {
            return !self.tx.is_closed();
        }
        self.tx.send_blocking(events.to_vec()).is_ok()
    }

    /// Whether the reader side has been dropped or closed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Suite side of the event queue.
#[derive(Debug, Clone)]
pub struct EventQueueReader {
    rx: Receiver<Vec<SensorEvent>>,
}

impl EventQueueReader {
    /// Block until the next batch arrives.
    pub fn read_blocking(&self) -> Result<Vec<SensorEvent>, ContractError> {
        self.rx.recv_blocking().map_err(|_| ContractError::QueueClosed)
    }

    /// Await the next batch.
    pub async fn read(&self) -> Result<Vec<SensorEvent>, ContractError> {
        self.rx.recv().await.map_err(|_| ContractError::QueueClosed)
    }

    /// Close the queue so that the writer and any blocked reader return.
    pub fn close(&self) -> bool {
        self.rx.close()
    }

    /// Number of batches waiting.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
