//! Event delivery trait

use contracts::SensorEvent;

/// Receiver of events delivered by the session reader thread.
///
/// Called from the reader thread, never from the caller thread.
pub trait EventSink: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &SensorEvent);

    /// Handle one delivered batch.
    ///
    /// Implementations that can observe a batch atomically should override this.
    fn on_events(&self, events: &[SensorEvent]) {
        for event in events {
            self.on_event(event);
        }
    }
}
