//! Collector metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Collector metrics
#[derive(Debug, Default)]
pub struct CollectorMetrics {
    /// Data events appended
    pub data_events: AtomicU64,

    /// Flush-completion markers counted
    pub flush_markers: AtomicU64,

    /// Metadata / additional-info events that are not flush markers
    pub info_events: AtomicU64,

    /// Batches delivered through `on_events`
    pub batches: AtomicU64,
}

impl CollectorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_data(&self, n: u64) {
        self.data_events.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_flush(&self, n: u64) {
        self.flush_markers.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_info(&self, n: u64) {
        self.info_events.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_batch(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            data_events: self.data_events.load(Ordering::Relaxed),
            flush_markers: self.flush_markers.load(Ordering::Relaxed),
            info_events: self.info_events.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.data_events.store(0, Ordering::Relaxed);
        self.flush_markers.store(0, Ordering::Relaxed);
        self.info_events.store(0, Ordering::Relaxed);
        self.batches.store(0, Ordering::Relaxed);
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub data_events: u64,
    pub flush_markers: u64,
    pub info_events: u64,
    pub batches: u64,
}

impl MetricsSnapshot {
    /// Every event seen, whatever its kind.
    pub fn total(&self) -> u64 {
        self.data_events + self.flush_markers + self.info_events
    }
}
