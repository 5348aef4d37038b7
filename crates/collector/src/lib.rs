//! # Collector
//!
//! Event collection and synchronization engine.
//!
//! Responsibilities:
//! - Drain the HAL event queue on a dedicated reader thread (`SensorsSession`)
//! - Forward every delivered batch to the registered `EventSink`
//! - Demultiplex events per sensor handle and expose bounded predicate waits
//!   over event and flush-marker counts (`EventCollector`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use collector::{EventCollector, SensorsSession};
//! use std::sync::Arc;
//!
//! let session = SensorsSession::connect(hal, &config.session)?;
//! let collector = Arc::new(EventCollector::new());
//! session.register_callback(collector.clone());
//!
//! hal.flush(handle)?;
//! collector.wait_for_flush_events(&sensors, 1, Duration::from_secs(1));
//! assert_eq!(collector.flush_count(handle), 1);
//! ```

mod collector;
mod error;
mod metrics;
mod session;
mod sink;

// Re-exports
pub use collector::EventCollector;
pub use error::{CollectorError, Result};
pub use metrics::{CollectorMetrics, MetricsSnapshot};
pub use session::SensorsSession;
pub use sink::EventSink;
