//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the suite: the sensor
//! data model, the `SensorsHal` interface under test, the event queue the HAL
//! delivers into, the direct-report shared memory layout and the suite
//! configuration.
//!
//! All business crates depend on this crate only, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Event timestamps are monotonic nanoseconds (`i64`) on the clock returned
//!   by [`elapsed_realtime_nanos`]
//! - Descriptor delays are microseconds, batch periods are nanoseconds

mod error;
mod event;
mod handle;
mod hal;
mod queue;
mod sensor;
mod shared_mem;
mod suite_config;
mod time;

pub use error::*;
pub use event::*;
pub use handle::{ChannelHandle, ReportToken, SensorHandle};
pub use hal::*;
pub use queue::{event_queue, EventQueueReader, EventQueueWriter};
pub use sensor::*;
pub use shared_mem::*;
pub use suite_config::*;
pub use time::elapsed_realtime_nanos;
