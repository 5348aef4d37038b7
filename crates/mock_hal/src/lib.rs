//! # Mock HAL
//!
//! In-process reference implementation of `contracts::SensorsHal`.
//!
//! Responsibilities:
//! - Expose a small sensor catalog (accelerometer, gyroscope, magnetometer,
//!   light, significant motion)
//! - Deliver events from one delivery thread on a fixed schedule, with FIFO
//!   batching, flush markers and one-shot semantics
//! - Accept injected events in data injection mode
//! - Write direct report records into registered shared memory
//! - Break selected parts of the contract on request (`MockConfig`,
//!   `MockFault`) so conformance scenarios can be shown to catch them

mod catalog;
mod config;
mod error;
mod hal;
mod signal;
mod state;

pub use catalog::default_catalog;
pub use config::{MockConfig, MockFault};
pub use error::{MockHalError, Result};
pub use hal::MockSensorsHal;
pub use signal::STANDARD_GRAVITY;
