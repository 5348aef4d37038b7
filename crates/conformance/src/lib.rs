//! # Conformance
//!
//! Scenarios that exercise a `contracts::SensorsHal` implementation and the
//! driver that runs them.
//!
//! Responsibilities:
//! - Validate the sensor list (`descriptor`)
//! - Stream, flush, batch and switch rates on live sensors and check what
//!   arrives through the session (`scenarios`)
//! - Read direct report records back from shared memory
//! - Release every HAL resource a scenario acquired (`HalGuard`)
//! - Run the scenario matrix and report per-scenario status (`ConformanceSuite`)
//!
//! ## Usage
//! ```ignore
//! let hal: Arc<dyn SensorsHal> = Arc::new(MockSensorsHal::new()?);
//! let report = ConformanceSuite::new(hal, SuiteConfig::default()).run()?;
//! println!("{}", report.summary());
//! ```

mod catalog;
mod checker;
mod context;
mod descriptor;
mod error;
mod guard;
mod outcome;
pub mod scenarios;
mod suite;

pub use catalog::SensorCatalog;
pub use checker::{checker_for, EventChecker, NormChecker, NullChecker, GRAVITY_EARTH};
pub use context::{ScenarioContext, Subscription};
pub use descriptor::{validate_descriptor, validate_sensor_list};
pub use error::{ConformanceError, Result};
pub use guard::HalGuard;
pub use outcome::{Outcome, ScenarioStatus};
pub use suite::{
    scenario_matrix, ConformanceSuite, Scenario, ScenarioReport, SuiteReport, MATRIX_SENSORS,
};
