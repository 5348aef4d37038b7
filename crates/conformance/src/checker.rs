//! Per-sample consistency checkers
//!
//! Shared by streaming (queue events) and direct report (shared memory
//! records) scenarios; both hand over the raw value slice.

use contracts::SensorType;
use nalgebra::Vector3;

/// Standard gravity (m/s^2)
pub const GRAVITY_EARTH: f32 = 9.806_65;

/// Physical plausibility check for one sample.
pub trait EventChecker: Send + Sync {
    /// `Err` carries a human readable reason.
    fn check(&self, values: &[f32]) -> Result<(), String>;
}

/// Always passes; for types with no static invariant (e.g. magnetic field).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullChecker;

impl EventChecker for NullChecker {
    fn check(&self, _values: &[f32]) -> Result<(), String> {
        Ok(())
    }
}

/// Euclidean norm of the first three values within `expected ± tolerance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormChecker {
    pub expected: f32,
    pub tolerance: f32,
}

impl NormChecker {
    pub const fn new(expected: f32, tolerance: f32) -> Self {
        Self {
            expected,
            tolerance,
        }
    }

    /// Device at rest: gravity only.
    pub const fn accelerometer() -> Self {
        Self::new(GRAVITY_EARTH, 1.0)
    }

    /// Device at rest: no rotation.
    pub const fn gyroscope() -> Self {
        Self::new(0.0, 0.1)
    }
}

impl EventChecker for NormChecker {
    fn check(&self, values: &[f32]) -> Result<(), String> {
        let [x, y, z] = match values {
            [x, y, z, ..] => [*x, *y, *z],
            _ => return Err(format!("expected 3 axes, got {} values", values.len())),
        };
        let norm = Vector3::new(x, y, z).norm();
        if (norm - self.expected).abs() <= self.tolerance {
            Ok(())
        } else {
            Err(format!(
                "norm {norm:.4} outside {:.4} ± {:.4}",
                self.expected, self.tolerance
            ))
        }
    }
}

/// Checker used for `sensor_type` by the streaming and direct report scenarios.
pub fn checker_for(sensor_type: SensorType) -> Box<dyn EventChecker> {
    match sensor_type {
        SensorType::Accelerometer => Box::new(NormChecker::accelerometer()),
        SensorType::Gyroscope => Box::new(NormChecker::gyroscope()),
        _ => Box::new(NullChecker),
    }
}
