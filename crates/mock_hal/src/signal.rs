//! Simulated sample values for a device lying still on a table.

use contracts::{EventPayload, SensorType, Vec3};
use rand::Rng;

use crate::config::MockConfig;

pub const STANDARD_GRAVITY: f32 = 9.806_65;

/// Earth field (uT) as seen by the magnetometer.
const EARTH_FIELD: [f32; 3] = [22.0, -5.0, -40.0];

/// Produces samples for one HAL instance.
pub struct SignalGenerator<R: Rng> {
    rng: R,
    noise: f32,
    accelerometer_bias: f32,
}

impl<R: Rng> SignalGenerator<R> {
    pub fn new(rng: R, config: &MockConfig) -> Self {
        Self {
            rng,
            noise: config.noise.abs(),
            accelerometer_bias: config.accelerometer_bias,
        }
    }

    fn jitter(&mut self) -> f32 {
        if self.noise == 0.0 {
            0.0
        } else {
            self.rng.random_range(-self.noise..=self.noise)
        }
    }

    fn vec3(&mut self, base: [f32; 3]) -> Vec3 {
        Vec3::new(
            base[0] + self.jitter(),
            base[1] + self.jitter(),
            base[2] + self.jitter(),
        )
    }

    /// Raw values for one sample, as written into direct report records too.
    pub fn values(&mut self, sensor_type: SensorType, timestamp_ns: i64) -> Vec<f32> {
        self.payload(sensor_type, timestamp_ns).values()
    }

    pub fn payload(&mut self, sensor_type: SensorType, timestamp_ns: i64) -> EventPayload {
        match sensor_type {
            SensorType::Accelerometer
            | SensorType::AccelerometerUncalibrated
            | SensorType::Gravity => EventPayload::Vec3(self.vec3([
                0.0,
                0.0,
                STANDARD_GRAVITY + self.accelerometer_bias,
            ])),
            SensorType::Gyroscope | SensorType::GyroscopeUncalibrated => {
                EventPayload::Vec3(self.vec3([0.0; 3]))
            }
            SensorType::MagneticField | SensorType::MagneticFieldUncalibrated => {
                EventPayload::Vec3(self.vec3(EARTH_FIELD))
            }
            SensorType::LinearAcceleration => EventPayload::Vec3(self.vec3([0.0; 3])),
            SensorType::Light => {
                // slow drift so that an on-change sensor keeps changing
                let phase = (timestamp_ns as f64 / 1e9).sin() as f32;
                EventPayload::Scalar(120.0 + 5.0 * phase + self.jitter())
            }
            SensorType::StepCounter => EventPayload::StepCount(0),
            _ => EventPayload::Scalar(1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_accelerometer_norm_near_gravity() {
        let mut generator = SignalGenerator::new(StdRng::seed_from_u64(7), &MockConfig::default());
        for ts in 0..100 {
            let v = generator.values(SensorType::Accelerometer, ts);
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - STANDARD_GRAVITY).abs() < 0.1);
        }
    }

    #[test]
    fn test_bias_moves_norm() {
        let config = MockConfig {
            accelerometer_bias: 3.0,
            noise: 0.0,
            ..Default::default()
        };
        let mut generator = SignalGenerator::new(StdRng::seed_from_u64(7), &config);
        let v = generator.values(SensorType::Accelerometer, 0);
        assert!((v[2] - (STANDARD_GRAVITY + 3.0)).abs() < f32::EPSILON * 16.0);
    }
}
