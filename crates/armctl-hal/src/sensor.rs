//! Generic `TemperatureSensor` trait for per-motor thermal readings.

use armctl_types::{ArmError, JOINT_COUNT};

/// A source of motor temperatures, one reading per motor per tick.
pub trait TemperatureSensor: Send {
    /// Stable identifier, e.g. `"sim_thermal"`.
    fn id(&self) -> &str;

    /// Read every motor's temperature in °C, in joint order.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::HardwareFault`] when the sensor cannot produce a reading.
    fn read_all(&mut self) -> Result<[f64; JOINT_COUNT], ArmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal in-process sensor used only for tests.
    struct ConstantSensor(f64);

    impl TemperatureSensor for ConstantSensor {
        fn id(&self) -> &str {
            "constant"
        }

        fn read_all(&mut self) -> Result<[f64; JOINT_COUNT], ArmError> {
            Ok([self.0; JOINT_COUNT])
        }
    }

    #[test]
    fn trait_object_reads() {
        let mut sensor: Box<dyn TemperatureSensor> = Box::new(ConstantSensor(40.0));
        assert_eq!(sensor.id(), "constant");
        assert_eq!(sensor.read_all().unwrap(), [40.0; JOINT_COUNT]);
    }
}
