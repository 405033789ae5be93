//! Sensor traits and the node's sensor suite

mod analog;
#[cfg(feature = "sensor-sht40")]
mod sht40;

pub use analog::*;
#[cfg(feature = "sensor-sht40")]
pub use sht40::Sht40Sensor;

use log::error;
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: {operation} failed ({details})")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: not initialized ({details})")]
    InitializationFailed {
        sensor: &'static str,
        details: &'static str,
    },
}

/// Trait for sensors that produce typed readings.
pub trait Sensor {
    /// The type of readings this sensor produces.
    type Reading;

    /// Read the sensor and return typed readings.
    fn read(&mut self) -> impl Future<Output = Result<Self::Reading, SensorError>>;
}

/// Temperature and relative humidity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_f: f32,
    pub humidity_percent: f32,
}

/// Everything the logger records from the sensors in one tick.
///
/// A sensor that failed to read leaves its field as NaN so the rest of the
/// record still gets logged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentReading {
    pub light_lux: f32,
    pub temperature_f: f32,
    pub humidity_percent: f32,
    pub sound_db: f32,
}

impl EnvironmentReading {
    pub const UNAVAILABLE: Self = Self {
        light_lux: f32::NAN,
        temperature_f: f32::NAN,
        humidity_percent: f32::NAN,
        sound_db: f32::NAN,
    };

    pub fn climate(&self) -> Option<ClimateReading> {
        (!self.temperature_f.is_nan() && !self.humidity_percent.is_nan()).then_some(
            ClimateReading {
                temperature_f: self.temperature_f,
                humidity_percent: self.humidity_percent,
            },
        )
    }
}

/// Source of readings used by the scheduler.
pub trait EnvironmentSource {
    fn read_climate(&mut self) -> impl Future<Output = Option<ClimateReading>>;
    fn read_environment(&mut self) -> impl Future<Output = EnvironmentReading>;
    fn read_battery_volts(&mut self) -> impl Future<Output = Option<f32>>;
}

/// The node's sensors: a climate sensor plus light, sound and battery
/// channels on analog inputs.
pub struct SensorSuite<C, L, S, B> {
    climate: C,
    light: LightSensor<L>,
    sound: SoundSensor<S>,
    battery: BatterySensor<B>,
    temperature_offset_f: f32,
}

impl<C, L, S, B> SensorSuite<C, L, S, B>
where
    C: Sensor<Reading = ClimateReading>,
    L: AnalogInput,
    S: AnalogInput,
    B: AnalogInput,
{
    pub fn new(climate: C, light: L, sound: S, battery: B, temperature_offset_f: f32) -> Self {
        Self {
            climate,
            light: LightSensor::new(light),
            sound: SoundSensor::new(sound),
            battery: BatterySensor::new(battery),
            temperature_offset_f,
        }
    }
}

impl<C, L, S, B> EnvironmentSource for SensorSuite<C, L, S, B>
where
    C: Sensor<Reading = ClimateReading>,
    L: AnalogInput,
    S: AnalogInput,
    B: AnalogInput,
{
    async fn read_climate(&mut self) -> Option<ClimateReading> {
        match self.climate.read().await {
            Ok(reading) => Some(ClimateReading {
                temperature_f: reading.temperature_f + self.temperature_offset_f,
                humidity_percent: reading.humidity_percent,
            }),
            Err(e) => {
                error!("Climate read failed: {}", e);
                None
            }
        }
    }

    async fn read_environment(&mut self) -> EnvironmentReading {
        let mut reading = EnvironmentReading::UNAVAILABLE;

        if let Some(climate) = self.read_climate().await {
            reading.temperature_f = climate.temperature_f;
            reading.humidity_percent = climate.humidity_percent;
        }

        match self.light.read().await {
            Ok(lux) => reading.light_lux = lux,
            Err(e) => error!("Light read failed: {}", e),
        }

        match self.sound.read().await {
            Ok(db) => reading.sound_db = db,
            Err(e) => error!("Sound read failed: {}", e),
        }

        reading
    }

    async fn read_battery_volts(&mut self) -> Option<f32> {
        self.battery
            .read()
            .await
            .map_err(|e| error!("Battery read failed: {}", e))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeAnalog, FakeClimate};
    use embassy_futures::block_on;

    #[test]
    fn test_environment_applies_offset() {
        let mut suite = SensorSuite::new(
            FakeClimate::reading(74.0, 40.0),
            FakeAnalog::raw(2048),
            FakeAnalog::raw(1024),
            FakeAnalog::raw(2500),
            -4.0,
        );

        let reading = block_on(suite.read_environment());

        assert_eq!(reading.temperature_f, 70.0);
        assert_eq!(reading.humidity_percent, 40.0);
        assert!(reading.light_lux > 0.0);
        assert!(reading.sound_db > 0.0);
    }

    #[test]
    fn test_failed_sensors_leave_nan() {
        let mut suite = SensorSuite::new(
            FakeClimate::failing(),
            FakeAnalog::failing(),
            FakeAnalog::raw(1024),
            FakeAnalog::failing(),
            0.0,
        );

        let reading = block_on(suite.read_environment());

        assert!(reading.temperature_f.is_nan());
        assert!(reading.humidity_percent.is_nan());
        assert!(reading.light_lux.is_nan());
        assert!(!reading.sound_db.is_nan());
        assert_eq!(reading.climate(), None);
        assert_eq!(block_on(suite.read_battery_volts()), None);
    }
}
