use embedded_hal_async::i2c::I2c;
use sht4x::Sht4xAsync;

use super::{ClimateReading, Sensor, SensorError};

pub struct Sht40Sensor<I> {
    sensor: Sht4xAsync<I, embassy_time::Delay>,
}

impl<I: I2c> Sht40Sensor<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            sensor: Sht4xAsync::<I, embassy_time::Delay>::new(i2c),
        }
    }
}

fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

impl<I: I2c> Sensor for Sht40Sensor<I> {
    type Reading = ClimateReading;

    async fn read(&mut self) -> Result<ClimateReading, SensorError> {
        let measurement = self
            .sensor
            .measure(sht4x::Precision::High, &mut embassy_time::Delay)
            .await
            .map_err(|e| {
                log::error!("SHT40 measurement failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: "SHT40",
                    operation: "measure temperature/humidity",
                    details: "I2C communication error or sensor not responding",
                }
            })?;

        Ok(ClimateReading {
            temperature_f: celsius_to_fahrenheit(measurement.temperature_celsius().to_num::<f32>()),
            humidity_percent: measurement.humidity_percent().to_num::<f32>(),
        })
    }
}
