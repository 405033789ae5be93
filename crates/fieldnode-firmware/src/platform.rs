//! Binds the board's drivers to the core scheduler.

use esp_hal::peripherals::{GPIO4, GPIO5, GPIO6};
use fieldnode_core::scheduler::Platform;
use fieldnode_core::sensors::SensorSuite;
use fieldnode_core::status::LogStatusSink;

use crate::cloud::{DatabaseStore, GeolocationClient};
use crate::hardware::SdMedium;
use crate::inputs::{AdcInput, GnssReceiver};
use crate::wifi::{WifiLink, WifiScanner};

#[cfg(feature = "sensor-sht40")]
pub type ClimateSensor =
    fieldnode_core::sensors::Sht40Sensor<esp_hal::i2c::master::I2c<'static, esp_hal::Async>>;

#[cfg(not(feature = "sensor-sht40"))]
pub type ClimateSensor = NoClimate;

/// Stands in for the climate sensor on builds without one.
#[cfg(not(feature = "sensor-sht40"))]
pub struct NoClimate;

#[cfg(not(feature = "sensor-sht40"))]
impl fieldnode_core::sensors::Sensor for NoClimate {
    type Reading = fieldnode_core::sensors::ClimateReading;

    async fn read(&mut self) -> Result<Self::Reading, fieldnode_core::sensors::SensorError> {
        Err(fieldnode_core::sensors::SensorError::InitializationFailed {
            sensor: "climate",
            details: "no climate sensor in this build",
        })
    }
}

pub type LightInput = AdcInput<GPIO4<'static>>;
pub type SoundInput = AdcInput<GPIO5<'static>>;
pub type BatteryInput = AdcInput<GPIO6<'static>>;

pub type BoardSensors = SensorSuite<ClimateSensor, LightInput, SoundInput, BatteryInput>;

pub struct Board;

impl Platform for Board {
    type Link = WifiLink;
    type Scanner = WifiScanner;
    type Transport = GeolocationClient;
    type Store = DatabaseStore;
    type Sensors = BoardSensors;
    type Receiver = GnssReceiver;
    type Medium = SdMedium;
    type Delay = embassy_time::Delay;
    // The board has no display; snapshots go to the log.
    type Status = LogStatusSink;
}
