use super::{Sensor, SensorError};

/// Full-scale count of the 12-bit ADC.
pub const ADC_FULL_SCALE: f32 = 4095.0;
/// ADC reference voltage.
pub const ADC_REFERENCE_V: f32 = 3.3;

/// Load resistor of the light sensor's photocurrent, in ohms.
const LIGHT_LOAD_OHMS: f32 = 10_000.0;
/// Lux per microamp of photocurrent.
const LUX_PER_MICROAMP: f32 = 2.0;
/// Reference voltage for the sound level, 1 mV.
const SOUND_REFERENCE_V: f32 = 0.001;
/// The battery sits behind a 1:2 divider.
const BATTERY_DIVIDER: f32 = 2.0;

/// A single blocking sample of a raw analog channel.
pub trait AnalogInput {
    fn read_raw(&mut self) -> Result<u16, SensorError>;
}

pub fn raw_to_volts(raw: u16) -> f32 {
    f32::from(raw) * ADC_REFERENCE_V / ADC_FULL_SCALE
}

/// Photodiode on an analog input, reported in lux.
pub struct LightSensor<A> {
    input: A,
}

impl<A: AnalogInput> LightSensor<A> {
    pub fn new(input: A) -> Self {
        Self { input }
    }
}

impl<A: AnalogInput> Sensor for LightSensor<A> {
    type Reading = f32;

    async fn read(&mut self) -> Result<f32, SensorError> {
        let volts = raw_to_volts(self.input.read_raw()?);
        let microamps = volts / LIGHT_LOAD_OHMS * 1_000_000.0;
        Ok(microamps * LUX_PER_MICROAMP)
    }
}

/// Microphone envelope on an analog input, reported in dB relative to 1 mV.
pub struct SoundSensor<A> {
    input: A,
}

impl<A: AnalogInput> SoundSensor<A> {
    pub fn new(input: A) -> Self {
        Self { input }
    }
}

impl<A: AnalogInput> Sensor for SoundSensor<A> {
    type Reading = f32;

    async fn read(&mut self) -> Result<f32, SensorError> {
        // A zero count would give -inf; clamp to the smallest measurable step.
        let volts = raw_to_volts(self.input.read_raw()?.max(1));
        Ok(20.0 * libm::log10f(volts / SOUND_REFERENCE_V))
    }
}

/// Battery voltage through the on-board divider.
pub struct BatterySensor<A> {
    input: A,
}

impl<A: AnalogInput> BatterySensor<A> {
    pub fn new(input: A) -> Self {
        Self { input }
    }
}

impl<A: AnalogInput> Sensor for BatterySensor<A> {
    type Reading = f32;

    async fn read(&mut self) -> Result<f32, SensorError> {
        Ok(raw_to_volts(self.input.read_raw()?) * BATTERY_DIVIDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeAnalog;
    use embassy_futures::block_on;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_light_conversion() {
        let mut light = LightSensor::new(FakeAnalog::raw(4095));
        // 3.3 V / 10 kΩ = 330 µA, 2 lux per µA.
        assert!(close(block_on(light.read()).unwrap(), 660.0));
    }

    #[test]
    fn test_sound_conversion() {
        let mut sound = SoundSensor::new(FakeAnalog::raw(4095));
        // 20·log10(3.3 V / 1 mV)
        assert!(close(block_on(sound.read()).unwrap(), 70.37));
    }

    #[test]
    fn test_sound_zero_count_is_finite() {
        let mut sound = SoundSensor::new(FakeAnalog::raw(0));
        assert!(block_on(sound.read()).unwrap().is_finite());
    }

    #[test]
    fn test_battery_conversion() {
        let mut battery = BatterySensor::new(FakeAnalog::raw(2482));
        assert!(close(block_on(battery.read()).unwrap(), 4.0));
    }

    #[test]
    fn test_read_error_propagates() {
        let mut light = LightSensor::new(FakeAnalog::failing());
        assert!(block_on(light.read()).is_err());
    }
}
