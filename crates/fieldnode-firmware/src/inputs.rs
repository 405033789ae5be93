//! Buttons, the positioning receiver and the analog channels.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Instant;
use esp_hal::{Async, Blocking};
use esp_hal::analog::adc::{Adc, AdcChannel, AdcPin};
use esp_hal::gpio::Input;
use esp_hal::peripherals::ADC1;
use esp_hal::uart::Uart;
use fieldnode_core::counter::{DebouncedCounter, EdgeDirection};
use fieldnode_core::gnss::NmeaDecoder;
use fieldnode_core::location::PositionReceiver;
use fieldnode_core::sensors::{AnalogInput, SensorError};
use fieldnode_core::timestamp::{GnssDate, GnssTime};
use log::{info, warn};

/// Counts edges on one button for as long as the node runs.
///
/// The counter applies the debounce window; nothing else happens here.
#[embassy_executor::task(pool_size = 2)]
pub async fn button_task(
    mut button: Input<'static>,
    direction: EdgeDirection,
    counter: &'static DebouncedCounter,
) -> ! {
    loop {
        button.wait_for_falling_edge().await;
        counter.on_edge(direction, Instant::now());
    }
}

pub type SharedDecoder = Mutex<CriticalSectionRawMutex, RefCell<NmeaDecoder>>;

/// Feeds the receiver's UART into the decoder.
#[embassy_executor::task]
pub async fn gnss_task(mut uart: Uart<'static, Async>, decoder: &'static SharedDecoder) -> ! {
    let mut buf = [0u8; 64];
    let mut had_fix = false;
    loop {
        let n = match uart.read_async(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                warn!("GNSS UART read failed: {:?}", e);
                continue;
            }
        };

        let has_fix = decoder.lock(|d| {
            let mut d = d.borrow_mut();
            d.feed_all(&buf[..n]);
            d.fix().location.is_some()
        });
        if has_fix != had_fix {
            info!("GNSS fix {}", if has_fix { "acquired" } else { "lost" });
            had_fix = has_fix;
        }
    }
}

/// The scheduler's view of the decoder fed by [`gnss_task`].
#[derive(Clone, Copy)]
pub struct GnssReceiver {
    decoder: &'static SharedDecoder,
}

impl GnssReceiver {
    pub fn new(decoder: &'static SharedDecoder) -> Self {
        Self { decoder }
    }
}

impl PositionReceiver for GnssReceiver {
    fn location(&self) -> Option<(f64, f64)> {
        self.decoder.lock(|d| d.borrow().fix().location)
    }

    fn time(&self) -> Option<GnssTime> {
        self.decoder.lock(|d| d.borrow().fix().time)
    }

    fn date(&self) -> Option<GnssDate> {
        self.decoder.lock(|d| d.borrow().fix().date)
    }
}

pub type SharedAdc = Mutex<CriticalSectionRawMutex, RefCell<Adc<'static, ADC1<'static>, Blocking>>>;

/// One ADC1 channel; the converter itself is shared between channels.
pub struct AdcInput<P: AdcChannel> {
    adc: &'static SharedAdc,
    pin: AdcPin<P, ADC1<'static>>,
    sensor: &'static str,
}

impl<P: AdcChannel> AdcInput<P> {
    pub fn new(adc: &'static SharedAdc, pin: AdcPin<P, ADC1<'static>>, sensor: &'static str) -> Self {
        Self { adc, pin, sensor }
    }
}

impl<P: AdcChannel> AnalogInput for AdcInput<P> {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        let pin = &mut self.pin;
        self.adc
            .lock(|adc| nb::block!(adc.borrow_mut().read_oneshot(pin)))
            .map_err(|()| SensorError::ReadFailed {
                sensor: self.sensor,
                operation: "ADC oneshot",
                details: "conversion failed",
            })
    }
}
