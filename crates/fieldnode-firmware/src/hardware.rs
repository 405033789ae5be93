//! Hardware initialization for the fieldnode board
//!
//! Pin assignment:
//!
//! | Function            | Peripheral | Pins                                   |
//! |---------------------|------------|----------------------------------------|
//! | SD card             | SPI2       | SCK 12, MOSI 11, MISO 13, CS 10        |
//! | SHT40               | I2C0       | SDA 8, SCL 9                           |
//! | GNSS receiver       | UART1      | RX 18, TX 17 (9600 baud)               |
//! | Light/sound/battery | ADC1       | GPIO 4, 5, 6                           |
//! | Count up / down     | GPIO       | 14 / 21, active low with pull-up       |

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_sdmmc::{TimeSource, Timestamp};
use esp_hal::Blocking;
use esp_hal::analog::adc::Adc;
use esp_hal::delay::Delay;
use esp_hal::gpio::Output;
use esp_hal::peripherals::ADC1;
use esp_hal::spi::master::Spi;
use fieldnode_core::gnss::NmeaDecoder;
use fieldnode_core::location::PositionReceiver;
use fieldnode_core::storage::sd_card::SdCardMedium;
use log::info;
use static_cell::StaticCell;

use crate::inputs::{GnssReceiver, SharedAdc, SharedDecoder};

pub const GNSS_BAUD: u32 = 9_600;

/// File timestamps come from the receiver; before its first fix they read
/// 2024-01-01 00:00:00.
#[derive(Clone, Copy)]
pub struct GnssClock {
    receiver: GnssReceiver,
}

impl GnssClock {
    pub fn new(receiver: GnssReceiver) -> Self {
        Self { receiver }
    }
}

impl TimeSource for GnssClock {
    fn get_timestamp(&self) -> Timestamp {
        let mut stamp = Timestamp {
            year_since_1970: 54,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        };
        if let Some(date) = self.receiver.date() {
            stamp.year_since_1970 = date.year.saturating_sub(1970).min(255) as u8;
            stamp.zero_indexed_month = date.month.saturating_sub(1);
            stamp.zero_indexed_day = date.day.saturating_sub(1);
        }
        if let Some(time) = self.receiver.time() {
            stamp.hours = time.hour;
            stamp.minutes = time.minute;
            stamp.seconds = time.second;
        }
        stamp
    }
}

pub type SdSpi = ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, Delay>;
pub type SdMedium = SdCardMedium<SdSpi, Delay, GnssClock>;

/// Wrap the SD card bus as the node's log medium.
///
/// The card itself is brought up lazily by the first write.
pub fn init_sd_card(
    spi: Spi<'static, Blocking>,
    cs: Output<'static>,
    clock: GnssClock,
) -> SdMedium {
    let device = match ExclusiveDevice::new(spi, cs, Delay::new()) {
        Ok(device) => device,
        Err(e) => match e {},
    };
    info!("SD card bus configured");
    SdCardMedium::new(device, Delay::new(), clock)
}

pub fn shared_decoder() -> &'static SharedDecoder {
    static DECODER: StaticCell<SharedDecoder> = StaticCell::new();
    DECODER.init(Mutex::new(RefCell::new(NmeaDecoder::new())))
}

pub fn shared_adc(adc: Adc<'static, ADC1<'static>, Blocking>) -> &'static SharedAdc {
    static ADC: StaticCell<SharedAdc> = StaticCell::new();
    ADC.init(Mutex::new(RefCell::new(adc)))
}
