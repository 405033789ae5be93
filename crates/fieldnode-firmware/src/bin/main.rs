#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_net::StackResources;
use embassy_sync::mutex::Mutex as AsyncMutex;
use esp_hal::analog::adc::{Adc, AdcConfig, Attenuation};
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::rng::Rng;
use esp_hal::spi::Mode;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::uart::{Config as UartConfig, Uart};
use log::info;
use static_cell::ConstStaticCell;

use fieldnode_core::config::NodeConfig;
use fieldnode_core::counter::{DEFAULT_DEBOUNCE, DebouncedCounter, EdgeDirection};
use fieldnode_core::scheduler::{Node, NodeHardware};
use fieldnode_core::sensors::SensorSuite;
use fieldnode_core::status::LogStatusSink;
use fieldnode_firmware::cloud::{DatabaseStore, GeolocationClient};
use fieldnode_firmware::hardware::{GNSS_BAUD, GnssClock, init_sd_card, shared_adc, shared_decoder};
use fieldnode_firmware::https::{HttpsBuffers, HttpsClient, SharedHttps};
use fieldnode_firmware::inputs::{AdcInput, GnssReceiver, button_task, gnss_task};
use fieldnode_firmware::platform::Board;
use fieldnode_firmware::secrets;
use fieldnode_firmware::wifi::{
    SharedController, WifiLink, WifiScanner, configure, connection_task, net_task,
};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

macro_rules! mk_static {
    ($t:ty,$val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

/// Updated from the button tasks, read by the scheduler.
static PEOPLE: DebouncedCounter = DebouncedCounter::new(DEFAULT_DEBOUNCE);

static HTTPS_BUFFERS: ConstStaticCell<HttpsBuffers> = ConstStaticCell::new(HttpsBuffers::new());

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!(log::LevelFilter::Info);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let node_config = NodeConfig::default();

    // Network
    let radio = &*mk_static!(
        esp_radio::Controller<'static>,
        esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller")
    );
    let (mut wifi_controller, interfaces) =
        esp_radio::wifi::new(radio, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi controller");
    configure(&mut wifi_controller, &secrets::config().internet)
        .expect("Failed to apply Wi-Fi credentials");
    let wifi_controller = &*mk_static!(SharedController, AsyncMutex::new(wifi_controller));

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        mk_static!(StackResources<4>, StackResources::<4>::new()),
        seed,
    );
    spawner
        .spawn(net_task(runner))
        .expect("Failed to spawn network task");
    spawner
        .spawn(connection_task(wifi_controller))
        .expect("Failed to spawn connection task");

    let https = &*mk_static!(
        SharedHttps,
        AsyncMutex::new(HttpsClient::new(stack, HTTPS_BUFFERS.take(), rng))
    );
    info!("Network stack started");

    // Buttons
    let button_config = InputConfig::default().with_pull(Pull::Up);
    spawner
        .spawn(button_task(
            Input::new(peripherals.GPIO14, button_config),
            EdgeDirection::Increment,
            &PEOPLE,
        ))
        .expect("Failed to spawn increment button task");
    spawner
        .spawn(button_task(
            Input::new(peripherals.GPIO21, button_config),
            EdgeDirection::Decrement,
            &PEOPLE,
        ))
        .expect("Failed to spawn decrement button task");

    // Positioning receiver
    let decoder = shared_decoder();
    let uart = Uart::new(
        peripherals.UART1,
        UartConfig::default().with_baudrate(GNSS_BAUD),
    )
    .unwrap()
    .with_rx(peripherals.GPIO18)
    .with_tx(peripherals.GPIO17)
    .into_async();
    spawner
        .spawn(gnss_task(uart, decoder))
        .expect("Failed to spawn GNSS task");
    let receiver = GnssReceiver::new(decoder);

    // Analog sensors
    let mut adc_config = AdcConfig::new();
    let light_pin = adc_config.enable_pin(peripherals.GPIO4, Attenuation::_11dB);
    let sound_pin = adc_config.enable_pin(peripherals.GPIO5, Attenuation::_11dB);
    let battery_pin = adc_config.enable_pin(peripherals.GPIO6, Attenuation::_11dB);
    let adc = shared_adc(Adc::new(peripherals.ADC1, adc_config));

    #[cfg(feature = "sensor-sht40")]
    let climate = {
        use esp_hal::i2c::master::{Config as I2cConfig, I2c};

        let i2c = I2c::new(
            peripherals.I2C0,
            I2cConfig::default().with_frequency(Rate::from_khz(100)),
        )
        .unwrap()
        .with_sda(peripherals.GPIO8)
        .with_scl(peripherals.GPIO9)
        .into_async();
        fieldnode_core::sensors::Sht40Sensor::new(i2c)
    };
    #[cfg(not(feature = "sensor-sht40"))]
    let climate = fieldnode_firmware::platform::NoClimate;

    let sensors = SensorSuite::new(
        climate,
        AdcInput::new(adc, light_pin, "light"),
        AdcInput::new(adc, sound_pin, "sound"),
        AdcInput::new(adc, battery_pin, "battery"),
        node_config.temperature_offset_f,
    );

    // SD card
    let sd_spi = Spi::new(
        peripherals.SPI2,
        SpiConfig::default()
            .with_frequency(Rate::from_khz(400))
            .with_mode(Mode::_0),
    )
    .unwrap()
    .with_sck(peripherals.GPIO12)
    .with_mosi(peripherals.GPIO11)
    .with_miso(peripherals.GPIO13);
    let sd_cs = Output::new(peripherals.GPIO10, Level::High, OutputConfig::default());
    let medium = init_sd_card(sd_spi, sd_cs, GnssClock::new(receiver));

    let hardware = NodeHardware::<Board> {
        link: WifiLink::new(stack),
        scanner: WifiScanner::new(wifi_controller),
        transport: GeolocationClient::new(
            https,
            secrets::GEOLOCATION_URL,
            secrets::GEOLOCATION_KEY,
        ),
        store: DatabaseStore::new(https, secrets::DATABASE_URL, secrets::DATABASE_SECRET),
        sensors,
        receiver,
        medium,
        delay: embassy_time::Delay,
        status: LogStatusSink,
    };

    let mut node = Node::new(&node_config, &PEOPLE, hardware);
    info!("Peripherals ready, starting node");
    node.run().await
}
