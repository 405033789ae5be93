//! Wi-Fi association, the network stack, and the access point scanner.
//!
//! The controller is shared between the connection task, which associates
//! on request, and the scanner used by the location resolver.

use alloc::vec::Vec;

use embassy_net::{Runner, Stack};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex as AsyncMutex;
use embassy_sync::signal::Signal;
use esp_radio::wifi::{ClientConfig, ModeConfig, ScanConfig, WifiController, WifiDevice};
use fieldnode_core::config::InternetConfig;
use fieldnode_core::link::NetworkLink;
use fieldnode_core::location::{AccessPoint, AccessPointScanner, GeolocationError};
use log::{debug, info, warn};

pub type SharedController = AsyncMutex<CriticalSectionRawMutex, WifiController<'static>>;

/// Raised by [`WifiLink::reconnect`], consumed by [`connection_task`].
static RECONNECT: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Apply the station credentials. Call once before spawning [`connection_task`].
pub fn configure(
    controller: &mut WifiController<'static>,
    credentials: &InternetConfig<'static>,
) -> Result<(), esp_radio::wifi::WifiError> {
    let client = ClientConfig::default()
        .with_ssid(credentials.ssid.into())
        .with_password(credentials.password.into());
    controller.set_config(&ModeConfig::Client(client))
}

async fn associate(controller: &SharedController) {
    let mut controller = controller.lock().await;

    if !controller.is_started().unwrap_or(false) {
        info!("Starting Wi-Fi");
        if let Err(e) = controller.start_async().await {
            warn!("Wi-Fi start failed: {:?}", e);
            return;
        }
    }

    if matches!(controller.is_connected(), Ok(true)) {
        debug!("Wi-Fi already associated");
        return;
    }

    match controller.connect_async().await {
        Ok(()) => info!("Wi-Fi associated"),
        Err(e) => warn!("Wi-Fi connect failed: {:?}", e),
    }
}

/// Associates once at boot, then again each time the node asks for it.
#[embassy_executor::task]
pub async fn connection_task(controller: &'static SharedController) -> ! {
    loop {
        associate(controller).await;
        RECONNECT.wait().await;
    }
}

#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

/// Link state as the scheduler sees it: associated and holding a DHCP lease.
pub struct WifiLink {
    stack: Stack<'static>,
}

impl WifiLink {
    pub fn new(stack: Stack<'static>) -> Self {
        Self { stack }
    }
}

impl NetworkLink for WifiLink {
    async fn is_connected(&mut self) -> bool {
        self.stack.is_link_up() && self.stack.config_v4().is_some()
    }

    async fn reconnect(&mut self) {
        RECONNECT.signal(());
    }
}

pub struct WifiScanner {
    controller: &'static SharedController,
}

impl WifiScanner {
    pub fn new(controller: &'static SharedController) -> Self {
        Self { controller }
    }
}

impl AccessPointScanner for WifiScanner {
    async fn scan(&mut self, into: &mut Vec<AccessPoint>) -> Result<(), GeolocationError> {
        let mut controller = self.controller.lock().await;
        let found = controller
            .scan_with_config_async(ScanConfig::default())
            .await
            .map_err(|e| {
                warn!("Access point scan failed: {:?}", e);
                GeolocationError::Scan
            })?;

        into.extend(found.iter().map(|ap| AccessPoint {
            bssid: ap.bssid,
            signal_strength: ap.signal_strength,
        }));
        debug!("Scan found {} access points", into.len());
        Ok(())
    }
}
