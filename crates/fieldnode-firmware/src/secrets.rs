//! Deployment secrets, baked in at compile time by `build.rs`.

use fieldnode_core::config::{Config, InternetConfig};

pub const WIFI_SSID: &str = env!("FIELDNODE_WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("FIELDNODE_WIFI_PASSWORD");

/// Base URL of the remote database, without a trailing `.json`.
pub const DATABASE_URL: &str = env!("FIELDNODE_DATABASE_URL");
/// Database secret appended as `?auth=`. Empty for open rules.
pub const DATABASE_SECRET: &str = env!("FIELDNODE_DATABASE_SECRET");

pub const GEOLOCATION_KEY: &str = env!("FIELDNODE_GEOLOCATION_KEY");
pub const GEOLOCATION_URL: &str = "https://www.googleapis.com/geolocation/v1/geolocate";

pub const fn config() -> Config<'static> {
    Config {
        internet: InternetConfig {
            ssid: WIFI_SSID,
            password: WIFI_PASSWORD,
        },
    }
}
