//! Remote key/value store
//!
//! The store holds one copy of the people counter plus the node's latest
//! telemetry under fixed paths. Clients report failures as [`RemoteError`];
//! adapters for clients that signal failure with an empty or sentinel value
//! translate that into [`RemoteError::Empty`].

mod reconcile;
pub mod rest;

pub use reconcile::*;

use alloc::string::String;

use embedded_hal_async::delay::DelayNs;
use log::{debug, warn};
use thiserror_no_std::Error;

use crate::deadline::with_deadline;
use crate::location::Position;
use crate::sensors::ClimateReading;

pub const PEOPLE_COUNTER: &str = "PeopleCounter";
pub const GPS_LATITUDE: &str = "GPS/Latitude";
pub const GPS_LONGITUDE: &str = "GPS/Longitude";
pub const ENV_TEMPERATURE: &str = "Environment/Temperature";
pub const ENV_HUMIDITY: &str = "Environment/Humidity";
pub const UPDATED_TIME: &str = "UpdatedTime";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote store unreachable")]
    Unreachable,
    #[error("remote store returned an empty value")]
    Empty,
    #[error("remote value could not be parsed")]
    Malformed,
    #[error("remote call timed out")]
    Timeout,
}

/// Scalar get/set under slash-separated paths.
pub trait RemoteStore {
    fn get_int(&mut self, path: &str) -> impl Future<Output = Result<i32, RemoteError>>;
    fn set_int(&mut self, path: &str, value: i32) -> impl Future<Output = Result<(), RemoteError>>;
    fn get_float(&mut self, path: &str) -> impl Future<Output = Result<f32, RemoteError>>;
    fn set_float(&mut self, path: &str, value: f32)
    -> impl Future<Output = Result<(), RemoteError>>;
    fn get_string(&mut self, path: &str) -> impl Future<Output = Result<String, RemoteError>>;
    fn set_string(&mut self, path: &str, value: &str)
    -> impl Future<Output = Result<(), RemoteError>>;
}

/// Wraps remote calls in a deadline so a stalled request cannot hold the loop.
pub struct BoundedStore<'a, S, D> {
    store: &'a mut S,
    delay: &'a mut D,
    timeout_ms: u32,
}

impl<'a, S: RemoteStore, D: DelayNs> BoundedStore<'a, S, D> {
    pub fn new(store: &'a mut S, delay: &'a mut D, timeout_ms: u32) -> Self {
        Self {
            store,
            delay,
            timeout_ms,
        }
    }

    pub async fn get_int(&mut self, path: &str) -> Result<i32, RemoteError> {
        with_deadline(self.delay, self.timeout_ms, self.store.get_int(path))
            .await
            .unwrap_or(Err(RemoteError::Timeout))
    }

    pub async fn set_int(&mut self, path: &str, value: i32) -> Result<(), RemoteError> {
        with_deadline(self.delay, self.timeout_ms, self.store.set_int(path, value))
            .await
            .unwrap_or(Err(RemoteError::Timeout))
    }

    pub async fn set_float(&mut self, path: &str, value: f32) -> Result<(), RemoteError> {
        with_deadline(self.delay, self.timeout_ms, self.store.set_float(path, value))
            .await
            .unwrap_or(Err(RemoteError::Timeout))
    }

    pub async fn get_string(&mut self, path: &str) -> Result<String, RemoteError> {
        let value = with_deadline(self.delay, self.timeout_ms, self.store.get_string(path))
            .await
            .unwrap_or(Err(RemoteError::Timeout))?;
        if value.is_empty() {
            return Err(RemoteError::Empty);
        }
        Ok(value)
    }

    pub async fn set_string(&mut self, path: &str, value: &str) -> Result<(), RemoteError> {
        with_deadline(self.delay, self.timeout_ms, self.store.set_string(path, value))
            .await
            .unwrap_or(Err(RemoteError::Timeout))
    }
}

/// Push the resolved position and climate reading after a sync pass.
///
/// Every write is attempted independently; failures are logged and counted.
pub async fn publish_telemetry<S, D>(
    store: &mut BoundedStore<'_, S, D>,
    position: &Position,
    climate: Option<ClimateReading>,
) -> usize
where
    S: RemoteStore,
    D: DelayNs,
{
    let mut failures = 0;

    let mut text: heapless::String<16> = heapless::String::new();
    for (path, value) in [
        (GPS_LATITUDE, position.latitude),
        (GPS_LONGITUDE, position.longitude),
    ] {
        text.clear();
        let _ = core::fmt::Write::write_fmt(&mut text, format_args!("{value:.6}"));
        if let Err(e) = store.set_string(path, &text).await {
            warn!("Failed to publish {}: {}", path, e);
            failures += 1;
        }
    }

    if let Some(climate) = climate {
        for (path, value) in [
            (ENV_TEMPERATURE, climate.temperature_f),
            (ENV_HUMIDITY, climate.humidity_percent),
        ] {
            if let Err(e) = store.set_float(path, value).await {
                warn!("Failed to publish {}: {}", path, e);
                failures += 1;
            }
        }
    }

    debug!("Telemetry published with {} failed writes", failures);
    failures
}
