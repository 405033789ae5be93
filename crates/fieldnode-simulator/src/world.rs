//! Simulated peripherals and surroundings of the node.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use fieldnode_core::gnss::NmeaDecoder;
use fieldnode_core::link::NetworkLink;
use fieldnode_core::location::{
    AccessPoint, AccessPointScanner, GeolocationError, GeolocationTransport, PositionReceiver,
};
use fieldnode_core::remote::{PEOPLE_COUNTER, RemoteError, RemoteStore, UPDATED_TIME};
use fieldnode_core::sensors::{AnalogInput, ClimateReading, Sensor, SensorError};
use fieldnode_core::timestamp::{GnssDate, GnssTime};
use log::{debug, info};

use crate::config::{LinkConfig, PositionConfig};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Link that follows a fixed up/down duty cycle.
pub struct SimLink {
    config: LinkConfig,
    started: Instant,
}

impl SimLink {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            started: Instant::now(),
        }
    }

    fn up_at(&self, elapsed: Duration) -> bool {
        let period = self.config.online_secs + self.config.offline_secs;
        if period == 0 || self.config.offline_secs == 0 {
            return true;
        }
        elapsed.as_secs() % period < self.config.online_secs
    }
}

impl NetworkLink for SimLink {
    async fn is_connected(&mut self) -> bool {
        self.up_at(self.started.elapsed())
    }

    async fn reconnect(&mut self) {
        info!("Reconnect requested");
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Int(i32),
    Float(f32),
    Text(String),
}

/// Remote store shared with a simulated second client.
#[derive(Clone, Default)]
pub struct SimStore {
    values: Arc<Mutex<HashMap<String, Value>>>,
}

impl SimStore {
    pub fn new() -> Self {
        let store = Self::default();
        lock(&store.values).insert(PEOPLE_COUNTER.to_string(), Value::Int(0));
        store
    }

    /// Overwrite the counter the way another client would.
    pub fn foreign_edit(&self, delta: i32) -> i32 {
        let mut values = lock(&self.values);
        let current = match values.get(PEOPLE_COUNTER) {
            Some(Value::Int(v)) => *v,
            _ => 0,
        };
        let next = current + delta;
        values.insert(PEOPLE_COUNTER.to_string(), Value::Int(next));
        next
    }

    pub fn counter(&self) -> Option<i32> {
        match lock(&self.values).get(PEOPLE_COUNTER) {
            Some(Value::Int(v)) => Some(*v),
            _ => None,
        }
    }

    fn get(&self, path: &str) -> Result<Value, RemoteError> {
        if path == UPDATED_TIME {
            return Ok(Value::Text(wall_clock_utc()));
        }
        lock(&self.values)
            .get(path)
            .cloned()
            .ok_or(RemoteError::Empty)
    }

    fn set(&self, path: &str, value: Value) -> Result<(), RemoteError> {
        debug!("remote {} <- {:?}", path, value);
        lock(&self.values).insert(path.to_string(), value);
        Ok(())
    }
}

/// `hh:mm:ss` UTC, the format the dashboard writes to `UpdatedTime`.
fn wall_clock_utc() -> String {
    let secs = unix_secs() % 86_400;
    format!("{:02}:{:02}:{:02} UTC", secs / 3600, secs / 60 % 60, secs % 60)
}

impl RemoteStore for SimStore {
    async fn get_int(&mut self, path: &str) -> Result<i32, RemoteError> {
        match self.get(path)? {
            Value::Int(v) => Ok(v),
            _ => Err(RemoteError::Malformed),
        }
    }

    async fn set_int(&mut self, path: &str, value: i32) -> Result<(), RemoteError> {
        self.set(path, Value::Int(value))
    }

    async fn get_float(&mut self, path: &str) -> Result<f32, RemoteError> {
        match self.get(path)? {
            Value::Float(v) => Ok(v),
            _ => Err(RemoteError::Malformed),
        }
    }

    async fn set_float(&mut self, path: &str, value: f32) -> Result<(), RemoteError> {
        self.set(path, Value::Float(value))
    }

    async fn get_string(&mut self, path: &str) -> Result<String, RemoteError> {
        match self.get(path)? {
            Value::Text(v) => Ok(v),
            _ => Err(RemoteError::Malformed),
        }
    }

    async fn set_string(&mut self, path: &str, value: &str) -> Result<(), RemoteError> {
        self.set(path, Value::Text(value.to_string()))
    }
}

/// A handful of fixed access points.
pub struct SimScanner;

impl AccessPointScanner for SimScanner {
    async fn scan(&mut self, into: &mut Vec<AccessPoint>) -> Result<(), GeolocationError> {
        into.extend([
            AccessPoint {
                bssid: [0x3c, 0x84, 0x6a, 0x11, 0x22, 0x33],
                signal_strength: -48,
            },
            AccessPoint {
                bssid: [0xf0, 0x9f, 0xc2, 0x0a, 0x0b, 0x0c],
                signal_strength: -63,
            },
            AccessPoint {
                bssid: [0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e],
                signal_strength: -77,
            },
        ]);
        Ok(())
    }
}

/// Geolocation service that answers with the configured position.
pub struct SimGeolocation {
    latitude: f64,
    longitude: f64,
}

impl SimGeolocation {
    pub fn new(position: &PositionConfig) -> Self {
        Self {
            latitude: position.latitude,
            longitude: position.longitude,
        }
    }
}

impl GeolocationTransport for SimGeolocation {
    async fn post(&mut self, body: &str, response: &mut String) -> Result<(), GeolocationError> {
        debug!("geolocation request: {}", body);
        write!(
            response,
            r#"{{"location": {{"lat": {:.6}, "lng": {:.6}}}, "accuracy": 25.0}}"#,
            self.latitude, self.longitude
        )
        .map_err(|_| GeolocationError::Transport)
    }
}

/// Receiver state shared between the UART feed thread and the node.
#[derive(Clone, Default)]
pub struct SharedReceiver {
    decoder: Arc<Mutex<NmeaDecoder>>,
}

impl SharedReceiver {
    pub fn feed(&self, bytes: &[u8]) -> usize {
        lock(&self.decoder).feed_all(bytes)
    }
}

impl PositionReceiver for SharedReceiver {
    fn location(&self) -> Option<(f64, f64)> {
        lock(&self.decoder).fix().location
    }

    fn time(&self) -> Option<GnssTime> {
        lock(&self.decoder).fix().time
    }

    fn date(&self) -> Option<GnssDate> {
        lock(&self.decoder).fix().date
    }
}

fn nmea_coordinate(value: f64, width: usize) -> String {
    let value = value.abs();
    let degrees = value.trunc();
    let minutes = (value - degrees) * 60.0;
    format!("{:0width$}{:07.4}", degrees as u32, minutes, width = width)
}

/// Build one checksummed `$GPRMC` line for `unix` seconds.
pub fn rmc_sentence(valid: bool, latitude: f64, longitude: f64, unix: u64) -> String {
    let secs_of_day = unix % 86_400;
    let (day, month, year) = civil_from_days((unix / 86_400) as i64);
    let body = format!(
        "GPRMC,{:02}{:02}{:02}.00,{},{},{},{},{},0.0,0.0,{:02}{:02}{:02},,,A",
        secs_of_day / 3600,
        secs_of_day / 60 % 60,
        secs_of_day % 60,
        if valid { 'A' } else { 'V' },
        nmea_coordinate(latitude, 2),
        if latitude < 0.0 { 'S' } else { 'N' },
        nmea_coordinate(longitude, 3),
        if longitude < 0.0 { 'W' } else { 'E' },
        day,
        month,
        year % 100,
    );
    let checksum = body.bytes().fold(0u8, |acc, b| acc ^ b);
    format!("${body}*{checksum:02X}\r\n")
}

/// Days since 1970-01-01 to (day, month, year).
fn civil_from_days(days: i64) -> (u32, u32, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (day, month, year)
}

/// Feed one RMC sentence per second, invalid until acquisition completes.
pub fn spawn_receiver_feed(receiver: SharedReceiver, position: PositionConfig) {
    std::thread::spawn(move || {
        let started = Instant::now();
        loop {
            let valid = started.elapsed().as_secs() >= position.acquisition_secs;
            let sentence = rmc_sentence(valid, position.latitude, position.longitude, unix_secs());
            receiver.feed(sentence.as_bytes());
            std::thread::sleep(Duration::from_secs(1));
        }
    });
}

/// Analog channel following a slow sine around `center`.
pub struct SimAnalog {
    center: f64,
    swing: f64,
    period_secs: f64,
    started: Instant,
}

impl SimAnalog {
    pub fn new(center: u16, swing: u16, period_secs: f64) -> Self {
        Self {
            center: f64::from(center),
            swing: f64::from(swing),
            period_secs,
            started: Instant::now(),
        }
    }
}

impl AnalogInput for SimAnalog {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        let t = self.started.elapsed().as_secs_f64();
        let raw = self.center + self.swing * (t / self.period_secs * std::f64::consts::TAU).sin();
        Ok(raw.clamp(0.0, 4095.0) as u16)
    }
}

/// Temperature/humidity sensor with a daily-looking drift.
pub struct SimClimate {
    started: Instant,
}

impl SimClimate {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Sensor for SimClimate {
    type Reading = ClimateReading;

    async fn read(&mut self) -> Result<ClimateReading, SensorError> {
        let t = self.started.elapsed().as_secs_f64();
        Ok(ClimateReading {
            temperature_f: (74.0 + 4.0 * (t / 300.0).sin()) as f32,
            humidity_percent: (45.0 + 8.0 * (t / 420.0).cos()) as f32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn test_rmc_sentence_decodes() {
        let receiver = SharedReceiver::default();
        // 2024-03-09 14:05:30 UTC
        let sentence = rmc_sentence(true, 40.7128, -74.006, 1_709_993_130);

        assert_eq!(receiver.feed(sentence.as_bytes()), 1, "{sentence}");

        let (lat, lon) = receiver.location().unwrap();
        assert!((lat - 40.7128).abs() < 1e-4);
        assert!((lon + 74.006).abs() < 1e-4);
        assert_eq!(
            receiver.time(),
            Some(GnssTime {
                hour: 14,
                minute: 5,
                second: 30
            })
        );
        assert_eq!(
            receiver.date(),
            Some(GnssDate {
                day: 9,
                month: 3,
                year: 2024
            })
        );
    }

    #[test]
    fn test_void_sentence_has_no_location() {
        let receiver = SharedReceiver::default();
        receiver.feed(rmc_sentence(false, 1.0, 2.0, 0).as_bytes());
        assert_eq!(receiver.location(), None);
    }

    #[test]
    fn test_link_duty_cycle() {
        let link = SimLink::new(LinkConfig {
            online_secs: 10,
            offline_secs: 5,
        });
        assert!(link.up_at(Duration::from_secs(0)));
        assert!(link.up_at(Duration::from_secs(9)));
        assert!(!link.up_at(Duration::from_secs(10)));
        assert!(!link.up_at(Duration::from_secs(14)));
        assert!(link.up_at(Duration::from_secs(15)));
    }

    #[test]
    fn test_foreign_edit_changes_remote_counter() {
        let mut store = SimStore::new();
        assert_eq!(store.foreign_edit(3), 3);
        assert_eq!(block_on(store.get_int(PEOPLE_COUNTER)), Ok(3));
        assert_eq!(block_on(store.get_int("missing")), Err(RemoteError::Empty));
    }
}
