//! Test doubles shared by the unit tests.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use embedded_hal_async::delay::DelayNs;

use crate::link::NetworkLink;
use crate::location::{
    AccessPoint, AccessPointScanner, GeolocationError, GeolocationTransport, PositionReceiver,
};
use crate::remote::{PEOPLE_COUNTER, RemoteError, RemoteStore};
use crate::scheduler::{NodeHardware, Platform};
use crate::sensors::{
    AnalogInput, ClimateReading, EnvironmentReading, EnvironmentSource, Sensor, SensorError,
};
use crate::status::{StatusSink, StatusSnapshot};
use crate::storage::{LogMedium, StorageError};
use crate::timestamp::{GnssDate, GnssTime};

/// Every delay has already elapsed.
pub struct ImmediateDelay;

impl DelayNs for ImmediateDelay {
    async fn delay_ns(&mut self, _ns: u32) {}
}

/// No delay ever elapses.
pub struct NeverDelay;

impl DelayNs for NeverDelay {
    async fn delay_ns(&mut self, _ns: u32) {
        core::future::pending::<()>().await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FakeReceiver {
    pub location: Option<(f64, f64)>,
    pub time: Option<GnssTime>,
    pub date: Option<GnssDate>,
}

impl FakeReceiver {
    pub fn with_fix(latitude: f64, longitude: f64) -> Self {
        Self {
            location: Some((latitude, longitude)),
            ..Self::default()
        }
    }

    pub fn at(self, time: GnssTime, date: GnssDate) -> Self {
        Self {
            time: Some(time),
            date: Some(date),
            ..self
        }
    }
}

impl PositionReceiver for FakeReceiver {
    fn location(&self) -> Option<(f64, f64)> {
        self.location
    }

    fn time(&self) -> Option<GnssTime> {
        self.time
    }

    fn date(&self) -> Option<GnssDate> {
        self.date
    }
}

pub struct ScriptedScanner {
    points: usize,
}

impl ScriptedScanner {
    pub fn with_points(points: usize) -> Self {
        Self { points }
    }
}

impl AccessPointScanner for ScriptedScanner {
    async fn scan(&mut self, into: &mut Vec<AccessPoint>) -> Result<(), GeolocationError> {
        for i in 0..self.points {
            into.push(AccessPoint {
                bssid: [0x24, 0x0a, 0xc4, 0x00, 0x00, i as u8],
                signal_strength: -40 - i as i8,
            });
        }
        Ok(())
    }
}

pub struct ScriptedTransport {
    reply: Option<Result<String, GeolocationError>>,
    last_body: String,
    calls: usize,
}

impl ScriptedTransport {
    pub fn replying(reply: Result<&str, GeolocationError>) -> Self {
        Self {
            reply: Some(reply.map(ToString::to_string)),
            last_body: String::new(),
            calls: 0,
        }
    }

    /// Accepts the request and never answers.
    pub fn stalled() -> Self {
        Self {
            reply: None,
            last_body: String::new(),
            calls: 0,
        }
    }

    pub fn last_body(&self) -> &str {
        &self.last_body
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl GeolocationTransport for ScriptedTransport {
    async fn post(&mut self, body: &str, response: &mut String) -> Result<(), GeolocationError> {
        self.calls += 1;
        self.last_body.clear();
        self.last_body.push_str(body);
        match &self.reply {
            Some(Ok(text)) => {
                response.push_str(text);
                Ok(())
            }
            Some(Err(e)) => Err(*e),
            None => core::future::pending().await,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Int(i32),
    Float(f32),
    Text(String),
}

/// Remote store backed by a map.
#[derive(Default)]
pub struct MemoryStore {
    values: BTreeMap<String, Value>,
    writes: usize,
    /// Every call fails as unreachable.
    pub fail_all: bool,
    /// Reads succeed, set calls fail as unreachable.
    pub fail_writes: bool,
    /// Every call hangs.
    pub stall: bool,
    /// Runs inside `get_int`, before the value is returned.
    pub on_read: Option<fn()>,
}

impl MemoryStore {
    pub fn with_counter(value: i32) -> Self {
        let mut store = Self::default();
        store.set_int_now(PEOPLE_COUNTER, value);
        store
    }

    pub fn set_int_now(&mut self, path: &str, value: i32) {
        self.values.insert(path.to_string(), Value::Int(value));
    }

    pub fn set_string_now(&mut self, path: &str, value: &str) {
        self.values
            .insert(path.to_string(), Value::Text(value.to_string()));
    }

    pub fn int(&self, path: &str) -> Option<i32> {
        match self.values.get(path) {
            Some(Value::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, path: &str) -> Option<f32> {
        match self.values.get(path) {
            Some(Value::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn string(&self, path: &str) -> Option<&str> {
        match self.values.get(path) {
            Some(Value::Text(v)) => Some(v),
            _ => None,
        }
    }

    /// Successful set calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    async fn gate(&self) -> Result<(), RemoteError> {
        if self.stall {
            core::future::pending::<()>().await;
        }
        if self.fail_all {
            return Err(RemoteError::Unreachable);
        }
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Value, RemoteError> {
        self.gate().await?;
        self.values.get(path).cloned().ok_or(RemoteError::Empty)
    }

    async fn set(&mut self, path: &str, value: Value) -> Result<(), RemoteError> {
        self.gate().await?;
        if self.fail_writes {
            return Err(RemoteError::Unreachable);
        }
        self.values.insert(path.to_string(), value);
        self.writes += 1;
        Ok(())
    }
}

impl RemoteStore for MemoryStore {
    async fn get_int(&mut self, path: &str) -> Result<i32, RemoteError> {
        let value = self.get(path).await?;
        if let Some(hook) = self.on_read {
            hook();
        }
        match value {
            Value::Int(v) => Ok(v),
            _ => Err(RemoteError::Malformed),
        }
    }

    async fn set_int(&mut self, path: &str, value: i32) -> Result<(), RemoteError> {
        self.set(path, Value::Int(value)).await
    }

    async fn get_float(&mut self, path: &str) -> Result<f32, RemoteError> {
        match self.get(path).await? {
            Value::Float(v) => Ok(v),
            _ => Err(RemoteError::Malformed),
        }
    }

    async fn set_float(&mut self, path: &str, value: f32) -> Result<(), RemoteError> {
        self.set(path, Value::Float(value)).await
    }

    async fn get_string(&mut self, path: &str) -> Result<String, RemoteError> {
        match self.get(path).await? {
            Value::Text(v) => Ok(v),
            _ => Err(RemoteError::Malformed),
        }
    }

    async fn set_string(&mut self, path: &str, value: &str) -> Result<(), RemoteError> {
        self.set(path, Value::Text(value.to_string())).await
    }
}

pub struct ScriptedLink {
    pub connected: bool,
    reconnects: usize,
}

impl Default for ScriptedLink {
    fn default() -> Self {
        Self {
            connected: true,
            reconnects: 0,
        }
    }
}

impl ScriptedLink {
    pub fn reconnects(&self) -> usize {
        self.reconnects
    }
}

impl NetworkLink for ScriptedLink {
    async fn is_connected(&mut self) -> bool {
        self.connected
    }

    async fn reconnect(&mut self) {
        self.reconnects += 1;
    }
}

pub struct FakeAnalog(Option<u16>);

impl FakeAnalog {
    pub fn raw(value: u16) -> Self {
        Self(Some(value))
    }

    pub fn failing() -> Self {
        Self(None)
    }
}

impl AnalogInput for FakeAnalog {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        self.0.ok_or(SensorError::ReadFailed {
            sensor: "fake",
            operation: "sample",
            details: "scripted failure",
        })
    }
}

pub struct FakeClimate(Option<ClimateReading>);

impl FakeClimate {
    pub fn reading(temperature_f: f32, humidity_percent: f32) -> Self {
        Self(Some(ClimateReading {
            temperature_f,
            humidity_percent,
        }))
    }

    pub fn failing() -> Self {
        Self(None)
    }
}

impl Sensor for FakeClimate {
    type Reading = ClimateReading;

    async fn read(&mut self) -> Result<ClimateReading, SensorError> {
        self.0.ok_or(SensorError::ReadFailed {
            sensor: "fake",
            operation: "measure",
            details: "scripted failure",
        })
    }
}

/// Fixed readings for scheduler tests.
pub struct FakeSensors {
    pub environment: EnvironmentReading,
    pub battery_volts: Option<f32>,
}

impl Default for FakeSensors {
    fn default() -> Self {
        Self {
            environment: EnvironmentReading {
                light_lux: 250.0,
                temperature_f: 71.5,
                humidity_percent: 38.0,
                sound_db: 55.0,
            },
            battery_volts: Some(3.9),
        }
    }
}

impl EnvironmentSource for FakeSensors {
    async fn read_climate(&mut self) -> Option<ClimateReading> {
        self.environment.climate()
    }

    async fn read_environment(&mut self) -> EnvironmentReading {
        self.environment
    }

    async fn read_battery_volts(&mut self) -> Option<f32> {
        self.battery_volts
    }
}

/// Files kept as strings.
#[derive(Default)]
pub struct MemoryMedium {
    files: BTreeMap<String, String>,
    bytes_written: usize,
    releases: usize,
    pub fail_init: bool,
    pub fail_open: bool,
    pub fail_probe: bool,
}

impl MemoryMedium {
    pub fn insert(&mut self, path: &str, contents: &str) {
        self.files.insert(path.to_string(), contents.to_string());
    }

    pub fn contents(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    pub fn releases(&self) -> usize {
        self.releases
    }
}

impl LogMedium for MemoryMedium {
    fn reinitialize(&mut self) -> Result<(), StorageError> {
        if self.fail_init {
            return Err(StorageError::Unavailable);
        }
        Ok(())
    }

    fn exists(&mut self, path: &str) -> Result<bool, StorageError> {
        if self.fail_probe {
            return Err(StorageError::Unavailable);
        }
        Ok(self.files.contains_key(path))
    }

    fn append(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_open {
            return Err(StorageError::OpenFailed);
        }
        let text = core::str::from_utf8(data).map_err(|_| StorageError::WriteFailed)?;
        self.files.entry(path.to_string()).or_default().push_str(text);
        self.bytes_written += data.len();
        Ok(())
    }

    fn release(&mut self) {
        self.releases += 1;
    }
}

#[derive(Default)]
pub struct RecordingStatus {
    published: Vec<StatusSnapshot>,
}

impl RecordingStatus {
    pub fn published(&self) -> &[StatusSnapshot] {
        &self.published
    }
}

impl StatusSink for RecordingStatus {
    fn publish(&mut self, snapshot: &StatusSnapshot) {
        self.published.push(snapshot.clone());
    }
}

pub struct TestPlatform;

impl Platform for TestPlatform {
    type Link = ScriptedLink;
    type Scanner = ScriptedScanner;
    type Transport = ScriptedTransport;
    type Store = MemoryStore;
    type Sensors = FakeSensors;
    type Receiver = FakeReceiver;
    type Medium = MemoryMedium;
    type Delay = NeverDelay;
    type Status = RecordingStatus;
}

pub const GEOLOCATION_REPLY: &str =
    r#"{"location": {"lat": 51.5007, "lng": -0.1246}, "accuracy": 35.0}"#;

pub fn test_hardware() -> NodeHardware<TestPlatform> {
    NodeHardware {
        link: ScriptedLink::default(),
        scanner: ScriptedScanner::with_points(3),
        transport: ScriptedTransport::replying(Ok(GEOLOCATION_REPLY)),
        store: MemoryStore::with_counter(0),
        sensors: FakeSensors::default(),
        receiver: FakeReceiver::default(),
        medium: MemoryMedium::default(),
        delay: NeverDelay,
        status: RecordingStatus::default(),
    }
}
