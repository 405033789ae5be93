//! Snapshot published to the status display on every display tick.

use crate::metrics::BatteryLevel;
use crate::timestamp::TimeString;

/// What the display shows. The display itself lives behind [`StatusSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub battery_volts: Option<f32>,
    pub battery: BatteryLevel,
    pub time: TimeString,
    pub temperature_f: Option<f32>,
    pub humidity_percent: Option<f32>,
    pub people: i32,
    pub link_up: bool,
}

pub trait StatusSink {
    fn publish(&mut self, snapshot: &StatusSnapshot);
}

impl<T: StatusSink> StatusSink for &mut T {
    fn publish(&mut self, snapshot: &StatusSnapshot) {
        (**self).publish(snapshot)
    }
}

/// Sink that logs each snapshot, for builds without a display.
#[derive(Debug, Default)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn publish(&mut self, snapshot: &StatusSnapshot) {
        log::debug!(
            "Battery: {} | Time: {} | Temp: {:?} F | Humidity: {:?}% | People: {} | {}",
            snapshot.battery.label(),
            snapshot.time,
            snapshot.temperature_f,
            snapshot.humidity_percent,
            snapshot.people,
            if snapshot.link_up { "WiFi connected" } else { "No WiFi" }
        );
    }
}
