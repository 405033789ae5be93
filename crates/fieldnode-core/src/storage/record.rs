use alloc::string::String;
use core::fmt::{self, Write};

use crate::location::Position;
use crate::sensors::EnvironmentReading;
use crate::timestamp::{TimeString, Timestamp};

/// First line of every log file.
pub const HEADER: &str = "Date,Time,Lat,Long,Light,Temp,Humidity,Sound,People";

/// One sample as written to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub date: heapless::String<10>,
    pub time: TimeString,
    pub latitude: f64,
    pub longitude: f64,
    pub light_lux: f32,
    pub temperature_f: f32,
    pub humidity_percent: f32,
    pub sound_db: f32,
    pub people: i32,
}

impl LogRecord {
    pub fn new(
        timestamp: &Timestamp,
        utc_offset_hours: i8,
        position: &Position,
        environment: &EnvironmentReading,
        people: i32,
    ) -> Self {
        Self {
            date: timestamp.date_field(),
            time: timestamp.time_field(utc_offset_hours),
            latitude: position.latitude,
            longitude: position.longitude,
            light_lux: environment.light_lux,
            temperature_f: environment.temperature_f,
            humidity_percent: environment.humidity_percent,
            sound_db: environment.sound_db,
            people,
        }
    }

    /// Append the record, newline terminated, to `out`.
    pub fn write_line(&self, out: &mut String) -> fmt::Result {
        write!(
            out,
            "{},{},{:.6},{:.6},",
            self.date, self.time, self.latitude, self.longitude
        )?;
        for value in [
            self.light_lux,
            self.temperature_f,
            self.humidity_percent,
            self.sound_db,
        ] {
            write_reading(out, value)?;
            out.push(',');
        }
        writeln!(out, "{}", self.people)
    }
}

/// Two decimals, with a failed reading rendered as `nan`.
fn write_reading(out: &mut String, value: f32) -> fmt::Result {
    if value.is_nan() {
        out.push_str("nan");
        Ok(())
    } else {
        write!(out, "{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Provenance;
    use crate::timestamp::{GnssDate, GnssTime, TimeOfDay};

    fn record(environment: EnvironmentReading) -> LogRecord {
        let timestamp = Timestamp {
            date: Some(GnssDate {
                day: 1,
                month: 6,
                year: 2024,
            }),
            time: TimeOfDay::Receiver(GnssTime {
                hour: 18,
                minute: 5,
                second: 0,
            }),
        };
        let position = Position {
            latitude: 40.7128,
            longitude: -74.006,
            provenance: Provenance::LocalFix,
        };
        LogRecord::new(&timestamp, -5, &position, &environment, 12)
    }

    #[test]
    fn test_line_format() {
        let mut line = String::new();
        record(EnvironmentReading {
            light_lux: 123.456,
            temperature_f: 70.1,
            humidity_percent: 45.0,
            sound_db: 60.25,
        })
        .write_line(&mut line)
        .unwrap();

        assert_eq!(
            line,
            "01-06-2024,01:05:00 PM,40.712800,-74.006000,123.46,70.10,45.00,60.25,12\n"
        );
    }

    #[test]
    fn test_failed_readings_render_as_nan() {
        let mut line = String::new();
        record(EnvironmentReading::UNAVAILABLE)
            .write_line(&mut line)
            .unwrap();

        assert!(line.ends_with(",nan,nan,nan,nan,12\n"));
    }

    #[test]
    fn test_field_count_matches_header() {
        let mut line = String::new();
        record(EnvironmentReading::UNAVAILABLE)
            .write_line(&mut line)
            .unwrap();

        assert_eq!(
            line.trim_end().split(',').count(),
            HEADER.split(',').count()
        );
    }
}
