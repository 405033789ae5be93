//! Borrowed wall-clock time.
//!
//! The node has no clock of its own. Time comes either from the remote store
//! as an already formatted string or from the positioning receiver as UTC
//! fields, and is rendered for the log here.

use core::fmt::{self, Write};

use heapless::String;
use log::debug;

use crate::location::Provenance;

/// Rendered in place of a missing date.
pub const NO_DATE: &str = "00-00-0000";
/// Rendered in place of a missing time.
pub const NO_TIME: &str = "No Time Data";

pub type TimeString = String<32>;

/// UTC time of day reported by the positioning receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GnssTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// UTC calendar date reported by the positioning receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GnssDate {
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

impl fmt::Display for GnssDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}-{:04}", self.day, self.month, self.year)
    }
}

impl GnssTime {
    /// Render as `hh:mm:ss AM|PM` after shifting by `utc_offset_hours`.
    pub fn to_local_12h(self, utc_offset_hours: i8) -> TimeString {
        let hour = (i16::from(self.hour) + i16::from(utc_offset_hours)).rem_euclid(24) as u8;
        let (display_hour, period) = match hour {
            0 => (12, "AM"),
            1..=11 => (hour, "AM"),
            12 => (12, "PM"),
            _ => (hour - 12, "PM"),
        };

        let mut out = TimeString::new();
        // 11 characters always fit.
        let _ = write!(
            out,
            "{:02}:{:02}:{:02} {}",
            display_hour, self.minute, self.second, period
        );
        out
    }
}

/// Time-of-day half of a timestamp, tagged by where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeOfDay {
    /// Formatted string read from the remote store.
    Remote(TimeString),
    /// UTC fields from the positioning receiver.
    Receiver(GnssTime),
    Unavailable,
}

/// Date and time used for one log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub date: Option<GnssDate>,
    pub time: TimeOfDay,
}

impl Timestamp {
    pub const fn unavailable() -> Self {
        Self {
            date: None,
            time: TimeOfDay::Unavailable,
        }
    }

    pub fn provenance(&self) -> Provenance {
        match self.time {
            TimeOfDay::Remote(_) => Provenance::NetworkFix,
            TimeOfDay::Receiver(_) => Provenance::LocalFix,
            TimeOfDay::Unavailable => Provenance::None,
        }
    }

    pub fn date_field(&self) -> String<10> {
        let mut out = String::new();
        match self.date {
            Some(date) => {
                let _ = write!(out, "{date}");
            }
            None => {
                let _ = out.push_str(NO_DATE);
            }
        }
        out
    }

    /// Time column of the log record. Commas in remote strings would split
    /// the record, so they are replaced with spaces.
    pub fn time_field(&self, utc_offset_hours: i8) -> TimeString {
        match &self.time {
            TimeOfDay::Remote(text) => {
                let mut out = TimeString::new();
                for c in text.chars() {
                    let _ = out.push(if c == ',' { ' ' } else { c });
                }
                out
            }
            TimeOfDay::Receiver(time) => time.to_local_12h(utc_offset_hours),
            TimeOfDay::Unavailable => {
                let mut out = TimeString::new();
                let _ = out.push_str(NO_TIME);
                out
            }
        }
    }
}

/// Copy `text` into a [`TimeString`], truncating on a character boundary.
pub fn time_string(text: &str) -> TimeString {
    let mut out = TimeString::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            debug!("Time text truncated to {:?} (was {} bytes)", out.as_str(), text.len());
            break;
        }
    }
    out
}
