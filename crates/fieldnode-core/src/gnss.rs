//! Minimal NMEA 0183 decoder for the positioning receiver.
//!
//! Only the recommended minimum sentence (`$--RMC`) is decoded: it carries
//! validity, position, UTC time and date, which is everything the node uses.
//! Bytes are fed one at a time from the receiver's UART; a sentence only
//! updates the fix once its checksum has been verified.

use heapless::Vec;

use crate::location::PositionReceiver;
use crate::timestamp::{GnssDate, GnssTime};

const MAX_SENTENCE: usize = 96;

/// Latest values decoded from the receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GnssFix {
    pub location: Option<(f64, f64)>,
    pub time: Option<GnssTime>,
    pub date: Option<GnssDate>,
}

impl PositionReceiver for GnssFix {
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

/// Streaming sentence decoder.
#[derive(Debug, Default)]
pub struct NmeaDecoder {
    buffer: Vec<u8, MAX_SENTENCE>,
    in_sentence: bool,
    fix: GnssFix,
}

impl NmeaDecoder {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            in_sentence: false,
            fix: GnssFix {
                location: None,
                time: None,
                date: None,
            },
        }
    }

    pub fn fix(&self) -> GnssFix {
        self.fix
    }

    /// Feed one byte. Returns `true` when it completed a valid RMC sentence.
    pub fn feed(&mut self, byte: u8) -> bool {
        match byte {
            b'$' => {
                self.buffer.clear();
                self.in_sentence = true;
                false
            }
            b'\r' | b'\n' => {
                if !self.in_sentence {
                    return false;
                }
                self.in_sentence = false;
                let decoded = core::str::from_utf8(&self.buffer)
                    .ok()
                    .and_then(decode_rmc);
                match decoded {
                    Some(fix) => {
                        self.fix = fix;
                        true
                    }
                    None => false,
                }
            }
            _ if self.in_sentence => {
                if self.buffer.push(byte).is_err() {
                    // Overlong line: drop it and wait for the next `$`.
                    self.in_sentence = false;
                }
                false
            }
            _ => false,
        }
    }

    /// Feed a slice, returning how many valid RMC sentences it completed.
    pub fn feed_all(&mut self, bytes: &[u8]) -> usize {
        bytes.iter().filter(|&&b| self.feed(b)).count()
    }
}

impl PositionReceiver for NmeaDecoder {
    fn location(&self) -> Option<(f64, f64)> {
        self.fix.location
    }

    fn time(&self) -> Option<GnssTime> {
        self.fix.time
    }

    fn date(&self) -> Option<GnssDate> {
        self.fix.date
    }
}

/// Decode the body of a sentence (everything between `$` and the line end).
fn decode_rmc(sentence: &str) -> Option<GnssFix> {
    let (body, checksum) = sentence.split_once('*')?;
    let expected = u8::from_str_radix(checksum.get(..2)?, 16).ok()?;
    let actual = body.bytes().fold(0u8, |acc, b| acc ^ b);
    if expected != actual {
        return None;
    }

    let mut fields = body.split(',');
    let talker = fields.next()?;
    if talker.len() != 5 || !talker.ends_with("RMC") {
        return None;
    }

    let time = fields.next()?;
    let status = fields.next()?;
    let lat = fields.next()?;
    let lat_hemisphere = fields.next()?;
    let lon = fields.next()?;
    let lon_hemisphere = fields.next()?;
    let _speed = fields.next()?;
    let _course = fields.next()?;
    let date = fields.next()?;

    let location = if status == "A" {
        match (
            parse_coordinate(lat, lat_hemisphere, 2),
            parse_coordinate(lon, lon_hemisphere, 3),
        ) {
            (Some(latitude), Some(longitude)) => Some((latitude, longitude)),
            _ => None,
        }
    } else {
        None
    };

    Some(GnssFix {
        location,
        time: parse_time(time),
        date: parse_date(date),
    })
}

/// `ddmm.mmmm` / `dddmm.mmmm` plus hemisphere into signed decimal degrees.
fn parse_coordinate(value: &str, hemisphere: &str, degree_digits: usize) -> Option<f64> {
    let degrees: f64 = value.get(..degree_digits)?.parse().ok()?;
    let minutes: f64 = value.get(degree_digits..)?.parse().ok()?;
    let magnitude = degrees + minutes / 60.0;
    match hemisphere {
        "N" | "E" => Some(magnitude),
        "S" | "W" => Some(-magnitude),
        _ => None,
    }
}

fn two_digits(value: &str, at: usize) -> Option<u8> {
    value.get(at..at + 2)?.parse().ok()
}

fn parse_time(value: &str) -> Option<GnssTime> {
    let time = GnssTime {
        hour: two_digits(value, 0)?,
        minute: two_digits(value, 2)?,
        second: two_digits(value, 4)?,
    };
    (time.hour < 24 && time.minute < 60 && time.second < 61).then_some(time)
}

fn parse_date(value: &str) -> Option<GnssDate> {
    let date = GnssDate {
        day: two_digits(value, 0)?,
        month: two_digits(value, 2)?,
        year: 2000 + u16::from(two_digits(value, 4)?),
    };
    ((1..=31).contains(&date.day) && (1..=12).contains(&date.month)).then_some(date)
}
