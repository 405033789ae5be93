//! Wire format of the network geolocation call.

use alloc::string::String;
use core::fmt::Write;

use thiserror_no_std::Error;

use super::AccessPoint;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("access point scan failed")]
    Scan,
    #[error("no access points in range")]
    NoAccessPoints,
    #[error("geolocation request failed")]
    Transport,
    #[error("geolocation service answered with status {0}")]
    Status(u16),
    #[error("response has no \"{0}\" field")]
    MissingField(&'static str),
    #[error("response field \"{0}\" is not a number")]
    BadNumber(&'static str),
}

/// Render `{"wifiAccessPoints":[{"macAddress":"..","signalStrength":..},...]}` into `out`.
pub fn build_request_body(points: &[AccessPoint], out: &mut String) {
    out.clear();
    out.push_str("{\"wifiAccessPoints\":[");
    for (i, ap) in points.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let [a, b, c, d, e, f] = ap.bssid;
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "{{\"macAddress\":\"{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{f:02X}\",\"signalStrength\":{}}}",
            ap.signal_strength
        );
    }
    out.push_str("]}");
}

/// Extract `(lat, lng)` from a geolocation response.
///
/// The body is scanned for the literal `"lat":` and `"lng":` keys and the
/// numeric token after each is parsed. Both must be present.
pub fn parse_location(body: &str) -> Result<(f64, f64), GeolocationError> {
    let latitude = number_after(body, "lat")?;
    let longitude = number_after(body, "lng")?;
    Ok((latitude, longitude))
}

fn number_after(body: &str, key: &'static str) -> Result<f64, GeolocationError> {
    let mut needle: heapless::String<8> = heapless::String::new();
    let _ = write!(needle, "\"{key}\":");

    let start = body
        .find(needle.as_str())
        .ok_or(GeolocationError::MissingField(key))?
        + needle.len();

    let rest = body[start..].trim_start();
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')))
        .unwrap_or(rest.len());

    rest[..end]
        .parse::<f64>()
        .map_err(|_| GeolocationError::BadNumber(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_format() {
        let points = [
            AccessPoint {
                bssid: [0x00, 0x25, 0x9c, 0xcf, 0x1c, 0xac],
                signal_strength: -43,
            },
            AccessPoint {
                bssid: [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01],
                signal_strength: -71,
            },
        ];
        let mut body = String::new();
        build_request_body(&points, &mut body);

        assert_eq!(
            body,
            "{\"wifiAccessPoints\":[\
             {\"macAddress\":\"00:25:9C:CF:1C:AC\",\"signalStrength\":-43},\
             {\"macAddress\":\"DE:AD:BE:EF:00:01\",\"signalStrength\":-71}]}"
        );
    }

    #[test]
    fn test_parse_compact_response() {
        let body = r#"{"location":{"lat":51.0,"lng":-0.1},"accuracy":1200.4}"#;
        assert_eq!(parse_location(body), Ok((51.0, -0.1)));
    }

    #[test]
    fn test_parse_pretty_response() {
        let body = "{\n  \"location\": {\n    \"lat\": -33.865143,\n    \"lng\": 151.2099\n  },\n  \"accuracy\": 35\n}";
        assert_eq!(parse_location(body), Ok((-33.865143, 151.2099)));
    }

    #[test]
    fn test_partial_response_is_rejected() {
        let body = r#"{"location":{"lat":51.0},"accuracy":1200.4}"#;
        assert_eq!(
            parse_location(body),
            Err(GeolocationError::MissingField("lng"))
        );
    }

    #[test]
    fn test_error_body_is_rejected() {
        let body = r#"{"error":{"code":404,"message":"Not Found"}}"#;
        assert_eq!(
            parse_location(body),
            Err(GeolocationError::MissingField("lat"))
        );
    }

    #[test]
    fn test_non_numeric_field_is_rejected() {
        let body = r#"{"location":{"lat":"n/a","lng":1.0}}"#;
        assert_eq!(parse_location(body), Err(GeolocationError::BadNumber("lat")));
    }
}
