//! Location resolution
//!
//! Two sources compete for the node's position: a network-assisted fix built
//! from the visible Wi-Fi access points, and the on-board positioning
//! receiver. The network fix is preferred because it is ready right after
//! power-on while the receiver can take tens of seconds to acquire; the
//! receiver covers disconnected operation.

mod geolocate;

pub use geolocate::*;

use alloc::string::String;
use alloc::vec::Vec;

use embedded_hal_async::delay::DelayNs;
use log::{debug, warn};

use crate::deadline::with_deadline;
use crate::timestamp::{GnssDate, GnssTime};

/// Which source produced a position or a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    None,
    LocalFix,
    NetworkFix,
}

/// A resolved position. `(0, 0)` with [`Provenance::None`] means unknown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub provenance: Provenance,
}

impl Position {
    pub const UNKNOWN: Self = Self {
        latitude: 0.0,
        longitude: 0.0,
        provenance: Provenance::None,
    };

    pub fn is_known(&self) -> bool {
        self.provenance != Provenance::None
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

/// Read side of the on-board positioning receiver.
///
/// Each accessor returns `None` while the receiver has no valid value for it.
pub trait PositionReceiver {
    fn location(&self) -> Option<(f64, f64)>;
    fn time(&self) -> Option<GnssTime>;
    fn date(&self) -> Option<GnssDate>;
}

impl<R: PositionReceiver> PositionReceiver for &R {
    fn location(&self) -> Option<(f64, f64)> {
        (**self).location()
    }

    fn time(&self) -> Option<GnssTime> {
        (**self).time()
    }

    fn date(&self) -> Option<GnssDate> {
        (**self).date()
    }
}

/// One visible access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPoint {
    pub bssid: [u8; 6],
    pub signal_strength: i8,
}

/// Enumerates the access points currently in range.
pub trait AccessPointScanner {
    fn scan(
        &mut self,
        into: &mut Vec<AccessPoint>,
    ) -> impl Future<Output = Result<(), GeolocationError>>;
}

/// Carries one geolocation request to the service and returns the raw body.
pub trait GeolocationTransport {
    fn post(
        &mut self,
        body: &str,
        response: &mut String,
    ) -> impl Future<Output = Result<(), GeolocationError>>;
}

/// Picks the authoritative position for one logging or sync tick.
///
/// Nothing is cached between calls; every call walks the priority list again.
pub struct LocationResolver<W, G> {
    scanner: W,
    transport: G,
    timeout_ms: u32,
    access_points: Vec<AccessPoint>,
    body: String,
    response: String,
}

impl<W, G> LocationResolver<W, G>
where
    W: AccessPointScanner,
    G: GeolocationTransport,
{
    pub fn new(scanner: W, transport: G, timeout_ms: u32) -> Self {
        Self {
            scanner,
            transport,
            timeout_ms,
            access_points: Vec::new(),
            body: String::new(),
            response: String::new(),
        }
    }

    /// Resolve the position.
    ///
    /// 1. Link up: ask the geolocation service, tagging [`Provenance::NetworkFix`].
    /// 2. Receiver has a fix: use it, tagging [`Provenance::LocalFix`].
    /// 3. Otherwise [`Position::UNKNOWN`].
    ///
    /// A failed network attempt falls through to the receiver without retrying.
    pub async fn resolve<R, D>(&mut self, link_up: bool, receiver: &R, delay: &mut D) -> Position
    where
        R: PositionReceiver,
        D: DelayNs,
    {
        if link_up {
            match with_deadline(delay, self.timeout_ms, self.network_fix()).await {
                Some(Ok(position)) => return position,
                Some(Err(e)) => warn!("Network geolocation failed: {}", e),
                None => warn!("Network geolocation timed out after {} ms", self.timeout_ms),
            }
        }

        match receiver.location() {
            Some((latitude, longitude)) => Position {
                latitude,
                longitude,
                provenance: Provenance::LocalFix,
            },
            None => {
                debug!("No position source available");
                Position::UNKNOWN
            }
        }
    }

    async fn network_fix(&mut self) -> Result<Position, GeolocationError> {
        self.access_points.clear();
        self.scanner.scan(&mut self.access_points).await?;
        if self.access_points.is_empty() {
            return Err(GeolocationError::NoAccessPoints);
        }

        build_request_body(&self.access_points, &mut self.body);
        self.response.clear();
        self.transport.post(&self.body, &mut self.response).await?;

        let (latitude, longitude) = parse_location(&self.response)?;
        debug!(
            "Network fix from {} access points: {}, {}",
            self.access_points.len(),
            latitude,
            longitude
        );
        Ok(Position {
            latitude,
            longitude,
            provenance: Provenance::NetworkFix,
        })
    }

    pub fn scanner_mut(&mut self) -> &mut W {
        &mut self.scanner
    }

    pub fn transport_mut(&mut self) -> &mut G {
        &mut self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeReceiver, ImmediateDelay, NeverDelay, ScriptedScanner, ScriptedTransport};
    use embassy_futures::block_on;

    const GOOD_RESPONSE: &str =
        r#"{"location": {"lat": 37.421998, "lng": -122.084}, "accuracy": 20.0}"#;

    fn resolver(response: Result<&str, GeolocationError>) -> LocationResolver<ScriptedScanner, ScriptedTransport> {
        LocationResolver::new(
            ScriptedScanner::with_points(2),
            ScriptedTransport::replying(response),
            10_000,
        )
    }

    #[test]
    fn test_network_fix_preferred_when_link_up() {
        let mut resolver = resolver(Ok(GOOD_RESPONSE));
        let receiver = FakeReceiver::with_fix(40.0, -75.0);

        let position = block_on(resolver.resolve(true, &receiver, &mut NeverDelay));

        assert_eq!(position.provenance, Provenance::NetworkFix);
        assert_eq!(position.latitude, 37.421998);
        assert_eq!(position.longitude, -122.084);
        assert!(
            resolver.transport_mut().last_body().contains("\"wifiAccessPoints\""),
            "request body must list the scanned access points"
        );
    }

    #[test]
    fn test_missing_lng_falls_back_to_receiver() {
        let mut resolver = resolver(Ok(r#"{"location": {"lat": 37.4}, "accuracy": 20.0}"#));
        let receiver = FakeReceiver::with_fix(40.5, -75.25);

        let position = block_on(resolver.resolve(true, &receiver, &mut NeverDelay));

        assert_eq!(
            position,
            Position {
                latitude: 40.5,
                longitude: -75.25,
                provenance: Provenance::LocalFix,
            }
        );
    }

    #[test]
    fn test_transport_failure_falls_back_to_unknown() {
        let mut resolver = resolver(Err(GeolocationError::Transport));
        let receiver = FakeReceiver::default();

        let position = block_on(resolver.resolve(true, &receiver, &mut NeverDelay));

        assert_eq!(position, Position::UNKNOWN);
        assert!(!position.is_known());
    }

    #[test]
    fn test_link_down_skips_network_service() {
        let mut resolver = resolver(Ok(GOOD_RESPONSE));
        let receiver = FakeReceiver::with_fix(1.0, 2.0);

        let position = block_on(resolver.resolve(false, &receiver, &mut NeverDelay));

        assert_eq!(position.provenance, Provenance::LocalFix);
        assert_eq!(resolver.transport_mut().calls(), 0);
    }

    #[test]
    fn test_no_access_points_is_a_failure() {
        let mut resolver = LocationResolver::new(
            ScriptedScanner::with_points(0),
            ScriptedTransport::replying(Ok(GOOD_RESPONSE)),
            10_000,
        );
        let receiver = FakeReceiver::default();

        let position = block_on(resolver.resolve(true, &receiver, &mut NeverDelay));

        assert_eq!(position, Position::UNKNOWN);
        assert_eq!(resolver.transport_mut().calls(), 0);
    }

    #[test]
    fn test_stalled_service_times_out_to_receiver() {
        let mut resolver = LocationResolver::new(
            ScriptedScanner::with_points(1),
            ScriptedTransport::stalled(),
            10,
        );
        let receiver = FakeReceiver::with_fix(10.0, 20.0);

        let position = block_on(resolver.resolve(true, &receiver, &mut ImmediateDelay));

        assert_eq!(position.provenance, Provenance::LocalFix);
    }
}
