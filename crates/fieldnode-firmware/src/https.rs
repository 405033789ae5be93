//! One HTTPS exchange at a time over the Wi-Fi stack.
//!
//! The TLS record buffers are large, so a single client is shared by the
//! geolocation transport and the database store behind an async mutex.

use alloc::string::String;

use embassy_net::Stack;
use embassy_net::dns::DnsSocket;
use embassy_net::tcp::client::{TcpClient, TcpClientState};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex as AsyncMutex;
use esp_hal::rng::Rng;
use log::{debug, warn};
use reqwless::client::{HttpClient, TlsConfig, TlsVerify};
use reqwless::request::{Method, RequestBuilder};
use thiserror_no_std::Error;

/// Size of one TLS record buffer.
pub const TLS_BUFFER: usize = 16_640;
/// Largest response body kept.
pub const RESPONSE_BUFFER: usize = 2_048;

pub type SharedHttps = AsyncMutex<CriticalSectionRawMutex, HttpsClient>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    #[error("request could not be sent")]
    Request,
    #[error("server answered with status {0}")]
    Status(u16),
    #[error("response body is not UTF-8")]
    Encoding,
}

/// Buffers a client needs, allocated once at boot.
pub struct HttpsBuffers {
    pub tcp: TcpClientState<1, 4096, 4096>,
    pub tls_read: [u8; TLS_BUFFER],
    pub tls_write: [u8; TLS_BUFFER],
    pub response: [u8; RESPONSE_BUFFER],
}

impl HttpsBuffers {
    pub const fn new() -> Self {
        Self {
            tcp: TcpClientState::new(),
            tls_read: [0; TLS_BUFFER],
            tls_write: [0; TLS_BUFFER],
            response: [0; RESPONSE_BUFFER],
        }
    }
}

impl Default for HttpsBuffers {
    fn default() -> Self {
        Self::new()
    }
}

pub struct HttpsClient {
    stack: Stack<'static>,
    buffers: &'static mut HttpsBuffers,
    rng: Rng,
}

impl HttpsClient {
    pub fn new(stack: Stack<'static>, buffers: &'static mut HttpsBuffers, rng: Rng) -> Self {
        Self {
            stack,
            buffers,
            rng,
        }
    }

    /// Send `body` (empty for a bodyless request) and copy the reply into `response`.
    ///
    /// Non-2xx answers are errors; `response` is left empty for them.
    pub async fn exchange(
        &mut self,
        method: Method,
        url: &str,
        body: &[u8],
        response: &mut String,
    ) -> Result<(), HttpError> {
        response.clear();
        let seed = (u64::from(self.rng.random()) << 32) | u64::from(self.rng.random());

        let HttpsBuffers {
            tcp,
            tls_read,
            tls_write,
            response: rx,
        } = &mut *self.buffers;

        let tcp_client = TcpClient::new(self.stack, tcp);
        let dns = DnsSocket::new(self.stack);
        let tls = TlsConfig::new(seed, tls_read, tls_write, TlsVerify::None);
        let mut client = HttpClient::new_with_tls(&tcp_client, &dns, tls);

        let headers = [("Content-Type", "application/json")];
        let mut request = client
            .request(method, url)
            .await
            .map_err(|e| {
                warn!("HTTP connect failed: {:?}", e);
                HttpError::Request
            })?
            .headers(&headers)
            .body(body);

        let reply = request.send(rx).await.map_err(|e| {
            warn!("HTTP send failed: {:?}", e);
            HttpError::Request
        })?;

        let status = reply.status.0;
        let bytes = reply.body().read_to_end().await.map_err(|e| {
            warn!("HTTP body read failed: {:?}", e);
            HttpError::Request
        })?;
        debug!("HTTP status {} with {} bytes", status, bytes.len());

        if !(200..300).contains(&status) {
            return Err(HttpError::Status(status));
        }
        let text = core::str::from_utf8(bytes).map_err(|_| HttpError::Encoding)?;
        response.push_str(text);
        Ok(())
    }
}
