//! The two cloud services the node talks to, over the shared HTTPS client.

use alloc::string::String;

use fieldnode_core::location::{GeolocationError, GeolocationTransport};
use fieldnode_core::remote::rest::{encode, parse_float, parse_int, parse_string, value_url};
use fieldnode_core::remote::{RemoteError, RemoteStore};
use log::warn;
use reqwless::request::Method;
use serde::Serialize;

use crate::https::{HttpError, SharedHttps};

/// Posts scan results to the geolocation API.
pub struct GeolocationClient {
    https: &'static SharedHttps,
    url: String,
}

impl GeolocationClient {
    pub fn new(https: &'static SharedHttps, endpoint: &str, api_key: &str) -> Self {
        let mut url = String::from(endpoint);
        if !api_key.is_empty() {
            url.push_str("?key=");
            url.push_str(api_key);
        }
        Self { https, url }
    }
}

impl GeolocationTransport for GeolocationClient {
    async fn post(&mut self, body: &str, response: &mut String) -> Result<(), GeolocationError> {
        let mut https = self.https.lock().await;
        https
            .exchange(Method::POST, &self.url, body.as_bytes(), response)
            .await
            .map_err(|e| match e {
                HttpError::Status(code) => GeolocationError::Status(code),
                _ => GeolocationError::Transport,
            })
    }
}

/// The remote key/value store, reached through its REST interface.
pub struct DatabaseStore {
    https: &'static SharedHttps,
    base: &'static str,
    secret: &'static str,
    url: String,
    body: String,
    response: String,
}

impl DatabaseStore {
    pub fn new(https: &'static SharedHttps, base: &'static str, secret: &'static str) -> Self {
        Self {
            https,
            base,
            secret,
            url: String::new(),
            body: String::new(),
            response: String::new(),
        }
    }

    async fn get(&mut self, path: &str) -> Result<&str, RemoteError> {
        value_url(self.base, path, Some(self.secret), &mut self.url);
        let mut https = self.https.lock().await;
        https
            .exchange(Method::GET, &self.url, &[], &mut self.response)
            .await
            .map_err(|e| {
                warn!("Database read of {} failed: {}", path, e);
                RemoteError::Unreachable
            })?;
        Ok(self.response.as_str())
    }

    async fn put<T>(&mut self, path: &str, value: &T) -> Result<(), RemoteError>
    where
        T: Serialize + ?Sized,
    {
        self.body = encode(value)?;
        value_url(self.base, path, Some(self.secret), &mut self.url);
        let mut https = self.https.lock().await;
        https
            .exchange(Method::PUT, &self.url, self.body.as_bytes(), &mut self.response)
            .await
            .map_err(|e| {
                warn!("Database write of {} failed: {}", path, e);
                RemoteError::Unreachable
            })
    }
}

impl RemoteStore for DatabaseStore {
    async fn get_int(&mut self, path: &str) -> Result<i32, RemoteError> {
        parse_int(self.get(path).await?)
    }

    async fn set_int(&mut self, path: &str, value: i32) -> Result<(), RemoteError> {
        self.put(path, &value).await
    }

    async fn get_float(&mut self, path: &str) -> Result<f32, RemoteError> {
        parse_float(self.get(path).await?)
    }

    async fn set_float(&mut self, path: &str, value: f32) -> Result<(), RemoteError> {
        // A NaN reading goes out as `null`.
        self.put(path, &value).await
    }

    async fn get_string(&mut self, path: &str) -> Result<String, RemoteError> {
        parse_string(self.get(path).await?)
    }

    async fn set_string(&mut self, path: &str, value: &str) -> Result<(), RemoteError> {
        self.put(path, value).await
    }
}
