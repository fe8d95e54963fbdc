//! Blocking reqwest transport with timeouts and size-limited reads.

use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use std::error::Error as StdError;
use std::io::Read;
use std::time::Duration;

use super::{HttpFetch, HttpRequest, HttpResponse, Method};
use crate::error::TransportError;

pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 60; // connection + transfer

/// Largest response body read into memory (rendered pages, listings)
pub const MAX_RESPONSE_SIZE: u64 = 20 * 1024 * 1024;

/// Create an HTTP client with connect and total request timeouts.
pub fn create_http_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
        .user_agent(concat!("spectrum/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")
}

/// [`HttpFetch`] backed by a blocking reqwest client.
pub struct ReqwestFetcher {
    client: Client,
    max_response_size: u64,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self::from_client(create_http_client()?))
    }

    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            max_response_size: MAX_RESPONSE_SIZE,
        }
    }
}

impl HttpFetch for ReqwestFetcher {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some((user, password)) = &request.basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();

        let body = if request.method == Method::Head {
            String::new()
        } else {
            read_body_with_limit(response, self.max_response_size)?
        };

        Ok(HttpResponse::new(status, body))
    }
}

/// Read a response body, enforcing `max_size` from Content-Length and while
/// streaming.
fn read_body_with_limit(response: Response, max_size: u64) -> Result<String, TransportError> {
    if let Some(content_length) = response.content_length() {
        if content_length > max_size {
            return Err(TransportError::ResponseTooLarge { limit: max_size });
        }
    }

    let mut bytes = Vec::new();
    let mut reader = response;
    let mut total_read: u64 = 0;
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader
            .read(&mut buffer)
            .map_err(|e| TransportError::Body(e.to_string()))?;
        if n == 0 {
            break;
        }
        total_read += n as u64;
        if total_read > max_size {
            return Err(TransportError::ResponseTooLarge { limit: max_size });
        }
        bytes.extend_from_slice(&buffer[..n]);
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    let message = error_chain(&err);

    if err.is_builder() {
        TransportError::InvalidRequest(message)
    } else if err.is_timeout() {
        TransportError::Timeout(message)
    } else if looks_like_tls(&message) {
        TransportError::Tls(message)
    } else if err.is_body() || err.is_decode() {
        TransportError::Body(message)
    } else {
        TransportError::Connection(message)
    }
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn looks_like_tls(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["tls", "ssl", "certificate", "handshake"]
        .iter()
        .any(|needle| lower.contains(needle))
}
