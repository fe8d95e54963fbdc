//! HTTP seam used by every backend check.
//!
//! Checks only ever see [`HttpFetch`]; production wiring uses
//! [`ReqwestFetcher`], tests use [`crate::fakes::ScriptedHttp`].

mod client;

use serde_json::Value;
use std::fmt;

use crate::error::TransportError;

pub use client::{
    create_http_client, ReqwestFetcher, HTTP_CONNECT_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS,
    MAX_RESPONSE_SIZE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub basic_auth: Option<(String, String)>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            basic_auth: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::Head, url)
    }

    pub fn post_json(url: impl Into<String>, body: &Value) -> Self {
        Self::new(Method::Post, url)
            .header("Content-Type", "application/json")
            .body(body.to_string().into_bytes())
    }

    pub fn put(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self::new(Method::Put, url).body(body)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach credentials when some are configured.
    pub fn basic_auth(mut self, credentials: Option<&BasicAuth>) -> Self {
        self.basic_auth = credentials.map(|c| (c.user.clone(), c.password.clone()));
        self
    }
}

/// Username and password for backends behind HTTP basic auth.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Blocking HTTP transport.
pub trait HttpFetch: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.send(HttpRequest::get(url))
    }

    fn head(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.send(HttpRequest::head(url))
    }
}
