//! S3-compatible client over the HTTP seam (path-style addressing).

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use super::listing::parse_list_objects;
use super::sigv4::{canonical_query, sha256_hex, sign, uri_encode, AwsCredentials, SigningRequest};
use super::{ObjectStore, ObjectSummary};
use crate::error::{truncate_detail, TransportError, MAX_DETAIL_LENGTH};
use crate::http::{HttpFetch, HttpRequest, Method};

pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Safety net against a backend that keeps returning continuation tokens
const MAX_LIST_PAGES: usize = 1000;

pub struct S3Client {
    http: Arc<dyn HttpFetch>,
    /// Scheme and authority, e.g. `https://s3.us-east-1.amazonaws.com`
    endpoint: String,
    region: String,
    credentials: AwsCredentials,
}

impl S3Client {
    pub fn new(
        http: Arc<dyn HttpFetch>,
        endpoint: impl Into<String>,
        region: impl Into<String>,
        credentials: AwsCredentials,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            region: region.into(),
            credentials,
        }
    }

    /// Client for AWS itself in `region`.
    pub fn aws(http: Arc<dyn HttpFetch>, region: &str, credentials: AwsCredentials) -> Self {
        Self::new(
            http,
            format!("https://s3.{region}.amazonaws.com"),
            region,
            credentials,
        )
    }

    fn host(&self) -> &str {
        self.endpoint
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.endpoint)
    }

    fn signed_request(
        &self,
        method: Method,
        path: &str,
        query: &str,
        body: Option<Vec<u8>>,
    ) -> HttpRequest {
        let payload_hash = sha256_hex(body.as_deref().unwrap_or_default());
        let headers = sign(
            &self.credentials,
            &SigningRequest {
                method: method.as_str(),
                host: self.host(),
                path,
                query,
                payload_hash: &payload_hash,
                region: &self.region,
                time: Utc::now(),
            },
        );

        let url = if query.is_empty() {
            format!("{}{path}", self.endpoint)
        } else {
            format!("{}{path}?{query}", self.endpoint)
        };

        let mut request = HttpRequest::new(method, url);
        request.headers = headers;
        request.body = body;
        request
    }
}

impl ObjectStore for S3Client {
    fn list(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectSummary>, TransportError> {
        let path = format!("/{}", uri_encode(bucket, false));
        let mut objects = Vec::new();
        let mut token: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let mut params = vec![("list-type", "2")];
            if let Some(prefix) = prefix {
                params.push(("prefix", prefix));
            }
            if let Some(token) = token.as_deref() {
                params.push(("continuation-token", token));
            }
            let query = canonical_query(&params);

            let response = self
                .http
                .send(self.signed_request(Method::Get, &path, &query, None))?;
            if !response.is_ok() {
                return Err(TransportError::Status {
                    code: response.status,
                    body: truncate_detail(&response.body, MAX_DETAIL_LENGTH),
                });
            }

            let page = parse_list_objects(&response.body)?;
            debug!(bucket, count = page.contents.len(), "Listed bucket page");
            objects.extend(page.contents);

            match page.next_continuation_token {
                Some(next) => token = Some(next),
                None => return Ok(objects),
            }
        }

        Err(TransportError::Body(format!(
            "Listing of bucket {bucket} did not finish after {MAX_LIST_PAGES} pages"
        )))
    }

    fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), TransportError> {
        let path = format!("/{}/{}", uri_encode(bucket, false), uri_encode(key, true));
        let response = self
            .http
            .send(self.signed_request(Method::Put, &path, "", Some(body)))?;

        if response.is_ok() {
            Ok(())
        } else {
            Err(TransportError::Status {
                code: response.status,
                body: truncate_detail(&response.body, MAX_DETAIL_LENGTH),
            })
        }
    }
}
