//! Object storage seam.
//!
//! Bucket checks only need to enumerate keys with their modification time;
//! the input side needs to upload one package. [`S3Client`] implements both
//! against any S3-compatible endpoint.

mod listing;
mod s3;
mod sigv4;

use chrono::{DateTime, Utc};

use crate::error::TransportError;

pub use s3::{S3Client, DEFAULT_S3_REGION};
pub use sigv4::AwsCredentials;

/// One object in a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

impl ObjectSummary {
    pub fn new(key: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            last_modified,
        }
    }
}

pub trait ObjectStore: Send + Sync {
    /// List every object in `bucket`, narrowed to keys starting with `prefix`.
    /// Objects come back in key order.
    fn list(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectSummary>, TransportError>;

    fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), TransportError>;
}
