//! Reader for S3 `ListBucketResult` documents.
//!
//! Only the handful of elements the bucket checks need are extracted.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::ObjectSummary;
use crate::error::TransportError;

static CONTENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<Contents>(.*?)</Contents>").expect("Invalid regex pattern"));
static KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<Key>(.*?)</Key>").expect("Invalid regex pattern"));
static LAST_MODIFIED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<LastModified>(.*?)</LastModified>").expect("Invalid regex pattern")
});
static IS_TRUNCATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<IsTruncated>\s*true\s*</IsTruncated>").expect("Invalid regex pattern")
});
static NEXT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<NextContinuationToken>(.*?)</NextContinuationToken>")
        .expect("Invalid regex pattern")
});

#[derive(Debug, Default)]
pub(crate) struct ListPage {
    pub contents: Vec<ObjectSummary>,
    /// Token for the next page, only set when the listing was truncated
    pub next_continuation_token: Option<String>,
}

pub(crate) fn parse_list_objects(xml: &str) -> Result<ListPage, TransportError> {
    if !xml.contains("<ListBucketResult") {
        return Err(TransportError::Body(
            "Response is not a ListBucketResult document".to_string(),
        ));
    }

    let mut page = ListPage::default();

    for entry in CONTENTS.captures_iter(xml) {
        let entry = &entry[1];
        let key = KEY
            .captures(entry)
            .map(|c| xml_unescape(&c[1]))
            .ok_or_else(|| TransportError::Body("Listing entry without <Key>".to_string()))?;
        let last_modified = LAST_MODIFIED
            .captures(entry)
            .ok_or_else(|| TransportError::Body(format!("No <LastModified> for key {key}")))
            .and_then(|c| parse_timestamp(&c[1]))?;

        page.contents.push(ObjectSummary { key, last_modified });
    }

    if IS_TRUNCATED.is_match(xml) {
        page.next_continuation_token = NEXT_TOKEN.captures(xml).map(|c| xml_unescape(&c[1]));
    }

    Ok(page)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TransportError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| TransportError::Body(format!("Invalid LastModified '{raw}': {e}")))
}

fn xml_unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
