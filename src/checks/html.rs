//! Sub-resource extraction from rendered pages.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::collections::BTreeSet;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(img|script|link|video|source)\b([^>]*)>").expect("valid tag regex")
});

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid attribute regex")
});

/// Every sub-resource URL referenced by `html`, resolved against `origin`,
/// deduplicated and sorted.
pub fn resource_urls(html: &str, origin: &str) -> BTreeSet<String> {
    let base = Url::parse(origin).ok();

    references(html)
        .into_iter()
        .filter_map(|reference| resolve(&reference, base.as_ref(), origin))
        .collect()
}

/// Raw `src`/`href`/`srcset`/`poster` values of resource-loading tags.
fn references(html: &str) -> Vec<String> {
    let mut found = Vec::new();

    for tag in TAG_RE.captures_iter(html) {
        let name = tag[1].to_ascii_lowercase();
        let attributes = attributes(&tag[2]);
        let attribute = |wanted: &str| {
            attributes
                .iter()
                .find(|(key, _)| key == wanted)
                .map(|(_, value)| value.clone())
        };

        if name == "link" {
            let is_stylesheet = attribute("rel").is_some_and(|rel| {
                rel.split_ascii_whitespace()
                    .any(|token| token.eq_ignore_ascii_case("stylesheet"))
            });
            if is_stylesheet {
                found.extend(attribute("href"));
            }
            continue;
        }

        found.extend(attribute("src"));
        if let Some(srcset) = attribute("srcset") {
            found.extend(srcset_urls(&srcset));
        }
        if name == "video" {
            found.extend(attribute("poster"));
        }
    }

    found
}

fn attributes(raw: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(raw)
        .map(|cap| {
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .or_else(|| cap.get(4))
                .map_or("", |m| m.as_str());
            (cap[1].to_ascii_lowercase(), unescape(value.trim()))
        })
        .collect()
}

fn unescape(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Resolve a reference found on a page served from `origin`.
///
/// `/x` is relative to the origin root, `//host/x` takes the origin scheme,
/// anything else without a scheme is appended to the origin root. `data:`
/// URIs and fragments are not resources.
fn resolve(reference: &str, base: Option<&Url>, origin: &str) -> Option<String> {
    if reference.is_empty() || reference.starts_with('#') || reference.starts_with("data:") {
        return None;
    }
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return Some(reference.to_string());
    }

    let (scheme, root) = match base {
        Some(url) => (url.scheme().to_string(), url.origin().ascii_serialization()),
        None => ("https".to_string(), origin.trim_end_matches('/').to_string()),
    };

    if let Some(rest) = reference.strip_prefix("//") {
        Some(format!("{scheme}://{rest}"))
    } else if reference.starts_with('/') {
        Some(format!("{root}{reference}"))
    } else {
        Some(format!("{root}/{reference}"))
    }
}

/// URLs of a `srcset` value. Commas may appear inside a URL; only a comma
/// ending the URL or following its descriptor separates candidates.
fn srcset_urls(srcset: &str) -> Vec<String> {
    let mut urls = Vec::new();
    let mut rest = srcset;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let url_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (url, after) = rest.split_at(url_end);
        rest = after;

        let trimmed = url.trim_end_matches(',');
        if !trimmed.is_empty() {
            urls.push(trimmed.to_string());
        }
        if trimmed.len() < url.len() {
            continue;
        }

        // Descriptor, up to the next comma outside parentheses
        let mut depth = 0usize;
        let mut descriptor_end = rest.len();
        for (i, c) in rest.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    descriptor_end = i;
                    break;
                }
                _ => {}
            }
        }
        rest = &rest[descriptor_end..];
    }

    urls
}
