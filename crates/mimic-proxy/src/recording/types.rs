//! The persisted interaction format.
//!
//! This is the sole file-format contract the replay engine depends on: an
//! interaction written here must reconstruct into an equivalent outbound
//! request with no loss for method, URL, headers, or body.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hyper::HeaderMap;
use serde::{Deserialize, Serialize};

/// Header name -> values, in a stable (sorted) key order so the persisted
/// file is deterministic. Values for one name keep their wire order.
pub type HeaderMultimap = BTreeMap<String, Vec<String>>;

/// One captured request/response exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub timestamp: DateTime<Utc>,
    pub request: RequestDetail,
    pub response: ResponseDetail,
    /// Human-readable elapsed time, e.g. "12.345678ms".
    pub duration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDetail {
    pub method: String,
    /// Full URL including scheme, host, path, and query.
    pub url: String,
    pub headers: HeaderMultimap,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseDetail {
    pub status: u16,
    pub headers: HeaderMultimap,
    pub body: String,
}

impl Interaction {
    #[allow(clippy::too_many_arguments)]
    pub fn from_exchange(
        method: &hyper::Method,
        url: String,
        request_headers: &HeaderMap,
        request_body: &[u8],
        status: u16,
        response_headers: &HeaderMap,
        response_body: &[u8],
        duration: Duration,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            request: RequestDetail {
                method: method.to_string(),
                url,
                headers: header_multimap(request_headers),
                body: String::from_utf8_lossy(request_body).into_owned(),
            },
            response: ResponseDetail {
                status,
                headers: header_multimap(response_headers),
                body: String::from_utf8_lossy(response_body).into_owned(),
            },
            duration: format!("{duration:?}"),
        }
    }
}

/// Collect a `HeaderMap` into the persisted multimap form.
pub fn header_multimap(headers: &HeaderMap) -> HeaderMultimap {
    let mut map = HeaderMultimap::new();
    for (name, value) in headers.iter() {
        map.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    map
}
