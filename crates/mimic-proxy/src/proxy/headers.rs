//! Hop-by-hop header stripping.
//!
//! Hop-by-hop headers are meaningful only to the immediate connection and
//! must not be relayed across a proxy hop, in either direction.

use hyper::header::{HeaderMap, HeaderName};

pub static HOP_BY_HOP_HEADERS: [HeaderName; 8] = [
    HeaderName::from_static("connection"),
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-authenticate"),
    HeaderName::from_static("proxy-authorization"),
    HeaderName::from_static("te"),
    HeaderName::from_static("trailers"),
    HeaderName::from_static("transfer-encoding"),
    HeaderName::from_static("upgrade"),
];

/// Remove all hop-by-hop headers in place.
pub fn strip_hop_headers(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}
