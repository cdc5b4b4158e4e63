//! Request forwarding to the real upstream.
//!
//! Forwarding is attempt-once: transport failures are terminal for the
//! request and surface to the client as 502 Bad Gateway. Responses are
//! buffered in full so duration and body can be logged and recorded after
//! the fact.

use super::client::HttpClient;
use super::headers::strip_hop_headers;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::HOST;
use hyper::http::request;
use hyper::{Request, Response, Uri};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("request has no resolvable target host")]
    MissingHost,
    #[error("invalid upstream uri: {0}")]
    InvalidUri(#[from] hyper::http::uri::InvalidUri),
    #[error("failed to build upstream request: {0}")]
    BuildRequest(#[from] hyper::http::Error),
    #[error("upstream request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
    #[error("failed to read upstream response body: {0}")]
    Body(#[from] hyper::Error),
}

/// Upstream response with hop-by-hop headers already stripped and the body
/// fully buffered.
pub struct ForwardedResponse {
    pub parts: hyper::http::response::Parts,
    pub body: Bytes,
}

/// Resolve the outbound target for an inbound request.
///
/// Proxy-style absolute-form URIs are used as-is. Origin-form URIs are
/// resolved against the Host header with the http scheme, so the target (and
/// any recorded URL) is always a full URL.
pub fn target_uri(parts: &request::Parts) -> Result<Uri, ForwardError> {
    if parts.uri.scheme().is_some() && parts.uri.authority().is_some() {
        return Ok(parts.uri.clone());
    }

    let host = parts
        .headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .ok_or(ForwardError::MissingHost)?;
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    Ok(format!("http://{host}{path_and_query}").parse()?)
}

/// Forward a request with a pre-collected body, exactly once.
pub async fn forward_request(
    client: &HttpClient,
    parts: &request::Parts,
    body: Bytes,
) -> Result<ForwardedResponse, ForwardError> {
    let uri = target_uri(parts)?;
    debug!("forwarding to {uri}");

    // Hop-by-hop headers stay on this hop; the client derives Host from the
    // target URI.
    let mut outbound_headers = parts.headers.clone();
    strip_hop_headers(&mut outbound_headers);
    outbound_headers.remove(HOST);

    let mut outbound = Request::builder()
        .method(parts.method.clone())
        .uri(uri)
        .body(Full::new(body))?;
    *outbound.headers_mut() = outbound_headers;

    let response = client.request(outbound).await?;
    let (mut response_parts, body) = response.into_parts();
    let body = body.collect().await?.to_bytes();
    strip_hop_headers(&mut response_parts.headers);

    Ok(ForwardedResponse {
        parts: response_parts,
        body,
    })
}

/// 502 response for a failed forwarding attempt.
pub fn bad_gateway(err: &ForwardError) -> Response<Full<Bytes>> {
    let body = format!(r#"{{"error": "error forwarding request: {err}"}}"#);
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = hyper::StatusCode::BAD_GATEWAY;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}
