//! Control API: JSON endpoints for the reporting layer.
//!
//! Served on the proxy's own listener under `/__mimic/`, so a dashboard or a
//! curl one-liner can inspect recent traffic and toggle scenarios without a
//! second port:
//!
//! - `GET  /__mimic/api/requests`                 recent request log
//! - `GET  /__mimic/api/scenarios`                scenarios with enabled state
//! - `POST /__mimic/api/scenarios/{name}/toggle`  body `{"enabled": bool}`

use crate::proxy::ProxyEngine;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONTROL_PREFIX: &str = "/__mimic/";

#[derive(Debug, Deserialize)]
struct ToggleRequest {
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct ToggleResponse<'a> {
    name: &'a str,
    enabled: bool,
}

/// Error response structure
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Main control API router.
pub async fn route_request(req: Request<Incoming>, engine: &ProxyEngine) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!("control API: {method} {path}");

    // The only POST route carries a body; collect it up front so dispatch
    // stays synchronous and directly testable.
    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "failed to read request body"),
    };

    dispatch(&method, &path, &body, engine)
}

fn dispatch(method: &Method, path: &str, body: &[u8], engine: &ProxyEngine) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/__mimic/api/requests") => {
            json_response(StatusCode::OK, &engine.recent_requests())
        }
        (&Method::GET, "/__mimic/api/scenarios") => {
            json_response(StatusCode::OK, &engine.scenario_snapshot())
        }
        _ => {
            if let Some(name) = toggle_target(method, path) {
                return handle_toggle(name, body, engine);
            }
            not_found()
        }
    }
}

/// Parse `POST /__mimic/api/scenarios/{name}/toggle` into the scenario name.
fn toggle_target<'a>(method: &Method, path: &'a str) -> Option<&'a str> {
    if method != Method::POST {
        return None;
    }
    let rest = path.strip_prefix("/__mimic/api/scenarios/")?;
    let name = rest.strip_suffix("/toggle")?;
    if name.is_empty() || name.contains('/') {
        return None;
    }
    Some(name)
}

fn handle_toggle(name: &str, body: &[u8], engine: &ProxyEngine) -> Response<Full<Bytes>> {
    let toggle: ToggleRequest = match serde_json::from_slice(body) {
        Ok(toggle) => toggle,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &format!("invalid body: {e}")),
    };

    if !engine.set_scenario_enabled(name, toggle.enabled) {
        return error_response(StatusCode::NOT_FOUND, "scenario not found");
    }

    json_response(
        StatusCode::OK,
        &ToggleResponse {
            name,
            enabled: toggle.enabled,
        },
    )
}

// =============================================================================
// Response helper functions
// =============================================================================

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|_| "{}".to_string());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &ErrorResponse {
            error: message.to_string(),
        },
    )
}

fn not_found() -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "not found")
}
