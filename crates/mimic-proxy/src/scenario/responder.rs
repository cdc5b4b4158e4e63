//! Renders a matched scenario's configured response.

use std::time::Duration;

use crate::config::Scenario;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{Response, StatusCode};
use tracing::{debug, warn};

/// Build the mock response for a matched scenario.
///
/// Applies the configured delay before producing any output. The delay is a
/// deliberate latency-injection feature, observable by the client.
pub async fn serve_mock(scenario: &Scenario) -> Response<Full<Bytes>> {
    let delay_ms = scenario.response.delay_ms;
    if delay_ms > 0 {
        debug!(scenario = %scenario.name, delay_ms, "applying scenario delay");
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    let mut response = Response::new(Full::new(Bytes::from(scenario.response.body.clone())));

    *response.status_mut() = StatusCode::from_u16(scenario.response.effective_status())
        .unwrap_or(StatusCode::OK);

    for (name, value) in &scenario.response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => warn!(
                scenario = %scenario.name,
                header = %name,
                "skipping invalid mock response header"
            ),
        }
    }

    response
}
