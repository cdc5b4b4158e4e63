//! The per-request mock-or-forward decision.

use std::time::Instant;

use super::client::{create_http_client, HttpClient};
use super::forwarding::{bad_gateway, forward_request, target_uri};
use super::request_log::{LogEntry, RequestLog};
use crate::config::Scenario;
use crate::recording::{Interaction, Recorder};
use crate::scenario::{serve_mock, ScenarioSnapshot, ScenarioStore};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::http::request;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use tracing::{debug, error, info, warn};

/// Owns all per-instance proxy state: the scenario store, the recorder, the
/// request log, and the shared upstream client.
///
/// A `None` scenario store is forwarding-only mode, a first-class
/// configuration rather than an implicit fallback. Recording and mocking are
/// mutually exclusive per request: only forwarded exchanges are recorded.
pub struct ProxyEngine {
    http_client: HttpClient,
    scenarios: Option<ScenarioStore>,
    recorder: Option<Recorder>,
    request_log: RequestLog,
}

impl ProxyEngine {
    pub fn new(
        scenarios: Option<Vec<Scenario>>,
        recorder: Option<Recorder>,
        log_capacity: usize,
    ) -> Self {
        Self {
            http_client: create_http_client(),
            scenarios: scenarios.map(ScenarioStore::new),
            recorder,
            request_log: RequestLog::new(log_capacity),
        }
    }

    pub fn scenario_count(&self) -> Option<usize> {
        self.scenarios.as_ref().map(ScenarioStore::len)
    }

    pub fn recording_path(&self) -> Option<&std::path::Path> {
        self.recorder.as_ref().map(Recorder::path)
    }

    /// Entry point for the server: buffer the inbound body, then decide.
    pub async fn handle(
        &self,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let received_at = Instant::now();
        let (parts, body) = req.into_parts();

        // The body is needed twice, once for recording and once for
        // transmission, so it is captured fully up front.
        let body_bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                error!("failed to read request body: {e}");
                let mut response = Response::new(Full::new(Bytes::from(
                    r#"{"error": "failed to read request body"}"#,
                )));
                *response.status_mut() = StatusCode::BAD_REQUEST;
                return Ok(response);
            }
        };

        Ok(self.handle_buffered(parts, body_bytes, received_at).await)
    }

    /// Decision core, driven directly by tests with pre-buffered bodies.
    pub async fn handle_buffered(
        &self,
        parts: request::Parts,
        body: Bytes,
        received_at: Instant,
    ) -> Response<Full<Bytes>> {
        let url = target_uri(&parts)
            .map(|uri| uri.to_string())
            .unwrap_or_else(|_| parts.uri.to_string());
        debug!("{} {}", parts.method, url);

        if let Some(store) = &self.scenarios {
            if let Some(scenario) =
                store.match_request(&parts.method, parts.uri.path(), &parts.headers)
            {
                return self.serve_scenario(&scenario, &parts, &url, received_at).await;
            }
        }

        self.forward(parts, body, url, received_at).await
    }

    async fn serve_scenario(
        &self,
        scenario: &Scenario,
        parts: &request::Parts,
        url: &str,
        received_at: Instant,
    ) -> Response<Full<Bytes>> {
        let response = serve_mock(scenario).await;
        let status = response.status().as_u16();
        let duration = received_at.elapsed();
        info!(
            scenario = %scenario.name,
            status,
            duration_ms = duration.as_millis() as u64,
            "answered from scenario"
        );
        self.request_log
            .push(&parts.method, url, status, duration, Some(&scenario.name));
        response
    }

    async fn forward(
        &self,
        parts: request::Parts,
        body: Bytes,
        url: String,
        received_at: Instant,
    ) -> Response<Full<Bytes>> {
        match forward_request(&self.http_client, &parts, body.clone()).await {
            Ok(forwarded) => {
                let duration = received_at.elapsed();
                let status = forwarded.parts.status.as_u16();
                debug!(
                    status,
                    duration_ms = duration.as_millis() as u64,
                    "relaying upstream response"
                );

                if let Some(recorder) = &self.recorder {
                    let interaction = Interaction::from_exchange(
                        &parts.method,
                        url.clone(),
                        &parts.headers,
                        &body,
                        status,
                        &forwarded.parts.headers,
                        &forwarded.body,
                        duration,
                    );
                    // The client response is already determined; persistence
                    // failure is operator-visible but never aborts serving.
                    if let Err(e) = recorder.record(interaction) {
                        warn!("failed to persist interaction: {e}");
                    }
                }

                self.request_log
                    .push(&parts.method, &url, status, duration, None);
                Response::from_parts(forwarded.parts, Full::new(forwarded.body))
            }
            Err(e) => {
                warn!("forwarding failed: {e}");
                let response = bad_gateway(&e);
                self.request_log.push(
                    &parts.method,
                    &url,
                    response.status().as_u16(),
                    received_at.elapsed(),
                    None,
                );
                response
            }
        }
    }

    // ===== Accessors for the control API =====

    /// Recent requests, most-recent-last.
    pub fn recent_requests(&self) -> Vec<LogEntry> {
        self.request_log.snapshot()
    }

    /// Scenario snapshot in load order; empty in forwarding-only mode.
    pub fn scenario_snapshot(&self) -> Vec<ScenarioSnapshot> {
        self.scenarios
            .as_ref()
            .map(ScenarioStore::snapshot)
            .unwrap_or_default()
    }

    /// Toggle a scenario by name. False if unknown or in forwarding-only mode.
    pub fn set_scenario_enabled(&self, name: &str, enabled: bool) -> bool {
        self.scenarios
            .as_ref()
            .map(|store| store.set_enabled(name, enabled))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MatchRule, MockResponse};
    use hyper::Method;
    use std::collections::HashMap;

    fn ping_scenario() -> Scenario {
        Scenario {
            name: "ping".to_string(),
            match_rule: MatchRule {
                method: Some("GET".to_string()),
                path: "/health".to_string(),
                headers: HashMap::new(),
            },
            response: MockResponse {
                status: 200,
                headers: HashMap::new(),
                body: "ok".to_string(),
                delay_ms: 0,
            },
        }
    }

    fn request_parts(method: Method, uri: &str) -> request::Parts {
        let (parts, ()) = Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[tokio::test]
    async fn test_mock_hit_no_upstream() {
        // The URI points at a port nothing listens on: a forwarded request
        // would come back 502, so a 200 proves the mock answered.
        let engine = ProxyEngine::new(Some(vec![ping_scenario()]), None, 10);
        let parts = request_parts(Method::GET, "http://127.0.0.1:1/health");

        let response = engine
            .handle_buffered(parts, Bytes::new(), Instant::now())
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let log = engine.recent_requests();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].matched.as_deref(), Some("ping"));
        assert_eq!(log[0].status, 200);
    }

    #[tokio::test]
    async fn test_method_mismatch_forwards() {
        let engine = ProxyEngine::new(Some(vec![ping_scenario()]), None, 10);
        let parts = request_parts(Method::DELETE, "http://127.0.0.1:1/health");

        let response = engine
            .handle_buffered(parts, Bytes::new(), Instant::now())
            .await;
        // Nothing listens there, so the forwarding attempt fails with 502 --
        // which proves the scenario did not intercept.
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(engine.recent_requests()[0].matched, None);
    }

    #[tokio::test]
    async fn test_forwarding_failure_is_bad_gateway_no_retry() {
        let engine = ProxyEngine::new(None, None, 10);
        let parts = request_parts(Method::GET, "http://127.0.0.1:1/whatever");

        let response = engine
            .handle_buffered(parts, Bytes::new(), Instant::now())
            .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        // Exactly one log entry: one attempt, no retries.
        assert_eq!(engine.recent_requests().len(), 1);
        assert_eq!(engine.recent_requests()[0].status, 502);
    }

    #[tokio::test]
    async fn test_forwarding_only_mode_accessors() {
        let engine = ProxyEngine::new(None, None, 10);
        assert_eq!(engine.scenario_count(), None);
        assert!(engine.scenario_snapshot().is_empty());
        assert!(!engine.set_scenario_enabled("ping", false));
    }

    #[tokio::test]
    async fn test_disabled_scenario_not_served() {
        let engine = ProxyEngine::new(Some(vec![ping_scenario()]), None, 10);
        assert!(engine.set_scenario_enabled("ping", false));

        let parts = request_parts(Method::GET, "http://127.0.0.1:1/health");
        let response = engine
            .handle_buffered(parts, Bytes::new(), Instant::now())
            .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
