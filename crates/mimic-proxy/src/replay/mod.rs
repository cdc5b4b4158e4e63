//! Replay engine: re-issue recorded interactions against a live target.
//!
//! Replay is a traffic-generation tool, not an assertion tool: each item
//! reports the status it got (or the error it hit) without comparing against
//! the originally recorded status. Items run strictly in recorded order,
//! sequentially, to preserve ordering dependencies in the original traffic.

use std::path::Path;

use crate::recording::Interaction;
use anyhow::Context;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ReplayItemError {
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid method `{0}`")]
    InvalidMethod(String),
    #[error("failed to build request: {0}")]
    BuildRequest(String),
    #[error("request failed: {0}")]
    Transport(String),
}

/// Outcome of one replayed interaction.
#[derive(Debug)]
pub struct ReplayOutcome {
    pub index: usize,
    pub method: String,
    pub url: String,
    pub result: Result<u16, ReplayItemError>,
}

/// Load a persisted interaction sequence.
pub fn load_interactions(path: &Path) -> Result<Vec<Interaction>, anyhow::Error> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let interactions: Vec<Interaction> = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(interactions)
}

pub struct ReplayEngine {
    client: reqwest::Client,
    /// Base to re-issue against instead of the recorded host.
    target: Option<reqwest::Url>,
}

impl ReplayEngine {
    pub fn new(target: Option<&str>) -> Result<Self, anyhow::Error> {
        let target = target
            .map(|t| reqwest::Url::parse(t).with_context(|| format!("invalid target url: {t}")))
            .transpose()?;
        Ok(Self {
            client: reqwest::Client::new(),
            target,
        })
    }

    /// Replay all interactions in order. A bad item is reported and skipped;
    /// it never aborts the run.
    pub async fn replay(&self, interactions: &[Interaction]) -> Vec<ReplayOutcome> {
        let mut outcomes = Vec::with_capacity(interactions.len());
        for (index, interaction) in interactions.iter().enumerate() {
            let result = self.replay_item(interaction).await;
            match &result {
                Ok(status) => debug!(
                    index,
                    status,
                    url = %interaction.request.url,
                    "replayed interaction"
                ),
                Err(e) => warn!(index, url = %interaction.request.url, "replay item failed: {e}"),
            }
            outcomes.push(ReplayOutcome {
                index,
                method: interaction.request.method.clone(),
                url: interaction.request.url.clone(),
                result,
            });
        }
        outcomes
    }

    async fn replay_item(&self, interaction: &Interaction) -> Result<u16, ReplayItemError> {
        let request = self.build_request(interaction)?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| ReplayItemError::Transport(e.to_string()))?;
        Ok(response.status().as_u16())
    }

    /// Reconstruct the outbound request from a recorded interaction. Method,
    /// URL, headers, and body round-trip without loss.
    fn build_request(&self, interaction: &Interaction) -> Result<reqwest::Request, ReplayItemError> {
        let recorded = &interaction.request;

        let mut url =
            reqwest::Url::parse(&recorded.url).map_err(|e| ReplayItemError::InvalidUrl {
                url: recorded.url.clone(),
                reason: e.to_string(),
            })?;
        if let Some(base) = &self.target {
            // Keep the recorded path and query, swap scheme/host/port.
            let mut rebased = base.clone();
            rebased.set_path(url.path());
            rebased.set_query(url.query());
            url = rebased;
        }

        let method = reqwest::Method::from_bytes(recorded.method.as_bytes())
            .map_err(|_| ReplayItemError::InvalidMethod(recorded.method.clone()))?;

        let mut builder = self.client.request(method, url);
        for (name, values) in &recorded.headers {
            for value in values {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        builder
            .body(recorded.body.clone())
            .build()
            .map_err(|e| ReplayItemError::BuildRequest(e.to_string()))
    }
}
