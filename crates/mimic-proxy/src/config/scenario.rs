//! Scenario definitions: a request-matching rule paired with a canned response.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A named mock scenario.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    /// Unique handle, stable across reloads. Used for runtime toggling.
    pub name: String,
    #[serde(rename = "match", default)]
    pub match_rule: MatchRule,
    #[serde(default)]
    pub response: MockResponse,
}

impl Scenario {
    /// Scenario with the given name and empty rule/response, for tests and
    /// programmatic construction.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            match_rule: MatchRule::default(),
            response: MockResponse::default(),
        }
    }
}

/// Criteria a request must satisfy for the scenario to apply.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MatchRule {
    /// Exact, case-sensitive method. Absent or empty matches any method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Exact path or shell-style glob (`*`, `?`, character classes).
    /// Empty matches any path.
    #[serde(default)]
    pub path: String,

    /// Required headers. All must be present with exactly equal values
    /// (names compared case-insensitively, values case-sensitively).
    /// Extra headers on the request are ignored.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

/// The response rendered when a scenario matches.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MockResponse {
    /// Status code; 0 (unset) is rendered as 200.
    #[serde(default)]
    pub status: u16,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// Body written verbatim, no template evaluation.
    #[serde(default)]
    pub body: String,

    /// Artificial latency applied before any output is produced.
    #[serde(default)]
    pub delay_ms: u64,
}

impl MockResponse {
    pub fn effective_status(&self) -> u16 {
        if self.status == 0 {
            200
        } else {
            self.status
        }
    }
}
