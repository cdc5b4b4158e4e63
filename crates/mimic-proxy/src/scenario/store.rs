//! Ordered scenario store with runtime enable/disable flags.

use crate::config::Scenario;
use globset::{Glob, GlobMatcher};
use hyper::{HeaderMap, Method};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

/// Path patterns are compiled once at load time. A pattern that fails to
/// compile as a glob degrades to exact string comparison; matching never
/// fails at request time.
enum PathPattern {
    Any,
    Exact(String),
    Glob { raw: String, matcher: GlobMatcher },
}

impl PathPattern {
    fn compile(pattern: &str) -> Self {
        if pattern.is_empty() {
            return PathPattern::Any;
        }
        match Glob::new(pattern) {
            // globset defaults: `*` crosses `/` boundaries, so `/api/*`
            // matches `/api/orders/5`.
            Ok(glob) => PathPattern::Glob {
                raw: pattern.to_string(),
                matcher: glob.compile_matcher(),
            },
            Err(e) => {
                warn!(
                    pattern,
                    "path pattern is not a valid glob, falling back to exact match: {e}"
                );
                PathPattern::Exact(pattern.to_string())
            }
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Any => true,
            PathPattern::Exact(exact) => exact == path,
            // A glob that happens to equal the path literally still matches,
            // even when the glob engine reads its metacharacters differently.
            PathPattern::Glob { raw, matcher } => matcher.is_match(path) || raw == path,
        }
    }
}

struct CompiledScenario {
    scenario: Scenario,
    path: PathPattern,
}

impl CompiledScenario {
    fn compile(scenario: Scenario) -> Self {
        let path = PathPattern::compile(&scenario.match_rule.path);
        Self { scenario, path }
    }

    fn matches(&self, method: &Method, path: &str, headers: &HeaderMap) -> bool {
        // Method: absent or empty matches any, otherwise exact.
        if let Some(want) = &self.scenario.match_rule.method {
            if !want.is_empty() && want != method.as_str() {
                return false;
            }
        }

        if !self.path.matches(path) {
            return false;
        }

        // All required headers must be present and exactly equal.
        // HeaderMap lookups are case-insensitive on the name.
        for (name, want) in &self.scenario.match_rule.headers {
            let value = match headers.get(name.as_str()).and_then(|v| v.to_str().ok()) {
                Some(v) => v,
                None => return false,
            };
            if value != want {
                return false;
            }
        }

        true
    }
}

/// A scenario paired with its runtime enabled state, as reported to the
/// control API.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSnapshot {
    #[serde(flatten)]
    pub scenario: Scenario,
    pub enabled: bool,
}

/// Ordered scenario store.
///
/// The scenario list is fixed at construction; only the enabled flags are
/// mutable at runtime. Matching takes a read lock, toggling a write lock.
pub struct ScenarioStore {
    scenarios: Vec<CompiledScenario>,
    enabled: RwLock<Vec<bool>>,
}

impl ScenarioStore {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        let enabled = RwLock::new(vec![true; scenarios.len()]);
        let scenarios = scenarios.into_iter().map(CompiledScenario::compile).collect();
        Self { scenarios, enabled }
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Find the first enabled scenario matching the request, in load order.
    /// Later ambiguity is resolved by position alone.
    pub fn match_request(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
    ) -> Option<Scenario> {
        let enabled = self.enabled.read();
        for (idx, compiled) in self.scenarios.iter().enumerate() {
            if !enabled[idx] {
                continue;
            }
            if compiled.matches(method, path, headers) {
                debug!(scenario = %compiled.scenario.name, "request matched scenario");
                return Some(compiled.scenario.clone());
            }
        }
        None
    }

    /// Toggle a scenario by name. Returns false if the name is unknown.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        let idx = match self.scenarios.iter().position(|c| c.scenario.name == name) {
            Some(idx) => idx,
            None => return false,
        };
        self.enabled.write()[idx] = enabled;
        true
    }

    /// Snapshot of all scenarios with their enabled state, in load order.
    /// Safe to call while matching proceeds concurrently.
    pub fn snapshot(&self) -> Vec<ScenarioSnapshot> {
        let enabled = self.enabled.read();
        self.scenarios
            .iter()
            .zip(enabled.iter())
            .map(|(compiled, &enabled)| ScenarioSnapshot {
                scenario: compiled.scenario.clone(),
                enabled,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MatchRule, Scenario};
    use std::collections::HashMap;

    fn scenario(name: &str, method: Option<&str>, path: &str) -> Scenario {
        let mut s = Scenario::named(name);
        s.match_rule = MatchRule {
            method: method.map(|m| m.to_string()),
            path: path.to_string(),
            headers: HashMap::new(),
        };
        s
    }

    #[test]
    fn test_exact_path_and_method() {
        let store = ScenarioStore::new(vec![scenario("ping", Some("GET"), "/health")]);
        let headers = HeaderMap::new();

        assert!(store
            .match_request(&Method::GET, "/health", &headers)
            .is_some());
        assert!(store
            .match_request(&Method::DELETE, "/health", &headers)
            .is_none());
        assert!(store
            .match_request(&Method::GET, "/healthz", &headers)
            .is_none());
    }

    #[test]
    fn test_absent_method_matches_any() {
        let store = ScenarioStore::new(vec![scenario("any", None, "/health")]);
        let headers = HeaderMap::new();

        for method in [Method::GET, Method::POST, Method::PUT, Method::DELETE] {
            assert!(store.match_request(&method, "/health", &headers).is_some());
        }
    }

    #[test]
    fn test_glob_crosses_path_boundaries() {
        let store = ScenarioStore::new(vec![scenario("api", None, "/api/*")]);
        let headers = HeaderMap::new();

        assert!(store
            .match_request(&Method::GET, "/api/users", &headers)
            .is_some());
        assert!(store
            .match_request(&Method::GET, "/api/orders/5", &headers)
            .is_some());
        assert!(store
            .match_request(&Method::GET, "/other", &headers)
            .is_none());
    }

    #[test]
    fn test_glob_question_mark_and_classes() {
        let store = ScenarioStore::new(vec![
            scenario("one-char", None, "/v?"),
            scenario("class", None, "/item/[0-9]"),
        ]);
        let headers = HeaderMap::new();

        assert_eq!(
            store
                .match_request(&Method::GET, "/v1", &headers)
                .map(|s| s.name),
            Some("one-char".to_string())
        );
        assert_eq!(
            store
                .match_request(&Method::GET, "/item/7", &headers)
                .map(|s| s.name),
            Some("class".to_string())
        );
        assert!(store
            .match_request(&Method::GET, "/item/x", &headers)
            .is_none());
    }

    #[test]
    fn test_malformed_glob_degrades_to_exact() {
        // An unclosed character class is not a valid glob. The literal path
        // must still be matchable by exact comparison.
        let store = ScenarioStore::new(vec![scenario("odd", None, "/files/[unclosed")]);
        let headers = HeaderMap::new();

        assert!(store
            .match_request(&Method::GET, "/files/[unclosed", &headers)
            .is_some());
        assert!(store
            .match_request(&Method::GET, "/files/other", &headers)
            .is_none());
    }

    #[test]
    fn test_header_matching() {
        let mut s = scenario("env-gated", None, "/data");
        s.match_rule.headers.insert("X-Env".to_string(), "staging".to_string());
        let store = ScenarioStore::new(vec![s]);

        // Header names are case-insensitive, values case-sensitive.
        let mut headers = HeaderMap::new();
        headers.insert("x-env", "staging".parse().unwrap());
        assert!(store.match_request(&Method::GET, "/data", &headers).is_some());

        let mut wrong_value = HeaderMap::new();
        wrong_value.insert("x-env", "Staging".parse().unwrap());
        assert!(store
            .match_request(&Method::GET, "/data", &wrong_value)
            .is_none());

        assert!(store
            .match_request(&Method::GET, "/data", &HeaderMap::new())
            .is_none());
    }

    #[test]
    fn test_extra_request_headers_ignored() {
        let mut s = scenario("one-header", None, "/data");
        s.match_rule.headers.insert("X-Env".to_string(), "test".to_string());
        let store = ScenarioStore::new(vec![s]);

        let mut headers = HeaderMap::new();
        headers.insert("x-env", "test".parse().unwrap());
        headers.insert("accept", "application/json".parse().unwrap());
        headers.insert("user-agent", "curl/8".parse().unwrap());
        assert!(store.match_request(&Method::GET, "/data", &headers).is_some());
    }

    #[test]
    fn test_first_enabled_match_wins() {
        let store = ScenarioStore::new(vec![
            scenario("broad", None, "/api/*"),
            scenario("narrow", None, "/api/users"),
        ]);
        let headers = HeaderMap::new();

        // Position decides, not specificity.
        let matched = store.match_request(&Method::GET, "/api/users", &headers);
        assert_eq!(matched.map(|s| s.name), Some("broad".to_string()));

        assert!(store.set_enabled("broad", false));
        let matched = store.match_request(&Method::GET, "/api/users", &headers);
        assert_eq!(matched.map(|s| s.name), Some("narrow".to_string()));
    }

    #[test]
    fn test_disabled_scenario_skipped_but_listed() {
        let store = ScenarioStore::new(vec![scenario("ping", Some("GET"), "/health")]);
        let headers = HeaderMap::new();

        assert!(store.set_enabled("ping", false));
        assert!(store
            .match_request(&Method::GET, "/health", &headers)
            .is_none());

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].scenario.name, "ping");
        assert!(!snapshot[0].enabled);

        // Re-enabling restores match consideration.
        assert!(store.set_enabled("ping", true));
        assert!(store
            .match_request(&Method::GET, "/health", &headers)
            .is_some());
    }

    #[test]
    fn test_set_enabled_unknown_name() {
        let store = ScenarioStore::new(vec![scenario("ping", None, "/health")]);
        assert!(!store.set_enabled("missing", false));
    }

    #[test]
    fn test_empty_path_matches_any() {
        let store = ScenarioStore::new(vec![scenario("all", Some("POST"), "")]);
        let headers = HeaderMap::new();

        assert!(store.match_request(&Method::POST, "/anything", &headers).is_some());
        assert!(store.match_request(&Method::GET, "/anything", &headers).is_none());
    }

    #[test]
    fn test_snapshot_preserves_order() {
        let store = ScenarioStore::new(vec![
            scenario("a", None, "/a"),
            scenario("b", None, "/b"),
            scenario("c", None, "/c"),
        ]);
        let names: Vec<_> = store
            .snapshot()
            .into_iter()
            .map(|s| s.scenario.name)
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }
}
