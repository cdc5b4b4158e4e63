//! Configuration types for the Mimic proxy.

mod scenario;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use scenario::{MatchRule, MockResponse, Scenario};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Scenarios in file order. Order is significant: matching always
    /// evaluates in this order and the first enabled match wins.
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration. Scenario names are the toggle handle, so they
    /// must be unique; response status codes must be real HTTP codes.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            if scenario.name.is_empty() {
                anyhow::bail!("scenario with empty name (every scenario needs a unique 'name')");
            }
            if !seen.insert(scenario.name.as_str()) {
                anyhow::bail!("duplicate scenario name: '{}'", scenario.name);
            }
            let status = scenario.response.status;
            if status != 0 && !(100..=599).contains(&status) {
                anyhow::bail!(
                    "scenario '{}' has invalid response status {}",
                    scenario.name,
                    status
                );
            }
        }
        Ok(())
    }
}
