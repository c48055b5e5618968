//! Scenario configuration.

use serde::{Deserialize, Serialize};
use solanoid_gravity::MAX_CONSULS;
use std::path::Path;
use std::time::Duration;

/// Why a scenario could not be set up or did not behave as expected.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid scenario: {0}")]
    Invalid(String),

    #[error(transparent)]
    Simulation(#[from] solanoid_simulation::SimError),

    #[error(transparent)]
    Executor(#[from] solanoid_executor::ExecutorError),

    /// The bridge accepted something it must refuse.
    #[error("Protocol violation: {0}")]
    Violation(String),
}

/// One simulated bridge run.
///
/// ```toml
/// seed = 42
/// consuls = 5
/// bft = 3
/// initial_round = 1
/// swaps = 10
/// min_amount = 0.5
/// max_amount = 250.0
/// decimals = 8
/// confirmation_latency_ms = 0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Seed for keys, swap ids and amounts.
    pub seed: u64,
    pub consuls: usize,
    pub bft: u8,
    pub initial_round: u64,
    /// Attestations delivered through the hub.
    pub swaps: usize,
    pub min_amount: f64,
    pub max_amount: f64,
    pub decimals: u8,
    pub confirmation_latency_ms: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            consuls: 5,
            bft: 3,
            initial_round: 1,
            swaps: 10,
            min_amount: 0.5,
            max_amount: 250.0,
            decimals: 8,
            confirmation_latency_ms: 0,
        }
    }
}

impl ScenarioConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ScenarioError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// The default scenario as TOML.
    pub fn example_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_consuls(mut self, consuls: usize) -> Self {
        self.consuls = consuls;
        self
    }

    pub fn with_bft(mut self, bft: u8) -> Self {
        self.bft = bft;
        self
    }

    pub fn with_swaps(mut self, swaps: usize) -> Self {
        self.swaps = swaps;
        self
    }

    pub fn with_confirmation_latency(mut self, latency: Duration) -> Self {
        self.confirmation_latency_ms = latency.as_millis() as u64;
        self
    }

    pub fn confirmation_latency(&self) -> Duration {
        Duration::from_millis(self.confirmation_latency_ms)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.consuls == 0 || self.consuls > MAX_CONSULS {
            return Err(ScenarioError::Invalid(format!(
                "consuls must be between 1 and {MAX_CONSULS}, got {}",
                self.consuls
            )));
        }
        if self.bft == 0 || self.bft as usize > self.consuls {
            return Err(ScenarioError::Invalid(format!(
                "bft must be between 1 and the consul count ({}), got {}",
                self.consuls, self.bft
            )));
        }
        if self.swaps == 0 {
            return Err(ScenarioError::Invalid("at least one swap is required".into()));
        }
        if !(self.min_amount.is_finite() && self.max_amount.is_finite())
            || self.min_amount <= 0.0
            || self.min_amount > self.max_amount
        {
            return Err(ScenarioError::Invalid(format!(
                "amount range {}..={} must be positive and ordered",
                self.min_amount, self.max_amount
            )));
        }
        if self.decimals > 18 {
            return Err(ScenarioError::Invalid(format!(
                "decimals must be at most 18, got {}",
                self.decimals
            )));
        }
        Ok(())
    }
}
