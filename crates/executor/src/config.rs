//! Executor and client configuration.

use serde::{Deserialize, Serialize};
use solanoid_types::{KeypairError, ParseError, Pubkey};
use std::path::Path;
use std::time::Duration;

/// Configuration errors. Raised before anything touches the network.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {field} address: {source}")]
    InvalidAddress {
        field: &'static str,
        #[source]
        source: ParseError,
    },

    #[error("Invalid signer private key: {0}")]
    InvalidPrivateKey(#[from] KeypairError),

    #[error("Missing {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Binds an executor session to one deployed program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// The program every instruction targets.
    pub program_id: Pubkey,
    /// The program's state account (first account of every instruction).
    pub state_account: Pubkey,
    /// Signer-set mirror account, placed second when present.
    pub multisig_account: Option<Pubkey>,
    /// Replaces the program id as the trailing account when present.
    pub derivation_account: Option<Pubkey>,
}

impl ExecutorConfig {
    pub fn new(program_id: Pubkey, state_account: Pubkey) -> Self {
        Self {
            program_id,
            state_account,
            multisig_account: None,
            derivation_account: None,
        }
    }

    pub fn with_multisig(mut self, multisig_account: Pubkey) -> Self {
        self.multisig_account = Some(multisig_account);
        self
    }

    pub fn with_derivation_account(mut self, derivation_account: Pubkey) -> Self {
        self.derivation_account = Some(derivation_account);
        self
    }

    /// Parse base58 addresses. An empty string means the optional account is
    /// absent; required addresses may not be empty.
    pub fn from_base58(
        program_id: &str,
        state_account: &str,
        multisig_account: &str,
        derivation_account: &str,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            program_id: required("program id", program_id)?,
            state_account: required("state account", state_account)?,
            multisig_account: optional("multisig account", multisig_account)?,
            derivation_account: optional("derivation account", derivation_account)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject bindings that cannot address a real program.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.program_id.is_zero() {
            return Err(ConfigError::Missing("program id"));
        }
        if self.state_account.is_zero() {
            return Err(ConfigError::Missing("state account"));
        }
        if self.state_account == self.program_id {
            return Err(ConfigError::Invalid(
                "state account must differ from program id".into(),
            ));
        }
        if self.multisig_account == Some(self.state_account) {
            return Err(ConfigError::Invalid(
                "multisig account must differ from state account".into(),
            ));
        }
        Ok(())
    }
}

fn required(field: &'static str, text: &str) -> Result<Pubkey, ConfigError> {
    if text.trim().is_empty() {
        return Err(ConfigError::Missing(field));
    }
    text.trim()
        .parse()
        .map_err(|source| ConfigError::InvalidAddress { field, source })
}

fn optional(field: &'static str, text: &str) -> Result<Option<Pubkey>, ConfigError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    required(field, text).map(Some)
}

/// JSON-RPC endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub endpoint: String,
    /// `processed`, `confirmed` or `finalized`.
    pub commitment: String,
    pub request_timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8899".to_string(),
            commitment: "confirmed".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

impl RpcConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// How long and how often to poll for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            poll_interval_ms: 500,
        }
    }
}

impl ConfirmationConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Client settings loaded from TOML.
///
/// ```toml
/// [rpc]
/// endpoint = "http://127.0.0.1:8899"
/// commitment = "confirmed"
/// request_timeout_ms = 30000
///
/// [confirmation]
/// timeout_ms = 60000
/// poll_interval_ms = 500
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub rpc: RpcConfig,
    pub confirmation: ConfirmationConfig,
}

impl ClientConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rpc.endpoint.starts_with("http://") || self.rpc.endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "endpoint must be an http(s) URL, got {:?}",
                self.rpc.endpoint
            )));
        }
        if !matches!(
            self.rpc.commitment.as_str(),
            "processed" | "confirmed" | "finalized"
        ) {
            return Err(ConfigError::Invalid(format!(
                "unknown commitment {:?}",
                self.rpc.commitment
            )));
        }
        if self.confirmation.timeout_ms == 0 {
            return Err(ConfigError::Invalid("confirmation timeout must be positive".into()));
        }
        Ok(())
    }
}
