//! Simulated ledger parameters.

use solanoid_types::LAMPORTS_PER_SIGNATURE;
use std::time::Duration;

/// Default number of recent blockhashes a transaction may reference.
pub const DEFAULT_BLOCKHASH_WINDOW: usize = 150;

/// Default nesting limit for cross-program invocations.
pub const DEFAULT_MAX_INVOKE_DEPTH: usize = 4;

/// Configuration for a [`SimLedger`](crate::SimLedger).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Seed for every key the ledger generates.
    pub seed: u64,
    pub lamports_per_signature: u64,
    pub blockhash_window: usize,
    pub max_invoke_depth: usize,
    /// Delay between inclusion and the status becoming visible.
    pub confirmation_latency: Duration,
    /// Record failed transactions (and charge their fees) instead of
    /// rejecting them at submission.
    pub skip_preflight: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            lamports_per_signature: LAMPORTS_PER_SIGNATURE,
            blockhash_window: DEFAULT_BLOCKHASH_WINDOW,
            max_invoke_depth: DEFAULT_MAX_INVOKE_DEPTH,
            confirmation_latency: Duration::ZERO,
            skip_preflight: false,
        }
    }
}

impl SimConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_confirmation_latency(mut self, latency: Duration) -> Self {
        self.confirmation_latency = latency;
        self
    }

    pub fn with_skip_preflight(mut self, skip: bool) -> Self {
        self.skip_preflight = skip;
        self
    }

    pub fn with_max_invoke_depth(mut self, depth: usize) -> Self {
        self.max_invoke_depth = depth;
        self
    }
}
