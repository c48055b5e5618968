//! Executor failure taxonomy.

use crate::{ConfigError, TransactionFailure, TransportError};
use solanoid_core::{InstructionErrorKind, ProtocolError};
use solanoid_types::{Pubkey, Signature};

/// Why an executor call did not produce a confirmed transaction.
///
/// Every variant past `Config` names the instruction it concerns, using the
/// instruction's own description (e.g. `UpdateConsuls(round=10)`), so an
/// expected rejection can be told apart from a genuine fault.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// Bad keys or bindings. Nothing was sent.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The request could not be turned into a valid transaction. Nothing
    /// was sent.
    #[error("{instruction}: malformed request: {reason}")]
    Malformed { instruction: String, reason: String },

    /// The ledger could not be reached. The transaction may or may not have
    /// been received; the caller decides whether to retry.
    #[error("{instruction}: transport error: {source}")]
    Transport {
        instruction: String,
        #[source]
        source: TransportError,
    },

    /// A program refused the instruction. Terminal.
    #[error("{instruction} rejected by program {program_id}: {kind}")]
    Rejected {
        instruction: String,
        program_id: Pubkey,
        kind: InstructionErrorKind,
    },

    /// The ledger refused the transaction for a reason outside any program
    /// (fees, blockhash, duplicate).
    #[error("{instruction}: transaction failed: {failure}")]
    TransactionFailed {
        instruction: String,
        failure: TransactionFailure,
    },

    /// An account read back from the ledger is missing or does not decode.
    #[error("account {account}: {reason}")]
    AccountData { account: Pubkey, reason: String },

    /// No terminal status within the confirmation timeout. The outcome is
    /// unknown; query `signature` again instead of assuming failure.
    #[error("{instruction}: confirmation timed out for {signature}")]
    ConfirmationTimeout {
        instruction: String,
        signature: Signature,
    },
}

impl ExecutorError {
    /// Transport failures and expired blockhashes may be retried by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExecutorError::Transport { .. }
                | ExecutorError::TransactionFailed {
                    failure: TransactionFailure::BlockhashNotFound,
                    ..
                }
        )
    }

    /// The protocol error behind a program rejection.
    pub fn protocol_error(&self) -> Option<ProtocolError> {
        match self {
            ExecutorError::Rejected { kind, .. } => kind.protocol_error(),
            _ => None,
        }
    }

    /// Whether a program rejected the call with `expected`.
    pub fn is_protocol(&self, expected: ProtocolError) -> bool {
        self.protocol_error() == Some(expected)
    }

    /// Whether this is the double-spend rejection of a replayed swap id.
    pub fn is_double_spend(&self) -> bool {
        self.is_protocol(ProtocolError::DuplicateSwapId)
    }

    /// Whether the outcome is unknown and must be re-queried.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutorError::ConfirmationTimeout { .. })
    }

    /// The instruction description, when the error concerns one.
    pub fn instruction(&self) -> Option<&str> {
        match self {
            ExecutorError::Config(_) | ExecutorError::AccountData { .. } => None,
            ExecutorError::Malformed { instruction, .. }
            | ExecutorError::Transport { instruction, .. }
            | ExecutorError::Rejected { instruction, .. }
            | ExecutorError::TransactionFailed { instruction, .. }
            | ExecutorError::ConfirmationTimeout { instruction, .. } => Some(instruction),
        }
    }
}
