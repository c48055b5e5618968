//! Simulation errors.

use solanoid_executor::{
    ConfigError, ExecutorError, SubmitError, TransactionError, TransactionFailure, TransportError,
};
use solanoid_types::{PdaError, Pubkey};

/// Failure of a direct ledger operation or a helper transaction.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The ledger refused or failed the transaction.
    #[error("transaction failed: {0}")]
    Failed(TransactionFailure),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("could not build transaction: {0}")]
    Transaction(#[from] TransactionError),

    #[error("account {0} not found")]
    AccountNotFound(Pubkey),

    #[error("insufficient lamports in {account}: need {needed}, have {available}")]
    InsufficientLamports {
        account: Pubkey,
        needed: u64,
        available: u64,
    },

    #[error("account {account} does not decode: {reason}")]
    AccountData { account: Pubkey, reason: String },

    #[error(transparent)]
    Pda(#[from] PdaError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

impl From<SubmitError> for SimError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Transport(e) => SimError::Transport(e),
            SubmitError::Rejected(failure) => SimError::Failed(failure),
        }
    }
}
