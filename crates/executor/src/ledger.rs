//! The ledger the executor talks to.

use crate::Transaction;
use async_trait::async_trait;
use solanoid_core::InstructionErrorKind;
use solanoid_types::{Account, Hash, Pubkey, Signature};
use std::fmt;

/// RPC-level failure: the ledger could not be reached or answered nonsense.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Why the ledger refused or failed a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionFailure {
    /// Instruction `index` failed inside a program.
    Instruction {
        index: u8,
        kind: InstructionErrorKind,
    },
    BlockhashNotFound,
    AlreadyProcessed,
    InsufficientFundsForFee,
    SignatureFailure,
    AccountNotFound,
    ProgramAccountNotFound,
    Other(String),
}

impl TransactionFailure {
    /// Map a ledger error name without instruction detail.
    pub fn from_name(name: &str) -> Self {
        match name {
            "BlockhashNotFound" => TransactionFailure::BlockhashNotFound,
            "AlreadyProcessed" => TransactionFailure::AlreadyProcessed,
            "InsufficientFundsForFee" => TransactionFailure::InsufficientFundsForFee,
            "SignatureFailure" => TransactionFailure::SignatureFailure,
            "AccountNotFound" => TransactionFailure::AccountNotFound,
            "ProgramAccountNotFound" => TransactionFailure::ProgramAccountNotFound,
            other => TransactionFailure::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TransactionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionFailure::Instruction { index, kind } => {
                write!(f, "instruction {} failed: {}", index, kind)
            }
            TransactionFailure::Other(name) => write!(f, "{}", name),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Processing state of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Not yet confirmed (or not yet seen).
    Pending,
    Confirmed { slot: u64 },
    Failed { slot: u64, failure: TransactionFailure },
}

/// Failure of `send_transaction`.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Rejected before inclusion (e.g. preflight simulation).
    #[error("transaction rejected: {0}")]
    Rejected(TransactionFailure),
}

/// Ledger operations the executor and clients need.
///
/// Implemented over JSON-RPC by [`RpcLedger`](crate::RpcLedger) and
/// in memory by the simulation crate.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// A blockhash recent enough to anchor a new transaction.
    async fn latest_blockhash(&self) -> Result<Hash, TransportError>;

    /// Submit a signed transaction, returning its id.
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, SubmitError>;

    async fn transaction_status(&self, signature: &Signature) -> Result<TransactionStatus, TransportError>;

    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, TransportError>;

    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, TransportError>;
}
