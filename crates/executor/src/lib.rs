//! Generic instruction executor.
//!
//! Turns a typed program instruction into one signed ledger transaction,
//! submits it, and waits for a terminal outcome.
//!
//! # Account order
//!
//! Every instruction built here carries its accounts in a fixed order:
//!
//! ```text
//! [state(w), multisig(w)?, primary signer(s,w), ...additional signers(s),
//!  ...additional metas, program id | derivation account]
//! ```
//!
//! Additional signers and metas belong to one [`Invocation`] value and are
//! never carried over to the next call.
//!
//! # Failure classes
//!
//! [`ExecutorError`] separates configuration errors (nothing sent), malformed
//! requests (nothing sent), transport errors (retry is the caller's choice,
//! nothing is retried automatically), program rejections (terminal, with the
//! program's numeric code) and confirmation timeouts (outcome unknown; query
//! again with [`Executor::query_status`]).

mod config;
mod error;
mod executor;
mod invocation;
mod ledger;
mod rpc;
mod transaction;

pub use config::{ClientConfig, ConfigError, ConfirmationConfig, ExecutorConfig, RpcConfig};
pub use error::ExecutorError;
pub use executor::{Executor, InvokeOutcome};
pub use invocation::Invocation;
pub use ledger::{Ledger, SubmitError, TransactionFailure, TransactionStatus, TransportError};
pub use rpc::RpcLedger;
pub use transaction::{
    CompiledInstruction, Message, MessageHeader, Transaction, TransactionError, PACKET_DATA_SIZE,
};
