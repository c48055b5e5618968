//! In-memory ledger for end-to-end runs of the oracle and bridge programs.
//!
//! [`SimLedger`] implements the executor's [`Ledger`](solanoid_executor::Ledger)
//! trait, so the same clients that talk to a live cluster over JSON-RPC run
//! unchanged against it. It executes the real program state machines,
//! including nested calls between them, and ships a native token program
//! with the SPL layouts.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      SimLedger                          │
//! │                                                         │
//! │  send_transaction ──► checks (dup, blockhash, sigs, fee)│
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │  Runtime over an im::HashMap snapshot              │ │
//! │  │  program.process → write back → actions (CPI/log)  │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │ commit on success           │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │  Bank: accounts, slot, blockhash window, statuses  │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Given the same seed and the same sequence of calls, a run produces the
//! same addresses and the same results.

mod config;
mod deploy;
mod error;
mod ledger;
mod runtime;
mod token;

pub use config::{SimConfig, DEFAULT_BLOCKHASH_WINDOW, DEFAULT_MAX_INVOKE_DEPTH};
pub use deploy::{BridgeDeployment, DeploymentConfig};
pub use error::SimError;
pub use ledger::{rent_exempt_minimum, SimLedger, LOADER_ID};
pub use token::{TokenError, TokenProgram, TOKEN_PROGRAM_ID};
