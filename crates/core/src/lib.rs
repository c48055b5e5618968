//! Program model shared by the Gravity, Nebula and IBPort programs.
//!
//! Programs are state machines in the same mould as the rest of this
//! workspace:
//!
//! - **Synchronous**: no async, no `.await`
//! - **Deterministic**: same accounts + same instruction = same result
//! - **No I/O**: programs read and write the accounts handed to them and
//!   return [`ProgramAction`]s; the runtime performs cross-program
//!   invocations and records events
//!
//! A failing program returns a [`ProgramError`]; the runtime then discards
//! every change the enclosing transaction made.

mod action;
mod context;
mod error;
mod program;

pub use action::{Instruction, ProgramAction, ProgramEvent};
pub use context::{InvokeContext, KeyedAccount};
pub use error::{InstructionErrorKind, ProgramError, ProtocolError};
pub use program::Program;
