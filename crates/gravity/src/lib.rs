//! Gravity oracle registry.
//!
//! Holds the current consul set of the oracle network. The set starts
//! `Uninitialized`, becomes `Active` on `Init`, and afterwards changes only
//! through `UpdateConsuls` carrying a strictly greater round and signatures
//! from at least `bft` members of the set being replaced.

mod client;
mod program;
mod state;

pub use client::GravityClient;
pub use program::{validated_set, GravityProgram, MAX_CONSULS};
pub use state::{GravityState, MultisigState, StateError};
