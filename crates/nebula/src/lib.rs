//! Nebula data hub.
//!
//! A hub is bound to one Gravity registry and carries its own oracle set.
//! Subscribers register once per subscription id; oracles then push values
//! which the hub forwards to the subscriber's attach entrypoint inside the
//! same transaction, so a value is never recorded without being delivered.
//!
//! Rounds are tracked per subscription and for the hub's own pulse stream
//! and oracle set. Each stream only accepts strictly increasing rounds.

mod client;
mod program;
mod state;

pub use client::{NebulaClient, ValueDelivery};
pub use program::{nebula_authority, NebulaProgram};
pub use state::{NebulaState, Pulse, Subscription};
