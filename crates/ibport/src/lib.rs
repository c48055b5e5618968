//! IBPort bridge.
//!
//! A port is bound once to a Nebula hub program and a token program. Inbound
//! value arrives only as `AttachValue` calls made by the bound hub; each swap
//! id mints at most once. Outbound transfers burn tokens the sender delegated
//! to the port's authority PDA and append an unwrap request to the port's
//! log.

mod client;
mod program;
mod state;

pub use client::IBPortClient;
pub use program::{port_authority, IBPortProgram};
pub use state::{IBPortState, SwapRecord, UnwrapRequest};
