//! Scenario runner for the oracle bridge.
//!
//! Builds on `solanoid-simulation`: a [`ScenarioConfig`] (TOML or CLI
//! flags) describes the consul committee and a batch of swaps, and
//! [`run`] deploys Gravity, Nebula and IBPort on a fresh simulated ledger,
//! delivers the swaps through the hub, checks that a replay is refused and
//! that the mint supply adds up.
//!
//! ```ignore
//! use solanoid_simulator::{run, ScenarioConfig};
//!
//! let report = run(&ScenarioConfig::default().with_swaps(20)).await?;
//! report.print();
//! ```

pub mod config;
pub mod runner;

pub use config::{ScenarioConfig, ScenarioError};
pub use runner::{run, ScenarioReport};
