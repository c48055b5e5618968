//! Shared setup for the end-to-end scenarios.

#![allow(dead_code)]

use solanoid_executor::{ConfirmationConfig, Executor, ExecutorConfig};
use solanoid_gravity::{GravityClient, GravityProgram, GravityState, MultisigState};
use solanoid_simulation::{BridgeDeployment, DeploymentConfig, SimConfig, SimLedger};
use solanoid_test_helpers::ConsulFixture;
use solanoid_types::LAMPORTS_PER_SOL;
use std::sync::Arc;
use std::time::Duration;

/// Consul keys use a different stream than the ledger's own key generator.
const CONSUL_SEED_OFFSET: u64 = 0xc0_5e;

pub fn fast_confirmation() -> ConfirmationConfig {
    ConfirmationConfig::default()
        .with_timeout(Duration::from_secs(5))
        .with_poll_interval(Duration::from_millis(2))
}

pub fn ledger(seed: u64) -> Arc<SimLedger> {
    Arc::new(SimLedger::new(SimConfig::default().with_seed(seed)))
}

pub fn consuls(count: usize, seed: u64) -> ConsulFixture {
    ConsulFixture::generate(count, seed.wrapping_add(CONSUL_SEED_OFFSET))
}

/// Gravity deployed with empty state and multisig accounts, not initialized.
pub fn gravity(ledger: &Arc<SimLedger>) -> GravityClient {
    let deployer = ledger.funded_keypair(10 * LAMPORTS_PER_SOL);
    let program = ledger.deploy_program(Arc::new(GravityProgram));
    let state = ledger
        .allocate_account(&deployer.pubkey(), GravityState::LEN, &program)
        .unwrap();
    let multisig = ledger
        .allocate_account(&deployer.pubkey(), MultisigState::LEN, &program)
        .unwrap();
    let executor = Executor::new(
        ledger.clone(),
        deployer,
        ExecutorConfig::new(program, state).with_multisig(multisig),
    )
    .unwrap()
    .with_confirmation(fast_confirmation());
    GravityClient::new(executor)
}

/// The whole bridge with five consuls and bft 3.
pub async fn bridge(seed: u64) -> BridgeDeployment {
    bridge_on(ledger(seed), seed).await
}

pub async fn bridge_on(ledger: Arc<SimLedger>, seed: u64) -> BridgeDeployment {
    let config = DeploymentConfig {
        confirmation: fast_confirmation(),
        ..DeploymentConfig::default()
    };
    BridgeDeployment::deploy(ledger, consuls(5, seed).keypairs().to_vec(), config)
        .await
        .unwrap()
}
