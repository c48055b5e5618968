//! Drives one scenario end to end.

use crate::config::{ScenarioConfig, ScenarioError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use solanoid_codec::{from_base_units, to_base_units, CrossChainMintVector};
use solanoid_simulation::{BridgeDeployment, DeploymentConfig, SimConfig, SimLedger};
use solanoid_types::{ForeignAddress, Keypair, Pubkey, Round, SwapId, LAMPORTS_PER_SOL};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Seed offset for consul keys so they never coincide with ledger keys.
const CONSUL_SEED_OFFSET: u64 = 0xc05e;

/// Recipients the swaps are spread over.
const RECIPIENTS: usize = 3;

/// What a scenario did.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    pub consuls: usize,
    pub bft: u8,
    pub swaps_delivered: usize,
    /// Replays of an already attached swap that the port refused.
    pub replays_rejected: usize,
    /// Base units minted across all swaps.
    pub minted: u64,
    /// Base units burned by the unwrap request.
    pub unwrapped: u64,
    /// Mint supply at the end of the run.
    pub supply: u64,
    pub unwrap_requests: usize,
    pub final_slot: u64,
    pub elapsed: Duration,
}

impl ScenarioReport {
    pub fn print(&self) {
        println!("\n=== Scenario Report ===");
        println!("Consuls:          {} (bft {})", self.consuls, self.bft);
        println!("Swaps delivered:  {}", self.swaps_delivered);
        println!("Replays rejected: {}", self.replays_rejected);
        println!("Minted:           {}", self.minted);
        println!("Unwrapped:        {}", self.unwrapped);
        println!("Supply:           {}", self.supply);
        println!("Unwrap requests:  {}", self.unwrap_requests);
        println!("Final slot:       {}", self.final_slot);
        println!("Elapsed:          {:.2?}", self.elapsed);
    }
}

struct Recipient {
    owner: Keypair,
    token_account: Pubkey,
}

/// Deploy the bridge on a fresh simulated ledger, attach `swaps` random
/// mint vectors through the hub, replay the first one and unwrap half of
/// one recipient's balance.
pub async fn run(config: &ScenarioConfig) -> Result<ScenarioReport, ScenarioError> {
    config.validate()?;
    let started = Instant::now();

    let ledger = Arc::new(SimLedger::new(
        SimConfig::default()
            .with_seed(config.seed)
            .with_confirmation_latency(config.confirmation_latency()),
    ));
    let mut consul_rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(CONSUL_SEED_OFFSET));
    let consuls: Vec<Keypair> = (0..config.consuls)
        .map(|_| Keypair::generate_with(&mut consul_rng))
        .collect();

    let deployment = BridgeDeployment::deploy(
        ledger.clone(),
        consuls,
        DeploymentConfig {
            bft: config.bft,
            initial_round: Round(config.initial_round),
            decimals: config.decimals,
            max_swaps: config.swaps,
            max_unwraps: 1,
            ..DeploymentConfig::default()
        },
    )
    .await?;

    let recipients = (0..RECIPIENTS)
        .map(|_| {
            let owner = ledger.funded_keypair(LAMPORTS_PER_SOL);
            let token_account = deployment.create_recipient(&owner.pubkey())?;
            Ok(Recipient {
                owner,
                token_account,
            })
        })
        .collect::<Result<Vec<_>, ScenarioError>>()?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut minted = 0u64;
    let mut first: Option<CrossChainMintVector> = None;
    for i in 0..config.swaps {
        let recipient = &recipients[rng.gen_range(0..recipients.len())];
        let amount = rng.gen_range(config.min_amount..=config.max_amount);
        let vector = CrossChainMintVector::new(
            SwapId::new(rng.gen()),
            recipient.token_account,
            amount,
        );
        let round = Round(i as u64 + 1);
        let outcome = deployment
            .attach(i % config.consuls, round, vector)
            .await?;
        minted += to_base_units(amount, config.decimals)
            .map_err(|e| ScenarioError::Invalid(e.to_string()))?;
        debug!(%round, swap_id = %vector.swap_id, amount, slot = outcome.slot, "Swap attached");
        first.get_or_insert(vector);
    }
    info!(swaps = config.swaps, minted, "Swaps delivered");

    let mut replays_rejected = 0;
    if let Some(vector) = first {
        let round = Round(config.swaps as u64 + 1);
        match deployment.attach(0, round, vector).await {
            Err(e) if e.is_double_spend() => replays_rejected += 1,
            Err(e) => return Err(e.into()),
            Ok(_) => {
                warn!(swap_id = %vector.swap_id, "Replay accepted");
                return Err(ScenarioError::Violation(format!(
                    "replay of swap {} was attached twice",
                    vector.swap_id
                )));
            }
        }
    }

    let unwrapped = unwrap_half(&deployment, &recipients, config.decimals).await?;

    let supply = ledger.mint(&deployment.mint())?.supply;
    if supply != minted - unwrapped {
        return Err(ScenarioError::Violation(format!(
            "supply {supply} does not match minted {minted} minus unwrapped {unwrapped}"
        )));
    }
    let unwrap_requests = deployment
        .port()
        .fetch_state()
        .await?
        .map(|state| state.unwraps.len())
        .unwrap_or_default();

    let report = ScenarioReport {
        consuls: config.consuls,
        bft: config.bft,
        swaps_delivered: config.swaps,
        replays_rejected,
        minted,
        unwrapped,
        supply,
        unwrap_requests,
        final_slot: ledger.slot(),
        elapsed: started.elapsed(),
    };
    info!(?report, "Scenario complete");
    Ok(report)
}

/// Unwrap half of the richest recipient's balance back to a foreign
/// address. Returns the base units burned.
async fn unwrap_half(
    deployment: &BridgeDeployment,
    recipients: &[Recipient],
    decimals: u8,
) -> Result<u64, ScenarioError> {
    let ledger = deployment.ledger();
    let mut richest: Option<(&Recipient, u64)> = None;
    for recipient in recipients {
        let balance = ledger.token_balance(&recipient.token_account)?;
        if richest.map_or(true, |(_, best)| balance > best) {
            richest = Some((recipient, balance));
        }
    }
    let Some((recipient, balance)) = richest else {
        return Ok(0);
    };
    let half = balance / 2;
    if half == 0 {
        return Ok(0);
    }

    ledger.approve(
        &recipient.owner,
        &recipient.token_account,
        &deployment.port().authority(),
        half,
    )?;
    deployment
        .port()
        .create_transfer_unwrap_request(
            &recipient.owner,
            recipient.token_account,
            ForeignAddress::from_evm([0xee; 20]),
            from_base_units(half, decimals),
        )
        .await?;
    info!(amount = half, owner = %recipient.owner.pubkey(), "Unwrap requested");
    Ok(half)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_small_scenario() {
        let config = ScenarioConfig::default().with_swaps(4).with_seed(7);
        let report = run(&config).await.unwrap();
        assert_eq!(report.swaps_delivered, 4);
        assert_eq!(report.replays_rejected, 1);
        assert_eq!(report.unwrap_requests, 1);
        assert!(report.minted > 0);
        assert_eq!(report.supply, report.minted - report.unwrapped);
    }

    #[tokio::test]
    async fn test_runs_are_reproducible() {
        let config = ScenarioConfig::default()
            .with_consuls(3)
            .with_bft(2)
            .with_swaps(3)
            .with_seed(11);
        let a = run(&config).await.unwrap();
        let b = run(&config).await.unwrap();
        assert_eq!(a.minted, b.minted);
        assert_eq!(a.unwrapped, b.unwrapped);
        assert_eq!(a.final_slot, b.final_slot);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_deploy() {
        let config = ScenarioConfig::default().with_bft(9);
        assert!(matches!(run(&config).await, Err(ScenarioError::Invalid(_))));
    }
}
