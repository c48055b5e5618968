//! One-call deployment of the full oracle and bridge stack.

use crate::{SimError, SimLedger, TOKEN_PROGRAM_ID};
use solanoid_codec::CrossChainMintVector;
use solanoid_executor::{ConfirmationConfig, Executor, ExecutorConfig, ExecutorError, InvokeOutcome};
use solanoid_gravity::{GravityClient, GravityProgram, GravityState, MultisigState};
use solanoid_ibport::{port_authority, IBPortClient, IBPortProgram, IBPortState};
use solanoid_nebula::{NebulaClient, NebulaProgram, NebulaState, ValueDelivery};
use solanoid_types::{DataType, Keypair, Pubkey, Round, SubscriptionId, LAMPORTS_PER_SOL};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Sizing and protocol parameters of a deployment.
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    pub bft: u8,
    pub initial_round: Round,
    pub decimals: u8,
    pub max_subscriptions: usize,
    pub max_swaps: usize,
    pub max_unwraps: usize,
    pub subscription_id: SubscriptionId,
    pub min_confirmations: u8,
    pub queue_size: u64,
    /// Lamports given to the deployer and to each consul.
    pub funding: u64,
    pub confirmation: ConfirmationConfig,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            bft: 3,
            initial_round: Round(1),
            decimals: 8,
            max_subscriptions: 4,
            max_swaps: 64,
            max_unwraps: 64,
            subscription_id: SubscriptionId::new([0x5b; 16]),
            min_confirmations: 1,
            queue_size: 1,
            funding: 100 * LAMPORTS_PER_SOL,
            confirmation: ConfirmationConfig::default()
                .with_timeout(Duration::from_secs(5))
                .with_poll_interval(Duration::from_millis(5)),
        }
    }
}

/// Gravity, Nebula and IBPort deployed and wired together on a
/// [`SimLedger`]:
///
/// - the consuls form both the Gravity consul set and the Nebula oracles
/// - the Nebula hub reads consul rotations from the Gravity state account
/// - the port holds the mint authority and is subscribed to the hub
pub struct BridgeDeployment {
    ledger: Arc<SimLedger>,
    deployer: Keypair,
    consuls: Vec<Keypair>,
    subscription_id: SubscriptionId,
    mint: Pubkey,
    gravity: GravityClient,
    nebula: NebulaClient,
    port: IBPortClient,
}

impl BridgeDeployment {
    /// Deploy every program, allocate its accounts, initialize all three
    /// concurrently and subscribe the port to the hub.
    pub async fn deploy(
        ledger: Arc<SimLedger>,
        consuls: Vec<Keypair>,
        config: DeploymentConfig,
    ) -> Result<Self, SimError> {
        let deployer = ledger.funded_keypair(config.funding);
        for consul in &consuls {
            ledger.airdrop(&consul.pubkey(), config.funding);
        }

        let gravity_program = ledger.deploy_program(Arc::new(GravityProgram));
        let nebula_program = ledger.deploy_program(Arc::new(NebulaProgram));
        let port_program = ledger.deploy_program(Arc::new(IBPortProgram));

        let payer = deployer.pubkey();
        let gravity_state = ledger.allocate_account(&payer, GravityState::LEN, &gravity_program)?;
        let gravity_multisig =
            ledger.allocate_account(&payer, MultisigState::LEN, &gravity_program)?;
        let nebula_state = ledger.allocate_account(
            &payer,
            NebulaState::space(config.max_subscriptions),
            &nebula_program,
        )?;
        let nebula_multisig = ledger.allocate_account(&payer, MultisigState::LEN, &nebula_program)?;
        let port_state = ledger.allocate_account(
            &payer,
            IBPortState::space(config.max_swaps, config.max_unwraps),
            &port_program,
        )?;

        let (authority, _) = port_authority(&port_program)?;
        let mint = ledger.create_mint(&deployer, &payer, config.decimals)?;
        ledger.set_mint_authority(&deployer, &mint, Some(authority))?;

        let confirmation = config.confirmation;
        let session = |executor_config: ExecutorConfig| {
            Executor::new(ledger.clone(), deployer.clone(), executor_config)
                .map(|e| e.with_confirmation(confirmation))
        };
        let gravity = GravityClient::new(session(
            ExecutorConfig::new(gravity_program, gravity_state).with_multisig(gravity_multisig),
        )?);
        let nebula = NebulaClient::new(session(
            ExecutorConfig::new(nebula_program, nebula_state)
                .with_multisig(nebula_multisig)
                .with_derivation_account(gravity_state),
        )?);
        let port = IBPortClient::new(
            session(ExecutorConfig::new(port_program, port_state))?,
            TOKEN_PROGRAM_ID,
            mint,
        )?;

        let consul_keys: Vec<Pubkey> = consuls.iter().map(Keypair::pubkey).collect();
        let (gravity_init, nebula_init, port_init) = futures::join!(
            gravity.init(config.bft, config.initial_round, consul_keys.clone()),
            nebula.init(config.bft, DataType::Bytes, gravity_state, consul_keys),
            port.init(nebula_program),
        );
        gravity_init?;
        nebula_init?;
        port_init?;

        nebula
            .subscribe(
                authority,
                config.min_confirmations,
                config.queue_size,
                config.subscription_id,
            )
            .await?;

        info!(
            gravity = %gravity_program,
            nebula = %nebula_program,
            port = %port_program,
            %mint,
            consuls = consuls.len(),
            "Bridge deployed"
        );

        Ok(Self {
            ledger,
            deployer,
            consuls,
            subscription_id: config.subscription_id,
            mint,
            gravity,
            nebula,
            port,
        })
    }

    pub fn ledger(&self) -> &Arc<SimLedger> {
        &self.ledger
    }

    pub fn deployer(&self) -> &Keypair {
        &self.deployer
    }

    pub fn consuls(&self) -> &[Keypair] {
        &self.consuls
    }

    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    pub fn mint(&self) -> Pubkey {
        self.mint
    }

    pub fn gravity(&self) -> &GravityClient {
        &self.gravity
    }

    pub fn nebula(&self) -> &NebulaClient {
        &self.nebula
    }

    pub fn port(&self) -> &IBPortClient {
        &self.port
    }

    /// A token account of the bridged mint owned by `owner`.
    pub fn create_recipient(&self, owner: &Pubkey) -> Result<Pubkey, SimError> {
        self.ledger
            .create_token_account(&self.deployer, &self.mint, owner)
    }

    /// Where a mint vector for `recipient` is delivered.
    pub fn delivery_to(&self, recipient: Pubkey) -> Result<ValueDelivery, SimError> {
        Ok(ValueDelivery::to_port(
            self.port.executor().program_id(),
            self.port.executor().state_account(),
            TOKEN_PROGRAM_ID,
            self.mint,
            recipient,
        )?)
    }

    /// Deliver `vector` through the hub, signed by consul `oracle`.
    pub async fn attach(
        &self,
        oracle: usize,
        round: Round,
        vector: CrossChainMintVector,
    ) -> Result<InvokeOutcome, ExecutorError> {
        let delivery = self
            .delivery_to(vector.recipient)
            .map_err(|e| ExecutorError::Malformed {
                instruction: "SendValueToSubs".into(),
                reason: e.to_string(),
            })?;
        let oracle = self
            .consuls
            .get(oracle)
            .ok_or_else(|| ExecutorError::Malformed {
                instruction: "SendValueToSubs".into(),
                reason: format!("no consul at index {oracle}"),
            })?;
        self.nebula
            .send_mint_vector(oracle, round, self.subscription_id, vector, &delivery)
            .await
    }
}
