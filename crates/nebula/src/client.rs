//! Typed client for the hub program.

use crate::NebulaState;
use solanoid_codec::{CrossChainMintVector, NebulaInstruction, PORT_AUTHORITY_SEED};
use solanoid_executor::{Executor, ExecutorError, Invocation, InvokeOutcome};
use solanoid_types::{
    find_program_address, AccountMeta, DataType, Hash, Keypair, PdaError, Pubkey, Round,
    SubscriptionId,
};

/// Where a delivered value goes: the subscriber program, its state account
/// and the accounts its attach entrypoint needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueDelivery {
    pub subscriber_program: Pubkey,
    pub subscriber_state: Pubkey,
    pub forwarded: Vec<AccountMeta>,
}

impl ValueDelivery {
    /// Delivery to an IBPort bridge minting into `recipient`.
    pub fn to_port(
        port_program: Pubkey,
        port_state: Pubkey,
        token_program: Pubkey,
        mint: Pubkey,
        recipient: Pubkey,
    ) -> Result<Self, PdaError> {
        let (port_authority, _) = find_program_address(&[PORT_AUTHORITY_SEED], &port_program)?;
        Ok(Self {
            subscriber_program: port_program,
            subscriber_state: port_state,
            forwarded: vec![
                AccountMeta::new_readonly(token_program, false),
                AccountMeta::new(mint, false),
                AccountMeta::new(recipient, false),
                AccountMeta::new_readonly(port_authority, false),
            ],
        })
    }

    /// Account metas in the order the hub expects them.
    pub fn metas(&self) -> Vec<AccountMeta> {
        let mut metas = Vec::with_capacity(2 + self.forwarded.len());
        metas.push(AccountMeta::new_readonly(self.subscriber_program, false));
        metas.push(AccountMeta::new(self.subscriber_state, false));
        metas.extend_from_slice(&self.forwarded);
        metas
    }
}

/// Calls a hub through an [`Executor`] bound to the nebula program, its
/// state and multisig accounts, and the Gravity state account as the
/// derivation account.
pub struct NebulaClient {
    executor: Executor,
}

impl NebulaClient {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub async fn init(
        &self,
        bft: u8,
        data_type: DataType,
        gravity_state: Pubkey,
        oracles: Vec<Pubkey>,
    ) -> Result<InvokeOutcome, ExecutorError> {
        self.executor
            .build_and_invoke(NebulaInstruction::Init {
                bft,
                data_type,
                gravity_state,
                oracles,
            })
            .await
    }

    /// Rotate the hub's oracles, co-signed by consuls of the bound registry.
    pub async fn update_oracles(
        &self,
        bft: u8,
        new_round: Round,
        oracles: Vec<Pubkey>,
        consuls: &[Keypair],
    ) -> Result<InvokeOutcome, ExecutorError> {
        let invocation = Invocation::new(NebulaInstruction::UpdateOracles {
            bft,
            new_round,
            oracles,
        })
        .with_signers(consuls.iter().cloned());
        self.executor.invoke(invocation).await
    }

    /// Record a data hash, signed and paid for by `oracle`.
    pub async fn send_hash_value(
        &self,
        oracle: &Keypair,
        round: Round,
        data_hash: Hash,
    ) -> Result<InvokeOutcome, ExecutorError> {
        let invocation = Invocation::new(NebulaInstruction::SendHashValue { round, data_hash })
            .with_primary_signer(oracle.clone());
        self.executor.invoke(invocation).await
    }

    pub async fn subscribe(
        &self,
        subscriber: Pubkey,
        min_confirmations: u8,
        queue_size: u64,
        subscription_id: SubscriptionId,
    ) -> Result<InvokeOutcome, ExecutorError> {
        self.executor
            .build_and_invoke(NebulaInstruction::Subscribe {
                subscriber,
                min_confirmations,
                queue_size,
                subscription_id,
            })
            .await
    }

    /// Push `value` for `subscription_id`, signed and paid for by `oracle`.
    pub async fn send_value_to_subs(
        &self,
        oracle: &Keypair,
        data_type: DataType,
        round: Round,
        subscription_id: SubscriptionId,
        value: Vec<u8>,
        delivery: &ValueDelivery,
    ) -> Result<InvokeOutcome, ExecutorError> {
        let invocation = Invocation::new(NebulaInstruction::SendValueToSubs {
            data_type,
            round,
            subscription_id,
            value,
        })
        .with_primary_signer(oracle.clone())
        .with_metas(delivery.metas());
        self.executor.invoke(invocation).await
    }

    /// Deliver a cross-chain mint vector to a bridge subscriber.
    pub async fn send_mint_vector(
        &self,
        oracle: &Keypair,
        round: Round,
        subscription_id: SubscriptionId,
        vector: CrossChainMintVector,
        delivery: &ValueDelivery,
    ) -> Result<InvokeOutcome, ExecutorError> {
        self.send_value_to_subs(
            oracle,
            DataType::Bytes,
            round,
            subscription_id,
            vector.encode().to_vec(),
            delivery,
        )
        .await
    }

    /// Read the hub state; `None` while uninitialized.
    pub async fn fetch_state(&self) -> Result<Option<NebulaState>, ExecutorError> {
        let account = self.executor.state_account();
        let data = self.executor.fetch_account(&account).await?;
        NebulaState::unpack(&data.data).map_err(|e| ExecutorError::AccountData {
            account,
            reason: e.to_string(),
        })
    }
}
