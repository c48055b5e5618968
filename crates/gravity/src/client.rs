//! Typed client for the registry program.

use crate::GravityState;
use solanoid_codec::{GravityInstruction, InstructionData};
use solanoid_executor::{Executor, ExecutorError, Invocation, InvokeOutcome};
use solanoid_types::{Keypair, Pubkey, Round};
use tracing::info;

/// Calls the registry through an [`Executor`] bound to the gravity program,
/// its state account and its multisig account.
pub struct GravityClient {
    executor: Executor,
}

impl GravityClient {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Install the first consul set. The session signer signs.
    pub async fn init(
        &self,
        bft: u8,
        init_round: Round,
        consuls: Vec<Pubkey>,
    ) -> Result<InvokeOutcome, ExecutorError> {
        let outcome = self
            .executor
            .build_and_invoke(GravityInstruction::Init {
                bft,
                init_round,
                consuls,
            })
            .await?;
        info!(signature = %outcome.signature, "Gravity init confirmed");
        Ok(outcome)
    }

    /// Rotate the consul set, co-signed by members of the current set.
    pub async fn update_consuls(
        &self,
        bft: u8,
        last_round: Round,
        consuls: Vec<Pubkey>,
        signers: &[Keypair],
    ) -> Result<InvokeOutcome, ExecutorError> {
        let instruction = GravityInstruction::UpdateConsuls {
            bft,
            last_round,
            consuls,
        };
        if signers.is_empty() {
            return Err(ExecutorError::Malformed {
                instruction: instruction.describe(),
                reason: "consul rotation needs at least one consul signature".into(),
            });
        }
        self.executor
            .invoke(Invocation::new(instruction).with_signers(signers.iter().cloned()))
            .await
    }

    /// Read and decode the registry state account.
    pub async fn fetch_state(&self) -> Result<GravityState, ExecutorError> {
        let account = self.executor.state_account();
        let data = self.executor.fetch_account(&account).await?;
        GravityState::unpack(&data.data).map_err(|e| ExecutorError::AccountData {
            account,
            reason: e.to_string(),
        })
    }
}
