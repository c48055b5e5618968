//! Typed client for the bridge program.

use crate::{port_authority, IBPortState};
use solanoid_codec::{CrossChainMintVector, IBPortInstruction, InstructionData};
use solanoid_executor::{ConfigError, Executor, ExecutorError, Invocation, InvokeOutcome};
use solanoid_types::{AccountMeta, ForeignAddress, Keypair, Pubkey};

/// Calls a port through an [`Executor`] bound to the ibport program and its
/// state account. The port works against one token program and mint.
pub struct IBPortClient {
    executor: Executor,
    token_program: Pubkey,
    mint: Pubkey,
    authority: Pubkey,
}

impl IBPortClient {
    pub fn new(executor: Executor, token_program: Pubkey, mint: Pubkey) -> Result<Self, ConfigError> {
        let (authority, _) = port_authority(&executor.program_id())
            .map_err(|e| ConfigError::Invalid(format!("port authority: {e}")))?;
        Ok(Self {
            executor,
            token_program,
            mint,
            authority,
        })
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// The PDA that must hold mint authority and receive unwrap delegations.
    pub fn authority(&self) -> Pubkey {
        self.authority
    }

    /// Bind the port to `nebula` and this client's token program.
    pub async fn init(&self, nebula: Pubkey) -> Result<InvokeOutcome, ExecutorError> {
        self.executor
            .build_and_invoke(IBPortInstruction::Init {
                nebula,
                token_program: self.token_program,
            })
            .await
    }

    /// Burn `amount` from `token_account`, which `owner` must have delegated
    /// to [`Self::authority`], and log a transfer to `receiver`.
    pub async fn create_transfer_unwrap_request(
        &self,
        owner: &Keypair,
        token_account: Pubkey,
        receiver: ForeignAddress,
        amount: f64,
    ) -> Result<InvokeOutcome, ExecutorError> {
        let instruction = IBPortInstruction::CreateTransferUnwrapRequest { receiver, amount };
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ExecutorError::Malformed {
                instruction: instruction.describe(),
                reason: "amount must be a positive finite number".into(),
            });
        }
        let invocation = Invocation::new(instruction)
            .with_primary_signer(owner.clone())
            .with_metas(self.token_metas(token_account));
        self.executor.invoke(invocation).await
    }

    /// Submit `AttachValue` directly. The program accepts it only as a
    /// nested call from the bound hub, so this is always rejected with
    /// `UnauthorizedCaller`; deliveries go through the hub.
    pub async fn attach_value(
        &self,
        vector: CrossChainMintVector,
    ) -> Result<InvokeOutcome, ExecutorError> {
        let invocation = Invocation::new(IBPortInstruction::AttachValue(vector))
            .with_metas(self.token_metas(vector.recipient));
        self.executor.invoke(invocation).await
    }

    /// Read the port state; `None` while uninitialized.
    pub async fn fetch_state(&self) -> Result<Option<IBPortState>, ExecutorError> {
        let account = self.executor.state_account();
        let data = self.executor.fetch_account(&account).await?;
        IBPortState::unpack(&data.data).map_err(|e| ExecutorError::AccountData {
            account,
            reason: e.to_string(),
        })
    }

    fn token_metas(&self, token_account: Pubkey) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new_readonly(self.token_program, false),
            AccountMeta::new(self.mint, false),
            AccountMeta::new(token_account, false),
            AccountMeta::new_readonly(self.authority, false),
        ]
    }
}
