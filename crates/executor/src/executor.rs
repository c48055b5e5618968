//! The executor session.

use crate::{
    ConfigError, ConfirmationConfig, ExecutorConfig, ExecutorError, Invocation, Ledger,
    SubmitError, Transaction, TransactionFailure, TransactionStatus,
};
use solanoid_codec::InstructionData;
use solanoid_core::Instruction;
use solanoid_types::{Account, AccountMeta, Keypair, Pubkey, Signature};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A confirmed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvokeOutcome {
    /// Transaction id.
    pub signature: Signature,
    /// Slot the transaction was confirmed in.
    pub slot: u64,
}

/// Builds, signs, submits and confirms instructions for one program.
///
/// A session holds only read-only configuration, so one `Executor` may be
/// shared across tasks; per-call signers and metas travel in the
/// [`Invocation`] passed to each call.
pub struct Executor {
    ledger: Arc<dyn Ledger>,
    signer: Keypair,
    config: ExecutorConfig,
    confirmation: ConfirmationConfig,
}

impl Executor {
    /// Bind a session. Fails fast on invalid bindings.
    pub fn new(
        ledger: Arc<dyn Ledger>,
        signer: Keypair,
        config: ExecutorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            ledger,
            signer,
            config,
            confirmation: ConfirmationConfig::default(),
        })
    }

    /// Bind a session from base58 text: the signer's private key and the
    /// program, state, multisig and derivation addresses. Empty optional
    /// addresses mean absent.
    pub fn configure(
        ledger: Arc<dyn Ledger>,
        signer_private_key: &str,
        program_id: &str,
        state_account: &str,
        multisig_account: &str,
        derivation_account: &str,
    ) -> Result<Self, ConfigError> {
        if signer_private_key.trim().is_empty() {
            return Err(ConfigError::Missing("signer private key"));
        }
        let signer = Keypair::from_base58_string(signer_private_key)?;
        let config = ExecutorConfig::from_base58(
            program_id,
            state_account,
            multisig_account,
            derivation_account,
        )?;
        Self::new(ledger, signer, config)
    }

    pub fn with_confirmation(mut self, confirmation: ConfirmationConfig) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn program_id(&self) -> Pubkey {
        self.config.program_id
    }

    pub fn state_account(&self) -> Pubkey {
        self.config.state_account
    }

    /// The session's primary signer.
    pub fn signer(&self) -> Pubkey {
        self.signer.pubkey()
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    /// Assemble the ledger instruction for `invocation`.
    ///
    /// Accounts, in order: state account, multisig account (if any),
    /// primary signer, extra signers, extra metas, then the program id.
    /// When the session has a derivation account it takes the program id's
    /// place in that last slot; Nebula's `UpdateOracles` reads the bound
    /// Gravity state from there.
    pub fn instruction_for<I: InstructionData>(&self, invocation: &Invocation<I>) -> Instruction {
        let primary = invocation.primary_signer().unwrap_or(&self.signer);

        let mut accounts = Vec::with_capacity(4 + invocation.signers().len() + invocation.metas().len());
        accounts.push(AccountMeta::new(self.config.state_account, false));
        if let Some(multisig) = self.config.multisig_account {
            accounts.push(AccountMeta::new(multisig, false));
        }
        accounts.push(AccountMeta::signer(primary.pubkey()));
        accounts.extend(
            invocation
                .signers()
                .iter()
                .map(|kp| AccountMeta::new_readonly(kp.pubkey(), true)),
        );
        accounts.extend_from_slice(invocation.metas());
        accounts.push(AccountMeta::new_readonly(
            self.config.derivation_account.unwrap_or(self.config.program_id),
            false,
        ));

        Instruction::new(self.config.program_id, invocation.instruction(), accounts)
    }

    /// Invoke with no per-call signers or metas.
    pub async fn build_and_invoke<I: InstructionData>(
        &self,
        instruction: I,
    ) -> Result<InvokeOutcome, ExecutorError> {
        self.invoke(Invocation::new(instruction)).await
    }

    /// Submit exactly one transaction and wait for its outcome.
    pub async fn invoke<I: InstructionData>(
        &self,
        invocation: Invocation<I>,
    ) -> Result<InvokeOutcome, ExecutorError> {
        let description = invocation.describe();
        let signature = self.submit(&invocation).await?;
        self.confirm(signature, &description).await
    }

    /// Sign and send without waiting for confirmation.
    pub async fn submit<I: InstructionData>(
        &self,
        invocation: &Invocation<I>,
    ) -> Result<Signature, ExecutorError> {
        let description = invocation.describe();
        let instruction = self.instruction_for(invocation);
        let payer = invocation.primary_signer().unwrap_or(&self.signer);
        let cosigners: Vec<&Keypair> = invocation.signers().iter().collect();

        let blockhash = self
            .ledger
            .latest_blockhash()
            .await
            .map_err(|source| ExecutorError::Transport {
                instruction: description.clone(),
                source,
            })?;

        let transaction = Transaction::new_signed(&[instruction], payer, &cosigners, blockhash)
            .and_then(|tx| tx.check_size().map(|_| tx))
            .map_err(|e| ExecutorError::Malformed {
                instruction: description.clone(),
                reason: e.to_string(),
            })?;

        debug!(
            instruction = %description,
            program = %self.config.program_id,
            signature = %transaction.id(),
            signers = transaction.signatures.len(),
            "Submitting transaction"
        );

        match self.ledger.send_transaction(&transaction).await {
            Ok(signature) => Ok(signature),
            Err(SubmitError::Transport(source)) => Err(ExecutorError::Transport {
                instruction: description,
                source,
            }),
            Err(SubmitError::Rejected(failure)) => Err(self.failure(description, failure)),
        }
    }

    /// Poll until `signature` is confirmed or failed, or the confirmation
    /// timeout elapses.
    ///
    /// Transport errors while polling are logged and polling continues: the
    /// transaction is already submitted, so only the timeout ends the wait.
    pub async fn confirm(
        &self,
        signature: Signature,
        description: &str,
    ) -> Result<InvokeOutcome, ExecutorError> {
        let poll = async {
            loop {
                match self.ledger.transaction_status(&signature).await {
                    Ok(TransactionStatus::Confirmed { slot }) => {
                        return Ok(InvokeOutcome { signature, slot });
                    }
                    Ok(TransactionStatus::Failed { failure, .. }) => {
                        return Err(self.failure(description.to_string(), failure));
                    }
                    Ok(TransactionStatus::Pending) => {}
                    Err(e) => {
                        warn!(%signature, error = %e, "Status query failed, still waiting");
                    }
                }
                tokio::time::sleep(self.confirmation.poll_interval()).await;
            }
        };

        match tokio::time::timeout(self.confirmation.timeout(), poll).await {
            Ok(Ok(outcome)) => {
                info!(
                    instruction = %description,
                    program = %self.config.program_id,
                    signature = %outcome.signature,
                    slot = outcome.slot,
                    "Transaction confirmed"
                );
                Ok(outcome)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(instruction = %description, %signature, "Confirmation timed out, outcome unknown");
                Err(ExecutorError::ConfirmationTimeout {
                    instruction: description.to_string(),
                    signature,
                })
            }
        }
    }

    /// Current status of a previously submitted transaction.
    pub async fn query_status(&self, signature: &Signature) -> Result<TransactionStatus, ExecutorError> {
        self.ledger
            .transaction_status(signature)
            .await
            .map_err(|source| ExecutorError::Transport {
                instruction: format!("status({})", signature),
                source,
            })
    }

    /// Read an account, failing if it does not exist.
    pub async fn fetch_account(&self, pubkey: &Pubkey) -> Result<Account, ExecutorError> {
        self.ledger
            .get_account(pubkey)
            .await
            .map_err(|source| ExecutorError::Transport {
                instruction: format!("getAccount({})", pubkey),
                source,
            })?
            .ok_or_else(|| ExecutorError::AccountData {
                account: *pubkey,
                reason: "account not found".into(),
            })
    }

    fn failure(&self, instruction: String, failure: TransactionFailure) -> ExecutorError {
        let error = match failure {
            TransactionFailure::Instruction { kind, .. } => ExecutorError::Rejected {
                instruction,
                program_id: self.config.program_id,
                kind,
            },
            failure => ExecutorError::TransactionFailed {
                instruction,
                failure,
            },
        };
        warn!(program = %self.config.program_id, error = %error, "Transaction rejected");
        error
    }
}
