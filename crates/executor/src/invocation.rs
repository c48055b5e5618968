//! Per-call request values.

use solanoid_codec::InstructionData;
use solanoid_types::{AccountMeta, Keypair};

/// One executor call: the instruction plus everything that varies per call.
///
/// Built fresh for every invocation; nothing here outlives the call it is
/// passed to.
///
/// # Example
///
/// ```ignore
/// let invocation = Invocation::new(GravityInstruction::UpdateConsuls { bft, last_round, consuls })
///     .with_signers(current_consuls.iter().cloned());
/// executor.invoke(invocation).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Invocation<I> {
    instruction: I,
    primary_signer: Option<Keypair>,
    signers: Vec<Keypair>,
    metas: Vec<AccountMeta>,
}

impl<I: InstructionData> Invocation<I> {
    pub fn new(instruction: I) -> Self {
        Self {
            instruction,
            primary_signer: None,
            signers: Vec::new(),
            metas: Vec::new(),
        }
    }

    /// Sign and pay with `signer` instead of the session's signer.
    pub fn with_primary_signer(mut self, signer: Keypair) -> Self {
        self.primary_signer = Some(signer);
        self
    }

    /// Add a read-only signer after the primary signer.
    pub fn with_signer(mut self, signer: Keypair) -> Self {
        self.signers.push(signer);
        self
    }

    pub fn with_signers(mut self, signers: impl IntoIterator<Item = Keypair>) -> Self {
        self.signers.extend(signers);
        self
    }

    /// Add an account after the signers.
    pub fn with_meta(mut self, meta: AccountMeta) -> Self {
        self.metas.push(meta);
        self
    }

    pub fn with_metas(mut self, metas: impl IntoIterator<Item = AccountMeta>) -> Self {
        self.metas.extend(metas);
        self
    }

    pub fn instruction(&self) -> &I {
        &self.instruction
    }

    pub fn primary_signer(&self) -> Option<&Keypair> {
        self.primary_signer.as_ref()
    }

    pub fn signers(&self) -> &[Keypair] {
        &self.signers
    }

    pub fn metas(&self) -> &[AccountMeta] {
        &self.metas
    }

    pub fn describe(&self) -> String {
        self.instruction.describe()
    }
}

impl<I: InstructionData> From<I> for Invocation<I> {
    fn from(instruction: I) -> Self {
        Self::new(instruction)
    }
}
