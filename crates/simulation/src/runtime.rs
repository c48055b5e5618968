//! Instruction execution against an account snapshot.
//!
//! ```text
//! invoke(ix, privileges, depth)
//!   ├─ check ix's signer/writable flags against the caller's privileges
//!   ├─ program.process(ctx)          (synchronous, no I/O)
//!   ├─ write back changed accounts   (writable + owned by the program)
//!   └─ run returned actions in order
//!        ├─ Invoke → invoke(nested, caller privileges + PDA signer, depth+1)
//!        └─ Emit   → append to the transaction log
//! ```
//!
//! Any error aborts the transaction; the caller throws the snapshot away.

use solanoid_core::{
    Instruction, InvokeContext, KeyedAccount, Program, ProgramAction, ProgramError, ProgramEvent,
};
use solanoid_types::{create_program_address, Account, Pubkey};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::trace;

pub(crate) type Accounts = im::HashMap<Pubkey, Account>;

/// Signer and writable privileges an invocation may pass on.
#[derive(Debug, Clone, Default)]
pub(crate) struct Privileges {
    signers: HashSet<Pubkey>,
    writable: HashSet<Pubkey>,
}

impl Privileges {
    /// Privileges of a top-level instruction: whatever the message grants.
    pub(crate) fn top_level(instruction: &Instruction) -> Self {
        Self::from_metas(
            instruction
                .accounts
                .iter()
                .map(|m| (m.pubkey, m.is_signer, m.is_writable)),
        )
    }

    fn from_context(ctx: &InvokeContext) -> Self {
        Self::from_metas(
            ctx.accounts()
                .iter()
                .map(|a| (a.key, a.is_signer, a.is_writable)),
        )
    }

    fn from_metas(metas: impl Iterator<Item = (Pubkey, bool, bool)>) -> Self {
        let mut privileges = Self::default();
        for (key, is_signer, is_writable) in metas {
            if is_signer {
                privileges.signers.insert(key);
            }
            if is_writable {
                privileges.writable.insert(key);
            }
        }
        privileges
    }

    fn check(&self, instruction: &Instruction) -> Result<(), ProgramError> {
        for meta in &instruction.accounts {
            if meta.is_signer && !self.signers.contains(&meta.pubkey) {
                return Err(ProgramError::PrivilegeEscalation(meta.pubkey));
            }
            if meta.is_writable && !self.writable.contains(&meta.pubkey) {
                return Err(ProgramError::PrivilegeEscalation(meta.pubkey));
            }
        }
        Ok(())
    }
}

/// Executes one transaction's instructions.
pub(crate) struct Runtime<'a> {
    programs: &'a HashMap<Pubkey, Arc<dyn Program>>,
    max_depth: usize,
    events: Vec<ProgramEvent>,
}

impl<'a> Runtime<'a> {
    pub(crate) fn new(programs: &'a HashMap<Pubkey, Arc<dyn Program>>, max_depth: usize) -> Self {
        Self {
            programs,
            max_depth,
            events: Vec::new(),
        }
    }

    /// Events emitted so far, in emission order.
    pub(crate) fn into_events(self) -> Vec<ProgramEvent> {
        self.events
    }

    /// Run a top-level instruction.
    pub(crate) fn execute(
        &mut self,
        accounts: &mut Accounts,
        instruction: &Instruction,
    ) -> Result<(), ProgramError> {
        let privileges = Privileges::top_level(instruction);
        self.invoke(accounts, instruction, None, &privileges, 1)
    }

    fn invoke(
        &mut self,
        accounts: &mut Accounts,
        instruction: &Instruction,
        caller_program: Option<Pubkey>,
        privileges: &Privileges,
        depth: usize,
    ) -> Result<(), ProgramError> {
        if depth > self.max_depth {
            return Err(ProgramError::CallDepth);
        }
        privileges.check(instruction)?;
        let program = self
            .programs
            .get(&instruction.program_id)
            .ok_or(ProgramError::IncorrectProgramId)?;

        let before: Vec<KeyedAccount> = instruction
            .accounts
            .iter()
            .map(|m| {
                KeyedAccount::new(
                    m.pubkey,
                    m.is_signer,
                    m.is_writable,
                    accounts.get(&m.pubkey).cloned().unwrap_or_default(),
                )
            })
            .collect();
        let mut ctx = InvokeContext::new(instruction.program_id, caller_program, before.clone());

        trace!(program = program.name(), depth, "invoke");
        let actions = program.process(&mut ctx, &instruction.data)?;

        for (old, new) in before.iter().zip(ctx.accounts()) {
            if old.account == new.account {
                continue;
            }
            if !old.is_writable {
                return Err(ProgramError::ReadonlyDataModified(old.key));
            }
            if old.account.owner != instruction.program_id
                || new.account.owner != old.account.owner
                || new.account.lamports != old.account.lamports
                || new.account.executable != old.account.executable
            {
                return Err(ProgramError::ExternalAccountDataModified(old.key));
            }
            accounts.insert(new.key, new.account.clone());
        }

        let inherited = Privileges::from_context(&ctx);
        for action in actions {
            match action {
                ProgramAction::Invoke {
                    instruction: nested,
                    signer_seeds,
                } => {
                    let mut privileges = inherited.clone();
                    if !signer_seeds.is_empty() {
                        let seeds: Vec<&[u8]> = signer_seeds.iter().map(Vec::as_slice).collect();
                        let pda = create_program_address(&seeds, &instruction.program_id)
                            .map_err(|e| ProgramError::InvalidAccountData(e.to_string()))?;
                        privileges.signers.insert(pda);
                    }
                    self.invoke(
                        accounts,
                        &nested,
                        Some(instruction.program_id),
                        &privileges,
                        depth + 1,
                    )?;
                }
                ProgramAction::Emit(event) => self.events.push(event),
            }
        }
        Ok(())
    }
}
