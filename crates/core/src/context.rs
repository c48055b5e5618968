//! The account view a program runs against.

use crate::ProgramError;
use solanoid_types::{Account, Pubkey};

/// One account as seen by an executing program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedAccount {
    pub key: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
    pub account: Account,
}

impl KeyedAccount {
    pub fn new(key: Pubkey, is_signer: bool, is_writable: bool, account: Account) -> Self {
        Self {
            key,
            is_signer,
            is_writable,
            account,
        }
    }
}

/// Execution context for one (possibly nested) program invocation.
///
/// Holds copies of the instruction's accounts in instruction order. The
/// runtime writes back whatever the program changed once `process` returns.
#[derive(Debug, Clone)]
pub struct InvokeContext {
    program_id: Pubkey,
    caller_program: Option<Pubkey>,
    accounts: Vec<KeyedAccount>,
}

impl InvokeContext {
    pub fn new(program_id: Pubkey, caller_program: Option<Pubkey>, accounts: Vec<KeyedAccount>) -> Self {
        Self {
            program_id,
            caller_program,
            accounts,
        }
    }

    /// The executing program.
    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// The program that issued this call, if it is a nested invocation.
    pub fn caller_program(&self) -> Option<Pubkey> {
        self.caller_program
    }

    pub fn accounts(&self) -> &[KeyedAccount] {
        &self.accounts
    }

    pub fn into_accounts(self) -> Vec<KeyedAccount> {
        self.accounts
    }

    /// Account at `index`, or `NotEnoughAccountKeys`.
    pub fn account(&self, index: usize) -> Result<&KeyedAccount, ProgramError> {
        self.accounts
            .get(index)
            .ok_or(ProgramError::NotEnoughAccountKeys)
    }

    pub fn key(&self, index: usize) -> Result<Pubkey, ProgramError> {
        Ok(self.account(index)?.key)
    }

    pub fn data(&self, index: usize) -> Result<&[u8], ProgramError> {
        Ok(&self.account(index)?.account.data)
    }

    /// Require account `index` to be a signer.
    pub fn require_signer(&self, index: usize) -> Result<Pubkey, ProgramError> {
        let account = self.account(index)?;
        if !account.is_signer {
            return Err(ProgramError::MissingRequiredSignature(account.key));
        }
        Ok(account.key)
    }

    /// Keys of every signing account, in instruction order.
    pub fn signers(&self) -> impl Iterator<Item = &Pubkey> {
        self.accounts
            .iter()
            .filter(|a| a.is_signer)
            .map(|a| &a.key)
    }

    pub fn is_signer(&self, key: &Pubkey) -> bool {
        self.accounts.iter().any(|a| a.is_signer && &a.key == key)
    }

    /// Overwrite the start of account `index`'s data with `bytes`.
    ///
    /// The account must be writable and owned by the executing program, and
    /// large enough to hold `bytes`.
    pub fn write_data(&mut self, index: usize, bytes: &[u8]) -> Result<(), ProgramError> {
        let program_id = self.program_id;
        let account = self
            .accounts
            .get_mut(index)
            .ok_or(ProgramError::NotEnoughAccountKeys)?;
        if !account.is_writable {
            return Err(ProgramError::ReadonlyDataModified(account.key));
        }
        if account.account.owner != program_id {
            return Err(ProgramError::ExternalAccountDataModified(account.key));
        }
        let len = account.account.data.len();
        if bytes.len() > len {
            return Err(ProgramError::AccountDataTooSmall {
                needed: bytes.len(),
                len,
            });
        }
        account.account.data[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}
