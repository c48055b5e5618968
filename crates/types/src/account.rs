//! Account metadata and account contents as the ledger stores them.

use crate::Pubkey;

/// One entry of an instruction's account list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountMeta {
    /// Account address.
    pub pubkey: Pubkey,
    /// Whether the transaction must carry this account's signature.
    pub is_signer: bool,
    /// Whether the instruction may modify the account.
    pub is_writable: bool,
}

impl AccountMeta {
    /// A writable account.
    pub fn new(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    /// A read-only account.
    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }

    /// A writable signer.
    pub fn signer(pubkey: Pubkey) -> Self {
        Self::new(pubkey, true)
    }
}

/// Contents of a ledger account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    /// Native balance.
    pub lamports: u64,
    /// Raw account data.
    pub data: Vec<u8>,
    /// Program that owns the account and alone may write its data.
    pub owner: Pubkey,
    /// Whether the account holds a deployed program.
    pub executable: bool,
}

impl Account {
    /// A zero-filled data account of `space` bytes owned by `owner`.
    pub fn new(lamports: u64, space: usize, owner: Pubkey) -> Self {
        Self {
            lamports,
            data: vec![0u8; space],
            owner,
            executable: false,
        }
    }

    /// Whether every data byte is zero (a freshly allocated account).
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }
}
