//! Token program instruction and account layouts.
//!
//! The bridge mints and burns through an external token program with the
//! widely deployed SPL layout: 82-byte mints, 165-byte token accounts,
//! fixed-width four-byte option tags in account data and one-byte option
//! tags in instruction data.

use crate::{CodecError, InstructionData, Reader, Writer};
use solanoid_types::Pubkey;

/// Which authority [`TokenInstruction::SetAuthority`] replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AuthorityType {
    MintTokens = 0,
    FreezeAccount = 1,
    AccountOwner = 2,
    CloseAccount = 3,
}

impl TryFrom<u8> for AuthorityType {
    type Error = CodecError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(AuthorityType::MintTokens),
            1 => Ok(AuthorityType::FreezeAccount),
            2 => Ok(AuthorityType::AccountOwner),
            3 => Ok(AuthorityType::CloseAccount),
            tag => Err(CodecError::InvalidTag {
                what: "authority type",
                tag: tag as u32,
            }),
        }
    }
}

/// Token program instructions used by the bridge and its operators.
///
/// Account lists:
/// - `InitializeMint`: `[mint(w)]`
/// - `InitializeAccount`: `[account(w), mint, owner]`
/// - `Approve`: `[source(w), delegate, owner(s)]`
/// - `SetAuthority`: `[mint_or_account(w), current_authority(s)]`
/// - `MintTo`: `[mint(w), destination(w), mint_authority(s)]`
/// - `Burn`: `[account(w), mint(w), owner_or_delegate(s)]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenInstruction {
    InitializeMint {
        decimals: u8,
        mint_authority: Pubkey,
        freeze_authority: Option<Pubkey>,
    },
    InitializeAccount,
    Approve {
        amount: u64,
    },
    SetAuthority {
        authority_type: AuthorityType,
        new_authority: Option<Pubkey>,
    },
    MintTo {
        amount: u64,
    },
    Burn {
        amount: u64,
    },
}

impl InstructionData for TokenInstruction {
    fn encode(&self) -> Vec<u8> {
        match self {
            TokenInstruction::InitializeMint {
                decimals,
                mint_authority,
                freeze_authority,
            } => Writer::with_tag(0)
                .u8(*decimals)
                .pubkey(mint_authority)
                .pubkey_option(freeze_authority.as_ref())
                .finish(),
            TokenInstruction::InitializeAccount => Writer::with_tag(1).finish(),
            TokenInstruction::Approve { amount } => Writer::with_tag(4).u64(*amount).finish(),
            TokenInstruction::SetAuthority {
                authority_type,
                new_authority,
            } => Writer::with_tag(6)
                .u8(*authority_type as u8)
                .pubkey_option(new_authority.as_ref())
                .finish(),
            TokenInstruction::MintTo { amount } => Writer::with_tag(7).u64(*amount).finish(),
            TokenInstruction::Burn { amount } => Writer::with_tag(8).u64(*amount).finish(),
        }
    }

    fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(data);
        let tag = r.u8().map_err(|_| CodecError::Empty)?;
        let ix = match tag {
            0 => TokenInstruction::InitializeMint {
                decimals: r.u8()?,
                mint_authority: r.pubkey()?,
                freeze_authority: r.pubkey_option()?,
            },
            1 => TokenInstruction::InitializeAccount,
            4 => TokenInstruction::Approve { amount: r.u64()? },
            6 => TokenInstruction::SetAuthority {
                authority_type: AuthorityType::try_from(r.u8()?)?,
                new_authority: r.pubkey_option()?,
            },
            7 => TokenInstruction::MintTo { amount: r.u64()? },
            8 => TokenInstruction::Burn { amount: r.u64()? },
            tag => {
                return Err(CodecError::UnknownDiscriminant {
                    program: "token",
                    tag,
                })
            }
        };
        r.finish()?;
        Ok(ix)
    }

    fn kind(&self) -> &'static str {
        match self {
            TokenInstruction::InitializeMint { .. } => "InitializeMint",
            TokenInstruction::InitializeAccount => "InitializeAccount",
            TokenInstruction::Approve { .. } => "Approve",
            TokenInstruction::SetAuthority { .. } => "SetAuthority",
            TokenInstruction::MintTo { .. } => "MintTo",
            TokenInstruction::Burn { .. } => "Burn",
        }
    }

    fn describe(&self) -> String {
        match self {
            TokenInstruction::Approve { amount }
            | TokenInstruction::MintTo { amount }
            | TokenInstruction::Burn { amount } => format!("{}(amount={})", self.kind(), amount),
            other => other.kind().to_string(),
        }
    }
}

/// A token mint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mint {
    pub mint_authority: Option<Pubkey>,
    pub supply: u64,
    pub decimals: u8,
    pub is_initialized: bool,
    pub freeze_authority: Option<Pubkey>,
}

impl Mint {
    /// Packed size.
    pub const LEN: usize = 82;

    pub fn pack(&self) -> Vec<u8> {
        Writer::with_capacity(Self::LEN)
            .pubkey_coption(self.mint_authority.as_ref())
            .u64(self.supply)
            .u8(self.decimals)
            .u8(self.is_initialized as u8)
            .pubkey_coption(self.freeze_authority.as_ref())
            .finish()
    }

    pub fn unpack(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() != Self::LEN {
            return Err(CodecError::InvalidLength {
                what: "mint",
                len: data.len(),
            });
        }
        let mut r = Reader::new(data);
        let mint = Mint {
            mint_authority: r.pubkey_coption()?,
            supply: r.u64()?,
            decimals: r.u8()?,
            is_initialized: read_bool(&mut r)?,
            freeze_authority: r.pubkey_coption()?,
        };
        r.finish()?;
        Ok(mint)
    }
}

/// Lifecycle of a token account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum AccountState {
    #[default]
    Uninitialized = 0,
    Initialized = 1,
    Frozen = 2,
}

/// A token holding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
    pub delegate: Option<Pubkey>,
    pub state: AccountState,
    pub is_native: Option<u64>,
    pub delegated_amount: u64,
    pub close_authority: Option<Pubkey>,
}

impl TokenAccount {
    /// Packed size.
    pub const LEN: usize = 165;

    pub fn pack(&self) -> Vec<u8> {
        Writer::with_capacity(Self::LEN)
            .pubkey(&self.mint)
            .pubkey(&self.owner)
            .u64(self.amount)
            .pubkey_coption(self.delegate.as_ref())
            .u8(self.state as u8)
            .u64_coption(self.is_native)
            .u64(self.delegated_amount)
            .pubkey_coption(self.close_authority.as_ref())
            .finish()
    }

    pub fn unpack(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() != Self::LEN {
            return Err(CodecError::InvalidLength {
                what: "token account",
                len: data.len(),
            });
        }
        let mut r = Reader::new(data);
        let account = TokenAccount {
            mint: r.pubkey()?,
            owner: r.pubkey()?,
            amount: r.u64()?,
            delegate: r.pubkey_coption()?,
            state: match r.u8()? {
                0 => AccountState::Uninitialized,
                1 => AccountState::Initialized,
                2 => AccountState::Frozen,
                tag => {
                    return Err(CodecError::InvalidTag {
                        what: "account state",
                        tag: tag as u32,
                    })
                }
            },
            is_native: r.u64_coption()?,
            delegated_amount: r.u64()?,
            close_authority: r.pubkey_coption()?,
        };
        r.finish()?;
        Ok(account)
    }

    pub fn is_initialized(&self) -> bool {
        self.state != AccountState::Uninitialized
    }
}

fn read_bool(r: &mut Reader<'_>) -> Result<bool, CodecError> {
    match r.u8()? {
        0 => Ok(false),
        1 => Ok(true),
        tag => Err(CodecError::InvalidTag {
            what: "bool",
            tag: tag as u32,
        }),
    }
}
