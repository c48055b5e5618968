//! Native token program.
//!
//! Implements the subset of the SPL token program the bridge relies on,
//! over the same account layouts and instruction encoding, so the IBPort
//! program can mint and burn against it exactly as it would on a live
//! ledger.

use solanoid_codec::{
    AccountState, AuthorityType, InstructionData, Mint, TokenAccount, TokenInstruction,
};
use solanoid_core::{InvokeContext, Program, ProgramAction, ProgramError, ProgramEvent};
use solanoid_types::Pubkey;
use tracing::trace;

/// Address of the token program (`TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`).
pub const TOKEN_PROGRAM_ID: Pubkey = Pubkey::new([
    6, 221, 246, 225, 215, 101, 161, 147, 217, 203, 225, 70, 206, 235, 121, 172, 28, 180, 133,
    237, 95, 91, 55, 145, 58, 140, 245, 133, 126, 255, 0, 169,
]);

/// Token program error codes, carried as `Custom(code)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[repr(u32)]
pub enum TokenError {
    #[error("insufficient funds")]
    InsufficientFunds = 1,

    #[error("invalid mint")]
    InvalidMint = 2,

    #[error("account not associated with this mint")]
    MintMismatch = 3,

    #[error("owner does not match")]
    OwnerMismatch = 4,

    #[error("fixed supply")]
    FixedSupply = 5,

    #[error("already in use")]
    AlreadyInUse = 6,

    #[error("state is uninitialized")]
    UninitializedState = 9,

    #[error("operation overflowed")]
    Overflow = 14,

    #[error("authority type not supported for this account")]
    AuthorityTypeNotSupported = 15,
}

impl From<TokenError> for ProgramError {
    fn from(e: TokenError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

/// The token program.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenProgram;

impl Program for TokenProgram {
    fn name(&self) -> &'static str {
        "token"
    }

    fn process(
        &self,
        ctx: &mut InvokeContext,
        data: &[u8],
    ) -> Result<Vec<ProgramAction>, ProgramError> {
        let instruction = TokenInstruction::decode(data)?;
        trace!(instruction = %instruction.describe(), "token");
        match instruction {
            TokenInstruction::InitializeMint {
                decimals,
                mint_authority,
                freeze_authority,
            } => initialize_mint(ctx, decimals, mint_authority, freeze_authority),
            TokenInstruction::InitializeAccount => initialize_account(ctx),
            TokenInstruction::Approve { amount } => approve(ctx, amount),
            TokenInstruction::SetAuthority {
                authority_type,
                new_authority,
            } => set_authority(ctx, authority_type, new_authority),
            TokenInstruction::MintTo { amount } => mint_to(ctx, amount),
            TokenInstruction::Burn { amount } => burn(ctx, amount),
        }
    }
}

fn initialize_mint(
    ctx: &mut InvokeContext,
    decimals: u8,
    mint_authority: Pubkey,
    freeze_authority: Option<Pubkey>,
) -> Result<Vec<ProgramAction>, ProgramError> {
    let mint = unpack_mint_unchecked(ctx, 0)?;
    if mint.is_initialized {
        return Err(TokenError::AlreadyInUse.into());
    }
    let mint = Mint {
        mint_authority: Some(mint_authority),
        supply: 0,
        decimals,
        is_initialized: true,
        freeze_authority,
    };
    ctx.write_data(0, &mint.pack())?;
    Ok(Vec::new())
}

fn initialize_account(ctx: &mut InvokeContext) -> Result<Vec<ProgramAction>, ProgramError> {
    let account = unpack_account_unchecked(ctx, 0)?;
    if account.is_initialized() {
        return Err(TokenError::AlreadyInUse.into());
    }
    let mint_key = ctx.key(1)?;
    load_mint(ctx, 1).map_err(|_| ProgramError::from(TokenError::InvalidMint))?;
    let account = TokenAccount {
        mint: mint_key,
        owner: ctx.key(2)?,
        state: AccountState::Initialized,
        ..Default::default()
    };
    ctx.write_data(0, &account.pack())?;
    Ok(Vec::new())
}

fn approve(ctx: &mut InvokeContext, amount: u64) -> Result<Vec<ProgramAction>, ProgramError> {
    let mut source = load_account(ctx, 0)?;
    let delegate = ctx.key(1)?;
    let owner = ctx.require_signer(2)?;
    if source.owner != owner {
        return Err(TokenError::OwnerMismatch.into());
    }
    source.delegate = Some(delegate);
    source.delegated_amount = amount;
    ctx.write_data(0, &source.pack())?;
    Ok(Vec::new())
}

fn set_authority(
    ctx: &mut InvokeContext,
    authority_type: AuthorityType,
    new_authority: Option<Pubkey>,
) -> Result<Vec<ProgramAction>, ProgramError> {
    let current = ctx.require_signer(1)?;
    if ctx.data(0)?.len() == Mint::LEN {
        let mut mint = load_mint(ctx, 0)?;
        let slot = match authority_type {
            AuthorityType::MintTokens => &mut mint.mint_authority,
            AuthorityType::FreezeAccount => &mut mint.freeze_authority,
            _ => return Err(TokenError::AuthorityTypeNotSupported.into()),
        };
        let authority = slot.ok_or(TokenError::FixedSupply)?;
        if authority != current {
            return Err(TokenError::OwnerMismatch.into());
        }
        *slot = new_authority;
        ctx.write_data(0, &mint.pack())?;
    } else {
        let mut account = load_account(ctx, 0)?;
        match authority_type {
            AuthorityType::AccountOwner => {
                if account.owner != current {
                    return Err(TokenError::OwnerMismatch.into());
                }
                account.owner = new_authority.ok_or(TokenError::InvalidMint)?;
                account.delegate = None;
                account.delegated_amount = 0;
            }
            AuthorityType::CloseAccount => {
                let authority = account.close_authority.unwrap_or(account.owner);
                if authority != current {
                    return Err(TokenError::OwnerMismatch.into());
                }
                account.close_authority = new_authority;
            }
            _ => return Err(TokenError::AuthorityTypeNotSupported.into()),
        }
        ctx.write_data(0, &account.pack())?;
    }
    Ok(Vec::new())
}

fn mint_to(ctx: &mut InvokeContext, amount: u64) -> Result<Vec<ProgramAction>, ProgramError> {
    let mint_key = ctx.key(0)?;
    let mut mint = load_mint(ctx, 0)?;
    let mut destination = load_account(ctx, 1)?;
    if destination.mint != mint_key {
        return Err(TokenError::MintMismatch.into());
    }
    let authority = mint.mint_authority.ok_or(TokenError::FixedSupply)?;
    if ctx.key(2)? != authority {
        return Err(TokenError::OwnerMismatch.into());
    }
    ctx.require_signer(2)?;

    mint.supply = mint.supply.checked_add(amount).ok_or(TokenError::Overflow)?;
    destination.amount = destination
        .amount
        .checked_add(amount)
        .ok_or(TokenError::Overflow)?;
    ctx.write_data(0, &mint.pack())?;
    ctx.write_data(1, &destination.pack())?;

    Ok(vec![ProgramAction::Emit(ProgramEvent::TokensMinted {
        mint: mint_key,
        destination: ctx.key(1)?,
        amount,
    })])
}

fn burn(ctx: &mut InvokeContext, amount: u64) -> Result<Vec<ProgramAction>, ProgramError> {
    let source_key = ctx.key(0)?;
    let mint_key = ctx.key(1)?;
    let mut source = load_account(ctx, 0)?;
    if source.mint != mint_key {
        return Err(TokenError::MintMismatch.into());
    }
    let mut mint = load_mint(ctx, 1)?;
    if source.amount < amount {
        return Err(TokenError::InsufficientFunds.into());
    }

    let authority = ctx.require_signer(2)?;
    if authority != source.owner {
        if source.delegate != Some(authority) {
            return Err(TokenError::OwnerMismatch.into());
        }
        if source.delegated_amount < amount {
            return Err(TokenError::InsufficientFunds.into());
        }
        source.delegated_amount -= amount;
        if source.delegated_amount == 0 {
            source.delegate = None;
        }
    }

    source.amount -= amount;
    mint.supply = mint.supply.checked_sub(amount).ok_or(TokenError::Overflow)?;
    ctx.write_data(0, &source.pack())?;
    ctx.write_data(1, &mint.pack())?;

    Ok(vec![ProgramAction::Emit(ProgramEvent::TokensBurned {
        mint: mint_key,
        source: source_key,
        amount,
    })])
}

fn check_owner(ctx: &InvokeContext, index: usize) -> Result<(), ProgramError> {
    if ctx.account(index)?.account.owner != TOKEN_PROGRAM_ID {
        return Err(ProgramError::IncorrectProgramId);
    }
    Ok(())
}

fn unpack_mint_unchecked(ctx: &InvokeContext, index: usize) -> Result<Mint, ProgramError> {
    check_owner(ctx, index)?;
    Mint::unpack(ctx.data(index)?).map_err(|e| ProgramError::InvalidAccountData(e.to_string()))
}

fn unpack_account_unchecked(ctx: &InvokeContext, index: usize) -> Result<TokenAccount, ProgramError> {
    check_owner(ctx, index)?;
    TokenAccount::unpack(ctx.data(index)?)
        .map_err(|e| ProgramError::InvalidAccountData(e.to_string()))
}

fn load_mint(ctx: &InvokeContext, index: usize) -> Result<Mint, ProgramError> {
    let mint = unpack_mint_unchecked(ctx, index)?;
    if !mint.is_initialized {
        return Err(TokenError::UninitializedState.into());
    }
    Ok(mint)
}

fn load_account(ctx: &InvokeContext, index: usize) -> Result<TokenAccount, ProgramError> {
    let account = unpack_account_unchecked(ctx, index)?;
    if !account.is_initialized() {
        return Err(TokenError::UninitializedState.into());
    }
    Ok(account)
}
