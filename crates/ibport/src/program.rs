//! The bridge program.
//!
//! Accounts:
//! - `Init`: `[state(w), caller(s), ..]`
//! - `CreateTransferUnwrapRequest`:
//!   `[state(w), token owner(s), token program, mint(w), token account(w), port authority, ..]`
//! - `AttachValue`:
//!   `[state(w), hub authority(s), token program, mint(w), recipient(w), port authority, ..]`

use crate::state::{IBPortState, SwapRecord, UnwrapRequest};
use solanoid_codec::token::{Mint, TokenAccount, TokenInstruction};
use solanoid_codec::{
    to_base_units, CrossChainMintVector, IBPortInstruction, InstructionData, PORT_AUTHORITY_SEED,
};
use solanoid_core::{
    Instruction, InvokeContext, Program, ProgramAction, ProgramError, ProgramEvent, ProtocolError,
};
use solanoid_types::{find_program_address, AccountMeta, ForeignAddress, PdaError, Pubkey};
use tracing::{debug, info, warn};

const STATE: usize = 0;
const CALLER: usize = 1;
const TOKEN_PROGRAM: usize = 2;
const MINT: usize = 3;
const TOKEN_ACCOUNT: usize = 4;
const AUTHORITY: usize = 5;

/// The port's authority PDA and its bump. It must hold mint authority and
/// receives the delegations that back unwrap requests.
pub fn port_authority(program_id: &Pubkey) -> Result<(Pubkey, u8), PdaError> {
    find_program_address(&[PORT_AUTHORITY_SEED], program_id)
}

/// IBPort bridge program.
#[derive(Debug, Default, Clone, Copy)]
pub struct IBPortProgram;

impl Program for IBPortProgram {
    fn name(&self) -> &'static str {
        "ibport"
    }

    fn process(
        &self,
        ctx: &mut InvokeContext,
        data: &[u8],
    ) -> Result<Vec<ProgramAction>, ProgramError> {
        let instruction = IBPortInstruction::decode(data)?;
        let description = instruction.describe();
        debug!(instruction = %description, "IBPort processing");
        let state = IBPortState::unpack(ctx.data(STATE)?)?;

        let result = match (instruction, state) {
            (
                IBPortInstruction::Init {
                    nebula,
                    token_program,
                },
                None,
            ) => init(ctx, nebula, token_program),
            (IBPortInstruction::Init { .. }, Some(_)) => {
                Err(ProtocolError::AlreadyInitialized.into())
            }
            (_, None) => Err(ProtocolError::NotInitialized.into()),
            (IBPortInstruction::CreateTransferUnwrapRequest { receiver, amount }, Some(state)) => {
                create_transfer_unwrap_request(ctx, state, receiver, amount)
            }
            (IBPortInstruction::AttachValue(vector), Some(state)) => {
                attach_value(ctx, state, vector)
            }
        };
        if let Err(e) = &result {
            warn!(instruction = %description, error = %e, "IBPort instruction rejected");
        }
        result
    }
}

fn init(
    ctx: &mut InvokeContext,
    nebula: Pubkey,
    token_program: Pubkey,
) -> Result<Vec<ProgramAction>, ProgramError> {
    ctx.require_signer(CALLER)?;
    ctx.write_data(STATE, &IBPortState::new(nebula, token_program).pack())?;
    info!(%nebula, %token_program, "IBPort initialized");
    Ok(vec![ProgramAction::Emit(ProgramEvent::PortInitialized {
        nebula,
        token_program,
    })])
}

/// Burn delegated tokens and log the outbound transfer.
fn create_transfer_unwrap_request(
    ctx: &mut InvokeContext,
    mut state: IBPortState,
    receiver: ForeignAddress,
    amount: f64,
) -> Result<Vec<ProgramAction>, ProgramError> {
    let owner = ctx.require_signer(CALLER)?;
    let (authority, bump) = check_token_accounts(ctx, &state)?;

    if !amount.is_finite() || amount <= 0.0 {
        return Err(ProtocolError::InvalidAmount.into());
    }
    let mint = Mint::unpack(ctx.data(MINT)?).map_err(account_data)?;
    let raw = to_base_units(amount, mint.decimals).map_err(|e| {
        debug!(error = %e, "Unwrap amount not representable");
        ProgramError::from(ProtocolError::InvalidAmount)
    })?;
    if raw == 0 {
        return Err(ProtocolError::InvalidAmount.into());
    }

    let sender = ctx.key(TOKEN_ACCOUNT)?;
    let holding = TokenAccount::unpack(ctx.data(TOKEN_ACCOUNT)?).map_err(account_data)?;
    if holding.mint != ctx.key(MINT)? {
        return Err(ProtocolError::AccountMismatch.into());
    }
    if holding.owner != owner {
        return Err(ProtocolError::UnauthorizedCaller.into());
    }
    if holding.delegate != Some(authority) || holding.delegated_amount < raw {
        debug!(
            delegate = ?holding.delegate,
            delegated = holding.delegated_amount,
            needed = raw,
            "Unwrap not covered by delegation"
        );
        return Err(ProtocolError::InsufficientDelegation.into());
    }
    if holding.amount < raw {
        debug!(balance = holding.amount, needed = raw, "Unwrap exceeds token balance");
        return Err(ProtocolError::InsufficientBalance.into());
    }

    let request = UnwrapRequest {
        seq: state.next_seq(),
        sender,
        receiver,
        amount: raw,
    };
    state.unwraps.push(request);
    ctx.write_data(STATE, &state.pack())?;

    let burn = Instruction::new(
        state.token_program,
        &TokenInstruction::Burn { amount: raw },
        vec![
            AccountMeta::new(sender, false),
            AccountMeta::new(ctx.key(MINT)?, false),
            AccountMeta::new_readonly(authority, true),
        ],
    );
    info!(seq = request.seq, %sender, %receiver, amount = raw, "Unwrap requested");
    Ok(vec![
        ProgramAction::invoke_signed(burn, &[PORT_AUTHORITY_SEED, &[bump]]),
        ProgramAction::Emit(ProgramEvent::UnwrapRequested {
            seq: request.seq,
            sender,
            receiver,
            amount: raw,
        }),
    ])
}

/// Mint for a swap delivered by the bound hub. The swap id is recorded
/// before the mint is issued, in the same transaction.
fn attach_value(
    ctx: &mut InvokeContext,
    mut state: IBPortState,
    vector: CrossChainMintVector,
) -> Result<Vec<ProgramAction>, ProgramError> {
    if ctx.caller_program() != Some(state.nebula) || !ctx.account(CALLER)?.is_signer {
        debug!(caller = ?ctx.caller_program(), nebula = %state.nebula, "AttachValue not from bound hub");
        return Err(ProtocolError::UnauthorizedCaller.into());
    }
    if state.swap(&vector.swap_id).is_some() {
        debug!(swap = %vector.swap_id, "Swap id already attached");
        return Err(ProtocolError::DuplicateSwapId.into());
    }
    let (authority, bump) = check_token_accounts(ctx, &state)?;
    let recipient = ctx.key(TOKEN_ACCOUNT)?;
    if vector.recipient != recipient {
        return Err(ProtocolError::AccountMismatch.into());
    }
    let mint = Mint::unpack(ctx.data(MINT)?).map_err(account_data)?;
    let raw = to_base_units(vector.amount, mint.decimals).map_err(|e| {
        debug!(error = %e, "Attached amount not representable");
        ProgramError::from(ProtocolError::InvalidAmount)
    })?;
    if mint.supply.checked_add(raw).is_none() {
        debug!(supply = mint.supply, amount = raw, "Attached amount overflows mint supply");
        return Err(ProtocolError::InvalidAmount.into());
    }

    state.swaps.push(SwapRecord {
        swap_id: vector.swap_id,
        recipient,
        amount: raw,
    });
    ctx.write_data(STATE, &state.pack())?;

    let mint_to = Instruction::new(
        state.token_program,
        &TokenInstruction::MintTo { amount: raw },
        vec![
            AccountMeta::new(ctx.key(MINT)?, false),
            AccountMeta::new(recipient, false),
            AccountMeta::new_readonly(authority, true),
        ],
    );
    info!(swap = %vector.swap_id, %recipient, amount = raw, "Swap attached");
    Ok(vec![
        ProgramAction::invoke_signed(mint_to, &[PORT_AUTHORITY_SEED, &[bump]]),
        ProgramAction::Emit(ProgramEvent::SwapAttached {
            swap_id: vector.swap_id,
            recipient,
            amount: raw,
        }),
    ])
}

/// The token program must be the bound one and the authority account must be
/// this port's PDA.
fn check_token_accounts(
    ctx: &InvokeContext,
    state: &IBPortState,
) -> Result<(Pubkey, u8), ProgramError> {
    if ctx.key(TOKEN_PROGRAM)? != state.token_program {
        return Err(ProtocolError::AccountMismatch.into());
    }
    let (authority, bump) = port_authority(&ctx.program_id())
        .map_err(|e| ProgramError::InvalidAccountData(e.to_string()))?;
    if ctx.key(AUTHORITY)? != authority {
        return Err(ProtocolError::AccountMismatch.into());
    }
    Ok((authority, bump))
}

fn account_data(e: solanoid_codec::CodecError) -> ProgramError {
    ProgramError::InvalidAccountData(e.to_string())
}
