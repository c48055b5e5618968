//! Outputs of program execution.

use solanoid_codec::InstructionData;
use solanoid_types::{AccountMeta, ForeignAddress, Hash, Pubkey, Round, SubscriptionId, SwapId};

/// A program call: target program, ordered accounts, wire data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

impl Instruction {
    /// Encode a typed instruction.
    pub fn new<I: InstructionData>(program_id: Pubkey, ix: &I, accounts: Vec<AccountMeta>) -> Self {
        Self {
            program_id,
            accounts,
            data: ix.encode(),
        }
    }

    /// Wrap pre-encoded data.
    pub fn new_with_bytes(program_id: Pubkey, data: Vec<u8>, accounts: Vec<AccountMeta>) -> Self {
        Self {
            program_id,
            accounts,
            data,
        }
    }
}

/// Something a program asks the runtime to do after it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramAction {
    /// Run `instruction` inside the current transaction.
    ///
    /// When `signer_seeds` is non-empty the runtime derives
    /// `create_program_address(signer_seeds, calling_program)` and marks that
    /// account as a signer of the nested call.
    Invoke {
        instruction: Instruction,
        signer_seeds: Vec<Vec<u8>>,
    },

    /// Append an event to the transaction log.
    Emit(ProgramEvent),
}

impl ProgramAction {
    /// A nested call without PDA signing.
    pub fn invoke(instruction: Instruction) -> Self {
        ProgramAction::Invoke {
            instruction,
            signer_seeds: Vec::new(),
        }
    }

    /// A nested call signed by the caller's PDA for `seeds`.
    pub fn invoke_signed(instruction: Instruction, seeds: &[&[u8]]) -> Self {
        ProgramAction::Invoke {
            instruction,
            signer_seeds: seeds.iter().map(|s| s.to_vec()).collect(),
        }
    }
}

/// Log records emitted by the programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramEvent {
    GravityInitialized {
        bft: u8,
        round: Round,
        consuls: Vec<Pubkey>,
    },
    ConsulsUpdated {
        bft: u8,
        round: Round,
        consuls: Vec<Pubkey>,
        signers: usize,
    },
    NebulaInitialized {
        bft: u8,
        gravity_state: Pubkey,
    },
    OraclesUpdated {
        bft: u8,
        round: Round,
        oracles: Vec<Pubkey>,
    },
    PulseRecorded {
        round: Round,
        data_hash: Hash,
    },
    Subscribed {
        subscription_id: SubscriptionId,
        subscriber: Pubkey,
    },
    ValueDelivered {
        subscription_id: SubscriptionId,
        round: Round,
        subscriber_program: Pubkey,
    },
    PortInitialized {
        nebula: Pubkey,
        token_program: Pubkey,
    },
    SwapAttached {
        swap_id: SwapId,
        recipient: Pubkey,
        /// Base units.
        amount: u64,
    },
    UnwrapRequested {
        seq: u64,
        sender: Pubkey,
        receiver: ForeignAddress,
        /// Base units.
        amount: u64,
    },
    TokensMinted {
        mint: Pubkey,
        destination: Pubkey,
        amount: u64,
    },
    TokensBurned {
        mint: Pubkey,
        source: Pubkey,
        amount: u64,
    },
}
