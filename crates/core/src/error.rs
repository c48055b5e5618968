//! Program error codes.

use solanoid_codec::CodecError;
use solanoid_types::Pubkey;
use std::fmt;

/// Protocol-level refusals shared by the oracle and bridge programs.
///
/// Codes are stable: they travel inside ledger rejections as
/// `Custom(code)` and are decoded back by clients. They start at
/// [`ProtocolError::BASE`], above the small codes the token program and
/// other collaborators use, so a refusal raised by a nested call is never
/// read as one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[repr(u32)]
pub enum ProtocolError {
    #[error("invalid instruction")]
    InvalidInstruction = 0,

    /// Swap id already attached.
    #[error("double spend: swap id already attached")]
    DuplicateSwapId = 1,

    #[error("not initialized")]
    NotInitialized = 2,

    #[error("already initialized")]
    AlreadyInitialized = 3,

    /// Round not strictly greater than the last accepted one.
    #[error("stale round")]
    StaleRound = 4,

    #[error("quorum not reached")]
    QuorumNotReached = 5,

    #[error("subscription id already registered")]
    DuplicateSubscription = 6,

    #[error("unknown subscription id")]
    UnknownSubscription = 7,

    #[error("unauthorized caller")]
    UnauthorizedCaller = 8,

    #[error("invalid consul set")]
    InvalidConsulSet = 9,

    #[error("invalid amount")]
    InvalidAmount = 10,

    #[error("insufficient delegation to port authority")]
    InsufficientDelegation = 11,

    #[error("data type mismatch")]
    DataTypeMismatch = 12,

    #[error("account does not match bound state")]
    AccountMismatch = 13,

    #[error("subscriber is not the program's port authority")]
    InvalidSubscriber = 14,

    /// Token holding smaller than the requested unwrap.
    #[error("insufficient token balance")]
    InsufficientBalance = 15,
}

impl ProtocolError {
    /// First protocol code.
    pub const BASE: u32 = 6000;

    const ALL: [ProtocolError; 16] = [
        ProtocolError::InvalidInstruction,
        ProtocolError::DuplicateSwapId,
        ProtocolError::NotInitialized,
        ProtocolError::AlreadyInitialized,
        ProtocolError::StaleRound,
        ProtocolError::QuorumNotReached,
        ProtocolError::DuplicateSubscription,
        ProtocolError::UnknownSubscription,
        ProtocolError::UnauthorizedCaller,
        ProtocolError::InvalidConsulSet,
        ProtocolError::InvalidAmount,
        ProtocolError::InsufficientDelegation,
        ProtocolError::DataTypeMismatch,
        ProtocolError::AccountMismatch,
        ProtocolError::InvalidSubscriber,
        ProtocolError::InsufficientBalance,
    ];

    /// Numeric code carried in rejections.
    pub fn code(self) -> u32 {
        Self::BASE + self as u32
    }

    /// Inverse of [`code`](Self::code). `None` for codes below
    /// [`BASE`](Self::BASE) or past the table.
    pub fn from_code(code: u32) -> Option<Self> {
        let index = code.checked_sub(Self::BASE)?;
        Self::ALL.get(index as usize).copied()
    }
}

/// Why a program refused an instruction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    /// Protocol refusal with a stable code.
    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    /// Program-specific code outside the protocol table (e.g. token errors).
    #[error("custom program error: {0:#x}")]
    Custom(u32),

    #[error("invalid instruction data: {0}")]
    InvalidInstructionData(#[from] CodecError),

    #[error("invalid account data: {0}")]
    InvalidAccountData(String),

    #[error("not enough account keys")]
    NotEnoughAccountKeys,

    #[error("missing required signature for {0}")]
    MissingRequiredSignature(Pubkey),

    #[error("incorrect program id")]
    IncorrectProgramId,

    #[error("instruction modified data of account {0} it does not own")]
    ExternalAccountDataModified(Pubkey),

    #[error("instruction modified read-only account {0}")]
    ReadonlyDataModified(Pubkey),

    #[error("account data too small: need {needed}, have {len}")]
    AccountDataTooSmall {
        needed: usize,
        len: usize,
    },

    #[error("insufficient funds")]
    InsufficientFunds,

    /// A nested call claimed a signer or writable privilege its caller
    /// did not hold.
    #[error("privilege escalation for account {0}")]
    PrivilegeEscalation(Pubkey),

    #[error("cross-program invocation depth exceeded")]
    CallDepth,
}

impl ProgramError {
    /// The ledger-visible classification of this error.
    pub fn kind(&self) -> InstructionErrorKind {
        match self {
            ProgramError::Protocol(e) => InstructionErrorKind::Custom(e.code()),
            ProgramError::Custom(code) => InstructionErrorKind::Custom(*code),
            ProgramError::InvalidInstructionData(_) => InstructionErrorKind::InvalidInstructionData,
            ProgramError::InvalidAccountData(_) => InstructionErrorKind::InvalidAccountData,
            ProgramError::NotEnoughAccountKeys => InstructionErrorKind::NotEnoughAccountKeys,
            ProgramError::MissingRequiredSignature(_) => {
                InstructionErrorKind::MissingRequiredSignature
            }
            ProgramError::IncorrectProgramId => InstructionErrorKind::IncorrectProgramId,
            ProgramError::ExternalAccountDataModified(_) => {
                InstructionErrorKind::ExternalAccountDataModified
            }
            ProgramError::ReadonlyDataModified(_) => InstructionErrorKind::ReadonlyDataModified,
            ProgramError::AccountDataTooSmall { .. } => InstructionErrorKind::AccountDataTooSmall,
            ProgramError::InsufficientFunds => InstructionErrorKind::InsufficientFunds,
            ProgramError::PrivilegeEscalation(_) => InstructionErrorKind::PrivilegeEscalation,
            ProgramError::CallDepth => InstructionErrorKind::CallDepth,
        }
    }
}

/// An instruction failure as a ledger reports it: either a program's custom
/// code or one of the runtime's builtin names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstructionErrorKind {
    Custom(u32),
    InvalidInstructionData,
    InvalidAccountData,
    NotEnoughAccountKeys,
    MissingRequiredSignature,
    IncorrectProgramId,
    ExternalAccountDataModified,
    ReadonlyDataModified,
    AccountDataTooSmall,
    InsufficientFunds,
    PrivilegeEscalation,
    CallDepth,
    /// A builtin name this client does not model.
    Other(String),
}

impl InstructionErrorKind {
    /// Interpret a custom code as a protocol error.
    pub fn protocol_error(&self) -> Option<ProtocolError> {
        match self {
            InstructionErrorKind::Custom(code) => ProtocolError::from_code(*code),
            _ => None,
        }
    }

    /// Map a ledger builtin error name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "InvalidInstructionData" => InstructionErrorKind::InvalidInstructionData,
            "InvalidAccountData" => InstructionErrorKind::InvalidAccountData,
            "NotEnoughAccountKeys" => InstructionErrorKind::NotEnoughAccountKeys,
            "MissingRequiredSignature" => InstructionErrorKind::MissingRequiredSignature,
            "IncorrectProgramId" => InstructionErrorKind::IncorrectProgramId,
            "ExternalAccountDataModified" => InstructionErrorKind::ExternalAccountDataModified,
            "ReadonlyDataModified" => InstructionErrorKind::ReadonlyDataModified,
            "AccountDataTooSmall" => InstructionErrorKind::AccountDataTooSmall,
            "InsufficientFunds" => InstructionErrorKind::InsufficientFunds,
            "PrivilegeEscalation" => InstructionErrorKind::PrivilegeEscalation,
            "CallDepth" => InstructionErrorKind::CallDepth,
            other => InstructionErrorKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for InstructionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstructionErrorKind::Custom(code) => match ProtocolError::from_code(*code) {
                Some(e) => write!(f, "custom program error: {:#x} ({})", code, e),
                None => write!(f, "custom program error: {:#x}", code),
            },
            InstructionErrorKind::Other(name) => write!(f, "{}", name),
            other => write!(f, "{:?}", other),
        }
    }
}
