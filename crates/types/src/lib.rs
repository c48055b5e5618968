//! Core types for the Gravity oracle network and bridge client.
//!
//! Everything here is plain data plus the cryptographic primitives the
//! protocol treats as opaque: Ed25519 keys and signatures, program-derived
//! addresses, and the Keccak-based foreign-chain address derivation.

mod account;
mod consul;
mod crypto;
mod foreign;
mod hash;
mod identifiers;
mod keypair_file;
mod pda;
mod pubkey;

pub use account::{Account, AccountMeta};
pub use consul::{ConsulSet, ConsulSetError};
pub use crypto::{Keypair, KeypairError, Signature};
pub use foreign::ForeignAddress;
pub use hash::Hash;
pub use identifiers::{DataType, Round, SubscriptionId, SwapId, UnknownDataType};
pub use keypair_file::{
    create_keypair_file_with_pda, load_or_create_keypair, read_keypair_file, write_keypair_file,
    KeypairFileError,
};
pub use pda::{
    create_program_address, find_program_address, generate_keyed_program_address, PdaError,
    MAX_SEEDS, MAX_SEED_LEN,
};
pub use pubkey::{ParseError, Pubkey};

/// Lamports charged per transaction signature.
pub const LAMPORTS_PER_SIGNATURE: u64 = 5_000;

/// Lamports in one native token unit.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;
