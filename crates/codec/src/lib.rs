//! Deterministic binary encoding for the oracle and bridge programs.
//!
//! Every instruction is one discriminant byte followed by a fixed-layout
//! payload. Integers are little-endian, amounts are IEEE-754 `f64`
//! little-endian, keys are their raw 32 bytes. There is no padding and no
//! length prefix: the consul list and the `SendValueToSubs` value are the
//! only variable-length fields and always run to the end of the buffer.
//!
//! Each program's instruction set is a sum type implementing
//! [`InstructionData`], so encode and decode share one discriminant table.

mod amount;
mod gravity;
mod ibport;
mod nebula;
mod reader;
pub mod token;

pub use amount::{
    decode_float_amount, encode_float_amount, from_base_units, to_base_units, AmountError,
    CrossChainMintVector,
};
pub use gravity::GravityInstruction;
pub use ibport::{attach_value_data, IBPortInstruction, ATTACH_VALUE_TAG, PORT_AUTHORITY_SEED};
pub use nebula::{NebulaInstruction, NEBULA_AUTHORITY_SEED};
pub use reader::{decode_consul_bytes, encode_consul_bytes, CodecError, Reader, Writer};
pub use token::{AccountState, AuthorityType, Mint, TokenAccount, TokenInstruction};

/// A program instruction set with a single discriminant-based wire format.
pub trait InstructionData: Sized {
    /// Serialize to wire bytes.
    fn encode(&self) -> Vec<u8>;

    /// Parse wire bytes. Rejects unknown discriminants, truncation and
    /// trailing bytes.
    fn decode(data: &[u8]) -> Result<Self, CodecError>;

    /// Instruction name, e.g. `"UpdateConsuls"`.
    fn kind(&self) -> &'static str;

    /// Name plus the identifying arguments, e.g. `"UpdateConsuls(round=10)"`.
    ///
    /// Used in logs and error reports.
    fn describe(&self) -> String;
}
