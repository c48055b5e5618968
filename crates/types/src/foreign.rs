//! Addresses on the external chain a bridge transfers to.

use sha3::{Digest, Keccak256};
use std::fmt;

/// A 32-byte foreign-chain receiver.
///
/// For EVM chains only the first 20 bytes are meaningful; the rest is zero.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ForeignAddress(pub [u8; 32]);

impl ForeignAddress {
    /// Size in bytes.
    pub const BYTES: usize = 32;

    /// Pad a 20-byte EVM address.
    pub fn from_evm(address: [u8; 20]) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..20].copy_from_slice(&address);
        Self(bytes)
    }

    /// Derive the EVM address of an uncompressed secp256k1 public key.
    ///
    /// Accepts the 65-byte SEC1 form (leading `0x04`) or the bare 64-byte
    /// coordinates. Returns `None` for any other length.
    pub fn from_secp256k1_pubkey(pubkey: &[u8]) -> Option<Self> {
        let coords = match pubkey.len() {
            65 if pubkey[0] == 0x04 => &pubkey[1..],
            64 => pubkey,
            _ => return None,
        };
        let digest = Keccak256::digest(coords);
        let mut address = [0u8; 20];
        address.copy_from_slice(&digest[12..]);
        Some(Self::from_evm(address))
    }

    /// Parse a `0x`-prefixed (or bare) 20-byte hex EVM address.
    pub fn from_evm_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut address = [0u8; 20];
        hex::decode_to_slice(s.trim_start_matches("0x"), &mut address)?;
        Ok(Self::from_evm(address))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The EVM address part.
    pub fn evm_address(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        out.copy_from_slice(&self.0[..20]);
        out
    }
}

impl fmt::Display for ForeignAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0[20..].iter().all(|&b| b == 0) {
            write!(f, "0x{}", hex::encode(self.evm_address()))
        } else {
            write!(f, "0x{}", hex::encode(self.0))
        }
    }
}

impl fmt::Debug for ForeignAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ForeignAddress({})", self)
    }
}
