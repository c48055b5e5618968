//! Float amounts and the cross-chain mint vector.

use crate::{CodecError, Reader, Writer};
use solanoid_types::{Pubkey, SwapId};

/// Encode an amount as IEEE-754 little-endian.
pub fn encode_float_amount(amount: f64) -> [u8; 8] {
    amount.to_le_bytes()
}

/// Inverse of [`encode_float_amount`].
pub fn decode_float_amount(bytes: [u8; 8]) -> f64 {
    f64::from_le_bytes(bytes)
}

/// Amount conversion failures.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum AmountError {
    /// NaN or infinite.
    #[error("Amount {0} is not finite")]
    NotFinite(f64),

    /// Below zero.
    #[error("Amount {0} is negative")]
    Negative(f64),

    /// Does not fit in `u64` base units.
    #[error("Amount {amount} with {decimals} decimals overflows u64")]
    Overflow {
        /// Requested amount.
        amount: f64,
        /// Mint decimals.
        decimals: u8,
    },
}

/// Convert a decimal token amount to integer base units, rounding to nearest.
pub fn to_base_units(amount: f64, decimals: u8) -> Result<u64, AmountError> {
    if !amount.is_finite() {
        return Err(AmountError::NotFinite(amount));
    }
    if amount < 0.0 {
        return Err(AmountError::Negative(amount));
    }
    let scaled = (amount * 10f64.powi(decimals as i32)).round();
    // 2^64 is the first f64 that no longer fits
    if !scaled.is_finite() || scaled >= 18_446_744_073_709_551_616.0 {
        return Err(AmountError::Overflow { amount, decimals });
    }
    Ok(scaled as u64)
}

/// Convert integer base units back to a decimal amount.
pub fn from_base_units(raw: u64, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

/// The 56-byte payload of `AttachValue`: `swap_id ‖ recipient ‖ amount`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossChainMintVector {
    /// One-time swap identifier.
    pub swap_id: SwapId,
    /// Token account that receives the minted amount.
    pub recipient: Pubkey,
    /// Decimal token amount.
    pub amount: f64,
}

impl CrossChainMintVector {
    /// Encoded size.
    pub const LEN: usize = 56;

    pub fn new(swap_id: SwapId, recipient: Pubkey, amount: f64) -> Self {
        Self {
            swap_id,
            recipient,
            amount,
        }
    }

    pub fn encode(&self) -> [u8; Self::LEN] {
        let bytes = Writer::with_capacity(Self::LEN)
            .bytes(self.swap_id.as_bytes())
            .pubkey(&self.recipient)
            .f64(self.amount)
            .finish();
        let mut out = [0u8; Self::LEN];
        out.copy_from_slice(&bytes);
        out
    }

    /// Decode exactly 56 bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != Self::LEN {
            return Err(CodecError::InvalidLength {
                what: "cross-chain mint vector",
                len: bytes.len(),
            });
        }
        let mut r = Reader::new(bytes);
        let swap_id = SwapId::new(r.array()?);
        let recipient = r.pubkey()?;
        let amount = r.f64()?;
        r.finish()?;
        Ok(Self {
            swap_id,
            recipient,
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(amount: f64) -> CrossChainMintVector {
        CrossChainMintVector::new(SwapId::new([0x5a; 16]), Pubkey::new([0x11; 32]), amount)
    }

    #[test]
    fn test_mint_vector_layout() {
        let bytes = vector(1.5).encode();
        assert_eq!(&bytes[..16], &[0x5a; 16]);
        assert_eq!(&bytes[16..48], &[0x11; 32]);
        assert_eq!(&bytes[48..], &1.5f64.to_le_bytes());
    }

    #[test]
    fn test_mint_vector_boundary_amounts() {
        for amount in [0.0, f64::MAX, 0.1, 1.0 / 3.0, 12345.678901, f64::MIN_POSITIVE] {
            let decoded = CrossChainMintVector::decode(&vector(amount).encode()).unwrap();
            assert_eq!(decoded.amount.to_bits(), amount.to_bits());
            assert_eq!(decoded, vector(amount));
        }
    }

    #[test]
    fn test_mint_vector_wrong_length() {
        let bytes = vector(1.0).encode();
        assert!(CrossChainMintVector::decode(&bytes[..55]).is_err());
        let mut long = bytes.to_vec();
        long.push(0);
        assert!(CrossChainMintVector::decode(&long).is_err());
    }

    #[test]
    fn test_base_units() {
        assert_eq!(to_base_units(1.5, 8), Ok(150_000_000));
        assert_eq!(to_base_units(0.1, 8), Ok(10_000_000));
        assert_eq!(to_base_units(0.0, 8), Ok(0));
        assert!(matches!(to_base_units(-1.0, 8), Err(AmountError::Negative(_))));
        assert!(matches!(to_base_units(f64::NAN, 8), Err(AmountError::NotFinite(_))));
        assert!(matches!(
            to_base_units(f64::MAX, 0),
            Err(AmountError::Overflow { .. })
        ));
        assert_eq!(from_base_units(150_000_000, 8), 1.5);
    }

    #[test]
    fn test_float_amount_le() {
        assert_eq!(encode_float_amount(1.0), [0, 0, 0, 0, 0, 0, 0xf0, 0x3f]);
        assert_eq!(decode_float_amount(encode_float_amount(-2.25)), -2.25);
    }
}
