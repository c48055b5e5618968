//! Account layouts for the registry state and its signer mirror.

use solanoid_codec::{CodecError, Reader, Writer};
use solanoid_types::{ConsulSet, Pubkey, Round};

use crate::MAX_CONSULS;

/// Failure decoding a state account.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("stored consul set is invalid: {0}")]
    InvalidConsulSet(String),

    #[error("state account is corrupt: {0}")]
    Corrupt(String),

    #[error("state account holds {len} bytes, expected {expected}")]
    WrongSize { len: usize, expected: usize },
}

/// Registry state: `[initialized u8][bft u8][round u64][count u8][consuls 32*MAX]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GravityState {
    Uninitialized,
    Active(ConsulSet),
}

impl GravityState {
    /// Account size.
    pub const LEN: usize = 1 + 1 + 8 + 1 + 32 * MAX_CONSULS;

    pub fn consul_set(&self) -> Option<&ConsulSet> {
        match self {
            GravityState::Active(set) => Some(set),
            GravityState::Uninitialized => None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self, GravityState::Active(_))
    }

    pub fn pack(&self) -> Vec<u8> {
        match self {
            GravityState::Uninitialized => vec![0u8; Self::LEN],
            GravityState::Active(set) => {
                let mut out = Writer::with_capacity(Self::LEN)
                    .u8(1)
                    .u8(set.bft())
                    .u64(set.round().0)
                    .u8(set.len() as u8)
                    .bytes(&solanoid_codec::encode_consul_bytes(set.consuls()))
                    .finish();
                out.resize(Self::LEN, 0);
                out
            }
        }
    }

    pub fn unpack(data: &[u8]) -> Result<Self, StateError> {
        if data.len() < Self::LEN {
            return Err(StateError::WrongSize {
                len: data.len(),
                expected: Self::LEN,
            });
        }
        let mut r = Reader::new(data);
        if r.u8()? == 0 {
            return Ok(GravityState::Uninitialized);
        }
        let bft = r.u8()?;
        let round = Round(r.u64()?);
        let count = r.u8()? as usize;
        let consuls = read_keys(&mut r, count)?;
        ConsulSet::new(bft, round, consuls)
            .map(GravityState::Active)
            .map_err(|e| StateError::InvalidConsulSet(e.to_string()))
    }
}

/// Mirror of the active signer set kept in the multisig account:
/// `[initialized u8][threshold u8][count u8][signers 32*MAX]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultisigState {
    pub threshold: u8,
    pub signers: Vec<Pubkey>,
}

impl MultisigState {
    /// Account size.
    pub const LEN: usize = 1 + 1 + 1 + 32 * MAX_CONSULS;

    pub fn from_consuls(set: &ConsulSet) -> Self {
        Self {
            threshold: set.bft(),
            signers: set.consuls().to_vec(),
        }
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut out = Writer::with_capacity(Self::LEN)
            .u8(1)
            .u8(self.threshold)
            .u8(self.signers.len() as u8)
            .bytes(&solanoid_codec::encode_consul_bytes(&self.signers))
            .finish();
        out.resize(Self::LEN, 0);
        out
    }

    /// `None` for a blank account.
    pub fn unpack(data: &[u8]) -> Result<Option<Self>, StateError> {
        if data.len() < Self::LEN {
            return Err(StateError::WrongSize {
                len: data.len(),
                expected: Self::LEN,
            });
        }
        let mut r = Reader::new(data);
        if r.u8()? == 0 {
            return Ok(None);
        }
        let threshold = r.u8()?;
        let count = r.u8()? as usize;
        let signers = read_keys(&mut r, count)?;
        Ok(Some(Self { threshold, signers }))
    }
}

fn read_keys(r: &mut Reader<'_>, count: usize) -> Result<Vec<Pubkey>, StateError> {
    if count > MAX_CONSULS {
        return Err(StateError::InvalidConsulSet(format!(
            "{count} consuls exceeds maximum {MAX_CONSULS}"
        )));
    }
    (0..count)
        .map(|_| r.pubkey().map_err(StateError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> ConsulSet {
        ConsulSet::new(
            2,
            Round(7),
            vec![Pubkey::new([1; 32]), Pubkey::new([2; 32]), Pubkey::new([3; 32])],
        )
        .unwrap()
    }

    #[test]
    fn test_blank_account_is_uninitialized() {
        assert_eq!(
            GravityState::unpack(&[0u8; GravityState::LEN]).unwrap(),
            GravityState::Uninitialized
        );
        assert_eq!(MultisigState::unpack(&[0u8; MultisigState::LEN]).unwrap(), None);
    }

    #[test]
    fn test_state_pack_roundtrip() {
        let state = GravityState::Active(set());
        let packed = state.pack();
        assert_eq!(packed.len(), GravityState::LEN);
        assert_eq!(GravityState::unpack(&packed).unwrap(), state);

        let multisig = MultisigState::from_consuls(&set());
        assert_eq!(MultisigState::unpack(&multisig.pack()).unwrap(), Some(multisig));
    }

    #[test]
    fn test_short_account_rejected() {
        assert!(matches!(
            GravityState::unpack(&[0u8; 10]),
            Err(StateError::WrongSize { len: 10, .. })
        ));
    }
}
