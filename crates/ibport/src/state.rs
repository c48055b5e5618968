//! Port account layout.
//!
//! ```text
//! [initialized u8][nebula 32][token_program 32]
//! [swap_count u32][unwrap_count u32]
//! [swaps SWAP_LEN*n][unwraps UNWRAP_LEN*m]
//! ```

use solanoid_codec::{Reader, Writer};
use solanoid_gravity::StateError;
use solanoid_types::{ForeignAddress, Pubkey, SwapId};

/// One consumed swap id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRecord {
    pub swap_id: SwapId,
    pub recipient: Pubkey,
    /// Base units minted.
    pub amount: u64,
}

/// One outbound transfer intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnwrapRequest {
    pub seq: u64,
    /// Token account the tokens were burned from.
    pub sender: Pubkey,
    pub receiver: ForeignAddress,
    /// Base units burned.
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IBPortState {
    pub nebula: Pubkey,
    pub token_program: Pubkey,
    pub swaps: Vec<SwapRecord>,
    pub unwraps: Vec<UnwrapRequest>,
}

impl IBPortState {
    pub const HEADER_LEN: usize = 1 + 32 + 32 + 4 + 4;
    pub const SWAP_LEN: usize = 16 + 32 + 8;
    pub const UNWRAP_LEN: usize = 8 + 32 + 32 + 8;

    /// Account size for `max_swaps` swap records and `max_unwraps` requests.
    pub const fn space(max_swaps: usize, max_unwraps: usize) -> usize {
        Self::HEADER_LEN + Self::SWAP_LEN * max_swaps + Self::UNWRAP_LEN * max_unwraps
    }

    pub fn new(nebula: Pubkey, token_program: Pubkey) -> Self {
        Self {
            nebula,
            token_program,
            swaps: Vec::new(),
            unwraps: Vec::new(),
        }
    }

    pub fn swap(&self, swap_id: &SwapId) -> Option<&SwapRecord> {
        self.swaps.iter().find(|s| &s.swap_id == swap_id)
    }

    /// Sequence number the next unwrap request receives.
    pub fn next_seq(&self) -> u64 {
        self.unwraps.len() as u64
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(Self::space(self.swaps.len(), self.unwraps.len()))
            .u8(1)
            .pubkey(&self.nebula)
            .pubkey(&self.token_program)
            .u32(self.swaps.len() as u32)
            .u32(self.unwraps.len() as u32);
        for swap in &self.swaps {
            w = w
                .bytes(swap.swap_id.as_bytes())
                .pubkey(&swap.recipient)
                .u64(swap.amount);
        }
        for unwrap in &self.unwraps {
            w = w
                .u64(unwrap.seq)
                .pubkey(&unwrap.sender)
                .bytes(unwrap.receiver.as_bytes())
                .u64(unwrap.amount);
        }
        w.finish()
    }

    /// `None` for a blank account.
    pub fn unpack(data: &[u8]) -> Result<Option<Self>, StateError> {
        if data.len() < Self::HEADER_LEN {
            return Err(StateError::WrongSize {
                len: data.len(),
                expected: Self::HEADER_LEN,
            });
        }
        let mut r = Reader::new(data);
        if r.u8()? == 0 {
            return Ok(None);
        }
        let nebula = r.pubkey()?;
        let token_program = r.pubkey()?;
        let swap_count = r.u32()? as usize;
        let unwrap_count = r.u32()? as usize;

        let swaps = (0..swap_count)
            .map(|_| -> Result<SwapRecord, StateError> {
                Ok(SwapRecord {
                    swap_id: SwapId::new(r.array()?),
                    recipient: r.pubkey()?,
                    amount: r.u64()?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let unwraps = (0..unwrap_count)
            .map(|_| -> Result<UnwrapRequest, StateError> {
                Ok(UnwrapRequest {
                    seq: r.u64()?,
                    sender: r.pubkey()?,
                    receiver: ForeignAddress(r.array()?),
                    amount: r.u64()?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Self {
            nebula,
            token_program,
            swaps,
            unwraps,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_short_accounts() {
        assert_eq!(IBPortState::unpack(&[0u8; IBPortState::HEADER_LEN]).unwrap(), None);
        assert!(IBPortState::unpack(&[1u8; 8]).is_err());
    }

    #[test]
    fn test_pack_roundtrip() {
        let mut state = IBPortState::new(Pubkey::new([1; 32]), Pubkey::new([2; 32]));
        state.swaps.push(SwapRecord {
            swap_id: SwapId::new([3; 16]),
            recipient: Pubkey::new([4; 32]),
            amount: 227_000_000,
        });
        state.unwraps.push(UnwrapRequest {
            seq: state.next_seq(),
            sender: Pubkey::new([5; 32]),
            receiver: ForeignAddress::from_evm([6; 20]),
            amount: 1,
        });
        let packed = state.pack();
        assert_eq!(packed.len(), IBPortState::space(1, 1));

        let mut account = vec![0u8; IBPortState::space(4, 4)];
        account[..packed.len()].copy_from_slice(&packed);
        let back = IBPortState::unpack(&account).unwrap().unwrap();
        assert_eq!(back, state);
        assert_eq!(back.next_seq(), 1);
        assert!(back.swap(&SwapId::new([3; 16])).is_some());
    }

    #[test]
    fn test_truncated_table_rejected() {
        let mut state = IBPortState::new(Pubkey::new([1; 32]), Pubkey::new([2; 32]));
        state.swaps.push(SwapRecord {
            swap_id: SwapId::new([3; 16]),
            recipient: Pubkey::new([4; 32]),
            amount: 1,
        });
        let packed = state.pack();
        assert!(IBPortState::unpack(&packed[..packed.len() - 1]).is_err());
    }
}
