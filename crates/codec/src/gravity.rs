//! Gravity registry instructions.

use crate::{decode_consul_bytes, encode_consul_bytes, CodecError, InstructionData, Reader, Writer};
use solanoid_types::{Pubkey, Round};

/// Instructions accepted by the Gravity registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GravityInstruction {
    /// `[0][bft u8][init_round u64][consuls 32*n]`
    Init {
        bft: u8,
        init_round: Round,
        consuls: Vec<Pubkey>,
    },
    /// `[1][bft u8][last_round u64][consuls 32*n]`
    UpdateConsuls {
        bft: u8,
        last_round: Round,
        consuls: Vec<Pubkey>,
    },
}

impl InstructionData for GravityInstruction {
    fn encode(&self) -> Vec<u8> {
        match self {
            GravityInstruction::Init {
                bft,
                init_round,
                consuls,
            } => Writer::with_tag(0)
                .u8(*bft)
                .u64(init_round.0)
                .bytes(&encode_consul_bytes(consuls))
                .finish(),
            GravityInstruction::UpdateConsuls {
                bft,
                last_round,
                consuls,
            } => Writer::with_tag(1)
                .u8(*bft)
                .u64(last_round.0)
                .bytes(&encode_consul_bytes(consuls))
                .finish(),
        }
    }

    fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(data);
        let tag = r.u8().map_err(|_| CodecError::Empty)?;
        match tag {
            0 => Ok(GravityInstruction::Init {
                bft: r.u8()?,
                init_round: Round(r.u64()?),
                consuls: decode_consul_bytes(r.rest())?,
            }),
            1 => Ok(GravityInstruction::UpdateConsuls {
                bft: r.u8()?,
                last_round: Round(r.u64()?),
                consuls: decode_consul_bytes(r.rest())?,
            }),
            tag => Err(CodecError::UnknownDiscriminant {
                program: "gravity",
                tag,
            }),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            GravityInstruction::Init { .. } => "Init",
            GravityInstruction::UpdateConsuls { .. } => "UpdateConsuls",
        }
    }

    fn describe(&self) -> String {
        match self {
            GravityInstruction::Init {
                bft,
                init_round,
                consuls,
            } => format!(
                "Init(bft={}, round={}, consuls={})",
                bft,
                init_round.0,
                consuls.len()
            ),
            GravityInstruction::UpdateConsuls { last_round, .. } => {
                format!("UpdateConsuls(round={})", last_round.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_consuls_layout() {
        let ix = GravityInstruction::UpdateConsuls {
            bft: 2,
            last_round: Round(10),
            consuls: vec![Pubkey::new([1; 32]), Pubkey::new([2; 32])],
        };
        let bytes = ix.encode();
        assert_eq!(bytes.len(), 1 + 1 + 8 + 64);
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[1], 2);
        assert_eq!(&bytes[2..10], &10u64.to_le_bytes());
        assert_eq!(GravityInstruction::decode(&bytes).unwrap(), ix);
        assert_eq!(ix.describe(), "UpdateConsuls(round=10)");
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(GravityInstruction::decode(&[]), Err(CodecError::Empty));
        assert_eq!(
            GravityInstruction::decode(&[9]),
            Err(CodecError::UnknownDiscriminant {
                program: "gravity",
                tag: 9
            })
        );
        assert!(GravityInstruction::decode(&[0, 3, 1, 0]).is_err());
        let mut bytes = GravityInstruction::Init {
            bft: 1,
            init_round: Round(0),
            consuls: vec![Pubkey::new([1; 32])],
        }
        .encode();
        bytes.push(0);
        assert!(matches!(
            GravityInstruction::decode(&bytes),
            Err(CodecError::InvalidLength { .. })
        ));
    }
}
