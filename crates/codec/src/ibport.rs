//! IBPort bridge instructions.

use crate::{CodecError, CrossChainMintVector, InstructionData, Reader, Writer};
use solanoid_types::{ForeignAddress, Pubkey};

/// Seed of a port's authority PDA. The port's Nebula subscription names
/// this address as its subscriber, and the authority signs mints and burns.
pub const PORT_AUTHORITY_SEED: &[u8] = b"ibport";

/// Discriminant of the attach entrypoint every Nebula subscriber exposes.
pub const ATTACH_VALUE_TAG: u8 = 2;

/// Instruction data delivering an oracle `value` to a subscriber's attach
/// entrypoint. The value is passed through verbatim.
pub fn attach_value_data(value: &[u8]) -> Vec<u8> {
    Writer::with_tag(ATTACH_VALUE_TAG).bytes(value).finish()
}

/// Instructions accepted by an IBPort bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum IBPortInstruction {
    /// `[0][nebula 32][token_program 32]`
    Init {
        nebula: Pubkey,
        token_program: Pubkey,
    },
    /// `[1][receiver 32][amount f64]`
    CreateTransferUnwrapRequest {
        receiver: ForeignAddress,
        amount: f64,
    },
    /// `[2][swap_id 16][recipient 32][amount f64]`
    AttachValue(CrossChainMintVector),
}

impl InstructionData for IBPortInstruction {
    fn encode(&self) -> Vec<u8> {
        match self {
            IBPortInstruction::Init {
                nebula,
                token_program,
            } => Writer::with_tag(0)
                .pubkey(nebula)
                .pubkey(token_program)
                .finish(),
            IBPortInstruction::CreateTransferUnwrapRequest { receiver, amount } => {
                Writer::with_tag(1)
                    .bytes(receiver.as_bytes())
                    .f64(*amount)
                    .finish()
            }
            IBPortInstruction::AttachValue(vector) => {
                attach_value_data(&vector.encode())
            }
        }
    }

    fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(data);
        let tag = r.u8().map_err(|_| CodecError::Empty)?;
        let ix = match tag {
            0 => IBPortInstruction::Init {
                nebula: r.pubkey()?,
                token_program: r.pubkey()?,
            },
            1 => IBPortInstruction::CreateTransferUnwrapRequest {
                receiver: ForeignAddress(r.array()?),
                amount: r.f64()?,
            },
            ATTACH_VALUE_TAG => IBPortInstruction::AttachValue(CrossChainMintVector::decode(r.rest())?),
            tag => {
                return Err(CodecError::UnknownDiscriminant {
                    program: "ibport",
                    tag,
                })
            }
        };
        r.finish()?;
        Ok(ix)
    }

    fn kind(&self) -> &'static str {
        match self {
            IBPortInstruction::Init { .. } => "Init",
            IBPortInstruction::CreateTransferUnwrapRequest { .. } => "CreateTransferUnwrapRequest",
            IBPortInstruction::AttachValue(_) => "AttachValue",
        }
    }

    fn describe(&self) -> String {
        match self {
            IBPortInstruction::Init { nebula, .. } => format!("Init(nebula={})", nebula),
            IBPortInstruction::CreateTransferUnwrapRequest { receiver, amount } => {
                format!("CreateTransferUnwrapRequest(receiver={}, amount={})", receiver, amount)
            }
            IBPortInstruction::AttachValue(vector) => format!(
                "AttachValue(swap={}, amount={})",
                vector.swap_id, vector.amount
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solanoid_types::SwapId;

    #[test]
    fn test_attach_value_wraps_vector() {
        let vector = CrossChainMintVector::new(SwapId::new([4; 16]), Pubkey::new([5; 32]), 2.5);
        let ix = IBPortInstruction::AttachValue(vector);
        let bytes = ix.encode();
        assert_eq!(bytes.len(), 57);
        assert_eq!(&bytes[1..], &vector.encode());
        assert_eq!(IBPortInstruction::decode(&bytes).unwrap(), ix);
    }

    #[test]
    fn test_unwrap_request_layout() {
        let ix = IBPortInstruction::CreateTransferUnwrapRequest {
            receiver: ForeignAddress::from_evm([0xaa; 20]),
            amount: 0.25,
        };
        let bytes = ix.encode();
        assert_eq!(bytes.len(), 41);
        assert_eq!(&bytes[33..], &0.25f64.to_le_bytes());
        assert_eq!(IBPortInstruction::decode(&bytes).unwrap(), ix);
    }

    #[test]
    fn test_truncated_vector() {
        assert!(IBPortInstruction::decode(&[2; 40]).is_err());
        assert!(IBPortInstruction::decode(&[3]).is_err());
    }
}
