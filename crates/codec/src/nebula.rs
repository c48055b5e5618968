//! Nebula hub instructions.

use crate::{decode_consul_bytes, encode_consul_bytes, CodecError, InstructionData, Reader, Writer};
use solanoid_types::{DataType, Hash, Pubkey, Round, SubscriptionId};

/// Seed of the hub's authority PDA, which signs value deliveries.
pub const NEBULA_AUTHORITY_SEED: &[u8] = b"nebula";

/// Instructions accepted by a Nebula hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NebulaInstruction {
    /// `[0][bft u8][data_type u8][gravity_state 32][oracles 32*n]`
    Init {
        bft: u8,
        data_type: DataType,
        gravity_state: Pubkey,
        oracles: Vec<Pubkey>,
    },
    /// `[1][bft u8][new_round u64][oracles 32*n]`
    UpdateOracles {
        bft: u8,
        new_round: Round,
        oracles: Vec<Pubkey>,
    },
    /// `[2][round u64][data_hash 32]`
    SendHashValue { round: Round, data_hash: Hash },
    /// `[3][data_type u8][round u64][subscription_id 16][value ..]`
    SendValueToSubs {
        data_type: DataType,
        round: Round,
        subscription_id: SubscriptionId,
        value: Vec<u8>,
    },
    /// `[4][subscriber 32][min_confirmations u8][queue_size u64][subscription_id 16]`
    Subscribe {
        subscriber: Pubkey,
        min_confirmations: u8,
        queue_size: u64,
        subscription_id: SubscriptionId,
    },
}

fn parse_data_type(tag: u8) -> Result<DataType, CodecError> {
    DataType::try_from(tag).map_err(|e| CodecError::InvalidTag {
        what: "data type",
        tag: e.0 as u32,
    })
}

impl InstructionData for NebulaInstruction {
    fn encode(&self) -> Vec<u8> {
        match self {
            NebulaInstruction::Init {
                bft,
                data_type,
                gravity_state,
                oracles,
            } => Writer::with_tag(0)
                .u8(*bft)
                .u8(data_type.as_u8())
                .pubkey(gravity_state)
                .bytes(&encode_consul_bytes(oracles))
                .finish(),
            NebulaInstruction::UpdateOracles {
                bft,
                new_round,
                oracles,
            } => Writer::with_tag(1)
                .u8(*bft)
                .u64(new_round.0)
                .bytes(&encode_consul_bytes(oracles))
                .finish(),
            NebulaInstruction::SendHashValue { round, data_hash } => Writer::with_tag(2)
                .u64(round.0)
                .bytes(data_hash.as_bytes())
                .finish(),
            NebulaInstruction::SendValueToSubs {
                data_type,
                round,
                subscription_id,
                value,
            } => Writer::with_tag(3)
                .u8(data_type.as_u8())
                .u64(round.0)
                .bytes(subscription_id.as_bytes())
                .bytes(value)
                .finish(),
            NebulaInstruction::Subscribe {
                subscriber,
                min_confirmations,
                queue_size,
                subscription_id,
            } => Writer::with_tag(4)
                .pubkey(subscriber)
                .u8(*min_confirmations)
                .u64(*queue_size)
                .bytes(subscription_id.as_bytes())
                .finish(),
        }
    }

    fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(data);
        let tag = r.u8().map_err(|_| CodecError::Empty)?;
        let ix = match tag {
            0 => NebulaInstruction::Init {
                bft: r.u8()?,
                data_type: parse_data_type(r.u8()?)?,
                gravity_state: r.pubkey()?,
                oracles: decode_consul_bytes(r.rest())?,
            },
            1 => NebulaInstruction::UpdateOracles {
                bft: r.u8()?,
                new_round: Round(r.u64()?),
                oracles: decode_consul_bytes(r.rest())?,
            },
            2 => NebulaInstruction::SendHashValue {
                round: Round(r.u64()?),
                data_hash: Hash::new(r.array()?),
            },
            3 => NebulaInstruction::SendValueToSubs {
                data_type: parse_data_type(r.u8()?)?,
                round: Round(r.u64()?),
                subscription_id: SubscriptionId::new(r.array()?),
                value: r.rest().to_vec(),
            },
            4 => NebulaInstruction::Subscribe {
                subscriber: r.pubkey()?,
                min_confirmations: r.u8()?,
                queue_size: r.u64()?,
                subscription_id: SubscriptionId::new(r.array()?),
            },
            tag => {
                return Err(CodecError::UnknownDiscriminant {
                    program: "nebula",
                    tag,
                })
            }
        };
        r.finish()?;
        Ok(ix)
    }

    fn kind(&self) -> &'static str {
        match self {
            NebulaInstruction::Init { .. } => "Init",
            NebulaInstruction::UpdateOracles { .. } => "UpdateOracles",
            NebulaInstruction::SendHashValue { .. } => "SendHashValue",
            NebulaInstruction::SendValueToSubs { .. } => "SendValueToSubs",
            NebulaInstruction::Subscribe { .. } => "Subscribe",
        }
    }

    fn describe(&self) -> String {
        match self {
            NebulaInstruction::Init {
                bft,
                data_type,
                oracles,
                ..
            } => format!("Init(bft={}, data_type={}, oracles={})", bft, data_type, oracles.len()),
            NebulaInstruction::UpdateOracles { new_round, .. } => {
                format!("UpdateOracles(round={})", new_round.0)
            }
            NebulaInstruction::SendHashValue { round, .. } => {
                format!("SendHashValue(round={})", round.0)
            }
            NebulaInstruction::SendValueToSubs {
                round,
                subscription_id,
                ..
            } => format!("SendValueToSubs(round={}, sub={})", round.0, subscription_id),
            NebulaInstruction::Subscribe {
                subscription_id, ..
            } => format!("Subscribe(id={})", subscription_id),
        }
    }
}
