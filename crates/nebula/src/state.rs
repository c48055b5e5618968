//! Hub account layout.
//!
//! ```text
//! [initialized u8][data_type u8][gravity_state 32]
//! [bft u8][oracle_round u64][oracle_count u8][oracles 32*MAX_CONSULS]
//! [has_pulse u8][pulse_round u64][pulse_hash 32][pulse_count u64]
//! [subscription_count u32][subscriptions SUBSCRIPTION_LEN*n]
//! ```
//!
//! The subscription table grows into whatever space the account was
//! allocated with; a full account rejects further subscriptions.

use solanoid_codec::{Reader, Writer};
use solanoid_gravity::{StateError, MAX_CONSULS};
use solanoid_types::{ConsulSet, DataType, Hash, Pubkey, Round, SubscriptionId};

/// A registered consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: SubscriptionId,
    /// The subscriber's authority PDA.
    pub subscriber: Pubkey,
    pub min_confirmations: u8,
    pub queue_size: u64,
    /// Last delivered round; `None` until the first delivery.
    pub last_round: Option<Round>,
}

/// Most recent oracle data hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub round: Round,
    pub data_hash: Hash,
}

/// State of an initialized hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NebulaState {
    pub data_type: DataType,
    pub gravity_state: Pubkey,
    pub oracles: ConsulSet,
    pub last_pulse: Option<Pulse>,
    pub pulse_count: u64,
    pub subscriptions: Vec<Subscription>,
}

impl NebulaState {
    /// Bytes before the subscription table.
    pub const HEADER_LEN: usize = 1 + 1 + 32 + (1 + 8 + 1 + 32 * MAX_CONSULS) + (1 + 8 + 32 + 8) + 4;

    /// Bytes per subscription entry.
    pub const SUBSCRIPTION_LEN: usize = 16 + 32 + 1 + 8 + 1 + 8;

    /// Account size that holds up to `max_subscriptions` entries.
    pub const fn space(max_subscriptions: usize) -> usize {
        Self::HEADER_LEN + Self::SUBSCRIPTION_LEN * max_subscriptions
    }

    pub fn new(data_type: DataType, gravity_state: Pubkey, oracles: ConsulSet) -> Self {
        Self {
            data_type,
            gravity_state,
            oracles,
            last_pulse: None,
            pulse_count: 0,
            subscriptions: Vec::new(),
        }
    }

    pub fn subscription(&self, id: &SubscriptionId) -> Option<&Subscription> {
        self.subscriptions.iter().find(|s| &s.id == id)
    }

    pub fn subscription_mut(&mut self, id: &SubscriptionId) -> Option<&mut Subscription> {
        self.subscriptions.iter_mut().find(|s| &s.id == id)
    }

    /// Serialized form. Its length grows with the subscription table.
    pub fn pack(&self) -> Vec<u8> {
        let mut oracle_keys = vec![0u8; 32 * MAX_CONSULS];
        for (slot, key) in oracle_keys.chunks_mut(32).zip(self.oracles.consuls()) {
            slot.copy_from_slice(key.as_bytes());
        }
        let pulse = self.last_pulse.unwrap_or(Pulse {
            round: Round::ZERO,
            data_hash: Hash::ZERO,
        });

        let mut w = Writer::with_capacity(Self::space(self.subscriptions.len()))
            .u8(1)
            .u8(self.data_type.as_u8())
            .pubkey(&self.gravity_state)
            .u8(self.oracles.bft())
            .u64(self.oracles.round().0)
            .u8(self.oracles.len() as u8)
            .bytes(&oracle_keys)
            .u8(self.last_pulse.is_some() as u8)
            .u64(pulse.round.0)
            .bytes(pulse.data_hash.as_bytes())
            .u64(self.pulse_count)
            .u32(self.subscriptions.len() as u32);
        for sub in &self.subscriptions {
            w = w
                .bytes(sub.id.as_bytes())
                .pubkey(&sub.subscriber)
                .u8(sub.min_confirmations)
                .u64(sub.queue_size)
                .u8(sub.last_round.is_some() as u8)
                .u64(sub.last_round.map_or(0, |r| r.0));
        }
        w.finish()
    }

    /// `None` for a blank account. Bytes past the subscription table are
    /// ignored.
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
        let data_type = DataType::try_from(r.u8()?)
            .map_err(|e| StateError::Corrupt(format!("unknown data type {}", e.0)))?;
        let gravity_state = r.pubkey()?;

        let bft = r.u8()?;
        let round = Round(r.u64()?);
        let count = r.u8()? as usize;
        if count > MAX_CONSULS {
            return Err(StateError::InvalidConsulSet(format!(
                "{count} oracles exceeds maximum {MAX_CONSULS}"
            )));
        }
        let keys = r.take(32 * MAX_CONSULS)?;
        let oracles = keys
            .chunks(32)
            .take(count)
            .map(Pubkey::try_from_slice)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StateError::InvalidConsulSet(e.to_string()))?;
        let oracles = ConsulSet::new(bft, round, oracles)
            .map_err(|e| StateError::InvalidConsulSet(e.to_string()))?;

        let has_pulse = r.u8()? == 1;
        let pulse = Pulse {
            round: Round(r.u64()?),
            data_hash: Hash::new(r.array()?),
        };
        let pulse_count = r.u64()?;

        let sub_count = r.u32()? as usize;
        let mut subscriptions = Vec::with_capacity(sub_count.min(1024));
        for _ in 0..sub_count {
            let id = SubscriptionId::new(r.array()?);
            let subscriber = r.pubkey()?;
            let min_confirmations = r.u8()?;
            let queue_size = r.u64()?;
            let delivered = r.u8()? == 1;
            let last = Round(r.u64()?);
            subscriptions.push(Subscription {
                id,
                subscriber,
                min_confirmations,
                queue_size,
                last_round: delivered.then_some(last),
            });
        }

        Ok(Some(Self {
            data_type,
            gravity_state,
            oracles,
            last_pulse: has_pulse.then_some(pulse),
            pulse_count,
            subscriptions,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> NebulaState {
        let oracles = ConsulSet::new(
            2,
            Round(3),
            vec![Pubkey::new([1; 32]), Pubkey::new([2; 32]), Pubkey::new([3; 32])],
        )
        .unwrap();
        NebulaState::new(DataType::Bytes, Pubkey::new([9; 32]), oracles)
    }

    #[test]
    fn test_blank_account() {
        assert_eq!(NebulaState::unpack(&vec![0u8; NebulaState::space(4)]).unwrap(), None);
        assert!(matches!(
            NebulaState::unpack(&[0u8; 16]),
            Err(StateError::WrongSize { len: 16, .. })
        ));
    }

    #[test]
    fn test_pack_roundtrip_with_subscriptions() {
        let mut s = state();
        s.last_pulse = Some(Pulse {
            round: Round(8),
            data_hash: Hash::hash(b"pulse"),
        });
        s.pulse_count = 2;
        s.subscriptions.push(Subscription {
            id: SubscriptionId::new([7; 16]),
            subscriber: Pubkey::new([8; 32]),
            min_confirmations: 1,
            queue_size: 1,
            last_round: None,
        });
        s.subscriptions.push(Subscription {
            id: SubscriptionId::new([6; 16]),
            subscriber: Pubkey::new([5; 32]),
            min_confirmations: 3,
            queue_size: 10,
            last_round: Some(Round(0)),
        });

        let packed = s.pack();
        assert_eq!(packed.len(), NebulaState::space(2));

        // trailing space in the account is ignored
        let mut account = vec![0u8; NebulaState::space(8)];
        account[..packed.len()].copy_from_slice(&packed);
        assert_eq!(NebulaState::unpack(&account).unwrap(), Some(s));
    }

    #[test]
    fn test_round_zero_delivery_is_distinct_from_none() {
        let mut s = state();
        s.subscriptions.push(Subscription {
            id: SubscriptionId::new([1; 16]),
            subscriber: Pubkey::new([2; 32]),
            min_confirmations: 1,
            queue_size: 1,
            last_round: Some(Round::ZERO),
        });
        let back = NebulaState::unpack(&s.pack()).unwrap().unwrap();
        assert_eq!(back.subscriptions[0].last_round, Some(Round::ZERO));
    }
}
