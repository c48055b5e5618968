//! The oracle membership set.

use crate::{Pubkey, Round};
use std::collections::HashSet;

/// Current oracle membership: an ordered list of consul keys, the BFT
/// threshold `bft` and the round at which the set was installed.
///
/// Order is significant: it defines signer indexing and is preserved by the
/// wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsulSet {
    bft: u8,
    round: Round,
    consuls: Vec<Pubkey>,
}

impl ConsulSet {
    /// Validate and build a consul set.
    ///
    /// Requires `bft >= 1`, at least `bft` consuls, and no repeated key.
    pub fn new(bft: u8, round: Round, consuls: Vec<Pubkey>) -> Result<Self, ConsulSetError> {
        if bft == 0 {
            return Err(ConsulSetError::ZeroThreshold);
        }
        if consuls.len() < bft as usize {
            return Err(ConsulSetError::TooFewConsuls {
                bft,
                count: consuls.len(),
            });
        }
        let mut seen = HashSet::with_capacity(consuls.len());
        for key in &consuls {
            if !seen.insert(*key) {
                return Err(ConsulSetError::DuplicateConsul(*key));
            }
        }
        Ok(Self {
            bft,
            round,
            consuls,
        })
    }

    /// BFT threshold.
    pub fn bft(&self) -> u8 {
        self.bft
    }

    /// Round at which this set was installed.
    pub fn round(&self) -> Round {
        self.round
    }

    /// Consul keys in signer order.
    pub fn consuls(&self) -> &[Pubkey] {
        &self.consuls
    }

    /// Number of consuls.
    pub fn len(&self) -> usize {
        self.consuls.len()
    }

    /// Always false for a validated set.
    pub fn is_empty(&self) -> bool {
        self.consuls.is_empty()
    }

    /// Whether `key` is a member.
    pub fn contains(&self, key: &Pubkey) -> bool {
        self.consuls.contains(key)
    }

    /// Count distinct members among `signers`. Non-members and repeats are ignored.
    pub fn count_signers<'a>(&self, signers: impl IntoIterator<Item = &'a Pubkey>) -> usize {
        let mut counted = HashSet::new();
        for signer in signers {
            if self.contains(signer) {
                counted.insert(*signer);
            }
        }
        counted.len()
    }

    /// Whether `signers` contain at least `bft` distinct members.
    pub fn has_quorum<'a>(&self, signers: impl IntoIterator<Item = &'a Pubkey>) -> bool {
        self.count_signers(signers) >= self.bft as usize
    }
}

/// Reasons a consul set is invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsulSetError {
    /// Threshold of zero would authorize anything.
    #[error("BFT threshold must be at least 1")]
    ZeroThreshold,

    /// Fewer consuls than the threshold.
    #[error("BFT threshold {bft} exceeds consul count {count}")]
    TooFewConsuls {
        /// Requested threshold.
        bft: u8,
        /// Consuls supplied.
        count: usize,
    },

    /// A key appears twice.
    #[error("Consul {0} listed more than once")]
    DuplicateConsul(Pubkey),
}
