//! Deterministic fixtures for program, client and simulation tests.
//!
//! Everything here is derived from a `u64` seed, so a failing test can be
//! reproduced exactly.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use solanoid_types::{Keypair, Pubkey, SubscriptionId, SwapId};

/// A seeded RNG for tests.
pub fn test_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// A keypair that depends only on `seed`.
pub fn keypair(seed: u64) -> Keypair {
    Keypair::generate_with(&mut test_rng(seed))
}

/// A random address that no keypair in these fixtures signs for.
pub fn random_pubkey(rng: &mut impl RngCore) -> Pubkey {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    Pubkey::new(bytes)
}

pub fn swap_id(rng: &mut impl RngCore) -> SwapId {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    SwapId::new(bytes)
}

pub fn subscription_id(rng: &mut impl RngCore) -> SubscriptionId {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    SubscriptionId::new(bytes)
}

/// A consul committee with its signing keys.
#[derive(Debug, Clone)]
pub struct ConsulFixture {
    keypairs: Vec<Keypair>,
}

impl ConsulFixture {
    /// `count` consuls drawn from `seed`. Different seeds give disjoint
    /// committees.
    pub fn generate(count: usize, seed: u64) -> Self {
        let mut rng = test_rng(seed);
        Self {
            keypairs: (0..count).map(|_| Keypair::generate_with(&mut rng)).collect(),
        }
    }

    pub fn keypairs(&self) -> &[Keypair] {
        &self.keypairs
    }

    /// Consul keys in committee order.
    pub fn pubkeys(&self) -> Vec<Pubkey> {
        self.keypairs.iter().map(Keypair::pubkey).collect()
    }

    /// The first `n` consuls, for building partial quorums.
    pub fn take(&self, n: usize) -> Vec<Keypair> {
        self.keypairs.iter().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.keypairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypairs.is_empty()
    }
}
