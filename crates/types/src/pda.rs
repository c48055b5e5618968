//! Program-derived addresses.
//!
//! A PDA is `SHA-256(seeds ‖ program_id ‖ "ProgramDerivedAddress")`, accepted
//! only when the digest is not a valid Ed25519 point. Off-curve addresses
//! have no private key, so only the deriving program can sign for them (by
//! presenting the seeds to the runtime).

use crate::{Hash, Keypair, Pubkey};
use tracing::debug;

/// Maximum number of seeds in one derivation.
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed.
pub const MAX_SEED_LEN: usize = 32;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Derivation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PdaError {
    /// More than [`MAX_SEEDS`] seeds.
    #[error("Too many seeds: {0} (max {MAX_SEEDS})")]
    TooManySeeds(usize),

    /// A seed longer than [`MAX_SEED_LEN`].
    #[error("Seed {index} is {len} bytes (max {MAX_SEED_LEN})")]
    SeedTooLong {
        /// Position of the offending seed.
        index: usize,
        /// Its length.
        len: usize,
    },

    /// The candidate lies on the curve.
    #[error("Derived address is on the ed25519 curve")]
    OnCurve,

    /// Every bump seed from 255 down to 0 produced an on-curve candidate.
    #[error("No viable bump seed for program {0}")]
    NoViableBump(Pubkey),

    /// Key regeneration gave up.
    #[error("No off-curve address after {0} keypair attempts")]
    AttemptsExhausted(u32),
}

/// Derive the address for exactly these seeds under `program_id`.
pub fn create_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Pubkey, PdaError> {
    if seeds.len() > MAX_SEEDS {
        return Err(PdaError::TooManySeeds(seeds.len()));
    }
    if let Some((index, seed)) = seeds.iter().enumerate().find(|(_, s)| s.len() > MAX_SEED_LEN) {
        return Err(PdaError::SeedTooLong {
            index,
            len: seed.len(),
        });
    }

    let mut parts: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 2);
    parts.extend_from_slice(seeds);
    parts.push(program_id.as_bytes());
    parts.push(PDA_MARKER);

    let candidate = Pubkey::new(Hash::hashv(&parts).to_bytes());
    if candidate.is_on_curve() {
        return Err(PdaError::OnCurve);
    }
    Ok(candidate)
}

/// Search bump seeds from 255 down to 0 and return the first off-curve
/// address together with its bump.
///
/// The program id stays fixed; only the trailing bump byte varies.
pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8), PdaError> {
    if seeds.len() >= MAX_SEEDS {
        return Err(PdaError::TooManySeeds(seeds.len() + 1));
    }
    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        with_bump.extend_from_slice(seeds);
        with_bump.push(&bump_seed);

        match create_program_address(&with_bump, program_id) {
            Ok(address) => return Ok((address, bump)),
            Err(PdaError::OnCurve) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(PdaError::NoViableBump(*program_id))
}

/// Generate a fresh keypair whose public key, used as the program id, yields
/// an off-curve address for exactly `seeds` (no bump).
///
/// Each failed attempt discards the keypair and tries a new one, so the
/// returned address belongs to a different key than any earlier attempt.
/// Gives up after `max_attempts`.
pub fn generate_keyed_program_address<R>(
    seeds: &[&[u8]],
    max_attempts: u32,
    rng: &mut R,
) -> Result<(Keypair, Pubkey), PdaError>
where
    R: rand::RngCore + rand::CryptoRng,
{
    for attempt in 1..=max_attempts {
        let keypair = Keypair::generate_with(rng);
        match create_program_address(seeds, &keypair.pubkey()) {
            Ok(address) => return Ok((keypair, address)),
            Err(PdaError::OnCurve) => {
                debug!(attempt, key = %keypair.pubkey(), "Derived address on curve, regenerating key");
            }
            Err(e) => return Err(e),
        }
    }
    Err(PdaError::AttemptsExhausted(max_attempts))
}
