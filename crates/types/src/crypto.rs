//! Ed25519 key pairs and signatures.
//!
//! The protocol treats Ed25519 as an opaque primitive: consuls, deployers and
//! fee payers all sign transaction messages with it, and the ledger verifies
//! those signatures before any program runs.

use crate::{ParseError, Pubkey};
use ed25519_dalek::{Signer, Verifier};
use std::fmt;
use std::str::FromStr;

/// An Ed25519 key pair.
#[derive(Clone)]
pub struct Keypair(ed25519_dalek::SigningKey);

impl Keypair {
    /// Length of the secret‖public byte encoding.
    pub const BYTES: usize = 64;

    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Generate a keypair from an RNG (for deterministic tests and simulation).
    pub fn generate_with<R: rand::RngCore + rand::CryptoRng>(rng: &mut R) -> Self {
        Self(ed25519_dalek::SigningKey::generate(rng))
    }

    /// Build a keypair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(seed))
    }

    /// Decode the 64-byte secret‖public encoding.
    ///
    /// The public half must match the one derived from the secret half.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeypairError> {
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| KeypairError::InvalidLength(bytes.len()))?;
        let signing_key = ed25519_dalek::SigningKey::from_keypair_bytes(&arr)
            .map_err(|_| KeypairError::PublicKeyMismatch)?;
        Ok(Self(signing_key))
    }

    /// Decode a base58 private key (the 64-byte encoding as text).
    pub fn from_base58_string(s: &str) -> Result<Self, KeypairError> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|_| KeypairError::InvalidBase58)?;
        Self::from_bytes(&bytes)
    }

    /// The 64-byte secret‖public encoding.
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_keypair_bytes()
    }

    /// The base58 private key text.
    pub fn to_base58_string(&self) -> String {
        bs58::encode(self.to_bytes()).into_string()
    }

    /// Get the public key.
    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new(self.0.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.0.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({})", self.pubkey())
    }
}

impl PartialEq for Keypair {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for Keypair {}

/// An Ed25519 signature.
///
/// The first signature of a transaction is its identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Size of a signature in bytes.
    pub const BYTES: usize = 64;

    /// Wrap raw signature bytes.
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Placeholder signature, used for unsigned slots in a transaction.
    pub const fn zero() -> Self {
        Self([0u8; 64])
    }

    /// Get signature as byte slice.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Whether this is the placeholder signature.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Verify this signature over `message` against `pubkey`.
    pub fn verify(&self, pubkey: &Pubkey, message: &[u8]) -> bool {
        let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(pubkey.as_bytes()) else {
            return false;
        };
        let sig = ed25519_dalek::Signature::from_bytes(&self.0);
        key.verify(message, &sig).is_ok()
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for Signature {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| ParseError::InvalidBase58(s.to_string()))?;
        let arr: [u8; 64] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ParseError::InvalidLength {
                expected: Self::BYTES,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_string();
        write!(f, "Signature({}..)", &text[..16.min(text.len())])
    }
}

/// Errors decoding key material.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeypairError {
    /// Encoding is not 64 bytes.
    #[error("Keypair must be 64 bytes, got {0}")]
    InvalidLength(usize),

    /// Text is not valid base58.
    #[error("Private key is not valid base58")]
    InvalidBase58,

    /// Public half does not match the secret half.
    #[error("Public key does not match secret key")]
    PublicKeyMismatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = Keypair::generate();
        let message = b"test message";

        let signature = keypair.sign(message);
        assert!(signature.verify(&keypair.pubkey(), message));
        assert!(!signature.verify(&keypair.pubkey(), b"wrong message"));
    }

    #[test]
    fn test_verify_fails_with_other_key() {
        let signer = Keypair::generate();
        let other = Keypair::generate();
        let signature = signer.sign(b"msg");
        assert!(!signature.verify(&other.pubkey(), b"msg"));
    }

    #[test]
    fn test_keypair_from_seed_deterministic() {
        let seed = [42u8; 32];
        let kp1 = Keypair::from_seed(&seed);
        let kp2 = Keypair::from_seed(&seed);

        assert_eq!(kp1.pubkey(), kp2.pubkey());
        assert_eq!(kp1.sign(b"test"), kp2.sign(b"test"));
    }

    #[test]
    fn test_base58_private_key_roundtrip() {
        let keypair = Keypair::from_seed(&[9u8; 32]);
        let text = keypair.to_base58_string();
        let decoded = Keypair::from_base58_string(&text).unwrap();
        assert_eq!(decoded, keypair);
    }

    #[test]
    fn test_rejects_mismatched_public_half() {
        let mut bytes = Keypair::from_seed(&[1u8; 32]).to_bytes();
        bytes[40] ^= 0xff;
        assert_eq!(
            Keypair::from_bytes(&bytes),
            Err(KeypairError::PublicKeyMismatch)
        );
        assert_eq!(
            Keypair::from_bytes(&bytes[..32]),
            Err(KeypairError::InvalidLength(32))
        );
    }
}
