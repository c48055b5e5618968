//! Ledger transaction wire format.
//!
//! A transaction is a compact-u16 array of signatures followed by a message:
//! a three-byte header, a compact-u16 array of account keys (fee payer
//! first, then signers, then the rest, writable before read-only within each
//! group), the recent blockhash, and a compact-u16 array of compiled
//! instructions that refer to accounts by index.

use indexmap::IndexMap;
use std::collections::HashMap;
use solanoid_codec::{CodecError, Reader};
use solanoid_core::Instruction;
use solanoid_types::{AccountMeta, Hash, Keypair, Pubkey, Signature};

/// Maximum serialized transaction size the ledger accepts.
pub const PACKET_DATA_SIZE: usize = 1232;

/// Errors building, signing or parsing a transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("Too many accounts: {0} (max 256)")]
    TooManyAccounts(usize),

    #[error("No keypair supplied for required signer {0}")]
    MissingSigner(Pubkey),

    #[error("Keypair {0} is not a signer of this message")]
    UnexpectedSigner(Pubkey),

    #[error("Transaction is {size} bytes (max {PACKET_DATA_SIZE})")]
    TooLarge { size: usize },

    #[error("Expected {expected} signatures, found {actual}")]
    SignatureCountMismatch { expected: usize, actual: usize },

    #[error("Account index {0} out of range")]
    InvalidIndex(u8),

    #[error("Invalid compact-u16 length")]
    InvalidLength,

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Counts that classify the account key list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

/// An instruction whose accounts are indices into the message key list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

/// The signed part of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Compile instructions, merging each account's privileges across all
    /// of its appearances.
    pub fn new(
        instructions: &[Instruction],
        payer: &Pubkey,
        recent_blockhash: Hash,
    ) -> Result<Self, TransactionError> {
        // key -> (is_signer, is_writable), first appearance order
        let mut privileges: IndexMap<Pubkey, (bool, bool)> = IndexMap::new();
        privileges.insert(*payer, (true, true));
        for ix in instructions {
            for meta in &ix.accounts {
                let entry = privileges.entry(meta.pubkey).or_insert((false, false));
                entry.0 |= meta.is_signer;
                entry.1 |= meta.is_writable;
            }
            privileges.entry(ix.program_id).or_insert((false, false));
        }
        if privileges.len() > 256 {
            return Err(TransactionError::TooManyAccounts(privileges.len()));
        }

        let mut account_keys = keys_with(&privileges, (true, true));
        let readonly_signed = keys_with(&privileges, (true, false));
        let writable_unsigned = keys_with(&privileges, (false, true));
        let readonly_unsigned = keys_with(&privileges, (false, false));

        let header = MessageHeader {
            num_required_signatures: (account_keys.len() + readonly_signed.len()) as u8,
            num_readonly_signed_accounts: readonly_signed.len() as u8,
            num_readonly_unsigned_accounts: readonly_unsigned.len() as u8,
        };
        account_keys.extend(readonly_signed);
        account_keys.extend(writable_unsigned);
        account_keys.extend(readonly_unsigned);

        let positions: HashMap<Pubkey, u8> = account_keys
            .iter()
            .enumerate()
            .map(|(i, key)| (*key, i as u8))
            .collect();
        let index_of = |key: &Pubkey| positions.get(key).copied().unwrap_or_default();
        let compiled = instructions
            .iter()
            .map(|ix| CompiledInstruction {
                program_id_index: index_of(&ix.program_id),
                accounts: ix.accounts.iter().map(|m| index_of(&m.pubkey)).collect(),
                data: ix.data.clone(),
            })
            .collect();

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    pub fn num_signers(&self) -> usize {
        self.header.num_required_signatures as usize
    }

    pub fn is_signer(&self, index: usize) -> bool {
        index < self.num_signers()
    }

    pub fn is_writable(&self, index: usize) -> bool {
        let signers = self.num_signers();
        if index < signers {
            index < signers - self.header.num_readonly_signed_accounts as usize
        } else {
            index < self.account_keys.len() - self.header.num_readonly_unsigned_accounts as usize
        }
    }

    /// Keys that must sign, in signature order.
    pub fn signer_keys(&self) -> &[Pubkey] {
        &self.account_keys[..self.num_signers().min(self.account_keys.len())]
    }

    /// Fee payer (first key).
    pub fn payer(&self) -> Option<&Pubkey> {
        self.account_keys.first()
    }

    /// Resolve compiled instructions back to keyed instructions.
    pub fn decompile(&self) -> Result<Vec<Instruction>, TransactionError> {
        let key = |index: u8| {
            self.account_keys
                .get(index as usize)
                .copied()
                .ok_or(TransactionError::InvalidIndex(index))
        };
        self.instructions
            .iter()
            .map(|ix| {
                let accounts = ix
                    .accounts
                    .iter()
                    .map(|&i| {
                        Ok(AccountMeta {
                            pubkey: key(i)?,
                            is_signer: self.is_signer(i as usize),
                            is_writable: self.is_writable(i as usize),
                        })
                    })
                    .collect::<Result<Vec<_>, TransactionError>>()?;
                Ok(Instruction::new_with_bytes(
                    key(ix.program_id_index)?,
                    ix.data.clone(),
                    accounts,
                ))
            })
            .collect()
    }

    /// Bytes covered by the signatures.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = vec![
            self.header.num_required_signatures,
            self.header.num_readonly_signed_accounts,
            self.header.num_readonly_unsigned_accounts,
        ];
        encode_compact_u16(&mut out, self.account_keys.len());
        for key in &self.account_keys {
            out.extend_from_slice(key.as_bytes());
        }
        out.extend_from_slice(self.recent_blockhash.as_bytes());
        encode_compact_u16(&mut out, self.instructions.len());
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            encode_compact_u16(&mut out, ix.accounts.len());
            out.extend_from_slice(&ix.accounts);
            encode_compact_u16(&mut out, ix.data.len());
            out.extend_from_slice(&ix.data);
        }
        out
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, TransactionError> {
        let header = MessageHeader {
            num_required_signatures: r.u8()?,
            num_readonly_signed_accounts: r.u8()?,
            num_readonly_unsigned_accounts: r.u8()?,
        };
        let key_count = decode_compact_u16(r)?;
        let mut account_keys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            account_keys.push(r.pubkey()?);
        }
        let recent_blockhash = Hash::new(r.array()?);
        let ix_count = decode_compact_u16(r)?;
        let mut instructions = Vec::with_capacity(ix_count);
        for _ in 0..ix_count {
            let program_id_index = r.u8()?;
            let n = decode_compact_u16(r)?;
            let accounts = r.take(n)?.to_vec();
            let n = decode_compact_u16(r)?;
            let data = r.take(n)?.to_vec();
            instructions.push(CompiledInstruction {
                program_id_index,
                accounts,
                data,
            });
        }
        if (header.num_required_signatures as usize) > account_keys.len() {
            return Err(TransactionError::InvalidIndex(header.num_required_signatures));
        }
        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }
}

/// A message plus one signature per required signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

impl Transaction {
    /// Sign `message` with `keypairs`.
    ///
    /// Every required signer needs a keypair, and every keypair must belong
    /// to a required signer.
    pub fn sign(message: Message, keypairs: &[&Keypair]) -> Result<Self, TransactionError> {
        let signer_keys = message.signer_keys();
        if let Some(extra) = keypairs
            .iter()
            .map(|kp| kp.pubkey())
            .find(|key| !signer_keys.contains(key))
        {
            return Err(TransactionError::UnexpectedSigner(extra));
        }
        let bytes = message.serialize();
        let signatures = signer_keys
            .iter()
            .map(|key| {
                keypairs
                    .iter()
                    .find(|kp| &kp.pubkey() == key)
                    .map(|kp| kp.sign(&bytes))
                    .ok_or(TransactionError::MissingSigner(*key))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            signatures,
            message,
        })
    }

    /// Compile and sign in one step. `payer` pays fees and signs first.
    pub fn new_signed(
        instructions: &[Instruction],
        payer: &Keypair,
        signers: &[&Keypair],
        recent_blockhash: Hash,
    ) -> Result<Self, TransactionError> {
        let message = Message::new(instructions, &payer.pubkey(), recent_blockhash)?;
        let mut keypairs = Vec::with_capacity(signers.len() + 1);
        keypairs.push(payer);
        keypairs.extend_from_slice(signers);
        Self::sign(message, &keypairs)
    }

    /// Transaction id: the fee payer's signature.
    pub fn id(&self) -> Signature {
        self.signatures.first().copied().unwrap_or_default()
    }

    /// Check every signature against its key.
    pub fn verify(&self) -> bool {
        let signer_keys = self.message.signer_keys();
        if self.signatures.len() != signer_keys.len() {
            return false;
        }
        let bytes = self.message.serialize();
        self.signatures
            .iter()
            .zip(signer_keys)
            .all(|(sig, key)| sig.verify(key, &bytes))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encode_compact_u16(&mut out, self.signatures.len());
        for sig in &self.signatures {
            out.extend_from_slice(sig.as_bytes());
        }
        out.extend_from_slice(&self.message.serialize());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut r = Reader::new(bytes);
        let count = decode_compact_u16(&mut r)?;
        let mut signatures = Vec::with_capacity(count);
        for _ in 0..count {
            signatures.push(Signature::new(r.array()?));
        }
        let message = Message::read(&mut r)?;
        r.finish()?;
        if signatures.len() != message.num_signers() {
            return Err(TransactionError::SignatureCountMismatch {
                expected: message.num_signers(),
                actual: signatures.len(),
            });
        }
        Ok(Self {
            signatures,
            message,
        })
    }

    /// Fail if the serialized form exceeds [`PACKET_DATA_SIZE`].
    pub fn check_size(&self) -> Result<(), TransactionError> {
        let size = self.to_bytes().len();
        if size > PACKET_DATA_SIZE {
            return Err(TransactionError::TooLarge { size });
        }
        Ok(())
    }
}

fn keys_with(privileges: &IndexMap<Pubkey, (bool, bool)>, flags: (bool, bool)) -> Vec<Pubkey> {
    privileges
        .iter()
        .filter(|(_, f)| **f == flags)
        .map(|(key, _)| *key)
        .collect()
}

fn encode_compact_u16(out: &mut Vec<u8>, value: usize) {
    let mut rem = value as u16;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            return;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

fn decode_compact_u16(r: &mut Reader<'_>) -> Result<usize, TransactionError> {
    let mut value: usize = 0;
    for i in 0..3 {
        let byte = r.u8()?;
        value |= ((byte & 0x7f) as usize) << (7 * i);
        if byte & 0x80 == 0 {
            if value > u16::MAX as usize {
                return Err(TransactionError::InvalidLength);
            }
            return Ok(value);
        }
    }
    Err(TransactionError::InvalidLength)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kp(seed: u8) -> Keypair {
        Keypair::from_seed(&[seed; 32])
    }

    #[test]
    fn test_compact_u16() {
        for (value, expected) in [
            (0usize, vec![0x00]),
            (0x7f, vec![0x7f]),
            (0x80, vec![0x80, 0x01]),
            (0x3fff, vec![0xff, 0x7f]),
            (0xffff, vec![0xff, 0xff, 0x03]),
        ] {
            let mut out = Vec::new();
            encode_compact_u16(&mut out, value);
            assert_eq!(out, expected);
            assert_eq!(decode_compact_u16(&mut Reader::new(&out)).unwrap(), value);
        }
    }

    #[test]
    fn test_key_ordering_and_header() {
        let payer = kp(1);
        let cosigner = kp(2);
        let program = Pubkey::new([9; 32]);
        let state = Pubkey::new([7; 32]);
        let readonly = Pubkey::new([8; 32]);
        let ix = Instruction::new_with_bytes(
            program,
            vec![1, 2, 3],
            vec![
                AccountMeta::new(state, false),
                AccountMeta::new(payer.pubkey(), true),
                AccountMeta::new_readonly(cosigner.pubkey(), true),
                AccountMeta::new_readonly(readonly, false),
            ],
        );
        let message = Message::new(&[ix.clone()], &payer.pubkey(), Hash::ZERO).unwrap();

        assert_eq!(
            message.account_keys,
            vec![payer.pubkey(), cosigner.pubkey(), state, readonly, program]
        );
        assert_eq!(message.header.num_required_signatures, 2);
        assert_eq!(message.header.num_readonly_signed_accounts, 1);
        assert_eq!(message.header.num_readonly_unsigned_accounts, 2);
        assert!(message.is_writable(0));
        assert!(!message.is_writable(1));
        assert!(message.is_writable(2));
        assert!(!message.is_writable(3));

        // Decompiling restores order and flags.
        assert_eq!(message.decompile().unwrap(), vec![ix]);
    }

    #[test]
    fn test_sign_verify_and_wire_roundtrip() {
        let payer = kp(1);
        let cosigner = kp(2);
        let ix = Instruction::new_with_bytes(
            Pubkey::new([9; 32]),
            vec![0],
            vec![AccountMeta::new_readonly(cosigner.pubkey(), true)],
        );
        let tx = Transaction::new_signed(&[ix], &payer, &[&cosigner], Hash::hash(b"bh")).unwrap();
        assert!(tx.verify());
        assert_eq!(tx.id(), tx.signatures[0]);

        let parsed = Transaction::from_bytes(&tx.to_bytes()).unwrap();
        assert_eq!(parsed, tx);
        assert!(parsed.verify());

        let mut tampered = tx.clone();
        tampered.message.recent_blockhash = Hash::hash(b"other");
        assert!(!tampered.verify());
    }

    #[test]
    fn test_signer_mismatch() {
        let payer = kp(1);
        let needed = kp(2);
        let ix = Instruction::new_with_bytes(
            Pubkey::new([9; 32]),
            vec![],
            vec![AccountMeta::new_readonly(needed.pubkey(), true)],
        );
        assert_eq!(
            Transaction::new_signed(&[ix.clone()], &payer, &[], Hash::ZERO),
            Err(TransactionError::MissingSigner(needed.pubkey()))
        );
        let stranger = kp(3);
        assert_eq!(
            Transaction::new_signed(&[ix], &payer, &[&needed, &stranger], Hash::ZERO),
            Err(TransactionError::UnexpectedSigner(stranger.pubkey()))
        );
    }

    #[test]
    fn test_size_limit() {
        let payer = kp(1);
        let ix = Instruction::new_with_bytes(Pubkey::new([9; 32]), vec![0u8; 1300], vec![]);
        let tx = Transaction::new_signed(&[ix], &payer, &[], Hash::ZERO).unwrap();
        assert!(matches!(tx.check_size(), Err(TransactionError::TooLarge { .. })));
    }
}
