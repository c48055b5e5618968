//! Byte cursor and builder shared by every layout in this crate.

use solanoid_types::Pubkey;

/// Decoding failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Empty instruction data.
    #[error("Instruction data is empty")]
    Empty,

    /// Discriminant outside the program's table.
    #[error("Unknown {program} instruction discriminant {tag}")]
    UnknownDiscriminant {
        /// Program whose table was consulted.
        program: &'static str,
        /// Offending byte.
        tag: u8,
    },

    /// Buffer ended early.
    #[error("Truncated data: needed {needed} more bytes, {remaining} remaining")]
    UnexpectedEnd {
        /// Bytes the next field needs.
        needed: usize,
        /// Bytes left.
        remaining: usize,
    },

    /// Bytes left after a fixed layout.
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),

    /// A buffer whose length does not fit the layout.
    #[error("Invalid {what} length {len}")]
    InvalidLength {
        /// Field name.
        what: &'static str,
        /// Actual length.
        len: usize,
    },

    /// A tag byte with no defined meaning.
    #[error("Invalid {what} tag {tag}")]
    InvalidTag {
        /// Field name.
        what: &'static str,
        /// Offending value.
        tag: u32,
    },
}

/// Cursor over a byte slice.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Start reading at offset 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Take the next `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEnd {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Take a fixed-size array.
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub fn f64(&mut self) -> Result<f64, CodecError> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    pub fn pubkey(&mut self) -> Result<Pubkey, CodecError> {
        Ok(Pubkey::new(self.array()?))
    }

    /// A one-byte-tagged optional key (instruction form).
    pub fn pubkey_option(&mut self) -> Result<Option<Pubkey>, CodecError> {
        match self.u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.pubkey()?)),
            tag => Err(CodecError::InvalidTag {
                what: "option",
                tag: tag as u32,
            }),
        }
    }

    /// A four-byte-tagged optional key with fixed width (account form).
    pub fn pubkey_coption(&mut self) -> Result<Option<Pubkey>, CodecError> {
        let tag = self.u32()?;
        let key = self.pubkey()?;
        match tag {
            0 => Ok(None),
            1 => Ok(Some(key)),
            tag => Err(CodecError::InvalidTag { what: "coption", tag }),
        }
    }

    /// Four-byte-tagged optional `u64` with fixed width (account form).
    pub fn u64_coption(&mut self) -> Result<Option<u64>, CodecError> {
        let tag = self.u32()?;
        let value = self.u64()?;
        match tag {
            0 => Ok(None),
            1 => Ok(Some(value)),
            tag => Err(CodecError::InvalidTag { what: "coption", tag }),
        }
    }

    /// Everything left.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    /// Fail if anything is left.
    pub fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

/// Append-only byte builder.
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Start an instruction with its discriminant.
    pub fn with_tag(tag: u8) -> Self {
        Self { buf: vec![tag] }
    }

    /// Start an account layout of known size.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn u8(mut self, v: u8) -> Self {
        self.buf.push(v);
        self
    }

    pub fn u32(mut self, v: u32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u64(mut self, v: u64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f64(mut self, v: f64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn bytes(mut self, v: &[u8]) -> Self {
        self.buf.extend_from_slice(v);
        self
    }

    pub fn pubkey(self, key: &Pubkey) -> Self {
        self.bytes(key.as_bytes())
    }

    pub fn pubkey_option(self, key: Option<&Pubkey>) -> Self {
        match key {
            Some(key) => self.u8(1).pubkey(key),
            None => self.u8(0),
        }
    }

    pub fn pubkey_coption(self, key: Option<&Pubkey>) -> Self {
        match key {
            Some(key) => self.u32(1).pubkey(key),
            None => self.u32(0).pubkey(&Pubkey::ZERO),
        }
    }

    pub fn u64_coption(self, v: Option<u64>) -> Self {
        match v {
            Some(v) => self.u32(1).u64(v),
            None => self.u32(0).u64(0),
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Concatenate raw 32-byte keys in list order.
pub fn encode_consul_bytes(keys: &[Pubkey]) -> Vec<u8> {
    let mut out = Vec::with_capacity(keys.len() * Pubkey::BYTES);
    for key in keys {
        out.extend_from_slice(key.as_bytes());
    }
    out
}

/// Split concatenated keys, preserving order.
pub fn decode_consul_bytes(bytes: &[u8]) -> Result<Vec<Pubkey>, CodecError> {
    if bytes.len() % Pubkey::BYTES != 0 {
        return Err(CodecError::InvalidLength {
            what: "consul list",
            len: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(Pubkey::BYTES)
        .map(|chunk| {
            let mut key = [0u8; 32];
            key.copy_from_slice(chunk);
            Pubkey::new(key)
        })
        .collect())
}
