//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Oracle or consul round number.
///
/// Rounds only move forward: every state update must carry a round strictly
/// greater than the last one accepted for the same stream.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Round(pub u64);

impl Round {
    /// The round a fresh registry starts from.
    pub const ZERO: Self = Round(0);

    /// Get the next round.
    pub fn next(self) -> Self {
        Round(self.0.saturating_add(1))
    }

    /// Whether `self` strictly follows `previous`.
    ///
    /// `None` means no round has been accepted yet, so every round follows it.
    pub fn is_after(self, previous: Option<Round>) -> bool {
        match previous {
            Some(prev) => self.0 > prev.0,
            None => true,
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Round({})", self.0)
    }
}

macro_rules! id16 {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; 16]);

        impl $name {
            /// Size in bytes.
            pub const BYTES: usize = 16;

            /// Wrap raw bytes.
            pub const fn new(bytes: [u8; 16]) -> Self {
                Self(bytes)
            }

            /// Get bytes as slice reference.
            pub fn as_bytes(&self) -> &[u8; 16] {
                &self.0
            }

            /// Parse from hex text.
            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let mut out = [0u8; 16];
                hex::decode_to_slice(s, &mut out)?;
                Ok(Self(out))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), hex::encode(&self.0[..4]))
            }
        }

        impl From<[u8; 16]> for $name {
            fn from(bytes: [u8; 16]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

id16!(
    /// Identifier of a Nebula subscription, chosen by the subscriber.
    SubscriptionId,
    "SubscriptionId"
);

id16!(
    /// Identifier of a cross-chain swap. Each may be attached at most once.
    SwapId,
    "SwapId"
);

/// Kind of value an oracle feed carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataType {
    /// Signed 64-bit integers.
    Int64 = 0,
    /// UTF-8 strings.
    String = 1,
    /// Opaque byte vectors, e.g. bridge mint vectors.
    Bytes = 2,
}

impl DataType {
    /// The wire tag.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for DataType {
    type Error = UnknownDataType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DataType::Int64),
            1 => Ok(DataType::String),
            2 => Ok(DataType::Bytes),
            other => Err(UnknownDataType(other)),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int64 => write!(f, "int64"),
            DataType::String => write!(f, "string"),
            DataType::Bytes => write!(f, "bytes"),
        }
    }
}

/// A data type tag outside the known set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Unknown data type tag {0}")]
pub struct UnknownDataType(pub u8);
