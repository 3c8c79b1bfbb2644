//! Placeholder kind tags.
//!
//! These tags are part of the wire contract and must remain stable across
//! interoperating implementations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of binary payload a placeholder stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryKind {
    #[serde(rename = "raw-buffer")]
    RawBuffer,
    #[serde(rename = "int8")]
    Int8,
    #[serde(rename = "uint8")]
    Uint8,
    #[serde(rename = "int16")]
    Int16,
    #[serde(rename = "uint16")]
    Uint16,
    #[serde(rename = "int32")]
    Int32,
    #[serde(rename = "uint32")]
    Uint32,
    #[serde(rename = "float32")]
    Float32,
    #[serde(rename = "float64")]
    Float64,
}

impl BinaryKind {
    /// Every kind, raw buffer first, then typed views.
    pub const ALL: [BinaryKind; 9] = [
        BinaryKind::RawBuffer,
        BinaryKind::Int8,
        BinaryKind::Uint8,
        BinaryKind::Int16,
        BinaryKind::Uint16,
        BinaryKind::Int32,
        BinaryKind::Uint32,
        BinaryKind::Float32,
        BinaryKind::Float64,
    ];

    /// Returns the wire tag.
    pub fn tag(&self) -> &'static str {
        match self {
            BinaryKind::RawBuffer => "raw-buffer",
            BinaryKind::Int8 => "int8",
            BinaryKind::Uint8 => "uint8",
            BinaryKind::Int16 => "int16",
            BinaryKind::Uint16 => "uint16",
            BinaryKind::Int32 => "int32",
            BinaryKind::Uint32 => "uint32",
            BinaryKind::Float32 => "float32",
            BinaryKind::Float64 => "float64",
        }
    }

    /// Parses a wire tag. Returns `None` for tags outside the vocabulary.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.tag() == tag)
    }

    /// Bytes per element. A raw buffer counts in bytes.
    pub fn element_size(&self) -> usize {
        match self {
            BinaryKind::RawBuffer | BinaryKind::Int8 | BinaryKind::Uint8 => 1,
            BinaryKind::Int16 | BinaryKind::Uint16 => 2,
            BinaryKind::Int32 | BinaryKind::Uint32 | BinaryKind::Float32 => 4,
            BinaryKind::Float64 => 8,
        }
    }

    /// Whether this is a typed numeric view rather than a raw buffer.
    pub fn is_typed_view(&self) -> bool {
        !matches!(self, BinaryKind::RawBuffer)
    }
}

impl fmt::Display for BinaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
