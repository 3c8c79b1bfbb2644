//! Binary extraction codec.
//!
//! A message is split into a JSON envelope and an ordered list of byte
//! blocks. Every binary payload is replaced in the envelope by a
//! placeholder object:
//!
//! ```text
//! {"$binary": "float32", "length": 3, "index": 0}
//! ```
//!
//! `length` counts bytes for a `raw-buffer` and elements for a typed view.
//! `index` is the position of the payload's bytes in the binary list, in
//! depth-first encounter order.

use crate::error::{DecodeError, EncodeError};
use crate::kind::BinaryKind;
use crate::value::{number_to_value, Binary, Map, Value};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::fmt;

/// Reserved map key marking a placeholder object.
pub const PLACEHOLDER_KEY: &str = "$binary";

/// Placeholder field carrying the payload length.
pub const LENGTH_KEY: &str = "length";

/// Placeholder field carrying the binary list index.
pub const INDEX_KEY: &str = "index";

/// Default maximum container nesting.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Highest nesting limit a codec accepts. The envelope parser rejects
/// documents nested deeper than 128 levels, placeholders included.
pub const MAX_DEPTH: usize = 120;

/// Default maximum number of binary payloads per message.
pub const DEFAULT_MAX_BINARIES: usize = 65_536;

/// Bounds enforced by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecLimits {
    /// Maximum container nesting. Deeper messages fail to encode.
    /// Values above [`MAX_DEPTH`] are lowered to it by the codec.
    pub max_depth: usize,
    /// Maximum binary payloads per message.
    pub max_binaries: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_binaries: DEFAULT_MAX_BINARIES,
        }
    }
}

impl CodecLimits {
    /// Sets the nesting limit, capped at [`MAX_DEPTH`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.min(MAX_DEPTH);
        self
    }

    pub fn with_max_binaries(mut self, max_binaries: usize) -> Self {
        self.max_binaries = max_binaries;
        self
    }
}

/// Output of [`Codec::encode`]: the envelope text plus its binary list.
///
/// The transport must deliver both together and keep the list in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireParts {
    pub envelope: String,
    pub binaries: Vec<Bytes>,
}

impl WireParts {
    /// Total bytes across the binary list.
    pub fn binary_bytes(&self) -> usize {
        self.binaries.iter().map(Bytes::len).sum()
    }
}

/// Splits messages into wire parts and reassembles them.
///
/// Stateless apart from its limits; one instance can serve any number of
/// messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec {
    limits: CodecLimits,
}

impl Codec {
    /// Creates a codec. A `max_depth` above [`MAX_DEPTH`] is capped so that
    /// everything the codec encodes can also be decoded.
    pub fn new(mut limits: CodecLimits) -> Self {
        if limits.max_depth > MAX_DEPTH {
            tracing::warn!(
                "codec max_depth {} lowered to {}",
                limits.max_depth,
                MAX_DEPTH
            );
            limits.max_depth = MAX_DEPTH;
        }
        Self { limits }
    }

    pub fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    /// Encodes a message into an envelope and its binary list.
    pub fn encode(&self, message: &Value) -> Result<WireParts, EncodeError> {
        let mut binaries = Vec::new();
        let tree = {
            let mut extractor = Extractor {
                limits: &self.limits,
                binaries: Some(&mut binaries),
            };
            extractor.extract(message, &mut Path::default())?
        };
        let envelope = serde_json::to_string(&tree)?;

        tracing::trace!(
            "encoded message: envelope={} bytes, binaries={}",
            envelope.len(),
            binaries.len()
        );
        Ok(WireParts { envelope, binaries })
    }

    /// Reassembles a message from an envelope and its binary list.
    ///
    /// Each payload is copied into fresh storage; the result never shares
    /// memory with `binaries`.
    pub fn decode(&self, envelope: &str, binaries: &[Bytes]) -> Result<Value, DecodeError> {
        if binaries.len() > self.limits.max_binaries {
            return Err(DecodeError::TooManyBinaries {
                count: binaries.len(),
                max: self.limits.max_binaries,
            });
        }

        let tree: Json = serde_json::from_str(envelope)?;
        let message = Assembler { binaries }.assemble(tree)?;

        tracing::trace!(
            "decoded message: envelope={} bytes, binaries={}",
            envelope.len(),
            binaries.len()
        );
        Ok(message)
    }

    /// Decodes wire parts produced by [`Codec::encode`].
    pub fn decode_parts(&self, parts: &WireParts) -> Result<Value, DecodeError> {
        self.decode(&parts.envelope, &parts.binaries)
    }
}

/// Encodes with default limits.
pub fn encode(message: &Value) -> Result<WireParts, EncodeError> {
    Codec::default().encode(message)
}

/// Decodes with default limits.
pub fn decode(envelope: &str, binaries: &[Bytes]) -> Result<Value, DecodeError> {
    Codec::default().decode(envelope, binaries)
}

/// Converts a binary-free message into plain JSON.
pub(crate) fn to_plain_json(message: &Value) -> Result<Json, EncodeError> {
    let limits = CodecLimits::default();
    let mut extractor = Extractor {
        limits: &limits,
        binaries: None,
    };
    extractor.extract(message, &mut Path::default())
}

enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Location of the node being encoded, rendered only for error messages.
#[derive(Default)]
struct Path<'a> {
    segments: Vec<Segment<'a>>,
}

impl fmt::Display for Path<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.segments {
            match segment {
                Segment::Key(key) => write!(f, ".{}", key)?,
                Segment::Index(i) => write!(f, "[{}]", i)?,
            }
        }
        Ok(())
    }
}

struct Extractor<'a> {
    limits: &'a CodecLimits,
    /// `None` when binaries are not allowed (plain JSON conversion).
    binaries: Option<&'a mut Vec<Bytes>>,
}

impl Extractor<'_> {
    fn extract<'v>(&mut self, value: &'v Value, path: &mut Path<'v>) -> Result<Json, EncodeError> {
        match value {
            Value::Null => Ok(Json::Null),
            Value::Bool(b) => Ok(Json::Bool(*b)),
            Value::Integer(i) => Ok(Json::from(*i)),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .ok_or_else(|| EncodeError::NonFiniteFloat {
                    path: path.to_string(),
                }),
            Value::String(s) => Ok(Json::String(s.clone())),
            Value::Array(items) => {
                self.enter(path)?;
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    path.segments.push(Segment::Index(i));
                    let node = self.extract(item, path);
                    path.segments.pop();
                    out.push(node?);
                }
                Ok(Json::Array(out))
            }
            Value::Map(map) => {
                self.enter(path)?;
                if map.contains_key(PLACEHOLDER_KEY) {
                    return Err(EncodeError::ReservedKey {
                        path: path.to_string(),
                    });
                }
                let mut out = serde_json::Map::with_capacity(map.len());
                for (key, item) in map {
                    path.segments.push(Segment::Key(key));
                    let node = self.extract(item, path);
                    path.segments.pop();
                    out.insert(key.clone(), node?);
                }
                Ok(Json::Object(out))
            }
            Value::Binary(binary) => self.placeholder(binary, path),
        }
    }

    fn enter(&self, path: &Path<'_>) -> Result<(), EncodeError> {
        // The container being entered sits one level below its path.
        if path.segments.len() >= self.limits.max_depth {
            return Err(EncodeError::DepthExceeded {
                max: self.limits.max_depth,
            });
        }
        Ok(())
    }

    fn placeholder(&mut self, binary: &Binary, path: &Path<'_>) -> Result<Json, EncodeError> {
        let max = self.limits.max_binaries;
        let binaries = self
            .binaries
            .as_deref_mut()
            .ok_or_else(|| EncodeError::BinaryInPlainJson {
                path: path.to_string(),
            })?;
        if binaries.len() >= max {
            return Err(EncodeError::TooManyBinaries { max });
        }

        let index = binaries.len();
        binaries.push(binary.to_le_bytes());

        let mut out = serde_json::Map::with_capacity(3);
        out.insert(
            PLACEHOLDER_KEY.to_string(),
            Json::String(binary.kind().tag().to_string()),
        );
        out.insert(LENGTH_KEY.to_string(), Json::from(binary.len()));
        out.insert(INDEX_KEY.to_string(), Json::from(index));
        Ok(Json::Object(out))
    }
}

struct Assembler<'a> {
    binaries: &'a [Bytes],
}

impl Assembler<'_> {
    fn assemble(&self, node: Json) -> Result<Value, DecodeError> {
        match node {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Ok(Value::Bool(b)),
            Json::Number(n) => Ok(number_to_value(&n)),
            Json::String(s) => Ok(Value::String(s)),
            Json::Array(items) => items
                .into_iter()
                .map(|item| self.assemble(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Json::Object(map) if map.contains_key(PLACEHOLDER_KEY) => {
                self.resolve(&map).map(Value::Binary)
            }
            Json::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, item) in map {
                    out.insert(key, self.assemble(item)?);
                }
                Ok(Value::Map(out))
            }
        }
    }

    fn resolve(&self, placeholder: &serde_json::Map<String, Json>) -> Result<Binary, DecodeError> {
        let tag = placeholder
            .get(PLACEHOLDER_KEY)
            .and_then(Json::as_str)
            .ok_or(DecodeError::MalformedPlaceholder("kind tag is not a string"))?;
        let kind =
            BinaryKind::from_tag(tag).ok_or_else(|| DecodeError::UnknownKind(tag.to_string()))?;

        if placeholder.len() != 3 {
            return Err(DecodeError::MalformedPlaceholder(
                "expected exactly kind, length and index",
            ));
        }
        let length = placeholder
            .get(LENGTH_KEY)
            .and_then(Json::as_u64)
            .ok_or(DecodeError::MalformedPlaceholder(
                "length is not a non-negative integer",
            ))?;
        let index = placeholder
            .get(INDEX_KEY)
            .and_then(Json::as_u64)
            .ok_or(DecodeError::MalformedPlaceholder(
                "index is not a non-negative integer",
            ))?;

        let block = usize::try_from(index)
            .ok()
            .and_then(|i| self.binaries.get(i))
            .ok_or(DecodeError::IndexOutOfBounds {
                index,
                count: self.binaries.len(),
            })?;

        let mismatch = || DecodeError::LengthMismatch {
            kind,
            length,
            byte_len: block.len(),
        };
        let expected = length.checked_mul(kind.element_size() as u64);
        if expected != Some(block.len() as u64) {
            return Err(mismatch());
        }
        Binary::from_le_bytes(kind, block).ok_or_else(mismatch)
    }
}
