//! Message values with embedded binary payloads.

use crate::error::EncodeError;
use crate::kind::BinaryKind;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use indexmap::IndexMap;

/// String-keyed map that keeps insertion order.
pub type Map = IndexMap<String, Value>;

/// A binary payload: a raw byte buffer or a typed numeric view.
///
/// Typed views are laid out little-endian when flattened into the binary
/// list.
#[derive(Debug, Clone)]
pub enum Binary {
    Raw(Bytes),
    Int8(Vec<i8>),
    Uint8(Vec<u8>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

macro_rules! put_le {
    ($values:expr, $put:ident, $size:expr) => {{
        let mut buf = BytesMut::with_capacity($values.len() * $size);
        for v in $values.iter() {
            buf.$put(*v);
        }
        buf.freeze()
    }};
}

macro_rules! get_le {
    ($data:expr, $get:ident, $size:expr) => {{
        let mut buf: &[u8] = $data;
        let mut out = Vec::with_capacity(buf.len() / $size);
        while buf.has_remaining() {
            out.push(buf.$get());
        }
        out
    }};
}

impl Binary {
    /// Creates a zero-filled payload of `len` bytes (raw) or elements (views).
    pub fn zeroed(kind: BinaryKind, len: usize) -> Self {
        match kind {
            BinaryKind::RawBuffer => Binary::Raw(Bytes::from(vec![0u8; len])),
            BinaryKind::Int8 => Binary::Int8(vec![0; len]),
            BinaryKind::Uint8 => Binary::Uint8(vec![0; len]),
            BinaryKind::Int16 => Binary::Int16(vec![0; len]),
            BinaryKind::Uint16 => Binary::Uint16(vec![0; len]),
            BinaryKind::Int32 => Binary::Int32(vec![0; len]),
            BinaryKind::Uint32 => Binary::Uint32(vec![0; len]),
            BinaryKind::Float32 => Binary::Float32(vec![0.0; len]),
            BinaryKind::Float64 => Binary::Float64(vec![0.0; len]),
        }
    }

    pub fn kind(&self) -> BinaryKind {
        match self {
            Binary::Raw(_) => BinaryKind::RawBuffer,
            Binary::Int8(_) => BinaryKind::Int8,
            Binary::Uint8(_) => BinaryKind::Uint8,
            Binary::Int16(_) => BinaryKind::Int16,
            Binary::Uint16(_) => BinaryKind::Uint16,
            Binary::Int32(_) => BinaryKind::Int32,
            Binary::Uint32(_) => BinaryKind::Uint32,
            Binary::Float32(_) => BinaryKind::Float32,
            Binary::Float64(_) => BinaryKind::Float64,
        }
    }

    /// Length in bytes for a raw buffer, in elements for a typed view.
    pub fn len(&self) -> usize {
        match self {
            Binary::Raw(b) => b.len(),
            Binary::Int8(v) => v.len(),
            Binary::Uint8(v) => v.len(),
            Binary::Int16(v) => v.len(),
            Binary::Uint16(v) => v.len(),
            Binary::Int32(v) => v.len(),
            Binary::Uint32(v) => v.len(),
            Binary::Float32(v) => v.len(),
            Binary::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_len(&self) -> usize {
        self.len() * self.kind().element_size()
    }

    /// Flattens the payload into a byte block.
    ///
    /// A raw buffer shares its storage with the returned block.
    pub fn to_le_bytes(&self) -> Bytes {
        match self {
            Binary::Raw(b) => b.clone(),
            Binary::Int8(v) => put_le!(v, put_i8, 1),
            Binary::Uint8(v) => Bytes::copy_from_slice(v),
            Binary::Int16(v) => put_le!(v, put_i16_le, 2),
            Binary::Uint16(v) => put_le!(v, put_u16_le, 2),
            Binary::Int32(v) => put_le!(v, put_i32_le, 4),
            Binary::Uint32(v) => put_le!(v, put_u32_le, 4),
            Binary::Float32(v) => put_le!(v, put_f32_le, 4),
            Binary::Float64(v) => put_le!(v, put_f64_le, 8),
        }
    }

    /// Rebuilds a payload of `kind` over fresh storage copied from `data`.
    ///
    /// Returns `None` if `data` is not a whole number of elements.
    pub fn from_le_bytes(kind: BinaryKind, data: &[u8]) -> Option<Self> {
        if data.len() % kind.element_size() != 0 {
            return None;
        }
        let binary = match kind {
            BinaryKind::RawBuffer => Binary::Raw(Bytes::copy_from_slice(data)),
            BinaryKind::Int8 => Binary::Int8(get_le!(data, get_i8, 1)),
            BinaryKind::Uint8 => Binary::Uint8(data.to_vec()),
            BinaryKind::Int16 => Binary::Int16(get_le!(data, get_i16_le, 2)),
            BinaryKind::Uint16 => Binary::Uint16(get_le!(data, get_u16_le, 2)),
            BinaryKind::Int32 => Binary::Int32(get_le!(data, get_i32_le, 4)),
            BinaryKind::Uint32 => Binary::Uint32(get_le!(data, get_u32_le, 4)),
            BinaryKind::Float32 => Binary::Float32(get_le!(data, get_f32_le, 4)),
            BinaryKind::Float64 => Binary::Float64(get_le!(data, get_f64_le, 8)),
        };
        Some(binary)
    }
}

// Compares kind and bit patterns, so NaN elements in float views compare equal
// to themselves.
impl PartialEq for Binary {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Binary::Raw(a), Binary::Raw(b)) => a == b,
            (Binary::Uint8(a), Binary::Uint8(b)) => a == b,
            _ => self.kind() == other.kind() && self.to_le_bytes() == other.to_le_bytes(),
        }
    }
}

impl From<Bytes> for Binary {
    fn from(bytes: Bytes) -> Self {
        Binary::Raw(bytes)
    }
}

macro_rules! binary_from_vec {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for Binary {
                fn from(values: Vec<$ty>) -> Self {
                    Binary::$variant(values)
                }
            }
        )*
    };
}

binary_from_vec! {
    i8 => Int8,
    u8 => Uint8,
    i16 => Int16,
    u16 => Uint16,
    i32 => Int32,
    u32 => Uint32,
    f32 => Float32,
    f64 => Float64,
}

/// A message node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Map(Map),
    Binary(Binary),
}

impl Value {
    /// Creates an empty map.
    pub fn map() -> Self {
        Value::Map(Map::new())
    }

    /// Looks up `key` if this is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Inserts into a map. Returns `false` and does nothing for non-maps.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        match self {
            Value::Map(map) => {
                map.insert(key.into(), value.into());
                true
            }
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns integers and floats as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Binary> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Short name of the node kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Binary(_) => "binary",
        }
    }

    /// Number of binary payloads anywhere in the tree.
    pub fn binary_count(&self) -> usize {
        match self {
            Value::Binary(_) => 1,
            Value::Array(items) => items.iter().map(Value::binary_count).sum(),
            Value::Map(map) => map.values().map(Value::binary_count).sum(),
            _ => 0,
        }
    }

    /// Converts a binary-free tree into plain JSON.
    pub fn to_json(&self) -> Result<serde_json::Value, EncodeError> {
        crate::codec::to_plain_json(self)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => number_to_value(&n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Integers that fit `i64` stay integers; everything else becomes a float.
pub(crate) fn number_to_value(n: &serde_json::Number) -> Value {
    match n.as_i64() {
        Some(i) => Value::Integer(i),
        None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i.into())
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i.into())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<Binary> for Value {
    fn from(binary: Binary) -> Self {
        Value::Binary(binary)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
