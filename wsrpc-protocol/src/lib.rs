//! # wsrpc-protocol
//!
//! Message model and binary extraction codec for wsrpc.
//!
//! This crate provides:
//! - A message value model with raw buffers and typed numeric views
//! - The placeholder kind vocabulary shared by interoperating peers
//! - Encoding into a JSON envelope plus an ordered list of binary blocks
//! - Request/Response message shapes with correlation identifiers

pub mod codec;
pub mod error;
pub mod kind;
pub mod message;
pub mod value;

pub use codec::{decode, encode, Codec, CodecLimits, WireParts, PLACEHOLDER_KEY};
pub use error::{DecodeError, EncodeError};
pub use kind::BinaryKind;
pub use message::{MessageType, Request, RequestId, Response, ResponseError};
pub use value::{Binary, Map, Value};
