//! Request and response message shapes.
//!
//! Messages are plain [`Value`] maps so that parameters and results may
//! carry binary payloads anywhere. The `id` field correlates a response
//! with its request.

use crate::error::DecodeError;
use crate::value::{Map, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Field holding the message type.
pub const TYPE_FIELD: &str = "type";

/// Field holding the correlation identifier.
pub const ID_FIELD: &str = "id";

/// Correlation identifier for an outbound call.
///
/// Travels as a 64-bit JSON integer; identifiers above `i64::MAX` appear
/// negative on the wire and convert back to the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl RequestId {
    pub fn get(self) -> u64 {
        self.0
    }

    fn to_value(self) -> Value {
        Value::Integer(self.0 as i64)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64().map(|id| RequestId(id as u64))
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        RequestId(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Request,
    Response,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Request => "request",
            MessageType::Response => "response",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "request" => Some(MessageType::Request),
            "response" => Some(MessageType::Response),
            _ => None,
        }
    }
}

/// Reads the message type of any message.
pub fn message_type(message: &Value) -> Option<MessageType> {
    message
        .get(TYPE_FIELD)
        .and_then(Value::as_str)
        .and_then(MessageType::parse)
}

/// Reads the correlation identifier of any message.
pub fn correlation_id(message: &Value) -> Option<RequestId> {
    message.get(ID_FIELD).and_then(RequestId::from_value)
}

/// Outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Correlation identifier.
    pub id: RequestId,

    /// Method to invoke on the peer.
    pub method: String,

    /// Call parameters, possibly carrying binary payloads.
    pub params: Value,
}

impl Request {
    pub fn new(id: RequestId, method: impl Into<String>) -> Self {
        Self {
            id,
            method: method.into(),
            params: Value::map(),
        }
    }

    pub fn with_params(mut self, params: impl Into<Value>) -> Self {
        self.params = params.into();
        self
    }

    /// Builds the message map.
    pub fn into_value(self) -> Value {
        let mut map = Map::with_capacity(4);
        map.insert(TYPE_FIELD.to_string(), MessageType::Request.as_str().into());
        map.insert(ID_FIELD.to_string(), self.id.to_value());
        map.insert("method".to_string(), Value::String(self.method));
        map.insert("params".to_string(), self.params);
        Value::Map(map)
    }

    /// Parses a message map. Missing params default to an empty map.
    pub fn from_value(message: Value) -> Result<Self, DecodeError> {
        let mut map = expect_type(message, MessageType::Request)?;
        let id = take_id(&map)?;
        let method = match map.swap_remove("method") {
            Some(Value::String(method)) => method,
            Some(_) => {
                return Err(DecodeError::InvalidField {
                    field: "method",
                    reason: "expected a string",
                })
            }
            None => return Err(DecodeError::MissingField("method")),
        };
        let params = map.swap_remove("params").unwrap_or_else(Value::map);
        Ok(Self { id, method, params })
    }
}

/// Error details carried by a failed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseError {
    /// Stable, machine-readable code.
    pub code: String,

    /// Human-readable message.
    pub message: String,
}

impl ResponseError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ResponseError {}

/// Reply to a [`Request`].
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Identifier of the request this response correlates to.
    pub id: RequestId,

    /// Result payload (for successful responses).
    pub result: Option<Value>,

    /// Error details (for error responses).
    pub error: Option<ResponseError>,
}

impl Response {
    pub fn ok(id: RequestId, result: impl Into<Value>) -> Self {
        Self {
            id,
            result: Some(result.into()),
            error: None,
        }
    }

    pub fn error(id: RequestId, error: ResponseError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Converts into the call outcome. A response with neither field
    /// yields `Value::Null`.
    pub fn into_result(self) -> Result<Value, ResponseError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or_default()),
        }
    }

    /// Builds the message map.
    pub fn into_value(self) -> Value {
        let mut map = Map::with_capacity(4);
        map.insert(TYPE_FIELD.to_string(), MessageType::Response.as_str().into());
        map.insert(ID_FIELD.to_string(), self.id.to_value());
        if let Some(result) = self.result {
            map.insert("result".to_string(), result);
        }
        if let Some(error) = self.error {
            let details: Value = [
                ("code", Value::String(error.code)),
                ("message", Value::String(error.message)),
            ]
            .into_iter()
            .collect();
            map.insert("error".to_string(), details);
        }
        Value::Map(map)
    }

    /// Parses a message map.
    pub fn from_value(message: Value) -> Result<Self, DecodeError> {
        let mut map = expect_type(message, MessageType::Response)?;
        let id = take_id(&map)?;
        let result = map.swap_remove("result");
        let error = match map.swap_remove("error") {
            None | Some(Value::Null) => None,
            Some(details) => Some(parse_error(&details)?),
        };
        Ok(Self { id, result, error })
    }
}

fn expect_type(message: Value, expected: MessageType) -> Result<Map, DecodeError> {
    let map = match message {
        Value::Map(map) => map,
        _ => {
            return Err(DecodeError::InvalidField {
                field: "message",
                reason: "expected a map",
            })
        }
    };
    let found = map
        .get(TYPE_FIELD)
        .map(|v| v.as_str().and_then(MessageType::parse));
    match found {
        None => Err(DecodeError::MissingField("type")),
        Some(Some(found)) if found == expected => Ok(map),
        Some(_) => Err(DecodeError::InvalidField {
            field: "type",
            reason: "unexpected message type",
        }),
    }
}

fn take_id(map: &Map) -> Result<RequestId, DecodeError> {
    let value = map.get(ID_FIELD).ok_or(DecodeError::MissingField("id"))?;
    RequestId::from_value(value).ok_or(DecodeError::InvalidField {
        field: "id",
        reason: "expected an integer",
    })
}

fn parse_error(details: &Value) -> Result<ResponseError, DecodeError> {
    let field = |name: &'static str| {
        details
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(DecodeError::InvalidField {
                field: "error",
                reason: "expected code and message strings",
            })
    };
    Ok(ResponseError {
        code: field("code")?,
        message: field("message")?,
    })
}
