//! # wsrpc-client
//!
//! Client-side correlation for wsrpc.
//!
//! This crate provides:
//! - A pending request table with monotonically increasing identifiers
//! - A mutex-guarded variant for multi-threaded callers
//! - Sessions that pair the codec with a pending table per connection
//! - YAML and environment configuration

pub mod config;
pub mod error;
pub mod pending;
pub mod session;
pub mod shared;

pub use config::{Config, ConfigError, PendingConfig};
pub use error::{ClientError, PendingError};
pub use pending::PendingTable;
pub use session::{Reply, Responder, Session};
pub use shared::SharedPendingTable;
pub use wsrpc_protocol::RequestId;
