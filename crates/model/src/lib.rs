//! Shared vocabulary for talking to a chat completion endpoint.
//!
//! This crate defines the conversation data model (roles, messages,
//! per-call options), the provider configuration, and the seam between a
//! conversation client and the HTTP layer that carries its requests.
//!
//! Types in this crate don't define any behavior, the transport traits are
//! the constraints that implementors should adhere to. Production and test
//! transports live in their own crates.

#![deny(missing_docs)]

mod config;
mod error;
mod message;
mod options;
mod transport;

pub use config::*;
pub use error::*;
pub use message::*;
pub use options::*;
pub use transport::*;
