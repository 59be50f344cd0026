//! A stateful conversation client for chat completion endpoints.
//!
//! [`ConversationClient`] keeps the transcript of one conversation and
//! replays it to the endpoint with every request. Replies can be received
//! in one piece, or streamed and decoded from the server-sent event
//! stream as they arrive.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod client;
mod error;
mod io;
mod proto;
mod stats;

pub use chat_panel_model::{
    ErrorKind, Message, ProviderConfig, ProviderConfigBuilder,
    RequestOptions, Role,
};
pub use client::{
    ConversationClient, ConversationClientBuilder, FailurePolicy,
    ReplyStream,
};
pub use error::Error;
pub use stats::DecodeStats;
