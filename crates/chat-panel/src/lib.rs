//! An out-of-the-box chat client for OpenAI-compatible completion
//! endpoints.
//!
//! The crate wires the conversation client to the HTTP transport and
//! reads its configuration from the environment. It also ships a small
//! terminal front-end.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;

pub use chat_panel_http::HttpTransport;
pub use config::{EnvConfig, EnvConfigError};

/// A conversation client talking HTTP.
pub type ChatClient = chat_panel_core::ConversationClient<HttpTransport>;

/// Re-exports of [`chat_panel_core`] crate.
pub mod core {
    pub use chat_panel_core::*;
}
