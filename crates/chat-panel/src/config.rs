use std::env;
use std::error::Error;
use std::fmt::{self, Display};

use chat_panel_core::{ProviderConfig, ProviderConfigBuilder};
use chat_panel_http::HttpTransport;

use crate::ChatClient;

const API_URL_VAR: &str = "CHAT_PANEL_API_URL";
const API_KEY_VAR: &str = "CHAT_PANEL_API_KEY";
const MODEL_VAR: &str = "CHAT_PANEL_MODEL";
const SYSTEM_PROMPT_VAR: &str = "CHAT_PANEL_SYSTEM_PROMPT";

/// Error returned when a required environment variable is missing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnvConfigError {
    var: &'static str,
}

impl EnvConfigError {
    /// Returns the name of the missing variable.
    #[inline]
    pub fn var(&self) -> &'static str {
        self.var
    }
}

impl Display for EnvConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} environment variable is not set", self.var)
    }
}

impl Error for EnvConfigError {}

/// Client configuration read from the environment.
///
/// | variable | |
/// |---|---|
/// | `CHAT_PANEL_API_URL` | endpoint URL, required |
/// | `CHAT_PANEL_API_KEY` | bearer credential, required |
/// | `CHAT_PANEL_MODEL` | default model, required |
/// | `CHAT_PANEL_SYSTEM_PROMPT` | system instruction, optional |
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// Where and how to reach the endpoint.
    pub provider: ProviderConfig,
    /// The system instruction that opens every conversation.
    pub system_prompt: Option<String>,
}

impl EnvConfig {
    /// Reads the configuration from the process environment.
    #[inline]
    pub fn from_env() -> Result<Self, EnvConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable
    /// name to its value.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, EnvConfigError> {
        let require = |var: &'static str| {
            lookup(var)
                .filter(|value| !value.is_empty())
                .ok_or(EnvConfigError { var })
        };

        let provider =
            ProviderConfigBuilder::with_endpoint(require(API_URL_VAR)?)
                .with_credential(require(API_KEY_VAR)?)
                .with_default_model(require(MODEL_VAR)?)
                .build();
        let system_prompt =
            lookup(SYSTEM_PROMPT_VAR).filter(|prompt| !prompt.is_empty());
        debug!("loaded configuration: {provider:?}");

        Ok(Self {
            provider,
            system_prompt,
        })
    }

    /// Creates a conversation client over HTTP with this configuration.
    #[inline]
    pub fn connect(self) -> ChatClient {
        ChatClient::new(HttpTransport::new(), self.provider, self.system_prompt)
    }
}
