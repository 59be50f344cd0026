use std::fmt::{self, Debug};

/// Builder for [`ProviderConfig`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ProviderConfigBuilder {
    endpoint: String,
    credential: String,
    default_model: Option<String>,
}

impl ProviderConfigBuilder {
    /// Creates a builder with the given endpoint URL.
    ///
    /// Requests are posted to this URL as is, no path is appended.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(endpoint: S) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential: String::new(),
            default_model: None,
        }
    }

    /// Sets the bearer credential.
    #[inline]
    pub fn with_credential<S: Into<String>>(mut self, credential: S) -> Self {
        self.credential = credential.into();
        self
    }

    /// Sets the model used when a request doesn't name one.
    #[inline]
    pub fn with_default_model<S: Into<String>>(mut self, model: S) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> ProviderConfig {
        ProviderConfig {
            endpoint: self.endpoint,
            credential: self.credential,
            default_model: self
                .default_model
                .unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
        }
    }
}

impl Debug for ProviderConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfigBuilder")
            .field("endpoint", &self.endpoint)
            .field("credential", &"<redacted>")
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Where and how to reach the completion endpoint.
///
/// The configuration is immutable once built.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ProviderConfig {
    endpoint: String,
    credential: String,
    default_model: String,
}

impl ProviderConfig {
    /// Returns the endpoint URL.
    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the bearer credential.
    #[inline]
    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// Returns the default model identifier.
    #[inline]
    pub fn default_model(&self) -> &str {
        &self.default_model
    }
}

impl Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("credential", &"<redacted>")
            .field("default_model", &self.default_model)
            .finish()
    }
}
