use std::time::Duration;

/// Per-call overrides for a request.
///
/// Every field left as `None` falls back to a default when the request is
/// built: temperature `0.7`, `150` max output tokens, the configured
/// default model, and no streaming.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Maximum number of output tokens.
    pub max_tokens: Option<u32>,
    /// Model identifier.
    pub model: Option<String>,
    /// Whether the endpoint should stream the response.
    pub stream: Option<bool>,
    /// Upper bound for the whole operation, from the call until the reply
    /// has been fully received.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Sets the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the maximum number of output tokens.
    #[inline]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the model identifier.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Asks for a streamed response.
    #[inline]
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Sets a deadline relative to the start of the call.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
