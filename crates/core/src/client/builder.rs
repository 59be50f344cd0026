use chat_panel_model::{Message, ProviderConfig, Transport};

use super::{ConversationClient, FailurePolicy};

/// [`ConversationClient`] builder.
pub struct ConversationClientBuilder<T> {
    transport: T,
    config: ProviderConfig,
    system_prompt: Option<String>,
    failure_policy: FailurePolicy,
}

impl<T: Transport> ConversationClientBuilder<T> {
    /// Creates a new builder with the specified transport and provider
    /// configuration.
    #[inline]
    pub fn new(transport: T, config: ProviderConfig) -> Self {
        Self {
            transport,
            config,
            system_prompt: None,
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Sets the system instruction that opens the transcript.
    ///
    /// An empty prompt is the same as no prompt.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets what happens to the user message when a request fails.
    #[inline]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Builds the client.
    pub fn build(self) -> ConversationClient<T> {
        let messages = self
            .system_prompt
            .filter(|prompt| !prompt.is_empty())
            .map(Message::system)
            .into_iter()
            .collect();
        ConversationClient::from_parts(
            self.transport,
            self.config,
            self.failure_policy,
            messages,
        )
    }
}
