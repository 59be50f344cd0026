use chat_panel_model::{Message, ProviderConfig, RequestOptions};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 150;

const DATA_PREFIX: &str = "data: ";

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
    max_tokens: u32,
    stream: bool,
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatCompletion {
    pub choices: Vec<CompletionChoice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CompletionChoice {
    pub message: Message,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatCompletionChunk {
    pub choices: Vec<ChunkChoice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChunkChoice {
    pub delta: Option<Delta>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
}

/// What a single line of an event stream turned out to be.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineEvent {
    /// Not a `data: ` line.
    Ignored,
    /// A `data: ` line that isn't a JSON chunk, including `[DONE]`.
    Malformed,
    /// A JSON chunk without text content.
    Empty,
    /// A JSON chunk carrying a text fragment.
    Fragment(String),
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(
    messages: Vec<Message>,
    options: &RequestOptions,
    config: &ProviderConfig,
    stream: bool,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: options
            .model
            .clone()
            .unwrap_or_else(|| config.default_model().to_owned()),
        messages,
        temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        stream,
    }
}

pub fn parse_event_line(line: &str) -> LineEvent {
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return LineEvent::Ignored;
    };
    let Ok(chunk) = serde_json::from_str::<ChatCompletionChunk>(data) else {
        return LineEvent::Malformed;
    };
    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content);
    match content {
        Some(content) if !content.is_empty() => LineEvent::Fragment(content),
        _ => LineEvent::Empty,
    }
}
