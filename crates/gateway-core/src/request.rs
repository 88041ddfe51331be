//! Request peeks for the HTTP front door.
//!
//! The gateway forwards request bodies untouched. It only peeks at a few
//! fields: the model name drives routing and the message sizes feed request
//! logs. Everything else in the body is ignored here.

use serde::Deserialize;
use serde_json::Value;

/// Fields read from a `/v1/chat/completions` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionPeek {
    /// Requested model
    #[serde(default)]
    pub model: String,
    /// Conversation messages
    #[serde(default)]
    pub messages: Vec<PeekMessage>,
}

impl ChatCompletionPeek {
    /// Parse a request body
    ///
    /// # Errors
    /// Returns error if the body is not valid JSON of the expected shape
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Approximate context size in characters of text content
    #[must_use]
    pub fn context_size(&self) -> usize {
        self.messages.iter().map(|m| m.content.text_len()).sum()
    }
}

/// A chat message, reduced to what the gateway inspects
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeekMessage {
    /// Author role
    #[serde(default)]
    pub role: String,
    /// Message content
    #[serde(default)]
    pub content: MessageContent,
}

/// Message content: plain text or a list of content parts
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text
    Text(String),
    /// Multimodal parts; only `text` fields are measured
    Parts(Vec<Value>),
    /// Anything else (null, objects)
    Other(Value),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Other(Value::Null)
    }
}

impl MessageContent {
    /// Length of the textual content
    #[must_use]
    pub fn text_len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .map(str::len)
                .sum(),
            Self::Other(_) => 0,
        }
    }
}

/// Fields read from a `POST /v1/responses` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsesPeek {
    /// Requested model
    #[serde(default)]
    pub model: String,
    /// Input: a string or a list of input items
    #[serde(default)]
    pub input: Option<Value>,
}

impl ResponsesPeek {
    /// Parse a request body
    ///
    /// # Errors
    /// Returns error if the body is not valid JSON of the expected shape
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Number of input items and their approximate text size
    #[must_use]
    pub fn input_stats(&self) -> (usize, usize) {
        match &self.input {
            Some(Value::String(text)) => (1, text.len()),
            Some(Value::Array(items)) => {
                let size = items
                    .iter()
                    .filter_map(|item| item.get("content"))
                    .map(|content| {
                        serde_json::from_value::<MessageContent>(content.clone())
                            .map(|c| c.text_len())
                            .unwrap_or(0)
                    })
                    .sum();
                (items.len(), size)
            }
            _ => (0, 0),
        }
    }
}
