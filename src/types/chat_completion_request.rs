use serde::{Deserialize, Serialize};

use crate::types::ChatMessage;

/// Body of a chat-completion request.
///
/// Unset sampling fields are omitted from the JSON entirely so the endpoint applies its own
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    /// The model identifier.
    pub model: String,

    /// The materialized conversation, directive first.
    pub messages: Vec<ChatMessage>,

    /// Whether the response should be streamed as server-sent events.
    pub stream: bool,

    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Nucleus-sampling probability mass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

impl ChatCompletionRequest {
    /// Create a request for `model` over `messages` with every sampling field unset.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
            max_tokens: None,
            temperature: None,
            top_p: None,
        }
    }
}
