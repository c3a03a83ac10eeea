//! Multi-turn conversation history.

use crate::error::{Error, Result};
use crate::types::{ChatMessage, ChatRole};

/// Ordered user/assistant turns plus an optional system directive.
///
/// The directive is not a turn.  It is injected at the front of [`Conversation::messages`]
/// every time the list is materialized, survives [`Conversation::reset`], and is not counted
/// by [`Conversation::turn_count`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    turns: Vec<ChatMessage>,
    system_prompt: Option<String>,
}

impl Conversation {
    /// Creates an empty conversation with no directive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty conversation with the given directive.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.set_system_prompt(prompt);
        conversation
    }

    /// Appends a turn.  Only user and assistant turns may be stored.
    pub fn add_message(&mut self, role: ChatRole, content: impl Into<String>) -> Result<()> {
        if role == ChatRole::System {
            return Err(Error::validation(
                "system messages are set with the system prompt, not appended as turns",
                Some("role".to_string()),
            ));
        }
        self.turns.push(ChatMessage::new(role, content));
        Ok(())
    }

    /// Appends a user turn.
    pub fn add_user(&mut self, content: impl Into<String>) {
        self.turns.push(ChatMessage::user(content));
    }

    /// Appends an assistant turn.
    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(ChatMessage::assistant(content));
    }

    /// Materializes the message list for a request.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        if let Some(prompt) = self.system_prompt() {
            messages.push(ChatMessage::system(prompt));
        }
        messages.extend(self.turns.iter().cloned());
        messages
    }

    /// The stored turns, without the directive.
    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    /// Number of stored turns.
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Clears every stored turn.  The directive is kept.
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    /// Replaces the directive.  An empty prompt clears it.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        self.system_prompt = if prompt.is_empty() { None } else { Some(prompt) };
    }

    /// The current directive, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }
}
