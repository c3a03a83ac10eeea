// Public modules
pub mod chat_completion_request;
pub mod chat_message;
pub mod completion_chunk;

// Re-exports
pub use chat_completion_request::ChatCompletionRequest;
pub use chat_message::{ChatMessage, ChatRole};
pub use completion_chunk::{ChatChoice, ChoiceContent, ChoicePayload, CompletionChunk};
