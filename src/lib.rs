//! Streaming, multi-turn chat against a hosted chat-completion endpoint.

// Public modules
pub mod auth;
pub mod catalog;
pub mod chat;
pub mod client;
pub mod conversation;
pub mod error;
pub mod parameters;
pub mod render;
pub mod spinner;
pub mod sse;
pub mod types;

mod observability;

// Re-exports
pub use auth::{EnvTokenProvider, StaticToken, TokenProvider, require_token};
pub use catalog::{HttpCatalog, ModelCatalog, ModelSummary, select_model, validate_model_name};
pub use client::{InferenceClient, StreamHandle};
pub use conversation::Conversation;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use parameters::ParameterSet;
pub use render::{PlainTextRenderer, Renderer};
pub use spinner::Spinner;
pub use sse::{EventReader, SseDecoder, StreamEvent};
pub use types::*;
