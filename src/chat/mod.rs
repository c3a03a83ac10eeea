//! Interactive chat session.
//!
//! This module provides a streaming REPL built on top of the client library. It supports:
//!
//! - Streaming responses with incremental display
//! - Slash commands for session control
//! - One-shot mode for a prompt given up front
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: the session loop and endpoint interaction
//! - [`commands`]: slash command parsing
//! - [`input`]: interactive and scripted line sources

mod commands;
mod config;
mod input;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{COMMAND_PREFIX, ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, TERMINAL_TOKEN_DELAY};
pub use input::{EditorInput, InputSource, ScriptedInput};
pub use session::{ChatSession, INPUT_PROMPT, SessionState};
