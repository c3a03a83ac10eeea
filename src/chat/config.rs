//! Configuration types for the chat session.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved configuration the
//! session runs with.

use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::error::{Error, Result};
use crate::parameters::{MAX_TOKENS, ParameterSet, TEMPERATURE, TOP_P};

/// Delay between rendered chunks when writing to a terminal.
pub const TERMINAL_TOKEN_DELAY: Duration = Duration::from_millis(10);

/// Command-line arguments for the modelchat tool.
///
/// The model and the initial prompt are positional and are not part of this struct.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: endpoint default)", "TOKENS")]
    pub max_tokens: Option<String>,

    /// Sampling temperature.
    #[arrrg(optional, "Sampling temperature (default: endpoint default)", "VALUE")]
    pub temperature: Option<String>,

    /// Nucleus-sampling probability.
    #[arrrg(optional, "Top-p sampling (default: endpoint default)", "VALUE")]
    pub top_p: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt for the conversation", "PROMPT")]
    pub system_prompt: Option<String>,

    /// Base URL of the inference endpoint.
    #[arrrg(optional, "Base URL of the inference endpoint", "URL")]
    pub base_url: Option<String>,

    /// URL of the model catalog.
    #[arrrg(optional, "URL of the model catalog", "URL")]
    pub catalog_url: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Disable the wait indicator.
    #[arrrg(flag, "Disable the wait indicator")]
    pub no_spinner: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing command-line
/// arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Model requested on the command line, before catalog validation.
    pub model: Option<String>,

    /// Optional system prompt to set conversation context.
    pub system_prompt: Option<String>,

    /// Initial generation parameters.
    pub parameters: ParameterSet,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether to show the wait indicator before the first chunk.
    pub spinner: bool,

    /// Pause after each rendered chunk.
    pub token_delay: Option<Duration>,

    /// Base URL of the inference endpoint, if not the default.
    pub base_url: Option<String>,

    /// URL of the model catalog, if not the default.
    pub catalog_url: Option<String>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: chosen interactively
    /// - Parameters: all unset
    /// - Color: enabled
    /// - Spinner: disabled
    /// - Token delay: none
    pub fn new() -> Self {
        Self {
            model: None,
            system_prompt: None,
            parameters: ParameterSet::new(),
            use_color: true,
            spinner: false,
            token_delay: None,
            base_url: None,
            catalog_url: None,
        }
    }

    /// Sets the requested model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the initial parameters.
    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters = parameters;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Enables or disables the wait indicator.
    pub fn with_spinner(mut self, spinner: bool) -> Self {
        self.spinner = spinner;
        self
    }

    /// Sets the pause after each rendered chunk.
    pub fn with_token_delay(mut self, delay: Option<Duration>) -> Self {
        self.token_delay = delay;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let mut parameters = ParameterSet::new();
        for (name, value) in [
            (MAX_TOKENS, &args.max_tokens),
            (TEMPERATURE, &args.temperature),
            (TOP_P, &args.top_p),
        ] {
            if let Some(value) = value {
                parameters.set_by_name(name, value)?;
            }
        }

        Ok(ChatConfig {
            system_prompt: args.system_prompt.filter(|prompt| !prompt.is_empty()),
            parameters,
            use_color: !args.no_color,
            spinner: !args.no_spinner,
            base_url: args.base_url,
            catalog_url: args.catalog_url,
            ..ChatConfig::new()
        })
    }
}
