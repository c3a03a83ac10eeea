//! Core chat session management.
//!
//! [`ChatSession`] owns the conversation and the parameters for the lifetime of a session.
//! Command handlers are methods on the session, so every mutation they make is seen by the
//! next request.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::chat::commands::{ChatCommand, help_text, parse_command};
use crate::chat::config::ChatConfig;
use crate::chat::input::InputSource;
use crate::client::InferenceClient;
use crate::conversation::Conversation;
use crate::error::{Error, Result};
use crate::observability::{SESSION_COMMANDS, SESSION_TURNS};
use crate::parameters::{NOT_SET, PARAMETER_NAMES, ParameterSet};
use crate::render::Renderer;
use crate::spinner::{DEFAULT_INTERVAL, Spinner};
use crate::types::ChatCompletionRequest;

/// Prompt shown when reading interactive input.
pub const INPUT_PROMPT: &str = ">>> ";

/// Where the session loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for a line of input.
    AwaitingInput,
    /// Deciding whether a line is a command or a message.
    Dispatching,
    /// Streaming a response.
    Streaming,
    /// Running an in-band command.
    CommandHandling,
    /// The session is over.
    Ended,
}

enum Flow {
    Continue,
    Quit,
}

/// A chat session that manages conversation state and endpoint interactions.
pub struct ChatSession {
    client: InferenceClient,
    model: String,
    conversation: Conversation,
    parameters: ParameterSet,
    initial_prompt: Option<String>,
    spinner: bool,
    indicator: Option<Spinner>,
    token_delay: Option<Duration>,
    interrupt: CancellationToken,
    state: SessionState,
}

impl ChatSession {
    /// Creates a new session for `model` with the given client and configuration.
    pub fn new(client: InferenceClient, model: impl Into<String>, config: &ChatConfig) -> Self {
        let mut conversation = Conversation::new();
        if let Some(prompt) = &config.system_prompt {
            conversation.set_system_prompt(prompt.clone());
        }
        Self {
            client,
            model: model.into(),
            conversation,
            parameters: config.parameters,
            initial_prompt: None,
            spinner: config.spinner,
            indicator: None,
            token_delay: config.token_delay,
            interrupt: CancellationToken::new(),
            state: SessionState::AwaitingInput,
        }
    }

    /// Supplies a prompt to handle before reading any input.
    ///
    /// A non-empty prompt makes the session one-shot: it ends once the prompt is handled.
    pub fn with_initial_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        let prompt = prompt.trim();
        self.initial_prompt = if prompt.is_empty() {
            None
        } else {
            Some(prompt.to_string())
        };
        self
    }

    /// Uses `token` to interrupt an in-flight response.
    pub fn with_interrupt(mut self, token: CancellationToken) -> Self {
        self.interrupt = token;
        self
    }

    /// The model every request is sent to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The conversation so far.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The current generation parameters.
    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// Where the session loop currently is.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The wait indicator of the most recent exchange, if one was shown.
    pub fn wait_indicator(&self) -> Option<&Spinner> {
        self.indicator.as_ref()
    }

    /// Returns true if the session will end after its initial prompt.
    pub fn is_one_shot(&self) -> bool {
        self.initial_prompt.is_some()
    }

    /// Runs the session until the user quits, input ends, or an exchange fails.
    ///
    /// # Errors
    ///
    /// Any failure while streaming a response ends the session and is returned.  Command
    /// errors are reported through `renderer` and the loop continues.
    pub async fn run(
        &mut self,
        input: &mut dyn InputSource,
        renderer: &mut dyn Renderer,
    ) -> Result<()> {
        if let Some(prompt) = self.initial_prompt.take() {
            debug!("handling one-shot prompt");
            let result = self.dispatch(&prompt, renderer).await;
            self.state = SessionState::Ended;
            return result.map(|_| ());
        }

        loop {
            self.state = SessionState::AwaitingInput;
            let Some(line) = input.read_line(INPUT_PROMPT)? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            input.add_history(line);

            match self.dispatch(line, renderer).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(err) => {
                    self.state = SessionState::Ended;
                    return Err(err);
                }
            }
        }
        self.state = SessionState::Ended;
        info!(turns = self.conversation.turn_count(), "chat session ended");
        Ok(())
    }

    async fn dispatch(&mut self, line: &str, renderer: &mut dyn Renderer) -> Result<Flow> {
        self.state = SessionState::Dispatching;
        match parse_command(line) {
            Some(command) => {
                self.state = SessionState::CommandHandling;
                SESSION_COMMANDS.click();
                Ok(self.handle_command(command, renderer))
            }
            None => {
                self.send_streaming(line, renderer).await?;
                Ok(Flow::Continue)
            }
        }
    }

    fn handle_command(&mut self, command: ChatCommand, renderer: &mut dyn Renderer) -> Flow {
        debug!(?command, "handling command");
        match command {
            ChatCommand::Quit => return Flow::Quit,
            ChatCommand::ShowParameters => renderer.print_info(&self.parameters_report()),
            ChatCommand::Reset => {
                self.conversation.reset();
                renderer.print_info("Reset chat history");
            }
            ChatCommand::Set { name, value } => match self.parameters.set_by_name(&name, &value) {
                Ok(()) => renderer.print_info(&format!("Set {name} to {value}")),
                Err(err) => renderer.print_error(&err.to_string()),
            },
            ChatCommand::Unset(name) => match self.parameters.unset_by_name(&name) {
                Ok(()) => renderer.print_info(&format!("Unset {name}")),
                Err(err) => renderer.print_error(&err.to_string()),
            },
            ChatCommand::SystemPrompt(prompt) => {
                let cleared = prompt.is_empty();
                self.conversation.set_system_prompt(prompt);
                if cleared {
                    renderer.print_info("Cleared system prompt");
                } else {
                    renderer.print_info("Updated system prompt");
                }
            }
            ChatCommand::Help => renderer.print_info(help_text()),
            ChatCommand::Invalid(message) => renderer.print_error(&message),
        }
        Flow::Continue
    }

    /// Renders the parameters and the system prompt for display.
    pub fn parameters_report(&self) -> String {
        let mut report = String::from("Current parameters:\n");
        for name in PARAMETER_NAMES {
            report.push_str(&format!("  {name}: {}\n", self.parameters.format(name)));
        }
        report.push_str("\nSystem Prompt:\n");
        report.push_str(&format!(
            "  {}",
            self.conversation.system_prompt().unwrap_or(NOT_SET)
        ));
        report
    }

    /// Sends a user message and streams the response.
    ///
    /// This method:
    /// 1. Adds the user message to history
    /// 2. Sends a streaming request built from the whole history
    /// 3. Renders response chunks as they arrive
    /// 4. Adds the complete assistant response to history
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the stream fails, or the interrupt fires.
    pub async fn send_streaming(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<()> {
        self.state = SessionState::Streaming;
        self.conversation.add_user(user_input);

        let mut request =
            ChatCompletionRequest::new(self.model.clone(), self.conversation.messages());
        self.parameters.apply_to(&mut request);

        let mut indicator = self.spinner.then(|| Spinner::start(DEFAULT_INTERVAL));
        let reply = self.stream_reply(request, &mut indicator, renderer).await;
        if let Some(spinner) = indicator.as_mut() {
            spinner.stop().await;
        }
        self.indicator = indicator;
        let reply = reply?;

        renderer.finish_response();
        self.conversation.add_assistant(reply);
        SESSION_TURNS.click();
        Ok(())
    }

    async fn stream_reply(
        &self,
        request: ChatCompletionRequest,
        spinner: &mut Option<Spinner>,
        renderer: &mut dyn Renderer,
    ) -> Result<String> {
        let interrupt = self.interrupt.clone();
        let mut handle = tokio::select! {
            biased;
            _ = interrupt.cancelled() => return Err(interrupted()),
            handle = self.client.stream(request) => handle?,
        };

        let mut reply = String::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = interrupt.cancelled() => None,
                next = handle.next() => Some(next),
            };
            let Some(next) = next else {
                handle.close();
                return Err(interrupted());
            };
            if let Some(spinner) = spinner.as_mut() {
                spinner.stop().await;
            }
            let Some(chunk) = next? else {
                break;
            };

            let text = chunk.text();
            if text.is_empty() {
                continue;
            }
            reply.push_str(&text);
            renderer.print_text(&text);
            if let Some(delay) = self.token_delay {
                tokio::time::sleep(delay).await;
            }
        }
        handle.close();
        Ok(reply)
    }
}

fn interrupted() -> Error {
    Error::abort("response interrupted")
}
