//! Slash command parsing for the chat session.
//!
//! Commands start with `/` and control the session without sending anything to the
//! endpoint.

/// Prefix that marks a line as a command.
pub const COMMAND_PREFIX: char = '/';

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// End the session (`/bye`, `/exit`, `/quit`).
    Quit,

    /// Display the parameters and the system prompt.
    ShowParameters,

    /// Clear the conversation history (`/reset`, `/clear`).
    Reset,

    /// Set a named parameter.
    Set {
        /// Parameter name.
        name: String,
        /// Unparsed value.
        value: String,
    },

    /// Clear a named parameter.
    Unset(String),

    /// Replace the system prompt.  An empty prompt clears it.
    SystemPrompt(String),

    /// Display help information.
    Help,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input starts with `/`, or `None` if it should be sent
/// as a message.
///
/// # Examples
///
/// ```
/// # use modelchat::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/bye"), Some(ChatCommand::Quit));
/// assert!(parse_command("Hello!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix(COMMAND_PREFIX)?;

    let (command, argument) = match rest.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, argument.trim()),
        None => (rest, ""),
    };

    let result = match command {
        "bye" | "exit" | "quit" => ChatCommand::Quit,
        "parameters" => ChatCommand::ShowParameters,
        "reset" | "clear" => ChatCommand::Reset,
        "set" => {
            let parts: Vec<&str> = argument.split_whitespace().collect();
            match parts.as_slice() {
                [name, value] => ChatCommand::Set {
                    name: name.to_string(),
                    value: value.to_string(),
                },
                _ => ChatCommand::Invalid(
                    "Invalid /set syntax. Usage: /set <name> <value>".to_string(),
                ),
            }
        }
        "unset" => {
            let parts: Vec<&str> = argument.split_whitespace().collect();
            match parts.as_slice() {
                [name] => ChatCommand::Unset(name.to_string()),
                _ => {
                    ChatCommand::Invalid("Invalid /unset syntax. Usage: /unset <name>".to_string())
                }
            }
        }
        "system-prompt" => ChatCommand::SystemPrompt(strip_quotes(argument).to_string()),
        "help" => ChatCommand::Help,
        _ => ChatCommand::Invalid(format!(
            "Unknown command '{input}'. See /help for supported commands."
        )),
    };

    Some(result)
}

/// Removes one matching pair of `"` or `'` around `text`.
fn strip_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}

/// Returns the help text for available commands.
pub fn help_text() -> &'static str {
    r#"Commands:
  /bye, /exit, /quit     Exit the chat
  /parameters            Show current parameters and system prompt
  /reset, /clear         Clear chat history
  /set <name> <value>    Set a parameter (max-tokens, temperature, top-p)
  /unset <name>          Reset a parameter to the endpoint default
  /system-prompt <text>  Replace the system prompt (empty text clears it)
  /help                  Show this help message"#
}
