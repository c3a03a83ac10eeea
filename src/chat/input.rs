//! Line sources for the session loop.

use std::collections::VecDeque;
use std::io;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::error::{Error, Result};

/// Supplies one line of user input at a time.
pub trait InputSource {
    /// Reads a line after showing `prompt`.  `None` means the user ended input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Records a line the session acted on.
    fn add_history(&mut self, _line: &str) {}
}

/// Interactive input backed by a rustyline editor.
pub struct EditorInput {
    editor: DefaultEditor,
}

impl EditorInput {
    /// Creates an editor attached to the terminal.
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().map_err(|e| {
            Error::io("failed to initialize line editor", io::Error::other(e.to_string()))
        })?;
        Ok(Self { editor })
    }
}

impl InputSource for EditorInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => Ok(None),
            Err(ReadlineError::Io(err)) => Err(Error::io("failed to read input", err)),
            Err(err) => Err(Error::io(
                "failed to read input",
                io::Error::other(err.to_string()),
            )),
        }
    }

    fn add_history(&mut self, line: &str) {
        let _ = self.editor.add_history_entry(line);
    }
}

/// Input that replays a fixed list of lines, then reports end of input.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
    history: Vec<String>,
}

impl ScriptedInput {
    /// Creates a source that yields `lines` in order.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            history: Vec::new(),
        }
    }

    /// Lines not yet read.
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }

    /// Lines recorded with [`InputSource::add_history`].
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl InputSource for ScriptedInput {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(self.lines.pop_front())
    }

    fn add_history(&mut self, line: &str) {
        self.history.push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_input_replays_then_ends() {
        let mut input = ScriptedInput::new(["one", "two"]);
        assert_eq!(input.read_line("> ").unwrap().as_deref(), Some("one"));
        input.add_history("one");
        assert_eq!(input.remaining(), 1);
        assert_eq!(input.read_line("> ").unwrap().as_deref(), Some("two"));
        assert_eq!(input.read_line("> ").unwrap(), None);
        assert_eq!(input.history(), &["one".to_string()]);
    }
}
