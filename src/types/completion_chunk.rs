use serde::{Deserialize, Serialize};

/// One deserialized completion payload carried by a stream frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompletionChunk {
    /// The choices carried by this chunk.  Some endpoints send an empty list in their first
    /// frame (for example content-filter results), so the field defaults to empty.
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl CompletionChunk {
    /// Concatenated text of every choice in this chunk.
    pub fn text(&self) -> String {
        self.choices
            .iter()
            .filter_map(|choice| choice.payload())
            .map(|payload| payload.text())
            .collect()
    }
}

/// A single choice.  Streamed responses fill `delta`; non-streamed shapes fill `message`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatChoice {
    /// Position of this choice in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,

    /// Incremental content fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<ChoiceContent>,

    /// Full message content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ChoiceContent>,

    /// Why generation stopped, on the final chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Content of a `delta` or `message`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChoiceContent {
    /// The role, present on the first delta of a stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// The text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// The resolved content of a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoicePayload<'a> {
    /// Text from an incremental `delta`.
    Delta(&'a str),

    /// Text from a full `message`.
    Message(&'a str),
}

impl<'a> ChoicePayload<'a> {
    /// The text, whichever shape it came from.
    pub fn text(self) -> &'a str {
        match self {
            ChoicePayload::Delta(text) | ChoicePayload::Message(text) => text,
        }
    }
}

impl ChatChoice {
    /// Resolve this choice to its text, preferring the incremental `delta` and falling back to
    /// the full `message`.  Returns `None` when neither carries content.
    pub fn payload(&self) -> Option<ChoicePayload<'_>> {
        if let Some(text) = self.delta.as_ref().and_then(|d| d.content.as_deref()) {
            Some(ChoicePayload::Delta(text))
        } else {
            self.message
                .as_ref()
                .and_then(|m| m.content.as_deref())
                .map(ChoicePayload::Message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn delta_choice() {
        let chunk: CompletionChunk =
            serde_json::from_value(json!({"choices": [{"delta": {"content": "Hel"}}]})).unwrap();
        assert_eq!(chunk.choices[0].payload(), Some(ChoicePayload::Delta("Hel")));
        assert_eq!(chunk.text(), "Hel");
    }

    #[test]
    fn message_choice() {
        let chunk: CompletionChunk = serde_json::from_value(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello"}}]
        }))
        .unwrap();
        assert_eq!(
            chunk.choices[0].payload(),
            Some(ChoicePayload::Message("Hello"))
        );
    }

    #[test]
    fn delta_wins_over_message() {
        let choice = ChatChoice {
            delta: Some(ChoiceContent {
                role: None,
                content: Some("d".to_string()),
            }),
            message: Some(ChoiceContent {
                role: None,
                content: Some("m".to_string()),
            }),
            ..ChatChoice::default()
        };
        assert_eq!(choice.payload(), Some(ChoicePayload::Delta("d")));
    }

    #[test]
    fn empty_delta_falls_back_to_message() {
        let chunk: CompletionChunk = serde_json::from_value(json!({
            "choices": [{"delta": {"role": "assistant"}, "message": {"content": "m"}}]
        }))
        .unwrap();
        assert_eq!(chunk.text(), "m");
    }

    #[test]
    fn missing_choices_and_unknown_fields() {
        let chunk: CompletionChunk = serde_json::from_value(json!({
            "id": "",
            "prompt_filter_results": [{"prompt_index": 0}]
        }))
        .unwrap();
        assert!(chunk.choices.is_empty());
        assert_eq!(chunk.text(), "");
    }

    #[test]
    fn finish_chunk_has_no_payload() {
        let chunk: CompletionChunk = serde_json::from_value(json!({
            "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
        }))
        .unwrap();
        assert_eq!(chunk.choices[0].payload(), None);
        assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("stop"));
    }
}
