//! Chat message types and conversation files.
//!
//! A [`Message`] is an immutable `(role, content)` pair. The CLI reads
//! conversations from JSON, either as a bare array of messages or as an
//! object carrying the target model alongside the messages.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CtxWindowError, Result};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

/// A conversation as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Model the conversation targets, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Messages in chronological order.
    pub messages: Vec<Message>,
}

/// Both accepted file shapes.
#[derive(Deserialize)]
#[serde(untagged)]
enum ConversationFile {
    Messages(Vec<Message>),
    Document(Conversation),
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

/// Parse a conversation from a JSON string.
pub fn parse_conversation(json: &str) -> std::result::Result<Conversation, serde_json::Error> {
    let file: ConversationFile = serde_json::from_str(json)?;
    Ok(match file {
        ConversationFile::Messages(messages) => Conversation {
            model: None,
            messages,
        },
        ConversationFile::Document(conversation) => conversation,
    })
}

/// Read a conversation from a JSON file.
pub fn read_conversation(path: &Path) -> Result<Conversation> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CtxWindowError::io(format!("reading conversation '{}'", path.display()), e)
    })?;

    parse_conversation(&content).map_err(|e| {
        CtxWindowError::parse(
            format!("failed to parse conversation '{}'", path.display()),
            e,
        )
    })
}

/// Write a conversation to a JSON file.
pub fn write_conversation(conversation: &Conversation, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(conversation)
        .map_err(|e| CtxWindowError::parse("failed to serialize conversation", e))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            CtxWindowError::io(format!("creating directory '{}'", parent.display()), e)
        })?;
    }

    std::fs::write(path, json).map_err(|e| {
        CtxWindowError::io(format!("writing conversation to '{}'", path.display()), e)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn parses_bare_array() {
        let conv = parse_conversation(
            r#"[{"role":"system","content":"be brief"},{"role":"user","content":"hi"}]"#,
        )
        .unwrap();
        assert_eq!(conv.model, None);
        assert_eq!(
            conv.messages,
            vec![Message::system("be brief"), Message::user("hi")]
        );
    }

    #[test]
    fn parses_document_with_model() {
        let conv = parse_conversation(
            r#"{"model":"gpt-4","messages":[{"role":"user","content":"hi"}]}"#,
        )
        .unwrap();
        assert_eq!(conv.model.as_deref(), Some("gpt-4"));
        assert_eq!(conv.messages.len(), 1);
    }

    #[test]
    fn rejects_unknown_role() {
        assert!(parse_conversation(r#"[{"role":"tool","content":"x"}]"#).is_err());
    }

    #[test]
    fn write_and_read_conversation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("conv.json");
        let conv = Conversation {
            model: Some("gemini-1.5-pro".to_string()),
            messages: vec![Message::user("hello"), Message::assistant("hi there")],
        };
        write_conversation(&conv, &path).unwrap();
        assert_eq!(read_conversation(&path).unwrap(), conv);
    }

    #[test]
    fn read_nonexistent_conversation_errors() {
        let err = read_conversation(Path::new("/tmp/does_not_exist_conversation.json"))
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
