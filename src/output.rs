//! Output formatting for pruned conversations.
//!
//! Renders a message list as JSON (the same document shape the CLI reads),
//! Markdown, or a plain transcript, and writes the result to a file or
//! stdout.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{CtxWindowError, Result};
use crate::message::{Conversation, Message};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Controls where and how output is written.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Desired output format.
    pub format: Format,
    /// If true, write to stdout instead of a file.
    pub stdout: bool,
    /// File path to write to (ignored when `stdout` is true).
    pub out: Option<PathBuf>,
}

/// Supported output formats.
///
/// Mirrors [`crate::cli::OutputFormat`] but decoupled from clap so that
/// library code can use it without pulling in CLI dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Markdown,
    Plain,
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Render `messages` in the given format.
pub fn format_messages(model: Option<&str>, messages: &[Message], format: Format) -> Result<String> {
    match format {
        Format::Json => format_json(model, messages),
        Format::Markdown => Ok(format_markdown(model, messages)),
        Format::Plain => Ok(format_plain(messages)),
    }
}

/// JSON: a conversation document that `prune` can read back.
fn format_json(model: Option<&str>, messages: &[Message]) -> Result<String> {
    let conversation = Conversation {
        model: model.map(str::to_string),
        messages: messages.to_vec(),
    };
    let mut json = serde_json::to_string_pretty(&conversation)
        .map_err(|e| CtxWindowError::parse("failed to serialize conversation as JSON", e))?;
    json.push('\n');
    Ok(json)
}

/// Markdown: one `##` header per message.
fn format_markdown(model: Option<&str>, messages: &[Message]) -> String {
    let mut out = String::new();
    out.push_str("# Conversation\n\n");
    if let Some(model) = model {
        out.push_str(&format!("> model: `{model}`\n\n"));
    }

    for message in messages {
        out.push_str(&format!("## {}\n\n", message.role));
        out.push_str(&message.content);
        if !message.content.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }

    out
}

/// Plain text: `role: content`, one message per paragraph.
fn format_plain(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str(&format!("{}: {}", message.role, message.content));
        if !message.content.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Output writing
// ---------------------------------------------------------------------------

/// Write a formatted string to the appropriate destination.
///
/// If `options.stdout` is true, writes to stdout. Otherwise writes to the
/// file at `options.out` (creating parent directories as needed), falling
/// back to stdout when no path is given.
pub fn write_output(content: &str, options: &FormatOptions) -> Result<()> {
    match (&options.out, options.stdout) {
        (Some(path), false) => write_to_file(content, path),
        _ => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .map_err(|e| CtxWindowError::io("writing to stdout", e))
        }
    }
}

/// Write content to a file, creating parent directories if needed.
fn write_to_file(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            CtxWindowError::io(format!("creating directory '{}'", parent.display()), e)
        })?;
    }
    std::fs::write(path, content)
        .map_err(|e| CtxWindowError::io(format!("writing output to '{}'", path.display()), e))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
