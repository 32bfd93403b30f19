//! Handler for the `ctxwindow count` command.
//!
//! Two modes:
//! - **Conversation mode** (positional arg): per-message and total counts,
//!   including framing and priming overhead.
//! - **Text mode** (`--text`): the raw count for one string.

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::config::Config;
use crate::error::{CtxWindowError, Result};
use crate::message::{self, Role};
use crate::tokens::TokenCounter;
use crate::utils;

// ---------------------------------------------------------------------------
// Public interface
// ---------------------------------------------------------------------------

/// All inputs needed to run the count command.
#[derive(Debug)]
pub struct CountCommandOptions {
    pub conversation: Option<PathBuf>,
    pub text: Option<String>,
    pub model: Option<String>,
    pub json: bool,
    pub quiet: bool,
    pub config_path: Option<PathBuf>,
}

/// Token counts for one run of the command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountReport {
    pub model: String,
    /// Estimator that produced the counts.
    pub estimator: String,
    /// Per-message costs (content + framing). Empty in text mode.
    pub messages: Vec<MessageCount>,
    /// Total tokens, including priming overhead in conversation mode.
    pub total_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageCount {
    pub index: usize,
    pub role: Role,
    pub tokens: usize,
}

/// Run the count command.
pub fn run(options: CountCommandOptions) -> Result<()> {
    let report = report(&options)?;

    if options.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CtxWindowError::parse("failed to serialize token counts", e))?;
        println!("{json}");
        return Ok(());
    }

    if !options.quiet && !report.messages.is_empty() {
        for entry in &report.messages {
            println!(
                "  {:>4}  {:<9} {:>6} tokens",
                entry.index.to_string().dimmed(),
                entry.role.as_str(),
                entry.tokens
            );
        }
    }
    println!("{}", report.total_tokens);
    if !options.quiet {
        eprintln!(
            "{} {} ({} estimator)",
            "count:".green().bold(),
            report.model,
            report.estimator
        );
    }
    Ok(())
}

/// Compute token counts without printing.
pub fn report(options: &CountCommandOptions) -> Result<CountReport> {
    let config = Config::discover(options.config_path.as_deref())?;
    let counter = config.token_counter();

    match (&options.conversation, &options.text) {
        (_, Some(text)) => {
            let model = utils::resolve_model(options.model.as_deref(), None, &config);
            Ok(CountReport {
                estimator: counter.estimator_for(&model).name().to_string(),
                total_tokens: counter.count_tokens(text, &model),
                messages: Vec::new(),
                model,
            })
        }
        (Some(path), None) => {
            let conversation = message::read_conversation(path)?;
            let model = utils::resolve_model(
                options.model.as_deref(),
                conversation.model.as_deref(),
                &config,
            );
            Ok(conversation_report(&counter, &conversation.messages, model))
        }
        (None, None) => Err(CtxWindowError::validation(
            "input",
            "either a conversation file or --text is required",
        )),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn conversation_report(
    counter: &TokenCounter,
    messages: &[message::Message],
    model: String,
) -> CountReport {
    let per_message = messages
        .iter()
        .enumerate()
        .map(|(index, m)| MessageCount {
            index,
            role: m.role,
            tokens: counter.count_message_tokens(m, &model),
        })
        .collect();
    CountReport {
        estimator: counter.estimator_for(&model).name().to_string(),
        total_tokens: counter.count_messages_tokens(messages, &model),
        messages: per_message,
        model,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
