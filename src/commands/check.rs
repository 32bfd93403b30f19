//! Handler for the `ctxwindow check` command.
//!
//! Answers whether sending one more user message would push the
//! conversation past the model's window minus the reply reserve.

use std::path::PathBuf;

use colored::Colorize;
use tracing::debug;

use crate::config::Config;
use crate::error::{CtxWindowError, Result};
use crate::message;
use crate::utils;

/// All inputs needed to run the check command.
#[derive(Debug)]
pub struct CheckCommandOptions {
    pub conversation: PathBuf,
    /// Candidate text given inline.
    pub text: Option<String>,
    /// Candidate text read from a file.
    pub file: Option<PathBuf>,
    pub model: Option<String>,
    pub reserve: Option<usize>,
    /// Turn "would exceed" into an error.
    pub strict: bool,
    pub quiet: bool,
    pub config_path: Option<PathBuf>,
}

/// Run the check command. Prints `fits` or `exceeds` on stdout.
pub fn run(options: CheckCommandOptions) -> Result<()> {
    let config = Config::discover(options.config_path.as_deref())?;
    let conversation = message::read_conversation(&options.conversation)?;
    let candidate = candidate_text(&options)?;
    let model = utils::resolve_model(
        options.model.as_deref(),
        conversation.model.as_deref(),
        &config,
    );

    let manager = config
        .manager()
        .with_response_reserve(options.reserve.unwrap_or(config.response_reserve));
    let exceeds = manager.would_exceed_limit(&conversation.messages, &candidate, &model);
    debug!(model = %model, candidate_chars = candidate.len(), exceeds, "checked candidate");

    println!("{}", if exceeds { "exceeds" } else { "fits" });
    if !options.quiet {
        let remaining = manager.remaining_tokens(&conversation.messages, &model);
        let needed = manager.counter().count_message_tokens(
            &message::Message::user(candidate.as_str()),
            &model,
        );
        let status = if exceeds {
            "check:".yellow().bold()
        } else {
            "check:".green().bold()
        };
        eprintln!("{status} candidate needs ~{needed} tokens, {remaining} remaining ({model})");
    }

    if exceeds && options.strict {
        return Err(CtxWindowError::validation(
            "candidate",
            format!("message would exceed the context window of '{model}'"),
        ));
    }
    Ok(())
}

fn candidate_text(options: &CheckCommandOptions) -> Result<String> {
    match (&options.text, &options.file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
            CtxWindowError::io(format!("reading candidate '{}'", path.display()), e)
        }),
        (None, None) => Err(CtxWindowError::validation(
            "candidate",
            "either --text or --file is required",
        )),
    }
}
