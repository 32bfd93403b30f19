//! Handler for the `ctxwindow remaining` command.

use std::path::PathBuf;

use colored::Colorize;
use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::message;
use crate::utils;

/// All inputs needed to run the remaining command.
#[derive(Debug)]
pub struct RemainingCommandOptions {
    pub conversation: PathBuf,
    pub model: Option<String>,
    pub reserve: Option<usize>,
    pub quiet: bool,
    pub config_path: Option<PathBuf>,
}

/// Report on a conversation's headroom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemainingReport {
    pub model: String,
    pub context_window: usize,
    pub used_tokens: usize,
    pub response_reserve: usize,
    pub remaining: usize,
}

/// Compute the report without printing.
pub fn report(options: &RemainingCommandOptions) -> Result<RemainingReport> {
    let config = Config::discover(options.config_path.as_deref())?;
    let conversation = message::read_conversation(&options.conversation)?;
    let model = utils::resolve_model(
        options.model.as_deref(),
        conversation.model.as_deref(),
        &config,
    );

    let manager = config
        .manager()
        .with_response_reserve(options.reserve.unwrap_or(config.response_reserve));
    let used_tokens = manager
        .counter()
        .count_messages_tokens(&conversation.messages, &model);
    let remaining = manager.remaining_tokens(&conversation.messages, &model);
    debug!(model = %model, used_tokens, remaining, "computed remaining tokens");

    Ok(RemainingReport {
        context_window: manager.registry().context_window(&model),
        response_reserve: manager.response_reserve(),
        model,
        used_tokens,
        remaining,
    })
}

/// Run the remaining command: the count goes to stdout, details to stderr.
pub fn run(options: RemainingCommandOptions) -> Result<()> {
    let report = report(&options)?;
    println!("{}", report.remaining);
    if !options.quiet {
        eprintln!(
            "{} {} used, {} reserved, window {} ({})",
            "remaining:".green().bold(),
            report.used_tokens,
            report.response_reserve,
            report.context_window,
            report.model,
        );
    }
    Ok(())
}
