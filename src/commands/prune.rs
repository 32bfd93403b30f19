//! Handler for the `ctxwindow prune` command.
//!
//! Reads a conversation file, drops the oldest conversational messages
//! until it fits the target model's budget, and writes the result in the
//! requested format. `--explain` prints the pruning plan on stderr.

use std::path::PathBuf;

use colored::Colorize;
use tracing::{debug, warn};

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::context::{PruneOptions, PrunePlan};
use crate::error::{CtxWindowError, Result};
use crate::message;
use crate::output::{self, FormatOptions};
use crate::utils;

// ---------------------------------------------------------------------------
// Public interface
// ---------------------------------------------------------------------------

/// All inputs needed to run the prune command.
#[derive(Debug)]
pub struct PruneCommandOptions {
    /// Conversation JSON file.
    pub conversation: PathBuf,
    /// Model override.
    pub model: Option<String>,
    /// Reply reserve override.
    pub reserve: Option<usize>,
    /// Explicit token budget.
    pub max_tokens: Option<usize>,
    /// Output format.
    pub format: OutputFormat,
    /// Write output to file.
    pub out: Option<PathBuf>,
    /// Write to stdout.
    pub stdout: bool,
    /// Print the plan on stderr.
    pub explain: bool,
    /// Suppress non-essential output.
    pub quiet: bool,
    /// Path to config file.
    pub config_path: Option<PathBuf>,
}

/// Run the prune command end-to-end.
pub fn run(options: PruneCommandOptions) -> Result<()> {
    let config = Config::discover(options.config_path.as_deref())?;
    let conversation = message::read_conversation(&options.conversation)?;
    let model = utils::resolve_model(
        options.model.as_deref(),
        conversation.model.as_deref(),
        &config,
    );
    debug!(
        model = %model,
        messages = conversation.messages.len(),
        "pruning conversation"
    );

    let manager = config.manager();
    let prune_options = PruneOptions {
        response_reserve: options.reserve.unwrap_or(config.response_reserve),
        max_tokens_override: options.max_tokens,
    };
    let plan = manager.plan(&conversation.messages, &model, &prune_options)?;
    let pruned = plan.apply(&conversation.messages);

    if plan.over_budget() {
        warn!(
            kept_tokens = plan.kept_tokens,
            limit = plan.effective_limit,
            "system messages alone exceed the token budget"
        );
    }

    let format = utils::cli_format_to_output_format(&options.format);
    let formatted = output::format_messages(Some(&model), &pruned, format)?;
    output::write_output(
        &formatted,
        &FormatOptions {
            format,
            stdout: options.stdout,
            out: options.out.clone(),
        },
    )?;

    if options.explain {
        eprintln!("{}", explain_json(&plan)?);
    }

    if !options.quiet {
        eprintln!("{}", summary_line(&plan));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn explain_json(plan: &PrunePlan) -> Result<String> {
    serde_json::to_string_pretty(plan)
        .map_err(|e| CtxWindowError::parse("failed to serialize pruning plan", e))
}

/// One-line human summary of a plan.
fn summary_line(plan: &PrunePlan) -> String {
    let total = plan.kept.len() + plan.dropped.len();
    let mut line = format!(
        "{} kept {} of {} message{}, ~{} tokens (limit {} for {})",
        "prune:".green().bold(),
        plan.kept.len(),
        total,
        utils::plural(total),
        plan.kept_tokens,
        plan.effective_limit,
        plan.model,
    );
    if plan.over_budget() {
        line.push_str(&format!(" {}", "over budget".yellow()));
    }
    line
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
