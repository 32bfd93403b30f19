//! Shared helpers for the command handlers.

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::output::Format;

// ---------------------------------------------------------------------------
// Format mapping
// ---------------------------------------------------------------------------

/// Map the clap [`OutputFormat`] to the library [`Format`].
pub fn cli_format_to_output_format(fmt: &OutputFormat) -> Format {
    match fmt {
        OutputFormat::Json => Format::Json,
        OutputFormat::Markdown => Format::Markdown,
        OutputFormat::Plain => Format::Plain,
    }
}

// ---------------------------------------------------------------------------
// Model resolution
// ---------------------------------------------------------------------------

/// Pick the model to budget for: explicit flag, then the conversation's
/// recorded model, then the configured default.
pub fn resolve_model(flag: Option<&str>, recorded: Option<&str>, config: &Config) -> String {
    flag.or(recorded)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(config.default_model.as_str())
        .to_string()
}

/// `"s"` unless `count` is one.
pub fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
