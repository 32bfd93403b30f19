//! Handler for the `ctxwindow models` command.

use std::path::PathBuf;

use colored::Colorize;

use crate::config::Config;
use crate::error::{CtxWindowError, Result};
use crate::registry::{ModelProfile, ModelRegistry, Provider};

/// All inputs needed to run the models command.
#[derive(Debug)]
pub struct ModelsCommandOptions {
    /// Provider filter.
    pub provider: Option<String>,
    pub json: bool,
    pub config_path: Option<PathBuf>,
}

/// Run the models command.
pub fn run(options: ModelsCommandOptions) -> Result<()> {
    let config = Config::discover(options.config_path.as_deref())?;
    let registry = config.registry();
    let provider = options
        .provider
        .as_deref()
        .map(str::parse::<Provider>)
        .transpose()?;
    let models = select(&registry, provider);

    if options.json {
        let json = serde_json::to_string_pretty(&models)
            .map_err(|e| CtxWindowError::parse("failed to serialize models", e))?;
        println!("{json}");
        return Ok(());
    }

    if models.is_empty() {
        println!("{}", "No models found.".dimmed());
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{:<24} {:<8} {:>10} {:>6}  {:>10}  {:>10}",
            "MODEL", "PROVIDER", "WINDOW", "STREAM", "IN $/1K", "OUT $/1K"
        )
        .bold()
    );
    for model in &models {
        println!("{}", format_row(model));
    }
    Ok(())
}

/// Models for `provider`, or all of them.
fn select(registry: &ModelRegistry, provider: Option<Provider>) -> Vec<&ModelProfile> {
    match provider {
        Some(p) => registry.models_for_provider(p),
        None => registry.all_models().iter().collect(),
    }
}

fn format_row(model: &ModelProfile) -> String {
    format!(
        "{:<24} {:<8} {:>10} {:>6}  {:>10}  {:>10}",
        model.id,
        model.provider.as_str(),
        model.context_window,
        if model.supports_streaming { "yes" } else { "no" },
        model.cost_per_1k_tokens.input,
        model.cost_per_1k_tokens.output,
    )
}
