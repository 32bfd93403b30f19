use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use ctxwindow::cli::{Cli, ColorMode, Command};
use ctxwindow::commands;
use ctxwindow::commands::check::CheckCommandOptions;
use ctxwindow::commands::count::CountCommandOptions;
use ctxwindow::commands::init::{InitOptions, InitResult};
use ctxwindow::commands::models::ModelsCommandOptions;
use ctxwindow::commands::prune::PruneCommandOptions;
use ctxwindow::commands::remaining::RemainingCommandOptions;
use ctxwindow::error::CtxWindowError;

fn main() {
    let cli = Cli::parse();

    // Configure color output
    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {}
    }

    // Init tracing
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = run(cli) {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Init { root, path, force } => {
            let root = resolve_root(root)?;
            let result = commands::init::run(InitOptions {
                root,
                config_path: path,
                force,
            })?;
            if !cli.quiet {
                print_init_result(&result);
            }
        }
        Command::Prune {
            conversation,
            model,
            reserve,
            max_tokens,
            format,
            out,
            stdout,
            explain,
        } => commands::prune::run(PruneCommandOptions {
            conversation,
            model,
            reserve,
            max_tokens,
            format,
            out,
            stdout,
            explain,
            quiet: cli.quiet,
            config_path: cli.config,
        })?,
        Command::Remaining {
            conversation,
            model,
            reserve,
        } => commands::remaining::run(RemainingCommandOptions {
            conversation,
            model,
            reserve,
            quiet: cli.quiet,
            config_path: cli.config,
        })?,
        Command::Check {
            conversation,
            text,
            file,
            model,
            reserve,
            strict,
        } => commands::check::run(CheckCommandOptions {
            conversation,
            text,
            file,
            model,
            reserve,
            strict,
            quiet: cli.quiet,
            config_path: cli.config,
        })?,
        Command::Count {
            conversation,
            text,
            model,
            json,
        } => commands::count::run(CountCommandOptions {
            conversation,
            text,
            model,
            json,
            quiet: cli.quiet,
            config_path: cli.config,
        })?,
        Command::Models { provider, json } => commands::models::run(ModelsCommandOptions {
            provider,
            json,
            config_path: cli.config,
        })?,
    }
    Ok(())
}

fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf, CtxWindowError> {
    match root {
        Some(p) => Ok(p),
        None => std::env::current_dir()
            .map_err(|e| CtxWindowError::io("getting current directory", e)),
    }
}

fn print_init_result(result: &InitResult) {
    let verb = if result.overwritten { "Overwrote" } else { "Created" };
    println!(
        "{} {verb} config at {}",
        "ok".green().bold(),
        result.config_path.display()
    );
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to customize settings", "ctxwindow.toml".bold());
    println!(
        "  2. Run {} to fit a conversation",
        "ctxwindow prune conversation.json".bold()
    );
    println!("  3. Run {} to see known models", "ctxwindow models".bold());
}
