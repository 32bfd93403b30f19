use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "ctxwindow",
    about = "Fit chat conversations into OpenAI and Gemini context windows",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to config file
    #[arg(long, global = true, env = "CTXWINDOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Color output mode
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default config file
    Init {
        /// Directory to create the config in
        #[arg(long)]
        root: Option<PathBuf>,

        /// Explicit path for the config file
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Drop the oldest messages until a conversation fits the model
    #[command(alias = "p")]
    Prune {
        /// Conversation JSON file
        conversation: PathBuf,

        /// Target model (defaults to the conversation's model, then config)
        #[arg(short, long)]
        model: Option<String>,

        /// Tokens reserved for the model's reply
        #[arg(long)]
        reserve: Option<usize>,

        /// Explicit token budget, replacing window minus reserve
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Write output to file
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Write to stdout
        #[arg(long)]
        stdout: bool,

        /// Print the pruning plan as JSON on stderr
        #[arg(long)]
        explain: bool,
    },

    /// Show how many tokens are left for new content
    #[command(alias = "r")]
    Remaining {
        /// Conversation JSON file
        conversation: PathBuf,

        /// Target model
        #[arg(short, long)]
        model: Option<String>,

        /// Tokens reserved for the model's reply
        #[arg(long)]
        reserve: Option<usize>,
    },

    /// Check whether a new user message would exceed the context window
    #[command(group(ArgGroup::new("candidate").required(true).args(["text", "file"])))]
    Check {
        /// Conversation JSON file
        conversation: PathBuf,

        /// Candidate message text
        #[arg(long)]
        text: Option<String>,

        /// Read the candidate message from a file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Target model
        #[arg(short, long)]
        model: Option<String>,

        /// Tokens reserved for the model's reply
        #[arg(long)]
        reserve: Option<usize>,

        /// Fail when the message would exceed the limit
        #[arg(long)]
        strict: bool,
    },

    /// Count tokens in a conversation or a piece of text
    #[command(group(ArgGroup::new("input").required(true).args(["conversation", "text"])))]
    Count {
        /// Conversation JSON file
        conversation: Option<PathBuf>,

        /// Count this text instead of a conversation
        #[arg(long)]
        text: Option<String>,

        /// Target model
        #[arg(short, long)]
        model: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List known models
    Models {
        /// Only show models from this provider (openai, gemini)
        #[arg(long)]
        provider: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
    Plain,
}
