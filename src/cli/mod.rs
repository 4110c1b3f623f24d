use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "DayLog",
    about = "Daily activity ledger with a 1440-minute budget and AI mood summaries"
)]
pub struct Cli {
    /// Ledger owner. Defaults to `default_owner` from the config file.
    #[arg(long, global = true)]
    pub owner: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API.
    Serve,
    Add {
        name: String,
        #[arg(long, short)]
        category: String,
        #[arg(long, short)]
        minutes: u32,
        /// YYYY-MM-DD, defaults to today.
        #[arg(long)]
        date: Option<String>,
    },
    List {
        #[arg(long)]
        date: Option<String>,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, short)]
        category: Option<String>,
        #[arg(long, short)]
        minutes: Option<u32>,
        #[arg(long)]
        date: Option<String>,
    },
    Delete {
        id: i64,
    },
    Summary {
        #[arg(long)]
        date: Option<String>,
    },
    Mood {
        #[arg(long)]
        date: Option<String>,
        /// Print the prompt instead of calling the summarizer.
        #[arg(long, default_value_t = false)]
        prompt_only: bool,
    },
    Dates {
        #[arg(long, default_value_t = 7)]
        limit: usize,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },
    Doctor,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}

#[derive(Debug, Subcommand)]
pub enum AiCommands {
    Test {
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
}
