//! drillkit CLI: timed quizzes and mini-games in the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use drillkit_core::model::{Difficulty, Variant};

mod commands;

#[derive(Parser)]
#[command(name = "drillkit", version, about = "Timed quizzes and brain-training drills")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one session; each input line is an answer
    Play {
        /// Game variant (see `list-variants`)
        #[arg(long)]
        variant: Variant,

        /// Number of items (or rounds, for boards)
        #[arg(long)]
        items: Option<usize>,

        /// Seed for reproducible content
        #[arg(long)]
        seed: Option<u64>,

        /// Subject for generated or bank questions
        #[arg(long)]
        subject: Option<String>,

        /// easy, medium or hard
        #[arg(long)]
        difficulty: Option<Difficulty>,

        /// Question bank file or directory to draw quiz questions from
        #[arg(long)]
        bank: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for results.jsonl
        #[arg(long)]
        results_dir: Option<PathBuf>,
    },

    /// Show the built-in variants and their defaults
    ListVariants {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate question bank TOML files
    Validate {
        /// Path to a bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Summarize past sessions
    History {
        /// Directory holding results.jsonl
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List models offered by configured providers
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and question bank
    Init,
}

#[tokio::main]
async fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("drillkit=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Play {
            variant,
            items,
            seed,
            subject,
            difficulty,
            bank,
            config,
            results_dir,
        } => {
            commands::play::execute(commands::play::PlayArgs {
                variant,
                items,
                seed,
                subject,
                difficulty,
                bank,
                config,
                results_dir,
            })
            .await
        }
        Commands::ListVariants { config } => commands::list_variants::execute(config),
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::History {
            results_dir,
            config,
            json,
        } => commands::history::execute(results_dir, config, json),
        Commands::ListModels { provider, config } => {
            commands::list_models::execute(provider, config)
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
