//! CLI entry point for the `recall` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use incident_recall::cli::commands::{self, SearchArgs};
use incident_recall::types::CrisisType;
use incident_recall::RecallError;

#[derive(Parser)]
#[command(
    name = "recall",
    about = "IncidentRecall CLI: find similar past incidents from image and text"
)]
struct Cli {
    /// Output format: "text" (default) or "json"
    #[arg(long, default_value = "text")]
    format: String,

    /// Engine configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise the incidents in a seed file
    Info {
        /// Path to the seed JSON file
        seed: PathBuf,
    },
    /// Count incidents per crisis type
    Catalog {
        /// Path to the seed JSON file
        seed: PathBuf,
    },
    /// Find incidents similar to an image and/or description
    Search {
        /// Path to the seed JSON file
        seed: PathBuf,
        /// Incident description
        #[arg(long)]
        text: Option<String>,
        /// Path to an incident image
        #[arg(long)]
        image: Option<PathBuf>,
        /// Maximum number of results
        #[arg(long)]
        k: Option<usize>,
        /// Minimum raw similarity in [-1, 1]
        #[arg(long)]
        min_score: Option<f32>,
        /// Comma-separated crisis types to restrict to
        #[arg(long = "type")]
        crisis_types: Option<String>,
        /// Print the reasoning path for the top match
        #[arg(long)]
        explain: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let json = cli.format == "json";

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Info { seed } => commands::cmd_info(&seed, config, json),
        Commands::Catalog { seed } => commands::cmd_catalog(&seed, config, json),
        Commands::Search {
            seed,
            text,
            image,
            k,
            min_score,
            crisis_types,
            explain,
        } => {
            let mut types = Vec::new();
            for name in crisis_types.iter().flat_map(|s| s.split(',')) {
                match CrisisType::from_name(name) {
                    Some(ct) => types.push(ct),
                    None => {
                        eprintln!("Invalid crisis type: {}", name);
                        process::exit(3);
                    }
                }
            }
            let args = SearchArgs {
                text: text.as_deref(),
                image: image.as_deref(),
                k,
                min_score,
                crisis_types: types,
                explain,
            };
            commands::cmd_search(&seed, config, args, json)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let code = match &e {
            RecallError::Io(_) => 1,
            RecallError::Json(_) | RecallError::Toml(_) | RecallError::InvalidConfig(_) => 2,
            RecallError::InsufficientInput => 3,
            RecallError::EmbeddingUnavailable(_) => 4,
            _ => 5,
        };
        process::exit(code);
    }
}
