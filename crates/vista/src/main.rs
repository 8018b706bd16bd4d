//! Vista CLI - batch image captioning with hosted vision models.
//!
//! Vista sends each image (a URL, or a local file that gets downscaled and
//! inlined) to a vision-capable chat model and saves the caption it returns.
//!
//! # Usage
//!
//! ```bash
//! # Caption a folder, one .txt per image in the dated output folder
//! vista caption ./photos/
//!
//! # Caption a list of URLs in parallel into a single captions.txt
//! vista caption --urls-file urls.txt --batch --consolidated
//!
//! # Estimate cost without calling the API
//! vista estimate ./photos/ --resolution 2048
//!
//! # View configuration
//! vista config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Vista - Batch image captioning with hosted vision models.
#[derive(Parser, Debug)]
#[command(name = "vista")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Caption images and save the results
    Caption(cli::caption::CaptionArgs),

    /// Validate inputs and estimate cost without calling the API
    Estimate(cli::caption::CaptionArgs),

    /// List rate-limit tiers
    Tiers,

    /// List prompt presets
    Presets(cli::presets::PresetsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match vista_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `vista config path`."
            );
            vista_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Vista v{}", vista_core::VERSION);

    match cli.command {
        Commands::Caption(args) => cli::caption::execute(args, config).await,
        Commands::Estimate(args) => cli::caption::estimate(args, config),
        Commands::Tiers => cli::tiers::execute(&config),
        Commands::Presets(args) => cli::presets::execute(args),
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
