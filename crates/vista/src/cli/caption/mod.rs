//! The `vista caption` and `vista estimate` commands.

mod run;
mod setup;

use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use vista_core::{Config, ValidationResult};

use run::{confirm, print_plan, run_captioning};
use setup::build_plan;

/// Arguments shared by `caption` and `estimate`.
#[derive(Args, Debug)]
pub struct CaptionArgs {
    /// Image URLs, image files, or folders (searched recursively)
    pub sources: Vec<String>,

    /// Read image URLs from a file, one per line
    #[arg(long, value_name = "FILE")]
    pub urls_file: Option<PathBuf>,

    /// Read local image paths from a file, one per line
    #[arg(long, value_name = "FILE")]
    pub files_file: Option<PathBuf>,

    /// Instruction sent with every image
    #[arg(short, long, conflicts_with = "preset")]
    pub prompt: Option<String>,

    /// Use a named preset from presets.json as the instruction
    #[arg(long)]
    pub preset: Option<String>,

    /// Longest-edge bound for local images: 512, 1024 or 2048
    #[arg(short, long, value_parser = parse_resolution)]
    pub resolution: Option<u32>,

    /// Rate-limit tier (see `vista tiers`)
    #[arg(long)]
    pub tier: Option<String>,

    /// Send requests in parallel, up to min(tier RPM, 10) at a time
    #[arg(long)]
    pub batch: bool,

    /// One caption file per image (overrides a consolidated config default)
    #[arg(long, conflicts_with = "consolidated")]
    pub individual: bool,

    /// Append every caption to one captions.txt instead of one file per image
    #[arg(long)]
    pub consolidated: bool,

    /// Write each caption next to its local source image
    #[arg(long, conflicts_with = "consolidated")]
    pub save_local: bool,

    /// Skip local images that already have a caption next to them
    #[arg(long, requires = "save_local")]
    pub no_overwrite: bool,

    /// Abort after this many consecutive failures (0 or negative disables)
    #[arg(long, allow_hyphen_values = true)]
    pub max_errors: Option<i32>,

    /// Root folder for dated run folders
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Model name sent to the API
    #[arg(long)]
    pub model: Option<String>,

    /// API key (overrides the configured key)
    #[arg(long, env = "VISTA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Print the plan (estimate) or the run report (caption) as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Start without asking for confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Manual Default impl for constructing CaptionArgs outside of clap.
///
/// Values match the clap defaults above (every override unset).
impl Default for CaptionArgs {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            urls_file: None,
            files_file: None,
            prompt: None,
            preset: None,
            resolution: None,
            tier: None,
            batch: false,
            individual: false,
            consolidated: false,
            save_local: false,
            no_overwrite: false,
            max_errors: None,
            output: None,
            model: None,
            api_key: None,
            json: false,
            yes: false,
        }
    }
}

fn parse_resolution(value: &str) -> Result<u32, String> {
    let pixels: u32 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    match vista_core::Resolution::from_pixels(pixels) {
        Some(_) => Ok(pixels),
        None => Err("must be 512, 1024 or 2048".to_string()),
    }
}

/// Machine-readable output of `vista estimate --json`.
#[derive(Serialize)]
struct EstimateOutput<'a> {
    instruction: &'a str,
    resolution: u32,
    estimated_cost: f64,
    #[serde(flatten)]
    validation: &'a ValidationResult,
}

/// Execute the caption command.
pub async fn execute(args: CaptionArgs, config: Config) -> anyhow::Result<()> {
    let plan = build_plan(&args, config)?;
    print_plan(&plan);

    if plan.validation.is_empty() {
        tracing::warn!("Nothing to caption");
        return Ok(());
    }
    if !confirm(&args)? {
        eprintln!("Cancelled.");
        return Ok(());
    }

    setup::remember_prompt(&plan);
    run_captioning(plan, &args).await
}

/// Execute the estimate command: validation and cost only, no API calls.
pub fn estimate(args: CaptionArgs, config: Config) -> anyhow::Result<()> {
    let plan = build_plan(&args, config)?;
    if args.json {
        let output = EstimateOutput {
            instruction: &plan.instruction,
            resolution: plan.run.resolution.pixels(),
            estimated_cost: plan.estimate,
            validation: &plan.validation,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}
