//! Run planning: config overrides, input gathering, instruction choice,
//! validation, and the cost estimate.

use anyhow::Context;
use std::path::{Path, PathBuf};
use vista_core::pipeline::{parse_source_list, SourceDiscovery};
use vista_core::presets::{find_preset, Preset};
use vista_core::{
    estimate_cost, load_presets, Config, RunConfiguration, SourceResolver, ValidationResult,
};

use super::CaptionArgs;
use crate::cli::config::update_config_file;

/// Everything decided before the first request is sent.
#[derive(Debug)]
pub(crate) struct CaptionPlan {
    pub config: Config,
    pub run: RunConfiguration,
    pub instruction: String,
    pub validation: ValidationResult,
    pub estimate: f64,
    pub output_root: PathBuf,
}

/// Apply overrides, gather and validate inputs, and estimate the cost.
pub(crate) fn build_plan(args: &CaptionArgs, mut config: Config) -> anyhow::Result<CaptionPlan> {
    apply_overrides(args, &mut config)?;
    let run = RunConfiguration::from_config(&config)?;

    let inputs = gather_inputs(args)?;
    if inputs.is_empty() {
        anyhow::bail!(
            "No images given.\n\n  Hint: pass URLs, files or folders, or use --urls-file / --files-file."
        );
    }

    let validation = SourceResolver::new(run.write).resolve(&inputs);
    let presets = load_presets(&Config::presets_path());
    let instruction = resolve_instruction(args, &config, &presets)?;
    let estimate = estimate_cost(
        validation.to_process.len(),
        run.resolution,
        &instruction,
        &validation.to_process,
    );
    let output_root = args
        .output
        .as_deref()
        .map(expand_path)
        .unwrap_or_else(|| config.output_dir());

    Ok(CaptionPlan {
        config,
        run,
        instruction,
        validation,
        estimate,
        output_root,
    })
}

/// Fold command-line flags into the loaded config and re-validate.
fn apply_overrides(args: &CaptionArgs, config: &mut Config) -> anyhow::Result<()> {
    if let Some(resolution) = args.resolution {
        config.run.resolution = resolution;
    }
    if let Some(tier) = &args.tier {
        config.run.tier = tier.clone();
    }
    if args.batch {
        config.run.batch = true;
    }
    if args.individual {
        config.run.save_individual = true;
    }
    if args.consolidated {
        config.run.save_individual = false;
    }
    if args.save_local {
        config.run.save_individual = true;
        config.run.save_local = true;
    }
    if args.no_overwrite {
        config.run.overwrite = false;
    }
    if let Some(max_errors) = args.max_errors {
        config.run.max_consecutive_errors = max_errors;
    }
    if let Some(model) = &args.model {
        config.openai.model = model.clone();
    }

    config.validate().map_err(|e| {
        let names: Vec<&str> = config.tiers.names().collect();
        anyhow::anyhow!("{e}\n\n  Available tiers: {}", names.join(", "))
    })
}

/// Positional sources, then the URL list, then the file list, with
/// directories expanded.
fn gather_inputs(args: &CaptionArgs) -> anyhow::Result<Vec<String>> {
    let mut inputs: Vec<String> = args.sources.iter().map(|s| expand_input(s)).collect();

    if let Some(path) = &args.urls_file {
        inputs.extend(read_list(path)?);
    }
    if let Some(path) = &args.files_file {
        inputs.extend(read_list(path)?.iter().map(|s| expand_input(s)));
    }

    Ok(SourceDiscovery::expand(&inputs))
}

fn read_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let path = expand_path(path);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read source list {}", path.display()))?;
    Ok(parse_source_list(&text))
}

/// `--prompt`, then `--preset`, then the last prompt used, then the first preset.
fn resolve_instruction(
    args: &CaptionArgs,
    config: &Config,
    presets: &[Preset],
) -> anyhow::Result<String> {
    if let Some(prompt) = args.prompt.as_deref().map(str::trim) {
        if prompt.is_empty() {
            anyhow::bail!("--prompt must not be empty");
        }
        return Ok(prompt.to_string());
    }

    if let Some(name) = &args.preset {
        return match find_preset(presets, name) {
            Some(preset) => Ok(preset.text.clone()),
            None => {
                let titles: Vec<&str> = presets.iter().map(|p| p.title.as_str()).collect();
                anyhow::bail!(
                    "Unknown preset '{name}'\n\n  Available presets: {}",
                    titles.join(", ")
                )
            }
        };
    }

    let last = config.run.last_prompt.trim();
    if !last.is_empty() {
        return Ok(last.to_string());
    }

    Ok(presets
        .first()
        .map(|p| p.text.clone())
        .unwrap_or_else(|| Preset::default().text))
}

/// Store the instruction as `run.last_prompt` so the next run can reuse it.
pub(crate) fn remember_prompt(plan: &CaptionPlan) {
    if plan.config.run.last_prompt == plan.instruction {
        return;
    }
    let path = Config::default_path();
    if let Err(e) = update_config_file(
        &path,
        "run.last_prompt",
        toml_edit::Value::from(plan.instruction.as_str()),
    ) {
        tracing::warn!("Could not save last prompt: {e:#}");
    }
}

fn expand_input(input: &str) -> String {
    if vista_core::types::is_url(input) {
        input.to_string()
    } else {
        shellexpand::tilde(input).into_owned()
    }
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
