//! The `vista presets` command.

use clap::Args;
use vista_core::presets::{write_presets, Preset};
use vista_core::{load_presets, Config};

/// Arguments for the `presets` command.
#[derive(Args, Debug, Default)]
pub struct PresetsArgs {
    /// Write a starter presets.json to the config directory
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing presets.json (with --init)
    #[arg(long, requires = "init")]
    pub force: bool,
}

pub fn execute(args: PresetsArgs) -> anyhow::Result<()> {
    let path = Config::presets_path();

    if args.init {
        if path.exists() && !args.force {
            anyhow::bail!(
                "Presets file already exists at: {}\nUse --force to overwrite.",
                path.display()
            );
        }
        write_presets(&path, &starter_presets())?;
        println!("Presets initialized at: {}", path.display());
        return Ok(());
    }

    for preset in load_presets(&path) {
        println!("{}\n    {}", preset.title, preset.text);
    }
    Ok(())
}

fn starter_presets() -> Vec<Preset> {
    vec![
        Preset::default(),
        Preset {
            title: "Alt Text".to_string(),
            text: "Write one concise sentence of alt text for this image.".to_string(),
        },
        Preset {
            title: "Detailed Description".to_string(),
            text: "Describe this image in detail, including subjects, setting, colors, \
                   and any visible text."
                .to_string(),
        },
    ]
}
