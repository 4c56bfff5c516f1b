use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use blockwright_editor::{AutosaveConfig, BlockSchema, Registry};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_REGISTRY_NAME: &str = "blocks.json";

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory for stored documents
    #[arg(short, long, default_value = ".blockwright")]
    pub data_dir: String,

    /// Write the built-in block schemas to blocks.json for customization
    #[arg(long)]
    pub eject_registry: bool,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!("{} {} already exists", "⚠️".yellow(), DEFAULT_CONFIG_NAME.bright_white());
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Blockwright project...".bright_blue().bold());

    let data_dir = PathBuf::from(cwd).join(&args.data_dir);
    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)?;
        println!("  {} Created {}/", "✓".green(), args.data_dir);
    }

    let registry_path = if args.eject_registry {
        let registry = Registry::builtin();
        let schemas: Vec<&BlockSchema> = registry.schemas().collect();
        fs::write(
            PathBuf::from(cwd).join(DEFAULT_REGISTRY_NAME),
            serde_json::to_string_pretty(&schemas)?,
        )?;
        println!("  {} Created {}", "✓".green(), DEFAULT_REGISTRY_NAME);
        Some(DEFAULT_REGISTRY_NAME.to_string())
    } else {
        None
    };

    let config = Config {
        data_dir: args.data_dir.clone(),
        registry_path,
        autosave: AutosaveConfig::default(),
    };

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: blockwright types");
    println!("  2. Run: blockwright apply home intents.json");
    println!("  3. Run: blockwright show home");

    Ok(())
}
