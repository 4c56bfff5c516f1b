use crate::config::Config;
use anyhow::Result;
use blockwright_editor::Palette;
use clap::Args;
use colored::Colorize;

#[derive(Debug, Args)]
pub struct TypesArgs {
    /// Also list each type's properties
    #[arg(short, long)]
    pub verbose: bool,
}

pub async fn types(args: TypesArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let registry = config.registry_source(cwd).load().await?;

    println!("{}", "🧱 Block types".bright_blue().bold());
    for entry in Palette::entries(&registry) {
        println!(
            "  {} {} {}",
            entry.block_type.as_str().bright_white().bold(),
            entry.label,
            format!("({} properties)", entry.property_count).dimmed()
        );
        if !entry.description.is_empty() {
            println!("      {}", entry.description.dimmed());
        }

        if args.verbose {
            for def in registry.get_schema(&entry.block_type)? {
                let required = if def.constraints.required { "*" } else { "" };
                println!(
                    "      - {}{} : {} = {}",
                    def.key,
                    required.red(),
                    def.kind.name().cyan(),
                    def.default
                );
            }
        }
    }

    Ok(())
}
