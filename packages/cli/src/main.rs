mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{apply, init, show, types, ApplyArgs, InitArgs, ShowArgs, TypesArgs};

/// Blockwright CLI - block-based page editing from the terminal
#[derive(Parser, Debug)]
#[command(name = "blockwright")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new Blockwright project
    Init(InitArgs),

    /// List the block types in the palette
    Types(TypesArgs),

    /// Print a document as the canvas shows it
    Show(ShowArgs),

    /// Apply a JSON file of intents to a document and save it
    Apply(ApplyArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(e) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Types(args) => types(args, &cwd).await,
        Command::Show(args) => show(args, &cwd).await,
        Command::Apply(args) => apply(args, &cwd).await,
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
