use super::open_session;
use anyhow::Result;
use blockwright_editor::TeardownMode;
use clap::Args;
use colored::Colorize;

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Document id
    pub document: String,

    /// Print the stored JSON instead of the canvas view
    #[arg(long)]
    pub json: bool,
}

pub async fn show(args: ShowArgs, cwd: &str) -> Result<()> {
    let mut session = open_session(cwd, &args.document).await?;
    let snapshot = session.snapshot();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot.to_blocks())?);
    } else {
        println!(
            "{} {} {}",
            "📄".bright_blue(),
            args.document.bright_white().bold(),
            format!("v{} · {} blocks", snapshot.version, snapshot.len()).dimmed()
        );

        let items = session.render_canvas();
        if items.is_empty() {
            println!("  {}", "(empty)".dimmed());
        }
        for item in items {
            let summary = item.summary.unwrap_or_default();
            println!("  {:>3}  {:<16} {}", item.order, item.label.cyan(), summary);
        }
    }

    // Nothing was edited; a repair-on-load save would not belong to this command
    session.teardown(TeardownMode::Abandon).await;
    Ok(())
}
