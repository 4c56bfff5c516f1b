use super::open_session;
use anyhow::{anyhow, Context, Result};
use blockwright_editor::{BlockId, EditorSession, FlushOutcome, Intent, SaveStatus, TeardownMode};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

/// Stands for the currently selected block in an intents file
pub const SELECTED: &str = "@selected";

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Document id
    pub document: String,

    /// JSON array of intents
    pub intents: PathBuf,

    /// Stop at the first rejected intent
    #[arg(long)]
    pub strict: bool,
}

pub async fn apply(args: ApplyArgs, cwd: &str) -> Result<()> {
    let content = fs::read_to_string(PathBuf::from(cwd).join(&args.intents))
        .with_context(|| format!("Cannot read {}", args.intents.display()))?;
    let intents: Vec<Intent> = serde_json::from_str(&content).context("Invalid intents file")?;
    tracing::info!(document = %args.document, count = intents.len(), strict = args.strict, "Applying intents");

    let mut session = open_session(cwd, &args.document).await?;
    println!(
        "{} Applying {} intents to {}",
        "✏️".bright_blue(),
        intents.len(),
        args.document.bright_white().bold()
    );

    let mut rejected = 0;
    for (i, intent) in intents.into_iter().enumerate() {
        let intent = resolve_selected(&session, intent)?;
        let name = intent.name();

        match session.dispatch(intent) {
            Ok(outcome) if outcome.changed => {
                println!("  {} {:>3} {} → v{}", "✓".green(), i, name, outcome.version)
            }
            Ok(_) => println!("  {} {:>3} {} (no change)", "·".dimmed(), i, name),
            Err(e) => {
                rejected += 1;
                println!("  {} {:>3} {} - {}", "✗".red(), i, name, e);
                if args.strict {
                    session.teardown(TeardownMode::Abandon).await;
                    return Err(anyhow!("Intent {} rejected", i));
                }
            }
        }
    }

    let outcome = session.on_back().await?;
    tracing::info!(document = %args.document, ?outcome, rejected, "Flushed on exit");
    let last = session.teardown(TeardownMode::Drain).await;

    println!();
    match outcome {
        FlushOutcome::Clean | FlushOutcome::Saved { .. } => {
            println!("{} Saved v{}", "✅".green(), last.persisted_version)
        }
        FlushOutcome::Failed { message, .. } => {
            println!("{} Save failed: {}", "⚠️".yellow(), message)
        }
        FlushOutcome::Conflict { remote_version } => println!(
            "{} Document changed elsewhere (stored v{}); nothing was saved",
            "⚠️".yellow(),
            remote_version
        ),
    }
    if rejected > 0 {
        println!("   {} intents rejected", rejected);
    }

    match last.save_status {
        SaveStatus::Saved | SaveStatus::Idle => Ok(()),
        status => Err(anyhow!("Document left in state '{}'", status.label())),
    }
}

/// Replace `@selected` ids with the current selection
fn resolve_selected(session: &EditorSession, intent: Intent) -> Result<Intent> {
    let selected = || {
        session
            .snapshot()
            .selected
            .ok_or_else(|| anyhow!("{} used with nothing selected", SELECTED))
    };
    let is_marker = |id: &BlockId| id.as_str() == SELECTED;

    Ok(match intent {
        Intent::DeleteBlock { id } if is_marker(&id) => Intent::DeleteBlock { id: selected()? },
        Intent::ReorderBlock { id, to_index } if is_marker(&id) => Intent::ReorderBlock {
            id: selected()?,
            to_index,
        },
        Intent::UpdateProperty { id, key, value } if is_marker(&id) => Intent::UpdateProperty {
            id: selected()?,
            key,
            value,
        },
        other => other,
    })
}
