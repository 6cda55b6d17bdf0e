//! `windowscout reports`: Browse archived sessions.

use tracing::debug;
use windowscout_config::AppConfig;
use windowscout_workflow::{JsonDirArchive, SessionArchive};

pub async fn list(config: &AppConfig) -> anyhow::Result<()> {
    let archive = JsonDirArchive::new(config.archive_dir());
    let summaries = archive.list().await?;
    debug!(dir = %archive.dir().display(), count = summaries.len(), "Archive listed");

    println!("📚 Archived sessions ({})", archive.dir().display());
    println!("====================");
    if summaries.is_empty() {
        println!("  No sessions archived yet. Run `windowscout analyze <QUERY>` first.");
        return Ok(());
    }
    for s in summaries {
        println!(
            "  {}  {}  {:<9}  {} iter  {}",
            s.session_id,
            s.finished_at.format("%Y-%m-%d %H:%M"),
            s.status.to_string(),
            s.iterations,
            s.query
        );
    }
    Ok(())
}

pub async fn show(config: &AppConfig, id: &str, json: bool) -> anyhow::Result<()> {
    let archive = JsonDirArchive::new(config.archive_dir());
    let Some(outcome) = archive.load(id).await? else {
        anyhow::bail!("No archived session with id {id}");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!("Session {} — {}", outcome.session.id, outcome.status);
    println!("  Query:       {}", outcome.session.query);
    println!("  Finished:    {}", outcome.finished_at.to_rfc3339());
    println!("  Iterations:  {}", outcome.session.iteration);
    if let Some(cause) = &outcome.cause {
        println!("  Cause:       {cause}");
    }
    let path: Vec<String> = outcome
        .trace
        .iter()
        .map(|t| format!("{}@{}ms", t.state, t.elapsed_ms))
        .collect();
    println!("  Trace:       {}", path.join(" → "));
    match outcome.report() {
        Some(report) => println!("\n{}", report.narrative),
        None => println!("\n  (no report was written)"),
    }
    Ok(())
}
