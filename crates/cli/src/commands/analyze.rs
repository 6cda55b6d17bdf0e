//! `windowscout analyze`: Run one analysis session.

use anyhow::Context;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use windowscout_config::AppConfig;
use windowscout_core::event::DomainEvent;
use windowscout_core::session::{SessionStatus, WorkflowState};
use windowscout_workflow::{
    CancellationToken, JsonDirArchive, Orchestrator, SessionOutcome, WorkflowSettings, build_gate,
};

pub async fn run(config: AppConfig, query: &str, context: &str, json: bool) -> anyhow::Result<ExitCode> {
    if !config.has_api_key() && !is_local(&config.llm.provider) {
        eprintln!();
        eprintln!("  ERROR: No LLM API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    WINDOWSCOUT_API_KEY, OPENROUTER_API_KEY, OPENAI_API_KEY");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        anyhow::bail!("No API key found. See above for setup instructions.");
    }

    let orchestrator = build_orchestrator(&config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling session");
            eprintln!("\n  Cancelling after the current step...");
            on_interrupt.cancel();
        }
    });

    let printer = (!json).then(|| {
        let mut rx = orchestrator.event_bus().subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Some(line) = describe(&event) {
                            eprintln!("{line}");
                        }
                        if matches!(event.as_ref(), DomainEvent::SessionFinished { .. }) {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        })
    });

    info!(query, json, "Starting analysis");
    let outcome = orchestrator.run(query, context, &cancel).await;
    if let Some(handle) = printer {
        let _ = handle.await;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    Ok(if outcome.is_failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn is_local(provider: &str) -> bool {
    matches!(provider, "ollama" | "vllm" | "llamacpp")
}

/// Wire every collaborator named by `config`.
pub fn build_orchestrator(config: &AppConfig) -> anyhow::Result<Orchestrator> {
    let provider = windowscout_providers::build_from_config(&config.llm)
        .context("Failed to configure the LLM provider")?;
    let fetch_timeout = Duration::from_secs(config.agent.fetch_timeout_secs);
    let patents = windowscout_sources::build_patent_search(&config.data_sources, fetch_timeout)
        .context("Failed to configure patent search")?;
    let trends = windowscout_sources::build_trend_data(&config.data_sources, fetch_timeout)
        .context("Failed to configure trend data")?;
    let memory = Arc::new(windowscout_memory::build_service(config));

    let settings = WorkflowSettings::from_config(config);
    let gate = build_gate(&config.agent.review_gate, provider.clone(), &settings);
    let archive = Arc::new(JsonDirArchive::new(config.archive_dir()));
    debug!(
        llm = provider.name(),
        patents = patents.name(),
        trends = trends.name(),
        gate = gate.name(),
        "Orchestrator wired"
    );

    Ok(
        Orchestrator::new(provider, patents, trends, memory, settings)
            .with_review_gate(gate)
            .with_archive(archive),
    )
}

/// One trace line per event worth showing.
pub fn describe(event: &DomainEvent) -> Option<String> {
    match event {
        DomainEvent::SessionStarted { session_id, query, .. } => {
            Some(format!("🔭 Session {session_id}: \"{query}\""))
        }
        DomainEvent::StateEntered { state, iteration, .. } => Some(match state {
            WorkflowState::Synthesizing | WorkflowState::Reviewing => {
                format!("  → {state} (iteration {iteration})")
            }
            WorkflowState::Done => return None,
            _ => format!("  → {state}"),
        }),
        DomainEvent::EvidenceFetched {
            entry,
            items,
            unavailable,
            duration_ms,
            ..
        } => Some(match unavailable {
            None => format!("     ✅ {entry}: {items} items ({duration_ms} ms)"),
            Some(reason) => format!("     ⚠️  {entry}: {reason} ({duration_ms} ms)"),
        }),
        DomainEvent::ReviewCompleted { revision, passed, .. } => Some(if *passed {
            format!("     ✅ revision {revision} passed review")
        } else {
            format!("     ❌ revision {revision} failed review")
        }),
        DomainEvent::SessionFinished { status, duration_ms, .. } => {
            Some(format!("  ■ {status} in {:.1}s", *duration_ms as f64 / 1000.0))
        }
    }
}

fn print_outcome(outcome: &SessionOutcome) {
    let icon = match outcome.status {
        SessionStatus::Completed => "✅",
        SessionStatus::Degraded => "⚠️ ",
        SessionStatus::Failed => "❌",
    };
    let (available, total) = outcome.evidence_coverage();

    println!();
    println!("{icon} {}", outcome.status);
    println!("==================");
    println!("  Session:     {}", outcome.session.id);
    println!("  Iterations:  {}", outcome.session.iteration);
    println!("  Evidence:    {available}/{total} sources available");
    if let Some(report) = outcome.report() {
        println!(
            "  Assessment:  risk {:?}, window {:?}",
            report.assessment.risk, report.assessment.window
        );
    }
    if let Some(cause) = &outcome.cause {
        println!("  Cause:       {cause}");
    }
    if !outcome.memory_written && !outcome.is_failed() {
        println!("  Memory:      not written (see logs)");
    }

    if let Some(report) = outcome.report() {
        println!();
        println!("{}", report.narrative);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use windowscout_core::evidence::UnavailableReason;

    #[test]
    fn describe_fetch_events() {
        let ok = DomainEvent::EvidenceFetched {
            session_id: "s".into(),
            entry: "patents: smart bottle".into(),
            items: 10,
            unavailable: None,
            duration_ms: 12,
            timestamp: Utc::now(),
        };
        assert!(describe(&ok).unwrap().contains("patents: smart bottle: 10 items"));

        let timed_out = DomainEvent::EvidenceFetched {
            session_id: "s".into(),
            entry: "trend: smart bottle".into(),
            items: 0,
            unavailable: Some(UnavailableReason::TimedOut),
            duration_ms: 30_000,
            timestamp: Utc::now(),
        };
        assert!(describe(&timed_out).unwrap().contains("timed out"));
    }

    #[test]
    fn done_state_is_not_printed() {
        let event = DomainEvent::StateEntered {
            session_id: "s".into(),
            state: WorkflowState::Done,
            iteration: 1,
            timestamp: Utc::now(),
        };
        assert!(describe(&event).is_none());
    }

    #[test]
    fn builds_with_mock_sources() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-test".into());
        config.data_sources.patent_provider = "mock".into();
        config.data_sources.trend_provider = "mock".into();
        config.memory.backend = "in_memory".into();
        config.archive.dir = Some(dir.path().to_path_buf());
        let orchestrator = build_orchestrator(&config).unwrap();
        assert_eq!(orchestrator.settings().max_review_iterations, 3);
    }

    #[test]
    fn missing_llm_key_is_an_error() {
        let config = AppConfig::default();
        assert!(build_orchestrator(&config).is_err());
    }
}
