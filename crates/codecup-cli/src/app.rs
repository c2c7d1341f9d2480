use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use codecup_core::analysis::{analyze_with, lint_with, DiagnosticReport};
use codecup_core::persistence::{FileStore, SessionStore};
use codecup_core::registry::TabSummary;
use codecup_core::remote::{TabKind, TaskCatalog};
use codecup_core::session::{ConsoleLevel, SessionConfig, TabServices, TabSession};
use codecup_core::{HttpClient, MemoryBuffer, Settings};

// ── Analyze ─────────────────────────────────────────────────────────────

pub fn analyze_file(settings: &Settings, path: &Path, json: bool) -> Result<()> {
    let code = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config = SessionConfig::from_settings(settings);
    let structure = analyze_with(&code, &config.profile);
    let diagnostics = lint_with(&code, &config.profile);

    if json {
        let out = serde_json::json!({
            "structure": structure,
            "diagnostics": diagnostics,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Functions ({})", structure.functions.len());
    for f in &structure.functions {
        println!(
            "  {} {}{} (line {})",
            f.category.icon(),
            " ".repeat(f.indent),
            f.name,
            f.line
        );
    }
    println!("Classes ({})", structure.classes.len());
    for c in &structure.classes {
        println!("  {} {} (line {})", c.category.icon(), c.name, c.line);
    }
    println!("Imports");
    for group in structure.import_groups() {
        let lines: Vec<String> = group.lines.iter().map(|l| l.to_string()).collect();
        println!("  {} (lines {})", group.module, lines.join(", "));
    }

    let report = DiagnosticReport::from_diagnostics(&diagnostics);
    if report.is_empty() {
        println!("No problems found");
        return Ok(());
    }
    println!("Problems ({})", report.total());
    for d in report.style.iter().chain(report.syntax.iter()) {
        println!("  {}:{}: {}", path.display(), d.line, d.message);
    }
    Ok(())
}

// ── Run ─────────────────────────────────────────────────────────────────

pub async fn run_file(settings: &Settings, path: &Path, task: Option<&str>) -> Result<()> {
    let code = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;

    let client = Arc::new(HttpClient::from_settings(settings)?);
    let store = SessionStore::new(Arc::new(FileStore::with_dir(settings.state_dir())?))
        .with_binding_ttl(settings.binding_ttl());
    let mut config = SessionConfig::from_settings(settings);
    // The file on disk is the source of truth here.
    config.autosave = false;
    let services = TabServices {
        execution: client.clone(),
        catalog: client,
        store,
        config,
    };

    let tab_id = format!("cli:{}", path.canonicalize()?.display());
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| tab_id.clone());
    let summary = TabSummary::new(tab_id, name, TabKind::Single);
    let mut session = TabSession::open(summary, &code, Box::new(MemoryBuffer::new("")), &services);

    if let Some(task) = session.restore_binding(chrono::Utc::now()).await {
        tracing::debug!(task_id = %task.id, "Using remembered task for this file");
    }
    if let Some(task_id) = task {
        session.pick_task(task_id).await?;
    }
    // Task selection writes a starter template; submit the file instead.
    session.replace_content(&code);

    if let Some(bound) = session.bound_task() {
        println!("Task: {} ({})", bound.task_name, bound.task_id);
    }

    session.run()?;
    let interrupted = tokio::select! {
        _ = session.wait_for_run() => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        tracing::warn!("Interrupted, cancelling run");
        session.cancel_run();
    }

    print_console(&session);
    Ok(())
}

fn print_console(session: &TabSession) {
    for line in session.console().lines() {
        match line.level {
            ConsoleLevel::Error => eprintln!("{}", line.text),
            _ => println!("{}", line.text),
        }
    }
}

// ── Search ──────────────────────────────────────────────────────────────

pub async fn search(settings: &Settings, query: &str) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        bail!("search query is empty");
    }
    let client = HttpClient::from_settings(settings)?;
    let tasks = client.search(query).await?;
    if tasks.is_empty() {
        println!("No tasks found");
        return Ok(());
    }
    for task in &tasks {
        let num = task.num.map(|n| format!("#{} ", n)).unwrap_or_default();
        println!(
            "{}{} [{}] {}",
            num,
            task.name,
            task.level_display(),
            task.category_display.as_deref().unwrap_or("")
        );
        println!("    id={}  {}", task.id, task.description_preview());
    }
    Ok(())
}
