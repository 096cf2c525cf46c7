//! CLI `doctor` command: check every store moat keeps and print one line per check.

use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;

use moat::config::MoatConfig;
use moat::db::{self, HealthReport};
use moat::embedding::local::{MODEL_FILE, TOKENIZER_FILE};
use moat::memory::journal::Journal;
use moat::tracer::read_traces;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Fail => "FAIL",
        })
    }
}

#[derive(Debug)]
struct Check {
    name: &'static str,
    status: Status,
    detail: String,
}

impl Check {
    fn new(name: &'static str, status: Status, detail: impl Into<String>) -> Self {
        Self {
            name,
            status,
            detail: detail.into(),
        }
    }
}

pub fn doctor(config: &MoatConfig) -> Result<()> {
    let mut checks = vec![settings_check(config)];

    let db_path = config.resolved_db_path();
    if db_path.exists() {
        let conn =
            db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
        let report = db::check_database_health(&conn).context("failed to run health check")?;
        checks.extend(database_checks(&report, &config.embedding.model));
    } else {
        checks.push(Check::new(
            "database",
            Status::Warn,
            format!("not created yet at {}", db_path.display()),
        ));
    }

    checks.push(model_files_check(&moat::config::expand_tilde(
        &config.embedding.cache_dir,
    )));
    checks.push(journal_check(&config.resolved_journal_path()));
    checks.push(trace_check(&config.resolved_trace_log()));

    println!("moat doctor");
    println!();
    for c in &checks {
        println!("  [{:<4}] {:<16} {}", c.status, c.name, c.detail);
    }

    let failed = checks.iter().filter(|c| c.status == Status::Fail).count();
    println!();
    if failed == 0 {
        println!("All checks passed.");
    } else {
        println!("{failed} check(s) failed.");
    }
    Ok(())
}

fn settings_check(config: &MoatConfig) -> Check {
    match config.ensure_required() {
        Ok(()) => Check::new("settings", Status::Ok, config.app.environment.clone()),
        Err(e) => Check::new("settings", Status::Fail, e.to_string()),
    }
}

fn database_checks(report: &HealthReport, configured_model: &str) -> Vec<Check> {
    let mut checks = Vec::new();

    checks.push(if report.integrity_ok {
        Check::new(
            "database",
            Status::Ok,
            format!(
                "schema v{}, sqlite-vec v{}",
                report.schema_version, report.sqlite_vec_version
            ),
        )
    } else {
        Check::new(
            "database",
            Status::Fail,
            format!(
                "integrity check failed ({}); restore a backup or `moat reset`",
                report.integrity_details
            ),
        )
    });

    checks.push(Check::new(
        "data moat",
        Status::Ok,
        format!("{} entries", report.data_count),
    ));

    checks.push(if report.memory_count == report.vector_count {
        Check::new(
            "long-term memory",
            Status::Ok,
            format!("{} memories", report.memory_count),
        )
    } else {
        Check::new(
            "long-term memory",
            Status::Warn,
            format!(
                "{} memories but {} vectors; run `moat re-embed`",
                report.memory_count, report.vector_count
            ),
        )
    });

    checks.push(match report.embedding_model.as_deref() {
        Some(stored) if stored == configured_model => {
            Check::new("embedding model", Status::Ok, stored.to_string())
        }
        Some(stored) => Check::new(
            "embedding model",
            Status::Warn,
            format!("vectors from {stored}, configured {configured_model}; run `moat re-embed`"),
        ),
        None => Check::new("embedding model", Status::Warn, "not recorded"),
    });

    checks
}

fn model_files_check(cache_dir: &Path) -> Check {
    let missing: Vec<&str> = [MODEL_FILE, TOKENIZER_FILE]
        .into_iter()
        .filter(|f| !cache_dir.join(f).exists())
        .collect();
    if missing.is_empty() {
        Check::new("model files", Status::Ok, cache_dir.display().to_string())
    } else {
        Check::new(
            "model files",
            Status::Warn,
            format!("missing {}; run `moat model download`", missing.join(", ")),
        )
    }
}

fn journal_check(path: &Path) -> Check {
    if !path.exists() {
        return Check::new("journal", Status::Ok, format!("empty ({})", path.display()));
    }
    match Journal::load(path) {
        Ok(journal) => Check::new(
            "journal",
            Status::Ok,
            format!(
                "{} notes in {} categories",
                journal.len(),
                journal.categories().len()
            ),
        ),
        Err(e) => Check::new("journal", Status::Fail, format!("{e:#}")),
    }
}

fn trace_check(path: &Path) -> Check {
    match read_traces(path, usize::MAX) {
        Ok(entries) if entries.is_empty() => {
            Check::new("trace log", Status::Ok, format!("no decisions ({})", path.display()))
        }
        Ok(entries) => Check::new(
            "trace log",
            Status::Ok,
            format!("{} decisions traced", entries.len()),
        ),
        Err(e) => Check::new("trace log", Status::Fail, format!("{e:#}")),
    }
}
