//! `moat run`: read one task, run the reasoning loop, print the result.

use anyhow::{bail, Result};
use std::io::{BufRead, Write};

use moat::agent::Agent;
use moat::config::MoatConfig;
use moat::llm::OpenAiModel;
use moat::tracer::Tracer;

pub async fn run(
    config: &MoatConfig,
    task: Option<String>,
    max_iters: Option<usize>,
    seed: bool,
) -> Result<()> {
    config.ensure_required()?;

    let conn = moat::db::open_database(config.resolved_db_path())?;
    let embedding = super::embedding_provider(config)?;
    let model = OpenAiModel::from_config(&config.llm)?;
    let tracer = Tracer::open(config.resolved_trace_log())?;

    let mut agent = Agent::new(Box::new(model), embedding, conn, tracer, config.agent.clone());
    if seed {
        agent.seed().await?;
    }

    let task = match task {
        Some(t) => t,
        None => prompt_line("Enter task (e.g., Plan a trip from SF to LA): ")?,
    };
    if task.trim().is_empty() {
        bail!("no task given");
    }

    let outcome = agent
        .reason_loop(task.trim(), max_iters.unwrap_or(config.agent.max_iters))
        .await?;
    tracing::info!(
        iterations = outcome.iterations,
        accepted = outcome.accepted,
        "reasoning loop finished"
    );

    println!("Result: {}", outcome.response);
    Ok(())
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
