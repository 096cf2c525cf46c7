//! The reasoning agent.
//!
//! [`Agent::reason_loop`] runs a bounded number of iterations. Each one pulls
//! context from long-term memory and the data moat, asks the model, traces
//! the answer, and either accepts it (writing it back to both stores) or
//! turns it into the next task as `"Refine: <response>"`.

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::AgentConfig;
use crate::data;
use crate::embedding::EmbeddingProvider;
use crate::error::MoatError;
use crate::llm::{LanguageModel, PromptTemplate};
use crate::memory::session::SessionMemory;
use crate::memory::vector;
use crate::tracer::Tracer;

const SEED_MEMORY: &str = "Previous trip: SF to LA, avoid traffic.";
const SEED_DATA_KEY: &str = "traffic_insight";

/// What a call to [`Agent::reason_loop`] produced.
#[derive(Debug, Clone, Serialize)]
pub struct LoopOutcome {
    /// The last model response.
    pub response: String,
    /// Iterations actually run.
    pub iterations: usize,
    /// Whether a response passed evaluation before the limit.
    pub accepted: bool,
    /// Trace id of the last traced decision.
    pub trace_id: u64,
}

pub struct Agent {
    model: Box<dyn LanguageModel>,
    embedding: Arc<dyn EmbeddingProvider>,
    conn: Connection,
    session: SessionMemory,
    tracer: Tracer,
    prompt: PromptTemplate,
    settings: AgentConfig,
}

impl Agent {
    pub fn new(
        model: Box<dyn LanguageModel>,
        embedding: Arc<dyn EmbeddingProvider>,
        conn: Connection,
        tracer: Tracer,
        settings: AgentConfig,
    ) -> Self {
        Self {
            model,
            embedding,
            conn,
            session: SessionMemory::new(),
            tracer,
            prompt: PromptTemplate::default(),
            settings,
        }
    }

    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    /// Store the demo seeds: one long-term memory and one data entry.
    pub async fn seed(&mut self) -> Result<()> {
        self.remember(SEED_MEMORY, None).await?;
        data::add_data(
            &self.conn,
            SEED_DATA_KEY,
            &json!({"tip": "Use I-5 after 8pm."}),
        )?;
        tracing::info!("memory moats seeded");
        Ok(())
    }

    /// Embed `text` and store it as a long-term memory.
    pub async fn remember(&mut self, text: &str, metadata: Option<&Value>) -> Result<String> {
        let embedding = self.embed(text).await?;
        vector::add_memory(&mut self.conn, text, metadata, &embedding)
    }

    pub async fn reason_loop(&mut self, task: &str, max_iters: usize) -> Result<LoopOutcome> {
        if max_iters == 0 {
            return Err(MoatError::InvalidInput("max_iters must be at least 1".into()).into());
        }

        let mut task = task.to_string();
        let mut outcome = LoopOutcome {
            response: String::new(),
            iterations: 0,
            accepted: false,
            trace_id: 0,
        };

        for iter in 0..max_iters {
            let context = self.gather_context(&task).await?;
            let prompt = self.prompt.render(&task, &context);

            let response = self
                .model
                .complete(&prompt)
                .await
                .with_context(|| format!("model call failed on iteration {iter}"))?;

            let rationale = format!(
                "Used context: {}...",
                preview(&context, self.settings.context_preview_chars)
            );
            let trace = self
                .tracer
                .log_decision(&format!("Iter {iter}"), &response, &rationale)?;

            outcome.iterations = iter + 1;
            outcome.trace_id = trace.id;
            self.session.add_short_term("last_task", json!(task));
            self.session.add_short_term("last_response", json!(response));

            if self.evaluate(&response) {
                self.remember(&response, Some(&json!({"source": "loop"})))
                    .await?;
                data::add_data(
                    &self.conn,
                    &format!("refined_{task}"),
                    &json!({"response": response, "trace_id": trace.id}),
                )?;
                tracing::info!(iteration = iter, trace_id = trace.id, "response accepted");
                outcome.response = response;
                outcome.accepted = true;
                break;
            }

            tracing::debug!(iteration = iter, len = response.len(), "response rejected, refining");
            task = format!("Refine: {response}");
            outcome.response = response;
        }

        Ok(outcome)
    }

    /// Accept responses longer than the configured minimum (in characters).
    pub fn evaluate(&self, response: &str) -> bool {
        response.chars().count() > self.settings.min_response_len
    }

    async fn gather_context(&self, task: &str) -> Result<String> {
        let query_embedding = self.embed(task).await?;
        let memories: Vec<String> =
            vector::retrieve(&self.conn, &query_embedding, self.settings.retrieve_k)?
                .into_iter()
                .map(|r| r.content)
                .collect();
        let data_hits = data::query(&self.conn, task)?;

        Ok(format!(
            "Memory: {}\nData: {}",
            serde_json::to_string(&memories)?,
            serde_json::to_string(&data_hits)?
        ))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let provider = Arc::clone(&self.embedding);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || provider.embed(&text))
            .await
            .context("embedding task failed")?
    }

    pub fn session(&self) -> &SessionMemory {
        &self.session
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }
}

/// The first `max_chars` characters of `text`.
fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
