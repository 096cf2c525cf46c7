#![allow(dead_code)]

use async_trait::async_trait;
use moat::embedding::{EmbeddingProvider, EMBEDDING_DIM};
use moat::error::MoatError;
use moat::llm::LanguageModel;
use rusqlite::Connection;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    moat::db::open_memory_database().unwrap()
}

/// Deterministic 384-dim embedding with a spike at position `seed`.
pub fn test_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    v[seed % EMBEDDING_DIM] = 1.0;
    v
}

/// Embeds text by hashing its bytes into a spike, so equal texts share a vector.
pub struct SpikeEmbedder;

impl EmbeddingProvider for SpikeEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let seed = text.bytes().fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
        Ok(test_embedding(seed))
    }
}

/// Replays canned responses in order and records every prompt it was given.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    responses: Arc<Mutex<VecDeque<String>>>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedModel {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.iter().map(|s| s.to_string()).collect())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, MoatError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| MoatError::Llm {
                status: 500,
                message: "script exhausted".into(),
            })
    }
}
