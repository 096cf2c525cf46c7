//! Language model access.
//!
//! [`LanguageModel`] is the seam the agent calls through. [`OpenAiModel`]
//! talks to any OpenAI-compatible chat completions endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::MoatError;

pub const DEFAULT_TEMPLATE: &str = "Task: {input}\nContext: {context}\nResponse:";

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a single prompt and return the generated text.
    async fn complete(&self, prompt: &str) -> Result<String, MoatError>;
}

/// A prompt with `{input}` and `{context}` placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Substitute both placeholders. Placeholder text inside `input` is not re-expanded.
    pub fn render(&self, input: &str, context: &str) -> String {
        self.template
            .split("{input}")
            .map(|part| part.replace("{context}", context))
            .collect::<Vec<_>>()
            .join(input)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiModel {
    api_key: String,
    api_url: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl OpenAiModel {
    pub fn from_config(config: &LlmConfig) -> Result<Self, MoatError> {
        let api_key = config.api_key.clone().filter(|k| !k.is_empty()).ok_or_else(|| {
            MoatError::MissingSettings {
                environment: "llm".into(),
                missing: vec!["OPENAI_API_KEY".into()],
            }
        })?;
        Ok(Self {
            api_key,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn complete(&self, prompt: &str) -> Result<String, MoatError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "sending completion");
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| MoatError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(MoatError::Llm { status, message });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| MoatError::Network(e.to_string()))?;
        parse_completion(body)
    }
}

fn parse_completion(body: ChatResponse) -> Result<String, MoatError> {
    body.choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default().trim().to_string())
        .ok_or_else(|| MoatError::Llm {
            status: 200,
            message: "response contained no choices".into(),
        })
}
