use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::fetch::{Fetcher, HttpRequest};
use crate::settings::SummarySettings;
use crate::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("summary request failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("summary API key not configured")]
    NotConfigured,
    #[error("summary response had no choices")]
    Empty,
}

#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    /// Generates text for `text` following `instruction`, leading newlines stripped.
    async fn summarize(&self, text: &str, instruction: &str) -> Result<String, SummaryError>;
}

/// Chat-completions summarizer. Deterministic sampling, capped output length.
pub struct ChatSummarizer {
    fetcher: Arc<dyn Fetcher>,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

impl ChatSummarizer {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: &SummarySettings) -> Self {
        Self {
            fetcher,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize(&self, text: &str, instruction: &str) -> Result<String, SummaryError> {
        let api_key = self.api_key.as_deref().ok_or(SummaryError::NotConfigured)?;

        // The instruction is a prefix of the single user message.
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: format!("{instruction}{text}"),
            }],
            temperature: 0.0,
            max_tokens: self.max_tokens,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        };
        let http = HttpRequest::post_json(self.endpoint.as_str(), &request)?
            .header("Authorization", format!("Bearer {api_key}"));

        let output = self.fetcher.send(http).await?;
        let response: ChatResponse = output.json()?;
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim_start_matches('\n').to_string())
            .ok_or(SummaryError::Empty)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}
