use crate::{config::Llm, log_internal};
use anyhow::{anyhow, Result};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: ChatMessageRole,
    pub content: String,
}

#[allow(non_camel_case_types)] // Serialized literally; case matters
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChatMessageRole {
    system,
    user,
    assistant,
}

/// A single chat completion request
#[derive(Debug, PartialEq, serde::Serialize)]
pub struct CompletionRequest {
    /// LLM model name
    pub model: String,
    /// Chat conversation to continue.  The system message is always first.
    pub messages: Vec<ChatMessage>,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// LLM temperature
    pub temperature: f32,
    /// Seed for sampling, taken from the id of the event being answered
    pub random_seed: u64,
}

#[derive(serde::Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(serde::Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatMessageRole::system,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatMessageRole::user,
            content: content.into(),
        }
    }
}

/// A hosted chat completion endpoint
#[serenity::async_trait]
pub trait Completion: Send + Sync {
    /// Run one completion round trip and return the generated text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Client for Mistral's (OpenAI compatible) chat completion API
pub struct MistralClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl MistralClient {
    pub fn new(settings: &Llm) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            url: settings.chat_url.clone(),
            api_key: settings.api_key.clone(),
        })
    }
}

#[serenity::async_trait]
impl Completion for MistralClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = self.url.as_str();

        log_internal!("Sending request to chat endpoint {}... ", url);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Chat endpoint {} returned {}: {}", url, status, body));
        }

        let response = response.json::<CompletionResponse>().await?;
        log_internal!("Sending request to chat endpoint {}... done", url);

        extract_content(response)
    }
}

fn extract_content(response: CompletionResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or(anyhow!("Chat endpoint returned no choices"))?;

    if content.trim().is_empty() {
        return Err(anyhow!("Chat endpoint returned an empty message"));
    }

    Ok(content)
}
