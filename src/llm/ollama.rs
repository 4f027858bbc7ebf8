use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::llm::ChatModel;
use crate::models::Turn;

/// Ollama chat 接口客户端
#[derive(Debug, Clone)]
pub struct OllamaChatModel {
    client: reqwest::Client,
    model_name: String,
    base_url: String,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

impl OllamaChatModel {
    pub fn new(base_url: &str, model_name: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            model_name: model_name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    async fn chat(&self, messages: &[Turn]) -> Result<String> {
        tracing::debug!(
            model = %self.model_name,
            messages = messages.len(),
            "Sending chat request"
        );

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&OllamaChatRequest {
                model: &self.model_name,
                messages,
                stream: false,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Model(format!(
                "Ollama chat failed ({}): {}",
                status, error_text
            )));
        }

        let chat_response: OllamaChatResponse = response.json().await?;
        let content = chat_response
            .message
            .map(|m| m.content.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(AppError::Model("Ollama returned an empty reply".into()));
        }

        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
