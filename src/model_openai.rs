//! OpenAI-backed prebuilt models (`gpt3.5`, `gpt4`).
//!
//! Calls the chat completions API. When a retriever was resolved, the
//! retrieved snippets are injected as a system message ahead of the user
//! prompt.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ComponentSection;
use crate::models::Prediction;
use crate::traits::{GenerativeModel, Retriever};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Deserialize)]
struct OpenAiFields {
    #[serde(default)]
    openai_api_key: Option<String>,
    #[serde(default = "default_temperature")]
    temperature: f64,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    512
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    60
}

pub struct OpenAiModel {
    /// Registry identifier (`"gpt3.5"` / `"gpt4"`).
    id: &'static str,
    /// API model name (`"gpt-3.5-turbo"` / `"gpt-4"`).
    api_model: &'static str,
    api_key: String,
    fields: OpenAiFields,
    client: reqwest::Client,
    retriever: Option<Arc<dyn Retriever>>,
}

/// Registry factory for `model.name = "gpt3.5"`.
pub fn gpt35_factory(
    section: &ComponentSection,
    retriever: Option<Arc<dyn Retriever>>,
) -> Result<Arc<dyn GenerativeModel>> {
    build("gpt3.5", "gpt-3.5-turbo", section, retriever)
}

/// Registry factory for `model.name = "gpt4"`.
pub fn gpt4_factory(
    section: &ComponentSection,
    retriever: Option<Arc<dyn Retriever>>,
) -> Result<Arc<dyn GenerativeModel>> {
    build("gpt4", "gpt-4", section, retriever)
}

fn build(
    id: &'static str,
    api_model: &'static str,
    section: &ComponentSection,
    retriever: Option<Arc<dyn Retriever>>,
) -> Result<Arc<dyn GenerativeModel>> {
    let fields: OpenAiFields = section.typed_fields()?;

    let api_key = match &fields.openai_api_key {
        Some(key) if !key.trim().is_empty() => key.clone(),
        _ => std::env::var("OPENAI_API_KEY").map_err(|_| {
            anyhow::anyhow!("model.fields.openai_api_key or OPENAI_API_KEY required for '{id}'")
        })?,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(fields.timeout_secs))
        .build()?;

    Ok(Arc::new(OpenAiModel {
        id,
        api_model,
        api_key,
        fields,
        client,
        retriever,
    }))
}

impl OpenAiModel {
    /// Build the message list, prepending retrieved context when a
    /// retriever is present and returned snippets.
    async fn build_messages(&self, prompt: &str) -> Result<Vec<serde_json::Value>> {
        let mut messages = Vec::with_capacity(2);

        if let Some(retriever) = &self.retriever {
            let snippets = retriever.retrieve(prompt).await?;
            if !snippets.is_empty() {
                let context = snippets
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n---\n");
                messages.push(serde_json::json!({
                    "role": "system",
                    "content": format!(
                        "Answer using the following context where relevant:\n{context}"
                    ),
                }));
            }
        }

        messages.push(serde_json::json!({ "role": "user", "content": prompt }));
        Ok(messages)
    }
}

#[async_trait]
impl GenerativeModel for OpenAiModel {
    fn name(&self) -> &str {
        self.id
    }

    fn retriever(&self) -> Option<Arc<dyn Retriever>> {
        self.retriever.clone()
    }

    async fn predict(&self, prompt: &str) -> Result<Prediction> {
        let messages = self.build_messages(prompt).await?;

        let body = serde_json::json!({
            "model": self.api_model,
            "messages": messages,
            "temperature": self.fields.temperature,
            "max_tokens": self.fields.max_tokens,
        });

        let mut last_err = None;

        for attempt in 0..=self.fields.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(CHAT_COMPLETIONS_URL)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        let output = json["choices"][0]["message"]["content"]
                            .as_str()
                            .ok_or_else(|| {
                                anyhow::anyhow!("OpenAI response missing message content")
                            })?
                            .to_string();
                        return Ok(Prediction {
                            model: self.id.to_string(),
                            output,
                        });
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("OpenAI API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("OpenAI request failed")))
    }
}
