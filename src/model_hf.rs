//! Hugging Face inference API model (`hf`).
//!
//! Sends the (optionally context-augmented) prompt to the hosted
//! inference endpoint for the configured repo id.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ComponentSection;
use crate::models::Prediction;
use crate::traits::{GenerativeModel, Retriever};

const INFERENCE_API_BASE: &str = "https://api-inference.huggingface.co/models";

#[derive(Debug, Deserialize)]
struct HfFields {
    /// Repo id of the hosted model, e.g. `"google/flan-t5-base"`.
    model: String,
    #[serde(default)]
    api_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

pub struct HfModel {
    repo_id: String,
    api_token: Option<String>,
    client: reqwest::Client,
    retriever: Option<Arc<dyn Retriever>>,
}

/// Registry factory for `model.name = "hf"`.
pub fn factory(
    section: &ComponentSection,
    retriever: Option<Arc<dyn Retriever>>,
) -> Result<Arc<dyn GenerativeModel>> {
    let fields: HfFields = section.typed_fields()?;
    if fields.model.trim().is_empty() {
        bail!("model.fields.model (Hugging Face repo id) must not be empty");
    }

    let api_token = fields
        .api_token
        .filter(|t| !t.trim().is_empty())
        .or_else(|| std::env::var("HUGGINGFACEHUB_API_TOKEN").ok());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(fields.timeout_secs))
        .build()?;

    Ok(Arc::new(HfModel {
        repo_id: fields.model,
        api_token,
        client,
        retriever,
    }))
}

impl HfModel {
    async fn augment_prompt(&self, prompt: &str) -> Result<String> {
        let retriever = match &self.retriever {
            Some(r) => r,
            None => return Ok(prompt.to_string()),
        };
        let snippets = retriever.retrieve(prompt).await?;
        if snippets.is_empty() {
            return Ok(prompt.to_string());
        }
        let context = snippets
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n---\n");
        Ok(format!("Context:\n{context}\n\nQuestion: {prompt}"))
    }
}

#[async_trait]
impl GenerativeModel for HfModel {
    fn name(&self) -> &str {
        "hf"
    }

    fn retriever(&self) -> Option<Arc<dyn Retriever>> {
        self.retriever.clone()
    }

    async fn predict(&self, prompt: &str) -> Result<Prediction> {
        let input = self.augment_prompt(prompt).await?;

        let mut request = self
            .client
            .post(format!("{}/{}", INFERENCE_API_BASE, self.repo_id))
            .json(&serde_json::json!({ "inputs": input }));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Hugging Face API error {}: {}", status, body);
        }

        let json: serde_json::Value = resp.json().await?;
        let output = json[0]["generated_text"]
            .as_str()
            .or_else(|| json["generated_text"].as_str())
            .ok_or_else(|| anyhow::anyhow!("Hugging Face response missing generated_text"))?
            .to_string();

        Ok(Prediction {
            model: "hf".to_string(),
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_requires_repo_id() {
        let section = ComponentSection {
            name: "hf".to_string(),
            fields: toml::Table::new(),
        };
        assert!(factory(&section, None).is_err());
    }

    #[test]
    fn factory_accepts_repo_id() {
        let mut fields = toml::Table::new();
        fields.insert(
            "model".to_string(),
            toml::Value::String("google/flan-t5-base".to_string()),
        );
        let section = ComponentSection {
            name: "hf".to_string(),
            fields,
        };
        let model = factory(&section, None).unwrap();
        assert_eq!(model.name(), "hf");
    }
}
