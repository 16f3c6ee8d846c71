use crate::clients::traits::{PromptRephraser, RephraseError};
use crate::config::RephraseConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You rewrite chatbot messages for a conference preparation survey. \
Restate the message in warm, natural UK English. Keep every question, number, category name \
and instruction exactly as asked. Reply with the rewritten message only.";

/// Rephraser backed by an OpenAI-compatible chat completions endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiRephraser {
    endpoint: String,
    model: String,
    api_key: String,
    timeout_ms: u64,
    client: Client,
}

impl OpenAiRephraser {
    pub fn new(config: &RephraseConfig) -> Result<Self, RephraseError> {
        let api_key = config.api_key.clone().ok_or(RephraseError::MissingApiKey)?;

        // Accept a bare base URL as well as the full completions path
        let endpoint = if config.endpoint.ends_with("/chat/completions") {
            config.endpoint.clone()
        } else {
            format!("{}/v1/chat/completions", config.endpoint.trim_end_matches('/'))
        };

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RephraseError::Http(e.to_string()))?;

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            api_key,
            timeout_ms: config.timeout_ms,
            client,
        })
    }
}

#[async_trait]
impl PromptRephraser for OpenAiRephraser {
    async fn rephrase(&self, message: &str) -> Result<String, RephraseError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": message}
            ],
            "max_tokens": 300,
            "temperature": 0.3
        });

        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RephraseError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    RephraseError::Http(e.to_string())
                }
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RephraseError::Http(format!("{}: {}", status, text)));
        }

        let response_json: Value = res
            .json()
            .await
            .map_err(|e| RephraseError::ParseError(e.to_string()))?;

        response_json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| RephraseError::ParseError("missing choices[0].message.content".into()))
    }
}
