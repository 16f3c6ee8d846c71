use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RephraseError {
    #[error("rephraser timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("api key not configured")]
    MissingApiKey,
}

/// Restates a bot message in friendlier words without changing what it asks for.
#[async_trait]
pub trait PromptRephraser: Send + Sync {
    async fn rephrase(&self, message: &str) -> Result<String, RephraseError>;
}

/// Rephrase each message, keeping the original text for any that fail.
pub async fn rephrase_messages(
    rephraser: &dyn PromptRephraser,
    messages: Vec<String>,
) -> Vec<String> {
    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        // Numbered option lists are passed through untouched.
        if message.starts_with("1. ") {
            out.push(message);
            continue;
        }
        match rephraser.rephrase(&message).await {
            Ok(text) if !text.trim().is_empty() => out.push(text),
            Ok(_) => {
                tracing::warn!("Rephraser returned empty text, keeping original");
                out.push(message);
            }
            Err(e) => {
                tracing::warn!("Rephrase failed, keeping original: {}", e);
                out.push(message);
            }
        }
    }
    out
}
