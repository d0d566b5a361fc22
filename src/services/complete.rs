//! Reply generation via an OpenAI-compatible `/v1/chat/completions`
//! endpoint.
//!
//! Works with OpenAI, Groq, Together.ai, LM Studio, vLLM, Ollama (OpenAI
//! mode) — any provider that speaks the chat-completions wire format.  One
//! utterance is one request; no conversation history is kept.

use async_trait::async_trait;

use crate::config::ApiConfig;

use super::{check_status, CompletionService, ServiceError};

/// Completion client for any endpoint speaking the OpenAI chat API.
pub struct OpenAiCompletion {
    client: reqwest::Client,
    config: ApiConfig,
}

impl OpenAiCompletion {
    /// Build a client from application config, with the per-request timeout
    /// baked into the HTTP client.
    pub fn from_config(config: &ApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

/// Pull the assistant reply out of a `/v1/chat/completions` response body.
pub(crate) fn extract_reply(json: &serde_json::Value) -> Result<String, ServiceError> {
    let reply = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(ServiceError::EmptyResponse)?
        .trim()
        .to_string();

    if reply.is_empty() {
        return Err(ServiceError::EmptyResponse);
    }
    Ok(reply)
}

#[async_trait]
impl CompletionService for OpenAiCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let body = serde_json::json!({
            "model":       self.config.chat_model,
            "messages": [
                { "role": "system", "content": self.config.system_prompt },
                { "role": "user",   "content": prompt }
            ],
            "stream":      false,
            "temperature": self.config.temperature,
            "max_tokens":  256
        });

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = self.config.bearer_key() {
            req = req.bearer_auth(key);
        }

        let response = check_status(req.send().await?).await?;
        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;

        extract_reply(&json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_reply_reads_first_choice() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": " hi there " } }
            ]
        });
        assert_eq!(extract_reply(&json).unwrap(), "hi there");
    }

    #[test]
    fn extract_reply_rejects_empty_choices() {
        let json = serde_json::json!({ "choices": [] });
        assert!(matches!(
            extract_reply(&json),
            Err(ServiceError::EmptyResponse)
        ));
    }

    #[test]
    fn extract_reply_rejects_blank_content() {
        let json = serde_json::json!({
            "choices": [ { "message": { "content": "" } } ]
        });
        assert!(matches!(
            extract_reply(&json),
            Err(ServiceError::EmptyResponse)
        ));
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _client = OpenAiCompletion::from_config(&ApiConfig::default());
    }
}
