use async_trait::async_trait;
use serde_json::{Value, json};
use sitecraft_common::AssistantReply;

use super::{AiProvider, ChatRequest, check_status, parse_reply_text};
use crate::errors::ProviderError;

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl OpenAiProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: Option<String>,
        api_key_env: &str,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            api_key_env: api_key_env.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<AssistantReply, ProviderError> {
        let key = self.api_key.as_deref().ok_or_else(|| ProviderError::MissingApiKey {
            env: self.api_key_env.clone(),
        })?;
        let body = json!({
            "model": request.model,
            "messages": request.messages,
        });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::Http)?;
        let response = check_status(response).await?;
        let value: Value = response.json().await.map_err(ProviderError::Http)?;
        normalize_openai(&value)
    }
}

/// Normalize a chat-completions response body.
pub fn normalize_openai(body: &Value) -> Result<AssistantReply, ProviderError> {
    let message = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| ProviderError::Malformed("response has no choices[0].message".to_string()))?;

    match message.get("content") {
        Some(Value::String(text)) => Ok(parse_reply_text(text)),
        // Some compatible servers return content parts instead of a string
        Some(Value::Array(parts)) => {
            let text: String = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("");
            Ok(parse_reply_text(&text))
        }
        Some(Value::Null) | None => Ok(AssistantReply::message("")),
        Some(other) => Err(ProviderError::Malformed(format!(
            "unexpected message content: {}",
            other
        ))),
    }
}
