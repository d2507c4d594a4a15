use async_trait::async_trait;
use serde_json::{Value, json};
use sitecraft_common::{AssistantReply, PLANNING_APPROVED, PLANNING_PROPOSED, Role};

use super::{AiProvider, ChatRequest, WireMessage, check_status, parse_reply_text};
use crate::errors::ProviderError;

/// Google Gemini `models/{model}:generateContent` client.
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl GeminiProvider {
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

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

/// Map chat messages onto Gemini's `systemInstruction` + `contents` shape.
///
/// System messages are merged into the instruction; phase markers carry no
/// meaning for the model and are dropped.
pub fn gemini_body(messages: &[WireMessage]) -> Value {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System && !is_marker(&m.content))
        .map(|m| m.content.as_str())
        .collect();
    let contents: Vec<Value> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| {
            let role = if m.role == Role::Assistant { "model" } else { "user" };
            json!({"role": role, "parts": [{"text": m.content}]})
        })
        .collect();

    let mut body = json!({ "contents": contents });
    if !system.is_empty() {
        body["systemInstruction"] = json!({"parts": [{"text": system.join("\n\n")}]});
    }
    body
}

fn is_marker(content: &str) -> bool {
    content == PLANNING_PROPOSED || content == PLANNING_APPROVED
}

#[async_trait]
impl AiProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<AssistantReply, ProviderError> {
        let key = self.api_key.as_deref().ok_or_else(|| ProviderError::MissingApiKey {
            env: self.api_key_env.clone(),
        })?;

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", key)
            .json(&gemini_body(&request.messages))
            .send()
            .await
            .map_err(ProviderError::Http)?;
        let response = check_status(response).await?;
        let value: Value = response.json().await.map_err(ProviderError::Http)?;
        normalize_gemini(&value)
    }
}

/// Normalize a `generateContent` response body.
pub fn normalize_gemini(body: &Value) -> Result<AssistantReply, ProviderError> {
    let candidate = body
        .get("candidates")
        .and_then(|c| c.get(0))
        .ok_or_else(|| match body.pointer("/promptFeedback/blockReason").and_then(|r| r.as_str()) {
            Some(reason) => ProviderError::Malformed(format!("prompt blocked: {}", reason)),
            None => ProviderError::Malformed("response has no candidates".to_string()),
        })?;

    let text = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    Ok(parse_reply_text(&text))
}
