//! AI provider boundary.
//!
//! Each provider speaks its own HTTP dialect and returns its own envelope;
//! adapters normalize both into [`AssistantReply`] so the conversation logic
//! never sees provider quirks.

mod gemini;
#[cfg(test)]
pub mod mock;
mod openai;

pub use gemini::{GeminiProvider, normalize_gemini};
pub use openai::{OpenAiProvider, normalize_openai};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use sitecraft_common::{AssistantReply, Message, Role};
use tokio_util::sync::CancellationToken;

use crate::config::{ProviderKind, ProviderSection};
use crate::errors::ProviderError;
use crate::util::extract_json_object;

/// One chat message as sent to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// A completion request: a system prompt followed by the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub messages: Vec<WireMessage>,
    pub model: String,
}

impl ChatRequest {
    /// Prefix `history` with `system_prompt`.
    pub fn new<'a>(
        system_prompt: &str,
        history: impl IntoIterator<Item = &'a Message>,
        model: impl Into<String>,
    ) -> Self {
        let mut messages = vec![WireMessage {
            role: Role::System,
            content: system_prompt.to_string(),
        }];
        messages.extend(history.into_iter().map(WireMessage::from));
        Self {
            messages,
            model: model.into(),
        }
    }
}

/// Abstraction over chat completion backends.
/// Real implementations: `OpenAiProvider`, `GeminiProvider`. Test double: `mock::ScriptedProvider`.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, request: &ChatRequest) -> Result<AssistantReply, ProviderError>;
}

/// Build the configured provider.
pub fn build_provider(section: &ProviderSection) -> Result<Arc<dyn AiProvider>, ProviderError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("sitecraft/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ProviderError::Http)?;
    let key = section.api_key();
    let provider: Arc<dyn AiProvider> = match section.kind {
        ProviderKind::Openai => Arc::new(OpenAiProvider::new(
            client,
            &section.api_url,
            key,
            &section.api_key_env,
        )),
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(
            client,
            &section.api_url,
            key,
            &section.api_key_env,
        )),
    };
    Ok(provider)
}

/// Run a completion raced against `timeout` and `cancel`.
pub async fn complete_with_timeout(
    provider: &dyn AiProvider,
    request: &ChatRequest,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<AssistantReply, ProviderError> {
    tracing::debug!(provider = provider.name(), messages = request.messages.len(), "calling provider");
    tokio::select! {
        _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        result = tokio::time::timeout(timeout, provider.complete(request)) => match result {
            Ok(reply) => reply,
            Err(_) => Err(ProviderError::Timeout { secs: timeout.as_secs() }),
        },
    }
}

/// Interpret model output text.
///
/// A JSON object carrying a `type` field is read as the tagged reply union;
/// anything else is a plain message.
pub fn parse_reply_text(text: &str) -> AssistantReply {
    let trimmed = text.trim();
    if let Some(json) = extract_json_object(trimmed)
        && let Ok(value) = serde_json::from_str::<serde_json::Value>(&json)
        && value.get("type").is_some()
        && let Ok(reply) = serde_json::from_value::<AssistantReply>(value)
    {
        return reply;
    }
    AssistantReply::message(trimmed)
}

/// Best human-readable error text from a failed provider response.
///
/// Tries, in order: a string `error` field, `error.message`, the parsed JSON
/// body, then the raw body, then the status line.
pub fn extract_error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
            return message.to_string();
        }
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
        return value.to_string();
    }
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        body.to_string()
    }
}

/// Turn a non-success response into `ProviderError::Status`.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(status.as_u16(), &body);
    tracing::warn!(status = status.as_u16(), %message, "provider returned error status");
    Err(ProviderError::Status {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::mock::ScriptedProvider;
    use super::*;

    #[test]
    fn request_starts_with_system_prompt() {
        let history = vec![Message::user("oi"), Message::system("__ARCH_PROPOSED__")];
        let request = ChatRequest::new("seja breve", &history, "m");
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, "seja breve");
        assert_eq!(request.messages[1].content, "oi");
    }

    #[test]
    fn tagged_json_is_parsed_as_reply() {
        let text = r#"Claro: {"type":"html_update","html":"<section data-id=\"a\">A</section>","explanation":"Hero"}"#;
        assert_eq!(
            parse_reply_text(text),
            AssistantReply::html_update(r#"<section data-id="a">A</section>"#, Some("Hero".into()))
        );
    }

    #[test]
    fn untagged_text_is_a_message() {
        assert_eq!(parse_reply_text("  Olá!  "), AssistantReply::message("Olá!"));
        let json_without_type = r#"{"answer": 42}"#;
        assert_eq!(
            parse_reply_text(json_without_type),
            AssistantReply::message(json_without_type)
        );
    }

    #[test]
    fn error_message_extraction_order() {
        assert_eq!(extract_error_message(400, r#"{"error":"quota"}"#), "quota");
        assert_eq!(
            extract_error_message(401, r#"{"error":{"message":"bad key","code":1}}"#),
            "bad key"
        );
        assert_eq!(extract_error_message(500, r#"{"detail":"x"}"#), r#"{"detail":"x"}"#);
        assert_eq!(extract_error_message(502, "Bad Gateway"), "Bad Gateway");
        assert_eq!(extract_error_message(503, ""), "HTTP 503");
    }

    #[tokio::test]
    async fn timeout_maps_to_timeout_error() {
        let provider = ScriptedProvider::new(vec![]).with_delay(Duration::from_millis(200));
        let request = ChatRequest::new("s", &[] as &[Message], "m");
        let err = complete_with_timeout(
            &provider,
            &request,
            Duration::from_millis(10),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { .. }));
        assert_eq!(err.to_string(), "Tempo esgotado ao comunicar com a IA.");
    }

    #[tokio::test]
    async fn cancellation_wins_over_slow_provider() {
        let provider = ScriptedProvider::new(vec![Ok(AssistantReply::message("tarde"))])
            .with_delay(Duration::from_secs(5));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = complete_with_timeout(
            &provider,
            &ChatRequest::new("s", &[] as &[Message], "m"),
            Duration::from_secs(30),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProviderError::Cancelled));
    }

    #[test]
    fn build_provider_uses_configured_kind() {
        let mut section = ProviderSection::default();
        assert_eq!(build_provider(&section).unwrap().name(), "openai");
        section.kind = ProviderKind::Gemini;
        assert_eq!(build_provider(&section).unwrap().name(), "gemini");
    }
}
