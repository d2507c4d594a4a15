use serde::{Deserialize, Serialize};

/// Normalized assistant response.
///
/// Every provider adapter converts its own response envelope into this closed
/// union before the conversation logic sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantReply {
    Message {
        content: String,
    },
    HtmlUpdate {
        html: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
    },
}

impl AssistantReply {
    pub fn message(content: impl Into<String>) -> Self {
        AssistantReply::Message {
            content: content.into(),
        }
    }

    pub fn html_update(html: impl Into<String>, explanation: Option<String>) -> Self {
        AssistantReply::HtmlUpdate {
            html: html.into(),
            explanation,
        }
    }

    /// True when the reply carries nothing usable.
    pub fn is_empty(&self) -> bool {
        match self {
            AssistantReply::Message { content } => content.trim().is_empty(),
            AssistantReply::HtmlUpdate { html, .. } => html.trim().is_empty(),
        }
    }
}
