//! Fragment promotion for assistant replies.
//!
//! Providers regularly ignore the "answer with structured output" instruction
//! and send markup inside a plain message. A `Message` reply whose content
//! holds an html/jsx fenced block, or a raw block-level opening tag, is
//! reclassified as an `HtmlUpdate`.

use regex::Regex;
use sitecraft_common::AssistantReply;
use std::sync::LazyLock;

// Fenced block, label optional (```html, ```jsx or bare ```)
static CODE_BLOCK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```(?:html|jsx)?[ \t]*\r?\n(.*?)```").unwrap());

static BLOCK_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*(?:div|section|header|main|footer|nav|article|aside)[\s>]").unwrap()
});

/// Promote a `Message` reply carrying markup to an `HtmlUpdate`.
///
/// The promoted update keeps the original text as its explanation. Replies
/// that are already updates, or messages without markup, pass through.
pub fn promote(reply: AssistantReply) -> AssistantReply {
    let AssistantReply::Message { content } = reply else {
        return reply;
    };
    match extract_markup(&content) {
        Some(html) => {
            tracing::debug!(len = html.len(), "promoted message reply to html update");
            AssistantReply::HtmlUpdate {
                html,
                explanation: Some(content),
            }
        }
        None => AssistantReply::Message { content },
    }
}

/// Find markup in free text: first a fenced block, then a raw block tag.
pub fn extract_markup(text: &str) -> Option<String> {
    if let Some(cap) = CODE_BLOCK_REGEX.captures(text) {
        let body = cap.get(1).map_or("", |m| m.as_str()).trim();
        if !body.is_empty() {
            return Some(body.to_string());
        }
    }

    let start = BLOCK_TAG_REGEX.find(text)?.start();
    let end = text.rfind('>')?;
    (end > start).then(|| text[start..=end].to_string())
}
