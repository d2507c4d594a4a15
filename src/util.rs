//! Shared utility functions for the Sitecraft crate.

/// Extract a JSON object from text that may contain other content.
///
/// Braces are counted outside of JSON string literals only, so markup such
/// as `{"html": "<div>{count}</div>"}` is returned whole.
pub fn extract_json_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + i + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// First `max` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Replace every character outside `[a-zA-Z0-9._-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_object_simple() {
        let text = r#"{"key": "value"}"#;
        assert_eq!(extract_json_object(text), Some(r#"{"key": "value"}"#.to_string()));
    }

    #[test]
    fn test_extract_json_object_with_prefix_and_suffix() {
        let text = r#"Segue: {"type": "message", "content": "oi"} fim"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"type": "message", "content": "oi"}"#.to_string())
        );
    }

    #[test]
    fn test_extract_json_object_braces_inside_strings() {
        let text = r#"{"type":"html_update","html":"<p>{total} \"}\"</p>"}"#;
        assert_eq!(extract_json_object(text), Some(text.to_string()));
    }

    #[test]
    fn test_extract_json_object_nested() {
        let text = r#"{"outer": {"inner": "value"}}"#;
        assert_eq!(extract_json_object(text), Some(text.to_string()));
    }

    #[test]
    fn test_extract_json_object_no_json() {
        assert_eq!(extract_json_object("No JSON here"), None);
    }

    #[test]
    fn test_extract_json_object_unclosed() {
        assert_eq!(extract_json_object(r#"{"key": "value""#), None);
    }

    #[test]
    fn test_truncate_chars_respects_code_points() {
        assert_eq!(truncate_chars("ação", 2), "aç");
        assert_eq!(truncate_chars("curto", 500), "curto");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Meu Vídeo (1).mp4"), "Meu_V_deo__1_.mp4");
        assert_eq!(sanitize_filename("clip-01_final.webm"), "clip-01_final.webm");
    }
}
