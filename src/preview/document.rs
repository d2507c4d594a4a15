use sitecraft_common::Page;

/// Root container id. Click paths are relative to its children.
pub const ROOT_ID: &str = "root";

pub const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";

const STYLES: &str = "\
*,*::before,*::after{box-sizing:border-box}
html,body{margin:0;padding:0}
body{font-family:ui-sans-serif,system-ui,-apple-system,sans-serif;-webkit-font-smoothing:antialiased}
img{max-width:100%;height:auto;display:block}
[data-id]{cursor:pointer;transition:outline-color .15s ease}
[data-id]:hover{outline:2px dashed rgba(59,130,246,.6);outline-offset:2px}
.selected-element{box-shadow:0 0 0 3px rgba(59,130,246,.9);border-radius:4px}";

/// Full preview document for `page`.
pub fn render_document(page: &Page, lang: &str) -> String {
    wrap_body(&page.concat_html(), lang)
}

pub(super) fn wrap_body(body: &str, lang: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
<html lang=\"{lang}\">\n\
<head>\n\
<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<script src=\"{cdn}\"></script>\n\
<style>\n{styles}\n</style>\n\
</head>\n\
<body>\n\
<div id=\"{root}\">{body}</div>\n\
</body>\n\
</html>\n",
        lang = sanitize_lang(lang),
        cdn = TAILWIND_CDN,
        styles = STYLES,
        root = ROOT_ID,
        body = body,
    )
}

fn sanitize_lang(lang: &str) -> String {
    let cleaned: String = lang
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if cleaned.is_empty() { "en".to_string() } else { cleaned }
}
