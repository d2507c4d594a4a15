//! Forgiving HTML fragment parser.
//!
//! Assistant output is rarely a clean document: unclosed tags, stray closing
//! tags and JSX-isms are common. The parser never fails. Unmatched closing
//! tags are dropped, unclosed elements are closed at end of input, and a `<`
//! that does not start a tag is kept as text. Opening a `p`, `li`, `dt`,
//! `dd`, `option`, `tr`, `td` or `th` closes an open sibling of the same kind.

use super::node::{Attribute, Element, Node};

/// Elements whose content is raw text up to the matching closing tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Tags with an implied end: the tag, the open tags it closes, and extra
/// tags that stop the search.
const IMPLIED_END: &[(&str, &[&str], &[&str])] = &[
    ("p", &["p"], &[]),
    ("li", &["li"], &[]),
    ("dt", &["dt", "dd"], &[]),
    ("dd", &["dt", "dd"], &[]),
    ("option", &["option"], &[]),
    ("tr", &["tr"], &[]),
    ("td", &["td", "th"], &["tr"]),
    ("th", &["td", "th"], &["tr"]),
];

/// Containers an implied end never reaches past.
const SCOPE_BARRIERS: &[&str] = &[
    "article", "aside", "blockquote", "button", "div", "dl", "footer", "form", "header", "main",
    "menu", "nav", "ol", "section", "select", "table", "tbody", "template", "tfoot", "thead", "ul",
];

/// Parse an HTML fragment into a list of top-level nodes.
pub fn parse_nodes(html: &str) -> Vec<Node> {
    // stack[0] is a synthetic container that collects top-level nodes
    let mut stack: Vec<Element> = vec![Element::new("#fragment")];
    let bytes = html.as_bytes();
    let mut pos = 0;

    while pos < html.len() {
        if bytes[pos] != b'<' {
            let end = html[pos..].find('<').map_or(html.len(), |i| pos + i);
            push_node(&mut stack, Node::Text(html[pos..end].to_string()));
            pos = end;
            continue;
        }

        let rest = &html[pos..];

        if let Some(body) = rest.strip_prefix("<!--") {
            let (comment, consumed) = match body.find("-->") {
                Some(i) => (&body[..i], 4 + i + 3),
                None => (body, rest.len()),
            };
            push_node(&mut stack, Node::Comment(comment.to_string()));
            pos += consumed;
            continue;
        }

        if let Some(body) = rest.strip_prefix("<!") {
            let (decl, consumed) = match body.find('>') {
                Some(i) => (&body[..i], 2 + i + 1),
                None => (body, rest.len()),
            };
            push_node(&mut stack, Node::Declaration(decl.to_string()));
            pos += consumed;
            continue;
        }

        if let Some(body) = rest.strip_prefix("</") {
            match body.find('>') {
                Some(i) => {
                    close_element(&mut stack, body[..i].trim());
                    pos += 2 + i + 1;
                }
                None => {
                    push_node(&mut stack, Node::Text(rest.to_string()));
                    pos = html.len();
                }
            }
            continue;
        }

        let starts_tag = rest[1..].chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        let parsed = if starts_tag { parse_open_tag(rest) } else { None };
        let Some((element, self_closing, consumed)) = parsed else {
            push_node(&mut stack, Node::Text("<".to_string()));
            pos += 1;
            continue;
        };
        pos += consumed;

        if element.is_void() || self_closing {
            push_node(&mut stack, Node::Element(element));
            continue;
        }

        if is_raw_text_tag(&element.tag) {
            let closing = format!("</{}", element.tag.to_ascii_lowercase());
            let end = html[pos..]
                .to_ascii_lowercase()
                .find(&closing)
                .map_or(html.len(), |i| pos + i);
            let mut element = element;
            if end > pos {
                element.children.push(Node::Text(html[pos..end].to_string()));
            }
            push_node(&mut stack, Node::Element(element));
            pos = end;
            // Skip the closing tag itself; it has no open counterpart on the stack.
            if let Some(i) = html[pos..].find('>') {
                pos += i + 1;
            }
            continue;
        }

        close_implied(&mut stack, &element.tag);
        stack.push(element);
    }

    while stack.len() > 1 {
        pop_into_parent(&mut stack);
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn push_node(stack: &mut [Element], node: Node) {
    if let Some(top) = stack.last_mut() {
        top.children.push(node);
    }
}

fn pop_into_parent(stack: &mut Vec<Element>) {
    if let Some(el) = stack.pop() {
        push_node(stack, Node::Element(el));
    }
}

fn close_element(stack: &mut Vec<Element>, tag: &str) {
    let Some(idx) = stack
        .iter()
        .skip(1)
        .rposition(|el| el.tag.eq_ignore_ascii_case(tag))
    else {
        return;
    };
    // rposition on the skipped iterator is relative to index 1
    let target = idx + 1;
    while stack.len() > target {
        pop_into_parent(stack);
    }
}

fn close_implied(stack: &mut Vec<Element>, tag: &str) {
    let Some((_, closes, barriers)) = IMPLIED_END
        .iter()
        .find(|(t, _, _)| t.eq_ignore_ascii_case(tag))
    else {
        return;
    };
    for idx in (1..stack.len()).rev() {
        let open = stack[idx].tag.as_str();
        if closes.iter().any(|t| t.eq_ignore_ascii_case(open)) {
            while stack.len() > idx {
                pop_into_parent(stack);
            }
            return;
        }
        let is_barrier = |list: &[&str]| list.iter().any(|t| t.eq_ignore_ascii_case(open));
        if is_barrier(SCOPE_BARRIERS) || is_barrier(barriers) {
            return;
        }
    }
}

fn is_raw_text_tag(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

/// Parse `<tag attr="v" ...>` at the start of `input`.
///
/// Returns the element, whether it used `/>` syntax, and the number of bytes
/// consumed. `None` when the tag is never terminated.
fn parse_open_tag(input: &str) -> Option<(Element, bool, usize)> {
    let mut chars = input.char_indices().peekable();
    chars.next(); // '<'

    let mut name_end = 1;
    while let Some(&(i, c)) = chars.peek() {
        if !is_name_char(c) {
            break;
        }
        name_end = i + c.len_utf8();
        chars.next();
    }
    let mut element = Element::new(&input[1..name_end]);

    loop {
        while chars.peek().is_some_and(|&(_, c)| c.is_whitespace()) {
            chars.next();
        }
        let &(i, c) = chars.peek()?;
        match c {
            '>' => return Some((element, false, i + 1)),
            '/' => {
                chars.next();
                if let Some(&(j, '>')) = chars.peek() {
                    return Some((element, true, j + 1));
                }
            }
            _ => {
                let start = i;
                let mut end = i;
                while let Some(&(j, c)) = chars.peek() {
                    if c.is_whitespace() || c == '=' || c == '>' || c == '/' {
                        break;
                    }
                    end = j + c.len_utf8();
                    chars.next();
                }
                if end == start {
                    // Lone '=' or similar junk; skip it.
                    chars.next();
                    continue;
                }
                let name = input[start..end].to_string();

                while chars.peek().is_some_and(|&(_, c)| c.is_whitespace()) {
                    chars.next();
                }
                let value = if chars.peek().is_some_and(|&(_, c)| c == '=') {
                    chars.next();
                    while chars.peek().is_some_and(|&(_, c)| c.is_whitespace()) {
                        chars.next();
                    }
                    Some(parse_attr_value(input, &mut chars)?)
                } else {
                    None
                };
                element.attrs.push(Attribute { name, value });
            }
        }
    }
}

fn parse_attr_value(
    input: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> Option<String> {
    let &(start, first) = chars.peek()?;
    if first == '"' || first == '\'' {
        chars.next();
        for (j, c) in chars.by_ref() {
            if c == first {
                return Some(input[start + 1..j].to_string());
            }
        }
        return None;
    }
    let mut end = start;
    while let Some(&(j, c)) = chars.peek() {
        if c.is_whitespace() || c == '>' {
            break;
        }
        end = j + c.len_utf8();
        chars.next();
    }
    Some(input[start..end].to_string())
}
