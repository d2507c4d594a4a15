//! Tree types and serialization.

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Raw attribute value, entity references left untouched. `None` for
    /// bare boolean attributes such as `disabled`.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Raw text, entities left untouched.
    Text(String),
    Comment(String),
    /// `<!DOCTYPE html>` and other `<!...>` declarations, without the brackets.
    Declaration(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_void(&self) -> bool {
        is_void_tag(&self.tag)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .and_then(|a| a.value.as_deref())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = Some(value.into());
        match self
            .attrs
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            Some(attr) => attr.value = value,
            None => self.attrs.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|a| !a.name.eq_ignore_ascii_case(name));
    }

    pub fn data_id(&self) -> Option<&str> {
        self.attr("data-id")
    }

    pub fn data_type(&self) -> Option<&str> {
        self.attr("data-type")
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let classes = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr("class", classes);
    }

    pub fn remove_class(&mut self, class: &str) {
        let Some(existing) = self.attr("class") else {
            return;
        };
        let remaining: Vec<&str> = existing.split_whitespace().filter(|c| *c != class).collect();
        if remaining.is_empty() {
            self.remove_attr("class");
        } else {
            let joined = remaining.join(" ");
            self.set_attr("class", joined);
        }
    }

    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            write_node(&mut out, child);
        }
        out
    }

    /// Replace all children with the parse of `html`. A no-op on void elements.
    pub fn set_inner_html(&mut self, html: &str) {
        if self.is_void() {
            return;
        }
        self.children = super::parser::parse_nodes(html);
    }

    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        write_element(&mut out, self);
        out
    }
}

pub(crate) fn is_void_tag(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

pub(crate) fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Element(el) => write_element(out, el),
        Node::Text(text) => out.push_str(text),
        Node::Comment(body) => {
            out.push_str("<!--");
            out.push_str(body);
            out.push_str("-->");
        }
        Node::Declaration(body) => {
            out.push_str("<!");
            out.push_str(body);
            out.push('>');
        }
    }
}

fn write_element(out: &mut String, el: &Element) {
    out.push('<');
    out.push_str(&el.tag);
    for attr in &el.attrs {
        out.push(' ');
        out.push_str(&attr.name);
        if let Some(value) = &attr.value {
            out.push_str("=\"");
            out.push_str(&value.replace('"', "&quot;"));
            out.push('"');
        }
    }
    out.push('>');
    if el.is_void() {
        return;
    }
    for child in &el.children {
        write_node(out, child);
    }
    out.push_str("</");
    out.push_str(&el.tag);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_helpers_keep_other_classes() {
        let mut el = Element::new("p");
        el.add_class("selected-element");
        assert_eq!(el.attr("class"), Some("selected-element"));
        el.set_attr("class", "text-lg font-bold");
        el.add_class("selected-element");
        el.add_class("selected-element");
        assert_eq!(el.attr("class"), Some("text-lg font-bold selected-element"));
        el.remove_class("selected-element");
        assert_eq!(el.attr("class"), Some("text-lg font-bold"));
        el.remove_class("text-lg");
        el.remove_class("font-bold");
        assert_eq!(el.attr("class"), None);
    }

    #[test]
    fn serializes_void_and_quoted_attributes() {
        let mut img = Element::new("img");
        img.set_attr("src", "a\"b.png");
        img.attrs.push(Attribute {
            name: "hidden".into(),
            value: None,
        });
        assert_eq!(img.outer_html(), r#"<img src="a&quot;b.png" hidden>"#);
    }
}
