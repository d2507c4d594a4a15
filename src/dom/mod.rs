//! Detached HTML trees for fragment patching and preview hit-testing.
//!
//! A [`Document`] is a parsed fragment (a list of top-level nodes). Elements
//! are addressed by *paths*: the sequence of child indices from the top-level
//! list down to the node. Paths keep mutation simple (look up immutably,
//! then walk mutably) and give the preview a stable way to name click
//! targets.

mod node;
mod parser;

pub use node::{Attribute, Element, Node};
pub use parser::parse_nodes;

/// Index path from the top-level node list to a node.
pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            nodes: parse_nodes(html),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node::write_node(&mut out, node);
        }
        out
    }

    /// Depth-first, document-order search for the first element matching `pred`.
    pub fn find_path(&self, pred: impl Fn(&Element) -> bool) -> Option<NodePath> {
        fn walk(nodes: &[Node], pred: &dyn Fn(&Element) -> bool, path: &mut NodePath) -> bool {
            for (i, node) in nodes.iter().enumerate() {
                if let Node::Element(el) = node {
                    path.push(i);
                    if pred(el) || walk(&el.children, pred, path) {
                        return true;
                    }
                    path.pop();
                }
            }
            false
        }

        let mut path = Vec::new();
        walk(&self.nodes, &pred, &mut path).then_some(path)
    }

    pub fn path_of_data_id(&self, data_id: &str) -> Option<NodePath> {
        self.find_path(|el| el.data_id() == Some(data_id))
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.nodes.get(*first)?;
        for idx in rest {
            match node {
                Node::Element(el) => node = el.children.get(*idx)?,
                _ => return None,
            }
        }
        Some(node)
    }

    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        match self.node_at(path)? {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        fn walk<'a>(nodes: &'a mut [Node], path: &[usize]) -> Option<&'a mut Element> {
            let (first, rest) = path.split_first()?;
            match nodes.get_mut(*first)? {
                Node::Element(el) => {
                    if rest.is_empty() {
                        Some(el)
                    } else {
                        walk(&mut el.children, rest)
                    }
                }
                _ => None,
            }
        }
        walk(&mut self.nodes, path)
    }

    /// Detach and return the node at `path`.
    pub fn remove_at(&mut self, path: &[usize]) -> Option<Node> {
        let (last, parent) = path.split_last()?;
        let siblings = if parent.is_empty() {
            &mut self.nodes
        } else {
            &mut self.element_at_mut(parent)?.children
        };
        (*last < siblings.len()).then(|| siblings.remove(*last))
    }

    pub fn find_by_data_id(&self, data_id: &str) -> Option<&Element> {
        let path = self.path_of_data_id(data_id)?;
        self.element_at(&path)
    }

    pub fn find_by_data_id_mut(&mut self, data_id: &str) -> Option<&mut Element> {
        let path = self.path_of_data_id(data_id)?;
        self.element_at_mut(&path)
    }

    /// Nearest element on `path` (the target itself first, then its ancestors)
    /// that carries a `data-id`.
    pub fn closest_with_data_id(&self, path: &[usize]) -> Option<(NodePath, &Element)> {
        (1..=path.len()).rev().find_map(|len| {
            let prefix = &path[..len];
            self.element_at(prefix)
                .filter(|el| el.data_id().is_some())
                .map(|el| (prefix.to_vec(), el))
        })
    }

    /// Every `data-id` value in document order, duplicates included.
    pub fn data_ids(&self) -> Vec<String> {
        fn walk(nodes: &[Node], out: &mut Vec<String>) {
            for node in nodes {
                if let Node::Element(el) = node {
                    if let Some(id) = el.data_id() {
                        out.push(id.to_string());
                    }
                    walk(&el.children, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out
    }

    pub fn for_each_element_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        fn walk(nodes: &mut [Node], f: &mut dyn FnMut(&mut Element)) {
            for node in nodes {
                if let Node::Element(el) = node {
                    f(el);
                    walk(&mut el.children, f);
                }
            }
        }
        walk(&mut self.nodes, f);
    }
}
