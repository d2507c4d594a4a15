use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default display label for fragments produced by the assistant.
pub const DEFAULT_FRAGMENT_NAME: &str = "Seção Gerada pela IA";

/// A named, independently addressable block of HTML contributing to a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: String,
    pub name: String,
    pub html: String,
}

impl Fragment {
    /// Create a fragment with a fresh v4 identifier.
    pub fn new(name: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            html: html.into(),
        }
    }
}

/// The ordered fragment sequence that composes a page.
///
/// Serializes as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Page {
    fragments: Vec<Fragment>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fragments(fragments: Vec<Fragment>) -> Self {
        Self { fragments }
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn fragments_mut(&mut self) -> &mut [Fragment] {
        &mut self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.id == id)
    }

    /// Append a fragment. Fragment ids must stay unique; a colliding id is
    /// replaced with a fresh one.
    pub fn push(&mut self, mut fragment: Fragment) -> &Fragment {
        if self.get(&fragment.id).is_some() {
            fragment.id = Uuid::new_v4().to_string();
        }
        self.fragments.push(fragment);
        let last = self.fragments.len() - 1;
        &self.fragments[last]
    }

    /// Remove a fragment by id. Returns the removed fragment, if any.
    pub fn remove_fragment(&mut self, id: &str) -> Option<Fragment> {
        let idx = self.fragments.iter().position(|f| f.id == id)?;
        Some(self.fragments.remove(idx))
    }

    /// Move the fragment at `from` so that it ends up at index `to`.
    ///
    /// Returns false when either index is out of range.
    pub fn move_fragment(&mut self, from: usize, to: usize) -> bool {
        if from >= self.fragments.len() || to >= self.fragments.len() {
            return false;
        }
        let fragment = self.fragments.remove(from);
        self.fragments.insert(to, fragment);
        true
    }

    /// Concatenate fragment html in sequence order.
    pub fn concat_html(&self) -> String {
        self.fragments.iter().map(|f| f.html.as_str()).collect()
    }
}
