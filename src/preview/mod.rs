//! Live preview of a page and its click-to-edit interaction.
//!
//! The preview keeps the page and a parsed tree of the rendered root
//! container. A click is resolved to the nearest element carrying a
//! `data-id`, which becomes the single selected element. Edits go back
//! through the patch applier so the page stays the source of truth; the tree
//! is rebuilt after every edit.

mod document;

pub use document::{ROOT_ID, TAILWIND_CDN, render_document};

use serde::{Deserialize, Serialize};
use sitecraft_common::Page;

use crate::dom::{Document, Element, NodePath};
use crate::errors::PatchError;
use crate::patch::{self, PatchOutcome};

pub const SELECTED_CLASS: &str = "selected-element";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditableKind {
    Text,
    Heading,
    Button,
    Image,
}

impl EditableKind {
    fn from_data_type(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "heading" => Some(Self::Heading),
            "button" => Some(Self::Button),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

/// The element an inline edit or image-bank pick is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableElementRef {
    pub data_id: String,
    pub kind: EditableKind,
    /// Inner html for text kinds, current `src` for images.
    pub content: String,
    pub tag_name: String,
}

impl EditableElementRef {
    fn from_element(el: &Element) -> Option<Self> {
        let data_id = el.data_id()?.to_string();
        let is_img = el.tag.eq_ignore_ascii_case("img");
        let kind = match el.data_type().and_then(EditableKind::from_data_type) {
            Some(kind) => kind,
            None if is_img => EditableKind::Image,
            None => return None,
        };
        let kind = if is_img { EditableKind::Image } else { kind };
        let content = match kind {
            EditableKind::Image => el.attr("src").unwrap_or_default().to_string(),
            _ => el.inner_html(),
        };
        Some(Self {
            data_id,
            kind,
            content,
            tag_name: el.tag.to_ascii_lowercase(),
        })
    }
}

/// How a click target is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickTarget {
    /// Child indices from the root container.
    Path(NodePath),
    DataId(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "element", rename_all = "snake_case")]
pub enum ClickAction {
    OpenImageBank(EditableElementRef),
    EditInline(EditableElementRef),
    Cleared,
}

struct Selection {
    path: NodePath,
    element: EditableElementRef,
}

pub struct Preview {
    page: Page,
    tree: Document,
    selection: Option<Selection>,
    lang: String,
}

impl Preview {
    pub fn new(page: Page, lang: impl Into<String>) -> Self {
        let tree = Document::parse(&page.concat_html());
        Self {
            page,
            tree,
            selection: None,
            lang: lang.into(),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn into_page(self) -> Page {
        self.page
    }

    pub fn selected(&self) -> Option<&EditableElementRef> {
        self.selection.as_ref().map(|s| &s.element)
    }

    /// Current document, selection marker included.
    pub fn html(&self) -> String {
        document::wrap_body(&self.tree.to_html(), &self.lang)
    }

    /// Document for download as `index.html`, without editor state.
    pub fn export_html(&self) -> String {
        render_document(&self.page, &self.lang)
    }

    /// Handle a click anywhere in the preview.
    pub fn click(&mut self, target: &ClickTarget) -> ClickAction {
        self.clear_selection();

        let path = match target {
            ClickTarget::Path(path) => path.clone(),
            ClickTarget::DataId(id) => match self.tree.path_of_data_id(id) {
                Some(path) => path,
                None => return ClickAction::Cleared,
            },
        };
        let Some((path, element)) = self
            .tree
            .closest_with_data_id(&path)
            .and_then(|(p, el)| EditableElementRef::from_element(el).map(|r| (p, r)))
        else {
            return ClickAction::Cleared;
        };

        if let Some(el) = self.tree.element_at_mut(&path) {
            el.add_class(SELECTED_CLASS);
        }
        tracing::debug!(data_id = %element.data_id, kind = ?element.kind, "selected element");
        self.selection = Some(Selection {
            path,
            element: element.clone(),
        });
        match element.kind {
            EditableKind::Image => ClickAction::OpenImageBank(element),
            _ => ClickAction::EditInline(element),
        }
    }

    /// Drop the selection marker, if any.
    pub fn clear_selection(&mut self) {
        if let Some(selection) = self.selection.take()
            && let Some(el) = self.tree.element_at_mut(&selection.path)
        {
            el.remove_class(SELECTED_CLASS);
        }
    }

    /// Look up an editable element by `data-id` in the current document.
    pub fn resolve(&self, data_id: &str) -> Option<EditableElementRef> {
        self.tree
            .find_by_data_id(data_id)
            .and_then(EditableElementRef::from_element)
    }

    /// Save the inline editor's content into the selected element.
    ///
    /// Returns `Ok(None)` when nothing is selected.
    pub fn save_inline(&mut self, new_html: &str) -> Result<Option<PatchOutcome>, PatchError> {
        self.edit_selected(|page, id| patch::replace_content(page, id, new_html))
    }

    pub fn remove_selected(&mut self) -> Result<Option<PatchOutcome>, PatchError> {
        self.edit_selected(patch::remove_element)
    }

    /// Apply an image chosen from the bank to the selected image.
    pub fn choose_image(&mut self, url: &str) -> Result<Option<PatchOutcome>, PatchError> {
        self.edit_selected(|page, id| patch::replace_image_src(page, id, url))
    }

    fn edit_selected(
        &mut self,
        edit: impl FnOnce(&mut Page, &str) -> Result<PatchOutcome, PatchError>,
    ) -> Result<Option<PatchOutcome>, PatchError> {
        let Some(data_id) = self.selected().map(|s| s.data_id.clone()) else {
            return Ok(None);
        };
        self.clear_selection();
        let outcome = edit(&mut self.page, &data_id)?;
        self.tree = Document::parse(&self.page.concat_html());
        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitecraft_common::Fragment;

    fn preview() -> Preview {
        let page = Page::from_fragments(vec![
            Fragment::new(
                "hero",
                r#"<section data-id="hero"><h1 data-id="title" data-type="heading">Treine <em>forte</em></h1><a data-id="cta" data-type="button" class="btn">Comece</a></section>"#,
            ),
            Fragment::new(
                "gallery",
                r#"<div><img data-id="photo" src="a.png" alt="foto"><figure data-id="fig" data-type="image"><span>x</span></figure></div>"#,
            ),
        ]);
        Preview::new(page, "pt-BR")
    }

    fn selected_count(preview: &Preview) -> usize {
        preview.html().matches(SELECTED_CLASS).count() - 1
    }

    #[test]
    fn clicking_text_descendant_edits_nearest_data_id() {
        let mut p = preview();
        // <em> inside the heading
        let action = p.click(&ClickTarget::Path(vec![0, 0, 1]));
        let ClickAction::EditInline(el) = action else {
            panic!("expected inline edit, got {:?}", action);
        };
        assert_eq!(el.data_id, "title");
        assert_eq!(el.kind, EditableKind::Heading);
        assert_eq!(el.content, "Treine <em>forte</em>");
        assert_eq!(el.tag_name, "h1");
        assert_eq!(selected_count(&p), 1);
    }

    #[test]
    fn img_without_type_opens_image_bank() {
        let mut p = preview();
        let action = p.click(&ClickTarget::DataId("photo".into()));
        let ClickAction::OpenImageBank(el) = action else {
            panic!("expected image bank");
        };
        assert_eq!(el.content, "a.png");

        let action = p.click(&ClickTarget::Path(vec![1, 1, 0]));
        assert!(matches!(action, ClickAction::OpenImageBank(ref el) if el.data_id == "fig"));
    }

    #[test]
    fn untyped_or_missing_targets_clear_selection() {
        let mut p = preview();
        p.click(&ClickTarget::DataId("cta".into()));
        assert!(p.selected().is_some());

        // The section has a data-id but no editable type
        assert_eq!(p.click(&ClickTarget::DataId("hero".into())), ClickAction::Cleared);
        assert!(p.selected().is_none());
        assert_eq!(selected_count(&p), 0);

        assert_eq!(p.click(&ClickTarget::Path(vec![7])), ClickAction::Cleared);
        assert_eq!(p.click(&ClickTarget::DataId("nope".into())), ClickAction::Cleared);
    }

    #[test]
    fn only_one_element_is_marked() {
        let mut p = preview();
        p.click(&ClickTarget::DataId("title".into()));
        p.click(&ClickTarget::DataId("cta".into()));
        assert_eq!(selected_count(&p), 1);
        assert!(p.html().contains(r#"class="btn selected-element""#));
        assert!(!p.export_html().contains(r#"class="btn selected-element""#));
    }

    #[test]
    fn save_inline_patches_page_and_clears() {
        let mut p = preview();
        assert_eq!(p.save_inline("x").unwrap(), None);

        p.click(&ClickTarget::DataId("cta".into()));
        let outcome = p.save_inline("Matricule-se").unwrap().unwrap();
        assert_eq!(outcome.fragment_index, 0);
        assert!(p.selected().is_none());
        assert_eq!(p.resolve("cta").unwrap().content, "Matricule-se");
        assert!(p.page().fragments()[0].html.contains("Matricule-se"));
        assert!(!p.page().fragments()[0].html.contains(SELECTED_CLASS));
    }

    #[test]
    fn remove_selected_drops_element() {
        let mut p = preview();
        p.click(&ClickTarget::DataId("title".into()));
        p.remove_selected().unwrap();
        assert!(p.resolve("title").is_none());
        assert!(p.resolve("cta").is_some());
    }

    #[test]
    fn choose_image_sets_src() {
        let mut p = preview();
        p.click(&ClickTarget::DataId("photo".into()));
        p.choose_image("https://cdn.example/b.png").unwrap();
        assert_eq!(p.resolve("photo").unwrap().content, "https://cdn.example/b.png");

        p.click(&ClickTarget::DataId("fig".into()));
        assert!(matches!(
            p.choose_image("c.png"),
            Err(PatchError::NotAnImage { .. })
        ));
    }

    #[test]
    fn click_action_serializes_tagged() {
        let mut p = preview();
        let json = serde_json::to_value(p.click(&ClickTarget::DataId("cta".into()))).unwrap();
        assert_eq!(json["action"], "edit_inline");
        assert_eq!(json["element"]["kind"], "button");
        assert_eq!(
            serde_json::to_value(ClickAction::Cleared).unwrap(),
            serde_json::json!({"action": "cleared"})
        );
    }
}
