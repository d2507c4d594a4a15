//! Patch applier: targeted edits of page fragments by `data-id`.
//!
//! Fragments are scanned in sequence order. Each fragment's html is parsed
//! into a detached tree, the first element whose `data-id` matches is
//! mutated, and the fragment is re-serialized. Scanning stops at the first
//! fragment containing a match; later fragments are never touched, even if
//! they reuse the id.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sitecraft_common::Page;

use crate::dom::Document;
use crate::errors::PatchError;

/// A single patch request, as received from the preview or the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Patch {
    Replace { data_id: String, html: String },
    Remove { data_id: String },
    SetImage { data_id: String, src: String },
}

/// Where a patch landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchOutcome {
    pub fragment_index: usize,
    pub fragment_id: String,
}

/// Result of a lookup across the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementMatch {
    pub fragment_index: usize,
    pub fragment_id: String,
    pub inner_html: String,
    pub outer_html: String,
}

/// A `data-id` rewritten to keep ids unique across the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamedId {
    pub from: String,
    pub to: String,
}

pub fn apply(page: &mut Page, patch: &Patch) -> Result<PatchOutcome, PatchError> {
    match patch {
        Patch::Replace { data_id, html } => replace_content(page, data_id, html),
        Patch::Remove { data_id } => remove_element(page, data_id),
        Patch::SetImage { data_id, src } => replace_image_src(page, data_id, src),
    }
}

/// Replace the inner content of the element carrying `data_id`.
pub fn replace_content(
    page: &mut Page,
    data_id: &str,
    new_html: &str,
) -> Result<PatchOutcome, PatchError> {
    edit_first(page, data_id, |doc| {
        if let Some(el) = doc.find_by_data_id_mut(data_id) {
            el.set_inner_html(new_html);
        }
        Ok(())
    })
}

/// Remove the element carrying `data_id`, children included.
pub fn remove_element(page: &mut Page, data_id: &str) -> Result<PatchOutcome, PatchError> {
    edit_first(page, data_id, |doc| {
        if let Some(path) = doc.path_of_data_id(data_id) {
            doc.remove_at(&path);
        }
        Ok(())
    })
}

/// Point an image element at a new source, as chosen from the image bank.
pub fn replace_image_src(
    page: &mut Page,
    data_id: &str,
    src: &str,
) -> Result<PatchOutcome, PatchError> {
    edit_first(page, data_id, |doc| {
        let Some(el) = doc.find_by_data_id_mut(data_id) else {
            return Ok(());
        };
        if !el.tag.eq_ignore_ascii_case("img") {
            return Err(PatchError::NotAnImage {
                data_id: data_id.to_string(),
            });
        }
        el.set_attr("src", src);
        Ok(())
    })
}

/// Find the first element carrying `data_id`.
pub fn find_element(page: &Page, data_id: &str) -> Option<ElementMatch> {
    page.fragments().iter().enumerate().find_map(|(idx, fragment)| {
        let doc = Document::parse(&fragment.html);
        doc.find_by_data_id(data_id).map(|el| ElementMatch {
            fragment_index: idx,
            fragment_id: fragment.id.clone(),
            inner_html: el.inner_html(),
            outer_html: el.outer_html(),
        })
    })
}

fn edit_first(
    page: &mut Page,
    data_id: &str,
    edit: impl FnOnce(&mut Document) -> Result<(), PatchError>,
) -> Result<PatchOutcome, PatchError> {
    for (idx, fragment) in page.fragments_mut().iter_mut().enumerate() {
        let mut doc = Document::parse(&fragment.html);
        if doc.path_of_data_id(data_id).is_none() {
            continue;
        }
        edit(&mut doc)?;
        fragment.html = doc.to_html();
        tracing::debug!(data_id, fragment = %fragment.id, "patched fragment");
        return Ok(PatchOutcome {
            fragment_index: idx,
            fragment_id: fragment.id.clone(),
        });
    }
    Err(PatchError::ElementNotFound {
        data_id: data_id.to_string(),
    })
}

/// Rewrite `data-id` values in `html` that are already used on `page` (or
/// repeated inside `html`) by appending `-2`, `-3`, ... until unique.
///
/// The html is returned untouched when nothing collides.
pub fn uniquify_data_ids(page: &Page, html: &str) -> (String, Vec<RenamedId>) {
    let mut taken: HashSet<String> = page
        .fragments()
        .iter()
        .flat_map(|f| Document::parse(&f.html).data_ids())
        .collect();
    let mut doc = Document::parse(html);
    let mut renamed = Vec::new();

    doc.for_each_element_mut(&mut |el| {
        let Some(id) = el.data_id().map(str::to_string) else {
            return;
        };
        if taken.insert(id.clone()) {
            return;
        }
        let fresh = (2..)
            .map(|n| format!("{}-{}", id, n))
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or_else(|| id.clone());
        taken.insert(fresh.clone());
        el.set_attr("data-id", fresh.clone());
        renamed.push(RenamedId { from: id, to: fresh });
    });

    if renamed.is_empty() {
        (html.to_string(), renamed)
    } else {
        (doc.to_html(), renamed)
    }
}
