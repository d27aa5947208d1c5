//! Cleanup pass for HTML exported from word processors.
//!
//! The input is parsed into an `RcDom` tree, then walked with an explicit
//! work-list. Presentation attributes go, cosmetic inline wrappers are
//! unwrapped in place, and non-content elements are dropped with their
//! contents. No block restructuring is attempted.

use std::rc::Rc;

use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

use crate::error::RenderError;

/// Elements removed together with everything inside them.
const DISCARDED: &[&str] = &["style", "meta", "link"];

/// Elements replaced by their children.
const UNWRAPPED: &[&str] = &["span", "font", "u", "s", "strike"];

/// Attributes that are always removed.
const PRESENTATION: &[&str] = &["class", "style", "width", "height"];

/// The only attributes that survive.
const ALLOWED: &[&str] = &["href", "src", "alt", "title"];

/// Clean a rich-text HTML fragment.
///
/// Never fails: malformed markup is recovered by the HTML parser, and a
/// serializer failure is logged and yields an empty fragment.
pub fn sanitize_rich_html(raw: &str) -> String {
    match try_sanitize_rich_html(raw) {
        Ok(html) => html,
        Err(err) => {
            tracing::warn!(error = %err, "dropping rich html that could not be sanitized");
            String::new()
        }
    }
}

/// Like [`sanitize_rich_html`], but reports serializer failures.
pub fn try_sanitize_rich_html(raw: &str) -> Result<String, RenderError> {
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(raw);

    let Some(body) = find_element(&dom.document, "body") else {
        return Ok(String::new());
    };
    let stats = clean_tree(&body);

    let mut bytes = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };
    serialize(&mut bytes, &SerializableHandle::from(body), opts).map_err(|e| {
        RenderError::Serialize {
            message: e.to_string(),
        }
    })?;
    let html = String::from_utf8(bytes).map_err(|e| RenderError::Serialize {
        message: e.to_string(),
    })?;

    tracing::debug!(
        removed = stats.removed,
        unwrapped = stats.unwrapped,
        attributes = stats.attributes,
        bytes = html.len(),
        "sanitized rich html"
    );
    Ok(html)
}

#[derive(Debug, Default)]
struct CleanStats {
    removed: usize,
    unwrapped: usize,
    attributes: usize,
}

enum Action {
    Discard,
    Unwrap,
    Descend,
    Skip,
}

fn action_for(node: &Handle) -> Action {
    match &node.data {
        NodeData::Element { name, .. } => {
            let local = &*name.local;
            if DISCARDED.contains(&local) {
                Action::Discard
            } else if UNWRAPPED.contains(&local) {
                Action::Unwrap
            } else {
                Action::Descend
            }
        }
        _ => Action::Skip,
    }
}

/// Walk every element under `root`.
///
/// An unwrapped element's children take its slot in the parent's child list
/// and the index stays put, so they are examined next as ordinary children.
fn clean_tree(root: &Handle) -> CleanStats {
    let mut stats = CleanStats::default();
    let mut stack = vec![root.clone()];

    while let Some(parent) = stack.pop() {
        let mut idx = 0;
        loop {
            let next = parent.children.borrow().get(idx).cloned();
            let Some(child) = next else {
                break;
            };

            match action_for(&child) {
                Action::Discard => {
                    parent.children.borrow_mut().remove(idx);
                    child.parent.set(None);
                    stats.removed += 1;
                }
                Action::Unwrap => {
                    let grandchildren = std::mem::take(&mut *child.children.borrow_mut());
                    for grandchild in &grandchildren {
                        grandchild.parent.set(Some(Rc::downgrade(&parent)));
                    }
                    parent.children.borrow_mut().splice(idx..=idx, grandchildren);
                    child.parent.set(None);
                    stats.unwrapped += 1;
                }
                Action::Descend => {
                    stats.attributes += clean_attributes(&child);
                    stack.push(child);
                    idx += 1;
                }
                Action::Skip => idx += 1,
            }
        }
    }

    stats
}

/// Drop presentation and non-allow-listed attributes. Returns how many
/// were removed.
fn clean_attributes(node: &Handle) -> usize {
    let NodeData::Element { attrs, .. } = &node.data else {
        return 0;
    };
    let mut attrs = attrs.borrow_mut();
    let before = attrs.len();
    attrs.retain(|attr| {
        let name = &*attr.name.local;
        !PRESENTATION.contains(&name) && ALLOWED.contains(&name)
    });
    before - attrs.len()
}

/// First element named `local` in document order.
fn find_element(root: &Handle, local: &str) -> Option<Handle> {
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if let NodeData::Element { name, .. } = &node.data {
            if &*name.local == local {
                return Some(node);
            }
        }
        stack.extend(node.children.borrow().iter().rev().cloned());
    }
    None
}
