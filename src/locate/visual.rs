// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Identifier extraction from rendered elements.
//!
//! The renderer's element tree is reached only through [`VisualElement`], so hosts can adapt
//! whatever DOM/SVG binding they use and tests can use [`ElementSnapshot`].

use std::sync::OnceLock;

use regex::Regex;

use crate::format::mermaid::is_node_ident;
use crate::model::{EdgeKey, NodeIdent};

/// Read-only view of one rendered element.
pub trait VisualElement {
    fn attr(&self, name: &str) -> Option<&str>;
    fn text_content(&self) -> Option<&str>;
    fn parent(&self) -> Option<&Self>;
}

/// What a click on a rendered element refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualTarget {
    Node(NodeIdent),
    Edge(EdgeKey),
}

/// Owned element tree for hosts without a live DOM, and for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSnapshot {
    attrs: Vec<(String, String)>,
    text: Option<String>,
    parent: Option<Box<ElementSnapshot>>,
}

impl ElementSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_parent(mut self, parent: ElementSnapshot) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }
}

impl VisualElement for ElementSnapshot {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    fn text_content(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn parent(&self) -> Option<&Self> {
        self.parent.as_deref()
    }
}

fn self_and_ancestors<E: VisualElement>(element: &E) -> impl Iterator<Item = &E> {
    std::iter::successors(Some(element), |current| current.parent())
}

/// `flowchart-A-3`, `state-Idle-0`, optionally prefixed by the svg id (`mermaid-1-flowchart-A-3`).
fn rendered_node_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(?:^|-)(?:flowchart|state)-(?P<id>[A-Za-z_][A-Za-z0-9_]*)-\d+$").ok()
        })
        .as_ref()
}

fn dashed_edge_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(concat!(
                r"(?:^|-)L-(?P<src>[A-Za-z_][A-Za-z0-9_]*)",
                r"-(?P<tgt>[A-Za-z_][A-Za-z0-9_]*)-\d+$",
            ))
            .ok()
        })
        .as_ref()
}

fn underscored_edge_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?:^|-)L_(?P<mid>[A-Za-z0-9_]+)_\d+$").ok())
        .as_ref()
}

fn encoded_node_id<E: VisualElement>(element: &E) -> Option<NodeIdent> {
    if let Some(id) = element.attr("data-id").and_then(|id| NodeIdent::new(id.trim()).ok()) {
        return Some(id);
    }
    let rendered = element.attr("id")?;
    let captures = rendered_node_id_pattern()?.captures(rendered)?;
    NodeIdent::new(captures.name("id")?.as_str()).ok()
}

fn sequence_actor_id<E: VisualElement>(element: &E) -> Option<NodeIdent> {
    let is_actor = element
        .attr("class")
        .is_some_and(|class| class.split_whitespace().any(|c| c.starts_with("actor")));
    if !is_actor {
        return None;
    }
    element
        .attr("name")
        .or_else(|| element.text_content())
        .map(str::trim)
        .and_then(|name| NodeIdent::new(name).ok())
}

/// Node identifier for a rendered element, or `None` when it does not map to a node.
///
/// Tries the element's own encoded id, then its ancestors', then its text content when that is
/// a bare identifier, then sequence-diagram actor conventions.
pub fn extract_node_id<E: VisualElement>(element: &E) -> Option<NodeIdent> {
    encoded_node_id(element)
        .or_else(|| self_and_ancestors(element).skip(1).find_map(encoded_node_id))
        .or_else(|| {
            element
                .text_content()
                .map(str::trim)
                .filter(|text| is_node_ident(text))
                .and_then(|text| NodeIdent::new(text).ok())
        })
        .or_else(|| self_and_ancestors(element).find_map(sequence_actor_id))
}

/// Every endpoint pair an element's encoded id or classes can stand for.
fn encoded_edges<E: VisualElement>(element: &E) -> Vec<EdgeKey> {
    if let Some(rendered) = element.attr("id") {
        if let Some(captures) = dashed_edge_pattern().and_then(|regex| regex.captures(rendered)) {
            let source = captures.name("src").and_then(|m| NodeIdent::new(m.as_str()).ok());
            let target = captures.name("tgt").and_then(|m| NodeIdent::new(m.as_str()).ok());
            if let (Some(source), Some(target)) = (source, target) {
                return vec![EdgeKey::new(source, target)];
            }
        }
        if let Some(mid) = underscored_edge_pattern()
            .and_then(|regex| regex.captures(rendered))
            .and_then(|captures| captures.name("mid"))
        {
            // `L_a_b_c_0` splits into `a`/`b_c` or `a_b`/`c`.
            let mid = mid.as_str();
            let splits: Vec<EdgeKey> = mid
                .match_indices('_')
                .filter_map(|(at, _)| {
                    let source = NodeIdent::new(&mid[..at]).ok()?;
                    let target = NodeIdent::new(&mid[at + 1..]).ok()?;
                    Some(EdgeKey::new(source, target))
                })
                .collect();
            if !splits.is_empty() {
                return splits;
            }
        }
    }

    let Some(class) = element.attr("class") else {
        return Vec::new();
    };
    let source = class.split_whitespace().find_map(|c| c.strip_prefix("LS-"));
    let target = class.split_whitespace().find_map(|c| c.strip_prefix("LE-"));
    match (source.map(NodeIdent::new), target.map(NodeIdent::new)) {
        (Some(Ok(source)), Some(Ok(target))) => vec![EdgeKey::new(source, target)],
        _ => Vec::new(),
    }
}

/// Candidate endpoints for a rendered edge path/label (or a descendant of one), from the nearest
/// element that encodes an edge.
///
/// Underscore-joined ids are ambiguous when node ids contain `_`, so every split is returned in
/// order of the first separator; callers pick the one that exists in the source.
pub fn edge_candidates<E: VisualElement>(element: &E) -> Vec<EdgeKey> {
    self_and_ancestors(element)
        .map(encoded_edges)
        .find(|candidates| !candidates.is_empty())
        .unwrap_or_default()
}

/// Edge endpoints for a rendered edge path/label, when the encoding is unambiguous.
pub fn extract_edge_endpoints<E: VisualElement>(element: &E) -> Option<EdgeKey> {
    let mut candidates = edge_candidates(element);
    if candidates.len() == 1 {
        candidates.pop()
    } else {
        None
    }
}

/// Classifies a clicked element; edges are checked first because edge labels also carry text.
pub fn resolve_visual_target<E: VisualElement>(element: &E) -> Option<VisualTarget> {
    extract_edge_endpoints(element)
        .map(VisualTarget::Edge)
        .or_else(|| extract_node_id(element).map(VisualTarget::Node))
}
