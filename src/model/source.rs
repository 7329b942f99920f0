// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::format::mermaid::{classify, SourceLine};

use super::ids::DiagramId;
use super::refs::{EdgeRef, NodeIdent, NodeRef, ShapeKind};

/// The full authoritative text of one diagram, as loaded into an editor session.
///
/// Nodes and edges are never stored; they are derived from `text` on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramSource {
    id: DiagramId,
    text: String,
    last_modified_ms: u64,
}

impl DiagramSource {
    pub fn new(id: DiagramId, text: impl Into<String>) -> Self {
        Self { id, text: text.into(), last_modified_ms: now_ms() }
    }

    pub fn id(&self) -> &DiagramId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn last_modified_ms(&self) -> u64 {
        self.last_modified_ms
    }

    /// Full-text replace; advances `last_modified_ms` monotonically.
    pub fn replace_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.last_modified_ms = now_ms().max(self.last_modified_ms + 1);
    }

    pub fn nodes(&self) -> Vec<NodeRef> {
        derive_nodes(&self.text)
    }

    pub fn edges(&self) -> Vec<EdgeRef> {
        derive_edges(&self.text)
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Nodes in order of first mention. The first shape definition wins; a node that is only ever
/// mentioned bare is reported as an `action` labelled with its own id.
pub fn derive_nodes(text: &str) -> Vec<NodeRef> {
    let mut nodes: Vec<NodeRef> = Vec::new();
    let mut defined: Vec<bool> = Vec::new();
    let mut index: HashMap<NodeIdent, usize> = HashMap::new();

    for (line_idx, line) in classify(text).iter().enumerate() {
        for token in line.node_tokens() {
            let Ok(id) = NodeIdent::new(&token.id) else {
                continue;
            };
            match (index.get(&id).copied(), &token.shape) {
                (None, shape) => {
                    let (label, shape_kind) = match shape {
                        Some(shape) => (shape.label.clone(), shape.kind),
                        None => (id.to_string(), ShapeKind::Action),
                    };
                    index.insert(id.clone(), nodes.len());
                    defined.push(shape.is_some());
                    nodes.push(NodeRef { id, label, shape_kind, source_line: line_idx });
                }
                (Some(pos), Some(shape)) if !defined[pos] => {
                    let node = &mut nodes[pos];
                    node.label = shape.label.clone();
                    node.shape_kind = shape.kind;
                    node.source_line = line_idx;
                    defined[pos] = true;
                }
                _ => {}
            }
        }
    }

    nodes
}

/// Every edge in line order; chained connections yield one edge per link.
pub fn derive_edges(text: &str) -> Vec<EdgeRef> {
    let mut edges = Vec::new();
    for (line_idx, line) in classify(text).iter().enumerate() {
        let SourceLine::Connection(connection) = line else {
            continue;
        };
        for (link_idx, source, target) in connection.edges() {
            let (Ok(source_node_id), Ok(target_node_id)) =
                (NodeIdent::new(source), NodeIdent::new(target))
            else {
                continue;
            };
            edges.push(EdgeRef {
                source_node_id,
                target_node_id,
                label: connection.label(link_idx).map(str::to_owned),
                source_line: line_idx,
            });
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "flowchart TD\n    A --> B\n    A[Start] -->|go| C{\"Check\"}\n    B[\"Dup\"]\n    B[Again]\n";

    #[test]
    fn nodes_prefer_first_definition_over_bare_mentions() {
        let nodes = derive_nodes(SAMPLE);
        let summary: Vec<_> = nodes
            .iter()
            .map(|n| (n.id.as_str(), n.label.as_str(), n.shape_kind, n.source_line))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("A", "Start", ShapeKind::Action, 2),
                ("B", "Dup", ShapeKind::Action, 3),
                ("C", "Check", ShapeKind::Decision, 2),
            ]
        );
    }

    #[test]
    fn edges_carry_labels_and_lines() {
        let edges = derive_edges(SAMPLE);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[1].source_node_id.as_str(), "A");
        assert_eq!(edges[1].target_node_id.as_str(), "C");
        assert_eq!(edges[1].label.as_deref(), Some("go"));
        assert_eq!(edges[1].source_line, 2);
    }

    #[test]
    fn state_pseudo_nodes_are_not_reported() {
        let text = "stateDiagram-v2\n    [*] --> Idle\n    Idle --> [*]\n";
        let nodes = derive_nodes(text);
        assert_eq!(nodes.len(), 1);
        assert!(derive_edges(text).is_empty());
    }

    #[test]
    fn replace_text_advances_last_modified() {
        let id: DiagramId = "d1".parse().expect("diagram id");
        let mut source = DiagramSource::new(id, "flowchart TD\n");
        let before = source.last_modified_ms();
        source.replace_text("flowchart LR\n");
        assert!(source.last_modified_ms() > before);
        assert_eq!(source.text(), "flowchart LR\n");
    }
}
