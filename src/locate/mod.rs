// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Mapping between logical node/edge identifiers and source lines.
//!
//! `locate_node` tries a fixed list of syntactic patterns in order; for each pattern every line is
//! scanned, and the first pattern that matches anywhere wins. Repeated calls on unchanged text
//! therefore always return the same line, which the edit operations rely on.

pub mod visual;

use std::sync::OnceLock;

use regex::Regex;

use crate::format::mermaid::{classify, word_positions, SourceLine};

pub use visual::{
    edge_candidates, extract_edge_endpoints, extract_node_id, resolve_visual_target,
    ElementSnapshot, VisualElement, VisualTarget,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLocation {
    /// 0-based index into `text.lines()`.
    pub line: usize,
    /// Byte offset of the identifier within the line.
    pub column: usize,
    pub line_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeLocation {
    pub line: usize,
    pub line_text: String,
    /// Index of the matching link on a classified connection line; `None` when the line was only
    /// found by the word scan (e.g. sequence messages).
    pub link: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodePattern {
    StandaloneDefinition,
    OutgoingConnection,
    IncomingConnection,
    ParticipantDeclaration,
    StateDeclaration,
    SubgraphDeclaration,
    FirstMention,
}

const NODE_PATTERNS: [NodePattern; 7] = [
    NodePattern::StandaloneDefinition,
    NodePattern::OutgoingConnection,
    NodePattern::IncomingConnection,
    NodePattern::ParticipantDeclaration,
    NodePattern::StateDeclaration,
    NodePattern::SubgraphDeclaration,
    NodePattern::FirstMention,
];

fn participant_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^\s*(?:participant|actor)\s+(?P<id>[A-Za-z_][A-Za-z0-9_]*)\b").ok()
        })
        .as_ref()
}

fn state_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r#"^\s*state\s+"[^"]*"\s+as\s+(?P<id>[A-Za-z_][A-Za-z0-9_]*)\b"#,
            r"^\s*state\s+(?P<id>[A-Za-z_][A-Za-z0-9_]*)\b",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

fn subgraph_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\s*subgraph\s+(?P<id>[A-Za-z_][A-Za-z0-9_]*)\b").ok())
        .as_ref()
}

fn declared_id_column(regex: &Regex, line: &str, id: &str) -> Option<usize> {
    let captures = regex.captures(line)?;
    let found = captures.name("id")?;
    (found.as_str() == id).then_some(found.start())
}

/// Resolves a node identifier to the line that "is" that node.
pub fn locate_node(text: &str, id: &str) -> Option<NodeLocation> {
    if id.is_empty() {
        return None;
    }
    let raw_lines: Vec<&str> = text.lines().collect();
    let classified = classify(text);

    NODE_PATTERNS.iter().find_map(|pattern| {
        raw_lines.iter().zip(&classified).enumerate().find_map(|(idx, (raw, line))| {
            let column = match_node_pattern(*pattern, raw, line, id)?;
            Some(NodeLocation { line: idx, column, line_text: (*raw).to_owned() })
        })
    })
}

fn match_node_pattern(
    pattern: NodePattern,
    raw: &str,
    line: &SourceLine,
    id: &str,
) -> Option<usize> {
    match pattern {
        NodePattern::StandaloneDefinition => match line {
            SourceLine::NodeDef(token) if token.id == id => Some(token.id_span.start),
            _ => None,
        },
        NodePattern::OutgoingConnection | NodePattern::IncomingConnection => {
            let SourceLine::Connection(connection) = line else {
                return None;
            };
            let outgoing = pattern == NodePattern::OutgoingConnection;
            connection.edges().find_map(|(idx, source, target)| {
                let (source_idx, target_idx) = connection.endpoint_indices(idx);
                match (outgoing, source == id, target == id) {
                    (true, true, _) => Some(connection.nodes[source_idx].id_span.start),
                    (false, _, true) => Some(connection.nodes[target_idx].id_span.start),
                    _ => None,
                }
            })
        }
        NodePattern::ParticipantDeclaration => {
            declared_id_column(participant_pattern()?, raw, id)
        }
        NodePattern::StateDeclaration => {
            state_patterns().iter().find_map(|regex| declared_id_column(regex, raw, id))
        }
        NodePattern::SubgraphDeclaration => declared_id_column(subgraph_pattern()?, raw, id),
        NodePattern::FirstMention => match line {
            SourceLine::Declaration { .. } | SourceLine::Comment => None,
            _ => word_positions(raw, id).first().copied(),
        },
    }
}

/// Resolves the first line carrying an edge from `source` to `target`.
pub fn locate_edge(text: &str, source: &str, target: &str) -> Option<EdgeLocation> {
    let raw_lines: Vec<&str> = text.lines().collect();
    let classified = classify(text);

    let classified_match = classified.iter().enumerate().find_map(|(idx, line)| {
        let SourceLine::Connection(connection) = line else {
            return None;
        };
        let link = connection.link_between(source, target)?;
        Some(EdgeLocation { line: idx, line_text: raw_lines[idx].to_owned(), link: Some(link) })
    });
    if classified_match.is_some() {
        return classified_match;
    }

    raw_lines.iter().zip(&classified).enumerate().find_map(|(idx, (raw, line))| {
        if matches!(line, SourceLine::Declaration { .. } | SourceLine::Comment) {
            return None;
        }
        let has_arrow = raw.contains("->") || raw.contains("--") || raw.contains("==");
        let source_at = *word_positions(raw, source).first()?;
        let target_at = word_positions(raw, target).into_iter().find(|at| *at > source_at)?;
        (has_arrow && source_at < target_at).then(|| EdgeLocation {
            line: idx,
            line_text: (*raw).to_owned(),
            link: None,
        })
    })
}
