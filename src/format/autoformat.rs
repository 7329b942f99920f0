// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Canonical re-layout of flowchart sources.
//!
//! Output order is: preamble, declaration, comments, node definitions, connections, subgraph
//! blocks, other statements, styles. Nodes and connections are ordered by BFS level from an
//! inferred root, then by identifier. Formatting its own output is a no-op.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use smol_str::SmolStr;

use crate::model::ShapeKind;

use super::mermaid::{classify, pipe_label, Connection, Dialect, SourceLine};

const INDENT: &str = "    ";

pub const NODES_MARKER: &str = "%% Node Definitions";
pub const CONNECTIONS_MARKER: &str = "%% Connections";
pub const SUBGRAPHS_MARKER: &str = "%% Subgraphs";
pub const OTHER_MARKER: &str = "%% Other";
pub const STYLES_MARKER: &str = "%% Styles";

const MARKERS: [&str; 5] =
    [NODES_MARKER, CONNECTIONS_MARKER, SUBGRAPHS_MARKER, OTHER_MARKER, STYLES_MARKER];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    MissingDeclaration,
    UnsupportedDialect { keyword: String },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDeclaration => f.write_str("cannot format: no diagram declaration found"),
            Self::UnsupportedDialect { keyword } => {
                write!(f, "cannot format '{keyword}' diagrams (only flowchart/graph)")
            }
        }
    }
}

impl std::error::Error for FormatError {}

/// One link of a (possibly chained) connection, oriented source → target.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SingleEdge {
    source: SmolStr,
    target: SmolStr,
    op: String,
    label: Option<String>,
    trailing: Option<String>,
}

impl SingleEdge {
    fn render(&self) -> String {
        let mut out = format!("{} {}", self.source, self.op);
        if let Some(label) = &self.label {
            out.push_str(&pipe_label(label));
        }
        out.push(' ');
        out.push_str(&self.target);
        if let Some(trailing) = &self.trailing {
            out.push_str(" : ");
            out.push_str(trailing);
        }
        out
    }
}

#[derive(Debug, Clone)]
struct NodeEntry {
    id: SmolStr,
    /// `None` for a node that is only ever written bare on its own line.
    shape: Option<(ShapeKind, String)>,
}

#[derive(Debug, Default)]
struct Buckets {
    preamble: Vec<String>,
    declaration: String,
    comments: Vec<String>,
    edges: Vec<SingleEdge>,
    subgraphs: Vec<Vec<String>>,
    other: Vec<String>,
    nodes: Vec<NodeEntry>,
    node_index: HashMap<SmolStr, usize>,
}

impl Buckets {
    fn harvest_shape(
        &mut self,
        id: &SmolStr,
        shape: Option<(ShapeKind, String)>,
        standalone: bool,
    ) {
        match self.node_index.get(id).copied() {
            Some(pos) => {
                if self.nodes[pos].shape.is_none() && shape.is_some() {
                    self.nodes[pos].shape = shape;
                }
            }
            None if shape.is_some() || standalone => {
                self.node_index.insert(id.clone(), self.nodes.len());
                self.nodes.push(NodeEntry { id: id.clone(), shape });
            }
            None => {}
        }
    }

    fn push_connection(&mut self, connection: &Connection) {
        for token in &connection.nodes {
            let shape = token.shape.as_ref().map(|shape| (shape.kind, shape.label.clone()));
            self.harvest_shape(&token.id, shape, false);
        }
        for (idx, source, target) in connection.edges() {
            let link = &connection.links[idx];
            let trailing = (connection.links.len() == 1)
                .then(|| connection.trailing.as_ref().map(|t| t.text.clone()))
                .flatten();
            self.edges.push(SingleEdge {
                source: SmolStr::new(source),
                target: SmolStr::new(target),
                op: link.op.clone(),
                label: link.label.as_ref().map(|label| label.text.clone()),
                trailing,
            });
        }
    }
}

/// Rewrites a flowchart source into its canonical layout.
pub fn autoformat(text: &str) -> Result<String, FormatError> {
    let buckets = collect_buckets(text)?;
    let levels = assign_levels(&buckets);
    Ok(render(&buckets, &levels))
}

fn collect_buckets(text: &str) -> Result<Buckets, FormatError> {
    let classified = classify(text);
    let raw_lines: Vec<&str> = text.lines().collect();

    let Some(decl_idx) =
        classified.iter().position(|line| matches!(line, SourceLine::Declaration { .. }))
    else {
        return Err(FormatError::MissingDeclaration);
    };
    if let SourceLine::Declaration { keyword, dialect } = &classified[decl_idx] {
        if *dialect != Dialect::Flowchart {
            return Err(FormatError::UnsupportedDialect { keyword: keyword.clone() });
        }
    }

    let mut buckets = Buckets {
        declaration: raw_lines[decl_idx].trim().to_owned(),
        ..Buckets::default()
    };
    buckets.preamble = raw_lines[..decl_idx]
        .iter()
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| raw.trim_end().to_owned())
        .collect();

    let mut block: Option<(usize, Vec<String>)> = None;
    for (raw, line) in raw_lines.iter().zip(&classified).skip(decl_idx + 1) {
        if let Some((depth, lines)) = block.as_mut() {
            lines.push(raw.trim_end().to_owned());
            match line {
                SourceLine::SubgraphStart { .. } => *depth += 1,
                SourceLine::BlockEnd => *depth -= 1,
                _ => {}
            }
            if *depth == 0 {
                if let Some((_, lines)) = block.take() {
                    buckets.subgraphs.push(lines);
                }
            }
            continue;
        }

        match line {
            SourceLine::Blank | SourceLine::StyleDecl { .. } | SourceLine::Declaration { .. } => {}
            SourceLine::Comment => {
                let comment = raw.trim();
                if !MARKERS.contains(&comment) {
                    buckets.comments.push(comment.to_owned());
                }
            }
            SourceLine::NodeDef(token) => {
                let shape = token.shape.as_ref().map(|shape| (shape.kind, shape.label.clone()));
                buckets.harvest_shape(&token.id, shape, true);
            }
            SourceLine::Connection(connection) => buckets.push_connection(connection),
            SourceLine::SubgraphStart { .. } => {
                block = Some((1, vec![raw.trim_end().to_owned()]));
            }
            SourceLine::BlockEnd | SourceLine::Other => buckets.other.push(raw.trim().to_owned()),
        }
    }
    // An unterminated block is still carried through.
    if let Some((_, lines)) = block {
        buckets.subgraphs.push(lines);
    }

    Ok(buckets)
}

fn assign_levels(buckets: &Buckets) -> HashMap<SmolStr, usize> {
    let mut discovery: Vec<SmolStr> = Vec::new();
    let mut seen: HashSet<SmolStr> = HashSet::new();
    let mut adjacency: HashMap<SmolStr, Vec<SmolStr>> = HashMap::new();
    let mut has_incoming: HashSet<SmolStr> = HashSet::new();

    for edge in &buckets.edges {
        for id in [&edge.source, &edge.target] {
            if seen.insert(id.clone()) {
                discovery.push(id.clone());
            }
        }
        adjacency.entry(edge.source.clone()).or_default().push(edge.target.clone());
        if edge.source != edge.target {
            has_incoming.insert(edge.target.clone());
        }
    }
    for node in &buckets.nodes {
        if seen.insert(node.id.clone()) {
            discovery.push(node.id.clone());
        }
    }

    let out_degree = |id: &SmolStr| adjacency.get(id).map_or(0, Vec::len);
    let candidates: Vec<&SmolStr> = discovery
        .iter()
        .filter(|id| out_degree(id) > 0 && !has_incoming.contains(*id))
        .collect();
    let root = candidates
        .iter()
        .find(|id| id.eq_ignore_ascii_case("root"))
        .or_else(|| {
            // `max_by_key` keeps the last maximum; the earliest discovered should win ties.
            candidates.iter().rev().max_by_key(|id| out_degree(id))
        })
        .copied()
        .or_else(|| buckets.edges.first().map(|edge| &edge.source));

    let mut levels: HashMap<SmolStr, usize> = HashMap::new();
    if let Some(root) = root {
        let mut queue = VecDeque::from([root.clone()]);
        levels.insert(root.clone(), 0);
        while let Some(id) = queue.pop_front() {
            let next_level = levels[&id] + 1;
            for target in adjacency.get(&id).into_iter().flatten() {
                if !levels.contains_key(target) {
                    levels.insert(target.clone(), next_level);
                    queue.push_back(target.clone());
                }
            }
        }
    }

    let unreached = levels.values().max().map_or(0, |max| max + 1);
    for id in discovery {
        levels.entry(id).or_insert(unreached);
    }
    levels
}

fn render(buckets: &Buckets, levels: &HashMap<SmolStr, usize>) -> String {
    let level_of = |id: &SmolStr| levels.get(id).copied().unwrap_or(usize::MAX);

    let mut nodes: Vec<&NodeEntry> = buckets.nodes.iter().collect();
    nodes.sort_by(|a, b| (level_of(&a.id), &a.id).cmp(&(level_of(&b.id), &b.id)));

    let mut edges: Vec<&SingleEdge> = buckets.edges.iter().collect();
    edges.sort_by(|a, b| (level_of(&a.source), &a.source).cmp(&(level_of(&b.source), &b.source)));

    let definitions: Vec<String> = nodes
        .iter()
        .map(|node| match &node.shape {
            Some((kind, label)) => kind.definition(&node.id, label),
            None => node.id.to_string(),
        })
        .collect();
    let styles: Vec<String> = nodes
        .iter()
        .filter_map(|node| node.shape.as_ref().map(|(kind, _)| kind.style_line(&node.id)))
        .collect();
    let connections: Vec<String> = edges.iter().map(|edge| edge.render()).collect();

    let mut out = String::new();
    for line in &buckets.preamble {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&buckets.declaration);
    out.push('\n');
    for comment in &buckets.comments {
        out.push_str(INDENT);
        out.push_str(comment);
        out.push('\n');
    }

    push_section(&mut out, NODES_MARKER, &definitions);
    push_section(&mut out, CONNECTIONS_MARKER, &connections);
    if !buckets.subgraphs.is_empty() {
        out.push('\n');
        out.push_str(INDENT);
        out.push_str(SUBGRAPHS_MARKER);
        out.push('\n');
        for line in buckets.subgraphs.iter().flatten() {
            out.push_str(line);
            out.push('\n');
        }
    }
    push_section(&mut out, OTHER_MARKER, &buckets.other);
    push_section(&mut out, STYLES_MARKER, &styles);
    out
}

fn push_section(out: &mut String, marker: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    out.push('\n');
    out.push_str(INDENT);
    out.push_str(marker);
    out.push('\n');
    for line in lines {
        out.push_str(INDENT);
        out.push_str(line);
        out.push('\n');
    }
}
