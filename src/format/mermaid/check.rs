// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use super::lines::{classify, Connection, Dialect, NodeToken, SourceLine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MermaidParseError {
    MissingDeclaration,
    InvalidDirection { line_no: usize, direction: String },
    UnsupportedSyntax { line_no: usize, line: String },
    InvalidNodeId { line_no: usize, name: String },
    InvalidNodeLabelSyntax { line_no: usize, token: String },
    EmptyNodeLabel { line_no: usize, token: String },
    EmptyEdgeLabel { line_no: usize, line: String },
    UnbalancedBlock { line_no: usize },
}

impl MermaidParseError {
    /// 1-based line the error refers to, when it has one.
    pub fn line_no(&self) -> Option<usize> {
        match self {
            Self::MissingDeclaration => None,
            Self::InvalidDirection { line_no, .. }
            | Self::UnsupportedSyntax { line_no, .. }
            | Self::InvalidNodeId { line_no, .. }
            | Self::InvalidNodeLabelSyntax { line_no, .. }
            | Self::EmptyNodeLabel { line_no, .. }
            | Self::EmptyEdgeLabel { line_no, .. }
            | Self::UnbalancedBlock { line_no } => Some(*line_no),
        }
    }
}

impl fmt::Display for MermaidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDeclaration => f.write_str(
                "expected a diagram declaration (e.g. 'flowchart TD') as the first statement",
            ),
            Self::InvalidDirection { line_no, direction } => write!(
                f,
                "invalid flowchart direction on line {line_no}: {direction} \
                 (expected TD/TB/LR/RL/BT)"
            ),
            Self::UnsupportedSyntax { line_no, line } => {
                write!(f, "unsupported Mermaid syntax on line {line_no}: {line}")
            }
            Self::InvalidNodeId { line_no, name } => {
                write!(f, "invalid node id on line {line_no}: {name}")
            }
            Self::InvalidNodeLabelSyntax { line_no, token } => write!(
                f,
                "invalid node label syntax on line {line_no}: {token} \
                 (unbalanced or unknown brackets)"
            ),
            Self::EmptyNodeLabel { line_no, token } => {
                write!(f, "empty node label on line {line_no}: {token}")
            }
            Self::EmptyEdgeLabel { line_no, line } => {
                write!(f, "empty edge label on line {line_no}: {line}")
            }
            Self::UnbalancedBlock { line_no } => {
                write!(f, "unbalanced block on line {line_no}: every block needs a matching 'end'")
            }
        }
    }
}

impl std::error::Error for MermaidParseError {}

const FLOWCHART_STATEMENTS: &[&str] =
    &["classDef", "class", "click", "linkStyle", "direction", "accTitle", "accDescr", "title"];

/// `(1-based line number, classified line, raw line)`.
type BodyLine<'a> = (usize, &'a SourceLine, &'a str);

const SEQUENCE_BLOCKS: &[&str] = &["loop", "alt", "opt", "par", "critical", "break", "rect", "box"];

/// Syntax-only check of a full diagram source, without rendering.
///
/// Deliberately permissive: flowcharts get the strictest treatment (the editing operations
/// produce them), state and sequence diagrams are checked for well-formed transitions and
/// balanced blocks, and every other declared dialect is accepted as-is.
pub fn check_source(input: &str) -> Result<Dialect, MermaidParseError> {
    let lines = classify(input);
    let Some((decl_idx, dialect)) = lines.iter().enumerate().find_map(|(idx, line)| match line {
        SourceLine::Declaration { dialect, .. } => Some((idx, *dialect)),
        _ => None,
    }) else {
        return Err(MermaidParseError::MissingDeclaration);
    };

    let raw_lines: Vec<&str> = input.lines().collect();
    let significant_before = lines[..decl_idx]
        .iter()
        .zip(&raw_lines)
        .any(|(line, raw)| {
            matches!(line, SourceLine::Connection(_) | SourceLine::NodeDef(_))
                && !raw.trim().is_empty()
        });
    if significant_before {
        return Err(MermaidParseError::MissingDeclaration);
    }

    let body: Vec<BodyLine<'_>> = lines
        .iter()
        .zip(raw_lines.iter().copied())
        .enumerate()
        .skip(decl_idx + 1)
        .map(|(idx, (line, raw))| (idx + 1, line, raw))
        .collect();
    match dialect {
        Dialect::Flowchart => {
            check_flowchart_declaration(raw_lines[decl_idx], decl_idx + 1)?;
            check_flowchart_body(&body)?;
        }
        Dialect::State => check_state_body(&body)?,
        Dialect::Sequence => check_sequence_body(&body)?,
        Dialect::Other => {}
    }
    Ok(dialect)
}

fn check_flowchart_declaration(raw: &str, line_no: usize) -> Result<(), MermaidParseError> {
    let mut parts = raw.trim().trim_end_matches(';').split_whitespace().skip(1);
    if let Some(direction) = parts.next() {
        if !matches!(direction, "TD" | "TB" | "LR" | "RL" | "BT") {
            return Err(MermaidParseError::InvalidDirection {
                line_no,
                direction: direction.to_owned(),
            });
        }
    }
    if parts.next().is_some() {
        return Err(MermaidParseError::UnsupportedSyntax { line_no, line: raw.trim().to_owned() });
    }
    Ok(())
}

fn check_flowchart_token(token: &NodeToken, line_no: usize) -> Result<(), MermaidParseError> {
    if token.id == "[*]" {
        return Err(MermaidParseError::InvalidNodeId { line_no, name: token.id.to_string() });
    }
    if token.shape.as_ref().is_some_and(|shape| shape.label.is_empty()) {
        return Err(MermaidParseError::EmptyNodeLabel { line_no, token: token.id.to_string() });
    }
    Ok(())
}

fn check_flowchart_connection(
    connection: &Connection,
    raw: &str,
    line_no: usize,
) -> Result<(), MermaidParseError> {
    for token in &connection.nodes {
        check_flowchart_token(token, line_no)?;
    }
    if connection.links.iter().any(|link| link.label.as_ref().is_some_and(|l| l.text.is_empty())) {
        return Err(MermaidParseError::EmptyEdgeLabel { line_no, line: raw.trim().to_owned() });
    }
    if connection.trailing.is_some() {
        return Err(MermaidParseError::UnsupportedSyntax { line_no, line: raw.trim().to_owned() });
    }
    Ok(())
}

fn check_flowchart_body(body: &[BodyLine<'_>]) -> Result<(), MermaidParseError> {
    let mut open_blocks: Vec<usize> = Vec::new();

    for &(line_no, line, raw) in body {
        match line {
            SourceLine::Blank | SourceLine::Comment | SourceLine::Declaration { .. } => {}
            SourceLine::NodeDef(token) => check_flowchart_token(token, line_no)?,
            SourceLine::Connection(connection) => {
                check_flowchart_connection(connection, raw, line_no)?
            }
            SourceLine::StyleDecl { target } => {
                if target.is_empty() {
                    return Err(MermaidParseError::UnsupportedSyntax {
                        line_no,
                        line: raw.trim().to_owned(),
                    });
                }
            }
            SourceLine::SubgraphStart { .. } => open_blocks.push(line_no),
            SourceLine::BlockEnd => {
                if open_blocks.pop().is_none() {
                    return Err(MermaidParseError::UnbalancedBlock { line_no });
                }
            }
            SourceLine::Other => {
                let trimmed = raw.trim();
                let keyword = trimmed.split_whitespace().next().unwrap_or_default();
                if FLOWCHART_STATEMENTS.contains(&keyword) {
                    continue;
                }
                if trimmed.contains(['[', '(', '{']) {
                    return Err(MermaidParseError::InvalidNodeLabelSyntax {
                        line_no,
                        token: trimmed.to_owned(),
                    });
                }
                return Err(MermaidParseError::UnsupportedSyntax {
                    line_no,
                    line: trimmed.to_owned(),
                });
            }
        }
    }

    match open_blocks.pop() {
        Some(line_no) => Err(MermaidParseError::UnbalancedBlock { line_no }),
        None => Ok(()),
    }
}

fn check_state_body(body: &[BodyLine<'_>]) -> Result<(), MermaidParseError> {
    let mut open_blocks: Vec<usize> = Vec::new();

    for &(line_no, line, raw) in body {
        let trimmed = raw.trim();
        match line {
            SourceLine::NodeDef(token) if token.shape.is_some() => {
                return Err(MermaidParseError::UnsupportedSyntax {
                    line_no,
                    line: trimmed.to_owned(),
                });
            }
            SourceLine::Connection(connection) => {
                if connection.nodes.iter().any(|token| token.shape.is_some()) {
                    return Err(MermaidParseError::UnsupportedSyntax {
                        line_no,
                        line: trimmed.to_owned(),
                    });
                }
            }
            _ if trimmed.ends_with('{') => open_blocks.push(line_no),
            _ if trimmed == "}" => {
                if open_blocks.pop().is_none() {
                    return Err(MermaidParseError::UnbalancedBlock { line_no });
                }
            }
            _ => {}
        }
    }

    match open_blocks.pop() {
        Some(line_no) => Err(MermaidParseError::UnbalancedBlock { line_no }),
        None => Ok(()),
    }
}

fn check_sequence_body(body: &[BodyLine<'_>]) -> Result<(), MermaidParseError> {
    let mut open_blocks: Vec<usize> = Vec::new();

    for &(line_no, line, raw) in body {
        let keyword = raw.split_whitespace().next().unwrap_or_default();
        if SEQUENCE_BLOCKS.contains(&keyword) {
            open_blocks.push(line_no);
        } else if matches!(line, SourceLine::BlockEnd) && open_blocks.pop().is_none() {
            return Err(MermaidParseError::UnbalancedBlock { line_no });
        }
    }

    match open_blocks.pop() {
        Some(line_no) => Err(MermaidParseError::UnbalancedBlock { line_no }),
        None => Ok(()),
    }
}
