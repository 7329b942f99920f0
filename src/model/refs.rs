// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use crate::format::mermaid::{validate_node_ident, MermaidIdentError};

/// A validated node identifier token (`^[A-Za-z_][A-Za-z0-9_]*$`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdent(SmolStr);

impl NodeIdent {
    pub fn new(value: &str) -> Result<Self, MermaidIdentError> {
        validate_node_ident(value)?;
        Ok(Self(SmolStr::new(value)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for NodeIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for NodeIdent {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for NodeIdent {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for NodeIdent {
    type Err = MermaidIdentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Visual kind of a node; each kind maps to one Mermaid bracket syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    Terminal,
    State,
    Decision,
    Action,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 4] = [Self::Terminal, Self::State, Self::Decision, Self::Action];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Terminal => "terminal",
            Self::State => "state",
            Self::Decision => "decision",
            Self::Action => "action",
        }
    }

    pub fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            Self::Terminal => ("([", "])"),
            Self::State => ("((", "))"),
            Self::Decision => ("{", "}"),
            Self::Action => ("[", "]"),
        }
    }

    /// Renders `id` plus the quoted label in this kind's bracket syntax, e.g. `C{"Check"}`.
    pub fn definition(self, id: &str, label: &str) -> String {
        let (open, close) = self.delimiters();
        format!("{id}{open}\"{}\"{close}", escape_label(label))
    }

    pub fn style_attrs(self) -> &'static str {
        match self {
            Self::Terminal => "fill:#e8f5e9,stroke:#2e7d32,stroke-width:2px",
            Self::State => "fill:#e3f2fd,stroke:#1565c0,stroke-width:2px",
            Self::Decision => "fill:#fff3e0,stroke:#ef6c00,stroke-width:2px",
            Self::Action => "fill:#f3e5f5,stroke:#6a1b9a,stroke-width:1px",
        }
    }

    pub fn style_line(self, id: &str) -> String {
        format!("style {id} {}", self.style_attrs())
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseShapeKindError {
    value: String,
}

impl fmt::Display for ParseShapeKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown shape kind '{}' (expected terminal, state, decision or action)",
            self.value
        )
    }
}

impl std::error::Error for ParseShapeKindError {}

impl FromStr for ShapeKind {
    type Err = ParseShapeKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseShapeKindError { value: s.to_owned() })
    }
}

/// Mermaid has no backslash escapes inside quoted labels; `#quot;` is its entity for `"`.
pub fn escape_label(label: &str) -> String {
    label.replace('"', "#quot;")
}

pub fn unescape_label(label: &str) -> String {
    label.replace("#quot;", "\"")
}

/// A node as derived from the current source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub id: NodeIdent,
    pub label: String,
    pub shape_kind: ShapeKind,
    /// 0-based index of the line that first defines (or, failing that, mentions) the node.
    pub source_line: usize,
}

/// An edge as derived from the current source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRef {
    pub source_node_id: NodeIdent,
    pub target_node_id: NodeIdent,
    pub label: Option<String>,
    pub source_line: usize,
}

/// Endpoints identifying an on-screen edge; operations act on the first matching line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub source: NodeIdent,
    pub target: NodeIdent,
}

impl EdgeKey {
    pub fn new(source: NodeIdent, target: NodeIdent) -> Self {
        Self { source, target }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --> {}", self.source, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_kinds_render_their_bracket_syntax() {
        assert_eq!(ShapeKind::Terminal.definition("A", "Start"), r#"A(["Start"])"#);
        assert_eq!(ShapeKind::State.definition("S", "Idle"), r#"S(("Idle"))"#);
        assert_eq!(ShapeKind::Decision.definition("C", "Check"), r#"C{"Check"}"#);
        assert_eq!(ShapeKind::Action.definition("D", "Do"), r#"D["Do"]"#);
    }

    #[test]
    fn labels_with_quotes_round_trip_through_entities() {
        let rendered = ShapeKind::Action.definition("A", r#"say "hi""#);
        assert_eq!(rendered, r#"A["say #quot;hi#quot;"]"#);
        assert_eq!(unescape_label("say #quot;hi#quot;"), r#"say "hi""#);
    }

    #[test]
    fn shape_kind_parses_case_insensitively() {
        assert_eq!("Decision".parse::<ShapeKind>(), Ok(ShapeKind::Decision));
        assert!("hexagon".parse::<ShapeKind>().is_err());
    }

    #[test]
    fn node_ident_rejects_invalid_tokens() {
        assert!(NodeIdent::new("Check_1").is_ok());
        assert!(NodeIdent::new("9lives").is_err());
        assert!(NodeIdent::new("a b").is_err());
    }
}
