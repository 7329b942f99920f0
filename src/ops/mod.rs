// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Structural edit operations on diagram source text.
//!
//! Every operation is a pure `(text, op) -> candidate text` transform. Committing a candidate
//! (validation, history, persistence) is the editor session's job.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;

use crate::format::mermaid::{
    body_indent, classify, classify_line, contains_word, indent_of, pipe_label,
    validate_node_ident, Connection, Dialect, MermaidIdentError, SourceLine,
};
use crate::locate::locate_edge;
use crate::model::{EdgeKey, NodeIdent, ShapeKind};

/// Definition for a node that an operation introduces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub kind: ShapeKind,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    CreateNode {
        id: String,
        kind: ShapeKind,
        label: String,
    },
    RetypeNode {
        id: NodeIdent,
        kind: ShapeKind,
    },
    RelabelNode {
        id: NodeIdent,
        label: String,
    },
    DeleteNode {
        id: NodeIdent,
    },
    /// An empty label removes labelling and leaves a bare arrow.
    RelabelEdge {
        edge: EdgeKey,
        label: String,
    },
    RerouteOrigin {
        edge: EdgeKey,
        new_source: NodeIdent,
        new_node: Option<NewNode>,
    },
    RerouteDestination {
        edge: EdgeKey,
        new_target: NodeIdent,
        new_node: Option<NewNode>,
    },
    DeleteEdge {
        edge: EdgeKey,
    },
    AddTransition {
        source: NodeIdent,
        target: NodeIdent,
        label: Option<String>,
    },
    /// Literal replace of exactly one occurrence of `find`.
    Patch {
        find: String,
        replace: String,
    },
}

impl EditOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateNode { .. } => "create_node",
            Self::RetypeNode { .. } => "retype_node",
            Self::RelabelNode { .. } => "relabel_node",
            Self::DeleteNode { .. } => "delete_node",
            Self::RelabelEdge { .. } => "relabel_edge",
            Self::RerouteOrigin { .. } => "reroute_origin",
            Self::RerouteDestination { .. } => "reroute_destination",
            Self::DeleteEdge { .. } => "delete_edge",
            Self::AddTransition { .. } => "add_transition",
            Self::Patch { .. } => "patch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    InvalidIdentifier { id: String, reason: MermaidIdentError },
    IdentifierConflict { id: String },
    NodeNotFound { id: NodeIdent },
    EdgeNotFound { edge: EdgeKey },
    MissingNodeDefinition { id: NodeIdent },
    AmbiguousPatch { count: usize },
    EmptyPatch,
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidIdentifier { id, reason } => {
                write!(f, "invalid node identifier '{id}': {reason}")
            }
            Self::IdentifierConflict { id } => {
                write!(f, "identifier '{id}' already exists in the diagram")
            }
            Self::NodeNotFound { id } => write!(f, "node not found in source (id={id})"),
            Self::EdgeNotFound { edge } => write!(f, "edge not found in source ({edge})"),
            Self::MissingNodeDefinition { id } => {
                write!(f, "node '{id}' does not exist yet; a definition for it is required")
            }
            Self::AmbiguousPatch { count } => {
                write!(f, "patch must match exactly one location (matched {count})")
            }
            Self::EmptyPatch => f.write_str("patch search text must not be empty"),
        }
    }
}

impl std::error::Error for EditError {}

/// Applies one operation, returning the full candidate text.
pub fn apply_edit(text: &str, op: &EditOp) -> Result<String, EditError> {
    match op {
        EditOp::CreateNode { id, kind, label } => create_node(text, id, *kind, label),
        EditOp::RetypeNode { id, kind } => retype_node(text, id, *kind),
        EditOp::RelabelNode { id, label } => relabel_node(text, id, label),
        EditOp::DeleteNode { id } => delete_node(text, id),
        EditOp::RelabelEdge { edge, label } => relabel_edge(text, edge, label),
        EditOp::RerouteOrigin { edge, new_source, new_node } => {
            reroute_edge(text, edge, Endpoint::Origin, new_source, new_node.as_ref())
        }
        EditOp::RerouteDestination { edge, new_target, new_node } => {
            reroute_edge(text, edge, Endpoint::Destination, new_target, new_node.as_ref())
        }
        EditOp::DeleteEdge { edge } => delete_edge(text, edge),
        EditOp::AddTransition { source, target, label } => {
            add_transition(text, source, target, label.as_deref())
        }
        EditOp::Patch { find, replace } => apply_patch(text, find, replace),
    }
}

/// Applies operations in order; the first failure aborts the batch.
pub fn apply_edits(text: &str, ops: &[EditOp]) -> Result<String, EditError> {
    ops.iter().try_fold(text.to_owned(), |current, op| apply_edit(&current, op))
}

// Extracted per-operation text transforms.
include!("ops_impl.rs");
