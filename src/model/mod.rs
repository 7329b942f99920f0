// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! A [`DiagramSource`] holds the authoritative text; [`NodeRef`]/[`EdgeRef`] are derived from it.

pub mod ids;
pub mod refs;
pub mod source;

pub use ids::{DiagramId, Id, IdError, ProjectId, SessionId};
pub use refs::{
    escape_label, unescape_label, EdgeKey, EdgeRef, NodeIdent, NodeRef, ParseShapeKindError,
    ShapeKind,
};
pub use source::{derive_edges, derive_nodes, DiagramSource};
