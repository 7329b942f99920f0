// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Mermaid-ish line classification and syntax checking.

pub mod check;
mod ident;
pub mod lines;

pub use check::{check_source, MermaidParseError};
pub use ident::{
    contains_word, is_node_ident, validate_node_ident, word_positions, MermaidIdentError,
};
pub use lines::{
    body_indent, classify, classify_line, indent_of, pipe_label, Connection, Dialect, EdgeLabel,
    LabelSyntax, Link, NodeShape, NodeToken, SourceLine, TrailingLabel,
};
