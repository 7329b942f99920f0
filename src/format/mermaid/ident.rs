// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MermaidIdentError {
    Empty,
    LeadingDigit,
    InvalidChar { ch: char },
}

impl fmt::Display for MermaidIdentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("must not be empty"),
            Self::LeadingDigit => f.write_str("must not start with a digit"),
            Self::InvalidChar { ch } => write!(f, "contains invalid character: '{ch}'"),
        }
    }
}

impl std::error::Error for MermaidIdentError {}

pub(crate) fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Node identifiers follow `^[A-Za-z_][A-Za-z0-9_]*$`.
pub fn validate_node_ident(ident: &str) -> Result<(), MermaidIdentError> {
    let Some(first) = ident.chars().next() else {
        return Err(MermaidIdentError::Empty);
    };
    if first.is_ascii_digit() {
        return Err(MermaidIdentError::LeadingDigit);
    }
    if let Some(ch) = ident.chars().find(|c| !is_ident_char(*c)) {
        return Err(MermaidIdentError::InvalidChar { ch });
    }
    Ok(())
}

pub fn is_node_ident(ident: &str) -> bool {
    validate_node_ident(ident).is_ok()
}

/// Byte offsets of every word-bounded occurrence of `word` in `haystack`.
///
/// A boundary is any position not adjacent to `[A-Za-z0-9_]`, which matches regex `\b` for
/// identifier-shaped words.
pub fn word_positions(haystack: &str, word: &str) -> Vec<usize> {
    if word.is_empty() {
        return Vec::new();
    }
    haystack
        .match_indices(word)
        .filter(|(start, _)| {
            let before = haystack[..*start].chars().next_back();
            let after = haystack[start + word.len()..].chars().next();
            !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
        })
        .map(|(start, _)| start)
        .collect()
}

pub fn contains_word(haystack: &str, word: &str) -> bool {
    !word_positions(haystack, word).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_identifier_shape() {
        assert_eq!(validate_node_ident("Start_1"), Ok(()));
        assert_eq!(validate_node_ident("_x"), Ok(()));
        assert_eq!(validate_node_ident(""), Err(MermaidIdentError::Empty));
        assert_eq!(validate_node_ident("1a"), Err(MermaidIdentError::LeadingDigit));
        assert_eq!(validate_node_ident("a-b"), Err(MermaidIdentError::InvalidChar { ch: '-' }));
    }

    #[test]
    fn word_positions_respect_identifier_boundaries() {
        assert_eq!(word_positions("A --> AB --> A", "A"), vec![0, 13]);
        assert_eq!(word_positions("style A_1 fill", "A"), Vec::<usize>::new());
        assert!(contains_word("B[Go to A]", "A"));
        assert!(!contains_word("flowchart TD", "T"));
    }
}
