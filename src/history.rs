// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Bounded undo/redo history of full-source snapshots.

use std::collections::VecDeque;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Snapshots oldest-first; the last entry is the current text.
///
/// The stack never drops below one entry (the initial load), so undo at size 1 is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStack {
    snapshots: VecDeque<String>,
    redo: Vec<String>,
    limit: usize,
}

impl HistoryStack {
    pub fn new(initial: impl Into<String>, limit: usize) -> Self {
        let mut snapshots = VecDeque::new();
        snapshots.push_back(initial.into());
        Self { snapshots, redo: Vec::new(), limit: limit.max(1) }
    }

    pub fn current(&self) -> &str {
        self.snapshots.back().map(String::as_str).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn can_undo(&self) -> bool {
        self.snapshots.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Records a new current text and clears redo. Pushing the current text again is a no-op.
    pub fn push(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text == self.current() {
            return false;
        }
        self.snapshots.push_back(text);
        self.redo.clear();
        while self.snapshots.len() > self.limit {
            self.snapshots.pop_front();
        }
        true
    }

    pub fn undo(&mut self) -> Option<&str> {
        if !self.can_undo() {
            return None;
        }
        let undone = self.snapshots.pop_back()?;
        self.redo.push(undone);
        Some(self.current())
    }

    pub fn redo(&mut self) -> Option<&str> {
        let text = self.redo.pop()?;
        self.snapshots.push_back(text);
        Some(self.current())
    }

    /// Drops all history and starts over from `initial`.
    pub fn reset(&mut self, initial: impl Into<String>) {
        self.snapshots.clear();
        self.snapshots.push_back(initial.into());
        self.redo.clear();
    }
}
