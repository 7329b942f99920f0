// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Halimede: source/visual synchronization for collaborative Mermaid diagram editors.
//!
//! - [`locate`] maps identifiers to source lines and rendered elements to identifiers.
//! - [`ops`] performs structural edits as pure text transforms; [`validate`] gates them.
//! - [`interaction`] drives multi-click edits; [`history`] keeps undo/redo snapshots.
//! - [`format`] canonicalizes flowchart sources.
//! - [`sync`] keeps a live channel to the backend; [`api`] talks to the document store.
//! - [`session::EditorSession`] ties all of the above to one open diagram.

pub mod api;
pub mod config;
pub mod format;
pub mod history;
pub mod interaction;
pub mod locate;
pub mod model;
pub mod ops;
pub mod session;
pub mod sync;
pub mod validate;

pub use session::{EditorError, EditorSession};
