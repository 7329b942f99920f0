// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The editor state for one open diagram.
//!
//! An [`EditorSession`] owns the authoritative [`DiagramSource`] together with its undo history,
//! interaction mode and debounce timers. Every structural change flows through
//! [`EditorSession::apply`] (or [`EditorSession::format`]): candidate text, validation gate, then a
//! full-text commit that pushes history and arms autosave and preview refresh.
//!
//! Edits are serialized by `&mut self`. A pending edit is cancelled by dropping its future; the
//! commit only happens after validation resolves, so a dropped edit leaves no trace.

use std::fmt;

use tracing::{debug, info, warn};

use crate::api::{ApiError, DiagramStore, PatchSpec, ServerMessage};
use crate::config::EditorConfig;
use crate::format::{autoformat, FormatError};
use crate::history::HistoryStack;
use crate::interaction::{InteractionMode, InteractionModeMachine, ModeError};
use crate::locate::{
    edge_candidates, extract_node_id, locate_edge, locate_node, EdgeLocation, NodeLocation,
    VisualElement,
};
use crate::model::{DiagramId, DiagramSource, EdgeKey, NodeIdent};
use crate::ops::{apply_edit, EditError, EditOp};
use crate::sync::{Debounce, SharedSyncState};
use crate::validate::{ValidationGate, Validator, Verdict};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// The candidate failed to parse; nothing changed. `line` is 1-based.
    Validation { message: String, line: Option<usize> },
    /// A validation or persistence call failed to complete.
    Network { message: String },
    IdentifierConflict { id: String },
    NotFound { what: String },
    AmbiguousPatch { count: usize },
    /// Another interaction mode is active.
    Busy { active: &'static str },
    Format(FormatError),
    Edit(EditError),
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { message, line: Some(line) } => write!(f, "line {line}: {message}"),
            Self::Validation { message, line: None } => f.write_str(message),
            Self::Network { message } => write!(f, "network error: {message}"),
            Self::IdentifierConflict { id } => {
                write!(f, "a node named '{id}' already exists")
            }
            Self::NotFound { what } => write!(f, "{what} not found in source"),
            Self::AmbiguousPatch { count } => {
                write!(f, "patch must match exactly one location (matched {count})")
            }
            Self::Busy { active } => {
                write!(f, "finish or cancel the current action first ({active})")
            }
            Self::Format(err) => write!(f, "{err}"),
            Self::Edit(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for EditorError {}

impl From<EditError> for EditorError {
    fn from(err: EditError) -> Self {
        match err {
            EditError::IdentifierConflict { id } => Self::IdentifierConflict { id },
            EditError::NodeNotFound { id } => Self::NotFound { what: format!("node {id}") },
            EditError::EdgeNotFound { edge } => Self::NotFound { what: format!("edge {edge}") },
            EditError::AmbiguousPatch { count } => Self::AmbiguousPatch { count },
            other => Self::Edit(other),
        }
    }
}

impl From<ModeError> for EditorError {
    fn from(err: ModeError) -> Self {
        match err {
            ModeError::Busy { active } => Self::Busy { active },
            ModeError::EdgeNotFound { edge } => Self::NotFound { what: format!("edge {edge}") },
            ModeError::NodeNotFound { id } => Self::NotFound { what: format!("node {id}") },
        }
    }
}

impl From<FormatError> for EditorError {
    fn from(err: FormatError) -> Self {
        Self::Format(err)
    }
}

impl From<ApiError> for EditorError {
    fn from(err: ApiError) -> Self {
        Self::Network { message: err.to_string() }
    }
}

/// A rendered element resolved all the way down to its source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualContext {
    Node { id: NodeIdent, location: NodeLocation },
    Edge { edge: EdgeKey, location: EdgeLocation },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeClick {
    /// Idle click: show the node's definition.
    JumpTo(NodeLocation),
    /// The click completed the pending interaction and its edit was committed.
    Completed,
    /// Idle click on something the source does not mention.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    Applied,
    /// Our own last save coming back; dropped.
    Echo,
    Unchanged,
    /// The open diagram was deleted remotely.
    Orphaned,
    Ignored,
}

pub struct EditorSession<V> {
    source: DiagramSource,
    history: HistoryStack,
    machine: InteractionModeMachine,
    gate: ValidationGate<V>,
    sync: SharedSyncState,
    autosave: Debounce<String>,
    preview: Debounce<String>,
    /// Patch behind the latest commit, with the text it produced.
    pending_patch: Option<(PatchSpec, String)>,
    orphaned: bool,
}

impl<V: Validator> EditorSession<V> {
    pub fn new(
        id: DiagramId,
        text: impl Into<String>,
        validator: V,
        config: &EditorConfig,
    ) -> Self {
        let text = text.into();
        Self {
            history: HistoryStack::new(text.clone(), config.history_limit),
            source: DiagramSource::new(id, text),
            machine: InteractionModeMachine::new(),
            gate: ValidationGate::new(validator),
            sync: SharedSyncState::new(),
            autosave: Debounce::new(config.autosave_debounce()),
            preview: Debounce::new(config.preview_debounce()),
            pending_patch: None,
            orphaned: false,
        }
    }

    pub async fn open<S: DiagramStore>(
        store: &S,
        id: DiagramId,
        validator: V,
        config: &EditorConfig,
    ) -> Result<Self, EditorError> {
        let document = store.get_diagram(&id).await?;
        info!(diagram = %id, bytes = document.content.len(), "opened diagram");
        Ok(Self::new(id, document.content, validator, config))
    }

    /// Flushes a pending autosave and drops the session.
    pub async fn close<S: DiagramStore>(mut self, store: &S) -> Result<(), EditorError> {
        if let Some(text) = self.autosave.cancel() {
            self.persist(store, text).await?;
        }
        info!(diagram = %self.source.id(), "closed diagram");
        Ok(())
    }

    /// Shares the echo watermark with a sync client.
    pub fn with_sync_state(mut self, state: SharedSyncState) -> Self {
        self.sync = state;
        self
    }

    pub fn sync_state(&self) -> &SharedSyncState {
        &self.sync
    }

    pub fn id(&self) -> &DiagramId {
        self.source.id()
    }

    pub fn text(&self) -> &str {
        self.source.text()
    }

    pub fn source(&self) -> &DiagramSource {
        &self.source
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn mode(&self) -> &InteractionMode {
        self.machine.mode()
    }

    pub fn interaction(&self) -> &InteractionModeMachine {
        &self.machine
    }

    pub fn is_orphaned(&self) -> bool {
        self.orphaned
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.autosave.is_pending()
    }

    pub fn locate_node(&self, id: &NodeIdent) -> Option<NodeLocation> {
        locate_node(self.source.text(), id.as_str())
    }

    pub fn locate_edge(&self, edge: &EdgeKey) -> Option<EdgeLocation> {
        locate_edge(self.source.text(), edge.source.as_str(), edge.target.as_str())
    }

    /// Maps a rendered element to source. An edge id with several readings resolves to the first
    /// one present in the current text.
    pub fn resolve_element<E: VisualElement>(&self, element: &E) -> Option<VisualContext> {
        let candidates = edge_candidates(element);
        if !candidates.is_empty() {
            return candidates.into_iter().find_map(|edge| {
                let location = self.locate_edge(&edge)?;
                Some(VisualContext::Edge { edge, location })
            });
        }
        let id = extract_node_id(element)?;
        let location = self.locate_node(&id)?;
        Some(VisualContext::Node { id, location })
    }

    /// Context for a right-click menu; `None` while a mode is active or the element is unknown.
    pub fn context_menu<E: VisualElement>(&self, element: &E) -> Option<VisualContext> {
        if !self.machine.menus_enabled() {
            return None;
        }
        self.resolve_element(element)
    }

    /// Validates and commits one structural edit.
    pub async fn apply(&mut self, op: &EditOp) -> Result<(), EditorError> {
        let candidate = apply_edit(self.source.text(), op)?;
        self.commit_checked(candidate, op.name()).await?;
        if let EditOp::Patch { find, replace } = op {
            let patch = PatchSpec { find: find.clone(), replace: replace.clone() };
            self.pending_patch = Some((patch, self.source.text().to_owned()));
        }
        Ok(())
    }

    pub async fn format(&mut self) -> Result<(), EditorError> {
        let candidate = autoformat(self.source.text())?;
        self.commit_checked(candidate, "autoformat").await
    }

    /// Free-form text change from the source editor. Not validated.
    pub fn edit_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.source.text() {
            self.commit(text);
        }
    }

    pub fn undo(&mut self) -> bool {
        let Some(text) = self.history.undo().map(str::to_owned) else {
            return false;
        };
        self.restore(text);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(text) = self.history.redo().map(str::to_owned) else {
            return false;
        };
        self.restore(text);
        true
    }

    pub fn begin_reroute_origin(&mut self, edge: EdgeKey) -> Result<(), EditorError> {
        Ok(self.machine.begin_reroute_origin(self.source.text(), edge)?)
    }

    pub fn begin_reroute_destination(&mut self, edge: EdgeKey) -> Result<(), EditorError> {
        Ok(self.machine.begin_reroute_destination(self.source.text(), edge)?)
    }

    pub fn begin_add_transition(
        &mut self,
        source: NodeIdent,
        label: Option<String>,
    ) -> Result<(), EditorError> {
        Ok(self.machine.begin_add_transition(self.source.text(), source, label)?)
    }

    /// While idle a click jumps to the node; otherwise it completes the pending interaction.
    ///
    /// The mode is back to idle as soon as this is called, even if the edit is later rejected.
    pub async fn click_node(&mut self, node: NodeIdent) -> Result<NodeClick, EditorError> {
        match self.machine.node_clicked(node.clone()) {
            None => Ok(self.locate_node(&node).map_or(NodeClick::Ignored, NodeClick::JumpTo)),
            Some(op) => {
                self.apply(&op).await?;
                Ok(NodeClick::Completed)
            }
        }
    }

    pub fn cancel_interaction(&mut self) -> bool {
        self.machine.cancel()
    }

    pub fn escape(&mut self) -> bool {
        self.machine.escape()
    }

    /// Applies an inbound live-channel message to the open diagram.
    pub fn receive_remote(&mut self, message: &ServerMessage) -> RemoteOutcome {
        match message {
            ServerMessage::DiagramUpdated { id, content } if id == self.source.id().as_str() => {
                if self.sync.is_echo(content) {
                    debug!(diagram = %id, "suppressed echo of own save");
                    return RemoteOutcome::Echo;
                }
                if content == self.source.text() {
                    return RemoteOutcome::Unchanged;
                }
                info!(diagram = %id, bytes = content.len(), "applying remote update");
                self.autosave.cancel();
                self.pending_patch = None;
                self.history.push(content.clone());
                self.source.replace_text(content.clone());
                self.preview.push(content.clone());
                RemoteOutcome::Applied
            }
            ServerMessage::DiagramDeleted { id } if id == self.source.id().as_str() => {
                warn!(diagram = %id, "diagram deleted remotely; autosave disabled");
                self.orphaned = true;
                self.autosave.cancel();
                RemoteOutcome::Orphaned
            }
            _ => RemoteOutcome::Ignored,
        }
    }

    /// Resolves with the text to persist once the autosave timer fires.
    pub async fn next_autosave(&mut self) -> String {
        self.autosave.ready().await
    }

    /// Resolves with the text to render once the preview timer fires.
    pub async fn next_preview(&mut self) -> String {
        self.preview.ready().await
    }

    /// Saves `text`, recording it as the echo watermark first.
    ///
    /// A failed request re-arms autosave so the write is retried on the next debounce window.
    pub async fn persist<S: DiagramStore>(
        &mut self,
        store: &S,
        text: String,
    ) -> Result<(), EditorError> {
        if self.orphaned {
            debug!(diagram = %self.source.id(), "skipping save of deleted diagram");
            return Ok(());
        }
        let patch = match self.pending_patch.take() {
            Some((patch, produced)) if produced == text => Some(patch),
            _ => None,
        };
        self.sync.record_saved(&text);
        match store.save_diagram(self.source.id(), &text, patch.as_ref()).await {
            Ok(response) if response.success => {
                debug!(diagram = %self.source.id(), bytes = text.len(), "saved");
                Ok(())
            }
            Ok(response) => {
                warn!(diagram = %self.source.id(), error = ?response.error, "save rejected");
                Err(EditorError::Validation {
                    message: response.error.unwrap_or_else(|| "save rejected".to_owned()),
                    line: response.line,
                })
            }
            Err(err) => {
                warn!(diagram = %self.source.id(), error = %err, "save failed; will retry");
                if !self.autosave.is_pending() {
                    self.autosave.push(text);
                }
                Err(err.into())
            }
        }
    }

    /// Persists a pending autosave right away, if there is one.
    pub async fn flush<S: DiagramStore>(&mut self, store: &S) -> Result<bool, EditorError> {
        match self.autosave.cancel() {
            Some(text) => self.persist(store, text).await.map(|()| true),
            None => Ok(false),
        }
    }

    async fn commit_checked(
        &mut self,
        candidate: String,
        op: &'static str,
    ) -> Result<(), EditorError> {
        if candidate == self.source.text() {
            debug!(op, "edit produced no change");
            return Ok(());
        }
        match self.gate.check(&candidate).await? {
            Verdict::Valid => {
                self.commit(candidate);
                debug!(op, bytes = self.source.text().len(), "edit committed");
                Ok(())
            }
            Verdict::Invalid { message, line } => Err(EditorError::Validation { message, line }),
        }
    }

    fn commit(&mut self, text: String) {
        self.history.push(text.clone());
        self.restore(text);
    }

    fn restore(&mut self, text: String) {
        self.pending_patch = None;
        self.source.replace_text(text.clone());
        self.autosave.push(text.clone());
        self.preview.push(text);
    }
}

#[cfg(test)]
mod tests;
