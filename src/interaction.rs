// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Multi-click interaction modes ("pick the new destination", "pick the transition target").
//!
//! Exactly one [`InteractionMode`] is active. Every non-idle mode carries the context captured when
//! it was entered, and every exit path (completion, cancel, Escape) returns to `Idle` and drops it.

use std::fmt;

use crate::locate::{locate_edge, locate_node};
use crate::model::{EdgeKey, NodeIdent};
use crate::ops::EditOp;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    SelectingOrigin {
        edge: EdgeKey,
        source_line: usize,
    },
    SelectingDestination {
        edge: EdgeKey,
        source_line: usize,
    },
    AddingTransitionTarget {
        source: NodeIdent,
        label: Option<String>,
        source_line: usize,
    },
}

impl InteractionMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SelectingOrigin { .. } => "selecting_origin",
            Self::SelectingDestination { .. } => "selecting_destination",
            Self::AddingTransitionTarget { .. } => "adding_transition_target",
        }
    }
}

/// Pointer styling the host should show for the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    Default,
    PickNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeError {
    /// Another mode is active; menus are hidden while non-idle.
    Busy { active: &'static str },
    EdgeNotFound { edge: EdgeKey },
    NodeNotFound { id: NodeIdent },
}

impl fmt::Display for ModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy { active } => write!(f, "another interaction is in progress ({active})"),
            Self::EdgeNotFound { edge } => write!(f, "edge not found in source ({edge})"),
            Self::NodeNotFound { id } => write!(f, "node not found in source (id={id})"),
        }
    }
}

impl std::error::Error for ModeError {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionModeMachine {
    mode: InteractionMode,
}

impl InteractionModeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.mode == InteractionMode::Idle
    }

    pub fn menus_enabled(&self) -> bool {
        self.is_idle()
    }

    pub fn affordance(&self) -> Affordance {
        if self.is_idle() {
            Affordance::Default
        } else {
            Affordance::PickNode
        }
    }

    pub fn prompt(&self) -> Option<&'static str> {
        match self.mode {
            InteractionMode::Idle => None,
            InteractionMode::SelectingOrigin { .. } => {
                Some("Click the node the edge should start from")
            }
            InteractionMode::SelectingDestination { .. } => {
                Some("Click the node the edge should point to")
            }
            InteractionMode::AddingTransitionTarget { .. } => {
                Some("Click the node the transition should go to")
            }
        }
    }

    fn ensure_idle(&self) -> Result<(), ModeError> {
        if self.is_idle() {
            Ok(())
        } else {
            Err(ModeError::Busy { active: self.mode.name() })
        }
    }

    pub fn begin_reroute_origin(&mut self, text: &str, edge: EdgeKey) -> Result<(), ModeError> {
        self.ensure_idle()?;
        let location = locate_edge(text, edge.source.as_str(), edge.target.as_str())
            .ok_or_else(|| ModeError::EdgeNotFound { edge: edge.clone() })?;
        self.mode = InteractionMode::SelectingOrigin { edge, source_line: location.line };
        Ok(())
    }

    pub fn begin_reroute_destination(
        &mut self,
        text: &str,
        edge: EdgeKey,
    ) -> Result<(), ModeError> {
        self.ensure_idle()?;
        let location = locate_edge(text, edge.source.as_str(), edge.target.as_str())
            .ok_or_else(|| ModeError::EdgeNotFound { edge: edge.clone() })?;
        self.mode = InteractionMode::SelectingDestination { edge, source_line: location.line };
        Ok(())
    }

    pub fn begin_add_transition(
        &mut self,
        text: &str,
        source: NodeIdent,
        label: Option<String>,
    ) -> Result<(), ModeError> {
        self.ensure_idle()?;
        let location = locate_node(text, source.as_str())
            .ok_or_else(|| ModeError::NodeNotFound { id: source.clone() })?;
        self.mode = InteractionMode::AddingTransitionTarget {
            source,
            label,
            source_line: location.line,
        };
        Ok(())
    }

    /// Interprets a node click. While idle this returns `None` (a normal jump-to-source click);
    /// otherwise the pending operation is returned and the machine is back to idle.
    pub fn node_clicked(&mut self, node: NodeIdent) -> Option<EditOp> {
        match std::mem::take(&mut self.mode) {
            InteractionMode::Idle => None,
            InteractionMode::SelectingOrigin { edge, .. } => {
                Some(EditOp::RerouteOrigin { edge, new_source: node, new_node: None })
            }
            InteractionMode::SelectingDestination { edge, .. } => {
                Some(EditOp::RerouteDestination { edge, new_target: node, new_node: None })
            }
            InteractionMode::AddingTransitionTarget { source, label, .. } => {
                Some(EditOp::AddTransition { source, target: node, label })
            }
        }
    }

    /// Explicit cancel control. Returns whether a mode was active.
    pub fn cancel(&mut self) -> bool {
        let was_active = !self.is_idle();
        self.mode = InteractionMode::Idle;
        was_active
    }

    /// Global Escape key; same effect as [`Self::cancel`].
    pub fn escape(&mut self) -> bool {
        self.cancel()
    }
}
