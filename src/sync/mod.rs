// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Live collaboration channel.
//!
//! [`CollabSyncClient`] keeps one connection to the backend alive: it reconnects with exponential
//! backoff, queues outbound frames while disconnected, re-subscribes after reconnects and fans
//! inbound frames out to listeners. [`SharedSyncState`] carries the echo-suppression watermark the
//! editor session consults before applying a remote update.

mod client;
mod debounce;
mod transport;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub use client::{CollabSyncClient, SyncCommand, SyncHandle};
pub use debounce::Debounce;
pub use transport::{Connection, Transport, TransportError, WsConnection, WsTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconnect delays: `base`, then doubling per consecutive failure, capped at `ceiling`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    ceiling: Duration,
    next: Duration,
}

impl Backoff {
    pub fn new(base: Duration, ceiling: Duration) -> Self {
        let ceiling = ceiling.max(base);
        Self { base, ceiling, next: base }
    }

    /// Returns the delay to wait now and advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = self.next.saturating_mul(2).min(self.ceiling);
        delay
    }

    pub fn peek(&self) -> Duration {
        self.next
    }

    pub fn reset(&mut self) {
        self.next = self.base;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    pub status: ConnectionStatus,
    /// Echo-suppression watermark: the text most recently sent to the backend.
    pub last_saved: Option<String>,
    /// Frames queued while disconnected, flushed in order on the next connect.
    pub pending_outbound: usize,
}

/// [`SyncState`] shared between the client loop, its handles and the editor session.
#[derive(Debug, Clone, Default)]
pub struct SharedSyncState(Arc<Mutex<SyncState>>);

impl SharedSyncState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SyncState {
        self.lock().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.lock().status
    }

    pub(crate) fn set_status(&self, status: ConnectionStatus) {
        self.lock().status = status;
    }

    pub(crate) fn set_pending_outbound(&self, pending: usize) {
        self.lock().pending_outbound = pending;
    }

    /// Records `text` as about to be persisted. Must run before the save request goes out.
    pub fn record_saved(&self, text: &str) {
        self.lock().last_saved = Some(text.to_owned());
    }

    /// Whether an inbound payload is the backend echoing our own last write.
    pub fn is_echo(&self, content: &str) -> bool {
        self.lock().last_saved.as_deref() == Some(content)
    }
}
