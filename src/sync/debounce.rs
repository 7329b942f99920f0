// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use tokio::time::Instant;

/// Trailing-edge debounce: every [`Debounce::push`] replaces the held value and restarts the
/// timer, so a burst of pushes yields only the last value, once.
#[derive(Debug, Clone)]
pub struct Debounce<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debounce<T> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn push(&mut self, value: T) {
        self.pending = Some((Instant::now() + self.delay, value));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.cancel(),
            _ => None,
        }
    }

    /// Resolves with the held value once its timer fires; never resolves while nothing is pending.
    ///
    /// Cancel-safe: dropping the future leaves the value in place.
    pub async fn ready(&mut self) -> T {
        loop {
            match self.deadline() {
                None => std::future::pending::<()>().await,
                Some(deadline) => {
                    tokio::time::sleep_until(deadline).await;
                    if let Some(value) = self.take_due(Instant::now()) {
                        return value;
                    }
                }
            }
        }
    }
}
