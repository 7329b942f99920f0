// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::transport::{Connection, Transport, TransportError};
use super::{Backoff, ConnectionStatus, SharedSyncState};
use crate::api::{ClientMessage, ServerMessage};
use crate::config::EditorConfig;
use crate::model::DiagramId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncCommand {
    Send(ClientMessage),
    Subscribe(String),
    Unsubscribe(String),
    /// Skip the pending reconnect timer (or drop the live connection) and connect now.
    ReconnectNow,
    Shutdown,
}

/// Cloneable control surface for a running [`CollabSyncClient`].
#[derive(Debug, Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<SyncCommand>,
    state: SharedSyncState,
}

impl SyncHandle {
    /// Returns `false` once the client loop has exited.
    pub fn command(&self, command: SyncCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn send(&self, message: ClientMessage) -> bool {
        self.command(SyncCommand::Send(message))
    }

    pub fn subscribe(&self, id: &DiagramId) -> bool {
        self.command(SyncCommand::Subscribe(id.as_str().to_owned()))
    }

    pub fn unsubscribe(&self, id: &DiagramId) -> bool {
        self.command(SyncCommand::Unsubscribe(id.as_str().to_owned()))
    }

    pub fn reconnect_now(&self) -> bool {
        self.command(SyncCommand::ReconnectNow)
    }

    pub fn shutdown(&self) -> bool {
        self.command(SyncCommand::Shutdown)
    }

    pub fn state(&self) -> &SharedSyncState {
        &self.state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.status()
    }
}

type StatusListener = Box<dyn FnMut(ConnectionStatus)>;
type MessageListener = Box<dyn FnMut(&ServerMessage)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Dropped,
    Reconnect,
    Shutdown,
}

enum Event {
    Frame(Option<Result<String, TransportError>>),
    Command(Option<SyncCommand>),
}

/// Owns the live connection. Drive it with [`CollabSyncClient::run`]; control it through
/// [`SyncHandle`]s.
///
/// Listeners run synchronously on the loop, in registration order, so the client is not `Send`;
/// run it alongside the editor on a current-thread runtime.
pub struct CollabSyncClient<T: Transport> {
    transport: T,
    backoff: Backoff,
    state: SharedSyncState,
    status: ConnectionStatus,
    commands: mpsc::UnboundedReceiver<SyncCommand>,
    sender: mpsc::UnboundedSender<SyncCommand>,
    outbound: VecDeque<ClientMessage>,
    subscribed: Vec<String>,
    status_listeners: Vec<StatusListener>,
    message_listeners: Vec<MessageListener>,
}

impl<T: Transport> CollabSyncClient<T> {
    pub fn new(transport: T, backoff: Backoff) -> Self {
        Self::with_state(transport, backoff, SharedSyncState::new())
    }

    pub fn from_config(transport: T, config: &EditorConfig) -> Self {
        Self::new(transport, Backoff::new(config.reconnect_base(), config.reconnect_ceiling()))
    }

    /// Uses an existing shared state, e.g. one an editor session already watches.
    pub fn with_state(transport: T, backoff: Backoff, state: SharedSyncState) -> Self {
        let (sender, commands) = mpsc::unbounded_channel();
        Self {
            transport,
            backoff,
            state,
            status: ConnectionStatus::Disconnected,
            commands,
            sender,
            outbound: VecDeque::new(),
            subscribed: Vec::new(),
            status_listeners: Vec::new(),
            message_listeners: Vec::new(),
        }
    }

    pub fn handle(&self) -> SyncHandle {
        SyncHandle { commands: self.sender.clone(), state: self.state.clone() }
    }

    pub fn state(&self) -> &SharedSyncState {
        &self.state
    }

    pub fn on_status(&mut self, listener: impl FnMut(ConnectionStatus) + 'static) {
        self.status_listeners.push(Box::new(listener));
    }

    pub fn on_message(&mut self, listener: impl FnMut(&ServerMessage) + 'static) {
        self.message_listeners.push(Box::new(listener));
    }

    /// Connects, reconnects and pumps frames until [`SyncHandle::shutdown`].
    pub async fn run(mut self) {
        loop {
            self.set_status(ConnectionStatus::Connecting);
            match self.transport.connect().await {
                Ok(conn) => {
                    self.backoff.reset();
                    self.set_status(ConnectionStatus::Connected);
                    let exit = self.drive(conn).await;
                    self.set_status(ConnectionStatus::Disconnected);
                    match exit {
                        Exit::Shutdown => return,
                        Exit::Reconnect => continue,
                        Exit::Dropped => {}
                    }
                }
                Err(err) => {
                    self.set_status(ConnectionStatus::Disconnected);
                    let retry_in_ms = millis(self.backoff.peek());
                    warn!(error = %err, retry_in_ms, "sync connect failed");
                }
            }

            let delay = self.backoff.next_delay();
            if self.wait_disconnected(delay).await == Exit::Shutdown {
                return;
            }
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status == status {
            return;
        }
        info!(from = %self.status, to = %status, "sync status");
        self.status = status;
        self.state.set_status(status);
        for listener in &mut self.status_listeners {
            listener(status);
        }
    }

    /// Updates subscription bookkeeping and returns the frame the command produces.
    fn absorb(&mut self, command: SyncCommand) -> Option<ClientMessage> {
        match command {
            SyncCommand::Send(message) => Some(message),
            SyncCommand::Subscribe(id) => {
                if !self.subscribed.contains(&id) {
                    self.subscribed.push(id.clone());
                }
                Some(ClientMessage::Subscribe { id })
            }
            SyncCommand::Unsubscribe(id) => {
                self.subscribed.retain(|existing| *existing != id);
                Some(ClientMessage::Unsubscribe { id })
            }
            SyncCommand::ReconnectNow | SyncCommand::Shutdown => None,
        }
    }

    fn enqueue(&mut self, message: ClientMessage) {
        self.outbound.push_back(message);
        self.state.set_pending_outbound(self.outbound.len());
    }

    fn queue_resubscribes(&mut self) {
        let missing: Vec<ClientMessage> = self
            .subscribed
            .iter()
            .map(|id| ClientMessage::Subscribe { id: id.clone() })
            .filter(|message| !self.outbound.contains(message))
            .collect();
        for message in missing.into_iter().rev() {
            self.outbound.push_front(message);
        }
        self.state.set_pending_outbound(self.outbound.len());
    }

    async fn flush<C: Connection>(&mut self, conn: &mut C) -> Result<(), TransportError> {
        while let Some(message) = self.outbound.front() {
            let frame = match serde_json::to_string(message) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(error = %err, "dropping unserializable frame");
                    self.outbound.pop_front();
                    continue;
                }
            };
            conn.send(frame).await?;
            self.outbound.pop_front();
            self.state.set_pending_outbound(self.outbound.len());
        }
        Ok(())
    }

    async fn drive<C: Connection>(&mut self, mut conn: C) -> Exit {
        self.queue_resubscribes();
        if let Err(err) = self.flush(&mut conn).await {
            warn!(error = %err, pending = self.outbound.len(), "sync flush failed");
            return Exit::Dropped;
        }

        loop {
            let event = tokio::select! {
                frame = conn.recv() => Event::Frame(frame),
                command = self.commands.recv() => Event::Command(command),
            };
            match event {
                Event::Frame(None) => {
                    info!("sync connection closed by peer");
                    return Exit::Dropped;
                }
                Event::Frame(Some(Err(err))) => {
                    warn!(error = %err, "sync receive failed");
                    return Exit::Dropped;
                }
                Event::Frame(Some(Ok(frame))) => self.dispatch(&frame),
                Event::Command(None | Some(SyncCommand::Shutdown)) => return Exit::Shutdown,
                Event::Command(Some(SyncCommand::ReconnectNow)) => return Exit::Reconnect,
                Event::Command(Some(command)) => {
                    if let Some(message) = self.absorb(command) {
                        self.enqueue(message);
                        if let Err(err) = self.flush(&mut conn).await {
                            warn!(error = %err, pending = self.outbound.len(), "sync send failed");
                            return Exit::Dropped;
                        }
                    }
                }
            }
        }
    }

    async fn wait_disconnected(&mut self, delay: Duration) -> Exit {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            let command = tokio::select! {
                () = &mut sleep => return Exit::Dropped,
                command = self.commands.recv() => command,
            };
            match command {
                None | Some(SyncCommand::Shutdown) => return Exit::Shutdown,
                Some(SyncCommand::ReconnectNow) => {
                    debug!("reconnect timer cancelled by manual reconnect");
                    return Exit::Reconnect;
                }
                Some(command) => {
                    if let Some(message) = self.absorb(command) {
                        self.enqueue(message);
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, frame: &str) {
        let message: ServerMessage = match serde_json::from_str(frame) {
            Ok(message) => message,
            Err(err) => {
                debug!(error = %err, "ignoring malformed sync frame");
                return;
            }
        };
        if message == ServerMessage::Unknown {
            debug!("ignoring unknown sync message type");
            return;
        }
        for listener in &mut self.message_listeners {
            listener(&message);
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use tokio::time::Instant;

    use super::*;

    struct FakePeer {
        inbound: mpsc::UnboundedSender<String>,
        sent: mpsc::UnboundedReceiver<String>,
    }

    struct FakeConnection {
        inbound: mpsc::UnboundedReceiver<String>,
        sent: mpsc::UnboundedSender<String>,
    }

    impl Connection for FakeConnection {
        async fn send(&mut self, frame: String) -> Result<(), TransportError> {
            self.sent
                .send(frame)
                .map_err(|_| TransportError::Send { message: "peer gone".to_owned() })
        }

        async fn recv(&mut self) -> Option<Result<String, TransportError>> {
            self.inbound.recv().await.map(Ok)
        }
    }

    struct FakeTransport {
        outcomes: VecDeque<bool>,
        attempts: mpsc::UnboundedSender<Instant>,
        opened: mpsc::UnboundedSender<FakePeer>,
    }

    impl FakeTransport {
        fn new(
            outcomes: impl IntoIterator<Item = bool>,
        ) -> (Self, mpsc::UnboundedReceiver<Instant>, mpsc::UnboundedReceiver<FakePeer>) {
            let (attempts, attempts_rx) = mpsc::unbounded_channel();
            let (opened, opened_rx) = mpsc::unbounded_channel();
            let transport = Self { outcomes: outcomes.into_iter().collect(), attempts, opened };
            (transport, attempts_rx, opened_rx)
        }
    }

    impl Transport for FakeTransport {
        type Conn = FakeConnection;

        async fn connect(&mut self) -> Result<FakeConnection, TransportError> {
            let _ = self.attempts.send(Instant::now());
            if !self.outcomes.pop_front().unwrap_or(false) {
                return Err(TransportError::Connect { message: "refused".to_owned() });
            }
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
            let (sent_tx, sent_rx) = mpsc::unbounded_channel();
            let _ = self.opened.send(FakePeer { inbound: inbound_tx, sent: sent_rx });
            Ok(FakeConnection { inbound: inbound_rx, sent: sent_tx })
        }
    }

    fn diagram(id: &str) -> DiagramId {
        DiagramId::new(id).expect("diagram id")
    }

    fn assert_gap(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual <= expected + Duration::from_millis(2),
            "expected a gap of ~{expected:?}, got {actual:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_backoff_doubles_then_resets_after_success() {
        let base = Duration::from_millis(100);
        let (transport, mut attempts, mut opened) = FakeTransport::new([false, false, false, true]);
        let client = CollabSyncClient::new(transport, Backoff::new(base, Duration::from_secs(10)));
        let handle = client.handle();

        let driver = async move {
            let mut times = Vec::new();
            for _ in 0..4 {
                times.push(attempts.recv().await.expect("attempt"));
            }
            let peer = opened.recv().await.expect("connection");
            assert_gap(times[1] - times[0], base);
            assert_gap(times[2] - times[1], base * 2);
            assert_gap(times[3] - times[2], base * 4);

            drop(peer);
            let retry = attempts.recv().await.expect("retry after drop");
            assert_gap(retry - times[3], base);
            handle.shutdown();
        };

        tokio::join!(client.run(), driver);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_capped_at_the_ceiling() {
        let base = Duration::from_millis(100);
        let (transport, mut attempts, _opened) = FakeTransport::new([false; 5]);
        let backoff = Backoff::new(base, Duration::from_millis(250));
        let client = CollabSyncClient::new(transport, backoff);
        let handle = client.handle();

        let driver = async move {
            let mut times = Vec::new();
            for _ in 0..5 {
                times.push(attempts.recv().await.expect("attempt"));
            }
            assert_gap(times[2] - times[1], base * 2);
            assert_gap(times[3] - times[2], Duration::from_millis(250));
            assert_gap(times[4] - times[3], Duration::from_millis(250));
            handle.shutdown();
        };

        tokio::join!(client.run(), driver);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_frames_flush_in_order_and_subscriptions_survive_reconnects() {
        let (transport, _attempts, mut opened) = FakeTransport::new([false, true, true]);
        let client = CollabSyncClient::new(
            transport,
            Backoff::new(Duration::from_millis(50), Duration::from_secs(1)),
        );
        let handle = client.handle();
        handle.subscribe(&diagram("d1"));
        handle.subscribe(&diagram("d2"));
        handle.unsubscribe(&diagram("d1"));

        let driver = async move {
            let mut peer = opened.recv().await.expect("first connection");
            let mut frames = Vec::new();
            for _ in 0..3 {
                frames.push(peer.sent.recv().await.expect("frame"));
            }
            assert_eq!(
                frames,
                vec![
                    r#"{"type":"subscribe","id":"d1"}"#.to_owned(),
                    r#"{"type":"subscribe","id":"d2"}"#.to_owned(),
                    r#"{"type":"unsubscribe","id":"d1"}"#.to_owned(),
                ]
            );
            assert_eq!(handle.state().snapshot().pending_outbound, 0);

            drop(peer);
            let mut peer = opened.recv().await.expect("second connection");
            assert_eq!(
                peer.sent.recv().await.expect("resubscribe"),
                r#"{"type":"subscribe","id":"d2"}"#
            );
            handle.shutdown();
        };

        tokio::join!(client.run(), driver);
    }

    #[tokio::test(start_paused = true)]
    async fn listeners_run_in_registration_order_and_unknown_frames_are_ignored() {
        let (transport, _attempts, mut opened) = FakeTransport::new([true]);
        let mut client = CollabSyncClient::new(
            transport,
            Backoff::new(Duration::from_millis(50), Duration::from_secs(1)),
        );
        let handle = client.handle();

        let seen: Rc<RefCell<Vec<(&'static str, ServerMessage)>>> = Rc::default();
        let statuses: Rc<RefCell<Vec<ConnectionStatus>>> = Rc::default();
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<()>();

        client.on_status({
            let statuses = Rc::clone(&statuses);
            move |status| statuses.borrow_mut().push(status)
        });
        client.on_message({
            let seen = Rc::clone(&seen);
            move |message| seen.borrow_mut().push(("first", message.clone()))
        });
        client.on_message({
            let seen = Rc::clone(&seen);
            move |message| {
                seen.borrow_mut().push(("second", message.clone()));
                let _ = done_tx.send(());
            }
        });

        let driver = async move {
            let peer = opened.recv().await.expect("connection");
            peer.inbound.send(r#"{"type":"presence","users":2}"#.to_owned()).expect("send");
            peer.inbound.send("not json".to_owned()).expect("send");
            peer.inbound
                .send(r#"{"type":"diagram_deleted","id":"d1"}"#.to_owned())
                .expect("send");
            done_rx.recv().await.expect("dispatched");
            handle.shutdown();
            peer
        };

        let ((), _peer) = tokio::join!(client.run(), driver);

        let deleted = ServerMessage::DiagramDeleted { id: "d1".to_owned() };
        assert_eq!(*seen.borrow(), vec![("first", deleted.clone()), ("second", deleted)]);
        assert_eq!(
            *statuses.borrow(),
            vec![
                ConnectionStatus::Connecting,
                ConnectionStatus::Connected,
                ConnectionStatus::Disconnected,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn manual_reconnect_cancels_the_pending_timer() {
        let (transport, mut attempts, mut opened) = FakeTransport::new([false, true]);
        let client = CollabSyncClient::new(
            transport,
            Backoff::new(Duration::from_secs(10), Duration::from_secs(60)),
        );
        let handle = client.handle();

        let driver = async move {
            let first = attempts.recv().await.expect("first attempt");
            handle.reconnect_now();
            let second = attempts.recv().await.expect("second attempt");
            assert!(second - first < Duration::from_secs(1));
            let _peer = opened.recv().await.expect("connection");
            assert_eq!(handle.status(), ConnectionStatus::Connected);
            handle.shutdown();
        };

        tokio::join!(client.run(), driver);
    }
}
