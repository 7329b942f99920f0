// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::api::SessionScope;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Connect { message: String },
    Send { message: String },
    Receive { message: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect { message } => write!(f, "connect failed: {message}"),
            Self::Send { message } => write!(f, "send failed: {message}"),
            Self::Receive { message } => write!(f, "receive failed: {message}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Opens connections to the live channel. Called again after every drop.
#[allow(async_fn_in_trait)]
pub trait Transport {
    type Conn: Connection;

    async fn connect(&mut self) -> Result<Self::Conn, TransportError>;
}

/// One established connection exchanging text frames.
#[allow(async_fn_in_trait)]
pub trait Connection {
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Next inbound text frame; `None` once the peer closed the connection.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;
}

/// WebSocket transport for `{ws_base}/ws?project=..&session=..`.
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    pub fn new(ws_base: &str, scope: &SessionScope) -> Self {
        let base = ws_base.trim_end_matches('/');
        let url = format!(
            "{base}/ws?project={}&session={}",
            scope.project().as_str(),
            scope.session().as_str()
        );
        Self { url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for WsTransport {
    type Conn = WsConnection;

    async fn connect(&mut self) -> Result<WsConnection, TransportError> {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|err| TransportError::Connect { message: err.to_string() })?;
        Ok(WsConnection { stream })
    }
}

pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connection for WsConnection {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(frame.into()))
            .await
            .map_err(|err| TransportError::Send { message: err.to_string() })
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(_)) => return None,
                // Ping/pong are answered by tungstenite. Binary frames are not part of the
                // protocol.
                Ok(_) => continue,
                Err(err) => return Some(Err(TransportError::Receive { message: err.to_string() })),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_url_carries_scope() {
        let scope = SessionScope::new(Some("p1"), Some("s1")).expect("scope");
        let transport = WsTransport::new("ws://localhost:3000/", &scope);
        assert_eq!(transport.url(), "ws://localhost:3000/ws?project=p1&session=s1");
    }
}
