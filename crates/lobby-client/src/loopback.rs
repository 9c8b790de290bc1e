//! In-memory loopback transport
//!
//! [`loopback`] returns a connector and the server side that accepts its
//! connections. Each accepted [`LoopbackPeer`] can push frames to the client,
//! read what the client sent, close the connection, or inject failures.
//! Useful for exercising a [`LobbyClient`](crate::LobbyClient) without a server.

use crate::transport::{Connector, FrameReader, FrameWriter, TransportHalves};
use async_trait::async_trait;
use lobby_core::{Frame, IncomingMessage, LobbyError, OutgoingMessage, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

enum Inbound {
    Frame(Frame),
    Error(String),
}

/// Create a connected connector/server pair
pub fn loopback() -> (LoopbackConnector, LoopbackServer) {
    let (accept_tx, accept_rx) = mpsc::unbounded_channel();
    let refuse = Arc::new(AtomicBool::new(false));
    (
        LoopbackConnector {
            accept_tx,
            refuse: Arc::clone(&refuse),
        },
        LoopbackServer { accept_rx, refuse },
    )
}

/// Client side: opens in-memory transports
pub struct LoopbackConnector {
    accept_tx: mpsc::UnboundedSender<LoopbackPeer>,
    refuse: Arc<AtomicBool>,
}

/// Server side: hands out one [`LoopbackPeer`] per client connection
pub struct LoopbackServer {
    accept_rx: mpsc::UnboundedReceiver<LoopbackPeer>,
    refuse: Arc<AtomicBool>,
}

impl LoopbackServer {
    /// Wait for the next client connection
    pub async fn accept(&mut self) -> Option<LoopbackPeer> {
        self.accept_rx.recv().await
    }

    /// Make subsequent connection attempts fail (or succeed again)
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for LoopbackConnector {
    async fn connect(&self, url: &str) -> Result<TransportHalves> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(LobbyError::Transport(format!(
                "Connection to {} refused",
                url
            )));
        }

        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();
        let fail_writes = Arc::new(AtomicBool::new(false));

        let peer = LoopbackPeer {
            url: url.to_string(),
            to_client: Some(to_client),
            from_client,
            fail_writes: Arc::clone(&fail_writes),
        };
        self.accept_tx
            .send(peer)
            .map_err(|_| LobbyError::Transport("Loopback server is gone".into()))?;
        debug!("Loopback connection opened to {}", url);

        Ok((
            Box::new(LoopbackWriter {
                to_server: Some(to_server),
                fail_writes,
            }),
            Box::new(LoopbackReader { from_server }),
        ))
    }
}

/// Server end of one loopback connection
pub struct LoopbackPeer {
    url: String,
    to_client: Option<mpsc::UnboundedSender<Inbound>>,
    from_client: mpsc::UnboundedReceiver<Frame>,
    fail_writes: Arc<AtomicBool>,
}

impl LoopbackPeer {
    /// Endpoint the client connected to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Push a server message as a JSON text frame.
    /// Returns false if the connection is already closed.
    pub fn send(&self, msg: &OutgoingMessage) -> bool {
        match serde_json::to_string(msg) {
            Ok(json) => self.send_frame(Frame::Text(json)),
            Err(_) => false,
        }
    }

    /// Push a raw frame
    pub fn send_frame(&self, frame: Frame) -> bool {
        self.to_client
            .as_ref()
            .is_some_and(|tx| tx.send(Inbound::Frame(frame)).is_ok())
    }

    /// Fail the client's next read with a transport error, then hang up
    pub fn fail(&mut self, reason: impl Into<String>) {
        if let Some(tx) = self.to_client.take() {
            let _ = tx.send(Inbound::Error(reason.into()));
        }
    }

    /// Close the connection from the server side
    pub fn close(&mut self) {
        self.to_client = None;
    }

    /// Make every later client write fail
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Next raw frame from the client; `None` once the client has closed
    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_client.recv().await
    }

    /// Next client frame decoded as a client message
    pub async fn recv_message(&mut self) -> Option<IncomingMessage> {
        match self.recv().await? {
            Frame::Text(text) => serde_json::from_str(&text).ok(),
            Frame::Binary(data) => serde_json::from_slice(&data).ok(),
        }
    }
}

struct LoopbackReader {
    from_server: mpsc::UnboundedReceiver<Inbound>,
}

#[async_trait]
impl FrameReader for LoopbackReader {
    async fn read_frame(&mut self) -> Option<Result<Frame>> {
        match self.from_server.recv().await? {
            Inbound::Frame(frame) => Some(Ok(frame)),
            Inbound::Error(reason) => Some(Err(LobbyError::Transport(reason))),
        }
    }
}

struct LoopbackWriter {
    to_server: Option<mpsc::UnboundedSender<Frame>>,
    fail_writes: Arc<AtomicBool>,
}

#[async_trait]
impl FrameWriter for LoopbackWriter {
    async fn write_frame(&mut self, frame: Frame) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LobbyError::Transport("Loopback write failed".into()));
        }
        let tx = self.to_server.as_ref().ok_or(LobbyError::NotConnected)?;
        tx.send(frame)
            .map_err(|_| LobbyError::Transport("Loopback peer hung up".into()))
    }

    async fn close(&mut self) -> Result<()> {
        self.to_server = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        let (connector, mut server) = loopback();
        let (mut writer, mut reader) = connector.connect("mem://lobby/ws").await.unwrap();
        let mut peer = server.accept().await.unwrap();
        assert_eq!(peer.url(), "mem://lobby/ws");

        writer.write_frame(Frame::Text("up".into())).await.unwrap();
        assert_eq!(peer.recv().await, Some(Frame::Text("up".into())));

        assert!(peer.send_frame(Frame::Text("down".into())));
        assert_eq!(
            reader.read_frame().await.unwrap().unwrap(),
            Frame::Text("down".into())
        );

        peer.close();
        assert!(reader.read_frame().await.is_none());

        writer.close().await.unwrap();
        assert!(peer.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let (connector, mut server) = loopback();
        let (mut writer, mut reader) = connector.connect("mem://x").await.unwrap();
        let mut peer = server.accept().await.unwrap();

        peer.fail_writes();
        assert!(writer.write_frame(Frame::Text("x".into())).await.is_err());

        peer.fail("reset by peer");
        assert!(matches!(
            reader.read_frame().await,
            Some(Err(LobbyError::Transport(_)))
        ));
        assert!(reader.read_frame().await.is_none());
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let (connector, server) = loopback();
        server.refuse_connections(true);
        assert!(connector.connect("mem://x").await.is_err());

        server.refuse_connections(false);
        assert!(connector.connect("mem://x").await.is_ok());
    }
}
