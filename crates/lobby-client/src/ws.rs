//! WebSocket transport
//!
//! Used to talk to a real lobby server over `ws://` or `wss://`.

use crate::transport::{Connector, FrameReader, FrameWriter, TransportHalves};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use lobby_core::{Frame, LobbyError, Result};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens WebSocket transports with `tokio-tungstenite`
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<TransportHalves> {
        let (stream, response) = connect_async(url)
            .await
            .map_err(|e| LobbyError::Transport(format!("Failed to connect to {}: {}", url, e)))?;
        debug!("WebSocket handshake with {} done ({})", url, response.status());

        let (sink, stream) = stream.split();
        Ok((Box::new(WsWriteHalf(sink)), Box::new(WsReadHalf(stream))))
    }
}

/// WebSocket write half
pub struct WsWriteHalf(SplitSink<WsStream, Message>);

#[async_trait]
impl FrameWriter for WsWriteHalf {
    async fn write_frame(&mut self, frame: Frame) -> Result<()> {
        let message = match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(data) => Message::Binary(data),
        };
        self.0
            .send(message)
            .await
            .map_err(|e| LobbyError::Transport(format!("WebSocket write failed: {}", e)))
    }

    async fn close(&mut self) -> Result<()> {
        match self.0.close().await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(LobbyError::Transport(format!("WebSocket close failed: {}", e))),
        }
    }
}

/// WebSocket read half
pub struct WsReadHalf(SplitStream<WsStream>);

#[async_trait]
impl FrameReader for WsReadHalf {
    async fn read_frame(&mut self) -> Option<Result<Frame>> {
        loop {
            match self.0.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(Frame::Text(text))),
                Ok(Message::Binary(data)) => return Some(Ok(Frame::Binary(data))),
                // tungstenite answers pings itself
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => continue,
                Ok(Message::Close(close)) => {
                    debug!("WebSocket closed by peer: {:?}", close);
                    return None;
                }
                Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => return None,
                Err(e) => {
                    return Some(Err(LobbyError::Transport(format!(
                        "WebSocket read failed: {}",
                        e
                    ))));
                }
            }
        }
    }
}
