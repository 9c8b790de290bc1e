//! Transport abstractions for the lobby client
//!
//! A transport is a duplex channel of discrete frames. Opening one yields a
//! writer half, owned by the client for `send`, and a reader half, owned by the
//! session's receive loop. The two halves never contend with each other.

use async_trait::async_trait;
use lobby_core::{Frame, Result};

/// Trait for reading frames from a transport
#[async_trait]
pub trait FrameReader: Send {
    /// Wait for the next frame.
    ///
    /// Returns `None` once the peer has closed the connection cleanly and
    /// `Some(Err(..))` on a transport failure.
    async fn read_frame(&mut self) -> Option<Result<Frame>>;
}

/// Trait for writing frames to a transport
#[async_trait]
pub trait FrameWriter: Send {
    /// Write a complete frame
    async fn write_frame(&mut self, frame: Frame) -> Result<()>;

    /// Start a clean close of the connection
    async fn close(&mut self) -> Result<()>;
}

/// Writer and reader halves of one open transport
pub type TransportHalves = (Box<dyn FrameWriter>, Box<dyn FrameReader>);

/// Opens transports to a lobby endpoint
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a new transport to `url`
    async fn connect(&self, url: &str) -> Result<TransportHalves>;
}
