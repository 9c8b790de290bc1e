//! Async client for a lobby server
//!
//! A [`LobbyClient`] keeps one connection to a lobby, mirrors the lobby state
//! the server pushes (players, lobby properties, shared lists) and reports
//! every message and status change to a [`LobbyObserver`].
//!
//! Transports are pluggable through [`Connector`]. [`WebSocketConnector`] is
//! the default; [`loopback`] gives an in-memory server for tests.

mod client;
mod config;
mod dispatch;
pub mod loopback;
mod reconnect;
mod session;
mod transport;
mod ws;

pub use client::LobbyClient;
pub use config::{ClientConfig, DEFAULT_SERVER};
pub use dispatch::{LobbyEvent, LobbyObserver};
pub use loopback::{LoopbackConnector, LoopbackPeer, LoopbackServer, loopback};
pub use reconnect::ReconnectPolicy;
pub use transport::{Connector, FrameReader, FrameWriter, TransportHalves};
pub use ws::WebSocketConnector;

pub use lobby_core::{
    ConnectionStatus, IncomingMessage, ListRecord, Lists, LobbyError, LobbyState,
    OutgoingMessage, PlayerInfo, PlayerNum, Properties, Result,
};
