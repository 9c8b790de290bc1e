//! # lobby-core
//!
//! Core types for the lobby coordination protocol.
//!
//! This crate provides the pieces of a lobby client that do no I/O:
//! - Player and lobby property types
//! - Client → server and server → client message sets
//! - Wire codec for text/binary frames
//! - The mirrored [`LobbyState`] and the rules that keep it in sync
//! - Connection status and error types

pub mod error;
pub mod player;
pub mod protocol;
pub mod state;
pub mod status;

pub use error::{LobbyError, Result};
pub use player::{ListRecord, Lists, PlayerInfo, PlayerNum, Properties};
pub use protocol::{DecodeError, Frame, IncomingMessage, OutgoingMessage, decode, encode};
pub use state::{Applied, LobbyState};
pub use status::ConnectionStatus;
