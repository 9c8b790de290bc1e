//! Wire protocol between a lobby client and the lobby server
//!
//! Messages are serialized as JSON with externally-tagged enums.
//! Format: {"tagName": {...fields}}, with camelCase tags and field names.
//! Variants without a payload still carry an empty object: {"ping":{}}.

use crate::error::Result;
use crate::player::{ListRecord, Lists, PlayerInfo, PlayerNum, Properties};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Messages a client sends to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum IncomingMessage {
    /// Keepalive, answered with `pong`
    Ping {},
    /// Chat line for every player in the lobby
    Say { text: String },
    /// Chat line for one player
    DirectSay { text: String, to_player: PlayerNum },
    /// Merge into this player's properties
    SetPlayerProperties { properties: Properties },
    /// Merge into the lobby properties
    SetLobbyProperties { properties: Properties },
    /// Change this player's display name
    SetPlayerName { name: String },
    /// Application-defined payload relayed to every client
    Broadcast { data: Properties },
    /// Remove a player (owner only)
    Kick { player_num: PlayerNum },
    /// Vote to remove a player; the server tallies
    VoteKick { player_num: PlayerNum },
    /// Hand lobby ownership to another player (owner only)
    TransferOwner { player_num: PlayerNum },
    /// Run a server-side script action
    Action { name: String, params: Properties },
    /// Append a record to a named list
    AddToList { name: String, value: ListRecord },
    /// Empty a named list
    ResetList { name: String },
}

/// Messages the server pushes to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OutgoingMessage {
    /// Application-defined payload from another client
    Broadcast { data: Properties },
    /// Chat line addressed to this player only
    DirectSay {
        text: String,
        date: DateTime<Utc>,
        from_player_num: PlayerNum,
    },
    /// Server-side error
    Error { message: String },
    /// Full lobby snapshot, always the first message on a connection
    Hello {
        lobby_code: String,
        player_num: PlayerNum,
        players: Vec<PlayerInfo>,
        lobby_properties: Properties,
        lists: Lists,
    },
    /// The requested lobby does not exist; the server closes the connection
    LobbyNotFound {},
    PlayerJoined { player: PlayerInfo },
    PlayerChangedName { player_num: PlayerNum, new_name: String },
    PlayerDeparted { player_num: PlayerNum },
    /// Merge into the lobby properties
    LobbyPropertiesUpdated { properties: Properties },
    LobbyOwnerChanged { player_num: PlayerNum },
    /// Merge into one player's properties
    PlayerPropertiesUpdated {
        player_num: PlayerNum,
        properties: Properties,
    },
    /// Reply to `ping`
    Pong {},
    /// Chat line for every player in the lobby
    Say {
        text: String,
        date: DateTime<Utc>,
        from_player_num: PlayerNum,
    },
    /// Append a record to a named list
    AddToList { name: String, value: ListRecord },
    /// Empty a named list
    ResetList { name: String },
}

impl IncomingMessage {
    /// Wire tag, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ping {} => "ping",
            Self::Say { .. } => "say",
            Self::DirectSay { .. } => "directSay",
            Self::SetPlayerProperties { .. } => "setPlayerProperties",
            Self::SetLobbyProperties { .. } => "setLobbyProperties",
            Self::SetPlayerName { .. } => "setPlayerName",
            Self::Broadcast { .. } => "broadcast",
            Self::Kick { .. } => "kick",
            Self::VoteKick { .. } => "voteKick",
            Self::TransferOwner { .. } => "transferOwner",
            Self::Action { .. } => "action",
            Self::AddToList { .. } => "addToList",
            Self::ResetList { .. } => "resetList",
        }
    }
}

impl OutgoingMessage {
    /// Wire tag, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Broadcast { .. } => "broadcast",
            Self::DirectSay { .. } => "directSay",
            Self::Error { .. } => "error",
            Self::Hello { .. } => "hello",
            Self::LobbyNotFound {} => "lobbyNotFound",
            Self::PlayerJoined { .. } => "playerJoined",
            Self::PlayerChangedName { .. } => "playerChangedName",
            Self::PlayerDeparted { .. } => "playerDeparted",
            Self::LobbyPropertiesUpdated { .. } => "lobbyPropertiesUpdated",
            Self::LobbyOwnerChanged { .. } => "lobbyOwnerChanged",
            Self::PlayerPropertiesUpdated { .. } => "playerPropertiesUpdated",
            Self::Pong {} => "pong",
            Self::Say { .. } => "say",
            Self::AddToList { .. } => "addToList",
            Self::ResetList { .. } => "resetList",
        }
    }
}

/// One discrete message unit on the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// Frame size in bytes
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First `max` characters of the payload, for debug logging
    pub fn preview(&self, max: usize) -> String {
        match self {
            Frame::Text(text) => text.chars().take(max).collect(),
            Frame::Binary(data) => String::from_utf8_lossy(data).chars().take(max).collect(),
        }
    }
}

/// Why an inbound frame could not be turned into an [`OutgoingMessage`]
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not JSON, unknown tag, or a field of the wrong type
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Binary frame whose payload is not UTF-8 text
    #[error("binary frame is not UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),
}

/// Encode a client message as a text frame
pub fn encode(msg: &IncomingMessage) -> Result<Frame> {
    Ok(Frame::Text(serde_json::to_string(msg)?))
}

/// Decode a server message from a text or binary frame
pub fn decode(frame: &Frame) -> std::result::Result<OutgoingMessage, DecodeError> {
    match frame {
        Frame::Text(text) => Ok(serde_json::from_str(text)?),
        Frame::Binary(data) => {
            let text = std::str::from_utf8(data)?;
            Ok(serde_json::from_str(text)?)
        }
    }
}
