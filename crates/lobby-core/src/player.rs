//! Player and lobby property types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Server-assigned player number, unique within a lobby session
pub type PlayerNum = i64;

/// String key/value properties attached to a player or a lobby
pub type Properties = HashMap<String, String>;

/// One record in a named list
pub type ListRecord = HashMap<String, String>;

/// Named, ordered lists of records
pub type Lists = HashMap<String, Vec<ListRecord>>;

/// A connected participant.
///
/// `player_num` is the identity key; names are not unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub name: String,
    pub player_num: PlayerNum,
    #[serde(default)]
    pub properties: Properties,
}

impl PlayerInfo {
    /// Create a player with no properties
    pub fn new(player_num: PlayerNum, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            player_num,
            properties: Properties::new(),
        }
    }

    /// Attach a property, builder style
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Key-wise overwrite of this player's properties
    pub fn merge_properties(&mut self, update: &Properties) {
        merge(&mut self.properties, update);
    }
}

/// Merge `update` into `target`, overwriting per key and keeping untouched keys.
pub fn merge(target: &mut Properties, update: &Properties) {
    for (key, value) in update {
        target.insert(key.clone(), value.clone());
    }
}
