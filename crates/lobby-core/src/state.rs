//! Mirrored lobby state and the rules that keep it in sync with the server

use crate::player::{Lists, PlayerInfo, PlayerNum, Properties, merge};
use crate::protocol::OutgoingMessage;

/// Local mirror of the lobby as last reported by the server.
///
/// Empty until the first `hello` arrives. Only [`LobbyState::apply`] mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LobbyState {
    /// Code of the lobby we are in
    pub lobby_code: Option<String>,
    /// Our own player number, assigned by the server
    pub our_player_num: Option<PlayerNum>,
    /// Players in join order, unique by `player_num`
    pub players: Vec<PlayerInfo>,
    /// Lobby-wide properties
    pub lobby_properties: Properties,
    /// Named lists
    pub lists: Lists,
}

/// What applying one message did to the mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// `hello` replaced the whole snapshot
    Replaced,
    /// Part of the mirror changed
    Updated,
    /// Pass-through message, or a no-op (unknown player, unknown list)
    Unchanged,
    /// The lobby does not exist; callers must not try to reconnect
    LobbyNotFound,
}

impl LobbyState {
    /// Empty mirror
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a player by number
    pub fn player(&self, player_num: PlayerNum) -> Option<&PlayerInfo> {
        self.players.iter().find(|p| p.player_num == player_num)
    }

    fn player_mut(&mut self, player_num: PlayerNum) -> Option<&mut PlayerInfo> {
        self.players.iter_mut().find(|p| p.player_num == player_num)
    }

    /// Our own entry in the player list, once `hello` has arrived
    pub fn me(&self) -> Option<&PlayerInfo> {
        self.our_player_num.and_then(|num| self.player(num))
    }

    /// Apply one server message.
    ///
    /// Every variant is listed explicitly so a new server message cannot be
    /// added without deciding how it affects the mirror.
    pub fn apply(&mut self, msg: &OutgoingMessage) -> Applied {
        match msg {
            OutgoingMessage::Hello {
                lobby_code,
                player_num,
                players,
                lobby_properties,
                lists,
            } => {
                self.lobby_code = Some(lobby_code.clone());
                self.our_player_num = Some(*player_num);
                self.players = players.clone();
                self.lobby_properties = lobby_properties.clone();
                self.lists = lists.clone();
                Applied::Replaced
            }

            OutgoingMessage::PlayerPropertiesUpdated {
                player_num,
                properties,
            } => match self.player_mut(*player_num) {
                Some(player) => {
                    player.merge_properties(properties);
                    Applied::Updated
                }
                None => Applied::Unchanged,
            },

            OutgoingMessage::PlayerChangedName {
                player_num,
                new_name,
            } => match self.player_mut(*player_num) {
                Some(player) => {
                    player.name = new_name.clone();
                    Applied::Updated
                }
                None => Applied::Unchanged,
            },

            OutgoingMessage::PlayerDeparted { player_num } => {
                let before = self.players.len();
                self.players.retain(|p| p.player_num != *player_num);
                if self.players.len() == before {
                    Applied::Unchanged
                } else {
                    Applied::Updated
                }
            }

            OutgoingMessage::PlayerJoined { player } => {
                // A repeated join replaces the entry so player numbers stay unique
                match self.player_mut(player.player_num) {
                    Some(existing) => *existing = player.clone(),
                    None => self.players.push(player.clone()),
                }
                Applied::Updated
            }

            OutgoingMessage::LobbyPropertiesUpdated { properties } => {
                merge(&mut self.lobby_properties, properties);
                Applied::Updated
            }

            OutgoingMessage::AddToList { name, value } => match self.lists.get_mut(name) {
                Some(list) => {
                    list.push(value.clone());
                    Applied::Updated
                }
                None => Applied::Unchanged,
            },

            OutgoingMessage::ResetList { name } => {
                self.lists.insert(name.clone(), Vec::new());
                Applied::Updated
            }

            OutgoingMessage::LobbyNotFound {} => Applied::LobbyNotFound,

            OutgoingMessage::Broadcast { .. }
            | OutgoingMessage::Error { .. }
            | OutgoingMessage::Pong {}
            | OutgoingMessage::Say { .. }
            | OutgoingMessage::DirectSay { .. }
            | OutgoingMessage::LobbyOwnerChanged { .. } => Applied::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::ListRecord;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn hello(players: Vec<PlayerInfo>, lobby_properties: Properties, lists: Lists) -> OutgoingMessage {
        OutgoingMessage::Hello {
            lobby_code: "ABCD".into(),
            player_num: 1,
            players,
            lobby_properties,
            lists,
        }
    }

    fn three_players() -> LobbyState {
        let mut state = LobbyState::new();
        state.apply(&hello(
            vec![
                PlayerInfo::new(1, "Ann"),
                PlayerInfo::new(3, "Cat"),
                PlayerInfo::new(2, "Bob"),
            ],
            Properties::new(),
            Lists::new(),
        ));
        state
    }

    #[test]
    fn test_hello_replaces_everything() {
        let mut state = LobbyState::new();
        state.apply(&hello(
            vec![PlayerInfo::new(9, "Old")],
            props(&[("stale", "yes")]),
            Lists::from([("old".to_string(), vec![props(&[("a", "b")])])]),
        ));

        let result = state.apply(&hello(
            vec![PlayerInfo::new(1, "Ann")],
            props(&[("mode", "casual")]),
            Lists::from([("log".to_string(), Vec::new())]),
        ));

        assert_eq!(result, Applied::Replaced);
        assert_eq!(
            state,
            LobbyState {
                lobby_code: Some("ABCD".into()),
                our_player_num: Some(1),
                players: vec![PlayerInfo::new(1, "Ann")],
                lobby_properties: props(&[("mode", "casual")]),
                lists: Lists::from([("log".to_string(), Vec::new())]),
            }
        );
        assert_eq!(state.me().map(|p| p.name.as_str()), Some("Ann"));
    }

    #[test]
    fn test_player_property_merges_are_last_write_wins() {
        let mut state = three_players();
        let updates = [
            props(&[("color", "red"), ("ready", "no")]),
            props(&[("color", "blue")]),
            props(&[("ready", "yes"), ("hat", "top")]),
        ];

        let mut expected = Properties::new();
        for update in &updates {
            state.apply(&OutgoingMessage::PlayerPropertiesUpdated {
                player_num: 3,
                properties: update.clone(),
            });
            expected.extend(update.clone());
        }

        assert_eq!(state.player(3).unwrap().properties, expected);
        assert_eq!(
            expected,
            props(&[("color", "blue"), ("ready", "yes"), ("hat", "top")])
        );
        assert!(state.player(1).unwrap().properties.is_empty());
    }

    #[test]
    fn test_updates_for_unknown_player_are_ignored() {
        let mut state = three_players();
        let before = state.clone();

        let result = state.apply(&OutgoingMessage::PlayerPropertiesUpdated {
            player_num: 42,
            properties: props(&[("x", "y")]),
        });
        assert_eq!(result, Applied::Unchanged);

        let result = state.apply(&OutgoingMessage::PlayerChangedName {
            player_num: 42,
            new_name: "Ghost".into(),
        });
        assert_eq!(result, Applied::Unchanged);
        assert_eq!(state, before);
    }

    #[test]
    fn test_player_changed_name() {
        let mut state = three_players();
        state.apply(&OutgoingMessage::PlayerChangedName {
            player_num: 2,
            new_name: "Robert".into(),
        });
        assert_eq!(state.player(2).unwrap().name, "Robert");
    }

    #[test]
    fn test_player_departed_keeps_order() {
        let mut state = three_players();
        let result = state.apply(&OutgoingMessage::PlayerDeparted { player_num: 3 });

        assert_eq!(result, Applied::Updated);
        let nums: Vec<PlayerNum> = state.players.iter().map(|p| p.player_num).collect();
        assert_eq!(nums, vec![1, 2]);

        let result = state.apply(&OutgoingMessage::PlayerDeparted { player_num: 3 });
        assert_eq!(result, Applied::Unchanged);
    }

    #[test]
    fn test_player_joined_appends_and_stays_unique() {
        let mut state = three_players();
        state.apply(&OutgoingMessage::PlayerJoined {
            player: PlayerInfo::new(4, "Dan"),
        });
        assert_eq!(state.players.last().unwrap().name, "Dan");
        assert_eq!(state.players.len(), 4);

        state.apply(&OutgoingMessage::PlayerJoined {
            player: PlayerInfo::new(3, "Cat").with_property("rejoined", "yes"),
        });
        assert_eq!(state.players.len(), 4);
        assert_eq!(state.players[1].properties["rejoined"], "yes");
    }

    #[test]
    fn test_lobby_properties_merge() {
        let mut state = LobbyState::new();
        state.apply(&hello(
            Vec::new(),
            props(&[("mode", "casual"), ("map", "docks")]),
            Lists::new(),
        ));

        state.apply(&OutgoingMessage::LobbyPropertiesUpdated {
            properties: props(&[("mode", "ranked")]),
        });

        assert_eq!(
            state.lobby_properties,
            props(&[("mode", "ranked"), ("map", "docks")])
        );
    }

    #[test]
    fn test_add_to_unknown_list_is_noop() {
        let mut state = LobbyState::new();
        let result = state.apply(&OutgoingMessage::AddToList {
            name: "scores".into(),
            value: props(&[("p", "5")]),
        });

        assert_eq!(result, Applied::Unchanged);
        assert!(!state.lists.contains_key("scores"));
    }

    #[test]
    fn test_reset_then_add() {
        let mut state = LobbyState::new();
        state.apply(&OutgoingMessage::ResetList {
            name: "scores".into(),
        });
        state.apply(&OutgoingMessage::AddToList {
            name: "scores".into(),
            value: props(&[("p", "5")]),
        });

        assert_eq!(state.lists["scores"], vec![props(&[("p", "5")])]);

        state.apply(&OutgoingMessage::ResetList {
            name: "scores".into(),
        });
        assert_eq!(state.lists["scores"], Vec::<ListRecord>::new());
    }

    #[test]
    fn test_lists_from_hello_accept_appends() {
        let mut state = LobbyState::new();
        state.apply(&hello(
            Vec::new(),
            Properties::new(),
            Lists::from([("log".to_string(), vec![props(&[("n", "1")])])]),
        ));
        state.apply(&OutgoingMessage::AddToList {
            name: "log".into(),
            value: props(&[("n", "2")]),
        });

        assert_eq!(
            state.lists["log"],
            vec![props(&[("n", "1")]), props(&[("n", "2")])]
        );
    }

    #[test]
    fn test_pass_through_messages() {
        let mut state = three_players();
        let before = state.clone();

        let messages = vec![
            OutgoingMessage::Broadcast {
                data: props(&[("k", "v")]),
            },
            OutgoingMessage::Error {
                message: "nope".into(),
            },
            OutgoingMessage::Pong {},
            OutgoingMessage::Say {
                text: "hi".into(),
                date: Utc::now(),
                from_player_num: 1,
            },
            OutgoingMessage::DirectSay {
                text: "psst".into(),
                date: Utc::now(),
                from_player_num: 2,
            },
            OutgoingMessage::LobbyOwnerChanged { player_num: 2 },
        ];

        for msg in &messages {
            assert_eq!(state.apply(msg), Applied::Unchanged, "{}", msg.kind());
        }
        assert_eq!(state, before);
    }

    #[test]
    fn test_lobby_not_found_leaves_state() {
        let mut state = three_players();
        let before = state.clone();

        assert_eq!(
            state.apply(&OutgoingMessage::LobbyNotFound {}),
            Applied::LobbyNotFound
        );
        assert_eq!(state, before);
    }
}
