//! Slash-command parsing for stdin input

use anyhow::{Context, Result, anyhow, bail};
use lobby_core::{IncomingMessage, PlayerNum, Properties};

pub const HELP: &str = "\
Commands:
  <text>                      say <text> to the lobby
  /say <text>                 same as above
  /dm <player> <text>         direct message
  /name <name>                change your name
  /prop k=v [k=v ...]         set your player properties
  /lobby k=v [k=v ...]        set lobby properties
  /broadcast k=v [k=v ...]    broadcast data to every player
  /kick <player>              kick a player (owner only)
  /votekick <player>          vote to kick a player
  /owner <player>             hand ownership to a player (owner only)
  /action <name> [k=v ...]    run a server action
  /list <name> k=v [k=v ...]  append a record to a shared list
  /reset <name>               clear a shared list
  /ping                       ping the server
  /players                    show the mirrored lobby
  /reconnect                  open a fresh connection
  /disconnect                 close the connection
  /quit                       exit";

/// One line of user input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(IncomingMessage),
    Players,
    Reconnect,
    Disconnect,
    Help,
    Quit,
}

/// Parse a line of input. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(say(line)));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "say" => say(required(args, "/say <text>")?),
        "dm" => {
            let (player, text) = args
                .split_once(char::is_whitespace)
                .ok_or_else(|| anyhow!("Usage: /dm <player> <text>"))?;
            Command::Send(IncomingMessage::DirectSay {
                text: text.trim().to_string(),
                to_player: player_num(player)?,
            })
        }
        "name" => Command::Send(IncomingMessage::SetPlayerName {
            name: required(args, "/name <name>")?.to_string(),
        }),
        "prop" => Command::Send(IncomingMessage::SetPlayerProperties {
            properties: non_empty(properties(args)?, "/prop k=v [k=v ...]")?,
        }),
        "lobby" => Command::Send(IncomingMessage::SetLobbyProperties {
            properties: non_empty(properties(args)?, "/lobby k=v [k=v ...]")?,
        }),
        "broadcast" => Command::Send(IncomingMessage::Broadcast {
            data: non_empty(properties(args)?, "/broadcast k=v [k=v ...]")?,
        }),
        "kick" => Command::Send(IncomingMessage::Kick {
            player_num: player_num(args)?,
        }),
        "votekick" => Command::Send(IncomingMessage::VoteKick {
            player_num: player_num(args)?,
        }),
        "owner" => Command::Send(IncomingMessage::TransferOwner {
            player_num: player_num(args)?,
        }),
        "action" => {
            let (action, params) = split_name(args, "/action <name> [k=v ...]")?;
            Command::Send(IncomingMessage::Action {
                name: action.to_string(),
                params: properties(params)?,
            })
        }
        "list" => {
            let (list, record) = split_name(args, "/list <name> k=v [k=v ...]")?;
            Command::Send(IncomingMessage::AddToList {
                name: list.to_string(),
                value: non_empty(properties(record)?, "/list <name> k=v [k=v ...]")?,
            })
        }
        "reset" => Command::Send(IncomingMessage::ResetList {
            name: required(args, "/reset <name>")?.to_string(),
        }),
        "ping" => Command::Send(IncomingMessage::Ping {}),
        "players" => Command::Players,
        "reconnect" => Command::Reconnect,
        "disconnect" => Command::Disconnect,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("Unknown command /{} (try /help)", other),
    };

    Ok(Some(command))
}

fn say(text: &str) -> Command {
    Command::Send(IncomingMessage::Say {
        text: text.to_string(),
    })
}

fn required<'a>(args: &'a str, usage: &str) -> Result<&'a str> {
    if args.is_empty() {
        bail!("Usage: {}", usage);
    }
    Ok(args)
}

fn split_name<'a>(args: &'a str, usage: &str) -> Result<(&'a str, &'a str)> {
    let args = required(args, usage)?;
    Ok(match args.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (args, ""),
    })
}

fn non_empty(properties: Properties, usage: &str) -> Result<Properties> {
    if properties.is_empty() {
        bail!("Usage: {}", usage);
    }
    Ok(properties)
}

fn player_num(arg: &str) -> Result<PlayerNum> {
    arg.trim()
        .parse()
        .with_context(|| format!("Invalid player number: {:?}", arg.trim()))
}

/// Parse `k=v` pairs separated by whitespace
fn properties(args: &str) -> Result<Properties> {
    args.split_whitespace()
        .map(|pair| {
            pair.split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .ok_or_else(|| anyhow!("Expected key=value, got {:?}", pair))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn parsed(line: &str) -> Command {
        parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_plain_text_is_say() {
        assert_eq!(
            parsed("hello there"),
            Command::Send(IncomingMessage::Say {
                text: "hello there".into()
            })
        );
        assert!(parse("   ").unwrap().is_none());
    }

    #[test]
    fn test_direct_say() {
        assert_eq!(
            parsed("/dm 3 meet at the gate"),
            Command::Send(IncomingMessage::DirectSay {
                text: "meet at the gate".into(),
                to_player: 3
            })
        );
        assert!(parse("/dm three hi").is_err());
        assert!(parse("/dm 3").is_err());
    }

    #[test]
    fn test_property_commands() {
        assert_eq!(
            parsed("/prop color=red ready=yes"),
            Command::Send(IncomingMessage::SetPlayerProperties {
                properties: props(&[("color", "red"), ("ready", "yes")])
            })
        );
        assert_eq!(
            parsed("/lobby mode="),
            Command::Send(IncomingMessage::SetLobbyProperties {
                properties: props(&[("mode", "")])
            })
        );
        assert!(parse("/prop").is_err());
        assert!(parse("/prop color").is_err());
        assert!(parse("/prop =red").is_err());
    }

    #[test]
    fn test_list_and_action() {
        assert_eq!(
            parsed("/list scores p=5"),
            Command::Send(IncomingMessage::AddToList {
                name: "scores".into(),
                value: props(&[("p", "5")])
            })
        );
        assert_eq!(
            parsed("/action roll"),
            Command::Send(IncomingMessage::Action {
                name: "roll".into(),
                params: Properties::new()
            })
        );
        assert_eq!(
            parsed("/reset scores"),
            Command::Send(IncomingMessage::ResetList {
                name: "scores".into()
            })
        );
        assert!(parse("/list scores").is_err());
    }

    #[test]
    fn test_player_commands() {
        assert_eq!(
            parsed("/kick 2"),
            Command::Send(IncomingMessage::Kick { player_num: 2 })
        );
        assert_eq!(
            parsed("/owner 4"),
            Command::Send(IncomingMessage::TransferOwner { player_num: 4 })
        );
        assert!(parse("/votekick").is_err());
    }

    #[test]
    fn test_local_commands() {
        assert_eq!(parsed("/players"), Command::Players);
        assert_eq!(parsed("/quit"), Command::Quit);
        assert_eq!(parsed("/ping"), Command::Send(IncomingMessage::Ping {}));
        assert!(parse("/teleport 1 2").is_err());
    }
}
