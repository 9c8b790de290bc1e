//! Lobby command-line client
//!
//! Connects to a lobby server, prints everything the server pushes and sends
//! what is typed on stdin. Plain text is said to the lobby; `/help` lists the
//! other commands.

mod command;

use anyhow::Result;
use clap::Parser;
use command::{Command, HELP};
use lobby_client::{
    ClientConfig, DEFAULT_SERVER, LobbyClient, LobbyEvent, LobbyState,
    OutgoingMessage, ReconnectPolicy,
};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Parser)]
#[command(name = "lobby-client", version, about = "Join a lobby and chat from the terminal")]
struct Args {
    /// Lobby server base URL
    #[arg(long, env = "LOBBY_SERVER", default_value = DEFAULT_SERVER)]
    server: String,

    /// Lobby code to join; omit to create a new lobby
    #[arg(long = "lobby", env = "LOBBY_CODE")]
    lobby_code: Option<String>,

    /// Player name to set once connected
    #[arg(long)]
    name: Option<String>,

    /// Reconnect attempts after losing the connection (0 disables)
    #[arg(long, default_value_t = 0)]
    reconnect_attempts: u32,

    /// Delay before the first reconnect attempt, doubled on each retry
    #[arg(long, default_value_t = 1000)]
    reconnect_delay_ms: u64,
}

impl Args {
    fn config(&self) -> ClientConfig {
        let config = ClientConfig::new(self.server.clone());
        match &self.lobby_code {
            Some(code) => config.with_lobby_code(code.clone()),
            None => config,
        }
    }

    fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.reconnect_attempts,
            delay: Duration::from_millis(self.reconnect_delay_ms),
            ..Default::default()
        }
    }
}

fn print_message(message: &OutgoingMessage) {
    match message {
        OutgoingMessage::Hello {
            lobby_code,
            player_num,
            players,
            ..
        } => println!(
            "* joined lobby {} as player {} ({} players)",
            lobby_code,
            player_num,
            players.len()
        ),
        OutgoingMessage::Say {
            text,
            from_player_num,
            ..
        } => println!("<{}> {}", from_player_num, text),
        OutgoingMessage::DirectSay {
            text,
            from_player_num,
            ..
        } => println!("<{} → you> {}", from_player_num, text),
        OutgoingMessage::Error { message } => println!("! server error: {}", message),
        OutgoingMessage::LobbyNotFound {} => println!("! lobby not found"),
        OutgoingMessage::PlayerJoined { player } => {
            println!("* {} joined as player {}", player.name, player.player_num)
        }
        OutgoingMessage::PlayerChangedName {
            player_num,
            new_name,
        } => println!("* player {} is now {}", player_num, new_name),
        OutgoingMessage::PlayerDeparted { player_num } => {
            println!("* player {} left", player_num)
        }
        OutgoingMessage::LobbyOwnerChanged { player_num } => {
            println!("* player {} now owns the lobby", player_num)
        }
        OutgoingMessage::Pong {} => println!("* pong"),
        other => println!("* {}: {:?}", other.kind(), other),
    }
}

fn print_state(state: &LobbyState) {
    println!(
        "lobby {} (you are {})",
        state.lobby_code.as_deref().unwrap_or("-"),
        state
            .our_player_num
            .map_or_else(|| "-".to_string(), |n| n.to_string())
    );
    for player in &state.players {
        println!("  {:>3} {} {:?}", player.player_num, player.name, player.properties);
    }
    if !state.lobby_properties.is_empty() {
        println!("  properties: {:?}", state.lobby_properties);
    }
    for (name, records) in &state.lists {
        println!("  list {}: {} records", name, records.len());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let policy = args.reconnect_policy();

    let (tx, mut events) = mpsc::unbounded_channel();
    let client = LobbyClient::new(args.config(), tx);
    info!("Lobby client starting, endpoint {}", client.endpoint());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut attempt = 0;
    let mut retry_at: Option<Instant> = None;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    LobbyEvent::Message(message) => print_message(&message),
                    LobbyEvent::StatusChanged(status) => {
                        println!("[{}]", status);
                        if status.is_connected() {
                            attempt = 0;
                            if let Some(name) = &args.name {
                                client.set_player_name(name.clone()).await;
                            }
                        } else if status.is_failed() && retry_at.is_none() {
                            retry_at = schedule_retry(&client, &policy, &mut attempt);
                        }
                    }
                    LobbyEvent::Disconnected => {
                        println!("[disconnected]");
                        if retry_at.is_none() && !client.connection_status().is_listening() {
                            retry_at = schedule_retry(&client, &policy, &mut attempt);
                        }
                    }
                }
            }
            _ = sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                retry_at = None;
                info!("Reconnect attempt {}", attempt);
                if let Err(e) = client.reconnect().await {
                    warn!("Reconnect refused: {}", e);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match command::parse(&line) {
                    Ok(Some(Command::Send(message))) => client.send(message).await,
                    Ok(Some(Command::Players)) => print_state(&client.snapshot().await),
                    Ok(Some(Command::Reconnect)) => {
                        retry_at = None;
                        attempt = 0;
                        if let Err(e) = client.reconnect().await {
                            println!("! {}", e);
                        }
                    }
                    Ok(Some(Command::Disconnect)) => {
                        retry_at = None;
                        attempt = policy.max_attempts;
                        client.disconnect().await;
                    }
                    Ok(Some(Command::Help)) => println!("{}", HELP),
                    Ok(Some(Command::Quit)) => break,
                    Ok(None) => {}
                    Err(e) => println!("! {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.disconnect().await;
    info!("Lobby client stopped");
    Ok(())
}

/// Next reconnect deadline, if the policy and the server still allow one
fn schedule_retry(
    client: &LobbyClient,
    policy: &ReconnectPolicy,
    attempt: &mut u32,
) -> Option<Instant> {
    if !client.reconnect_allowed() {
        return None;
    }
    *attempt = attempt.saturating_add(1);
    let delay = policy.delay_for(*attempt)?;
    info!("Reconnecting in {:?}", delay);
    Some(Instant::now() + delay)
}
