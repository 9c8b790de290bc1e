//! End-to-end test against a real WebSocket server

use chrono::{TimeZone, Utc};
use futures_util::{SinkExt, StreamExt};
use lobby_client::{
    ClientConfig, ConnectionStatus, LobbyClient, LobbyEvent, OutgoingMessage, PlayerInfo,
};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

const HELLO: &str = r#"{"hello":{"lobbyCode":"ABCD","playerNum":2,"players":[{"name":"Ann","playerNum":1,"properties":{}},{"name":"Bob","playerNum":2,"properties":{"color":"red"}}],"lobbyProperties":{"mode":"casual"},"lists":{}}}"#;

const SAY: &str = r#"{"say":{"text":"hi","date":"2024-05-01T12:00:00Z","fromPlayerNum":1}}"#;

async fn next_event(events: &mut mpsc::UnboundedReceiver<LobbyEvent>) -> LobbyEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn test_websocket_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();

        ws.send(Message::text(HELLO)).await.unwrap();

        // The client's first frame is its ping
        let ping = loop {
            match ws.next().await {
                Some(Ok(msg)) if msg.is_text() => break msg.into_text().unwrap().to_string(),
                Some(Ok(_)) => continue,
                other => panic!("Expected a text frame, got {:?}", other),
            }
        };

        ws.send(Message::text(SAY)).await.unwrap();
        ws.close(None).await.unwrap();
        ping
    });

    let (tx, mut events) = mpsc::unbounded_channel();
    let config = ClientConfig::new(format!("ws://{}", addr)).with_lobby_code("ABCD");
    let client = LobbyClient::new(config, tx);

    assert_eq!(
        next_event(&mut events).await,
        LobbyEvent::StatusChanged(ConnectionStatus::Connecting)
    );
    assert_eq!(
        next_event(&mut events).await,
        LobbyEvent::StatusChanged(ConnectionStatus::Connected)
    );
    assert!(matches!(
        next_event(&mut events).await,
        LobbyEvent::Message(OutgoingMessage::Hello { .. })
    ));

    let state = client.snapshot().await;
    assert_eq!(state.lobby_code.as_deref(), Some("ABCD"));
    assert_eq!(state.our_player_num, Some(2));
    assert_eq!(
        state.me(),
        Some(&PlayerInfo::new(2, "Bob").with_property("color", "red"))
    );
    assert_eq!(state.lobby_properties.get("mode").map(String::as_str), Some("casual"));

    client.ping().await;

    assert_eq!(
        next_event(&mut events).await,
        LobbyEvent::Message(OutgoingMessage::Say {
            text: "hi".into(),
            date: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            from_player_num: 1,
        })
    );
    assert_eq!(
        next_event(&mut events).await,
        LobbyEvent::StatusChanged(ConnectionStatus::NotConnected)
    );
    assert_eq!(next_event(&mut events).await, LobbyEvent::Disconnected);

    let ping = timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(ping, r#"{"ping":{}}"#);
}
