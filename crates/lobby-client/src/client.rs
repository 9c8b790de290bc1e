//! Lobby client handle

use crate::config::ClientConfig;
use crate::dispatch::{Dispatcher, LobbyObserver};
use crate::session::{LOG_PREVIEW_CHARS, Shared, run_session};
use crate::transport::Connector;
use crate::ws::WebSocketConnector;
use lobby_core::{
    ConnectionStatus, IncomingMessage, ListRecord, Lists, LobbyError, LobbyState, PlayerInfo,
    PlayerNum, Properties, Result, encode,
};
use std::sync::Arc;
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Handle to the running session task
struct SessionHandle {
    id: u64,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Ask the session to close its transport
    fn cancel(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Client for one lobby.
///
/// Connecting starts as soon as the client is built. Server messages are
/// applied to a local [`LobbyState`] mirror and then reported to the
/// [`LobbyObserver`]. Failures are reported through status changes, never as
/// results of unrelated calls.
///
/// Must be created inside a tokio runtime.
pub struct LobbyClient {
    shared: Arc<Shared>,
    session: Mutex<Option<SessionHandle>>,
    _dispatcher: JoinHandle<()>,
}

impl LobbyClient {
    /// Connect to a lobby server over WebSocket
    pub fn new(config: ClientConfig, observer: impl LobbyObserver) -> Self {
        Self::with_connector(config, WebSocketConnector, observer)
    }

    /// Connect through a custom transport
    pub fn with_connector(
        config: ClientConfig,
        connector: impl Connector,
        observer: impl LobbyObserver,
    ) -> Self {
        let (events, dispatcher) = Dispatcher::spawn(observer);
        let shared = Arc::new(Shared::new(config.endpoint(), Arc::new(connector), events));
        let session = spawn_session(&shared, ConnectionStatus::Connecting);

        Self {
            shared,
            session: Mutex::new(Some(session)),
            _dispatcher: dispatcher,
        }
    }

    /// Open a fresh transport, replacing any current one
    pub async fn connect(&self) {
        self.start(ConnectionStatus::Connecting).await;
    }

    /// Like [`connect`](Self::connect), but reported as `Reconnecting`.
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::LobbyNotFound`] once the server has said the
    /// lobby does not exist.
    pub async fn reconnect(&self) -> Result<()> {
        if !self.reconnect_allowed() {
            return Err(LobbyError::LobbyNotFound);
        }
        self.start(ConnectionStatus::Reconnecting).await;
        Ok(())
    }

    async fn start(&self, initial: ConnectionStatus) {
        let mut guard = self.session.lock().await;
        let next = spawn_session(&self.shared, initial);
        if let Some(mut previous) = guard.replace(next) {
            debug!("Session {} superseded", previous.id);
            previous.cancel();
        }
    }

    /// Close the transport.
    ///
    /// The status changes to `NotConnected` once the session has actually
    /// closed, not when this returns.
    pub async fn disconnect(&self) {
        info!("Disconnecting from {}", self.shared.endpoint);
        if let Some(session) = self.session.lock().await.as_mut() {
            session.cancel();
        }
    }

    /// Send a message to the server.
    ///
    /// A failed write is fatal to the connection: the status becomes
    /// `Failed` and the transport is closed. Messages sent while no transport
    /// is open are dropped, and so is a write still pending when the
    /// connection ends.
    pub async fn send(&self, message: IncomingMessage) {
        let frame = match encode(&message) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode {}: {}", message.kind(), e);
                let session = self.shared.current_session();
                self.fail_session(session, ConnectionStatus::failed(e)).await;
                return;
            }
        };

        debug!(
            "[client→server] {} len={} json={}",
            message.kind(),
            frame.len(),
            frame.preview(LOG_PREVIEW_CHARS)
        );

        let (session, err) = {
            let mut guard = self.shared.writer.lock().await;
            let Some(current) = guard.as_mut() else {
                warn!("Not connected, dropping {}", message.kind());
                return;
            };
            let session = current.session;
            // A stalled write must not keep the session from closing
            let written = tokio::select! {
                written = current.writer.write_frame(frame) => written,
                _ = self.shared.session_ended(session) => {
                    debug!("Session {} ended, abandoning {}", session, message.kind());
                    return;
                }
            };
            match written {
                Ok(()) => return,
                Err(e) => (session, e),
            }
        };

        error!("Failed to send {}: {}", message.kind(), err);
        self.fail_session(session, ConnectionStatus::failed(err)).await;
    }

    async fn fail_session(&self, session: u64, status: ConnectionStatus) {
        self.shared.transition(session, status);
        if let Some(handle) = self.session.lock().await.as_mut() {
            if handle.id == session {
                handle.cancel();
            }
        }
    }

    // State accessors

    /// Endpoint this client connects to
    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    /// Current connection status
    pub fn connection_status(&self) -> ConnectionStatus {
        self.shared.status()
    }

    /// Watch status changes without going through the observer
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.subscribe_status()
    }

    /// False once the server has reported `lobbyNotFound`
    pub fn reconnect_allowed(&self) -> bool {
        !self.shared.lobby_gone()
    }

    /// Copy of the whole mirror
    pub async fn snapshot(&self) -> LobbyState {
        self.shared.state.read().await.clone()
    }

    pub async fn players(&self) -> Vec<PlayerInfo> {
        self.shared.state.read().await.players.clone()
    }

    pub async fn lobby_properties(&self) -> Properties {
        self.shared.state.read().await.lobby_properties.clone()
    }

    pub async fn lists(&self) -> Lists {
        self.shared.state.read().await.lists.clone()
    }

    pub async fn lobby_code(&self) -> Option<String> {
        self.shared.state.read().await.lobby_code.clone()
    }

    pub async fn our_player_num(&self) -> Option<PlayerNum> {
        self.shared.state.read().await.our_player_num
    }

    // Message helpers

    pub async fn ping(&self) {
        self.send(IncomingMessage::Ping {}).await;
    }

    pub async fn say(&self, text: impl Into<String>) {
        self.send(IncomingMessage::Say { text: text.into() }).await;
    }

    pub async fn direct_say(&self, text: impl Into<String>, to_player: PlayerNum) {
        self.send(IncomingMessage::DirectSay {
            text: text.into(),
            to_player,
        })
        .await;
    }

    pub async fn set_player_name(&self, name: impl Into<String>) {
        self.send(IncomingMessage::SetPlayerName { name: name.into() })
            .await;
    }

    /// Merged into our properties by the server
    pub async fn set_player_properties(&self, properties: Properties) {
        self.send(IncomingMessage::SetPlayerProperties { properties })
            .await;
    }

    /// Merged into the lobby properties by the server
    pub async fn set_lobby_properties(&self, properties: Properties) {
        self.send(IncomingMessage::SetLobbyProperties { properties })
            .await;
    }

    pub async fn broadcast(&self, data: Properties) {
        self.send(IncomingMessage::Broadcast { data }).await;
    }

    /// Owner only
    pub async fn kick(&self, player_num: PlayerNum) {
        self.send(IncomingMessage::Kick { player_num }).await;
    }

    pub async fn vote_kick(&self, player_num: PlayerNum) {
        self.send(IncomingMessage::VoteKick { player_num }).await;
    }

    /// Owner only
    pub async fn transfer_owner(&self, player_num: PlayerNum) {
        self.send(IncomingMessage::TransferOwner { player_num })
            .await;
    }

    /// Run a server-side script action
    pub async fn action(&self, name: impl Into<String>, params: Properties) {
        self.send(IncomingMessage::Action {
            name: name.into(),
            params,
        })
        .await;
    }

    pub async fn add_to_list(&self, name: impl Into<String>, value: ListRecord) {
        self.send(IncomingMessage::AddToList {
            name: name.into(),
            value,
        })
        .await;
    }

    pub async fn reset_list(&self, name: impl Into<String>) {
        self.send(IncomingMessage::ResetList { name: name.into() })
            .await;
    }
}

fn spawn_session(shared: &Arc<Shared>, initial: ConnectionStatus) -> SessionHandle {
    let id = shared.begin_session(initial);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(run_session(Arc::clone(shared), id, shutdown_rx));
    SessionHandle {
        id,
        shutdown: Some(shutdown_tx),
        task,
    }
}

impl std::fmt::Debug for LobbyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobbyClient")
            .field("endpoint", &self.shared.endpoint)
            .field("status", &self.connection_status())
            .finish()
    }
}

impl Drop for LobbyClient {
    fn drop(&mut self) {
        // No runtime to drive a clean close from here; dropping the task drops
        // the transport.
        if let Some(session) = self.session.get_mut().take() {
            session.task.abort();
        }
    }
}
