//! Connection sessions and the receive loop
//!
//! A session is one transport attempt: open the transport, then read frames
//! until the connection closes, fails, or is cancelled. Sessions are numbered;
//! once a newer session has started, an older one can no longer change the
//! status, the mirrored state, or notify the observer.

use crate::dispatch::{Dispatcher, LobbyEvent};
use crate::transport::{Connector, FrameReader, FrameWriter};
use lobby_core::{Applied, ConnectionStatus, Frame, LobbyState, decode};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock, oneshot, watch};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Longest payload excerpt written to debug logs
pub(crate) const LOG_PREVIEW_CHARS: usize = 200;

/// How long a closing session waits for the transport's close handshake
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Writer half of the transport, tagged with the session that opened it
pub(crate) struct SessionWriter {
    pub(crate) session: u64,
    pub(crate) writer: Box<dyn FrameWriter>,
}

/// State shared between the client handle and its session task
pub(crate) struct Shared {
    pub(crate) endpoint: String,
    connector: Arc<dyn Connector>,
    /// Mirrored lobby, written only by the receive loop
    pub(crate) state: RwLock<LobbyState>,
    status: watch::Sender<ConnectionStatus>,
    lobby_gone: AtomicBool,
    generation: AtomicU64,
    pub(crate) writer: Mutex<Option<SessionWriter>>,
    events: Dispatcher,
}

impl Shared {
    pub(crate) fn new(endpoint: String, connector: Arc<dyn Connector>, events: Dispatcher) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::NotConnected);
        Self {
            endpoint,
            connector,
            state: RwLock::new(LobbyState::new()),
            status,
            lobby_gone: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            writer: Mutex::new(None),
            events,
        }
    }

    pub(crate) fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    pub(crate) fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    pub(crate) fn current_session(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_current(&self, session: u64) -> bool {
        self.current_session() == session
    }

    /// True once the server has said the lobby does not exist
    pub(crate) fn lobby_gone(&self) -> bool {
        self.lobby_gone.load(Ordering::SeqCst)
    }

    /// Start a new session in `initial` status and return its number.
    /// Older sessions become stale from this point on.
    pub(crate) fn begin_session(&self, initial: ConnectionStatus) -> u64 {
        let mut session = 0;
        self.status.send_modify(|current| {
            session = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if *current != initial {
                *current = initial.clone();
                self.events.notify(LobbyEvent::StatusChanged(initial.clone()));
            }
        });
        info!("Session {} started ({})", session, initial);
        session
    }

    /// Move to `status` on behalf of `session`.
    ///
    /// Ignored for stale sessions and when nothing changes; otherwise the
    /// observer is notified while the status is still locked, so notifications
    /// follow the order of the transitions.
    pub(crate) fn transition(&self, session: u64, status: ConnectionStatus) -> bool {
        let changed = self.status.send_if_modified(|current| {
            if !self.is_current(session) || *current == status {
                return false;
            }
            *current = status.clone();
            self.events.notify(LobbyEvent::StatusChanged(status.clone()));
            true
        });
        if changed {
            info!("Connection status: {}", status);
        }
        changed
    }

    /// Resolves once `session` can no longer carry traffic: a newer session
    /// started or the status left the listening set.
    pub(crate) async fn session_ended(&self, session: u64) {
        let mut status = self.status.subscribe();
        let _ = status
            .wait_for(|current| !self.is_current(session) || !current.is_listening())
            .await;
    }

    /// Queue `event` if `session` is still current. The check and the queueing
    /// happen under the status lock, so nothing is queued for a session after
    /// a newer one has announced itself.
    fn notify_current(&self, session: u64, event: LobbyEvent) -> bool {
        let mut event = Some(event);
        self.status.send_if_modified(|_| {
            if self.is_current(session) {
                if let Some(queued) = event.take() {
                    self.events.notify(queued);
                }
            }
            false
        });
        event.is_none()
    }

    /// Transport closed: back to NotConnected unless a failure is already
    /// recorded, then tell the observer.
    fn closed(&self, session: u64) {
        let mut notify = false;
        self.status.send_if_modified(|current| {
            if !self.is_current(session) {
                return false;
            }
            notify = true;
            if !current.is_listening() {
                return false;
            }
            *current = ConnectionStatus::NotConnected;
            self.events
                .notify(LobbyEvent::StatusChanged(ConnectionStatus::NotConnected));
            true
        });
        if notify {
            info!("Disconnected from {}", self.endpoint);
            self.events.notify(LobbyEvent::Disconnected);
        }
    }

    /// Take the writer if it still belongs to `session`
    async fn take_writer(&self, session: u64) -> Option<Box<dyn FrameWriter>> {
        let mut guard = self.writer.lock().await;
        if guard.as_ref().is_some_and(|w| w.session == session) {
            guard.take().map(|w| w.writer)
        } else {
            None
        }
    }

    /// Decode one frame, apply it, then notify the observer.
    /// Undecodable frames are dropped without a notification.
    async fn handle_frame(&self, session: u64, frame: Frame) {
        debug!(
            "[server→client] len={} json={}",
            frame.len(),
            frame.preview(LOG_PREVIEW_CHARS)
        );

        let message = match decode(&frame) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping undecodable frame: {}", e);
                return;
            }
        };
        let kind = message.kind();

        let applied = {
            let mut state = self.state.write().await;
            if !self.is_current(session) {
                debug!("Session {} is stale, ignoring {}", session, kind);
                return;
            }
            state.apply(&message)
        };
        debug!("Applied {}: {:?}", kind, applied);

        let lobby_gone = applied == Applied::LobbyNotFound;
        if lobby_gone {
            warn!("Lobby not found at {}, reconnecting is disabled", self.endpoint);
            self.lobby_gone.store(true, Ordering::SeqCst);
        }

        if !self.notify_current(session, LobbyEvent::Message(message)) {
            debug!("Session {} superseded before {} was delivered", session, kind);
            return;
        }

        if lobby_gone {
            self.transition(session, ConnectionStatus::failed("lobby not found"));
        }
    }
}

/// Why the receive loop stopped
#[derive(Debug)]
enum LoopExit {
    /// Cancelled through the session's shutdown signal
    Shutdown,
    /// Status left the listening set
    Stopped,
    /// A newer session took over
    Superseded,
    /// Peer closed the transport
    Closed,
    /// Transport read failed
    Failed(String),
}

/// Run one session: open the transport, then receive until it ends.
///
/// Dropping or firing `shutdown` cancels the session; the transport is closed
/// and the observer learns about it through the usual close path.
pub(crate) async fn run_session(
    shared: Arc<Shared>,
    session: u64,
    mut shutdown: oneshot::Receiver<()>,
) {
    info!("Connecting to {}", shared.endpoint);

    let opened = tokio::select! {
        result = shared.connector.connect(&shared.endpoint) => result,
        _ = &mut shutdown => {
            debug!("Session {} cancelled before the transport opened", session);
            shared.closed(session);
            return;
        }
    };

    let (writer, mut reader) = match opened {
        Ok(halves) => halves,
        Err(e) => {
            error!("Failed to open transport: {}", e);
            shared.transition(session, ConnectionStatus::failed(e));
            return;
        }
    };

    if !shared.is_current(session) {
        debug!("Session {} superseded while connecting", session);
        let mut writer = writer;
        let _ = writer.close().await;
        return;
    }

    *shared.writer.lock().await = Some(SessionWriter { session, writer });
    shared.transition(session, ConnectionStatus::Connected);

    let exit = receive_loop(&shared, session, reader.as_mut(), &mut shutdown).await;
    debug!("Session {} receive loop exited: {:?}", session, exit);

    match exit {
        LoopExit::Failed(reason) => {
            error!("Transport failed: {}", reason);
            shared.transition(session, ConnectionStatus::failed(reason));
            drop(shared.take_writer(session).await);
        }
        // Status goes first: a send stalled on the writer gives up once the
        // session has ended, and only then is the writer released.
        LoopExit::Closed => {
            shared.closed(session);
            drop(shared.take_writer(session).await);
        }
        LoopExit::Shutdown | LoopExit::Stopped => {
            shared.closed(session);
            close_writer(shared.take_writer(session).await).await;
        }
        LoopExit::Superseded => {
            close_writer(shared.take_writer(session).await).await;
        }
    }
}

async fn close_writer(writer: Option<Box<dyn FrameWriter>>) {
    if let Some(mut writer) = writer {
        match tokio::time::timeout(CLOSE_TIMEOUT, writer.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Error closing transport: {}", e),
            Err(_) => debug!("Transport close timed out, dropping it"),
        }
    }
}

/// Read frames while the status stays in the listening set
async fn receive_loop(
    shared: &Shared,
    session: u64,
    reader: &mut dyn FrameReader,
    shutdown: &mut oneshot::Receiver<()>,
) -> LoopExit {
    loop {
        if !shared.is_current(session) {
            return LoopExit::Superseded;
        }
        if !shared.status().is_listening() {
            return LoopExit::Stopped;
        }

        let next = tokio::select! {
            next = reader.read_frame() => next,
            _ = &mut *shutdown => return LoopExit::Shutdown,
        };

        match next {
            Some(Ok(frame)) => shared.handle_frame(session, frame).await,
            Some(Err(e)) => return LoopExit::Failed(e.to_string()),
            None => return LoopExit::Closed,
        }
    }
}
