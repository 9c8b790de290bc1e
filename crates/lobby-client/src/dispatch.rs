//! Observer notifications
//!
//! Every notification goes through one queue drained by one task that owns
//! the observer, so callbacks never overlap and arrive in the order they were
//! raised.

use lobby_core::{ConnectionStatus, OutgoingMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Something the client reports to its observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyEvent {
    /// Connection status changed
    StatusChanged(ConnectionStatus),
    /// A server message was applied to the mirrored state
    Message(OutgoingMessage),
    /// The transport was closed
    Disconnected,
}

/// Receives client notifications.
///
/// Callbacks run one at a time on the client's dispatcher task. Keep them
/// short; a slow callback delays every later notification.
pub trait LobbyObserver: Send + 'static {
    /// A server message arrived; the mirrored state already reflects it
    fn on_message(&mut self, _message: &OutgoingMessage) {}

    /// The transport was closed
    fn on_disconnect(&mut self) {}

    /// The connection status changed
    fn on_status_change(&mut self, _status: &ConnectionStatus) {}
}

/// Forward notifications into a channel as [`LobbyEvent`]s
impl LobbyObserver for mpsc::UnboundedSender<LobbyEvent> {
    fn on_message(&mut self, message: &OutgoingMessage) {
        let _ = self.send(LobbyEvent::Message(message.clone()));
    }

    fn on_disconnect(&mut self) {
        let _ = self.send(LobbyEvent::Disconnected);
    }

    fn on_status_change(&mut self, status: &ConnectionStatus) {
        let _ = self.send(LobbyEvent::StatusChanged(status.clone()));
    }
}

impl LobbyObserver for Box<dyn LobbyObserver> {
    fn on_message(&mut self, message: &OutgoingMessage) {
        (**self).on_message(message);
    }

    fn on_disconnect(&mut self) {
        (**self).on_disconnect();
    }

    fn on_status_change(&mut self, status: &ConnectionStatus) {
        (**self).on_status_change(status);
    }
}

/// Queue side of the dispatcher
#[derive(Clone)]
pub(crate) struct Dispatcher {
    tx: mpsc::UnboundedSender<LobbyEvent>,
}

impl Dispatcher {
    /// Spawn the delivery task for `observer`
    pub(crate) fn spawn<O: LobbyObserver>(observer: O) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(deliver(observer, rx));
        (Self { tx }, handle)
    }

    /// Queue a notification. Never blocks.
    pub(crate) fn notify(&self, event: LobbyEvent) {
        if self.tx.send(event).is_err() {
            debug!("Dispatcher task gone, dropping notification");
        }
    }
}

async fn deliver<O: LobbyObserver>(mut observer: O, mut rx: mpsc::UnboundedReceiver<LobbyEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            LobbyEvent::StatusChanged(status) => observer.on_status_change(&status),
            LobbyEvent::Message(message) => observer.on_message(&message),
            LobbyEvent::Disconnected => observer.on_disconnect(),
        }
    }
    debug!("Dispatcher queue closed, delivery task exiting");
}
