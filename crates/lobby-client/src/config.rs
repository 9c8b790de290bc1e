//! Client configuration

/// Default lobby server when none is configured
pub const DEFAULT_SERVER: &str = "ws://127.0.0.1:8080";

/// Where to connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server base URL, e.g. `wss://lobby.example.com`
    pub server: String,
    /// Lobby to join; `None` asks the server for a new lobby
    pub lobby_code: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.into(),
            lobby_code: None,
        }
    }
}

impl ClientConfig {
    /// Configuration for `server`, creating a new lobby
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            lobby_code: None,
        }
    }

    /// Join an existing lobby
    #[must_use]
    pub fn with_lobby_code(mut self, lobby_code: impl Into<String>) -> Self {
        self.lobby_code = Some(lobby_code.into());
        self
    }

    /// Session endpoint: `<server>/ws[/<lobby_code>]`
    pub fn endpoint(&self) -> String {
        let base = self.server.trim_end_matches('/');
        match self.lobby_code.as_deref() {
            Some(code) if !code.is_empty() => format!("{}/ws/{}", base, code),
            _ => format!("{}/ws", base),
        }
    }
}
