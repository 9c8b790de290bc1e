//! Connection status

use std::fmt;

/// Where the client's connection to the lobby server currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No transport, initial state
    #[default]
    NotConnected,
    /// Transport attempt in flight
    Connecting,
    /// Transport open, receive loop running
    Connected,
    /// Transport attempt in flight, entered through a caller-level reconnect
    Reconnecting,
    /// Transport or protocol failure
    Failed(Option<String>),
}

impl ConnectionStatus {
    /// Statuses in which the receive loop keeps re-arming
    pub fn is_listening(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Reconnecting)
    }

    /// Check if currently connected
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if the last session ended in failure
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Build a failure status from any displayable reason
    pub fn failed(reason: impl fmt::Display) -> Self {
        Self::Failed(Some(reason.to_string()))
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Failed(Some(reason)) => write!(f, "failed: {}", reason),
            Self::Failed(None) => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listening_set() {
        assert!(ConnectionStatus::Connecting.is_listening());
        assert!(ConnectionStatus::Connected.is_listening());
        assert!(ConnectionStatus::Reconnecting.is_listening());
        assert!(!ConnectionStatus::NotConnected.is_listening());
        assert!(!ConnectionStatus::failed("boom").is_listening());
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionStatus::failed("reset").to_string(), "failed: reset");
        assert_eq!(ConnectionStatus::Failed(None).to_string(), "failed");
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::NotConnected);
    }
}
