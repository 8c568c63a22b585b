// ABOUTME: Connection status and event vocabulary shared by connection helpers and observers.
// ABOUTME: ConnectionStatusTracker maps helper events onto the status state machine.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

/// Transport connection health as reported by a connection helper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionHelperStatus {
    NeverStarted,
    Starting,
    Connected,
    ConnectionLost,
    Ended,
}

impl ConnectionHelperStatus {
    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended)
    }
}

impl std::fmt::Display for ConnectionHelperStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NeverStarted => write!(f, "NeverStarted"),
            Self::Starting => write!(f, "Starting"),
            Self::Connected => write!(f, "Connected"),
            Self::ConnectionLost => write!(f, "ConnectionLost"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}

/// Events a connection helper and its observers agree on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConnectionHelperEvent {
    ConnectionLost { reason: String },
    ConnectionGained { reason: String },
    Ended { reason: String },
    IncomingMessage { payload_string: String },
}

impl ConnectionHelperEvent {
    pub fn connection_lost(reason: impl Into<String>) -> Self {
        Self::ConnectionLost {
            reason: reason.into(),
        }
    }

    pub fn connection_gained(reason: impl Into<String>) -> Self {
        Self::ConnectionGained {
            reason: reason.into(),
        }
    }

    pub fn ended(reason: impl Into<String>) -> Self {
        Self::Ended {
            reason: reason.into(),
        }
    }

    pub fn incoming_message(payload: impl Into<String>) -> Self {
        Self::IncomingMessage {
            payload_string: payload.into(),
        }
    }

    /// Event name as used on the wire and in logs
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::ConnectionLost { .. } => "ConnectionLost",
            Self::ConnectionGained { .. } => "ConnectionGained",
            Self::Ended { .. } => "Ended",
            Self::IncomingMessage { .. } => "IncomingMessage",
        }
    }
}

/// Transport bootstrapping strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionInfoType {
    Websocket,
    ConnectionCredentials,
}

impl std::fmt::Display for ConnectionInfoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Websocket => write!(f, "WEBSOCKET"),
            Self::ConnectionCredentials => write!(f, "CONNECTION_CREDENTIALS"),
        }
    }
}

impl std::str::FromStr for ConnectionInfoType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WEBSOCKET" => Ok(Self::Websocket),
            "CONNECTION_CREDENTIALS" => Ok(Self::ConnectionCredentials),
            _ => anyhow::bail!("Unknown connection info type: {}", s),
        }
    }
}

/// Tracks a helper's status and rebroadcasts its events.
///
/// Status flows NeverStarted -> Starting -> {Connected <-> ConnectionLost} -> Ended.
/// Once Ended, every later event is dropped.
pub struct ConnectionStatusTracker {
    status_tx: watch::Sender<ConnectionHelperStatus>,
    events_tx: broadcast::Sender<ConnectionHelperEvent>,
}

impl ConnectionStatusTracker {
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(ConnectionHelperStatus::NeverStarted);
        let (events_tx, _) = broadcast::channel(64);
        Self {
            status_tx,
            events_tx,
        }
    }

    pub fn status(&self) -> ConnectionHelperStatus {
        *self.status_tx.borrow()
    }

    /// Watch status changes
    pub fn watch(&self) -> watch::Receiver<ConnectionHelperStatus> {
        self.status_tx.subscribe()
    }

    /// Receive every accepted event
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionHelperEvent> {
        self.events_tx.subscribe()
    }

    /// Move NeverStarted -> Starting. Returns false if already past NeverStarted.
    pub fn mark_starting(&self) -> bool {
        self.status_tx.send_if_modified(|status| {
            if *status == ConnectionHelperStatus::NeverStarted {
                *status = ConnectionHelperStatus::Starting;
                true
            } else {
                false
            }
        })
    }

    /// Apply an event, returning the status after it was applied,
    /// or None if the event was rejected.
    ///
    /// The transition is decided and written under the watch channel's lock,
    /// so a concurrent Ended can never be overwritten.
    pub fn apply(&self, event: ConnectionHelperEvent) -> Option<ConnectionHelperStatus> {
        let mut outcome = None;
        self.status_tx.send_if_modified(|status| {
            let current = *status;
            let Some(next) = Self::transition(&event, current) else {
                tracing::debug!(
                    event = event.event_name(),
                    status = %current,
                    "Dropping connection event in current status"
                );
                return false;
            };

            // Sent while the status lock is held so subscribers see events
            // in the order their transitions were applied. No receivers is fine.
            let _ = self.events_tx.send(event.clone());
            outcome = Some(next);

            if next == current {
                return false;
            }
            tracing::info!(from = %current, to = %next, "Connection status changed");
            *status = next;
            true
        });
        outcome
    }

    fn transition(
        event: &ConnectionHelperEvent,
        current: ConnectionHelperStatus,
    ) -> Option<ConnectionHelperStatus> {
        match (event, current) {
            (_, ConnectionHelperStatus::Ended) => None,
            (_, ConnectionHelperStatus::NeverStarted) => None,
            (ConnectionHelperEvent::ConnectionGained { .. }, _) => {
                Some(ConnectionHelperStatus::Connected)
            }
            (ConnectionHelperEvent::ConnectionLost { .. }, _) => {
                Some(ConnectionHelperStatus::ConnectionLost)
            }
            (ConnectionHelperEvent::Ended { .. }, _) => Some(ConnectionHelperStatus::Ended),
            (ConnectionHelperEvent::IncomingMessage { .. }, status) => Some(status),
        }
    }
}

impl Default for ConnectionStatusTracker {
    fn default() -> Self {
        Self::new()
    }
}
