use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use crate::identity::Address;
use crate::protocol::ProtocolClient;

/// A long-lived protocol identity for one wallet address.
pub struct Session {
    pub identity: Address,
    pub client: Arc<dyn ProtocolClient>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(identity: Address, client: Arc<dyn ProtocolClient>) -> Self {
        Self {
            identity,
            client,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Lifecycle state of the active identity's session.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// No session requested (or the last request was cancelled).
    #[default]
    Absent,
    /// Client construction is in flight.
    Initializing { identity: Address },
    /// A client is cached and usable.
    Ready { session: Arc<Session> },
    /// Construction failed; stays until the user retries.
    Error { identity: Address, message: String },
}

impl SessionState {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn is_initializing(&self) -> bool {
        matches!(self, Self::Initializing { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn session(&self) -> Option<&Arc<Session>> {
        match self {
            Self::Ready { session } => Some(session),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Initializing { .. } => "initializing",
            Self::Ready { .. } => "ready",
            Self::Error { .. } => "error",
        }
    }
}

/// Result of a successful [`SessionManager::initialize`](super::SessionManager::initialize) call.
#[derive(Debug, Clone)]
pub enum InitOutcome {
    /// A session is Ready (freshly built or from the store).
    Ready(Arc<Session>),
    /// Construction for this identity is already in flight; nothing was done.
    InFlight,
    /// The user dismissed the wallet prompt; state went back to Absent.
    Cancelled,
}

impl InitOutcome {
    pub fn session(&self) -> Option<&Arc<Session>> {
        match self {
            Self::Ready(session) => Some(session),
            _ => None,
        }
    }
}
