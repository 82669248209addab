//! Session lifecycle events.

use serde::{Deserialize, Serialize};

use clinica_core::Identity;

use crate::Event;

/// Topics of the session event family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionTopic {
    UserUpdated,
    UserLoggedOut,
}

impl SessionTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionTopic::UserUpdated => "user:updated",
            SessionTopic::UserLoggedOut => "user:loggedOut",
        }
    }
}

/// Events published by the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The identity changed; carries a full copy of the new state.
    UserUpdated { identity: Identity },

    /// The session was reset to the unauthenticated state.
    UserLoggedOut,
}

impl Event for SessionEvent {
    type Topic = SessionTopic;

    fn topic(&self) -> SessionTopic {
        match self {
            SessionEvent::UserUpdated { .. } => SessionTopic::UserUpdated,
            SessionEvent::UserLoggedOut => SessionTopic::UserLoggedOut,
        }
    }

    fn event_type(&self) -> &'static str {
        self.topic().as_str()
    }
}
