//! Error taxonomy for room operations.
//!
//! None of these are fatal: each one rejects a single intent, leaves the room
//! untouched, and is reported back to the originating connection.

use crate::protocol::ServerMessage;
use crate::types::GameId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoomError {
    /// A non-host attempted a host-only intent, or acted for someone else
    #[error("{0}")]
    Unauthorized(String),

    /// The intent is valid but the room is not in a state that allows it
    #[error("{0}")]
    Precondition(String),

    /// Malformed input (empty label, blank vote, unreadable backlog)
    #[error("{0}")]
    Validation(String),

    #[error("Game {0} does not exist")]
    GameNotFound(GameId),

    #[error("Game {0} has ended")]
    GameEnded(GameId),

    #[error("Game is full ({max} players)")]
    GameFull { max: u32 },

    #[error("Join the game before sending this message")]
    NotJoined,

    #[error("Failed to export results: {0}")]
    Export(String),
}

impl RoomError {
    pub fn host_only(action: &str) -> Self {
        RoomError::Unauthorized(format!("Only the host can {}", action))
    }

    /// Stable code sent to clients in `error` messages
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::Unauthorized(_) => "UNAUTHORIZED",
            RoomError::Precondition(_) => "PRECONDITION_FAILED",
            RoomError::Validation(_) => "VALIDATION_FAILED",
            RoomError::GameNotFound(_) => "GAME_NOT_FOUND",
            RoomError::GameEnded(_) => "GAME_ENDED",
            RoomError::GameFull { .. } => "GAME_FULL",
            RoomError::NotJoined => "NOT_JOINED",
            RoomError::Export(_) => "EXPORT_FAILED",
        }
    }
}

impl From<RoomError> for ServerMessage {
    fn from(e: RoomError) -> Self {
        ServerMessage::Error {
            code: e.code().to_string(),
            message: e.to_string(),
        }
    }
}
