//! Bracket error types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::models::{EntrantRef, EventId, MatchId, UserId};

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Operation exceeded its transaction deadline
    #[error("Bracket operation timed out after {0:?}")]
    Timeout(Duration),

    /// Event not found
    #[error("Event {0} not found")]
    EventNotFound(EventId),

    /// Match not found
    #[error("Match {0} not found")]
    MatchNotFound(MatchId),

    /// Inscription not found for an entrant that should hold one
    #[error("No participant inscription for entrant {entrant} in event {event_id}")]
    InscriptionNotFound { event_id: EventId, entrant: EntrantRef },

    /// Caller is neither the event owner nor an admin
    #[error("User {0} is not the event owner or an admin")]
    NotOwner(UserId),

    /// Bracket already seeded (or matches already exist)
    #[error("Event {0} has already started")]
    EventAlreadyStarted(EventId),

    /// Resolution requested before the bracket was seeded
    #[error("Event {0} has not started")]
    EventNotStarted(EventId),

    /// Seeding requested before the event's start date
    #[error("Event {event_id} does not start until {starts_at}")]
    NotStartableYet {
        event_id: EventId,
        starts_at: DateTime<Utc>,
    },

    /// Fewer than two confirmed entrants
    #[error("Not enough confirmed entrants: need at least 2, have {have}")]
    InsufficientEntrants { have: usize },

    /// Field size does not form a full bracket
    #[error("Entrant count must be an exact power of two, have {have}")]
    InvalidEntrantCount { have: usize },

    /// Winner already recorded for this match
    #[error("Match {0} has already been decided")]
    MatchAlreadyDecided(MatchId),

    /// Half-filled match cannot be decided
    #[error("Match {0} is still waiting for an opponent and cannot be decided")]
    SingleEntrantMatch(MatchId),

    /// Declared winner occupies neither slot
    #[error("Entrant {winner} is not in match {match_id}")]
    InvalidWinner { match_id: MatchId, winner: EntrantRef },

    /// Advancement slot was taken by a concurrent resolution
    #[error("Match {0} has no open slot left")]
    SlotAlreadyFilled(MatchId),
}

/// Coarse classification used by transports to map errors onto status codes
/// and by callers to decide whether a retry can ever succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is malformed for the current bracket shape
    Validation,
    /// Caller lacks the owner-or-admin privilege
    Authorization,
    /// Valid request rejected by current state (already started, already decided, lost race)
    Conflict,
    /// Referenced record does not exist
    NotFound,
    /// Storage failure or deadline; the whole transaction was rolled back
    Persistence,
}

impl ErrorKind {
    /// Stable lowercase label for logs and response bodies
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Persistence => "persistence",
        }
    }
}

impl BracketError {
    /// Classify the error for transport mapping and retry policy
    pub fn kind(&self) -> ErrorKind {
        match self {
            BracketError::Database(_) | BracketError::Timeout(_) => ErrorKind::Persistence,
            BracketError::EventNotFound(_)
            | BracketError::MatchNotFound(_)
            | BracketError::InscriptionNotFound { .. } => ErrorKind::NotFound,
            BracketError::NotOwner(_) => ErrorKind::Authorization,
            BracketError::EventAlreadyStarted(_)
            | BracketError::EventNotStarted(_)
            | BracketError::NotStartableYet { .. }
            | BracketError::MatchAlreadyDecided(_)
            | BracketError::SlotAlreadyFilled(_) => ErrorKind::Conflict,
            BracketError::InsufficientEntrants { .. }
            | BracketError::InvalidEntrantCount { .. }
            | BracketError::SingleEntrantMatch(_)
            | BracketError::InvalidWinner { .. } => ErrorKind::Validation,
        }
    }

    /// Whether retrying the whole operation can ever succeed.
    ///
    /// Only persistence failures qualify; every other kind is deterministic
    /// and will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Persistence
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Storage errors are sanitized to prevent information disclosure about
    /// the internal system structure.
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Database(_) | BracketError::Timeout(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
