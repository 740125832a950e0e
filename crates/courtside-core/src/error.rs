// Error types shared by every game-state operation.

use thiserror::Error;

use crate::model::PlayerId;

/// Top-level error returned by game commands.
///
/// Every variant is reported synchronously to the caller; the core never
/// retries or silently recovers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// The caller can fix the request (pick fewer players, choose a player
    /// who is on court, ...).
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The operation is not valid in the game's current state.
    #[error("invalid state: {0}")]
    InvalidState(#[from] InvalidStateError),

    /// The request referenced an id that does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

impl GameError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        GameError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, GameError::Validation(_))
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, GameError::InvalidState(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GameError::NotFound { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("too many players on court: {count} selected, at most {max} allowed")]
    TooManyPlayers { count: usize, max: usize },

    #[error("a substitution must bring at least one player in or out")]
    EmptySubstitution,

    #[error("player {0} cannot be subbed in and out in the same substitution")]
    PlayerInBothLists(PlayerId),

    #[error("player {0} is not on court")]
    PlayerNotOnCourt(PlayerId),

    #[error("event time {time}s is outside the period (0..={max}s)")]
    EventTimeOutOfRange { time: u32, max: u32 },

    #[error("event time {time}s has not been played yet; the clock shows {now}s")]
    EventTimeAhead { time: u32, now: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidStateError {
    #[error("the clock must be paused first")]
    ClockRunning,

    #[error("the game is over")]
    GameOver,

    #[error("period {0} has already ended")]
    PeriodEnded(u32),
}

pub type Result<T> = std::result::Result<T, GameError>;
