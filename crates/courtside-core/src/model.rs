// Identifiers, players, recorded events and game configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Roster-assigned player identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FoulId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FoulId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// A player on the team roster. Supplied by the roster collaborator at game
/// start and never mutated by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Jersey number. Kept as text so "0" and "00" stay distinct.
    pub number: String,
    pub name: String,
}

impl Player {
    pub fn new(id: u32, number: impl Into<String>, name: impl Into<String>) -> Self {
        Player {
            id: PlayerId(id),
            number: number.into(),
            name: name.into(),
        }
    }

    /// Short display label, e.g. `#23 Jordan`.
    pub fn label(&self) -> String {
        format!("#{} {}", self.number, self.name)
    }
}

// ---------------------------------------------------------------------------
// Recorded events
// ---------------------------------------------------------------------------

/// One recorded transition of players entering and leaving the court.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionEvent {
    pub id: EventId,
    pub period_id: PeriodId,
    /// Insertion order within the period. Assigned once when the event is
    /// recorded; edits never change it.
    pub sequence: u64,
    /// Seconds remaining on the period clock when the substitution happened.
    pub event_time: u32,
    pub subbed_in: Vec<Player>,
    pub subbed_out: Vec<Player>,
}

impl SubstitutionEvent {
    pub fn involves(&self, player: PlayerId) -> bool {
        self.subbed_in.iter().any(|p| p.id == player)
            || self.subbed_out.iter().any(|p| p.id == player)
    }
}

/// A personal foul. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Foul {
    pub id: FoulId,
    pub player: Player,
    pub period_id: PeriodId,
    pub time_remaining: u32,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Longest period a game may be configured with.
pub const MAX_PERIOD_LENGTH_MINUTES: u32 = 60;

/// How the game is divided into periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameFormat {
    /// Number of regulation periods (4 quarters, 2 halves, ...).
    pub periods: u32,
    pub period_length_minutes: u32,
}

impl GameFormat {
    pub fn period_length_secs(&self) -> u32 {
        self.period_length_minutes.saturating_mul(60)
    }
}

impl Default for GameFormat {
    fn default() -> Self {
        GameFormat {
            periods: 2,
            period_length_minutes: 20,
        }
    }
}

/// Limits enforced or reported by the core. Missing fields fall back to
/// the defaults below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Hard cap on players on court at any committed state.
    pub max_on_court: usize,
    /// Cumulative personal fouls at which a player is reported fouled out.
    pub foul_limit: u32,
    /// Team fouls in a period at which the opponent shoots bonus free throws.
    pub bonus_threshold: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        GameRules {
            max_on_court: 5,
            foul_limit: 5,
            bonus_threshold: 5,
        }
    }
}
