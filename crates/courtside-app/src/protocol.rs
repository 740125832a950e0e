// Messages passed between the input reader, the app event loop, and the
// output printer.

use std::sync::Arc;

use courtside_core::{EventId, GameEvent, GameSnapshot};

/// A parsed console command. Players are still addressed by jersey number;
/// the event loop resolves them against the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    StartClock,
    PauseClock,
    /// Seconds to add (positive) or remove (negative). Clock must be paused.
    AdjustClock(i64),
    /// Record a substitution in the current period. `at` defaults to the
    /// time on the clock.
    Substitute {
        subbed_in: Vec<String>,
        subbed_out: Vec<String>,
        at: Option<u32>,
    },
    EditSubstitution {
        event_id: EventId,
        at: Option<u32>,
        subbed_in: Option<Vec<String>>,
        subbed_out: Option<Vec<String>>,
    },
    DeleteSubstitution(EventId),
    Foul(String),
    EndPeriod,
    ShowStatus,
    ShowBoxScore,
    ListGames,
    Help,
    Quit,
}

/// Output from the event loop to the printer.
#[derive(Debug, Clone)]
pub enum UiUpdate {
    /// A game command was accepted.
    Applied {
        event: GameEvent,
        snapshot: Arc<GameSnapshot>,
    },
    /// A game command was refused; the game is unchanged.
    Rejected(String),
    Status(Arc<GameSnapshot>),
    BoxScore(Arc<GameSnapshot>),
    /// Free-form text (help, saved game list, ...).
    Message(String),
}
