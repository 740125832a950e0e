// Game clock and substitution ledger for tracking a basketball team's
// playing time, fouls and periods during a single game.

pub mod boxscore;
pub mod clock;
pub mod error;
pub mod fouls;
pub mod game;
pub mod ledger;
pub mod model;
pub mod period;
pub mod repository;
pub mod roster;
pub mod store;
pub mod time_format;

pub use error::{GameError, InvalidStateError, ValidationError};
pub use game::{Game, SubstitutionEdit, SubstitutionRow};
pub use model::{EventId, Foul, FoulId, GameFormat, GameRules, PeriodId, Player, PlayerId};
pub use store::{GameCommand, GameEvent, GameSnapshot, GameStore};
