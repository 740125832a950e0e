// Periods and the period-end lifecycle.
//
// InProgress -> Ended -> (next period InProgress) | GameOver

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{InvalidStateError, Result};
use crate::game::Game;
use crate::ledger::SubstitutionLedger;
use crate::model::{Foul, PeriodId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodPhase {
    InProgress,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    InProgress,
    GameOver,
}

/// A timed segment of the game with its own substitution log and fouls.
/// Created when the game reaches it and never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub id: PeriodId,
    pub period_number: u32,
    pub length_minutes: u32,
    pub substitutions: SubstitutionLedger,
    pub fouls: Vec<Foul>,
    pub phase: PeriodPhase,
}

impl Period {
    pub fn new(id: PeriodId, period_number: u32, length_minutes: u32) -> Self {
        Period {
            id,
            period_number,
            length_minutes,
            substitutions: SubstitutionLedger::new(),
            fouls: Vec::new(),
            phase: PeriodPhase::InProgress,
        }
    }

    pub fn length_secs(&self) -> u32 {
        self.length_minutes.saturating_mul(60)
    }

    pub fn is_ended(&self) -> bool {
        self.phase == PeriodPhase::Ended
    }
}

/// Outcome of `Game::end_period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodTransition {
    NextPeriod {
        period_id: PeriodId,
        period_number: u32,
    },
    GameOver,
}

impl Game {
    /// End the current period.
    ///
    /// Everyone on court is implicitly subbed out at 0:00: the ended period's
    /// open stints close at zero from now on, so its minutes never depend on
    /// later state. The court starts empty for the next period, whose clock
    /// is set to its full length. Fouls carry over only through the
    /// cumulative count; the new period's foul list starts empty.
    pub fn end_period(&mut self) -> Result<PeriodTransition> {
        if self.is_game_over() {
            return Err(InvalidStateError::GameOver.into());
        }

        let ending = &mut self.periods[self.current_period_index];
        ending.phase = PeriodPhase::Ended;
        let ended_number = ending.period_number;

        let cleared = self.active_players.len();
        self.active_players.clear();
        info!(
            "Period {} ended; {} players taken off court",
            ended_number, cleared
        );

        if ended_number >= self.format.periods {
            self.clock.expire();
            self.phase = GamePhase::GameOver;
            info!("Game over after period {}", ended_number);
            return Ok(PeriodTransition::GameOver);
        }

        let period_number = ended_number + 1;
        let period_id = PeriodId(self.periods.len() as u32 + 1);
        let next = Period::new(period_id, period_number, self.format.period_length_minutes);
        self.clock.reset(next.length_secs());
        self.periods.push(next);
        self.current_period_index = self.periods.len() - 1;
        info!("Period {} started", period_number);

        Ok(PeriodTransition::NextPeriod {
            period_id,
            period_number,
        })
    }
}
