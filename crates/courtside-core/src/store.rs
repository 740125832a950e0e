// State container that applies commands and publishes immutable snapshots.
//
// Callers never mutate the game directly: they send a `GameCommand`, and on
// success get back what happened plus the new snapshot. A failed command
// leaves both the game and the published snapshot untouched.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::TickOutcome;
use crate::error::Result;
use crate::fouls::FoulStatus;
use crate::game::{Game, SubstitutionEdit};
use crate::model::{EventId, Foul, PeriodId, PlayerId, SubstitutionEvent};
use crate::period::PeriodTransition;

/// Immutable view of the game at one revision.
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    pub revision: u64,
    pub game: Game,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameCommand {
    StartClock,
    PauseClock,
    AdjustClock {
        delta: i64,
    },
    Tick,
    RecordSubstitution {
        period_id: PeriodId,
        subbed_in: Vec<PlayerId>,
        subbed_out: Vec<PlayerId>,
        event_time: u32,
    },
    SubstituteNow {
        subbed_in: Vec<PlayerId>,
        subbed_out: Vec<PlayerId>,
    },
    EditSubstitution {
        event_id: EventId,
        edit: SubstitutionEdit,
    },
    DeleteSubstitution {
        event_id: EventId,
    },
    RecordFoul {
        player_id: PlayerId,
        period_id: PeriodId,
        time_remaining: u32,
    },
    FoulNow {
        player_id: PlayerId,
    },
    EndPeriod,
}

/// What a successfully applied command did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GameEvent {
    /// Accepted but nothing changed (starting a running clock, ticking a
    /// paused one, ...). No new snapshot is published.
    Unchanged,
    ClockStarted { time_remaining: u32 },
    ClockPaused { time_remaining: u32 },
    ClockAdjusted { time_remaining: u32 },
    Ticked { time_remaining: u32 },
    PeriodExpired,
    SubstitutionRecorded(SubstitutionEvent),
    SubstitutionEdited(SubstitutionEvent),
    SubstitutionDeleted(SubstitutionEvent),
    FoulRecorded { foul: Foul, status: FoulStatus },
    PeriodEnded(PeriodTransition),
}

#[derive(Debug, Clone)]
pub struct Applied {
    pub event: GameEvent,
    pub snapshot: Arc<GameSnapshot>,
}

pub struct GameStore {
    game: Game,
    revision: u64,
    snapshot: Arc<GameSnapshot>,
}

impl GameStore {
    pub fn new(game: Game) -> Self {
        let snapshot = Arc::new(GameSnapshot {
            revision: 0,
            game: game.clone(),
        });
        GameStore {
            game,
            revision: 0,
            snapshot,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<GameSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn into_game(self) -> Game {
        self.game
    }

    /// Apply one command atomically. `now` is the host's current instant,
    /// used by clock start/pause.
    pub fn apply(&mut self, command: GameCommand, now: Instant) -> Result<Applied> {
        let game = &mut self.game;
        let event = match command {
            GameCommand::StartClock => {
                if game.start_clock(now)? {
                    GameEvent::ClockStarted {
                        time_remaining: game.time_remaining(),
                    }
                } else {
                    GameEvent::Unchanged
                }
            }
            GameCommand::PauseClock => {
                if game.is_running() {
                    game.pause_clock(now);
                    GameEvent::ClockPaused {
                        time_remaining: game.time_remaining(),
                    }
                } else {
                    GameEvent::Unchanged
                }
            }
            GameCommand::AdjustClock { delta } => GameEvent::ClockAdjusted {
                time_remaining: game.adjust_clock(delta)?,
            },
            GameCommand::Tick => match game.tick() {
                TickOutcome::Idle => GameEvent::Unchanged,
                TickOutcome::Running(time_remaining) => GameEvent::Ticked { time_remaining },
                TickOutcome::Expired => GameEvent::PeriodExpired,
            },
            GameCommand::RecordSubstitution {
                period_id,
                subbed_in,
                subbed_out,
                event_time,
            } => GameEvent::SubstitutionRecorded(game.record_substitution(
                period_id,
                &subbed_in,
                &subbed_out,
                event_time,
            )?),
            GameCommand::SubstituteNow {
                subbed_in,
                subbed_out,
            } => GameEvent::SubstitutionRecorded(game.substitute_now(&subbed_in, &subbed_out)?),
            GameCommand::EditSubstitution { event_id, edit } => {
                GameEvent::SubstitutionEdited(game.edit_substitution(event_id, edit)?)
            }
            GameCommand::DeleteSubstitution { event_id } => {
                GameEvent::SubstitutionDeleted(game.delete_substitution(event_id)?)
            }
            GameCommand::RecordFoul {
                player_id,
                period_id,
                time_remaining,
            } => {
                let foul = game.record_foul(player_id, period_id, time_remaining)?;
                GameEvent::FoulRecorded {
                    status: game.foul_status(player_id),
                    foul,
                }
            }
            GameCommand::FoulNow { player_id } => {
                let foul = game.foul_now(player_id)?;
                GameEvent::FoulRecorded {
                    status: game.foul_status(player_id),
                    foul,
                }
            }
            GameCommand::EndPeriod => GameEvent::PeriodEnded(game.end_period()?),
        };

        if event != GameEvent::Unchanged {
            self.revision += 1;
            self.snapshot = Arc::new(GameSnapshot {
                revision: self.revision,
                game: self.game.clone(),
            });
            debug!("Published snapshot revision {}", self.revision);
        }

        Ok(Applied {
            event,
            snapshot: self.snapshot(),
        })
    }
}
