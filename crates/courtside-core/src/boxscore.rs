// Per-player playing time and foul summary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fouls::FoulStatus;
use crate::game::Game;
use crate::model::{Player, PlayerId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLine {
    pub player: Player,
    pub on_court: bool,
    /// Seconds played in each period so far, in period order.
    pub seconds_by_period: Vec<u32>,
    pub total_seconds: u32,
    /// Fouls in the current period.
    pub period_fouls: u32,
    pub total_fouls: u32,
    pub status: FoulStatus,
}

impl Game {
    /// One line per roster player, in roster order.
    pub fn box_score(&self) -> Vec<PlayerLine> {
        let played: Vec<BTreeMap<PlayerId, u32>> = self
            .periods
            .iter()
            .map(|p| p.substitutions.time_played(self.closing_time(p)))
            .collect();
        let fouls = self.fouls();
        let current = self.current_period();

        self.players
            .iter()
            .map(|player| {
                let seconds_by_period: Vec<u32> = played
                    .iter()
                    .map(|totals| totals.get(&player.id).copied().unwrap_or(0))
                    .collect();
                PlayerLine {
                    player: player.clone(),
                    on_court: self.active_players.contains(player.id),
                    total_seconds: seconds_by_period.iter().sum(),
                    seconds_by_period,
                    period_fouls: current
                        .fouls
                        .iter()
                        .filter(|f| f.player.id == player.id)
                        .count() as u32,
                    total_fouls: fouls.cumulative_foul_count(player.id),
                    status: fouls.status(player.id),
                }
            })
            .collect()
    }
}
