// Foul counts: per period for team-foul/bonus display, cumulative per
// player for foul-out status.
//
// Fouls are stored on the period they were committed in and never edited,
// so every count here is a sum over those records.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::model::{Foul, GameRules, PeriodId, PlayerId};
use crate::period::Period;

/// Foul-out status. Reported only; a fouled-out player stays on court until
/// the caller substitutes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoulStatus {
    Clear,
    FouledOut,
}

/// Read-only foul queries across a game's periods.
#[derive(Debug, Clone, Copy)]
pub struct FoulTracker<'a> {
    periods: &'a [Period],
    rules: &'a GameRules,
}

impl<'a> FoulTracker<'a> {
    pub fn new(periods: &'a [Period], rules: &'a GameRules) -> Self {
        FoulTracker { periods, rules }
    }

    fn period(&self, period_id: PeriodId) -> Result<&'a Period> {
        self.periods
            .iter()
            .find(|p| p.id == period_id)
            .ok_or_else(|| GameError::not_found("period", period_id))
    }

    pub fn fouls(&self, period_id: PeriodId) -> Result<&'a [Foul]> {
        Ok(&self.period(period_id)?.fouls)
    }

    /// Team fouls in one period. Starts at 0 every period.
    pub fn period_foul_count(&self, period_id: PeriodId) -> Result<u32> {
        Ok(self.period(period_id)?.fouls.len() as u32)
    }

    pub fn player_period_fouls(&self, player: PlayerId, period_id: PeriodId) -> Result<u32> {
        let period = self.period(period_id)?;
        Ok(period.fouls.iter().filter(|f| f.player.id == player).count() as u32)
    }

    /// Fouls for a player summed across every period of the game.
    pub fn cumulative_foul_count(&self, player: PlayerId) -> u32 {
        self.periods
            .iter()
            .flat_map(|p| p.fouls.iter())
            .filter(|f| f.player.id == player)
            .count() as u32
    }

    pub fn status(&self, player: PlayerId) -> FoulStatus {
        if self.cumulative_foul_count(player) >= self.rules.foul_limit {
            FoulStatus::FouledOut
        } else {
            FoulStatus::Clear
        }
    }

    /// Whether team fouls in the period have reached the bonus threshold.
    pub fn in_bonus(&self, period_id: PeriodId) -> Result<bool> {
        Ok(self.period_foul_count(period_id)? >= self.rules.bonus_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FoulId, Player};

    fn foul(id: u64, player: u32, period: u32) -> Foul {
        Foul {
            id: FoulId(id),
            player: Player::new(player, player.to_string(), "P"),
            period_id: PeriodId(period),
            time_remaining: 300,
        }
    }

    fn periods() -> Vec<Period> {
        let mut first = Period::new(PeriodId(1), 1, 20);
        first.fouls = vec![foul(1, 4, 1), foul(2, 4, 1), foul(3, 5, 1)];
        let mut second = Period::new(PeriodId(2), 2, 20);
        second.fouls = vec![foul(4, 4, 2)];
        vec![first, second]
    }

    #[test]
    fn counts_per_period_and_cumulative() {
        let periods = periods();
        let rules = GameRules::default();
        let tracker = FoulTracker::new(&periods, &rules);

        assert_eq!(tracker.period_foul_count(PeriodId(1)).unwrap(), 3);
        assert_eq!(tracker.period_foul_count(PeriodId(2)).unwrap(), 1);
        assert_eq!(tracker.player_period_fouls(PlayerId(4), PeriodId(1)).unwrap(), 2);
        assert_eq!(tracker.cumulative_foul_count(PlayerId(4)), 3);
        assert_eq!(tracker.cumulative_foul_count(PlayerId(9)), 0);
    }

    #[test]
    fn status_uses_configured_limit() {
        let periods = periods();
        let rules = GameRules {
            foul_limit: 3,
            ..GameRules::default()
        };
        let tracker = FoulTracker::new(&periods, &rules);
        assert_eq!(tracker.status(PlayerId(4)), FoulStatus::FouledOut);
        assert_eq!(tracker.status(PlayerId(5)), FoulStatus::Clear);
    }

    #[test]
    fn bonus_reached_at_threshold() {
        let periods = periods();
        let rules = GameRules {
            bonus_threshold: 3,
            ..GameRules::default()
        };
        let tracker = FoulTracker::new(&periods, &rules);
        assert!(tracker.in_bonus(PeriodId(1)).unwrap());
        assert!(!tracker.in_bonus(PeriodId(2)).unwrap());
    }

    #[test]
    fn unknown_period_is_not_found() {
        let periods = periods();
        let rules = GameRules::default();
        let tracker = FoulTracker::new(&periods, &rules);
        assert!(tracker.period_foul_count(PeriodId(7)).unwrap_err().is_not_found());
    }
}
