// Game state: roster, periods, clock and the commands that mutate them.
//
// Every command validates against a candidate copy of whatever it changes
// and only writes back on success, so a failed command leaves the game
// exactly as it was.

use std::collections::HashSet;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::{GameClock, TickOutcome};
use crate::error::{GameError, InvalidStateError, Result, ValidationError};
use crate::fouls::{FoulStatus, FoulTracker};
use crate::ledger::SubstitutionLedger;
use crate::model::{
    EventId, Foul, FoulId, GameFormat, GameRules, PeriodId, Player, PlayerId, SubstitutionEvent,
};
use crate::period::{GamePhase, Period};
use crate::roster::{ActiveRoster, SubstitutionDraft};
use crate::time_format::format_clock;

/// Changes to apply to an existing substitution. `None` keeps the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionEdit {
    pub event_time: Option<u32>,
    pub subbed_in: Option<Vec<PlayerId>>,
    pub subbed_out: Option<Vec<PlayerId>>,
}

/// One row of the substitution table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionRow {
    pub event_id: EventId,
    pub sequence: u64,
    pub event_time: u32,
    /// `event_time` as `M:SS`.
    pub display_time: String,
    pub subbed_in: Vec<Player>,
    pub subbed_out: Vec<Player>,
}

impl From<&SubstitutionEvent> for SubstitutionRow {
    fn from(event: &SubstitutionEvent) -> Self {
        SubstitutionRow {
            event_id: event.id,
            sequence: event.sequence,
            event_time: event.event_time,
            display_time: format_clock(event.event_time),
            subbed_in: event.subbed_in.clone(),
            subbed_out: event.subbed_out.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    /// Empty until the persistence layer assigns one.
    pub id: String,
    pub team: String,
    pub opponent: String,
    pub created_at: DateTime<Utc>,
    pub(crate) players: Vec<Player>,
    pub(crate) periods: Vec<Period>,
    pub(crate) active_players: ActiveRoster,
    pub(crate) current_period_index: usize,
    pub(crate) clock: GameClock,
    pub(crate) phase: GamePhase,
    pub(crate) format: GameFormat,
    pub(crate) rules: GameRules,
    next_event_id: u64,
    next_foul_id: u64,
}

impl Game {
    /// Start a game at period 1 with an empty court and a paused, full clock.
    pub fn new(
        team: impl Into<String>,
        opponent: impl Into<String>,
        players: Vec<Player>,
        format: GameFormat,
        rules: GameRules,
    ) -> Self {
        let first = Period::new(PeriodId(1), 1, format.period_length_minutes);
        let clock = GameClock::new(first.length_secs());
        Game {
            id: String::new(),
            team: team.into(),
            opponent: opponent.into(),
            created_at: Utc::now(),
            players,
            periods: vec![first],
            active_players: ActiveRoster::new(),
            current_period_index: 0,
            clock,
            phase: GamePhase::InProgress,
            format,
            rules,
            next_event_id: 1,
            next_foul_id: 1,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| GameError::not_found("player", id))
    }

    pub fn player_by_number(&self, number: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.number == number)
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn period(&self, id: PeriodId) -> Result<&Period> {
        self.periods
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| GameError::not_found("period", id))
    }

    pub fn current_period(&self) -> &Period {
        &self.periods[self.current_period_index]
    }

    pub fn current_period_index(&self) -> usize {
        self.current_period_index
    }

    pub fn active_players(&self) -> &ActiveRoster {
        &self.active_players
    }

    /// Players on court, in roster order.
    pub fn on_court(&self) -> Vec<&Player> {
        self.players
            .iter()
            .filter(|p| self.active_players.contains(p.id))
            .collect()
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn time_remaining(&self) -> u32 {
        self.clock.time_remaining()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn format(&self) -> &GameFormat {
        &self.format
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn fouls(&self) -> FoulTracker<'_> {
        FoulTracker::new(&self.periods, &self.rules)
    }

    pub fn team_fouls(&self, period_id: PeriodId) -> Result<u32> {
        self.fouls().period_foul_count(period_id)
    }

    pub fn in_bonus(&self, period_id: PeriodId) -> Result<bool> {
        self.fouls().in_bonus(period_id)
    }

    pub fn foul_status(&self, player: PlayerId) -> FoulStatus {
        self.fouls().status(player)
    }

    pub fn substitution(&self, id: EventId) -> Result<&SubstitutionEvent> {
        self.periods
            .iter()
            .find_map(|p| p.substitutions.get(id))
            .ok_or_else(|| GameError::not_found("substitution", id))
    }

    /// The period's substitutions, most recently recorded first.
    pub fn substitution_rows(&self, period_id: PeriodId) -> Result<Vec<SubstitutionRow>> {
        let period = self.period(period_id)?;
        Ok(period
            .substitutions
            .rows()
            .into_iter()
            .map(SubstitutionRow::from)
            .collect())
    }

    /// Clock value at which a period's open stints are closed: the live clock
    /// for the period in progress, zero for an ended one.
    pub(crate) fn closing_time(&self, period: &Period) -> u32 {
        if period.is_ended() {
            0
        } else {
            self.clock.time_remaining()
        }
    }

    /// Seconds the player has been on court in the period.
    pub fn minutes_played(&self, player: PlayerId, period_id: PeriodId) -> Result<u32> {
        self.player(player)?;
        let period = self.period(period_id)?;
        Ok(period
            .substitutions
            .minutes_played(player, self.closing_time(period)))
    }

    /// Seconds played summed across every period so far.
    pub fn total_seconds_played(&self, player: PlayerId) -> Result<u32> {
        self.player(player)?;
        Ok(self
            .periods
            .iter()
            .map(|p| p.substitutions.minutes_played(player, self.closing_time(p)))
            .sum())
    }

    /// Start a candidate substitution from the current court.
    pub fn substitution_draft(&self) -> SubstitutionDraft {
        SubstitutionDraft::new(&self.active_players, self.rules.max_on_court)
    }

    // -----------------------------------------------------------------------
    // Clock commands
    // -----------------------------------------------------------------------

    fn ensure_in_progress(&self) -> Result<()> {
        if self.is_game_over() {
            return Err(InvalidStateError::GameOver.into());
        }
        Ok(())
    }

    pub fn start_clock(&mut self, now: Instant) -> Result<bool> {
        self.ensure_in_progress()?;
        Ok(self.clock.start(now))
    }

    pub fn pause_clock(&mut self, now: Instant) -> u32 {
        self.clock.pause(now)
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.clock.tick()
    }

    pub fn adjust_clock(&mut self, delta: i64) -> Result<u32> {
        self.ensure_in_progress()?;
        self.clock.adjust(delta)
    }

    // -----------------------------------------------------------------------
    // Substitution commands
    // -----------------------------------------------------------------------

    fn period_index(&self, id: PeriodId) -> Result<usize> {
        self.periods
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| GameError::not_found("period", id))
    }

    fn event_period_index(&self, id: EventId) -> Result<usize> {
        self.periods
            .iter()
            .position(|p| p.substitutions.get(id).is_some())
            .ok_or_else(|| GameError::not_found("substitution", id))
    }

    /// Look up roster players, dropping repeated ids.
    fn resolve(&self, ids: &[PlayerId]) -> Result<Vec<Player>> {
        let mut seen = HashSet::new();
        let mut players = Vec::with_capacity(ids.len());
        for &id in ids {
            if seen.insert(id) {
                players.push(self.player(id)?.clone());
            }
        }
        Ok(players)
    }

    fn check_lists(subbed_in: &[PlayerId], subbed_out: &[PlayerId]) -> Result<()> {
        if subbed_in.is_empty() && subbed_out.is_empty() {
            return Err(ValidationError::EmptySubstitution.into());
        }
        if let Some(&dup) = subbed_in.iter().find(|id| subbed_out.contains(id)) {
            return Err(ValidationError::PlayerInBothLists(dup).into());
        }
        Ok(())
    }

    fn check_event_time(period: &Period, time: u32) -> Result<()> {
        let max = period.length_secs();
        if time > max {
            return Err(ValidationError::EventTimeOutOfRange { time, max }.into());
        }
        Ok(())
    }

    /// The period at `idx` is the one being played.
    fn is_live(&self, idx: usize) -> bool {
        idx == self.current_period_index && !self.periods[idx].is_ended()
    }

    /// A substitution in the live period cannot be dated after the clock.
    fn check_not_ahead(&self, idx: usize, time: u32) -> Result<()> {
        let now = self.clock.time_remaining();
        if self.is_live(idx) && time < now {
            return Err(ValidationError::EventTimeAhead { time, now }.into());
        }
        Ok(())
    }

    /// Replay a candidate ledger, enforce the on-court cap after every event,
    /// then install it. For the period in progress the active roster becomes
    /// the replay result.
    fn commit_ledger(&mut self, idx: usize, candidate: SubstitutionLedger) -> Result<()> {
        let replay = candidate.replay();
        if replay.peak > self.rules.max_on_court {
            return Err(ValidationError::TooManyPlayers {
                count: replay.peak,
                max: self.rules.max_on_court,
            }
            .into());
        }
        let is_live = self.is_live(idx);
        self.periods[idx].substitutions = candidate;
        if is_live {
            self.active_players = replay.roster;
        }
        Ok(())
    }

    /// Record a substitution in `period_id` at `event_time` seconds remaining.
    pub fn record_substitution(
        &mut self,
        period_id: PeriodId,
        subbed_in: &[PlayerId],
        subbed_out: &[PlayerId],
        event_time: u32,
    ) -> Result<SubstitutionEvent> {
        self.ensure_in_progress()?;
        let idx = self.period_index(period_id)?;
        Self::check_lists(subbed_in, subbed_out)?;
        let players_in = self.resolve(subbed_in)?;
        let players_out = self.resolve(subbed_out)?;
        Self::check_event_time(&self.periods[idx], event_time)?;
        self.check_not_ahead(idx, event_time)?;

        let mut candidate = self.periods[idx].substitutions.clone();
        let id = EventId(self.next_event_id);
        let event = candidate
            .push(id, period_id, event_time, players_in, players_out)
            .clone();
        self.commit_ledger(idx, candidate)?;
        self.next_event_id += 1;

        info!(
            "Substitution {} at {} in period {}: in [{}] out [{}]",
            id,
            format_clock(event_time),
            self.periods[idx].period_number,
            labels(&event.subbed_in),
            labels(&event.subbed_out)
        );
        Ok(event)
    }

    /// Record a substitution in the current period at the current clock time.
    pub fn substitute_now(
        &mut self,
        subbed_in: &[PlayerId],
        subbed_out: &[PlayerId],
    ) -> Result<SubstitutionEvent> {
        let period_id = self.current_period().id;
        let time = self.clock.time_remaining();
        self.record_substitution(period_id, subbed_in, subbed_out, time)
    }

    /// Change an existing substitution in place. Its table position
    /// (insertion sequence) is unchanged; derived totals are recomputed from
    /// the whole period.
    pub fn edit_substitution(
        &mut self,
        event_id: EventId,
        edit: SubstitutionEdit,
    ) -> Result<SubstitutionEvent> {
        let idx = self.event_period_index(event_id)?;
        if let Some(time) = edit.event_time {
            self.check_not_ahead(idx, time)?;
        }
        let period = &self.periods[idx];
        let existing = period
            .substitutions
            .get(event_id)
            .ok_or_else(|| GameError::not_found("substitution", event_id))?;

        let in_ids = edit
            .subbed_in
            .unwrap_or_else(|| existing.subbed_in.iter().map(|p| p.id).collect());
        let out_ids = edit
            .subbed_out
            .unwrap_or_else(|| existing.subbed_out.iter().map(|p| p.id).collect());
        let event_time = edit.event_time.unwrap_or(existing.event_time);

        Self::check_lists(&in_ids, &out_ids)?;
        let players_in = self.resolve(&in_ids)?;
        let players_out = self.resolve(&out_ids)?;
        Self::check_event_time(period, event_time)?;

        let mut candidate = period.substitutions.clone();
        let event = candidate
            .get_mut(event_id)
            .ok_or_else(|| GameError::not_found("substitution", event_id))?;
        event.event_time = event_time;
        event.subbed_in = players_in;
        event.subbed_out = players_out;
        let updated = event.clone();
        self.commit_ledger(idx, candidate)?;

        info!(
            "Substitution {} edited: {} in [{}] out [{}]",
            event_id,
            format_clock(updated.event_time),
            labels(&updated.subbed_in),
            labels(&updated.subbed_out)
        );
        Ok(updated)
    }

    /// Remove a substitution and recompute the court from what remains.
    pub fn delete_substitution(&mut self, event_id: EventId) -> Result<SubstitutionEvent> {
        let idx = self.event_period_index(event_id)?;
        let mut candidate = self.periods[idx].substitutions.clone();
        let removed = candidate
            .remove(event_id)
            .ok_or_else(|| GameError::not_found("substitution", event_id))?;
        self.commit_ledger(idx, candidate)?;
        info!("Substitution {} deleted", event_id);
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Foul commands
    // -----------------------------------------------------------------------

    /// Record a personal foul. The player must be on court.
    pub fn record_foul(
        &mut self,
        player_id: PlayerId,
        period_id: PeriodId,
        time_remaining: u32,
    ) -> Result<Foul> {
        self.ensure_in_progress()?;
        let idx = self.period_index(period_id)?;
        if idx != self.current_period_index {
            return Err(InvalidStateError::PeriodEnded(self.periods[idx].period_number).into());
        }
        let player = self.player(player_id)?.clone();
        if !self.active_players.contains(player_id) {
            return Err(ValidationError::PlayerNotOnCourt(player_id).into());
        }
        Self::check_event_time(&self.periods[idx], time_remaining)?;

        let foul = Foul {
            id: FoulId(self.next_foul_id),
            player,
            period_id,
            time_remaining,
        };
        self.next_foul_id += 1;
        self.periods[idx].fouls.push(foul.clone());

        let total = self.fouls().cumulative_foul_count(player_id);
        if self.foul_status(player_id) == FoulStatus::FouledOut {
            warn!(
                "{} has fouled out ({} fouls)",
                foul.player.label(),
                total
            );
        } else {
            info!(
                "Foul on {} at {} ({} total)",
                foul.player.label(),
                format_clock(time_remaining),
                total
            );
        }
        Ok(foul)
    }

    /// Record a foul in the current period at the current clock time.
    pub fn foul_now(&mut self, player_id: PlayerId) -> Result<Foul> {
        let period_id = self.current_period().id;
        let time = self.clock.time_remaining();
        self.record_foul(player_id, period_id, time)
    }
}

fn labels(players: &[Player]) -> String {
    players
        .iter()
        .map(Player::label)
        .collect::<Vec<_>>()
        .join(", ")
}
