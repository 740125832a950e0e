// Substitution ledger for a single period.
//
// Events are kept in insertion order. Everything derived from them (who is
// on court, seconds played per player) is recomputed by replaying the full
// sequence in game order: higher `event_time` first, since the clock counts
// down, with insertion sequence breaking ties.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{EventId, PeriodId, Player, PlayerId, SubstitutionEvent};
use crate::roster::ActiveRoster;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionLedger {
    events: Vec<SubstitutionEvent>,
    next_sequence: u64,
}

/// Result of replaying a ledger: the final on-court set, the clock value at
/// which each on-court player last entered, and closed-stint totals.
#[derive(Debug, Clone, Default)]
pub struct Replay {
    pub roster: ActiveRoster,
    /// Most players on court after any single event.
    pub peak: usize,
    entered_at: BTreeMap<PlayerId, u32>,
    played: BTreeMap<PlayerId, u32>,
}

impl Replay {
    /// Close every open stint at `closing_time` and return seconds played per
    /// player. Players who never saw the court are absent.
    pub fn close(mut self, closing_time: u32) -> BTreeMap<PlayerId, u32> {
        for (player, entered) in std::mem::take(&mut self.entered_at) {
            *self.played.entry(player).or_default() += entered.saturating_sub(closing_time);
        }
        self.played
    }
}

impl SubstitutionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: EventId) -> Option<&SubstitutionEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: EventId) -> Option<&mut SubstitutionEvent> {
        self.events.iter_mut().find(|e| e.id == id)
    }

    /// Append a new event and give it the next insertion sequence.
    pub(crate) fn push(
        &mut self,
        id: EventId,
        period_id: PeriodId,
        event_time: u32,
        subbed_in: Vec<Player>,
        subbed_out: Vec<Player>,
    ) -> &SubstitutionEvent {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(SubstitutionEvent {
            id,
            period_id,
            sequence,
            event_time,
            subbed_in,
            subbed_out,
        });
        &self.events[self.events.len() - 1]
    }

    pub(crate) fn remove(&mut self, id: EventId) -> Option<SubstitutionEvent> {
        let idx = self.events.iter().position(|e| e.id == id)?;
        Some(self.events.remove(idx))
    }

    /// Events in table order: most recently recorded first.
    pub fn rows(&self) -> Vec<&SubstitutionEvent> {
        let mut rows: Vec<&SubstitutionEvent> = self.events.iter().collect();
        rows.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        rows
    }

    /// Events in game order.
    pub fn chronological(&self) -> Vec<&SubstitutionEvent> {
        let mut ordered: Vec<&SubstitutionEvent> = self.events.iter().collect();
        ordered.sort_by(|a, b| {
            b.event_time
                .cmp(&a.event_time)
                .then(a.sequence.cmp(&b.sequence))
        });
        ordered
    }

    /// Replay the period from an empty court.
    pub fn replay(&self) -> Replay {
        self.replay_until(0)
    }

    /// Replay with every stint boundary held at or above `now`, so time the
    /// clock has not run yet is never counted.
    fn replay_until(&self, now: u32) -> Replay {
        let mut replay = Replay::default();
        for event in self.chronological() {
            let at = event.event_time.max(now);
            for player in &event.subbed_out {
                if let Some(entered) = replay.entered_at.remove(&player.id) {
                    *replay.played.entry(player.id).or_default() += entered.saturating_sub(at);
                }
                replay.roster.remove(player.id);
            }
            for player in &event.subbed_in {
                if replay.roster.add(player.id) {
                    replay.entered_at.insert(player.id, at);
                }
            }
            replay.peak = replay.peak.max(replay.roster.len());
        }
        replay
    }

    /// Who is on court after every recorded event.
    pub fn roster(&self) -> ActiveRoster {
        self.replay().roster
    }

    /// Seconds played per player, with open stints closed at `closing_time`.
    pub fn time_played(&self, closing_time: u32) -> BTreeMap<PlayerId, u32> {
        self.replay_until(closing_time).close(closing_time)
    }

    pub fn minutes_played(&self, player: PlayerId, closing_time: u32) -> u32 {
        self.time_played(closing_time)
            .get(&player)
            .copied()
            .unwrap_or(0)
    }
}
