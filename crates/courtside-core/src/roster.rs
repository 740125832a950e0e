// Active roster (players on court) and the transient substitution selection.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::PlayerId;

/// The set of players currently on court for the active period.
///
/// The tracker stores whatever it is given; the on-court cap is checked by
/// the substitution commit, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRoster {
    players: BTreeSet<PlayerId>,
}

impl ActiveRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the player was not already on court.
    pub fn add(&mut self, player: PlayerId) -> bool {
        self.players.insert(player)
    }

    /// Returns `true` if the player was on court.
    pub fn remove(&mut self, player: PlayerId) -> bool {
        self.players.remove(&player)
    }

    pub fn current(&self) -> &BTreeSet<PlayerId> {
        &self.players
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.iter().copied()
    }

    pub fn clear(&mut self) {
        self.players.clear();
    }

    /// Remove `subbed_out`, then add `subbed_in`.
    pub fn apply(&mut self, subbed_in: &[PlayerId], subbed_out: &[PlayerId]) {
        for id in subbed_out {
            self.remove(*id);
        }
        for id in subbed_in {
            self.add(*id);
        }
    }
}

impl FromIterator<PlayerId> for ActiveRoster {
    fn from_iter<I: IntoIterator<Item = PlayerId>>(iter: I) -> Self {
        ActiveRoster {
            players: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// SubstitutionDraft
// ---------------------------------------------------------------------------

/// A candidate substitution being assembled before commit.
///
/// The selection may go over the cap while the user is still choosing;
/// only `commit()` rejects it.
#[derive(Debug, Clone)]
pub struct SubstitutionDraft {
    on_court: BTreeSet<PlayerId>,
    subbing_in: BTreeSet<PlayerId>,
    subbing_out: BTreeSet<PlayerId>,
    max_on_court: usize,
}

impl SubstitutionDraft {
    pub fn new(roster: &ActiveRoster, max_on_court: usize) -> Self {
        SubstitutionDraft {
            on_court: roster.current().clone(),
            subbing_in: BTreeSet::new(),
            subbing_out: BTreeSet::new(),
            max_on_court,
        }
    }

    /// Toggle a player: on-court players toggle in and out of the sub-out
    /// list, bench players in and out of the sub-in list.
    pub fn toggle(&mut self, player: PlayerId) {
        if self.on_court.contains(&player) {
            self.toggle_out(player);
        } else {
            self.toggle_in(player);
        }
    }

    pub fn toggle_in(&mut self, player: PlayerId) {
        if !self.subbing_in.remove(&player) {
            self.subbing_out.remove(&player);
            self.subbing_in.insert(player);
        }
    }

    pub fn toggle_out(&mut self, player: PlayerId) {
        if !self.subbing_out.remove(&player) {
            self.subbing_in.remove(&player);
            self.subbing_out.insert(player);
        }
    }

    pub fn subbing_in(&self) -> &BTreeSet<PlayerId> {
        &self.subbing_in
    }

    pub fn subbing_out(&self) -> &BTreeSet<PlayerId> {
        &self.subbing_out
    }

    /// How many players would be on court if the draft were committed.
    pub fn pending_on_court(&self) -> usize {
        let mut pending = self.on_court.clone();
        for id in &self.subbing_out {
            pending.remove(id);
        }
        pending.extend(self.subbing_in.iter().copied());
        pending.len()
    }

    pub fn is_over_cap(&self) -> bool {
        self.pending_on_court() > self.max_on_court
    }

    /// Validate the selection and hand back `(subbed_in, subbed_out)`.
    pub fn commit(&self) -> Result<(Vec<PlayerId>, Vec<PlayerId>), ValidationError> {
        if self.subbing_in.is_empty() && self.subbing_out.is_empty() {
            return Err(ValidationError::EmptySubstitution);
        }
        let count = self.pending_on_court();
        if count > self.max_on_court {
            return Err(ValidationError::TooManyPlayers {
                count,
                max: self.max_on_court,
            });
        }
        Ok((
            self.subbing_in.iter().copied().collect(),
            self.subbing_out.iter().copied().collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> Vec<PlayerId> {
        raw.iter().map(|&n| PlayerId(n)).collect()
    }

    #[test]
    fn add_and_remove_report_membership_changes() {
        let mut roster = ActiveRoster::new();
        assert!(roster.add(PlayerId(1)));
        assert!(!roster.add(PlayerId(1)));
        assert!(roster.contains(PlayerId(1)));
        assert!(roster.remove(PlayerId(1)));
        assert!(!roster.remove(PlayerId(1)));
        assert!(roster.is_empty());
    }

    #[test]
    fn tracker_does_not_enforce_cap() {
        let roster: ActiveRoster = ids(&[1, 2, 3, 4, 5, 6]).into_iter().collect();
        assert_eq!(roster.len(), 6);
    }

    #[test]
    fn apply_removes_then_adds() {
        let mut roster: ActiveRoster = ids(&[1, 2, 3]).into_iter().collect();
        roster.apply(&ids(&[4]), &ids(&[1]));
        assert_eq!(roster.iter().collect::<Vec<_>>(), ids(&[2, 3, 4]));
    }

    #[test]
    fn draft_allows_transient_over_selection() {
        let roster = ActiveRoster::new();
        let mut draft = SubstitutionDraft::new(&roster, 5);
        for n in 1..=6 {
            draft.toggle(PlayerId(n));
        }
        assert!(draft.is_over_cap());
        assert_eq!(
            draft.commit(),
            Err(ValidationError::TooManyPlayers { count: 6, max: 5 })
        );

        draft.toggle(PlayerId(6));
        assert!(!draft.is_over_cap());
        let (subbed_in, subbed_out) = draft.commit().unwrap();
        assert_eq!(subbed_in, ids(&[1, 2, 3, 4, 5]));
        assert!(subbed_out.is_empty());
    }

    #[test]
    fn draft_toggle_routes_by_court_membership() {
        let roster: ActiveRoster = ids(&[1, 2, 3, 4, 5]).into_iter().collect();
        let mut draft = SubstitutionDraft::new(&roster, 5);
        draft.toggle(PlayerId(6));
        assert!(draft.is_over_cap());
        draft.toggle(PlayerId(2));
        assert_eq!(draft.pending_on_court(), 5);
        assert_eq!(draft.commit().unwrap(), (ids(&[6]), ids(&[2])));
    }

    #[test]
    fn draft_switching_sides_drops_from_other_list() {
        let mut draft = SubstitutionDraft::new(&ActiveRoster::new(), 5);
        draft.toggle_in(PlayerId(1));
        draft.toggle_out(PlayerId(1));
        assert!(draft.subbing_in().is_empty());
        assert!(draft.subbing_out().contains(&PlayerId(1)));
    }

    #[test]
    fn empty_draft_is_rejected() {
        let draft = SubstitutionDraft::new(&ActiveRoster::new(), 5);
        assert_eq!(draft.commit(), Err(ValidationError::EmptySubstitution));
    }
}
