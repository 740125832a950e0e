// Persistence collaborator boundary.
//
// The core hands a `Game` to a repository after each mutation and gets back
// a canonicalized copy. Storage format is the implementation's business.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};

use crate::game::Game;

pub trait GameRepository {
    fn load(&self, game_id: &str) -> Result<Game>;

    /// Store the game and return the stored copy, with an id assigned if the
    /// game did not have one.
    fn save(&self, game: &Game) -> Result<Game>;
}

/// Generate a game id from the current UTC time.
///
/// Format: `game_YYYYMMDD_HHMMSS_mmm` (e.g. `game_20261019_193005_042`).
pub fn generate_game_id() -> String {
    chrono::Utc::now()
        .format("game_%Y%m%d_%H%M%S_%3f")
        .to_string()
}

/// Give `game` a fresh id if it has none. `taken` reports ids already in
/// use; a numeric suffix is added on collision.
pub fn assign_id(game: &mut Game, taken: impl Fn(&str) -> bool) {
    if !game.id.is_empty() {
        return;
    }
    let base = generate_game_id();
    let mut candidate = base.clone();
    let mut n = 1;
    while taken(&candidate) {
        n += 1;
        candidate = format!("{base}_{n}");
    }
    game.id = candidate;
}

/// In-process repository. Games are stored as JSON so loads return
/// independent copies, the same as a real store would.
#[derive(Default)]
pub struct MemoryRepository {
    games: Mutex<HashMap<String, String>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panics if the mutex is poisoned.
    fn games(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.games.lock().expect("repository mutex poisoned")
    }

    pub fn len(&self) -> usize {
        self.games().len()
    }

    pub fn is_empty(&self) -> bool {
        self.games().is_empty()
    }
}

impl GameRepository for MemoryRepository {
    fn load(&self, game_id: &str) -> Result<Game> {
        let games = self.games();
        let json = games
            .get(game_id)
            .ok_or_else(|| anyhow!("game {game_id} not found"))?;
        serde_json::from_str(json).context("failed to deserialize game")
    }

    fn save(&self, game: &Game) -> Result<Game> {
        let mut games = self.games();
        let mut stored = game.clone();
        assign_id(&mut stored, |id| games.contains_key(id));
        let json = serde_json::to_string(&stored).context("failed to serialize game")?;
        games.insert(stored.id.clone(), json);
        Ok(stored)
    }
}
