// SQLite persistence layer for game snapshots.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use courtside_core::repository::{assign_id, GameRepository};
use courtside_core::Game;
use rusqlite::{params, Connection, OptionalExtension};

/// One row of the game index, without the snapshot body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    pub id: String,
    pub team: String,
    pub opponent: String,
    pub game_over: bool,
    pub updated_at: String,
}

/// SQLite-backed persistence for whole-game JSON snapshots and a small
/// key-value store for app state.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS games (
                id         TEXT PRIMARY KEY,
                team       TEXT NOT NULL,
                opponent   TEXT NOT NULL,
                game_over  INTEGER NOT NULL DEFAULT 0,
                snapshot   TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS app_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Panics if the mutex is poisoned.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Games
    // ------------------------------------------------------------------

    /// Insert or overwrite the snapshot for `game`. A game without an id is
    /// given a fresh one; the stored copy is returned.
    pub fn save_game(&self, game: &Game) -> Result<Game> {
        let conn = self.conn();

        let mut stored = game.clone();
        if stored.id.is_empty() {
            let taken = Self::game_ids(&conn)?;
            assign_id(&mut stored, |id| taken.contains(id));
        }

        let snapshot = serde_json::to_string(&stored).context("failed to serialize game")?;
        conn.execute(
            "INSERT INTO games (id, team, opponent, game_over, snapshot, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                game_over  = excluded.game_over,
                snapshot   = excluded.snapshot,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
            params![
                stored.id,
                stored.team,
                stored.opponent,
                stored.is_game_over(),
                snapshot,
                stored.created_at.to_rfc3339(),
            ],
        )
        .with_context(|| format!("failed to save game {}", stored.id))?;

        Ok(stored)
    }

    /// Load a game snapshot by id. Returns `None` if no such game exists.
    pub fn load_game(&self, game_id: &str) -> Result<Option<Game>> {
        let conn = self.conn();
        let snapshot: Option<String> = conn
            .query_row(
                "SELECT snapshot FROM games WHERE id = ?1",
                params![game_id],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query game")?;

        snapshot
            .map(|json| {
                serde_json::from_str(&json)
                    .with_context(|| format!("failed to deserialize game {game_id}"))
            })
            .transpose()
    }

    /// All stored games, most recently updated first.
    pub fn list_games(&self) -> Result<Vec<GameSummary>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, team, opponent, game_over, updated_at
                 FROM games ORDER BY updated_at DESC, id DESC",
            )
            .context("failed to prepare list_games query")?;

        let games = stmt
            .query_map([], |row| {
                Ok(GameSummary {
                    id: row.get(0)?,
                    team: row.get(1)?,
                    opponent: row.get(2)?,
                    game_over: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })
            .context("failed to query games")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map game rows")?;

        Ok(games)
    }

    fn game_ids(conn: &Connection) -> Result<HashSet<String>> {
        let mut stmt = conn
            .prepare("SELECT id FROM games")
            .context("failed to prepare game id query")?;
        let ids = stmt
            .query_map([], |row| row.get(0))
            .context("failed to query game ids")?
            .collect::<std::result::Result<HashSet<String>, _>>()
            .context("failed to map game ids")?;
        Ok(ids)
    }

    // ------------------------------------------------------------------
    // App state (key-value)
    // ------------------------------------------------------------------

    /// Persist an arbitrary JSON value under `key`, overwriting any previous
    /// value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json_str = serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO app_state (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load a previously saved JSON value by `key`.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let json_str: Option<String> = conn
            .query_row(
                "SELECT value FROM app_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query app state")?;

        json_str
            .map(|s| serde_json::from_str(&s).context("failed to deserialize state value"))
            .transpose()
    }

    const GAME_ID_KEY: &'static str = "current_game_id";

    /// The game the app was last working on, if any.
    pub fn current_game_id(&self) -> Result<Option<String>> {
        let value = self.load_state(Self::GAME_ID_KEY)?;
        Ok(value.and_then(|v| v.as_str().map(|s| s.to_string())))
    }

    pub fn set_current_game_id(&self, game_id: &str) -> Result<()> {
        self.save_state(
            Self::GAME_ID_KEY,
            &serde_json::Value::String(game_id.to_string()),
        )
    }
}

impl GameRepository for Database {
    fn load(&self, game_id: &str) -> Result<Game> {
        self.load_game(game_id)?
            .ok_or_else(|| anyhow!("game {game_id} not found"))
    }

    fn save(&self, game: &Game) -> Result<Game> {
        self.save_game(game)
    }
}
