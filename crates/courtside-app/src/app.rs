// Application state and main event loop.
//
// The event loop owns the GameStore. Console commands and the one-second
// clock tick are the only inputs; every accepted change publishes a new
// snapshot on a watch channel and is saved to SQLite.

use std::sync::Arc;
use std::time::Duration;

use courtside_core::store::Applied;
use courtside_core::{
    Game, GameCommand, GameError, GameEvent, GameSnapshot, GameStore, PlayerId,
    SubstitutionEdit,
};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::protocol::{UiUpdate, UserCommand};
use crate::render;

/// Real time between clock ticks while the game clock runs.
pub const CLOCK_TICK: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub config: Config,
    pub store: GameStore,
    pub db: Database,
    snapshot_tx: watch::Sender<Arc<GameSnapshot>>,
}

impl AppState {
    pub fn new(config: Config, game: Game, db: Database) -> Self {
        let store = GameStore::new(game);
        let (snapshot_tx, _) = watch::channel(store.snapshot());
        AppState {
            config,
            store,
            db,
            snapshot_tx,
        }
    }

    pub fn game(&self) -> &Game {
        self.store.game()
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<Arc<GameSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Apply a game command, publish the new snapshot and persist.
    ///
    /// Plain clock ticks are published but not saved; the clock is saved
    /// again on pause, adjust, expiry and every roster change.
    pub fn apply(&mut self, command: GameCommand) -> Result<Applied, GameError> {
        let now = tokio::time::Instant::now().into_std();
        let applied = self.store.apply(command, now)?;

        match &applied.event {
            GameEvent::Unchanged => {}
            GameEvent::Ticked { .. } => {
                self.snapshot_tx.send_replace(Arc::clone(&applied.snapshot));
            }
            _ => {
                self.snapshot_tx.send_replace(Arc::clone(&applied.snapshot));
                self.persist();
            }
        }
        Ok(applied)
    }

    /// Save the current game. Failures are logged and otherwise ignored so
    /// a storage problem never blocks the scorer.
    fn persist(&self) {
        if let Err(e) = self.db.save_game(self.game()) {
            warn!("Failed to save game {}: {:#}", self.game().id, e);
        }
    }

    fn resolve_number(&self, number: &str) -> Result<PlayerId, String> {
        self.game()
            .player_by_number(number)
            .map(|p| p.id)
            .ok_or_else(|| format!("no player wearing #{number}"))
    }

    fn resolve_numbers(&self, numbers: &[String]) -> Result<Vec<PlayerId>, String> {
        numbers.iter().map(|n| self.resolve_number(n)).collect()
    }

    /// Translate a console command into a game command. `Ok(None)` means the
    /// command does not touch the game.
    fn to_game_command(&self, cmd: &UserCommand) -> Result<Option<GameCommand>, String> {
        let game_cmd = match cmd {
            UserCommand::StartClock => GameCommand::StartClock,
            UserCommand::PauseClock => GameCommand::PauseClock,
            UserCommand::AdjustClock(delta) => GameCommand::AdjustClock { delta: *delta },
            UserCommand::Substitute {
                subbed_in,
                subbed_out,
                at,
            } => {
                let subbed_in = self.resolve_numbers(subbed_in)?;
                let subbed_out = self.resolve_numbers(subbed_out)?;
                match at {
                    Some(event_time) => GameCommand::RecordSubstitution {
                        period_id: self.game().current_period().id,
                        subbed_in,
                        subbed_out,
                        event_time: *event_time,
                    },
                    None => GameCommand::SubstituteNow {
                        subbed_in,
                        subbed_out,
                    },
                }
            }
            UserCommand::EditSubstitution {
                event_id,
                at,
                subbed_in,
                subbed_out,
            } => GameCommand::EditSubstitution {
                event_id: *event_id,
                edit: SubstitutionEdit {
                    event_time: *at,
                    subbed_in: subbed_in
                        .as_deref()
                        .map(|n| self.resolve_numbers(n))
                        .transpose()?,
                    subbed_out: subbed_out
                        .as_deref()
                        .map(|n| self.resolve_numbers(n))
                        .transpose()?,
                },
            },
            UserCommand::DeleteSubstitution(event_id) => GameCommand::DeleteSubstitution {
                event_id: *event_id,
            },
            UserCommand::Foul(number) => GameCommand::FoulNow {
                player_id: self.resolve_number(number)?,
            },
            UserCommand::EndPeriod => GameCommand::EndPeriod,
            UserCommand::ShowStatus
            | UserCommand::ShowBoxScore
            | UserCommand::ListGames
            | UserCommand::Help
            | UserCommand::Quit => return Ok(None),
        };
        Ok(Some(game_cmd))
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens on two sources using `tokio::select!`:
/// 1. User commands from the console
/// 2. The clock interval, polled only while the game clock runs
///
/// Pushes UI updates through `ui_tx` for the printer.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started for game {}", state.game().id);

    let mut clock_interval = tokio::time::interval(CLOCK_TICK);
    clock_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    clock_interval.tick().await;

    loop {
        tokio::select! {
            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        let was_running = state.game().is_running();
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                        if !was_running && state.game().is_running() {
                            // First tick lands one full second after start.
                            clock_interval.reset();
                        }
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Game clock ---
            _ = clock_interval.tick(), if state.game().is_running() => {
                handle_clock_tick(&mut state, &ui_tx).await;
            }
        }
    }

    // Stop a running clock so the saved game resumes paused at the right time.
    if state.game().is_running() {
        if let Err(e) = state.apply(GameCommand::PauseClock) {
            warn!("Failed to pause clock on exit: {}", e);
        }
    }

    info!("Application event loop exiting");
    Ok(())
}

async fn handle_clock_tick(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    match state.apply(GameCommand::Tick) {
        Ok(applied) => {
            if applied.event == GameEvent::PeriodExpired {
                info!(
                    "Period {} clock expired",
                    state.game().current_period().period_number
                );
                let _ = ui_tx
                    .send(UiUpdate::Applied {
                        event: applied.event,
                        snapshot: applied.snapshot,
                    })
                    .await;
            }
        }
        Err(e) => warn!("Clock tick rejected: {}", e),
    }
}

/// Handle a user command from the console.
async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let update = match state.to_game_command(&cmd) {
        Err(reason) => {
            debug!("Command {:?} not resolved: {}", cmd, reason);
            UiUpdate::Rejected(reason)
        }
        Ok(Some(game_cmd)) => match state.apply(game_cmd) {
            Ok(applied) => UiUpdate::Applied {
                event: applied.event,
                snapshot: applied.snapshot,
            },
            Err(e) => {
                warn!("Command {:?} rejected: {}", cmd, e);
                UiUpdate::Rejected(e.to_string())
            }
        },
        Ok(None) => match cmd {
            UserCommand::ShowStatus => UiUpdate::Status(state.store.snapshot()),
            UserCommand::ShowBoxScore => UiUpdate::BoxScore(state.store.snapshot()),
            UserCommand::ListGames => match state.db.list_games() {
                Ok(games) => UiUpdate::Message(render::render_games(&games)),
                Err(e) => UiUpdate::Rejected(format!("could not list games: {e:#}")),
            },
            _ => UiUpdate::Message(render::render_help()),
        },
    };
    let _ = ui_tx.send(update).await;
}

// ---------------------------------------------------------------------------
// Crash recovery
// ---------------------------------------------------------------------------

/// Resume the game recorded as current in the database, or start a new one
/// from config.
///
/// Returns the game and whether it was restored. A finished game is never
/// resumed. The clock of a restored game is always paused.
pub fn recover_from_db(config: &Config, db: &Database) -> anyhow::Result<(Game, bool)> {
    if let Some(game_id) = db.current_game_id()? {
        match db.load_game(&game_id)? {
            Some(game) if !game.is_game_over() => {
                info!(
                    "Crash recovery: resuming game {} (period {}, {} on court)",
                    game.id,
                    game.current_period().period_number,
                    game.active_players().len()
                );
                return Ok((game, true));
            }
            Some(_) => info!("Game {} is finished, starting a new one", game_id),
            None => warn!("Current game {} not found in database", game_id),
        }
    }

    let game = Game::new(
        config.team.name.clone(),
        config.team.opponent.clone(),
        config.team.players.clone(),
        config.format,
        config.rules,
    );
    let game = db.save_game(&game)?;
    db.set_current_game_id(&game.id)?;
    info!("Started new game {}", game.id);
    Ok((game, false))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TeamConfig;
    use courtside_core::{GameFormat, GameRules, Player};

    fn test_config(period_length_minutes: u32) -> Config {
        Config {
            format: GameFormat {
                periods: 2,
                period_length_minutes,
            },
            rules: GameRules::default(),
            team: TeamConfig {
                name: "Hawks".into(),
                opponent: "Owls".into(),
                players: (1..=8)
                    .map(|n| Player::new(n, (n * 10).to_string(), format!("P{n}")))
                    .collect(),
            },
            db_path: ":memory:".into(),
        }
    }

    fn create_test_app_state(period_length_minutes: u32) -> AppState {
        let config = test_config(period_length_minutes);
        let db = Database::open(":memory:").unwrap();
        let (game, _) = recover_from_db(&config, &db).unwrap();
        AppState::new(config, game, db)
    }

    fn numbers(raw: &[u32]) -> Vec<String> {
        raw.iter().map(|n| n.to_string()).collect()
    }

    fn sub_in(raw: &[u32]) -> UserCommand {
        UserCommand::Substitute {
            subbed_in: numbers(raw),
            subbed_out: vec![],
            at: None,
        }
    }

    // -----------------------------------------------------------------------
    // Tests: state and persistence
    // -----------------------------------------------------------------------

    #[test]
    fn recover_starts_new_game_then_resumes_it() {
        let config = test_config(20);
        let db = Database::open(":memory:").unwrap();

        let (mut game, restored) = recover_from_db(&config, &db).unwrap();
        assert!(!restored);
        assert!(game.id.starts_with("game_"));

        game.substitute_now(&[PlayerId(1)], &[]).unwrap();
        db.save_game(&game).unwrap();

        let (again, restored) = recover_from_db(&config, &db).unwrap();
        assert!(restored);
        assert_eq!(again.id, game.id);
        assert!(again.active_players().contains(PlayerId(1)));
    }

    #[test]
    fn recover_does_not_resume_finished_game() {
        let config = test_config(20);
        let db = Database::open(":memory:").unwrap();
        let (mut game, _) = recover_from_db(&config, &db).unwrap();
        game.end_period().unwrap();
        game.end_period().unwrap();
        db.save_game(&game).unwrap();

        let (fresh, restored) = recover_from_db(&config, &db).unwrap();
        assert!(!restored);
        assert_ne!(fresh.id, game.id);
        assert_eq!(db.current_game_id().unwrap(), Some(fresh.id));
    }

    #[tokio::test]
    async fn accepted_command_is_published_and_saved() {
        let mut state = create_test_app_state(20);
        let mut rx = state.subscribe();

        let cmd = state.to_game_command(&sub_in(&[10, 20])).unwrap().unwrap();
        state.apply(cmd).unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().game.active_players().len(), 2);

        let saved = state.db.load_game(&state.game().id).unwrap().unwrap();
        assert_eq!(saved.active_players().len(), 2);
    }

    #[test]
    fn unknown_jersey_is_rejected_before_the_game() {
        let state = create_test_app_state(20);
        let err = state.to_game_command(&UserCommand::Foul("99".into())).unwrap_err();
        assert_eq!(err, "no player wearing #99");
    }

    #[test]
    fn substitution_with_time_targets_current_period() {
        let state = create_test_app_state(20);
        let cmd = state
            .to_game_command(&UserCommand::Substitute {
                subbed_in: numbers(&[30]),
                subbed_out: numbers(&[10]),
                at: Some(500),
            })
            .unwrap()
            .unwrap();
        assert_eq!(
            cmd,
            GameCommand::RecordSubstitution {
                period_id: state.game().current_period().id,
                subbed_in: vec![PlayerId(3)],
                subbed_out: vec![PlayerId(1)],
                event_time: 500,
            }
        );
    }

    // -----------------------------------------------------------------------
    // Tests: async event loop
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn event_loop_handles_quit_command() {
        let state = create_test_app_state(20);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, _ui_rx) = mpsc::channel(64);

        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));
        cmd_tx.send(UserCommand::Quit).await.unwrap();

        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn running_clock_ticks_until_paused() {
        let state = create_test_app_state(20);
        let mut snapshots = state.subscribe();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));

        cmd_tx.send(UserCommand::StartClock).await.unwrap();
        match ui_rx.recv().await.unwrap() {
            UiUpdate::Applied { event, .. } => assert_eq!(
                event,
                GameEvent::ClockStarted {
                    time_remaining: 1200
                }
            ),
            other => panic!("Expected ClockStarted, got {:?}", other),
        }

        tokio::time::sleep(Duration::from_millis(5500)).await;
        cmd_tx.send(UserCommand::PauseClock).await.unwrap();
        match ui_rx.recv().await.unwrap() {
            UiUpdate::Applied { event, snapshot } => {
                assert_eq!(
                    event,
                    GameEvent::ClockPaused {
                        time_remaining: 1195
                    }
                );
                assert!(!snapshot.game.is_running());
            }
            other => panic!("Expected ClockPaused, got {:?}", other),
        }
        assert_eq!(snapshots.borrow_and_update().game.time_remaining(), 1195);

        // Paused clocks do not tick.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!snapshots.has_changed().unwrap());

        cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = handle.await;
    }

    #[tokio::test(start_paused = true)]
    async fn clock_expiry_is_reported() {
        let state = create_test_app_state(1);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));

        cmd_tx.send(UserCommand::StartClock).await.unwrap();
        let _ = ui_rx.recv().await.unwrap();

        match ui_rx.recv().await.unwrap() {
            UiUpdate::Applied { event, snapshot } => {
                assert_eq!(event, GameEvent::PeriodExpired);
                assert_eq!(snapshot.game.time_remaining(), 0);
                assert!(!snapshot.game.is_running());
            }
            other => panic!("Expected PeriodExpired, got {:?}", other),
        }

        cmd_tx.send(UserCommand::EndPeriod).await.unwrap();
        match ui_rx.recv().await.unwrap() {
            UiUpdate::Applied { snapshot, .. } => {
                assert_eq!(snapshot.game.current_period().period_number, 2);
                assert_eq!(snapshot.game.time_remaining(), 60);
            }
            other => panic!("Expected PeriodEnded, got {:?}", other),
        }

        cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn event_loop_reports_rejections() {
        let state = create_test_app_state(20);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));

        cmd_tx.send(sub_in(&[10, 20, 30, 40, 50, 60])).await.unwrap();
        match ui_rx.recv().await.unwrap() {
            UiUpdate::Rejected(reason) => assert!(reason.contains("too many players")),
            other => panic!("Expected Rejected, got {:?}", other),
        }

        cmd_tx.send(sub_in(&[10, 20, 30, 40, 50])).await.unwrap();
        assert!(matches!(
            ui_rx.recv().await.unwrap(),
            UiUpdate::Applied { .. }
        ));

        cmd_tx.send(UserCommand::Foul("60".into())).await.unwrap();
        match ui_rx.recv().await.unwrap() {
            UiUpdate::Rejected(reason) => assert!(reason.contains("not on court")),
            other => panic!("Expected Rejected, got {:?}", other),
        }

        cmd_tx.send(UserCommand::ShowStatus).await.unwrap();
        match ui_rx.recv().await.unwrap() {
            UiUpdate::Status(snapshot) => {
                assert_eq!(snapshot.revision, 1);
                assert_eq!(snapshot.game.fouls().cumulative_foul_count(PlayerId(6)), 0);
            }
            other => panic!("Expected Status, got {:?}", other),
        }

        cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = handle.await;
    }
}
