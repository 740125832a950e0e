// Courtside entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, the terminal is for the scorer)
// 2. Load config
// 3. Open database, resume or start a game
// 4. Create mpsc channels
// 5. Spawn app logic task and output printer
// 6. Read commands from stdin until quit or EOF
// 7. Cleanup on exit

use courtside_app::app;
use courtside_app::config;
use courtside_app::db;
use courtside_app::input;
use courtside_app::protocol::UserCommand;
use courtside_app::render;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Courtside starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {} vs {}, {} periods of {} minutes, {} players",
        config.team.name,
        config.team.opponent,
        config.format.periods,
        config.format.period_length_minutes,
        config.team.players.len()
    );

    // 3. Open database and resume or start a game
    let db = db::Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    let (game, restored) = match app::recover_from_db(&config, &db) {
        Ok(result) => result,
        Err(e) => {
            error!("Crash recovery failed: {}", e);
            return Err(e.context("crash recovery failed"));
        }
    };
    if restored {
        println!("Resumed game {}.", game.id);
    } else {
        println!("New game {}.", game.id);
    }
    println!("{}\n", render::render_status(&game));
    println!("Type `help` for commands.");

    // 4. Create mpsc channels
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, mut ui_rx) = mpsc::channel(256);

    // 5. Spawn app logic task and the printer
    let app_state = app::AppState::new(config, game, db);
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(update) = ui_rx.recv().await {
            println!("{}", render::render_update(&update));
        }
    });

    // 6. Read commands until the scorer quits or stdin closes
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("stdin closed");
                break;
            }
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };
        match input::parse_command(&line) {
            Ok(None) => {}
            Ok(Some(UserCommand::Quit)) => break,
            Ok(Some(cmd)) => {
                if cmd_tx.send(cmd).await.is_err() {
                    error!("Application loop is gone; exiting");
                    break;
                }
            }
            Err(e) => println!("! {e}"),
        }
    }

    // 7. Cleanup: stop the app loop (it pauses and saves a running clock)
    let _ = cmd_tx.send(UserCommand::Quit).await;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
        let _ = printer.await;
    })
    .await;

    info!("Courtside shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to `logs/courtside.log`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("courtside.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("courtside_app=info,courtside_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
