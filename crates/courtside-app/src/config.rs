// Configuration loading and parsing (game.toml).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use courtside_core::model::MAX_PERIOD_LENGTH_MINUTES;
use courtside_core::{GameFormat, GameRules, Player};
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub format: GameFormat,
    pub rules: GameRules,
    pub team: TeamConfig,
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// game.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct GameFile {
    format: GameFormat,
    #[serde(default)]
    rules: GameRules,
    team: TeamConfig,
    #[serde(default)]
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamConfig {
    pub name: String,
    pub opponent: String,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: "courtside.db".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

const GAME_TOML: &str = "game.toml";

/// Load configuration from `config/game.toml` relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let game_path = base_dir.join("config").join("game.toml");
    let text = read_file(&game_path)?;
    let file: GameFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: game_path.clone(),
        source: e,
    })?;

    let config = Config {
        format: file.format,
        rules: file.rules,
        team: file.team,
        db_path: file.database.path,
    };

    validate(&config)?;

    Ok(config)
}

/// Make sure `config/game.toml` exists, seeding it from
/// `defaults/game.toml` on first run. Returns the path written, if any; an
/// existing file is never touched.
pub fn ensure_game_toml(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(GAME_TOML);
    if target.exists() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(GAME_TOML);
    if !source.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "{} is missing and there is no {} to start from",
                target.display(),
                source.display()
            ),
        });
    }

    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", dir.display()),
        })?;
    }
    std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
    })?;

    Ok(Some(target))
}

/// Loads config relative to the current working directory, seeding
/// `config/game.toml` from the shipped defaults first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_game_toml(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.format.periods == 0 {
        return Err(invalid("format.periods", "must be greater than 0"));
    }
    if !(1..=MAX_PERIOD_LENGTH_MINUTES).contains(&config.format.period_length_minutes) {
        return Err(invalid(
            "format.period_length_minutes",
            format!("must be between 1 and {MAX_PERIOD_LENGTH_MINUTES}"),
        ));
    }
    if config.rules.max_on_court == 0 {
        return Err(invalid("rules.max_on_court", "must be greater than 0"));
    }
    if config.rules.foul_limit == 0 {
        return Err(invalid("rules.foul_limit", "must be greater than 0"));
    }

    let players = &config.team.players;
    if players.is_empty() {
        return Err(invalid("team.players", "at least one player is required"));
    }

    let mut ids = HashSet::new();
    let mut numbers = HashSet::new();
    for player in players {
        if !ids.insert(player.id) {
            return Err(invalid(
                "team.players.id",
                format!("duplicate player id {}", player.id),
            ));
        }
        if !numbers.insert(player.number.as_str()) {
            return Err(invalid(
                "team.players.number",
                format!("duplicate jersey number #{}", player.number),
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn crate_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    }

    /// Fresh temp dir with `config/` created.
    fn scratch(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        tmp
    }

    fn write_game_toml(base: &Path, body: &str) {
        fs::write(base.join("config/game.toml"), body).unwrap();
    }

    const MINIMAL: &str = r#"
[format]
periods = 4
period_length_minutes = 12

[team]
name = "Test"
opponent = "Other"

[[team.players]]
id = 1
number = "7"
name = "Ash"

[[team.players]]
id = 2
number = "9"
name = "Bay"
"#;

    #[test]
    fn load_valid_config_from_defaults() {
        let tmp = scratch("courtside_config_defaults");
        fs::copy(
            crate_root().join("defaults/game.toml"),
            tmp.join("config/game.toml"),
        )
        .unwrap();

        let config = load_config_from(&tmp).expect("defaults should load");
        assert_eq!(config.format, GameFormat::default());
        assert_eq!(config.rules, GameRules::default());
        assert_eq!(config.team.players.len(), 10);
        assert_eq!(config.db_path, "courtside.db");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let tmp = scratch("courtside_config_minimal");
        write_game_toml(&tmp, MINIMAL);

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.format.periods, 4);
        assert_eq!(config.format.period_length_secs(), 720);
        assert_eq!(config.rules, GameRules::default());
        assert_eq!(config.db_path, "courtside.db");
        assert_eq!(config.team.players[1].number, "9");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn partial_rules_keep_other_defaults() {
        let tmp = scratch("courtside_config_partial_rules");
        write_game_toml(&tmp, &format!("{MINIMAL}\n[rules]\nfoul_limit = 6\n"));

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.rules.foul_limit, 6);
        assert_eq!(config.rules.max_on_court, 5);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_periods() {
        let tmp = scratch("courtside_config_zero_periods");
        write_game_toml(&tmp, &MINIMAL.replace("periods = 4", "periods = 0"));

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "format.periods"),
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_max_on_court() {
        let tmp = scratch("courtside_config_zero_cap");
        write_game_toml(&tmp, &format!("{MINIMAL}\n[rules]\nmax_on_court = 0\n"));

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "rules.max_on_court"),
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_duplicate_jersey_numbers() {
        let tmp = scratch("courtside_config_dup_numbers");
        write_game_toml(&tmp, &MINIMAL.replace("number = \"9\"", "number = \"7\""));

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, message } => {
                assert_eq!(field, "team.players.number");
                assert!(message.contains("#7"));
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_duplicate_player_ids() {
        let tmp = scratch("courtside_config_dup_ids");
        write_game_toml(&tmp, &MINIMAL.replace("id = 2", "id = 1"));

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "team.players.id"),
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_game_toml() {
        let tmp = scratch("courtside_config_missing");

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("game.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = scratch("courtside_config_invalid");
        write_game_toml(&tmp, "this is not valid [[[ toml");

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("game.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_overlong_period() {
        let tmp = scratch("courtside_config_long_period");
        write_game_toml(
            &tmp,
            &MINIMAL.replace("period_length_minutes = 12", "period_length_minutes = 4000000000"),
        );

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, message } => {
                assert_eq!(field, "format.period_length_minutes");
                assert!(message.contains("60"));
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn sixty_minute_period_is_accepted() {
        let tmp = scratch("courtside_config_hour_period");
        write_game_toml(
            &tmp,
            &MINIMAL.replace("period_length_minutes = 12", "period_length_minutes = 60"),
        );

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.format.period_length_secs(), 3600);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_game_toml_seeds_once_from_defaults() {
        let tmp = std::env::temp_dir().join("courtside_config_seed");
        let _ = fs::remove_dir_all(&tmp);
        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::copy(
            crate_root().join("defaults/game.toml"),
            defaults_dir.join("game.toml"),
        )
        .unwrap();

        let seeded = ensure_game_toml(&tmp).expect("should succeed");
        assert_eq!(seeded, Some(tmp.join("config/game.toml")));
        assert!(load_config_from(&tmp).is_ok());

        // Second run leaves the scorer's edits alone.
        fs::write(tmp.join("config/game.toml"), "# custom\n").unwrap();
        assert_eq!(ensure_game_toml(&tmp).unwrap(), None);
        let content = fs::read_to_string(tmp.join("config/game.toml")).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_game_toml_errors_without_defaults() {
        let tmp = std::env::temp_dir().join("courtside_config_no_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        match ensure_game_toml(&tmp).unwrap_err() {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("defaults"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }
}
