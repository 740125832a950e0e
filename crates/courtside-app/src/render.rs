// Plain-text rendering of game state for the console.

use std::fmt::Write;

use courtside_core::fouls::FoulStatus;
use courtside_core::period::PeriodTransition;
use courtside_core::time_format::format_clock;
use courtside_core::{Game, GameEvent, Player, SubstitutionRow};

use crate::db::GameSummary;
use crate::input::HELP;
use crate::protocol::UiUpdate;

pub fn render_update(update: &UiUpdate) -> String {
    match update {
        UiUpdate::Applied { event, snapshot } => render_event(event, &snapshot.game),
        UiUpdate::Rejected(reason) => format!("! {reason}"),
        UiUpdate::Status(snapshot) => render_status(&snapshot.game),
        UiUpdate::BoxScore(snapshot) => render_box_score(&snapshot.game),
        UiUpdate::Message(text) => text.clone(),
    }
}

pub fn render_help() -> String {
    HELP.to_string()
}

/// One-line summary of what a command did.
pub fn render_event(event: &GameEvent, game: &Game) -> String {
    match event {
        GameEvent::Unchanged => "Nothing to do.".into(),
        GameEvent::ClockStarted { time_remaining } => {
            format!("Clock running from {}", format_clock(*time_remaining))
        }
        GameEvent::ClockPaused { time_remaining } => {
            format!("Clock paused at {}", format_clock(*time_remaining))
        }
        GameEvent::ClockAdjusted { time_remaining } => {
            format!("Clock set to {}", format_clock(*time_remaining))
        }
        GameEvent::Ticked { time_remaining } => format_clock(*time_remaining),
        GameEvent::PeriodExpired => format!(
            "End of period {}. Type `end` to close it.",
            game.current_period().period_number
        ),
        GameEvent::SubstitutionRecorded(event) => format!(
            "Sub {} at {}: {}",
            event.id,
            format_clock(event.event_time),
            describe_swap(&event.subbed_in, &event.subbed_out)
        ),
        GameEvent::SubstitutionEdited(event) => format!(
            "Sub {} now at {}: {}",
            event.id,
            format_clock(event.event_time),
            describe_swap(&event.subbed_in, &event.subbed_out)
        ),
        GameEvent::SubstitutionDeleted(event) => format!("Sub {} deleted", event.id),
        GameEvent::FoulRecorded { foul, status } => {
            let total = game.fouls().cumulative_foul_count(foul.player.id);
            let mut line = format!(
                "Foul on {} at {} ({} total)",
                foul.player.label(),
                format_clock(foul.time_remaining),
                total
            );
            if *status == FoulStatus::FouledOut {
                line.push_str(" -- FOULED OUT");
            }
            if game.in_bonus(foul.period_id).unwrap_or(false) {
                line.push_str(", opponent in the bonus");
            }
            line
        }
        GameEvent::PeriodEnded(PeriodTransition::NextPeriod { period_number, .. }) => {
            format!(
                "Period {} begins. Court is empty; sub players in before starting the clock.",
                period_number
            )
        }
        GameEvent::PeriodEnded(PeriodTransition::GameOver) => "Final.".into(),
    }
}

/// Clock, court and the current period's substitution table.
pub fn render_status(game: &Game) -> String {
    let period = game.current_period();
    let mut out = String::new();

    let phase = if game.is_game_over() {
        "Final".to_string()
    } else {
        format!("Period {} of {}", period.period_number, game.format().periods)
    };
    let clock = game.clock().snapshot();
    let _ = writeln!(
        out,
        "{} vs {}  |  {}  |  {}{}",
        game.team,
        game.opponent,
        phase,
        clock.display,
        if clock.is_running { " (running)" } else { "" }
    );

    let team_fouls = game.team_fouls(period.id).unwrap_or(0);
    let bonus = if game.in_bonus(period.id).unwrap_or(false) {
        " (bonus)"
    } else {
        ""
    };
    let _ = writeln!(out, "Team fouls: {team_fouls}{bonus}");

    let on_court: Vec<String> = game.on_court().iter().map(|p| p.label()).collect();
    let _ = writeln!(
        out,
        "On court ({}/{}): {}",
        on_court.len(),
        game.rules().max_on_court,
        if on_court.is_empty() {
            "-".to_string()
        } else {
            on_court.join(", ")
        }
    );

    let rows = game.substitution_rows(period.id).unwrap_or_default();
    if rows.is_empty() {
        let _ = write!(out, "No substitutions this period.");
    } else {
        let _ = write!(out, "{}", render_substitution_table(&rows));
    }
    out
}

/// Substitution table, one row per event in the order given.
pub fn render_substitution_table(rows: &[SubstitutionRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>4}  {:>5}  {:<28}  {}", "Sub", "Time", "In", "Out");
    for row in rows {
        let _ = writeln!(
            out,
            "{:>4}  {:>5}  {:<28}  {}",
            row.event_id,
            row.display_time,
            labels(&row.subbed_in),
            labels(&row.subbed_out)
        );
    }
    out.trim_end().to_string()
}

/// Minutes and fouls per player.
pub fn render_box_score(game: &Game) -> String {
    let lines = game.box_score();
    let periods = game.periods().len();
    let mut out = String::new();

    let _ = write!(out, "   {:>4} {:<16}", "#", "Player");
    for n in 1..=periods {
        let _ = write!(out, " {:>6}", format!("P{n}"));
    }
    let _ = writeln!(out, " {:>6} {:>3}", "Total", "PF");

    for line in &lines {
        let marker = if line.on_court { '*' } else { ' ' };
        let _ = write!(
            out,
            " {} {:>4} {:<16}",
            marker, line.player.number, line.player.name
        );
        for secs in &line.seconds_by_period {
            let _ = write!(out, " {:>6}", format_clock(*secs));
        }
        let _ = write!(
            out,
            " {:>6} {:>3}",
            format_clock(line.total_seconds),
            line.total_fouls
        );
        if line.status == FoulStatus::FouledOut {
            let _ = write!(out, "  fouled out");
        }
        let _ = writeln!(out);
    }
    out.trim_end().to_string()
}

pub fn render_games(games: &[GameSummary]) -> String {
    if games.is_empty() {
        return "No saved games.".into();
    }
    let mut out = String::new();
    for g in games {
        let _ = writeln!(
            out,
            "{}  {} vs {}  {}  (updated {})",
            g.id,
            g.team,
            g.opponent,
            if g.game_over { "final" } else { "in progress" },
            g.updated_at
        );
    }
    out.trim_end().to_string()
}

fn describe_swap(subbed_in: &[Player], subbed_out: &[Player]) -> String {
    match (subbed_in.is_empty(), subbed_out.is_empty()) {
        (false, false) => format!("in {}; out {}", labels(subbed_in), labels(subbed_out)),
        (false, true) => format!("in {}", labels(subbed_in)),
        (true, false) => format!("out {}", labels(subbed_out)),
        (true, true) => "no players".into(),
    }
}

fn labels(players: &[Player]) -> String {
    if players.is_empty() {
        return "-".into();
    }
    players
        .iter()
        .map(Player::label)
        .collect::<Vec<_>>()
        .join(", ")
}
