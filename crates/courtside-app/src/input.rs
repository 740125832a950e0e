// Console input handling.
//
// Translates one line typed at the scorer's table into a UserCommand for the
// app event loop. Parsing is purely syntactic: jersey numbers are not checked
// against the roster here.

use courtside_core::time_format::{parse_clock, ParseClockError};
use courtside_core::EventId;
use thiserror::Error;

use crate::protocol::UserCommand;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("unknown command `{0}`; type `help` for a list")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("unexpected `{0}`; expected `in`, `out` or `at`")]
    UnexpectedToken(String),

    #[error("`{0}` given more than once")]
    DuplicateClause(String),

    #[error("`{0}` is not a valid number")]
    InvalidNumber(String),

    #[error(transparent)]
    InvalidClock(#[from] ParseClockError),
}

const SUB_USAGE: &str = "sub in <#,#> out <#,#> [at M:SS]";
const EDIT_USAGE: &str = "edit <event> [at M:SS] [in <#,#>] [out <#,#>]";
const DELETE_USAGE: &str = "delete <event>";
const FOUL_USAGE: &str = "foul <#>";
const ADJUST_USAGE: &str = "adjust <+/-seconds or M:SS>";

pub const HELP: &str = "\
Commands:
  start                                   start the clock
  pause                                   pause the clock
  adjust <+/-secs|M:SS>                   correct a paused clock
  sub in <#,#> out <#,#> [at M:SS]        record a substitution
  edit <event> [at M:SS] [in ..] [out ..] change a recorded substitution
  delete <event>                          remove a recorded substitution
  foul <#>                                charge a foul to a player on court
  end                                     end the current period
  show                                    clock, court and substitution table
  box                                     minutes and fouls per player
  games                                   list saved games
  help                                    this list
  quit                                    exit
Player lists are jersey numbers separated by commas or spaces; `none` for an empty list.";

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<UserCommand>, InputError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, rest)) = tokens.split_first() else {
        return Ok(None);
    };

    let cmd = match head.to_ascii_lowercase().as_str() {
        "start" | "go" => UserCommand::StartClock,
        "pause" | "stop" => UserCommand::PauseClock,
        "adjust" | "adj" => parse_adjust(rest)?,
        "sub" | "s" => parse_substitute(rest)?,
        "edit" | "e" => parse_edit(rest)?,
        "delete" | "del" => match rest {
            [id] => UserCommand::DeleteSubstitution(parse_event_id(id)?),
            _ => return Err(InputError::Usage(DELETE_USAGE)),
        },
        "foul" | "f" => match rest {
            [number] => UserCommand::Foul(jersey(number)),
            _ => return Err(InputError::Usage(FOUL_USAGE)),
        },
        "end" => UserCommand::EndPeriod,
        "show" | "status" => UserCommand::ShowStatus,
        "box" => UserCommand::ShowBoxScore,
        "games" => UserCommand::ListGames,
        "help" | "?" => UserCommand::Help,
        "quit" | "q" | "exit" => UserCommand::Quit,
        other => return Err(InputError::UnknownCommand(other.to_string())),
    };

    Ok(Some(cmd))
}

// ---------------------------------------------------------------------------
// Command parsers
// ---------------------------------------------------------------------------

fn parse_adjust(rest: &[&str]) -> Result<UserCommand, InputError> {
    let [raw] = rest else {
        return Err(InputError::Usage(ADJUST_USAGE));
    };
    let (negative, magnitude) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, *raw),
    };
    let secs = i64::from(parse_clock(magnitude)?);
    Ok(UserCommand::AdjustClock(if negative { -secs } else { secs }))
}

fn parse_substitute(rest: &[&str]) -> Result<UserCommand, InputError> {
    let clauses = parse_clauses(rest)?;
    if clauses.subbed_in.is_none() && clauses.subbed_out.is_none() {
        return Err(InputError::Usage(SUB_USAGE));
    }
    Ok(UserCommand::Substitute {
        subbed_in: clauses.subbed_in.unwrap_or_default(),
        subbed_out: clauses.subbed_out.unwrap_or_default(),
        at: clauses.at,
    })
}

fn parse_edit(rest: &[&str]) -> Result<UserCommand, InputError> {
    let Some((id, rest)) = rest.split_first() else {
        return Err(InputError::Usage(EDIT_USAGE));
    };
    let event_id = parse_event_id(id)?;
    let clauses = parse_clauses(rest)?;
    if clauses.is_empty() {
        return Err(InputError::Usage(EDIT_USAGE));
    }
    Ok(UserCommand::EditSubstitution {
        event_id,
        at: clauses.at,
        subbed_in: clauses.subbed_in,
        subbed_out: clauses.subbed_out,
    })
}

// ---------------------------------------------------------------------------
// Clauses: `in <list>`, `out <list>`, `at <M:SS>` in any order
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Clauses {
    subbed_in: Option<Vec<String>>,
    subbed_out: Option<Vec<String>>,
    at: Option<u32>,
}

impl Clauses {
    fn is_empty(&self) -> bool {
        self.subbed_in.is_none() && self.subbed_out.is_none() && self.at.is_none()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Keyword {
    In,
    Out,
    At,
}

impl Keyword {
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "in" => Some(Keyword::In),
            "out" => Some(Keyword::Out),
            "at" => Some(Keyword::At),
            _ => None,
        }
    }
}

fn parse_clauses(tokens: &[&str]) -> Result<Clauses, InputError> {
    // Group tokens under the keyword that precedes them.
    let mut groups: Vec<(Keyword, Vec<&str>)> = Vec::new();
    for &token in tokens {
        if let Some(keyword) = Keyword::parse(token) {
            if groups.iter().any(|(k, _)| *k == keyword) {
                return Err(InputError::DuplicateClause(token.to_ascii_lowercase()));
            }
            groups.push((keyword, Vec::new()));
        } else {
            match groups.last_mut() {
                Some((_, values)) => values.push(token),
                None => return Err(InputError::UnexpectedToken(token.to_string())),
            }
        }
    }

    let mut clauses = Clauses::default();
    for (keyword, values) in groups {
        match keyword {
            Keyword::In => clauses.subbed_in = Some(jersey_list(&values)),
            Keyword::Out => clauses.subbed_out = Some(jersey_list(&values)),
            Keyword::At => {
                let [time] = values.as_slice() else {
                    return Err(ParseClockError::Empty.into());
                };
                clauses.at = Some(parse_clock(time)?);
            }
        }
    }
    Ok(clauses)
}

/// Split `4,5 11` style lists. `none` or `-` means an explicitly empty list.
fn jersey_list(values: &[&str]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "-" && !v.eq_ignore_ascii_case("none"))
        .map(jersey)
        .collect()
}

fn jersey(raw: &str) -> String {
    raw.trim_start_matches('#').to_string()
}

fn parse_event_id(raw: &str) -> Result<EventId, InputError> {
    raw.trim_start_matches('#')
        .parse::<u64>()
        .map(EventId)
        .map_err(|_| InputError::InvalidNumber(raw.to_string()))
}
