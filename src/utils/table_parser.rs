use crate::models::{AdditionalInfo, MatchRecord, Odds, PredictionType};
use thiserror::Error;
use tracing::{debug, warn};

/// First cell of the column header row
const HEADER_MARKER: &str = "Kick Off";

/// A " - " row containing any of these is a column banner, not a league
const NON_LEAGUE_TOKENS: [&str; 6] = ["1", "X", "2", "Goals", "Cards", "Corners"];

/// Which league the rows currently being read belong to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LeagueState {
    #[default]
    NoLeague,
    InLeague(String),
}

impl LeagueState {
    pub fn league(&self) -> Option<&str> {
        match self {
            LeagueState::NoLeague => None,
            LeagueState::InLeague(name) => Some(name),
        }
    }
}

/// Why a line did not produce a match
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("line has no column delimiter")]
    NoDelimiter,
    #[error("table separator row")]
    Separator,
    #[error("first cell is empty")]
    EmptyFirstCell,
    #[error("column header row")]
    HeaderRow,
    #[error("league-like row contains a market token: {0}")]
    AmbiguousLeagueHeader(String),
    #[error("row has {0} cells, need at least 3")]
    TooFewCells(usize),
    #[error("no league header seen yet")]
    NoLeague,
    #[error("first cell `{0}` is not a kickoff time")]
    NotKickoff(String),
}

/// What a single line turned into
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Match(MatchRecord),
    League(String),
    Skip(SkipReason),
}

/// Result of parsing one page, skips included
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub matches: Vec<MatchRecord>,
    /// (line number, reason) for every line with a delimiter that was dropped
    pub skipped: Vec<(usize, SkipReason)>,
}

fn split_cells(line: &str) -> Vec<String> {
    line.split('|').map(|cell| cell.trim().to_string()).collect()
}

fn is_separator(line: &str, cells: &[String]) -> bool {
    if line.contains("-+-") {
        return true;
    }
    let mut non_empty = cells.iter().filter(|c| !c.is_empty()).peekable();
    non_empty.peek().is_some()
        && non_empty.all(|c| c.chars().all(|ch| matches!(ch, '-' | ':' | '+')))
        && cells.iter().any(|c| c.contains('-'))
}

/// Classify one line and advance the league state.
pub fn parse_row(state: &mut LeagueState, line: &str, kind: PredictionType) -> RowOutcome {
    if !line.contains('|') {
        return RowOutcome::Skip(SkipReason::NoDelimiter);
    }

    let cells = split_cells(line);

    if is_separator(line, &cells) {
        return RowOutcome::Skip(SkipReason::Separator);
    }
    let first = cells[0].as_str();
    if first.is_empty() {
        return RowOutcome::Skip(SkipReason::EmptyFirstCell);
    }
    if first.starts_with(HEADER_MARKER) {
        return RowOutcome::Skip(SkipReason::HeaderRow);
    }

    // League header: "England - Premier League | ... | ..."
    if cells.len() >= 3 && first.contains(" - ") {
        if NON_LEAGUE_TOKENS.iter().any(|token| first.contains(token)) {
            return RowOutcome::Skip(SkipReason::AmbiguousLeagueHeader(first.to_string()));
        }
        *state = LeagueState::InLeague(first.to_string());
        return RowOutcome::League(first.to_string());
    }

    let league = match state.league() {
        Some(league) => league.to_string(),
        None => return RowOutcome::Skip(SkipReason::NoLeague),
    };
    if cells.len() < 3 {
        return RowOutcome::Skip(SkipReason::TooFewCells(cells.len()));
    }
    if !first.starts_with(|c: char| c.is_ascii_digit()) {
        return RowOutcome::Skip(SkipReason::NotKickoff(first.to_string()));
    }

    let odds = Odds::extract(kind, &cells);
    let missing = odds.missing_fields();
    if !missing.is_empty() {
        warn!(
            "{}: missing odds {:?} for {} ({})",
            kind, missing, cells[1], league
        );
    }

    RowOutcome::Match(MatchRecord {
        league,
        datetime: cells[0].clone(),
        teams: cells[1].clone(),
        prediction_type: kind,
        additional_info: AdditionalInfo::extract(kind, &cells),
        odds,
    })
}

/// Parse a page of rendered text, keeping the reason for every dropped row.
pub fn parse_page(text: &str, kind: PredictionType) -> ParsedPage {
    let mut state = LeagueState::NoLeague;
    let mut page = ParsedPage::default();

    debug!("Analyzing content for {}", kind);

    for (line_no, line) in text.lines().enumerate() {
        match parse_row(&mut state, line, kind) {
            RowOutcome::Match(record) => {
                debug!("Found match: {}", record.teams);
                page.matches.push(record);
            }
            RowOutcome::League(name) => debug!("Found league: {}", name),
            RowOutcome::Skip(SkipReason::NoDelimiter) => {}
            RowOutcome::Skip(reason) => {
                debug!("Skipping line {}: {}", line_no, reason);
                page.skipped.push((line_no, reason));
            }
        }
    }

    page
}

/// Parse a page of rendered text into match records
pub fn parse_matches(text: &str, kind: PredictionType) -> Vec<MatchRecord> {
    parse_page(text, kind).matches
}
