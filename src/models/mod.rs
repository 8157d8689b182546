use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Placeholder shown wherever a value could not be extracted
pub const NOT_AVAILABLE: &str = "N/A";

/// The betting markets published by the predictions site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionType {
    #[serde(rename = "1x2")]
    OneXTwo,
    MatchOfTheDay,
    Top10,
    AccumulatorTips,
    HtFtTips,
    DrawNoBet,
    DoubleChance,
    Special,
    Goalscorer,
    BothTeamsToScore,
    CorrectScore,
    Cards,
    Corners,
    Goals,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown prediction type: {0}")]
pub struct UnknownPredictionType(pub String);

impl PredictionType {
    /// Catalog order, used for navigation and section ordering
    pub const ALL: [PredictionType; 14] = [
        PredictionType::OneXTwo,
        PredictionType::MatchOfTheDay,
        PredictionType::Top10,
        PredictionType::AccumulatorTips,
        PredictionType::HtFtTips,
        PredictionType::DrawNoBet,
        PredictionType::DoubleChance,
        PredictionType::Special,
        PredictionType::Goalscorer,
        PredictionType::BothTeamsToScore,
        PredictionType::CorrectScore,
        PredictionType::Cards,
        PredictionType::Corners,
        PredictionType::Goals,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            PredictionType::OneXTwo => "1x2",
            PredictionType::MatchOfTheDay => "match_of_the_day",
            PredictionType::Top10 => "top10",
            PredictionType::AccumulatorTips => "accumulator_tips",
            PredictionType::HtFtTips => "ht_ft_tips",
            PredictionType::DrawNoBet => "draw_no_bet",
            PredictionType::DoubleChance => "double_chance",
            PredictionType::Special => "special",
            PredictionType::Goalscorer => "goalscorer",
            PredictionType::BothTeamsToScore => "both_teams_to_score",
            PredictionType::CorrectScore => "correct_score",
            PredictionType::Cards => "cards",
            PredictionType::Corners => "corners",
            PredictionType::Goals => "goals",
        }
    }

    /// URL path segment on the site. 1X2 lives on the homepage and has none.
    pub fn slug(&self) -> Option<String> {
        match self {
            PredictionType::OneXTwo => None,
            other => Some(other.key().replace('_', "-")),
        }
    }

    pub fn url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self.slug() {
            None => base.to_string(),
            Some(slug) => format!("{}/today-football-predictions/{}/", base, slug),
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            PredictionType::OneXTwo => "🎯",
            PredictionType::MatchOfTheDay => "🌟",
            PredictionType::Top10 => "🔝",
            PredictionType::AccumulatorTips => "💫",
            PredictionType::HtFtTips => "⏱️",
            PredictionType::DrawNoBet => "🛡️",
            PredictionType::DoubleChance => "2️⃣",
            PredictionType::Special => "✨",
            PredictionType::Goalscorer => "⚽",
            PredictionType::BothTeamsToScore => "🥅",
            PredictionType::CorrectScore => "📊",
            PredictionType::Cards => "🟨",
            PredictionType::Corners => "🚩",
            PredictionType::Goals => "⚽",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PredictionType::OneXTwo => "1X2",
            PredictionType::MatchOfTheDay => "Match of the Day",
            PredictionType::Top10 => "Top 10 Predictions",
            PredictionType::AccumulatorTips => "Accumulator Tips (ACCA)",
            PredictionType::HtFtTips => "Half Time / Full Time",
            PredictionType::DrawNoBet => "Draw No Bet (DNB)",
            PredictionType::DoubleChance => "Double Chance",
            PredictionType::Special => "Special Predictions",
            PredictionType::Goalscorer => "Goalscorers",
            PredictionType::BothTeamsToScore => "Both Teams to Score (BTTS)",
            PredictionType::CorrectScore => "Correct Score",
            PredictionType::Cards => "Cards",
            PredictionType::Corners => "Corners",
            PredictionType::Goals => "Goals",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PredictionType::OneXTwo => "Full-time result of the match (home win, draw, away win)",
            PredictionType::MatchOfTheDay => "The premium pick of the day with the deepest analysis",
            PredictionType::Top10 => "The ten strongest predictions of the day",
            PredictionType::AccumulatorTips => "High value combinations of bets",
            PredictionType::HtFtTips => "Predicted results at half time and full time",
            PredictionType::DrawNoBet => "Stake refunded if the match ends in a draw",
            PredictionType::DoubleChance => "Two of the three possible results",
            PredictionType::Special => "Special selections with in-depth analysis",
            PredictionType::Goalscorer => "Predictions on who will score",
            PredictionType::BothTeamsToScore => "Will both teams find the net",
            PredictionType::CorrectScore => "Predicted exact final score",
            PredictionType::Cards => "Yellow and red card totals",
            PredictionType::Corners => "Total number of corners",
            PredictionType::Goals => "Total number of goals",
        }
    }
}

impl fmt::Display for PredictionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PredictionType {
    type Err = UnknownPredictionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PredictionType::ALL
            .into_iter()
            .find(|kind| kind.key() == s)
            .ok_or_else(|| UnknownPredictionType(s.to_string()))
    }
}

/// Odds for one match, shaped by its prediction type.
/// Any cell that was missing on the page is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Odds {
    Single {
        home: Option<String>,
    },
    CorrectScore {
        score: Option<String>,
        odds: Option<String>,
    },
    BothTeamsToScore {
        yes: Option<String>,
        no: Option<String>,
    },
    OverUnder {
        line: Option<String>,
        over: Option<String>,
        under: Option<String>,
    },
    ThreeWay {
        home: Option<String>,
        draw: Option<String>,
        away: Option<String>,
    },
}

fn cell(cells: &[String], index: usize) -> Option<String> {
    cells
        .get(index)
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

impl Odds {
    /// Pull the odds columns for `kind` out of a split table row.
    /// Columns 0 and 1 are kickoff and teams.
    pub fn extract(kind: PredictionType, cells: &[String]) -> Self {
        match kind {
            PredictionType::MatchOfTheDay => Odds::Single {
                home: cell(cells, 2),
            },
            PredictionType::CorrectScore => Odds::CorrectScore {
                score: cell(cells, 2),
                odds: cell(cells, 3),
            },
            PredictionType::BothTeamsToScore => Odds::BothTeamsToScore {
                yes: cell(cells, 2),
                no: cell(cells, 3),
            },
            PredictionType::Goals | PredictionType::Corners | PredictionType::Cards => {
                Odds::OverUnder {
                    line: cell(cells, 2),
                    over: cell(cells, 3),
                    under: cell(cells, 4),
                }
            }
            _ => Odds::ThreeWay {
                home: cell(cells, 2),
                draw: cell(cells, 3),
                away: cell(cells, 4),
            },
        }
    }

    /// Field names and values in column order, as written to the snapshot
    pub fn fields(&self) -> Vec<(&'static str, Option<&str>)> {
        match self {
            Odds::Single { home } => vec![("1", home.as_deref())],
            Odds::CorrectScore { score, odds } => {
                vec![("score", score.as_deref()), ("odds", odds.as_deref())]
            }
            Odds::BothTeamsToScore { yes, no } => {
                vec![("yes", yes.as_deref()), ("no", no.as_deref())]
            }
            Odds::OverUnder { line, over, under } => vec![
                ("line", line.as_deref()),
                ("over", over.as_deref()),
                ("under", under.as_deref()),
            ],
            Odds::ThreeWay { home, draw, away } => vec![
                ("1", home.as_deref()),
                ("X", draw.as_deref()),
                ("2", away.as_deref()),
            ],
        }
    }

    /// Names of the fields that could not be read
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name)
            .collect()
    }

    /// Rebuild from a snapshot map. Absent keys become `None` and extra keys
    /// (such as an `error` message) are ignored.
    fn from_map(kind: PredictionType, mut map: BTreeMap<String, Option<String>>) -> Self {
        let mut take = |name: &str| map.remove(name).flatten();
        match Odds::extract(kind, &[]) {
            Odds::Single { .. } => Odds::Single { home: take("1") },
            Odds::CorrectScore { .. } => Odds::CorrectScore {
                score: take("score"),
                odds: take("odds"),
            },
            Odds::BothTeamsToScore { .. } => Odds::BothTeamsToScore {
                yes: take("yes"),
                no: take("no"),
            },
            Odds::OverUnder { .. } => Odds::OverUnder {
                line: take("line"),
                over: take("over"),
                under: take("under"),
            },
            Odds::ThreeWay { .. } => Odds::ThreeWay {
                home: take("1"),
                draw: take("X"),
                away: take("2"),
            },
        }
    }

    fn to_map(&self) -> BTreeMap<String, Option<String>> {
        self.fields()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.map(str::to_string)))
            .collect()
    }
}

/// Type-specific extras that some markets publish next to the odds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdditionalInfo {
    None,
    Confidence(String),
    Rank(Option<String>),
    CombinedOdds(Option<String>),
    HalfTimeFullTime {
        ht: Option<String>,
        ft: Option<String>,
    },
}

impl AdditionalInfo {
    pub fn extract(kind: PredictionType, cells: &[String]) -> Self {
        match kind {
            PredictionType::MatchOfTheDay => AdditionalInfo::Confidence("High".to_string()),
            PredictionType::Top10 => {
                // "3. Arsenal..." -> rank "3"
                let rank = cells
                    .get(1)
                    .filter(|teams| teams.contains('.'))
                    .and_then(|teams| teams.split('.').next())
                    .map(|rank| rank.trim().to_string());
                AdditionalInfo::Rank(rank)
            }
            PredictionType::AccumulatorTips => {
                let combined = if cells.len() > 3 {
                    cells.last().cloned()
                } else {
                    None
                };
                AdditionalInfo::CombinedOdds(combined)
            }
            PredictionType::HtFtTips => AdditionalInfo::HalfTimeFullTime {
                ht: cell(cells, 2),
                ft: cell(cells, 3),
            },
            _ => AdditionalInfo::None,
        }
    }

    pub fn fields(&self) -> Vec<(&'static str, Option<&str>)> {
        match self {
            AdditionalInfo::None => Vec::new(),
            AdditionalInfo::Confidence(level) => vec![("confidence", Some(level.as_str()))],
            AdditionalInfo::Rank(rank) => vec![("rank", rank.as_deref())],
            AdditionalInfo::CombinedOdds(odds) => vec![("combined_odds", odds.as_deref())],
            AdditionalInfo::HalfTimeFullTime { ht, ft } => vec![
                ("ht_prediction", ht.as_deref()),
                ("ft_prediction", ft.as_deref()),
            ],
        }
    }

    fn from_map(kind: PredictionType, mut map: BTreeMap<String, Option<String>>) -> Self {
        let mut take = |name: &str| map.remove(name).flatten();
        match kind {
            PredictionType::MatchOfTheDay => AdditionalInfo::Confidence(
                take("confidence").unwrap_or_else(|| "High".to_string()),
            ),
            PredictionType::Top10 => AdditionalInfo::Rank(take("rank")),
            PredictionType::AccumulatorTips => AdditionalInfo::CombinedOdds(take("combined_odds")),
            PredictionType::HtFtTips => AdditionalInfo::HalfTimeFullTime {
                ht: take("ht_prediction"),
                ft: take("ft_prediction"),
            },
            _ => AdditionalInfo::None,
        }
    }

    fn to_map(&self) -> BTreeMap<String, Option<String>> {
        self.fields()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.map(str::to_string)))
            .collect()
    }
}

/// One match row scraped from a prediction page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawMatchRecord", into = "RawMatchRecord")]
pub struct MatchRecord {
    pub league: String,
    pub datetime: String,
    pub teams: String,
    pub prediction_type: PredictionType,
    pub odds: Odds,
    pub additional_info: AdditionalInfo,
}

/// Wire form of [`MatchRecord`]: odds and extras as flat string maps
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawMatchRecord {
    league: String,
    datetime: String,
    teams: String,
    prediction_type: PredictionType,
    #[serde(default)]
    odds: BTreeMap<String, Option<String>>,
    #[serde(default)]
    additional_info: BTreeMap<String, Option<String>>,
}

impl From<RawMatchRecord> for MatchRecord {
    fn from(raw: RawMatchRecord) -> Self {
        MatchRecord {
            odds: Odds::from_map(raw.prediction_type, raw.odds),
            additional_info: AdditionalInfo::from_map(raw.prediction_type, raw.additional_info),
            league: raw.league,
            datetime: raw.datetime,
            teams: raw.teams,
            prediction_type: raw.prediction_type,
        }
    }
}

impl From<MatchRecord> for RawMatchRecord {
    fn from(record: MatchRecord) -> Self {
        RawMatchRecord {
            odds: record.odds.to_map(),
            additional_info: record.additional_info.to_map(),
            league: record.league,
            datetime: record.datetime,
            teams: record.teams,
            prediction_type: record.prediction_type,
        }
    }
}

/// Read a JSON array element by element, dropping (and logging) the entries
/// that do not parse, such as records of an unknown prediction type
fn skip_unreadable<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping unreadable snapshot entry: {}", e);
                None
            }
        })
        .collect())
}

/// Summary of a scrape run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub timestamp: NaiveDateTime,
    pub total_matches: usize,
    #[serde(deserialize_with = "skip_unreadable")]
    pub prediction_types: Vec<PredictionType>,
    pub leagues: Vec<String>,
    pub last_update: String,
}

/// Everything scraped in one run, as written to the JSON snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub url: String,
    #[serde(deserialize_with = "skip_unreadable")]
    pub matches: Vec<MatchRecord>,
    pub metadata: Metadata,
}
