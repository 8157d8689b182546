use crate::models::{Dataset, MatchRecord, Odds, PredictionType, NOT_AVAILABLE};
use anyhow::{Context, Result};
use askama::Template;
use tracing::debug;

/// Matches of one league, in the order they were scraped
#[derive(Debug, Clone, PartialEq)]
pub struct LeagueGroup<'a> {
    pub name: &'a str,
    pub matches: Vec<&'a MatchRecord>,
}

/// Leagues of one prediction type, in first-seen order
#[derive(Debug, Clone, PartialEq)]
pub struct TypeGroup<'a> {
    pub prediction_type: PredictionType,
    pub leagues: Vec<LeagueGroup<'a>>,
}

/// Group matches by prediction type, then league, keeping first-seen order at both levels
pub fn group_matches(matches: &[MatchRecord]) -> Vec<TypeGroup<'_>> {
    let mut groups: Vec<TypeGroup<'_>> = Vec::new();

    for record in matches {
        let group_index = match groups
            .iter()
            .position(|g| g.prediction_type == record.prediction_type)
        {
            Some(index) => index,
            None => {
                groups.push(TypeGroup {
                    prediction_type: record.prediction_type,
                    leagues: Vec::new(),
                });
                groups.len() - 1
            }
        };
        let leagues = &mut groups[group_index].leagues;

        match leagues.iter_mut().find(|l| l.name == record.league) {
            Some(league) => league.matches.push(record),
            None => leagues.push(LeagueGroup {
                name: &record.league,
                matches: vec![record],
            }),
        }
    }

    groups
}

/// Split "ArsenalChelsea" into home and away.
///
/// The away team starts at the first upper-case character from the fourth
/// character on. Names like "Real MadridBarcelona" split in the wrong place
/// ("Real" / "MadridBarcelona"); without such a character the whole string is
/// the home team.
pub fn split_teams(teams: &str) -> (String, String) {
    let teams = teams.trim();
    for (index, c) in teams.char_indices().skip(3) {
        if c.is_uppercase() {
            return (
                teams[..index].trim().to_string(),
                teams[index..].trim().to_string(),
            );
        }
    }
    (teams.to_string(), String::new())
}

fn shown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NOT_AVAILABLE)
}

/// Labels of the odds boxes shown for one match
pub fn odds_boxes(odds: &Odds) -> Vec<String> {
    match odds {
        Odds::OverUnder { line, over, under } => vec![
            shown(line).to_string(),
            format!("Over {}", shown(over)),
            format!("Under {}", shown(under)),
        ],
        Odds::BothTeamsToScore { yes, no } => {
            vec![format!("Yes {}", shown(yes)), format!("No {}", shown(no))]
        }
        Odds::CorrectScore { score, odds } => {
            vec![shown(score).to_string(), shown(odds).to_string()]
        }
        Odds::Single { home } => vec![shown(home).to_string()],
        Odds::ThreeWay { home, draw, away } => vec![
            shown(home).to_string(),
            shown(draw).to_string(),
            shown(away).to_string(),
        ],
    }
}

pub struct MatchRow<'a> {
    pub kickoff: &'a str,
    pub home: String,
    pub away: String,
    pub odds: Vec<String>,
}

pub struct LeagueView<'a> {
    pub name: &'a str,
    pub rows: Vec<MatchRow<'a>>,
}

pub struct SectionView<'a> {
    pub key: &'static str,
    pub icon: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub leagues: Vec<LeagueView<'a>>,
}

#[derive(Template)]
#[template(path = "report.html")]
pub struct ReportTemplate<'a> {
    pub updated_on: String,
    pub sections: Vec<SectionView<'a>>,
    pub total_matches: usize,
    pub league_count: usize,
    pub last_update: &'a str,
}

impl<'a> ReportTemplate<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        let groups = group_matches(&dataset.matches);

        // Catalog order, not arrival order
        let sections = PredictionType::ALL
            .into_iter()
            .filter_map(|kind| groups.iter().find(|g| g.prediction_type == kind))
            .map(section_view)
            .collect();

        ReportTemplate {
            updated_on: dataset
                .metadata
                .timestamp
                .format("%d/%m/%Y at %H:%M")
                .to_string(),
            sections,
            total_matches: dataset.metadata.total_matches,
            league_count: dataset.metadata.leagues.len(),
            last_update: &dataset.metadata.last_update,
        }
    }
}

fn section_view<'a>(group: &TypeGroup<'a>) -> SectionView<'a> {
    let kind = group.prediction_type;
    SectionView {
        key: kind.key(),
        icon: kind.icon(),
        name: kind.display_name(),
        description: kind.description(),
        leagues: group
            .leagues
            .iter()
            .map(|league| LeagueView {
                name: league.name,
                rows: league
                    .matches
                    .iter()
                    .map(|&record| {
                        let (home, away) = split_teams(&record.teams);
                        MatchRow {
                            kickoff: &record.datetime,
                            home,
                            away,
                            odds: odds_boxes(&record.odds),
                        }
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Render the dataset as a self-contained HTML page
pub fn render_report(dataset: &Dataset) -> Result<String> {
    debug!(
        "Available prediction types in data: {:?}",
        dataset.metadata.prediction_types
    );
    debug!("Total matches: {}", dataset.matches.len());

    ReportTemplate::new(dataset)
        .render()
        .context("Failed to render report template")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AdditionalInfo;
    use crate::utils::aggregator::{build_dataset_at, PageText};
    use chrono::NaiveDate;

    fn record(kind: PredictionType, league: &str, teams: &str, odds: Odds) -> MatchRecord {
        MatchRecord {
            league: league.to_string(),
            datetime: "19:45".to_string(),
            teams: teams.to_string(),
            prediction_type: kind,
            odds,
            additional_info: AdditionalInfo::None,
        }
    }

    fn three_way(home: &str) -> Odds {
        Odds::ThreeWay {
            home: Some(home.to_string()),
            draw: None,
            away: None,
        }
    }

    #[test]
    fn test_split_teams() {
        assert_eq!(
            split_teams("ArsenalChelsea"),
            ("Arsenal".to_string(), "Chelsea".to_string())
        );
        assert_eq!(split_teams("team a"), ("team a".to_string(), String::new()));
        assert_eq!(
            split_teams("  Man UtdLeeds "),
            ("Man".to_string(), "UtdLeeds".to_string())
        );
        // Known limitation: the first capital after the offset wins
        assert_eq!(
            split_teams("Real MadridBarcelona"),
            ("Real".to_string(), "MadridBarcelona".to_string())
        );
        assert_eq!(split_teams("AB"), ("AB".to_string(), String::new()));
    }

    #[test]
    fn test_grouping_keeps_first_seen_order() {
        let matches = vec![
            record(PredictionType::OneXTwo, "Spain - La Liga", "SevillaBetis", three_way("1")),
            record(PredictionType::Goals, "Italy - Serie A", "RomaLazio", three_way("2")),
            record(PredictionType::OneXTwo, "England - Premier League", "ArsenalChelsea", three_way("3")),
            record(PredictionType::OneXTwo, "Spain - La Liga", "GetafeGirona", three_way("4")),
        ];

        let groups = group_matches(&matches);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].prediction_type, PredictionType::OneXTwo);
        let leagues: Vec<&str> = groups[0].leagues.iter().map(|l| l.name).collect();
        assert_eq!(leagues, vec!["Spain - La Liga", "England - Premier League"]);
        let la_liga: Vec<&str> = groups[0].leagues[0]
            .matches
            .iter()
            .map(|m| m.teams.as_str())
            .collect();
        assert_eq!(la_liga, vec!["SevillaBetis", "GetafeGirona"]);

        assert_eq!(group_matches(&matches), groups);
    }

    #[test]
    fn test_odds_boxes_per_shape() {
        assert_eq!(
            odds_boxes(&Odds::OverUnder {
                line: Some("2.5".to_string()),
                over: Some("1.8".to_string()),
                under: None,
            }),
            vec!["2.5", "Over 1.8", "Under N/A"]
        );
        assert_eq!(
            odds_boxes(&Odds::BothTeamsToScore {
                yes: Some("1.7".to_string()),
                no: Some("2.1".to_string()),
            }),
            vec!["Yes 1.7", "No 2.1"]
        );
        assert_eq!(odds_boxes(&Odds::Single { home: None }), vec!["N/A"]);
        assert_eq!(odds_boxes(&three_way("1.5")), vec!["1.5", "N/A", "N/A"]);
    }

    fn dataset(pages: &[PageText]) -> Dataset {
        let now = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(18, 30, 0)
            .unwrap();
        build_dataset_at("https://onemillionpredictions.com", pages, now)
    }

    #[test]
    fn test_sections_follow_catalog_order() {
        let pages = vec![
            PageText {
                prediction_type: PredictionType::Goals,
                markdown: "Italy - Serie A | Line | Over | Under\n20:45 | InterMilan | 2.5 | 1.75 | 2.05\n"
                    .to_string(),
            },
            PageText {
                prediction_type: PredictionType::OneXTwo,
                markdown: "Spain - La Liga | 1 | X | 2\n21:00 | SevillaBetis | 2.10 | 3.30 | 3.40\n"
                    .to_string(),
            },
        ];
        let html = render_report(&dataset(&pages)).unwrap();

        let one_x_two = html.find("id=\"1x2\"").unwrap();
        let goals = html.find("id=\"goals\"").unwrap();
        assert!(one_x_two < goals);
        assert!(!html.contains("id=\"corners\""));

        assert!(html.contains("Updated on 09"));
        assert!(html.contains("2024 at 18:30"));
        assert!(html.contains("<span class=\"team-home\">Inter</span>"));
        assert!(html.contains("<span class=\"team-away\">Milan</span>"));
        assert!(html.contains("Over 1.75"));
        assert!(html.contains("showPrediction('1x2', this)"));
        // first section is visible before the script runs
        assert!(html.contains("class=\"prediction-section active\" id=\"1x2\""));
    }

    #[test]
    fn test_report_escapes_scraped_text() {
        let pages = vec![PageText {
            prediction_type: PredictionType::Special,
            markdown: "Wales - Cymru <Premier> | 1 | X\n14:00 | TNSBala | 1.2 | 6.0 | 9.0\n"
                .to_string(),
        }];
        let html = render_report(&dataset(&pages)).unwrap();
        assert!(html.contains("Wales - Cymru &lt;Premier&gt;"));
    }

    #[test]
    fn test_empty_dataset_renders() {
        let html = render_report(&dataset(&[])).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("No predictions available"));
    }
}
