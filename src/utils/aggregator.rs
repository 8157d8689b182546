use crate::models::{Dataset, MatchRecord, Metadata, PredictionType};
use crate::utils::table_parser::parse_matches;
use chrono::{Local, NaiveDateTime};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Display format of `metadata.last_update`
pub const LAST_UPDATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Text of one successfully fetched page
#[derive(Debug, Clone)]
pub struct PageText {
    pub prediction_type: PredictionType,
    pub markdown: String,
}

/// Parse every page and merge the matches into one dataset stamped with the current time
pub fn build_dataset(url: &str, pages: &[PageText]) -> Dataset {
    build_dataset_at(url, pages, Local::now().naive_local())
}

pub fn build_dataset_at(url: &str, pages: &[PageText], now: NaiveDateTime) -> Dataset {
    debug!("Processing {} prediction types", pages.len());

    let matches: Vec<MatchRecord> = pages
        .iter()
        .flat_map(|page| parse_matches(&page.markdown, page.prediction_type))
        .collect();

    let metadata = summarize(&matches, now);
    info!(
        "Total matches found: {} across {} leagues",
        metadata.total_matches,
        metadata.leagues.len()
    );
    debug!("Prediction types found: {:?}", metadata.prediction_types);

    Dataset {
        url: url.to_string(),
        matches,
        metadata,
    }
}

/// Counts and distinct values over `matches`. Prediction types are sorted by key.
pub fn summarize(matches: &[MatchRecord], now: NaiveDateTime) -> Metadata {
    let mut prediction_types: Vec<PredictionType> =
        matches.iter().map(|m| m.prediction_type).collect();
    prediction_types.sort_by_key(|kind| kind.key());
    prediction_types.dedup();

    let leagues: BTreeSet<&str> = matches.iter().map(|m| m.league.as_str()).collect();

    Metadata {
        timestamp: now,
        total_matches: matches.len(),
        prediction_types,
        leagues: leagues.into_iter().map(str::to_string).collect(),
        last_update: now.format(LAST_UPDATE_FORMAT).to_string(),
    }
}
