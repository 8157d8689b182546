use crate::models::{Dataset, MatchRecord, NOT_AVAILABLE};
use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Prefix shared by every snapshot and report file
pub const FILENAME_PREFIX: &str = "football_predictions";

const NETLIFY_CONFIG: &str = r#"[build]
  publish = "dist"
  command = "cargo run --release --bin cli -- build"

[[redirects]]
  from = "/*"
  to = "/index.html"
  status = 200
"#;

/// Create `<prefix>_<YYYYmmdd_HHMMSS>.<ext>` in `dir`, adding `_N` until the name is free
fn create_timestamped(dir: &Path, extension: &str) -> Result<(PathBuf, File)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let stem = format!(
        "{}_{}",
        FILENAME_PREFIX,
        Local::now().format("%Y%m%d_%H%M%S")
    );
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{}.{}", stem, extension)
        } else {
            format!("{}_{}.{}", stem, attempt, extension)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", path.display()))
            }
        }
    }
}

/// Write the dataset as a new JSON snapshot in `dir` and return its path
pub fn save_snapshot(dataset: &Dataset, dir: &Path) -> Result<PathBuf> {
    let (path, file) = create_timestamped(dir, "json")?;
    let mut writer = BufWriter::new(file);

    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    dataset
        .serialize(&mut serializer)
        .context("Failed to serialize snapshot")?;
    writer.flush().context("Failed to write snapshot file")?;

    Ok(path)
}

/// Load a dataset from a JSON snapshot
pub fn load_snapshot(path: &Path) -> Result<Dataset> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let dataset: Dataset =
        serde_json::from_str(&json).context("Failed to deserialize snapshot data")?;
    Ok(dataset)
}

/// Whether `name` is a bare snapshot or report file name written by this crate
pub fn is_report_file(name: &str) -> bool {
    name.starts_with(FILENAME_PREFIX)
        && (name.ends_with(".json") || name.ends_with(".html"))
        && !name.contains(&['/', '\\'][..])
        && !name.contains("..")
}

/// Most recently modified snapshot in `dir`, if any
pub fn latest_snapshot(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }

    let mut latest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(dir).context("Failed to list output directory")? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(FILENAME_PREFIX) || !name.ends_with(".json") {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if latest.as_ref().map_or(true, |(time, _)| modified > *time) {
            latest = Some((modified, entry.path()));
        }
    }

    Ok(latest.map(|(_, path)| path))
}

/// Write a rendered report as a new HTML file in `dir` and return its path
pub fn save_report(html: &str, dir: &Path) -> Result<PathBuf> {
    let (path, mut file) = create_timestamped(dir, "html")?;
    file.write_all(html.as_bytes())
        .context("Failed to write report file")?;
    Ok(path)
}

#[derive(Serialize)]
struct CsvMatchRow<'a> {
    league: &'a str,
    datetime: &'a str,
    teams: &'a str,
    prediction_type: &'a str,
    odds: String,
    additional_info: String,
}

fn join_fields(fields: Vec<(&'static str, Option<&str>)>) -> String {
    fields
        .into_iter()
        .map(|(name, value)| format!("{}={}", name, value.unwrap_or(NOT_AVAILABLE)))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Save matches to CSV, one row per match with the odds flattened into one column
pub fn save_matches_to_csv(matches: &[MatchRecord], filename: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(filename).context("Failed to create CSV file")?;

    for record in matches {
        writer
            .serialize(CsvMatchRow {
                league: &record.league,
                datetime: &record.datetime,
                teams: &record.teams,
                prediction_type: record.prediction_type.key(),
                odds: join_fields(record.odds.fields()),
                additional_info: join_fields(record.additional_info.fields()),
            })
            .context("Failed to write CSV row")?;
    }

    writer.flush().context("Failed to flush CSV file")?;
    Ok(())
}

fn page_cache_path(cache_dir: &Path, url: &str) -> PathBuf {
    let key: String = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    cache_dir.join("pages").join(format!("{}.md", key))
}

/// Store the converted text of the page at `url`
pub fn save_page_to_cache(cache_dir: &Path, url: &str, markdown: &str) -> Result<()> {
    let path = page_cache_path(cache_dir, url);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create page cache directory")?;
    }
    std::fs::write(&path, markdown).context("Failed to write page cache file")?;
    Ok(())
}

/// Cached text of the page at `url`, if it was stored before
pub fn load_page_from_cache(cache_dir: &Path, url: &str) -> Result<Option<String>> {
    let path = page_cache_path(cache_dir, url);
    if !path.exists() {
        return Ok(None);
    }
    let markdown = std::fs::read_to_string(&path).context("Failed to read page cache file")?;
    Ok(Some(markdown))
}

/// Publish a rendered report as a static site: `<dist>/index.html` plus a
/// `netlify.toml` next to the dist directory.
pub fn build_site(html: &str, dist_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dist_dir)
        .with_context(|| format!("Failed to create {}", dist_dir.display()))?;

    let index = dist_dir.join("index.html");
    std::fs::write(&index, html).context("Failed to write index.html")?;

    let site_root = dist_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::write(site_root.join("netlify.toml"), NETLIFY_CONFIG)
        .context("Failed to write netlify.toml")?;

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdditionalInfo, Odds, PredictionType};
    use crate::utils::aggregator::summarize;

    fn sample_dataset() -> Dataset {
        let matches = vec![
            MatchRecord {
                league: "Brazil - Série A".to_string(),
                datetime: "23:30".to_string(),
                teams: "FlamengoSão Paulo".to_string(),
                prediction_type: PredictionType::BothTeamsToScore,
                odds: Odds::BothTeamsToScore {
                    yes: Some("1.72".to_string()),
                    no: Some("2.05".to_string()),
                },
                additional_info: AdditionalInfo::None,
            },
            MatchRecord {
                league: "England - Premier League".to_string(),
                datetime: "16:30".to_string(),
                teams: "4. ArsenalChelsea".to_string(),
                prediction_type: PredictionType::Top10,
                odds: Odds::ThreeWay {
                    home: Some("1.85".to_string()),
                    draw: None,
                    away: Some("4.20".to_string()),
                },
                additional_info: AdditionalInfo::Rank(Some("4".to_string())),
            },
        ];
        let metadata = summarize(&matches, Local::now().naive_local());
        Dataset {
            url: "https://onemillionpredictions.com".to_string(),
            matches,
            metadata,
        }
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = sample_dataset();

        let path = save_snapshot(&dataset, dir.path()).unwrap();
        let loaded = load_snapshot(&path).unwrap();

        assert_eq!(loaded.matches, dataset.matches);
        assert_eq!(loaded.metadata.total_matches, dataset.metadata.total_matches);
        assert_eq!(loaded.metadata.leagues, dataset.metadata.leagues);
        assert_eq!(
            loaded.metadata.prediction_types,
            dataset.metadata.prediction_types
        );
    }

    #[test]
    fn test_snapshot_keeps_contract_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_snapshot(&sample_dataset(), dir.path()).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("Série A"));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["url"], "https://onemillionpredictions.com");
        assert_eq!(value["matches"][0]["odds"]["yes"], "1.72");
        assert_eq!(value["matches"][1]["additional_info"]["rank"], "4");
        assert!(value["matches"][1]["odds"]["X"].is_null());
        for field in [
            "timestamp",
            "total_matches",
            "prediction_types",
            "leagues",
            "last_update",
        ] {
            assert!(value["metadata"].get(field).is_some(), "missing {}", field);
        }
    }

    #[test]
    fn test_snapshot_with_error_odds_loads_and_renders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("football_predictions_20240309_120500.json");
        let json = r#"{
    "url": "https://onemillionpredictions.com",
    "matches": [
        {
            "league": "Portugal - Primeira Liga",
            "datetime": "20:15",
            "teams": "BenficaPorto",
            "prediction_type": "correct_score",
            "odds": {
                "error": "list index out of range"
            },
            "additional_info": {}
        }
    ],
    "metadata": {
        "timestamp": "2024-03-09T12:05:00",
        "total_matches": 1,
        "prediction_types": ["correct_score"],
        "leagues": ["Portugal - Primeira Liga"],
        "last_update": "09/03/2024 12:05"
    }
}"#;
        std::fs::write(&path, json).unwrap();

        let dataset = load_snapshot(&path).unwrap();
        assert_eq!(dataset.matches.len(), 1);

        let html = crate::utils::report::render_report(&dataset).unwrap();
        // both boxes show the N/A placeholder
        assert_eq!(html.matches("<div class=\"odd-box\">N").count(), 2);
        assert!(html.contains("Benfica"));
    }

    #[test]
    fn test_snapshots_never_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = sample_dataset();

        let first = save_snapshot(&dataset, dir.path()).unwrap();
        let second = save_snapshot(&dataset, dir.path()).unwrap();

        assert_ne!(first, second);
        assert!(first.exists() && second.exists());
        let name = first.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("football_predictions_"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn test_latest_snapshot_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(latest_snapshot(dir.path()).unwrap().is_none());

        std::fs::write(dir.path().join("notes.json"), "{}").unwrap();
        save_report("<html></html>", dir.path()).unwrap();
        let snapshot = save_snapshot(&sample_dataset(), dir.path()).unwrap();

        assert_eq!(latest_snapshot(dir.path()).unwrap(), Some(snapshot));
    }

    #[test]
    fn test_only_snapshot_and_report_files_are_published() {
        assert!(is_report_file("football_predictions_20240309_120500.json"));
        assert!(is_report_file("football_predictions_20240309_120500_1.html"));

        assert!(!is_report_file(".env"));
        assert!(!is_report_file("Cargo.toml"));
        assert!(!is_report_file("football_predictions_20240309_120500.csv"));
        assert!(!is_report_file("football_predictions/../.env.json"));
        assert!(!is_report_file("cache/football_predictions_x.json"));
        assert!(!is_report_file("football_predictions..html"));
    }

    #[test]
    fn test_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches.csv");
        save_matches_to_csv(&sample_dataset().matches, &path).unwrap();

        let csv = std::fs::read_to_string(&path).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "league,datetime,teams,prediction_type,odds,additional_info"
        );
        assert!(csv.contains("both_teams_to_score,yes=1.72; no=2.05,"));
        assert!(csv.contains("1=1.85; X=N/A; 2=4.20,rank=4"));
    }

    #[test]
    fn test_page_cache() {
        let dir = tempfile::tempdir().unwrap();
        let url = "https://onemillionpredictions.com/today-football-predictions/cards/";
        assert!(load_page_from_cache(dir.path(), url).unwrap().is_none());

        save_page_to_cache(dir.path(), url, "a | b | c").unwrap();
        assert_eq!(
            load_page_from_cache(dir.path(), url).unwrap(),
            Some("a | b | c".to_string())
        );
        assert!(dir
            .path()
            .join("pages")
            .join("onemillionpredictions_com_today_football_predictions_cards.md")
            .exists());
    }

    #[test]
    fn test_build_site() {
        let dir = tempfile::tempdir().unwrap();
        let dist = dir.path().join("dist");

        let index = build_site("<html>report</html>", &dist).unwrap();

        assert_eq!(index, dist.join("index.html"));
        assert_eq!(std::fs::read_to_string(&index).unwrap(), "<html>report</html>");
        let netlify = std::fs::read_to_string(dir.path().join("netlify.toml")).unwrap();
        assert!(netlify.contains("publish = \"dist\""));
        assert!(netlify.contains("to = \"/index.html\""));
    }
}
