use football_predictions::{
    load_snapshot, run_pipeline, Config, FetchOptions, FetchResult, PageFetcher, PredictionType,
};
use std::collections::HashMap;

const BASE_URL: &str = "https://predictions.test";

/// Serves canned page text by URL; everything else is a failed fetch
struct MemoryFetcher {
    pages: HashMap<String, String>,
}

impl MemoryFetcher {
    fn new(pages: &[(PredictionType, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(kind, text)| (kind.url(BASE_URL), text.to_string()))
                .collect(),
        }
    }
}

impl PageFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str, _options: &FetchOptions) -> FetchResult {
        match self.pages.get(url) {
            Some(text) => FetchResult::ok(text.clone()),
            None => FetchResult::failed("connection refused"),
        }
    }
}

fn config_for(dir: &std::path::Path) -> Config {
    Config {
        base_url: BASE_URL.to_string(),
        output_dir: dir.to_path_buf(),
        cache_dir: dir.join("cache"),
        save_csv: true,
        ..Config::default()
    }
}

#[tokio::test]
async fn test_pipeline_writes_snapshot_report_and_csv() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let fetcher = MemoryFetcher::new(&[
        (
            PredictionType::MatchOfTheDay,
            "England - Premier League | Tip | Odds\n19:45 | ArsenalChelsea | 1.85\n",
        ),
        (
            PredictionType::Goals,
            "Spain - La Liga | Line | Over | Under\n21:00 | SevillaBetis | 2.5 | 1.90 | 1.95\n",
        ),
    ]);

    let summary = run_pipeline(&fetcher, &config).await.unwrap();

    assert_eq!(summary.total_matches(), 2);
    let snapshot_path = summary.snapshot_path.unwrap();
    let report_path = summary.report_path.unwrap();
    assert!(snapshot_path.exists());
    assert!(report_path.exists());
    assert!(summary.csv_path.unwrap().exists());

    let dataset = load_snapshot(&snapshot_path).unwrap();
    assert_eq!(dataset.url, BASE_URL);
    assert_eq!(
        dataset.metadata.prediction_types,
        vec![PredictionType::Goals, PredictionType::MatchOfTheDay]
    );
    assert_eq!(
        dataset.metadata.leagues,
        vec!["England - Premier League", "Spain - La Liga"]
    );

    let html = std::fs::read_to_string(&report_path).unwrap();
    assert!(html.contains("Arsenal"));
    assert!(html.contains("Sevilla"));
    assert!(html.contains("2 matches across 2 leagues"));
}

#[tokio::test]
async fn test_pipeline_writes_nothing_when_every_fetch_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let fetcher = MemoryFetcher::new(&[]);

    let summary = run_pipeline(&fetcher, &config).await.unwrap();

    assert_eq!(summary.total_matches(), 0);
    assert!(summary.snapshot_path.is_none());
    assert!(summary.report_path.is_none());
    assert!(summary.dataset.is_none());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_page_with_no_matches_still_produces_a_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let fetcher = MemoryFetcher::new(&[(PredictionType::Cards, "Nothing scheduled today")]);

    let summary = run_pipeline(&fetcher, &config).await.unwrap();

    assert_eq!(summary.total_matches(), 0);
    let html = std::fs::read_to_string(summary.report_path.unwrap()).unwrap();
    assert!(html.contains("No predictions available"));
}
