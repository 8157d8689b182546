pub mod config;
pub mod models;
pub mod scrapers;
pub mod utils;

pub use config::Config;
pub use models::*;
pub use scrapers::*;
pub use utils::*;

use anyhow::Result;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "football_predictions=info,cli=info,web=info";

/// Set up logging for a binary. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// What a full run produced
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub snapshot_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub csv_path: Option<PathBuf>,
    pub dataset: Option<Dataset>,
}

impl RunSummary {
    pub fn total_matches(&self) -> usize {
        self.dataset
            .as_ref()
            .map_or(0, |dataset| dataset.metadata.total_matches)
    }
}

/// Scrape every prediction page, write the JSON snapshot, then render the
/// report from the snapshot that was just written.
///
/// Nothing is written when no page could be fetched.
pub async fn run_pipeline<F: PageFetcher>(fetcher: &F, config: &Config) -> Result<RunSummary> {
    let options = config.fetch_options();
    let pages = scrape_all(fetcher, &config.base_url, &options).await;

    if pages.is_empty() {
        warn!("No prediction page could be fetched, nothing saved");
        return Ok(RunSummary::default());
    }

    let dataset = build_dataset(&config.base_url, &pages);
    let snapshot_path = save_snapshot(&dataset, &config.output_dir)?;
    info!("Results saved to {}", snapshot_path.display());

    let dataset = load_snapshot(&snapshot_path)?;
    let html = render_report(&dataset)?;
    let report_path = save_report(&html, &config.output_dir)?;
    info!("HTML page generated in {}", report_path.display());

    let csv_path = if config.save_csv {
        let path = snapshot_path.with_extension("csv");
        save_matches_to_csv(&dataset.matches, &path)?;
        info!("Saved matches to {}", path.display());
        Some(path)
    } else {
        None
    };

    Ok(RunSummary {
        snapshot_path: Some(snapshot_path),
        report_path: Some(report_path),
        csv_path,
        dataset: Some(dataset),
    })
}
