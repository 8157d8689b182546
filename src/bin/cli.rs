use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use football_predictions::{
    build_site, init_tracing, latest_snapshot, load_snapshot, render_report, run_pipeline,
    save_report, Config, HttpFetcher, RunSummary,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cli",
    about = "Scrape football predictions and render them as a static dashboard"
)]
struct Cli {
    /// Directory for JSON snapshots and HTML reports (env OUTPUT_DIR)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Site to scrape (env BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Reuse pages cached by a previous run (env USE_CACHE=1)
    #[arg(long, global = true)]
    use_cache: bool,

    /// Also write the matches as CSV (env SAVE_CSV=1)
    #[arg(long, global = true)]
    save_csv: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape every prediction page, save the snapshot and the report
    Scrape,
    /// Render a report from an existing snapshot (latest one by default)
    Render { snapshot: Option<PathBuf> },
    /// Scrape, then publish the report as dist/index.html with a netlify.toml
    Build {
        #[arg(long)]
        dist_dir: Option<PathBuf>,
    },
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::from_env();
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        config.use_cache |= self.use_cache;
        config.save_csv |= self.save_csv;
        config
    }
}

async fn scrape(config: &Config) -> Result<RunSummary> {
    let fetcher = HttpFetcher::new(&config.cache_dir, &config.fetch_options())?;
    let summary = run_pipeline(&fetcher, config).await?;

    match (&summary.snapshot_path, &summary.report_path) {
        (Some(snapshot), Some(report)) => {
            println!("Found {} matches", summary.total_matches());
            println!("Snapshot: {}", snapshot.display());
            println!("Report:   {}", report.display());
            if let Some(csv) = &summary.csv_path {
                println!("CSV:      {}", csv.display());
            }
        }
        _ => println!("No prediction page could be fetched, nothing was saved."),
    }

    Ok(summary)
}

fn render(config: &Config, snapshot: Option<PathBuf>) -> Result<()> {
    let snapshot = match snapshot {
        Some(path) => path,
        None => latest_snapshot(&config.output_dir)?.with_context(|| {
            format!("No snapshot found in {}", config.output_dir.display())
        })?,
    };

    let dataset = load_snapshot(&snapshot)?;
    let html = render_report(&dataset)?;
    let report = save_report(&html, &config.output_dir)?;
    println!("Rendered {} into {}", snapshot.display(), report.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.config();

    match cli.command.unwrap_or(Command::Scrape) {
        Command::Scrape => {
            scrape(&config).await?;
        }
        Command::Render { snapshot } => render(&config, snapshot)?,
        Command::Build { dist_dir } => {
            let dist_dir = dist_dir.unwrap_or_else(|| config.dist_dir.clone());
            let summary = scrape(&config).await?;
            let dataset = summary
                .dataset
                .context("Nothing was scraped, refusing to publish an empty site")?;
            let index = build_site(&render_report(&dataset)?, &dist_dir)?;
            println!("Site ready in {}", index.display());
        }
    }

    Ok(())
}
