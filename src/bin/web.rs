use askama::Template;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use football_predictions::{
    init_tracing, is_report_file, latest_snapshot, load_snapshot, run_pipeline, Config, Dataset,
    HttpFetcher, ReportTemplate,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;
use tracing::{error, info};

struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

// Shared state to cache the latest dataset
type SharedData = Arc<RwLock<Option<Dataset>>>;

#[derive(Clone)]
struct AppState {
    data: SharedData,
    config: Arc<Config>,
}

async fn home(State(state): State<AppState>) -> impl IntoResponse {
    let dataset = state.data.read().await;

    match dataset.as_ref() {
        Some(dataset) => HtmlTemplate(ReportTemplate::new(dataset)).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Data not loaded yet").into_response(),
    }
}

async fn snapshot(State(state): State<AppState>) -> impl IntoResponse {
    let dataset = state.data.read().await;

    match dataset.as_ref() {
        Some(dataset) => Json(dataset.clone()).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Data not loaded yet").into_response(),
    }
}

async fn refresh(State(state): State<AppState>) -> impl IntoResponse {
    match scrape(&state.config).await {
        Ok(Some(dataset)) => {
            *state.data.write().await = Some(dataset);
            Redirect::to("/").into_response()
        }
        Ok(None) => (
            StatusCode::BAD_GATEWAY,
            "No prediction page could be fetched, keeping the previous data",
        )
            .into_response(),
        Err(err) => {
            error!("Refresh failed: {:#}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Refresh failed: {}", err),
            )
                .into_response()
        }
    }
}

/// Let through `/reports/<snapshot or report file>` only, never other files
/// that happen to live in the output directory.
async fn only_report_files(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    let path = path.strip_prefix("/reports").unwrap_or(path);
    let allowed = path
        .strip_prefix('/')
        .map_or(false, is_report_file);

    if allowed {
        next.run(request).await
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn scrape(config: &Config) -> anyhow::Result<Option<Dataset>> {
    let fetcher = HttpFetcher::new(&config.cache_dir, &config.fetch_options())?;
    Ok(run_pipeline(&fetcher, config).await?.dataset)
}

/// Latest snapshot on disk, or a fresh scrape when there is none yet
async fn initial_dataset(config: &Config) -> anyhow::Result<Option<Dataset>> {
    if let Some(path) = latest_snapshot(&config.output_dir)? {
        info!("Loading snapshot {}", path.display());
        return Ok(Some(load_snapshot(&path)?));
    }

    println!("No snapshot found, scraping predictions...");
    scrape(config).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env();

    let data = match initial_dataset(&config).await {
        Ok(Some(dataset)) => {
            println!("Data loaded successfully");
            println!("  - {} matches", dataset.metadata.total_matches);
            println!("  - {} leagues", dataset.metadata.leagues.len());
            println!("  - Last update: {}", dataset.metadata.last_update);
            Some(dataset)
        }
        Ok(None) => {
            eprintln!("No predictions available, use /refresh once the site is reachable");
            None
        }
        Err(e) => {
            eprintln!("Error loading data: {:#}", e);
            eprintln!("Server will start but pages may show errors");
            None
        }
    };

    let state = AppState {
        data: Arc::new(RwLock::new(data)),
        config: Arc::new(config.clone()),
    };

    println!("\nStarting web server at http://{}", config.web_addr);
    println!("Press Ctrl+C to stop\n");

    let reports = Router::new()
        .fallback_service(ServeDir::new(&config.output_dir))
        .layer(middleware::from_fn(only_report_files));

    let app = Router::new()
        .nest("/reports", reports)
        .route("/", get(home))
        .route("/snapshot.json", get(snapshot))
        .route("/refresh", get(refresh))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.web_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
