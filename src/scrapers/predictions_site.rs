use super::markdown::{html_to_markdown, same_host_url};
use super::{CacheMode, FetchOptions, FetchResult, PageFetcher};
use crate::models::PredictionType;
use crate::utils::aggregator::PageText;
use crate::utils::data::{load_page_from_cache, save_page_to_cache};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

pub const PREDICTIONS_SITE_URL: &str = "https://onemillionpredictions.com";

/// Fetches pages over HTTP. The client is built once and shared by every request of a run.
pub struct HttpFetcher {
    client: reqwest::Client,
    cache_dir: PathBuf,
}

impl HttpFetcher {
    pub fn new(cache_dir: impl Into<PathBuf>, options: &FetchOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(options.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            cache_dir: cache_dir.into(),
        })
    }

    async fn get_html(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("{} returned {}", url, response.status());
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))
    }

    async fn fetch_uncached(&self, url: &str, options: &FetchOptions) -> Result<String> {
        let html = self.get_html(url).await?;
        let page = html_to_markdown(&html, url, options);
        let mut markdown = page.markdown;

        if options.process_iframes {
            for src in page.iframes {
                let Some(frame_url) = same_host_url(url, &src) else {
                    debug!("Skipping cross-site iframe {}", src);
                    continue;
                };
                match self.get_html(frame_url.as_str()).await {
                    Ok(frame_html) => {
                        let frame = html_to_markdown(&frame_html, frame_url.as_str(), options);
                        if !frame.markdown.is_empty() {
                            markdown.push_str("\n\n");
                            markdown.push_str(&frame.markdown);
                        }
                    }
                    Err(e) => warn!("Failed to fetch iframe {}: {:#}", frame_url, e),
                }
            }
        }

        if markdown.trim().is_empty() {
            anyhow::bail!("{} rendered no text", url);
        }
        Ok(markdown)
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> FetchResult {
        if options.cache_mode == CacheMode::Enabled {
            match load_page_from_cache(&self.cache_dir, url) {
                Ok(Some(markdown)) => {
                    debug!("Using cached page for {}", url);
                    return FetchResult::ok(markdown);
                }
                Ok(None) => {}
                Err(e) => warn!("Ignoring unreadable page cache for {}: {:#}", url, e),
            }
        }

        match self.fetch_uncached(url, options).await {
            Ok(markdown) => {
                if options.cache_mode == CacheMode::Enabled {
                    if let Err(e) = save_page_to_cache(&self.cache_dir, url, &markdown) {
                        warn!("Failed to cache page {}: {:#}", url, e);
                    }
                }
                FetchResult::ok(markdown)
            }
            Err(e) => FetchResult::failed(format!("{:#}", e)),
        }
    }
}

/// Fetch every prediction type in catalog order, one page at a time.
/// Pages that fail are logged and left out.
pub async fn scrape_all<F: PageFetcher>(
    fetcher: &F,
    base_url: &str,
    options: &FetchOptions,
) -> Vec<PageText> {
    let mut pages = Vec::new();

    for kind in PredictionType::ALL {
        let url = kind.url(base_url);
        info!("Scraping {} ({})", kind, url);

        let result = fetcher.fetch(&url, options).await;
        if !result.success {
            error!(
                "Failed to scrape {}: {}",
                url,
                result.error.as_deref().unwrap_or("unknown error")
            );
            continue;
        }

        debug!("Content length: {}", result.markdown.len());
        debug!(
            "First 200 chars: {}",
            result.markdown.chars().take(200).collect::<String>()
        );
        pages.push(PageText {
            prediction_type: kind,
            markdown: result.markdown,
        });
    }

    pages
}
