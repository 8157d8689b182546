pub mod markdown;
pub mod predictions_site;

use std::future::Future;

pub use predictions_site::*;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Whether fetched pages are read from and written to the page cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Enabled,
    Bypass,
}

/// Knobs for turning a page into text
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Prose blocks with fewer words are dropped. Table rows are always kept.
    pub word_count_threshold: usize,
    pub excluded_tags: Vec<String>,
    pub exclude_external_links: bool,
    pub process_iframes: bool,
    pub remove_overlay_elements: bool,
    pub cache_mode: CacheMode,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            word_count_threshold: 10,
            excluded_tags: vec!["form".to_string(), "header".to_string()],
            exclude_external_links: true,
            process_iframes: true,
            remove_overlay_elements: true,
            cache_mode: CacheMode::Enabled,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// Outcome of fetching one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub success: bool,
    pub markdown: String,
    pub error: Option<String>,
}

impl FetchResult {
    pub fn ok(markdown: String) -> Self {
        Self {
            success: true,
            markdown,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            markdown: String::new(),
            error: Some(error.into()),
        }
    }
}

/// Anything that can turn a URL into rendered page text.
/// Failures are reported in the result, never as a panic or error.
pub trait PageFetcher {
    fn fetch(&self, url: &str, options: &FetchOptions)
        -> impl Future<Output = FetchResult> + Send;
}
