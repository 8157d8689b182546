use crate::scrapers::{CacheMode, FetchOptions, PREDICTIONS_SITE_URL};
use std::path::PathBuf;

/// Run settings, read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub dist_dir: PathBuf,
    pub use_cache: bool,
    pub save_csv: bool,
    pub web_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: PREDICTIONS_SITE_URL.to_string(),
            output_dir: PathBuf::from("output"),
            cache_dir: PathBuf::from("cache"),
            dist_dir: PathBuf::from("dist"),
            use_cache: false,
            save_csv: false,
            web_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup("BASE_URL").unwrap_or(defaults.base_url),
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            cache_dir: lookup("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            dist_dir: lookup("DIST_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.dist_dir),
            use_cache: lookup("USE_CACHE").unwrap_or_default() == "1",
            save_csv: lookup("SAVE_CSV").unwrap_or_default() == "1",
            web_addr: lookup("WEB_ADDR").unwrap_or(defaults.web_addr),
        }
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            cache_mode: if self.use_cache {
                CacheMode::Enabled
            } else {
                CacheMode::Bypass
            },
            ..FetchOptions::default()
        }
    }
}
