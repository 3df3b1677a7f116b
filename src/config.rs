use std::path::PathBuf;
use std::time::Duration;

pub const API_BASE: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_CONCURRENCY: usize = 6;

/// Settings shared by the HTTP transport and the resolver.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub api_base: String,
    /// Root of the on-disk response cache; `None` disables it.
    pub cache_dir: Option<PathBuf>,
    /// Upper bound on simultaneously in-flight upstream requests.
    pub concurrency: usize,
    /// Whole-request timeout for the HTTP client; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: API_BASE.to_string(),
            cache_dir: Some(default_cache_root()),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: None,
        }
    }
}

impl Config {
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: Option<PathBuf>) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|timeout| !timeout.is_zero());
        self
    }

    pub fn endpoint(&self, resource: &str, identifier: &str) -> String {
        format!("{}/{resource}/{identifier}", self.api_base)
    }
}

pub fn default_cache_root() -> PathBuf {
    dirs_next::cache_dir()
        .or_else(|| std::env::var("HOME").ok().map(|home| PathBuf::from(home).join(".cache")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("evodex")
}
