//! Runtime configuration for the content layer

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheManager;

/// Per-request HTTP timeout when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Cache root used when the platform cache directory cannot be determined
const FALLBACK_CACHE_DIR: &str = ".hscontent-cache";

pub const USER_AGENT: &str = concat!("hscontent/", env!("CARGO_PKG_VERSION"));

/// Where to cache, how long to wait, and which credentials to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentConfig {
    /// Root directory; each provider caches under `<cache_root>/<provider id>`
    pub cache_root: PathBuf,
    pub timeout: Duration,
    pub user_agent: String,
    pub khan_api_key: Option<String>,
    /// Falls back to NASA's shared `DEMO_KEY` when unset
    pub nasa_api_key: Option<String>,
    /// Without it, vocabulary lookups use the built-in dictionary
    pub words_api_key: Option<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            cache_root: CacheManager::default_root().unwrap_or_else(|| PathBuf::from(FALLBACK_CACHE_DIR)),
            timeout: DEFAULT_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
            khan_api_key: None,
            nasa_api_key: None,
            words_api_key: None,
        }
    }
}

impl ContentConfig {
    /// Default configuration rooted at `cache_root`
    pub fn with_cache_root(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout_is_ten_seconds() {
        let config = ContentConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("hscontent/"));
        assert!(config.nasa_api_key.is_none());
    }

    #[test]
    fn test_with_cache_root() {
        let config = ContentConfig::with_cache_root("/tmp/hs");
        assert_eq!(config.cache_root, PathBuf::from("/tmp/hs"));
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }
}
