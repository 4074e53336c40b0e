//! Cache configuration types

use std::time::Duration;

use crate::constants::{DEFAULT_MAX_ENTRIES, DEFAULT_STALENESS_WINDOW};
use crate::error::{Error, Result};

/// Query cache configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Age after which an entry is served stale and refreshed in the background
    pub staleness_window: Duration,
    /// Maximum entries per cache; the oldest entry is evicted beyond this
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            staleness_window: DEFAULT_STALENESS_WINDOW,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    #[must_use]
    pub const fn with_staleness_window(mut self, window: Duration) -> Self {
        self.staleness_window = window;
        self
    }

    #[must_use]
    pub const fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(Error::Config("cache max_entries must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.staleness_window, Duration::from_secs(30));
        assert_eq!(config.max_entries, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cache_config_builders() {
        let config = CacheConfig::new()
            .with_staleness_window(Duration::from_secs(5))
            .with_max_entries(10);
        assert_eq!(config.staleness_window, Duration::from_secs(5));
        assert_eq!(config.max_entries, 10);
    }

    #[test]
    fn test_zero_max_entries_rejected() {
        let config = CacheConfig::new().with_max_entries(0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
