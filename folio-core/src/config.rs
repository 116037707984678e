//! Configuration types.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for a store instance.
///
/// Passed by value into the store at construction; there is no global
/// configuration singleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolioConfig {
    /// Virtual wiki that acts as the shared upload repository. When set and
    /// different from the tenant being queried, File/Media lookups that miss
    /// locally retry against this tenant.
    pub shared_upload_virtual_wiki: Option<String>,
    /// Whether lookups in case-insensitive namespaces retry with a
    /// case-flipped page name before declaring not-found.
    pub allow_capitalization: bool,
    /// Maximum entries per lookup cache.
    pub cache_max_entries: usize,
    /// Lookups slower than this are logged at debug level.
    pub slow_lookup_threshold_ms: u64,
}

impl Default for FolioConfig {
    fn default() -> Self {
        FolioConfig {
            shared_upload_virtual_wiki: None,
            allow_capitalization: true,
            cache_max_entries: 5_000,
            slow_lookup_threshold_ms: 20,
        }
    }
}

impl FolioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shared upload repository tenant.
    pub fn with_shared_upload_virtual_wiki(mut self, name: impl Into<String>) -> Self {
        self.shared_upload_virtual_wiki = Some(name.into());
        self
    }

    /// Enable or disable the case-flip lookup fallback.
    pub fn with_capitalization(mut self, allow: bool) -> Self {
        self.allow_capitalization = allow;
        self
    }

    /// Set the per-cache entry limit.
    pub fn with_cache_max_entries(mut self, max: usize) -> Self {
        self.cache_max_entries = max;
        self
    }

    /// Validate configuration values. Called by the store at construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(shared) = &self.shared_upload_virtual_wiki {
            if shared.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "shared_upload_virtual_wiki",
                    value: shared.clone(),
                    reason: "must not be blank".to_string(),
                });
            }
        }
        if self.cache_max_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache_max_entries",
                value: "0".to_string(),
                reason: "cache must hold at least one entry".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(FolioConfig::default().validate().is_ok());
    }

    #[test]
    fn test_blank_shared_wiki_rejected() {
        let config = FolioConfig::default().with_shared_upload_virtual_wiki("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cache_capacity_rejected() {
        let config = FolioConfig::default().with_cache_max_entries(0);
        assert!(config.validate().is_err());
    }
}
