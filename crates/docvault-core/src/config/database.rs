//! Database configuration.

use serde::{Deserialize, Serialize};

/// PostgreSQL settings for the vault's metadata store.
///
/// The vault keeps only folder and file rows, so a small pool goes a
/// long way; size it to the number of concurrent tree mutations, not
/// to upload traffic (uploads go straight to object storage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    /// How long to wait for a pooled connection, in seconds.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
    /// Apply pending migrations on connect.
    #[serde(default = "default_auto_migrate")]
    pub auto_migrate: bool,
}

fn default_pool_size() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    5
}

fn default_auto_migrate() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_url_is_required() {
        let config: DatabaseConfig =
            serde_json::from_str(r#"{"url": "postgres://localhost/docvault"}"#).unwrap();
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.acquire_timeout_seconds, 5);
        assert!(config.auto_migrate);
    }
}
