//! Ledger configuration loaded from environment variables.
//!
//! All settings have sensible defaults so an embedding process can start
//! with zero configuration for local development.

use std::path::PathBuf;

use parley_shared::constants::DEFAULT_QUEUE_CAPACITY;

/// Ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Filesystem path of the SQLite database.
    /// `None` runs the ledger purely in memory (no write-through).
    /// Env: `PARLEY_DB_PATH`
    /// Default: `None`
    pub db_path: Option<PathBuf>,

    /// Capacity of the sequencer command queue.  Submissions beyond this
    /// wait for admission.
    /// Env: `PARLEY_QUEUE_CAPACITY`
    /// Default: `256`
    pub queue_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("PARLEY_DB_PATH") {
            if !path.is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(val) = std::env::var("PARLEY_QUEUE_CAPACITY") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.queue_capacity = n,
                _ => {
                    tracing::warn!(value = %val, "Invalid PARLEY_QUEUE_CAPACITY, using default");
                }
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert!(config.db_path.is_none());
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }
}
