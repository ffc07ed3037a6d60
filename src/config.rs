//! Cache Configuration
//!
//! Runtime knobs for the RDS cache, deserializable from the embedding
//! filesystem's configuration file.

use serde::{Deserialize, Serialize};

/// How `invalidate` discards stale result sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationMode {
    /// Set the catalog `expired` flag only; rows stay readable and are
    /// rebuilt by the next prepare that asks for expired sets to be rebuilt
    MarkExpired,
    /// Delete every catalog entry (and its rows) whose text mentions one of
    /// the query's tags
    PurgeByTag,
}

/// RDS cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RdsConfig {
    /// Invalidation strategy (default: flag-based)
    #[serde(default = "default_invalidation")]
    pub invalidation: InvalidationMode,

    /// Upper bound for a canonical subquery text, matching the width of the
    /// catalog's `subquery` column (default: 1024)
    #[serde(default = "default_max_subquery_len")]
    pub max_subquery_len: usize,
}

fn default_invalidation() -> InvalidationMode {
    InvalidationMode::MarkExpired
}

fn default_max_subquery_len() -> usize {
    1024
}

impl Default for RdsConfig {
    fn default() -> Self {
        Self {
            invalidation: default_invalidation(),
            max_subquery_len: default_max_subquery_len(),
        }
    }
}
