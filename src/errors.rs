//! # RDS Errors
//!
//! Error types shared across the cache core.

use thiserror::Error;

/// Result type for RDS operations
pub type RdsResult<T> = Result<T, RdsError>;

/// Errors surfaced by the RDS cache core
#[derive(Debug, Error)]
pub enum RdsError {
    // ==================
    // Query Errors
    // ==================

    /// Canonical subquery text exceeds the catalog column bound
    #[error("Subquery text is {len} bytes, catalog limit is {limit}")]
    SubqueryTooLong { len: usize, limit: usize },

    // ==================
    // Catalog Errors
    // ==================

    /// Another writer inserted the same subquery text first
    #[error("Catalog entry already exists for this subquery")]
    CatalogConflict,

    /// A fingerprint string did not parse as a comma-joined id list
    #[error("Invalid fingerprint: {0:?}")]
    InvalidFingerprint(String),

    // ==================
    // Driver Errors
    // ==================

    /// Propagated from the SQL driver
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}
