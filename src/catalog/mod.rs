//! RDS catalog
//!
//! Persistent mapping between canonical subquery text and the id of its
//! materialised row set: one row per distinct text, unique on the text,
//! with an `expired` flag marking sets awaiting rebuild.
//!
//! # API
//!
//! - `fetch_id(conn, subquery, rebuild_expired)` - Look up an existing set
//! - `insert(conn, subquery)` - Register a new set
//! - `mark_expired(conn, fingerprint)` - Flag sets stale
//! - `purge_by_tag(conn, node)` - Drop every set mentioning a tag
//! - `entry(conn, rds_id)` - Catalog readback

pub mod rds_id;

pub use rds_id::{Fingerprint, RdsId};

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use crate::errors::{RdsError, RdsResult};
use crate::query::ast::{AndNode, TagPredicate};

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub rds_id: RdsId,
    pub subquery: String,
    pub creation: NaiveDateTime,
    pub expired: bool,
}

/// Looks up the id registered for a subquery text.
///
/// With `rebuild_expired` set, any existing catalog row and its
/// materialised rows are dropped first and the lookup reports a miss, so
/// the caller rebuilds unconditionally.
pub fn fetch_id(
    conn: &Connection,
    subquery: &str,
    rebuild_expired: bool,
) -> RdsResult<Option<RdsId>> {
    if rebuild_expired {
        conn.execute(
            "DELETE FROM rds WHERE rds_id IN \
             (SELECT rds_id FROM rds_catalog WHERE subquery = ?1)",
            params![subquery],
        )?;
        conn.execute(
            "DELETE FROM rds_catalog WHERE subquery = ?1",
            params![subquery],
        )?;
        return Ok(None);
    }

    let mut stmt = conn.prepare_cached("SELECT rds_id FROM rds_catalog WHERE subquery = ?1")?;
    match stmt.query_row(params![subquery], |row| row.get::<_, i64>(0)) {
        Ok(id) => Ok(Some(RdsId::new(id))),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Registers a new subquery text and returns its generated id.
///
/// The unique constraint on the text is the defence in depth below the
/// coordinator's build mutex: losing an insert race surfaces as
/// `CatalogConflict`, on which the caller re-runs `fetch_id` and adopts
/// the winner's id.
pub fn insert(conn: &Connection, subquery: &str) -> RdsResult<RdsId> {
    let inserted = conn.execute(
        "INSERT INTO rds_catalog (subquery) VALUES (?1)",
        params![subquery],
    );
    match inserted {
        Ok(_) => Ok(RdsId::new(conn.last_insert_rowid())),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(RdsError::CatalogConflict)
        }
        Err(e) => Err(e.into()),
    }
}

/// Flags every set in the fingerprint as stale.
///
/// Rows stay readable until a rebuilding prepare drops them.
pub fn mark_expired(conn: &Connection, fingerprint: &Fingerprint) -> RdsResult<()> {
    // The IN list is rendered from parsed ids, never from caller text.
    let sql = format!(
        "UPDATE rds_catalog SET expired = 1 WHERE rds_id IN ({})",
        fingerprint
    );
    conn.execute(&sql, [])?;
    Ok(())
}

/// Drops every catalog entry (and its rows) whose text mentions the node's
/// signature: the tag name for plain tags, `namespace/key` for triples.
pub fn purge_by_tag(conn: &Connection, node: &AndNode) -> RdsResult<()> {
    let pattern = match node.predicate() {
        TagPredicate::Plain { tag, .. } => format!("%{}%", tag),
        TagPredicate::Triple { namespace, key, .. } => format!("%{}/{}%", namespace, key),
    };

    tracing::debug!(pattern = %pattern, "purging rds catalog entries");

    conn.execute(
        "DELETE FROM rds WHERE rds_id IN \
         (SELECT rds_id FROM rds_catalog WHERE subquery LIKE ?1)",
        params![pattern],
    )?;
    conn.execute(
        "DELETE FROM rds_catalog WHERE subquery LIKE ?1",
        params![pattern],
    )?;
    Ok(())
}

/// Reads one catalog row back, if present.
pub fn entry(conn: &Connection, rds_id: RdsId) -> RdsResult<Option<CatalogEntry>> {
    let mut stmt = conn.prepare_cached(
        "SELECT rds_id, subquery, creation, expired FROM rds_catalog WHERE rds_id = ?1",
    )?;
    let row = stmt.query_row(params![rds_id.value()], |row| {
        Ok(CatalogEntry {
            rds_id: RdsId::new(row.get(0)?),
            subquery: row.get(1)?,
            creation: row.get(2)?,
            expired: row.get::<_, i64>(3)? != 0,
        })
    });
    match row {
        Ok(entry) => Ok(Some(entry)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
