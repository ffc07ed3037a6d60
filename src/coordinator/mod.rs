//! RDS coordinator
//!
//! The public surface of the cache. `prepare` materialises every OR-branch
//! of a query and returns the fingerprint answering it; `load` and
//! `contains` read the materialised rows; `invalidate` flags or purges
//! them; `expand` folds a freshly created object into sets that already
//! exist.
//!
//! A single process-wide mutex guards the fetch → insert → build critical
//! section, so two workers preparing the same subquery cannot both run the
//! build phases. The lock is coarse: builds are rare relative to reads.

pub mod handle;

pub use handle::{FileHandle, FileSet, Inode};

use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::builder;
use crate::catalog::{self, Fingerprint, RdsId};
use crate::config::{InvalidationMode, RdsConfig};
use crate::errors::{RdsError, RdsResult};
use crate::query::ast::{AndNode, OrBranch, Query, TagPredicate};
use crate::query::canonical;

/// Query-indexed materialisation cache.
///
/// The database connection is caller-owned and passed into every
/// operation; the cache itself only holds configuration and the build
/// mutex, so one instance serves every worker thread of the enclosing
/// filesystem.
pub struct RdsCache {
    config: RdsConfig,
    build_lock: Mutex<()>,
}

impl Default for RdsCache {
    fn default() -> Self {
        Self::new(RdsConfig::default())
    }
}

impl RdsCache {
    pub fn new(config: RdsConfig) -> Self {
        Self {
            config,
            build_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &RdsConfig {
        &self.config
    }

    /// Materialises every branch of `query` and returns its fingerprint.
    ///
    /// Returns `Ok(None)` for all-paths (every object matches, nothing to
    /// materialise) and for queries without branches, which are logged and
    /// treated as empty by callers.
    ///
    /// With `rebuild_expired` set, existing sets for the query's subqueries
    /// are dropped and rebuilt from the base tables.
    pub fn prepare(
        &self,
        conn: &Connection,
        query: &Query,
        is_all_path: bool,
        rebuild_expired: bool,
    ) -> RdsResult<Option<Fingerprint>> {
        if is_all_path {
            return Ok(None);
        }
        if query.is_empty() {
            tracing::warn!("refusing to prepare a query without branches");
            return Ok(None);
        }

        let mut ids = Vec::with_capacity(query.branches().len());
        for branch in query.branches() {
            let subquery = canonical::subquery_text(branch);
            if subquery.len() > self.config.max_subquery_len {
                return Err(RdsError::SubqueryTooLong {
                    len: subquery.len(),
                    limit: self.config.max_subquery_len,
                });
            }

            let _guard = self.build_lock.lock();
            let rds_id = match catalog::fetch_id(conn, &subquery, rebuild_expired)? {
                Some(id) => id,
                None => self.register_and_build(conn, &subquery, branch)?,
            };
            ids.push(rds_id);
        }

        Ok(Fingerprint::new(ids))
    }

    /// Registers the catalog row and materialises the branch under it.
    ///
    /// Caller holds the build lock. A `CatalogConflict` here means another
    /// process inserted the text between our fetch and insert; its entry is
    /// authoritative and no build runs.
    fn register_and_build(
        &self,
        conn: &Connection,
        subquery: &str,
        branch: &OrBranch,
    ) -> RdsResult<RdsId> {
        let rds_id = match catalog::insert(conn, subquery) {
            Ok(id) => id,
            Err(RdsError::CatalogConflict) => {
                return catalog::fetch_id(conn, subquery, false)?
                    .ok_or(RdsError::CatalogConflict);
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = builder::build(conn, rds_id, branch) {
            tracing::error!(subquery, error = %e, "rds build failed");
            return Err(e);
        }
        Ok(rds_id)
    }

    /// Loads the rows answering a fingerprint.
    ///
    /// Read path: a driver failure is logged and degrades to an empty set,
    /// which callers surface as an empty listing. A load racing a rebuild
    /// can observe a transiently empty set; that is accepted.
    pub fn load(&self, conn: &Connection, fingerprint: &Fingerprint) -> FileSet {
        match load_rows(conn, fingerprint) {
            Ok(set) => set,
            Err(e) => {
                tracing::error!(fingerprint = %fingerprint, error = %e, "rds load failed");
                FileSet::new()
            }
        }
    }

    /// Tests whether an object is listed in any of the fingerprint's sets.
    ///
    /// With a known inode the match requires both name and inode; without,
    /// the name alone. Returns the matching inode. Read path: driver
    /// failures degrade to a miss.
    pub fn contains(
        &self,
        conn: &Connection,
        fingerprint: &Fingerprint,
        objectname: &str,
        inode: Option<Inode>,
    ) -> Option<Inode> {
        match contains_row(conn, fingerprint, objectname, inode) {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(fingerprint = %fingerprint, objectname, error = %e,
                    "rds membership check failed");
                None
            }
        }
    }

    /// Discards the sets answering a fingerprint.
    ///
    /// In the default flag-based mode the rows stay readable and only the
    /// catalog `expired` flag is set; the next rebuilding prepare drops
    /// them. In purge mode every catalog entry mentioning one of the
    /// query's tags is deleted outright, which needs the query itself;
    /// without it the call falls back to flagging.
    pub fn invalidate(
        &self,
        conn: &Connection,
        fingerprint: &Fingerprint,
        query: Option<&Query>,
    ) -> RdsResult<()> {
        let query = match (self.config.invalidation, query) {
            (InvalidationMode::MarkExpired, _) | (InvalidationMode::PurgeByTag, None) => {
                return catalog::mark_expired(conn, fingerprint);
            }
            (InvalidationMode::PurgeByTag, Some(query)) => query,
        };

        for branch in query.branches() {
            for node in branch.and_nodes() {
                for negated in node.negated_chain() {
                    catalog::purge_by_tag(conn, negated)?;
                }
                catalog::purge_by_tag(conn, node)?;
            }
        }
        Ok(())
    }

    /// Folds a freshly created object into already-materialised sets.
    ///
    /// The object was just created under `query`, so it satisfies each of
    /// the query's branches by construction: sets registered under exactly
    /// those subquery texts receive the row directly. Any other set whose
    /// text mentions one of the branch tags may now be stale and is
    /// flagged expired instead.
    pub fn expand(
        &self,
        conn: &Connection,
        inode: Inode,
        objectname: &str,
        query: &Query,
    ) -> RdsResult<()> {
        let _guard = self.build_lock.lock();

        for branch in query.branches() {
            let subquery = canonical::subquery_text(branch);

            conn.execute(
                "INSERT INTO rds (rds_id, inode, objectname) \
                 SELECT rds_id, ?2, ?3 FROM rds_catalog WHERE subquery = ?1 \
                 AND rds_id NOT IN (SELECT rds_id FROM rds WHERE inode = ?2)",
                params![subquery, inode, objectname],
            )?;

            for node in branch.and_nodes() {
                expire_mentions(conn, node, &subquery)?;
            }
        }
        Ok(())
    }
}

/// Flags every set whose text mentions the node's signature, except the
/// exact text already updated by the caller.
fn expire_mentions(conn: &Connection, node: &AndNode, except: &str) -> RdsResult<()> {
    let signature = match node.predicate() {
        TagPredicate::Plain { tag, .. } => format!("{}/", tag),
        TagPredicate::Triple { namespace, key, .. } => format!("{}/{}/", namespace, key),
    };
    conn.execute(
        "UPDATE rds_catalog SET expired = 1 \
         WHERE (subquery LIKE ?1 || '%' OR subquery LIKE '%/' || ?1 || '%') \
         AND subquery <> ?2",
        params![signature, except],
    )?;
    Ok(())
}

fn load_rows(conn: &Connection, fingerprint: &Fingerprint) -> RdsResult<FileSet> {
    // The IN list is rendered from parsed ids, never from caller text.
    let sql = format!(
        "SELECT DISTINCT objectname, inode FROM rds WHERE rds_id IN ({})",
        fingerprint
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let mut set = FileSet::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(0)?;
        let inode: Inode = row.get(1)?;
        set.insert(inode, &name);
    }
    Ok(set)
}

fn contains_row(
    conn: &Connection,
    fingerprint: &Fingerprint,
    objectname: &str,
    inode: Option<Inode>,
) -> RdsResult<Option<Inode>> {
    let found = match inode {
        Some(inode) => {
            let sql = format!(
                "SELECT inode FROM rds WHERE objectname = ?1 AND inode = ?2 \
                 AND rds_id IN ({})",
                fingerprint
            );
            conn.query_row(&sql, params![objectname, inode], |row| row.get(0))
        }
        None => {
            let sql = format!(
                "SELECT inode FROM rds WHERE objectname = ?1 AND rds_id IN ({})",
                fingerprint
            );
            conn.query_row(&sql, params![objectname], |row| row.get(0))
        }
    };
    match found {
        Ok(inode) => Ok(Some(inode)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
