//! Schema bootstrap
//!
//! DDL for the two tables the cache owns (`rds_catalog`, `rds`) and for the
//! base tables it consumes (`objects`, `tagging`, `tags`). The base tables
//! belong to the enclosing filesystem; they are created here too so the
//! cache can run against an empty store, and re-running against an existing
//! one is a no-op.

use rusqlite::Connection;

use crate::errors::RdsResult;

/// Create all tables and indices if they do not exist yet.
pub fn ensure_schema(conn: &Connection) -> RdsResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS rds_catalog (
            rds_id    INTEGER PRIMARY KEY AUTOINCREMENT,
            creation  TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            subquery  VARCHAR(1024) NOT NULL UNIQUE,
            expired   INTEGER NOT NULL DEFAULT 0
         );
         CREATE TABLE IF NOT EXISTS rds (
            rds_id     INTEGER NOT NULL,
            inode      INTEGER NOT NULL,
            objectname VARCHAR(255) NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_rds_id    ON rds(rds_id);
         CREATE INDEX IF NOT EXISTS idx_rds_inode ON rds(rds_id, inode);

         CREATE TABLE IF NOT EXISTS objects (
            inode      INTEGER PRIMARY KEY AUTOINCREMENT,
            objectname VARCHAR(255) NOT NULL
         );
         CREATE TABLE IF NOT EXISTS tags (
            tag_id    INTEGER PRIMARY KEY AUTOINCREMENT,
            tagname   VARCHAR(255) NOT NULL,
            namespace VARCHAR(255),
            key       VARCHAR(255),
            -- NUMERIC affinity: numeric triple values compare as numbers
            value     NUMERIC
         );
         CREATE TABLE IF NOT EXISTS tagging (
            inode  INTEGER NOT NULL,
            tag_id INTEGER NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_tagging_inode ON tagging(inode);
         CREATE INDEX IF NOT EXISTS idx_tagging_tag   ON tagging(tag_id);",
    )?;
    Ok(())
}
