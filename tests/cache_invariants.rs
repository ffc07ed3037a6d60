//! Cache invariant tests
//!
//! Properties that must hold across the prepare/load/invalidate
//! lifecycle: idempotent preparation, fingerprint validity, row
//! uniqueness, order-sensitive canonicalisation, and rebuild round-trips.

use rusqlite::{params, Connection};

use tagrds::bootstrap::ensure_schema;
use tagrds::catalog::{self, RdsId};
use tagrds::coordinator::{FileSet, Inode, RdsCache};
use tagrds::query::{AndNode, OrBranch, Query};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    ensure_schema(&conn).unwrap();
    conn
}

fn add_object(conn: &Connection, name: &str, tags: &[&str]) -> Inode {
    conn.execute("INSERT INTO objects (objectname) VALUES (?1)", params![name])
        .unwrap();
    let inode = conn.last_insert_rowid();
    for tag in tags {
        let tag_id: i64 = match conn.query_row(
            "SELECT tag_id FROM tags WHERE tagname = ?1",
            params![tag],
            |row| row.get(0),
        ) {
            Ok(id) => id,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                conn.execute("INSERT INTO tags (tagname) VALUES (?1)", params![tag])
                    .unwrap();
                conn.last_insert_rowid()
            }
            Err(e) => panic!("tag lookup failed: {e}"),
        };
        conn.execute(
            "INSERT INTO tagging (inode, tag_id) VALUES (?1, ?2)",
            params![inode, tag_id],
        )
        .unwrap();
    }
    inode as Inode
}

fn sorted_names(set: &FileSet) -> Vec<&str> {
    let mut names: Vec<_> = set.names().collect();
    names.sort_unstable();
    names
}

fn rds_rows(conn: &Connection, rds_id: RdsId) -> Vec<(i64, String)> {
    let mut stmt = conn
        .prepare("SELECT inode, objectname FROM rds WHERE rds_id = ?1 ORDER BY inode")
        .unwrap();
    stmt.query_map(params![rds_id.value()], |row| {
        Ok((row.get(0)?, row.get(1)?))
    })
    .unwrap()
    .map(Result::unwrap)
    .collect()
}

// =============================================================================
// Idempotence
// =============================================================================

/// A second prepare of the same query reuses the same id set.
#[test]
fn test_prepare_is_idempotent() {
    let conn = setup();
    let cache = RdsCache::default();
    add_object(&conn, "A", &["t1"]);
    add_object(&conn, "B", &["t2"]);

    let query = Query::new()
        .or(OrBranch::new().and(AndNode::tag("t1")))
        .or(OrBranch::new().and(AndNode::tag("t2")));

    let first = cache.prepare(&conn, &query, false, false).unwrap().unwrap();
    let second = cache.prepare(&conn, &query, false, false).unwrap().unwrap();

    assert_eq!(first.sorted_ids(), second.sorted_ids());

    // Still exactly one catalog row per subquery text.
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM rds_catalog", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 2);
}

// =============================================================================
// Fingerprint validity
// =============================================================================

/// Every id in a returned fingerprint resolves in the catalog.
#[test]
fn test_fingerprint_ids_exist_in_catalog() {
    let conn = setup();
    let cache = RdsCache::default();
    add_object(&conn, "A", &["t1", "t2"]);

    let query = Query::new()
        .or(OrBranch::new().and(AndNode::tag("t1")))
        .or(OrBranch::new().and(AndNode::tag("t2")).and(AndNode::tag("t1")));
    let fp = cache.prepare(&conn, &query, false, false).unwrap().unwrap();

    for id in fp.ids() {
        assert!(catalog::entry(&conn, *id).unwrap().is_some());
    }
}

// =============================================================================
// Row uniqueness
// =============================================================================

/// No duplicate (rds_id, inode) pairs survive a build, even when related
/// tags make an object match the seed twice.
#[test]
fn test_no_duplicate_pairs_after_build() {
    let conn = setup();
    let cache = RdsCache::default();
    add_object(&conn, "A", &["t1", "alias"]);
    add_object(&conn, "B", &["alias"]);

    let query = Query::new().or(OrBranch::new()
        .and(AndNode::tag("t1").with_related(AndNode::tag("alias"))));
    cache.prepare(&conn, &query, false, false).unwrap().unwrap();

    let (total, distinct): (i64, i64) = conn
        .query_row(
            "SELECT COUNT(*), COUNT(DISTINCT rds_id || ':' || inode) FROM rds",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(total, distinct);
}

// =============================================================================
// Canonicalisation is order-sensitive
// =============================================================================

/// AND-node order is part of a subquery's identity: permuted branches get
/// distinct catalog entries.
#[test]
fn test_permuted_branches_get_distinct_sets() {
    let conn = setup();
    let cache = RdsCache::default();
    add_object(&conn, "A", &["t1", "t2"]);

    let ab = Query::new().or(OrBranch::new()
        .and(AndNode::tag("t1"))
        .and(AndNode::tag("t2")));
    let ba = Query::new().or(OrBranch::new()
        .and(AndNode::tag("t2"))
        .and(AndNode::tag("t1")));

    let fp_ab = cache.prepare(&conn, &ab, false, false).unwrap().unwrap();
    let fp_ba = cache.prepare(&conn, &ba, false, false).unwrap().unwrap();

    assert_ne!(fp_ab.sorted_ids(), fp_ba.sorted_ids());

    // Both still list the same objects.
    assert_eq!(
        sorted_names(&cache.load(&conn, &fp_ab)),
        sorted_names(&cache.load(&conn, &fp_ba))
    );
}

// =============================================================================
// Rebuild round-trips
// =============================================================================

/// invalidate + rebuilding prepare answers the same listing as a fresh
/// prepare of the same query.
#[test]
fn test_invalidate_rebuild_round_trip() {
    let conn = setup();
    let cache = RdsCache::default();
    add_object(&conn, "A", &["t1"]);
    add_object(&conn, "B", &["t1", "t2"]);

    let query = Query::new().or(OrBranch::new().and(AndNode::tag("t1")));
    let fp = cache.prepare(&conn, &query, false, false).unwrap().unwrap();
    let before = sorted_names(&cache.load(&conn, &fp)).join(",");

    cache.invalidate(&conn, &fp, Some(&query)).unwrap();
    let rebuilt = cache.prepare(&conn, &query, false, true).unwrap().unwrap();
    let after = sorted_names(&cache.load(&conn, &rebuilt)).join(",");

    assert_eq!(before, after);
}

/// Rebuilding after invalidation materialises row-equal content.
#[test]
fn test_rebuild_yields_row_equal_rds() {
    let conn = setup();
    let cache = RdsCache::default();
    add_object(&conn, "A", &["t1"]);
    add_object(&conn, "B", &["t1"]);

    let query = Query::new().or(OrBranch::new().and(AndNode::tag("t1")));
    let fp = cache.prepare(&conn, &query, false, false).unwrap().unwrap();
    let before = rds_rows(&conn, fp.ids()[0]);

    cache.invalidate(&conn, &fp, Some(&query)).unwrap();
    let rebuilt = cache.prepare(&conn, &query, false, true).unwrap().unwrap();
    let after = rds_rows(&conn, rebuilt.ids()[0]);

    assert_eq!(before, after);
}

// =============================================================================
// Expansion
// =============================================================================

/// Folding a new object into an existing set answers the same listing as
/// rebuilding the set from scratch.
#[test]
fn test_expand_matches_rebuild() {
    let conn = setup();
    let cache = RdsCache::default();
    add_object(&conn, "A", &["t1"]);

    let query = Query::new().or(OrBranch::new().and(AndNode::tag("t1")));
    let fp = cache.prepare(&conn, &query, false, false).unwrap().unwrap();

    let b = add_object(&conn, "B", &["t1"]);
    cache.expand(&conn, b, "B", &query).unwrap();
    let expanded = sorted_names(&cache.load(&conn, &fp)).join(",");

    cache.invalidate(&conn, &fp, Some(&query)).unwrap();
    let rebuilt = cache.prepare(&conn, &query, false, true).unwrap().unwrap();
    let from_scratch = sorted_names(&cache.load(&conn, &rebuilt)).join(",");

    assert_eq!(expanded, from_scratch);
}

// =============================================================================
// Mixed analytical evaluation
// =============================================================================

/// A two-branch query with negation matches its analytical evaluation.
#[test]
fn test_load_matches_analytical_evaluation() {
    let conn = setup();
    let cache = RdsCache::default();
    add_object(&conn, "A", &["t1", "t2"]);
    add_object(&conn, "B", &["t1"]);
    add_object(&conn, "C", &["t3", "t4"]);
    add_object(&conn, "D", &["t3"]);

    // (t1 AND t2) OR (t3 AND NOT t4) = {A} ∪ {D} = {A, D}
    let query = Query::new()
        .or(OrBranch::new().and(AndNode::tag("t1")).and(AndNode::tag("t2")))
        .or(OrBranch::new().and(AndNode::tag("t3").with_negated(AndNode::tag("t4"))));
    let fp = cache.prepare(&conn, &query, false, false).unwrap().unwrap();

    assert_eq!(sorted_names(&cache.load(&conn, &fp)), ["A", "D"]);
}
