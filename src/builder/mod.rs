//! RDS builder
//!
//! Materialises one OR-branch into the `rds` table. The coordinator has
//! already registered the catalog row (phase 1); here the first AND-node
//! seeds the set (phase 2), each following AND-node intersects it
//! (phase 3) and every negated node subtracts from it (phase 4). After
//! phase 4 the rows equal the branch semantics:
//!
//! ```text
//! (primary0 ∪ related0) ∩ (primary1 ∪ related1) ∩ … ∖ ⋃ negated
//! ```
//!
//! All four phases run inside one transaction; a failed build leaves no
//! partial row set behind.

pub mod predicate;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::catalog::RdsId;
use crate::errors::RdsResult;
use crate::query::ast::OrBranch;

/// Join over the base tables shared by every phase.
const TAG_JOIN: &str = "FROM objects \
     JOIN tagging ON tagging.inode = objects.inode \
     JOIN tags ON tags.tag_id = tagging.tag_id \
     WHERE ";

/// Materialises `branch` under the freshly registered `rds_id`.
///
/// An empty branch produces no seed: the set stays empty, and the catalog
/// entry still short-circuits future identical queries.
pub fn build(conn: &Connection, rds_id: RdsId, branch: &OrBranch) -> RdsResult<()> {
    let Some(first) = branch.first_and() else {
        return Ok(());
    };

    tracing::debug!(rds_id = rds_id.value(), "building rds");

    let tx = conn.unchecked_transaction()?;

    // Phase 2: seed from the first AND-node and its related chain.
    // DISTINCT keeps (rds_id, inode) unique when an object matches both
    // the primary and a related tag.
    let seed = predicate::disjunction(first);
    let sql = format!(
        "INSERT INTO rds (rds_id, inode, objectname) \
         SELECT DISTINCT ?, objects.inode, objects.objectname {}{}",
        TAG_JOIN, seed.clause
    );
    tx.execute(&sql, params_from_iter(with_id(rds_id, seed.params)))?;

    // Phase 3: each following AND-node restricts the set.
    for node in branch.rest() {
        let pred = predicate::disjunction(node);
        let sql = format!(
            "DELETE FROM rds WHERE rds_id = ? AND inode NOT IN \
             (SELECT objects.inode {}{})",
            TAG_JOIN, pred.clause
        );
        tx.execute(&sql, params_from_iter(with_id(rds_id, pred.params)))?;
    }

    // Phase 4: every negated node of every AND-node (first included)
    // subtracts its matches, related chain and all.
    for node in branch.and_nodes() {
        for negated in node.negated_chain() {
            let pred = predicate::disjunction(negated);
            let sql = format!(
                "DELETE FROM rds WHERE rds_id = ? AND inode IN \
                 (SELECT objects.inode {}{})",
                TAG_JOIN, pred.clause
            );
            tx.execute(&sql, params_from_iter(with_id(rds_id, pred.params)))?;
        }
    }

    tx.commit()?;
    Ok(())
}

fn with_id(rds_id: RdsId, params: Vec<Value>) -> Vec<Value> {
    let mut all = Vec::with_capacity(params.len() + 1);
    all.push(Value::Integer(rds_id.value()));
    all.extend(params);
    all
}
