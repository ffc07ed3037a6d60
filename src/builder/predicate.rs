//! WHERE-clause assembly for tag predicates
//!
//! Predicate structure (operator choice, OR-chains over related nodes) is
//! assembled textually; every caller-supplied value is bound as a
//! parameter, so tag names and values containing quotes cannot break out
//! of the statement.

use rusqlite::types::Value;

use crate::query::ast::{AndNode, TagPredicate, TripleOp};

/// A SQL fragment and the parameters it binds, in placeholder order.
#[derive(Debug, Default)]
pub struct PredicateSql {
    pub clause: String,
    pub params: Vec<Value>,
}

impl PredicateSql {
    fn push_node(&mut self, node: &AndNode) {
        match node.predicate() {
            TagPredicate::Plain {
                tag_id: Some(id), ..
            } => {
                self.clause.push_str("tagging.tag_id = ?");
                self.params.push(Value::Integer(i64::from(*id)));
            }
            TagPredicate::Plain { tag, tag_id: None } => {
                self.clause.push_str("tags.tagname = ?");
                self.params.push(Value::Text(tag.clone()));
            }
            TagPredicate::Triple {
                namespace,
                key,
                op,
                value,
            } => {
                self.clause
                    .push_str("(tags.tagname = ? AND tags.key = ? AND tags.value ");
                self.clause.push_str(match op {
                    TripleOp::Eq => "= ?)",
                    TripleOp::Contains => "LIKE ?)",
                    TripleOp::Gt => "> ?)",
                    TripleOp::Lt => "< ?)",
                });
                self.params.push(Value::Text(namespace.clone()));
                self.params.push(Value::Text(key.clone()));
                self.params.push(Value::Text(match op {
                    TripleOp::Contains => format!("%{}%", value),
                    _ => value.clone(),
                }));
            }
        }
    }
}

/// Builds the disjunction of a node and its related chain.
///
/// The related nodes are reasoner-provided broadeners: an object matching
/// any of them matches the node.
pub fn disjunction(node: &AndNode) -> PredicateSql {
    let mut sql = PredicateSql::default();
    sql.push_node(node);
    for related in node.related_chain() {
        sql.clause.push_str(" OR ");
        sql.push_node(related);
    }
    sql
}
