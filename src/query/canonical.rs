//! Canonical subquery text
//!
//! One OR-branch serialises to the text that identifies its materialised
//! row set in the catalog: primary AND-nodes in branch order, then every
//! negated node of every primary (again in branch order) prefixed with
//! `-/`. Serialisation is deterministic but order-sensitive: branches whose
//! node lists differ only in order produce different texts and therefore
//! different catalog entries.
//!
//! Related nodes are excluded on purpose. They broaden the contents of the
//! set but are a derived property of the primary tag; encoding them would
//! miss the cache for logically identical queries. The flip side is that a
//! change in the reasoner's related sets leaves already-materialised rows
//! stale under an unchanged text; the remedy is invalidation followed by a
//! rebuilding prepare.

use super::ast::{AndNode, OrBranch, TagPredicate};

/// Serialises one OR-branch into its canonical catalog text.
pub fn subquery_text(branch: &OrBranch) -> String {
    let mut text = String::new();

    for node in branch.and_nodes() {
        push_segment(&mut text, node, false);
    }
    for node in branch.and_nodes() {
        for negated in node.negated_chain() {
            push_segment(&mut text, negated, true);
        }
    }

    text
}

fn push_segment(text: &mut String, node: &AndNode, negated: bool) {
    if negated {
        text.push_str("-/");
    }
    match node.predicate() {
        TagPredicate::Plain { tag, .. } => {
            text.push_str(tag);
            text.push('/');
        }
        TagPredicate::Triple {
            namespace,
            key,
            op,
            value,
        } => {
            text.push_str(namespace);
            text.push('/');
            text.push_str(key);
            text.push('/');
            text.push_str(op.code());
            text.push('/');
            text.push_str(value);
            text.push('/');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::TripleOp;

    #[test]
    fn test_single_tag() {
        let branch = OrBranch::new().and(AndNode::tag("t1"));
        assert_eq!(subquery_text(&branch), "t1/");
    }

    #[test]
    fn test_conjunction() {
        let branch = OrBranch::new()
            .and(AndNode::tag("t1"))
            .and(AndNode::tag("t2"));
        assert_eq!(subquery_text(&branch), "t1/t2/");
    }

    #[test]
    fn test_negation_emitted_after_primaries() {
        let branch = OrBranch::new().and(AndNode::tag("t1").with_negated(AndNode::tag("t2")));
        assert_eq!(subquery_text(&branch), "t1/-/t2/");
    }

    #[test]
    fn test_negations_follow_primary_order() {
        let branch = OrBranch::new()
            .and(AndNode::tag("t1").with_negated(AndNode::tag("n1")))
            .and(AndNode::tag("t2").with_negated(AndNode::tag("n2")));
        assert_eq!(subquery_text(&branch), "t1/t2/-/n1/-/n2/");
    }

    #[test]
    fn test_triple_segment() {
        let branch = OrBranch::new().and(AndNode::triple("ns1", "size", TripleOp::Gt, "50"));
        assert_eq!(subquery_text(&branch), "ns1/size/gt/50/");
    }

    #[test]
    fn test_related_nodes_are_excluded() {
        let branch = OrBranch::new().and(AndNode::tag("t1").with_related(AndNode::tag("alias")));
        assert_eq!(subquery_text(&branch), "t1/");
    }

    #[test]
    fn test_serialisation_is_order_sensitive() {
        let ab = OrBranch::new()
            .and(AndNode::tag("a"))
            .and(AndNode::tag("b"));
        let ba = OrBranch::new()
            .and(AndNode::tag("b"))
            .and(AndNode::tag("a"));
        assert_ne!(subquery_text(&ab), subquery_text(&ba));
    }

    #[test]
    fn test_empty_branch_serialises_empty() {
        assert_eq!(subquery_text(&OrBranch::new()), "");
    }
}
