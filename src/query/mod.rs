//! Query model
//!
//! Typed representation of tag queries (an or-of-ands with negation and
//! related-tag expansion) and the canonical serialisation that keys the
//! catalog.

pub mod ast;
pub mod canonical;

pub use ast::{AndNode, OrBranch, Query, TagId, TagPredicate, TripleOp};
pub use canonical::subquery_text;
