//! Query AST structures
//!
//! A query addresses objects by a boolean combination of tags: the union of
//! one or more OR-branches, each branch a conjunction of AND-nodes. Every
//! AND-node carries two auxiliary chains. `related` nodes are reasoner
//! output, disjunctively equivalent to the primary; they broaden the match
//! and are OR-unioned with it. `negated` nodes subtract their matching
//! objects from the branch.
//!
//! Node order within a branch is significant and preserved: the builder
//! seeds the result set from the first AND-node and restricts it with each
//! following one.

/// Identifier of a resolved tag row
pub type TagId = u32;

/// Comparison operators for machine-readable triple tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripleOp {
    /// Exact value match
    Eq,
    /// Substring match
    Contains,
    /// Strictly greater
    Gt,
    /// Strictly smaller
    Lt,
}

impl TripleOp {
    /// Returns the operator code used in canonical subquery text
    pub fn code(&self) -> &'static str {
        match self {
            TripleOp::Eq => "eq",
            TripleOp::Contains => "inc",
            TripleOp::Gt => "gt",
            TripleOp::Lt => "lt",
        }
    }
}

/// The atomic predicate of one AND-node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagPredicate {
    /// A flat tag, optionally already resolved to its tag id
    Plain {
        /// Tag name
        tag: String,
        /// Resolved id, when the caller already looked it up
        tag_id: Option<TagId>,
    },
    /// A triple tag: `namespace/key` compared against `value`
    Triple {
        namespace: String,
        key: String,
        op: TripleOp,
        value: String,
    },
}

/// One conjunct of an OR-branch, with its related and negated chains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndNode {
    predicate: TagPredicate,
    related: Vec<AndNode>,
    negated: Vec<AndNode>,
}

impl AndNode {
    /// Creates a plain-tag node
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::from_predicate(TagPredicate::Plain {
            tag: tag.into(),
            tag_id: None,
        })
    }

    /// Creates a plain-tag node whose tag id is already resolved
    pub fn resolved_tag(tag: impl Into<String>, tag_id: TagId) -> Self {
        Self::from_predicate(TagPredicate::Plain {
            tag: tag.into(),
            tag_id: Some(tag_id),
        })
    }

    /// Creates a triple node
    pub fn triple(
        namespace: impl Into<String>,
        key: impl Into<String>,
        op: TripleOp,
        value: impl Into<String>,
    ) -> Self {
        Self::from_predicate(TagPredicate::Triple {
            namespace: namespace.into(),
            key: key.into(),
            op,
            value: value.into(),
        })
    }

    /// Creates a node from an already-built predicate
    pub fn from_predicate(predicate: TagPredicate) -> Self {
        Self {
            predicate,
            related: Vec::new(),
            negated: Vec::new(),
        }
    }

    /// Appends a reasoner-provided broadener
    pub fn with_related(mut self, node: AndNode) -> Self {
        self.related.push(node);
        self
    }

    /// Appends a negated node
    pub fn with_negated(mut self, node: AndNode) -> Self {
        self.negated.push(node);
        self
    }

    /// Returns the node's predicate
    pub fn predicate(&self) -> &TagPredicate {
        &self.predicate
    }

    /// Returns the related chain in insertion order
    pub fn related_chain(&self) -> &[AndNode] {
        &self.related
    }

    /// Returns the negated chain in insertion order
    pub fn negated_chain(&self) -> &[AndNode] {
        &self.negated
    }
}

/// One OR-branch: an ordered conjunction of AND-nodes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrBranch {
    and_nodes: Vec<AndNode>,
}

impl OrBranch {
    /// Creates an empty branch
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a branch from a node list, preserving order
    pub fn from_nodes(and_nodes: Vec<AndNode>) -> Self {
        Self { and_nodes }
    }

    /// Appends an AND-node
    pub fn and(mut self, node: AndNode) -> Self {
        self.and_nodes.push(node);
        self
    }

    /// Returns all AND-nodes in branch order
    pub fn and_nodes(&self) -> &[AndNode] {
        &self.and_nodes
    }

    /// Returns the node that seeds the result set, if any
    pub fn first_and(&self) -> Option<&AndNode> {
        self.and_nodes.first()
    }

    /// Returns every node after the first, each of which restricts the set
    pub fn rest(&self) -> &[AndNode] {
        self.and_nodes.get(1..).unwrap_or(&[])
    }

    /// Returns true if the branch has no AND-nodes
    pub fn is_empty(&self) -> bool {
        self.and_nodes.is_empty()
    }
}

/// A whole query: the union over its OR-branches
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    branches: Vec<OrBranch>,
}

impl Query {
    /// Creates an empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query from a branch list, preserving order
    pub fn from_branches(branches: Vec<OrBranch>) -> Self {
        Self { branches }
    }

    /// Appends an OR-branch
    pub fn or(mut self, branch: OrBranch) -> Self {
        self.branches.push(branch);
        self
    }

    /// Returns all branches in query order
    pub fn branches(&self) -> &[OrBranch] {
        &self.branches
    }

    /// Returns true if the query has no branches
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}
