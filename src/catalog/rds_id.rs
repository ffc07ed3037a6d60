//! RDS identities
//!
//! `RdsId` is the catalog primary key of one materialised set. A
//! `Fingerprint` is the ordered, non-empty list of ids answering a whole
//! query, rendered on the wire as comma-joined decimals with no
//! whitespace. "ALL objects" is represented by the absence of a
//! fingerprint, never by an empty one.

use std::fmt;
use std::str::FromStr;

use crate::errors::RdsError;

/// Identity of one materialised result set.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RdsId(i64);

impl RdsId {
    /// Creates an RdsId from a catalog row id.
    #[inline]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying row id.
    #[inline]
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RdsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The set of ids answering one query, in branch order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fingerprint(Vec<RdsId>);

impl Fingerprint {
    /// Creates a fingerprint from a non-empty id list.
    ///
    /// Returns None for an empty list: the all-objects answer has no
    /// fingerprint.
    pub fn new(ids: Vec<RdsId>) -> Option<Self> {
        if ids.is_empty() {
            None
        } else {
            Some(Self(ids))
        }
    }

    /// Returns the ids in branch order.
    pub fn ids(&self) -> &[RdsId] {
        &self.0
    }

    /// Returns true if the fingerprint references the given id.
    pub fn contains(&self, id: RdsId) -> bool {
        self.0.contains(&id)
    }

    /// Returns the ids as an order-insensitive sorted list, for set
    /// comparisons.
    pub fn sorted_ids(&self) -> Vec<RdsId> {
        let mut ids = self.0.clone();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", id)?;
        }
        Ok(())
    }
}

impl FromStr for Fingerprint {
    type Err = RdsError;

    /// Parses `id(,id)*`. Whitespace, empty segments and non-decimal
    /// characters are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RdsError::InvalidFingerprint(s.to_string());

        if s.is_empty() {
            return Err(invalid());
        }

        let mut ids = Vec::new();
        for part in s.split(',') {
            let id: i64 = part.parse().map_err(|_| invalid())?;
            ids.push(RdsId::new(id));
        }
        Ok(Self(ids))
    }
}
