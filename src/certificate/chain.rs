//! Chain classification
//!
//! Labels each certificate of an ordered chain by its position and answers
//! predicates over the chain. The leaf is discovered from issuer/subject
//! relationships; it is not assumed to sit at index 0. Everything here is
//! a pure function of `(chain, index)` pairs.

use crate::models::Certificate;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Position of a certificate within its chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainPosition {
    Leaf,
    LeafSelfSigned,
    Intermediate,
    Root,
    Unknown,
}

impl ChainPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainPosition::Leaf => "leaf",
            ChainPosition::LeafSelfSigned => "leaf-self-signed",
            ChainPosition::Intermediate => "intermediate",
            ChainPosition::Root => "root",
            ChainPosition::Unknown => "unknown",
        }
    }

    /// Leaf or self-signed leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self, ChainPosition::Leaf | ChainPosition::LeafSelfSigned)
    }

    /// Tie-break rank: leaf first, then intermediate, then root
    fn rank(&self) -> u8 {
        match self {
            ChainPosition::Leaf | ChainPosition::LeafSelfSigned => 0,
            ChainPosition::Intermediate => 1,
            ChainPosition::Root => 2,
            ChainPosition::Unknown => 3,
        }
    }
}

impl fmt::Display for ChainPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether any other certificate in the chain names this one as its issuer
fn signs_another(chain: &[Certificate], index: usize) -> bool {
    let subject = &chain[index].subject;
    chain
        .iter()
        .enumerate()
        .any(|(i, cert)| i != index && &cert.issuer == subject)
}

/// Classify the certificate at `index`.
///
/// Out-of-range indexes are `Unknown`.
pub fn classify(chain: &[Certificate], index: usize) -> ChainPosition {
    let Some(cert) = chain.get(index) else {
        return ChainPosition::Unknown;
    };

    let self_issued = cert.is_self_issued();
    let signs_other = signs_another(chain, index);

    match (self_issued, signs_other) {
        (true, true) => ChainPosition::Root,
        (true, false) => ChainPosition::LeafSelfSigned,
        (false, false) => ChainPosition::Leaf,
        (false, true) => ChainPosition::Intermediate,
    }
}

/// Positions for the whole chain, index-aligned
pub fn positions(chain: &[Certificate]) -> Vec<ChainPosition> {
    (0..chain.len()).map(|i| classify(chain, i)).collect()
}

/// Index of the first leaf (or self-signed leaf) in the chain
pub fn leaf_index(chain: &[Certificate]) -> Option<usize> {
    (0..chain.len()).find(|&i| classify(chain, i).is_leaf())
}

/// The first leaf (or self-signed leaf) in the chain
pub fn leaf(chain: &[Certificate]) -> Option<&Certificate> {
    leaf_index(chain).map(|i| &chain[i])
}

/// Number of certificates per chain position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PositionCounts {
    pub leaf: usize,
    pub leaf_self_signed: usize,
    pub intermediate: usize,
    pub root: usize,
    pub unknown: usize,
}

impl PositionCounts {
    /// Leaf certificates including self-signed leaves
    pub fn leaves(&self) -> usize {
        self.leaf + self.leaf_self_signed
    }

    pub fn total(&self) -> usize {
        self.leaves() + self.intermediate + self.root + self.unknown
    }
}

/// Count certificates by position
pub fn count_positions(chain: &[Certificate]) -> PositionCounts {
    positions(chain)
        .into_iter()
        .fold(PositionCounts::default(), |mut counts, position| {
            match position {
                ChainPosition::Leaf => counts.leaf += 1,
                ChainPosition::LeafSelfSigned => counts.leaf_self_signed += 1,
                ChainPosition::Intermediate => counts.intermediate += 1,
                ChainPosition::Root => counts.root += 1,
                ChainPosition::Unknown => counts.unknown += 1,
            }
            counts
        })
}

/// Whether any certificate has expired as of `now`
pub fn has_expired(chain: &[Certificate], now: DateTime<Utc>) -> bool {
    chain.iter().any(|c| c.is_expired(now))
}

/// Whether any unexpired certificate expires before `threshold`
pub fn has_expiring(chain: &[Certificate], now: DateTime<Utc>, threshold: DateTime<Utc>) -> bool {
    chain.iter().any(|c| c.is_expiring(now, threshold))
}

pub fn num_expired(chain: &[Certificate], now: DateTime<Utc>) -> usize {
    chain.iter().filter(|c| c.is_expired(now)).count()
}

pub fn num_expiring(chain: &[Certificate], now: DateTime<Utc>, threshold: DateTime<Utc>) -> usize {
    chain.iter().filter(|c| c.is_expiring(now, threshold)).count()
}

/// Index of the certificate with the smallest NotAfter.
///
/// Ties are broken by position (leaf, intermediate, root) and then by
/// chain order.
pub fn next_to_expire(chain: &[Certificate]) -> Option<usize> {
    let positions = positions(chain);
    (0..chain.len()).min_by_key(|&i| (chain[i].not_after, positions[i].rank(), i))
}

/// Soonest NotAfter among certificates at the given position
pub fn next_to_expire_at(chain: &[Certificate], wanted: ChainPosition) -> Option<usize> {
    let positions = positions(chain);
    (0..chain.len())
        .filter(|&i| positions[i] == wanted)
        .min_by_key(|&i| (chain[i].not_after, i))
}
