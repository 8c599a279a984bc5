//! Distribution of the unmerged-singles statistic `M`
//!
//! A "tournament tree" holds `t` leaf slots in a left-filled near-complete
//! binary tree; `k` of them are selected uniformly at random without
//! replacement. As the tree is collapsed level by level, selected siblings
//! merge into their parent; every selected node left without a selected
//! sibling at its level counts once toward `M`. `M` is exactly the number of
//! authentication hashes a verifier must be handed, which is what the
//! grinding threshold `m_max` bounds.
//!
//! The engine decomposes the tree into a left/right block pair per level and
//! runs a memoized recursion over `(level, widths, remaining picks, carry)`;
//! see [`merge`]. The full leaf-level assembly and the derived cost table
//! live in [`cost`].

mod cost;
mod merge;

pub use cost::{cost_table, cost_table_with_cache, singles_distribution, CostEntry};
pub use merge::{Carry, MergeCache};

use std::collections::btree_map;
use std::collections::BTreeMap;

/// Probability mass function over the singles count `m`.
///
/// Backed by a `BTreeMap` so iteration (and therefore floating-point
/// accumulation) happens in a fixed order, keeping results reproducible.
/// The empty PMF represents an unreachable parameter state and carries zero
/// mass everywhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pmf {
    mass: BTreeMap<u32, f64>,
}

impl Pmf {
    /// Empty distribution (zero mass everywhere; an unreachable state).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Point mass: `P(M = m) = 1`.
    pub fn point(m: u32) -> Self {
        let mut mass = BTreeMap::new();
        mass.insert(m, 1.0);
        Self { mass }
    }

    /// Whether the distribution carries no mass at all.
    pub fn is_empty(&self) -> bool {
        self.mass.is_empty()
    }

    /// Mass at `m` (zero when absent).
    pub fn get(&self, m: u32) -> f64 {
        self.mass.get(&m).copied().unwrap_or(0.0)
    }

    /// Largest `m` with recorded mass.
    pub fn max_m(&self) -> Option<u32> {
        self.mass.keys().next_back().copied()
    }

    /// Total mass; 1.0 for every reachable parameter state.
    pub fn total_mass(&self) -> f64 {
        self.mass.values().sum()
    }

    /// Iterate `(m, mass)` in increasing `m`.
    pub fn iter(&self) -> btree_map::Iter<'_, u32, f64> {
        self.mass.iter()
    }

    /// Fold `weight × sub` into `self`, with every entry of `sub` shifted
    /// up by `shift` singles. This is the one accumulation primitive the
    /// recursion uses.
    pub(crate) fn fold(&mut self, shift: u32, weight: f64, sub: &Pmf) {
        for (&m, &p) in &sub.mass {
            *self.mass.entry(shift + m).or_insert(0.0) += weight * p;
        }
    }
}

impl FromIterator<(u32, f64)> for Pmf {
    fn from_iter<I: IntoIterator<Item = (u32, f64)>>(iter: I) -> Self {
        Self {
            mass: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_mass_basics() {
        let pmf = Pmf::point(3);
        assert!(!pmf.is_empty());
        assert_eq!(pmf.get(3), 1.0);
        assert_eq!(pmf.get(2), 0.0);
        assert_eq!(pmf.max_m(), Some(3));
        assert_eq!(pmf.total_mass(), 1.0);
    }

    #[test]
    fn empty_pmf_has_no_mass() {
        let pmf = Pmf::empty();
        assert!(pmf.is_empty());
        assert_eq!(pmf.max_m(), None);
        assert_eq!(pmf.total_mass(), 0.0);
    }

    #[test]
    fn fold_shifts_and_weights() {
        let sub: Pmf = [(0, 0.5), (2, 0.5)].into_iter().collect();
        let mut out = Pmf::empty();
        out.fold(1, 0.4, &sub);
        out.fold(1, 0.6, &sub);
        assert!((out.get(1) - 0.5).abs() < 1e-12);
        assert!((out.get(3) - 0.5).abs() < 1e-12);
    }
}
