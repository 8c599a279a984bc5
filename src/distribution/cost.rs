//! Leaf assembly and cost-table derivation
//!
//! The tree is left-filled: with `h = ceil(log2 t)` and `p = 2^(h-1)`, the
//! bottom layer holds `x = 2(t - p)` leaves as `x/2` sibling pairs and the
//! rest is a perfect tree of height `h - 1` rooted one level up. Assembly
//! splits the `k` picks hypergeometrically over the bottom layer, applies
//! the pair-merge law there, and hands the survivors to the boundary-state
//! recursion.

use num_traits::Zero;
use serde::Serialize;
use tracing::debug;

use crate::combinatorics::{binomial, ceil_log2, pair_merge_probability, ratio};

use super::{Carry, MergeCache, Pmf};

/// One row of the cost table: a threshold on the singles count and the
/// base-2 logarithm of the expected number of independent grinding trials
/// needed to land at or below it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostEntry {
    /// Threshold on the singles statistic `M`.
    pub m_max: u32,
    /// `-log2 P(M ≤ m_max)`: geometric-trial expectation, in bits.
    pub log2_expected_trials: f64,
}

/// Full distribution of the singles statistic `M` for `k` positions drawn
/// uniformly without replacement from a left-filled tree of `t` leaf slots.
///
/// Returns the empty distribution when `k` is outside `[1, t]`.
pub fn singles_distribution(t: i64, k: i64, cache: &mut MergeCache) -> Pmf {
    if k < 1 || k > t {
        return Pmf::empty();
    }

    let height = ceil_log2(t);
    let perfect = if height > 0 { 1i64 << (height - 1) } else { 1 };
    let overhang = t - perfect;
    let bottom = 2 * overhang;

    let den = binomial(t, k);
    if den.is_zero() {
        return Pmf::empty();
    }

    let mut pmf = Pmf::empty();

    // Hypergeometric split: j picks land among the bottom layer.
    for j in 0..=k.min(bottom) {
        let w_split = ratio(&(binomial(bottom, j) * binomial(t - bottom, k - j)), &den);
        if w_split == 0.0 {
            continue;
        }

        // s full sibling pairs among those j bottom picks.
        for s in 0..=j / 2 {
            let w_pairs = pair_merge_probability(bottom, j, s);
            if w_pairs == 0.0 {
                continue;
            }
            let bottom_singles = (j - 2 * s) as u32;

            // Survivors enter the upper process at level h-1: the merged
            // pairs and singles' parents on the left (width t - p), the
            // untouched picks on the right (width p - (t - p)).
            let upper = cache.distribution(
                height.saturating_sub(1),
                if height > 0 { overhang } else { 0 },
                if height > 0 { perfect - overhang } else { 0 },
                j - s,
                k - j,
                Carry::Unconstrained,
            );
            pmf.fold(bottom_singles, w_split * w_pairs, &upper);
        }
    }

    debug!(t, k, states = cache.len(), "singles distribution assembled");
    pmf
}

/// Cost table for `(t, k)`, ascending in `m_max`, one entry per threshold
/// with strictly positive cumulative probability. Empty when `k` is outside
/// `[1, t]`.
pub fn cost_table(t: i64, k: i64) -> Vec<CostEntry> {
    cost_table_with_cache(t, k, &mut MergeCache::new())
}

/// [`cost_table`] reusing a caller-owned cache, for batch queries over
/// overlapping tree shapes.
pub fn cost_table_with_cache(t: i64, k: i64, cache: &mut MergeCache) -> Vec<CostEntry> {
    let pmf = singles_distribution(t, k, cache);
    let Some(max_m) = pmf.max_m() else {
        return Vec::new();
    };

    let mut table = Vec::new();
    let mut cumulative = 0.0;
    for m_max in 0..=max_m {
        cumulative += pmf.get(m_max);
        // Zero-mass prefixes are omitted outright so the logarithm below is
        // always defined.
        if cumulative > 0.0 {
            table.push(CostEntry {
                m_max,
                log2_expected_trials: -cumulative.log2(),
            });
        }
    }
    table
}
