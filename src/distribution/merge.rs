//! Boundary-state merge recursion
//!
//! One level of tree collapse splits the current layer into a left block of
//! width `L` and a right block of width `R`, with `kL` and `kR` selected
//! positions remaining on each side. Selected siblings merge into their
//! parent; everything else contributes one single at this level. The awkward
//! case is an odd `L`: the block boundary then bisects a sibling pair, and
//! whether that pair's parent enters the next level selected or not must be
//! carried as an explicit constraint.
//!
//! The recursion knows nothing about the original `(t, k)` query, only block
//! widths and residual counts, so memoized sub-states are shared between any
//! queries whose subtrees coincide in shape.

use std::collections::HashMap;

use num_traits::Zero;

use crate::combinatorics::{binomial, pair_merge_probability, ratio};

use super::Pmf;

/// Constraint on the single tree position straddling an odd left/right
/// split, resolved one level below the split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Carry {
    /// The boundary position is forced unselected.
    Excluded,
    /// No constraint on the boundary position.
    Unconstrained,
    /// The boundary position is forced selected.
    Selected,
}

/// Memoized state key: pure tree geometry plus residual counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct State {
    level: u32,
    left: i64,
    right: i64,
    picks_left: i64,
    picks_right: i64,
    carry: Carry,
}

/// Memoization table for the merge recursion.
///
/// Owned by the top-level query rather than living in process-wide state, so
/// its lifetime is scoped and its contents observable in tests. Batch
/// callers can keep one cache across queries to share subtree results.
#[derive(Debug, Default)]
pub struct MergeCache {
    memo: HashMap<State, Pmf>,
}

impl MergeCache {
    /// Fresh, empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct sub-states resolved so far.
    pub fn len(&self) -> usize {
        self.memo.len()
    }

    /// Whether no sub-state has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }

    /// Distribution of singles produced by collapsing `level` further tree
    /// levels above blocks of widths `left`/`right` holding `picks_left`/
    /// `picks_right` selected positions, under the given boundary `carry`.
    ///
    /// `level = 0` is the exhausted top: a point mass at zero. Infeasible
    /// residual counts yield the empty distribution, which propagates as
    /// zero contribution in every caller.
    pub fn distribution(
        &mut self,
        level: u32,
        left: i64,
        right: i64,
        picks_left: i64,
        picks_right: i64,
        carry: Carry,
    ) -> Pmf {
        if level == 0 {
            return Pmf::point(0);
        }
        if picks_left < 0 || picks_left > left || picks_right < 0 || picks_right > right {
            return Pmf::empty();
        }

        let state = State {
            level,
            left,
            right,
            picks_left,
            picks_right,
            carry,
        };
        if let Some(hit) = self.memo.get(&state) {
            return hit.clone();
        }

        let out = if left % 2 == 0 {
            self.collapse_even(state)
        } else {
            self.collapse_odd(state)
        };
        self.memo.insert(state, out.clone());
        out
    }

    /// Even left width: the boundary falls between sibling pairs, so the two
    /// blocks decompose independently. Only a carried constraint on the
    /// right block's first position couples them.
    fn collapse_even(&mut self, s: State) -> Pmf {
        let State {
            level,
            left,
            right,
            picks_left,
            picks_right,
            ..
        } = s;
        let mut out = Pmf::empty();

        match s.carry {
            Carry::Unconstrained => {
                // Independent pair-merge laws on both blocks.
                for merged_left in 0..=picks_left / 2 {
                    let w_left = pair_merge_probability(left, picks_left, merged_left);
                    if w_left == 0.0 {
                        continue;
                    }
                    for merged_right in 0..=picks_right / 2 {
                        let w_right = pair_merge_probability(right, picks_right, merged_right);
                        if w_right == 0.0 {
                            continue;
                        }
                        let singles =
                            (picks_left + picks_right) - 2 * (merged_left + merged_right);
                        let sub = self.distribution(
                            level - 1,
                            left / 2,
                            right / 2,
                            picks_left - merged_left,
                            picks_right - merged_right,
                            Carry::Unconstrained,
                        );
                        out.fold(singles as u32, w_left * w_right, &sub);
                    }
                }
            }
            Carry::Selected => {
                // The right block's first position is forced selected.
                if right < 1 || picks_right < 1 {
                    return Pmf::empty();
                }
                if right == 1 {
                    // The forced position has no sibling at this level; it
                    // stays unresolved and the constraint rides upward.
                    for merged_left in 0..=picks_left / 2 {
                        let w_left = pair_merge_probability(left, picks_left, merged_left);
                        if w_left == 0.0 {
                            continue;
                        }
                        let singles = (picks_left + picks_right) - 2 * merged_left;
                        let sub = self.distribution(
                            level - 1,
                            left / 2,
                            0,
                            picks_left - merged_left,
                            picks_right,
                            Carry::Selected,
                        );
                        out.fold(singles as u32, w_left, &sub);
                    }
                } else {
                    // Condition on whether the forced position's sibling is
                    // selected, then apply the pair-merge law to the
                    // remaining interior of width R - 2.
                    let den = binomial(right - 1, picks_right - 1);
                    if den.is_zero() {
                        return Pmf::empty();
                    }
                    let w_sibling = [
                        (1i64, ratio(&binomial(right - 2, picks_right - 2), &den)),
                        (0i64, ratio(&binomial(right - 2, picks_right - 1), &den)),
                    ];
                    for merged_left in 0..=picks_left / 2 {
                        let w_left = pair_merge_probability(left, picks_left, merged_left);
                        if w_left == 0.0 {
                            continue;
                        }
                        for (sibling, w_s) in w_sibling {
                            if w_s == 0.0 {
                                continue;
                            }
                            let interior_picks = picks_right - 1 - sibling;
                            for merged_interior in 0..=interior_picks / 2 {
                                let w_int = pair_merge_probability(
                                    right - 2,
                                    interior_picks,
                                    merged_interior,
                                );
                                if w_int == 0.0 {
                                    continue;
                                }
                                let merged_right = sibling + merged_interior;
                                let singles = (picks_left + picks_right)
                                    - 2 * (merged_left + merged_right);
                                let sub = self.distribution(
                                    level - 1,
                                    left / 2,
                                    right / 2,
                                    picks_left - merged_left,
                                    picks_right - merged_right,
                                    Carry::Selected,
                                );
                                out.fold(singles as u32, w_left * w_s * w_int, &sub);
                            }
                        }
                    }
                }
            }
            Carry::Excluded => {
                // The right block's first position is forced unselected.
                if right <= 1 {
                    if picks_right != 0 {
                        return Pmf::empty();
                    }
                    for merged_left in 0..=picks_left / 2 {
                        let w_left = pair_merge_probability(left, picks_left, merged_left);
                        if w_left == 0.0 {
                            continue;
                        }
                        let singles = picks_left - 2 * merged_left;
                        let sub = self.distribution(
                            level - 1,
                            left / 2,
                            0,
                            picks_left - merged_left,
                            0,
                            Carry::Excluded,
                        );
                        out.fold(singles as u32, w_left, &sub);
                    }
                } else {
                    // Condition on the excluded position's sibling; a
                    // selected sibling rides up as a Selected carry.
                    let den = binomial(right - 1, picks_right);
                    let w_sibling = [
                        (
                            0i64,
                            ratio(&binomial(right - 2, picks_right), &den),
                            Carry::Excluded,
                        ),
                        (
                            1i64,
                            ratio(&binomial(right - 2, picks_right - 1), &den),
                            Carry::Selected,
                        ),
                    ];
                    for merged_left in 0..=picks_left / 2 {
                        let w_left = pair_merge_probability(left, picks_left, merged_left);
                        if w_left == 0.0 {
                            continue;
                        }
                        for (sibling, w_s, carry_next) in w_sibling {
                            if w_s == 0.0 {
                                continue;
                            }
                            let interior_picks = picks_right - sibling;
                            for merged_interior in 0..=interior_picks / 2 {
                                let w_int = pair_merge_probability(
                                    right - 2,
                                    interior_picks,
                                    merged_interior,
                                );
                                if w_int == 0.0 {
                                    continue;
                                }
                                let singles = (picks_left + picks_right)
                                    - 2 * (merged_left + merged_interior);
                                let sub = self.distribution(
                                    level - 1,
                                    left / 2,
                                    right / 2,
                                    picks_left - merged_left,
                                    picks_right - merged_interior,
                                    carry_next,
                                );
                                out.fold(singles as u32, w_left * w_s * w_int, &sub);
                            }
                        }
                    }
                }
            }
        }

        out
    }

    /// Odd left width: the true sibling pair spans the block boundary
    /// (positions L-1 and L). Indicators for the two boundary-adjacent
    /// positions decide whether that pair merges; its parent is absorbed
    /// into the right successor block, whose width gains one.
    fn collapse_odd(&mut self, s: State) -> Pmf {
        let State {
            level,
            left,
            right,
            picks_left,
            picks_right,
            ..
        } = s;
        let den_left = binomial(left, picks_left);
        if den_left.is_zero() {
            return Pmf::empty();
        }

        let left_next = (left - 1) / 2;
        let right_next = (right - 1) / 2 + 1;
        let mut out = Pmf::empty();

        // Weight for the left boundary-adjacent position being selected
        // (x_l = 1) or not, over the L-1 interior positions.
        let w_left_indicator =
            |x_l: i64| ratio(&binomial(left - 1, picks_left - x_l), &den_left);

        match s.carry {
            Carry::Unconstrained => {
                let den_right = binomial(right, picks_right);
                if den_right.is_zero() {
                    return Pmf::empty();
                }
                for x_l in 0..=1i64 {
                    let w_xl = w_left_indicator(x_l);
                    if w_xl == 0.0 {
                        continue;
                    }
                    for x_r in 0..=1i64 {
                        let w_xr = ratio(&binomial(right - 1, picks_right - x_r), &den_right);
                        if w_xr == 0.0 {
                            continue;
                        }
                        let interior_left = picks_left - x_l;
                        let interior_right = picks_right - x_r;
                        for merged_left in 0..=interior_left / 2 {
                            let w_left =
                                pair_merge_probability(left - 1, interior_left, merged_left);
                            if w_left == 0.0 {
                                continue;
                            }
                            for merged_right in 0..=interior_right / 2 {
                                let w_right = pair_merge_probability(
                                    right - 1,
                                    interior_right,
                                    merged_right,
                                );
                                if w_right == 0.0 {
                                    continue;
                                }
                                // The cross-boundary pair itself merges only
                                // when both of its members are selected.
                                let boundary_merge = x_l * x_r;
                                let singles = (picks_left + picks_right)
                                    - 2 * (merged_left + merged_right + boundary_merge);
                                let carry_next = if x_l + x_r >= 1 {
                                    Carry::Selected
                                } else {
                                    Carry::Excluded
                                };
                                let sub = self.distribution(
                                    level - 1,
                                    left_next,
                                    right_next,
                                    picks_left - x_l - merged_left,
                                    picks_right - x_r - merged_right
                                        + (x_l + x_r - boundary_merge),
                                    carry_next,
                                );
                                out.fold(
                                    singles as u32,
                                    w_xl * w_xr * w_left * w_right,
                                    &sub,
                                );
                            }
                        }
                    }
                }
            }
            Carry::Selected => {
                // x_r = 1 is fixed by the carried constraint.
                if right < 1 || picks_right < 1 {
                    return Pmf::empty();
                }
                for x_l in 0..=1i64 {
                    let w_xl = w_left_indicator(x_l);
                    if w_xl == 0.0 {
                        continue;
                    }
                    let interior_left = picks_left - x_l;
                    let interior_right = picks_right - 1;
                    for merged_left in 0..=interior_left / 2 {
                        let w_left = pair_merge_probability(left - 1, interior_left, merged_left);
                        if w_left == 0.0 {
                            continue;
                        }
                        for merged_right in 0..=interior_right / 2 {
                            let w_right =
                                pair_merge_probability(right - 1, interior_right, merged_right);
                            if w_right == 0.0 {
                                continue;
                            }
                            let boundary_merge = x_l;
                            let singles = (picks_left + picks_right)
                                - 2 * (merged_left + merged_right + boundary_merge);
                            let sub = self.distribution(
                                level - 1,
                                left_next,
                                right_next,
                                picks_left - x_l - merged_left,
                                picks_right - merged_right,
                                Carry::Selected,
                            );
                            out.fold(singles as u32, w_xl * w_left * w_right, &sub);
                        }
                    }
                }
            }
            Carry::Excluded => {
                // x_r = 0 is fixed; the boundary pair can merge only if the
                // left member carries it alone, which it cannot, so the pair
                // contributes no merge. A selected x_l still promotes the
                // pair's parent into the right block.
                if right < 1 {
                    return Pmf::empty();
                }
                for x_l in 0..=1i64 {
                    let w_xl = w_left_indicator(x_l);
                    if w_xl == 0.0 {
                        continue;
                    }
                    let interior_left = picks_left - x_l;
                    for merged_left in 0..=interior_left / 2 {
                        let w_left = pair_merge_probability(left - 1, interior_left, merged_left);
                        if w_left == 0.0 {
                            continue;
                        }
                        for merged_right in 0..=picks_right / 2 {
                            let w_right =
                                pair_merge_probability(right - 1, picks_right, merged_right);
                            if w_right == 0.0 {
                                continue;
                            }
                            let singles = (picks_left + picks_right)
                                - 2 * (merged_left + merged_right);
                            let carry_next = if x_l == 1 {
                                Carry::Selected
                            } else {
                                Carry::Excluded
                            };
                            let sub = self.distribution(
                                level - 1,
                                left_next,
                                right_next,
                                picks_left - x_l - merged_left,
                                picks_right - merged_right + x_l,
                                carry_next,
                            );
                            out.fold(singles as u32, w_xl * w_left * w_right, &sub);
                        }
                    }
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_top_is_a_point_mass() {
        let mut cache = MergeCache::new();
        let pmf = cache.distribution(0, 5, 3, 2, 1, Carry::Unconstrained);
        assert_eq!(pmf, Pmf::point(0));
    }

    #[test]
    fn infeasible_counts_yield_empty() {
        let mut cache = MergeCache::new();
        assert!(cache
            .distribution(2, 2, 2, 3, 0, Carry::Unconstrained)
            .is_empty());
        assert!(cache
            .distribution(2, 2, 2, 0, -1, Carry::Unconstrained)
            .is_empty());
    }

    #[test]
    fn perfect_pair_both_selected_merges() {
        // One level over a single pair with both members selected: the pair
        // merges, contributing zero singles.
        let mut cache = MergeCache::new();
        let pmf = cache.distribution(1, 2, 0, 2, 0, Carry::Unconstrained);
        assert_eq!(pmf.max_m(), Some(0));
        assert!((pmf.get(0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn perfect_pair_one_selected_is_single() {
        let mut cache = MergeCache::new();
        let pmf = cache.distribution(1, 2, 0, 1, 0, Carry::Unconstrained);
        assert!((pmf.get(1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn perfect_tree_two_levels() {
        // Height-2 perfect tree, 2 of 4 leaves selected, run as a pure
        // right block. Sibling picks merge then cost one unmerged parent;
        // non-sibling picks cost two bottom singles.
        let mut cache = MergeCache::new();
        let pmf = cache.distribution(2, 0, 4, 0, 2, Carry::Unconstrained);
        assert!((pmf.get(1) - 1.0 / 3.0).abs() < 1e-9);
        assert!((pmf.get(2) - 2.0 / 3.0).abs() < 1e-9);
        assert!((pmf.total_mass() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reachable_states_normalize() {
        // Anchor at the geometries leaf assembly actually produces: a
        // left-filled tree of t slots starts the recursion at level h-1
        // with widths (t - p, 2p - t). Every residual count pair within
        // those widths is a legitimate node selection of a real tree.
        let mut cache = MergeCache::new();
        for t in 2i64..=24 {
            let height = crate::combinatorics::ceil_log2(t);
            let perfect = 1i64 << (height - 1);
            let left = t - perfect;
            let right = perfect - left;
            for picks_left in 0..=left {
                for picks_right in 0..=right {
                    let pmf = cache.distribution(
                        height - 1,
                        left,
                        right,
                        picks_left,
                        picks_right,
                        Carry::Unconstrained,
                    );
                    if !pmf.is_empty() {
                        let mass = pmf.total_mass();
                        assert!(
                            (mass - 1.0).abs() < 1e-9,
                            "t={t} L={left} R={right} kL={picks_left} kR={picks_right}: {mass}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn cache_is_shared_between_queries() {
        let mut cache = MergeCache::new();
        cache.distribution(3, 4, 4, 2, 2, Carry::Unconstrained);
        let populated = cache.len();
        assert!(populated > 0);
        // A second query over the same geometry resolves from the cache.
        cache.distribution(3, 4, 4, 2, 2, Carry::Unconstrained);
        assert_eq!(cache.len(), populated);
    }
}
