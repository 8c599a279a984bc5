//! Exact combinatorial primitives
//!
//! Binomial coefficients are kept as arbitrary-precision integers and only
//! collapsed to `f64` at the moment a probability ratio is formed. For the
//! population sizes this crate handles (`t·k` in the millions), `C(n, k)`
//! routinely exceeds `u128` and even the `f64` exponent range, so quotients
//! are taken with explicit exponent tracking.

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

/// Exact binomial coefficient `C(n, k)`.
///
/// Out-of-range arguments (`n < 0`, `k < 0`, `k > n`) yield zero rather than
/// an error, so weighted sums over invalid index ranges vanish naturally
/// without bounds checks at every call site.
pub fn binomial(n: i64, k: i64) -> BigUint {
    if n < 0 || k < 0 || k > n {
        return BigUint::zero();
    }
    let k = k.min(n - k) as u64;
    let n = n as u64;
    let mut acc = BigUint::one();
    // Multiplicative form; each partial product is an exact integer.
    for i in 0..k {
        acc *= n - i;
        acc /= i + 1;
    }
    acc
}

/// Quotient of two big integers as `f64`.
///
/// Both operands are truncated to their top 64 bits and the dropped shifts
/// are reapplied as a power-of-two scale, so ratios of numbers far beyond
/// `f64::MAX` still come out correct to within one ulp of the 53-bit
/// mantissa. Underflow to subnormal or zero follows IEEE semantics, which is
/// the behavior the cost table relies on for vanishing tail probabilities.
pub fn ratio(num: &BigUint, den: &BigUint) -> f64 {
    if den.is_zero() || num.is_zero() {
        return 0.0;
    }
    let num_shift = num.bits().saturating_sub(64);
    let den_shift = den.bits().saturating_sub(64);
    let n = (num >> num_shift).to_f64().unwrap_or(0.0);
    let d = (den >> den_shift).to_f64().unwrap_or(0.0);
    (n / d) * (num_shift as f64 - den_shift as f64).exp2()
}

/// Base-2 logarithm of a big integer; `-inf` for zero.
pub fn log2_big(value: &BigUint) -> f64 {
    if value.is_zero() {
        return f64::NEG_INFINITY;
    }
    let shift = value.bits().saturating_sub(64);
    let top = (value >> shift).to_f64().unwrap_or(0.0);
    top.log2() + shift as f64
}

/// `log2 C(n, k)`, or `-inf` when the coefficient is zero.
pub fn log2_binomial(n: i64, k: i64) -> f64 {
    log2_big(&binomial(n, k))
}

/// `ceil(log2 t)` for `t ≥ 1`, as used for tree heights and auth-path depths.
pub fn ceil_log2(t: i64) -> u32 {
    debug_assert!(t >= 1);
    if t <= 1 {
        0
    } else {
        64 - ((t - 1) as u64).leading_zeros()
    }
}

/// Pair-merge law.
///
/// Probability that selecting `j` of `x` elements uniformly without
/// replacement, where the `x` elements form `x/2` disjoint sibling pairs,
/// yields exactly `s` pairs with both members selected:
///
/// ```text
/// P(x, j, s) = C(x/2, j-s) · C(j-s, s) · 2^(j-2s) / C(x, j)
/// ```
///
/// Valid only for even `x`, `0 ≤ s`, `2s ≤ j ≤ x`; any violation (including
/// a zero denominator) yields probability zero. This is the law governing
/// one level of tree collapse: `j` selected children under `x/2` parents
/// become `s` merged pairs and `j - 2s` unmerged singles.
pub fn pair_merge_probability(x: i64, j: i64, s: i64) -> f64 {
    if x % 2 != 0 || j < 0 || s < 0 || j > x || 2 * s > j {
        return 0.0;
    }
    let den = binomial(x, j);
    if den.is_zero() {
        return 0.0;
    }
    let num = binomial(x / 2, j - s) * binomial(j - s, s) << (j - 2 * s) as u64;
    ratio(&num, &den)
}
