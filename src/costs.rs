//! Closed-form SPX cost model
//!
//! Hash-call counts and signature sizes for the baseline construction (FORS
//! few-time subcomponent) and the FP variant (grinding-bounded PORS
//! subcomponent), plus attack-probability security estimates for both.
//! Everything here is O(1) arithmetic over a validated [`Params`] set; the
//! only non-trivial input is the grinding work figure supplied by the cost
//! table.

use std::f64::consts::LN_2;

use crate::combinatorics::{ceil_log2, log2_binomial};
use crate::params::Params;

/// Number of WOTS+ chains for an `n`-byte hash under Winternitz
/// parameter `w` (`len1` message chains plus `len2` checksum chains).
pub fn wots_len(n: u32, w: u32) -> u32 {
    let lg_w = (w as f64).log2();
    let len1 = ((8 * n) as f64 / lg_w).ceil() as u32;
    let len2 = (((len1 * (w - 1)) as f64).log2() / lg_w).floor() as u32 + 1;
    len1 + len2
}

fn merkle_height(p: &Params) -> u32 {
    p.h / p.d
}

/// Baseline signing cost in hash calls: hypertree plus full FORS key
/// generation and authentication.
pub fn baseline_signing_calls(p: &Params) -> f64 {
    let len = wots_len(p.n, p.w) as f64;
    let node_tree = (merkle_height(p) as f64).exp2();
    let cost_wots = 1.0 + len * p.w as f64;
    let cost_hypertree = p.d as f64 * ((cost_wots + 1.0) * node_tree - 1.0);
    let cost_fors = p.k as f64 * (3.0 * p.t as f64 - 1.0);
    3.0 + cost_hypertree + cost_fors
}

/// Baseline verification cost in hash calls.
pub fn baseline_verification_calls(p: &Params) -> f64 {
    let len = wots_len(p.n, p.w) as f64;
    let cost_wots = 1.0 + len * p.w as f64 / 2.0;
    let cost_hypertree = p.d as f64 * (cost_wots + merkle_height(p) as f64);
    let cost_fors = p.k as f64 * (ceil_log2(p.t as i64) as f64 + 1.0);
    2.0 + cost_hypertree + cost_fors
}

/// Baseline signature size in bytes.
pub fn baseline_signature_size(p: &Params) -> u64 {
    let len = wots_len(p.n, p.w) as u64;
    let elements = 1
        + p.d as u64 * (len + merkle_height(p) as u64)
        + p.k * (ceil_log2(p.t as i64) as u64 + 1);
    elements * p.n as u64
}

/// FP-variant signing cost in hash calls. `add_work` is the expected extra
/// grinding work, `2^log2Ework - 1`, taken from the cost table.
pub fn fp_signing_calls(p: &Params, add_work: f64) -> f64 {
    let len = wots_len(p.n, p.w) as f64;
    let node_tree = (merkle_height(p) as f64).exp2();
    let cost_wots = 1.0 + len * p.w as f64;
    let cost_hypertree = p.d as f64 * ((cost_wots + 1.0) * node_tree - 1.0);
    let cost_pors = 3.0 * p.k as f64 * p.t as f64 - 1.0 + add_work;
    3.0 + cost_hypertree + cost_pors
}

/// FP-variant verification cost in hash calls for a given threshold.
pub fn fp_verification_calls(p: &Params, m_max: u32) -> f64 {
    let len = wots_len(p.n, p.w) as f64;
    let cost_wots = 1.0 + len * p.w as f64 / 2.0;
    let cost_hypertree = p.d as f64 * (cost_wots + merkle_height(p) as f64);
    let cost_pors = 2.0 * p.k as f64 + m_max as f64;
    2.0 + cost_hypertree + cost_pors
}

/// FP-variant signature size in bytes: at most `k + m_max` hash elements
/// for the few-time part, plus a 4-byte grinding counter.
pub fn fp_signature_size(p: &Params, m_max: u32) -> u64 {
    let len = wots_len(p.n, p.w) as u64;
    let elements = 1 + p.d as u64 * (len + merkle_height(p) as u64) + p.k + m_max as u64;
    elements * p.n as u64 + 4
}

/// Baseline security estimate in bits against `q` adaptive signing queries:
/// `-log2 Σ_i C(q,i) (1 - 2^-h)^(q-i) 2^(-hi) (1 - (1 - 1/t)^i)^k`.
///
/// The tail sum is truncated at `i = 199`; terms beyond that are negligible
/// for any practical `q`. The summation runs in log2 space over exact
/// binomials, so no intermediate probability ever underflows.
pub fn baseline_security_bits(p: &Params) -> f64 {
    let log2_forge = |i: i64| {
        // log2((1 - (1 - 1/t)^i)^k); the inner difference is computed as
        // -expm1(i ln(1 - 1/t)) to stay well-conditioned for large t.
        let x = i as f64 * (-1.0 / p.t as f64).ln_1p();
        p.k as f64 * (-x.exp_m1()).ln() / LN_2
    };
    security_bits_with(p, log2_forge)
}

/// FP-variant security estimate in bits: the forgery term becomes the
/// subset-cover ratio `C(min(tk, ki), k) / C(tk, k)`.
pub fn fp_security_bits(p: &Params) -> f64 {
    let population = (p.t * p.k) as i64;
    let picks = p.k as i64;
    let log2_den = log2_binomial(population, picks);
    let log2_forge = |i: i64| {
        let reachable = population.min(picks * i);
        log2_binomial(reachable, picks) - log2_den
    };
    security_bits_with(p, log2_forge)
}

/// Shared tail sum; `log2_forge(i)` is the full log2 forgery probability
/// conditioned on `i` subtree hits.
fn security_bits_with(p: &Params, log2_forge: impl Fn(i64) -> f64) -> f64 {
    // log2(1 - 2^-h): vanishes entirely once 2^-h is below f64 resolution.
    let log2_miss = (-(-(p.h as f64)).exp2()).ln_1p() / LN_2;
    let q = p.q as i64;

    let mut acc = f64::NEG_INFINITY;
    for i in 1..200i64 {
        let log2_choose = log2_binomial(q, i);
        if log2_choose == f64::NEG_INFINITY {
            continue;
        }
        let term = log2_choose + (q - i) as f64 * log2_miss - i as f64 * p.h as f64
            + log2_forge(i);
        acc = log2_sum(acc, term);
    }
    -acc
}

/// `log2(2^a + 2^b)` without leaving log space.
fn log2_sum(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp2().ln_1p() / LN_2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphincs_128s() -> Params {
        Params {
            n: 16,
            w: 16,
            h: 63,
            d: 7,
            t: 1 << 12,
            k: 14,
            q: 1 << 60,
        }
    }

    #[test]
    fn wots_len_matches_sphincs_constants() {
        assert_eq!(wots_len(16, 16), 35);
        assert_eq!(wots_len(24, 16), 51);
        assert_eq!(wots_len(32, 16), 67);
    }

    #[test]
    fn baseline_size_matches_sphincs_128s() {
        // Published SLH-DSA-128s signature size.
        assert_eq!(baseline_signature_size(&sphincs_128s()), 7856);
    }

    #[test]
    fn fp_size_tracks_threshold() {
        let p = sphincs_128s();
        let at_zero = fp_signature_size(&p, 0);
        let at_ten = fp_signature_size(&p, 10);
        assert_eq!(at_ten - at_zero, 10 * p.n as u64);
        // Counter bytes are threshold-independent.
        assert_eq!(at_zero % p.n as u64, 4);
    }

    #[test]
    fn grinding_work_adds_linearly_to_signing() {
        let p = sphincs_128s();
        let idle = fp_signing_calls(&p, 0.0);
        let busy = fp_signing_calls(&p, 1000.0);
        assert!((busy - idle - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn security_bits_decrease_with_more_queries() {
        let mut p = sphincs_128s();
        p.q = 1 << 20;
        let few = baseline_security_bits(&p);
        p.q = 1 << 40;
        let many = baseline_security_bits(&p);
        assert!(few.is_finite() && many.is_finite());
        assert!(few > many);
    }

    #[test]
    fn security_bits_are_plausible() {
        let p = sphincs_128s();
        let baseline = baseline_security_bits(&p);
        let fp = fp_security_bits(&p);
        assert!(baseline > 64.0 && baseline < 512.0, "baseline={baseline}");
        assert!(fp > 64.0 && fp < 512.0, "fp={fp}");
    }

    #[test]
    fn log2_sum_agrees_with_direct_addition() {
        let direct = (0.375f64 + 0.125).log2();
        let summed = log2_sum(0.375f64.log2(), 0.125f64.log2());
        assert!((direct - summed).abs() < 1e-12);
        assert_eq!(log2_sum(f64::NEG_INFINITY, 3.0), 3.0);
    }
}
