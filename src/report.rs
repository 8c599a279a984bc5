//! Report assembly over the cost table
//!
//! Builds the user-facing trade-off views: a one-shot report for a chosen
//! threshold, a sweep over every supported threshold, and two selectors that
//! scan the table against a signing-cost cap or a signature-size target.
//!
//! The table is always built with population `k·t` and selection count `k`.
//! That is the contract the size and cost formulas are calibrated against
//! (the few-time part spans `k` trees of `t` slots whose grinding statistic
//! is evaluated jointly), so it is preserved here verbatim.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::costs;
use crate::distribution::{cost_table_with_cache, CostEntry, MergeCache};
use crate::params::{Params, ParamsError};

/// Errors raised during report assembly.
#[derive(Debug, Error, PartialEq)]
pub enum ReportError {
    /// The parameter set failed structural validation.
    #[error(transparent)]
    InvalidParams(#[from] ParamsError),
    /// No threshold has positive success probability for these parameters.
    #[error("no feasible threshold for population {population} with {picks} selections")]
    EmptyCostTable {
        /// Population the table was built over (`k·t`).
        population: i64,
        /// Selection count.
        picks: i64,
    },
    /// The requested threshold lies below everything the table supports.
    #[error("m_max = {requested} is below the smallest supported threshold {smallest}")]
    ThresholdBelowRange {
        /// Threshold the caller asked for.
        requested: u32,
        /// Smallest threshold with positive probability.
        smallest: u32,
    },
}

/// Cost metrics of the FP variant at one threshold, with deltas against the
/// baseline construction.
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdMetrics {
    /// Threshold on the singles statistic.
    pub m_max: u32,
    /// `log2` of the expected grinding trials at this threshold.
    pub log2_ework: f64,
    /// Expected grinding trials, linear scale.
    pub expected_trials: f64,
    /// FP signing cost in hash calls.
    pub fp_signing_calls: f64,
    /// Signing-cost change versus the baseline, in percent.
    pub signing_delta_pct: f64,
    /// FP verification cost in hash calls.
    pub fp_verification_calls: f64,
    /// Verification-cost change versus the baseline, in percent.
    pub verification_delta_pct: f64,
    /// FP signature size in bytes.
    pub fp_signature_size_bytes: u64,
    /// Size change versus the baseline, in percent.
    pub signature_size_delta_pct: f64,
}

/// One-shot report for a requested threshold.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Metrics at the effective threshold (after any fallback).
    #[serde(flatten)]
    pub metrics: ThresholdMetrics,
    /// FP security estimate in bits.
    pub security_bits: f64,
}

/// Sweep over every supported threshold.
#[derive(Debug, Clone, Serialize)]
pub struct Sweep {
    /// FP security estimate in bits (threshold-independent).
    pub security_bits: f64,
    /// Per-threshold metrics, ascending in `m_max`.
    pub rows: Vec<ThresholdMetrics>,
}

/// Outcome of a table scan against a caller constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStatus {
    /// The constraint was met.
    Ok,
    /// No threshold met the signing cap; the largest `m_max` (cheapest
    /// signing) was chosen instead.
    CapInfeasibleLargestUsed,
    /// No threshold met the size target; the smallest `m_max` (smallest
    /// signature) was chosen instead.
    TargetInfeasibleSmallestUsed,
}

/// Threshold picked by a selector, with the constraint outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    /// Whether the constraint was met or a fallback extremum was used.
    pub status: SelectionStatus,
    /// Metrics at the selected threshold.
    #[serde(flatten)]
    pub metrics: ThresholdMetrics,
    /// FP security estimate in bits.
    pub security_bits: f64,
}

/// Threshold picked by the size-target selector, with the target context.
#[derive(Debug, Clone, Serialize)]
pub struct SizeSelection {
    /// Whether the target was met or the minimal threshold was used.
    pub status: SelectionStatus,
    /// Requested size decrease, percent of the baseline size.
    pub requested_size_decrease_pct: f64,
    /// Baseline signature size in bytes.
    pub baseline_signature_size_bytes: u64,
    /// Size the baseline must shrink to, in bytes.
    pub target_signature_size_bytes: u64,
    /// Metrics at the selected threshold.
    #[serde(flatten)]
    pub metrics: ThresholdMetrics,
    /// FP security estimate in bits.
    pub security_bits: f64,
}

/// Baseline cost figures shared by every row of a report.
#[derive(Debug, Clone, Copy)]
struct Baseline {
    signing: f64,
    verification: f64,
    size: u64,
}

impl Baseline {
    fn of(p: &Params) -> Self {
        Self {
            signing: costs::baseline_signing_calls(p),
            verification: costs::baseline_verification_calls(p),
            size: costs::baseline_signature_size(p),
        }
    }
}

fn pct_delta(new: f64, base: f64) -> f64 {
    if base == 0.0 {
        f64::INFINITY
    } else {
        100.0 * (new - base) / base
    }
}

fn metrics_at(p: &Params, baseline: &Baseline, m_max: u32, log2_ework: f64) -> ThresholdMetrics {
    let add_work = log2_ework.exp2() - 1.0;
    let fp_signing = costs::fp_signing_calls(p, add_work);
    let fp_verification = costs::fp_verification_calls(p, m_max);
    let fp_size = costs::fp_signature_size(p, m_max);
    ThresholdMetrics {
        m_max,
        log2_ework,
        expected_trials: log2_ework.exp2(),
        fp_signing_calls: fp_signing,
        signing_delta_pct: pct_delta(fp_signing, baseline.signing),
        fp_verification_calls: fp_verification,
        verification_delta_pct: pct_delta(fp_verification, baseline.verification),
        fp_signature_size_bytes: fp_size,
        signature_size_delta_pct: pct_delta(fp_size as f64, baseline.size as f64),
    }
}

/// Build the cost table under the report contract: population `k·t`,
/// selection count `k`.
fn grinding_table(p: &Params) -> Result<Vec<CostEntry>, ReportError> {
    let population = (p.k * p.t) as i64;
    let picks = p.k as i64;
    let mut cache = MergeCache::new();
    let table = cost_table_with_cache(population, picks, &mut cache);
    debug!(
        population,
        picks,
        entries = table.len(),
        states = cache.len(),
        "grinding cost table built"
    );
    if table.is_empty() {
        return Err(ReportError::EmptyCostTable { population, picks });
    }
    Ok(table)
}

/// Resolve the work figure for a requested threshold: exact match, else the
/// nearest smaller supported threshold. Below the smallest entry no
/// distribution mass exists, no work figure is defined, and resolution is a
/// hard error.
fn resolve_threshold(table: &[CostEntry], requested: u32) -> Result<CostEntry, ReportError> {
    table
        .iter()
        .rev()
        .find(|entry| entry.m_max <= requested)
        .copied()
        .ok_or(ReportError::ThresholdBelowRange {
            requested,
            smallest: table[0].m_max,
        })
}

/// Metrics for one requested threshold (feature: one-shot report).
///
/// A request above the table's largest entry is honored as stated: the
/// verification and size figures are computed at the requested threshold,
/// while the grinding work comes from the nearest supported entry below it
/// (looser thresholds cannot cost more work than the loosest tabulated one).
pub fn report(p: &Params, m_max: u32) -> Result<Report, ReportError> {
    p.validate()?;
    let table = grinding_table(p)?;
    let work = resolve_threshold(&table, m_max)?;
    let baseline = Baseline::of(p);
    Ok(Report {
        metrics: metrics_at(p, &baseline, m_max, work.log2_expected_trials),
        security_bits: costs::fp_security_bits(p),
    })
}

/// Metrics for every supported threshold (feature: sweep).
pub fn sweep(p: &Params) -> Result<Sweep, ReportError> {
    p.validate()?;
    let table = grinding_table(p)?;
    let baseline = Baseline::of(p);
    Ok(Sweep {
        security_bits: costs::fp_security_bits(p),
        rows: table
            .iter()
            .map(|&entry| metrics_at(p, &baseline, entry.m_max, entry.log2_expected_trials))
            .collect(),
    })
}

/// Pick the smallest threshold whose signing-cost increase stays within
/// `cap_pct` percent of the baseline; fall back to the largest threshold
/// (the signing optimum) when the cap is infeasible.
pub fn choose_by_signing_cap(p: &Params, cap_pct: f64) -> Result<Selection, ReportError> {
    p.validate()?;
    let table = grinding_table(p)?;
    let baseline = Baseline::of(p);

    for &entry in &table {
        let metrics = metrics_at(p, &baseline, entry.m_max, entry.log2_expected_trials);
        if metrics.signing_delta_pct <= cap_pct + 1e-12 {
            return Ok(Selection {
                status: SelectionStatus::Ok,
                metrics,
                security_bits: costs::fp_security_bits(p),
            });
        }
    }

    // Larger thresholds only shrink the grinding work, so the last entry is
    // the signing-cheapest fallback.
    let Some(&last) = table.last() else {
        return Err(ReportError::EmptyCostTable {
            population: (p.k * p.t) as i64,
            picks: p.k as i64,
        });
    };
    Ok(Selection {
        status: SelectionStatus::CapInfeasibleLargestUsed,
        metrics: metrics_at(p, &baseline, last.m_max, last.log2_expected_trials),
        security_bits: costs::fp_security_bits(p),
    })
}

/// Pick the largest threshold whose FP signature size undercuts the
/// baseline by at least `size_decrease_pct` percent; fall back to the
/// smallest threshold (the size optimum) when the target is infeasible.
pub fn choose_by_size_target(p: &Params, size_decrease_pct: f64) -> Result<SizeSelection, ReportError> {
    p.validate()?;
    let table = grinding_table(p)?;
    let baseline = Baseline::of(p);
    let target = baseline.size as f64 * (1.0 - size_decrease_pct / 100.0);

    let chosen = table
        .iter()
        .rev()
        .find(|entry| costs::fp_signature_size(p, entry.m_max) as f64 <= target + 1e-9)
        .copied();

    let (status, entry) = match chosen {
        Some(entry) => (SelectionStatus::Ok, entry),
        None => (SelectionStatus::TargetInfeasibleSmallestUsed, table[0]),
    };

    Ok(SizeSelection {
        status,
        requested_size_decrease_pct: size_decrease_pct,
        baseline_signature_size_bytes: baseline.size,
        target_signature_size_bytes: target as u64,
        metrics: metrics_at(p, &baseline, entry.m_max, entry.log2_expected_trials),
        security_bits: costs::fp_security_bits(p),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Params {
        Params {
            n: 16,
            w: 16,
            h: 8,
            d: 4,
            t: 16,
            k: 4,
            q: 64,
        }
    }

    #[test]
    fn resolve_prefers_exact_match() {
        let table = vec![
            CostEntry {
                m_max: 3,
                log2_expected_trials: 2.0,
            },
            CostEntry {
                m_max: 5,
                log2_expected_trials: 0.0,
            },
        ];
        assert_eq!(resolve_threshold(&table, 5).unwrap().m_max, 5);
        // Between entries: nearest smaller.
        assert_eq!(resolve_threshold(&table, 4).unwrap().m_max, 3);
        // Above the table: largest entry.
        assert_eq!(resolve_threshold(&table, 9).unwrap().m_max, 5);
        // Below everything: hard error.
        assert_eq!(
            resolve_threshold(&table, 2),
            Err(ReportError::ThresholdBelowRange {
                requested: 2,
                smallest: 3
            })
        );
    }

    #[test]
    fn report_rejects_invalid_params() {
        let mut p = small();
        p.w = 3;
        assert!(matches!(
            report(&p, 4),
            Err(ReportError::InvalidParams(_))
        ));
    }

    #[test]
    fn sweep_rows_cover_the_table() {
        let p = small();
        let swept = sweep(&p).unwrap();
        assert!(!swept.rows.is_empty());
        for pair in swept.rows.windows(2) {
            assert!(pair[0].m_max < pair[1].m_max);
            assert!(pair[0].log2_ework >= pair[1].log2_ework - 1e-12);
        }
        // The most permissive threshold needs a single expected trial.
        let last = swept.rows.last().unwrap();
        assert!((last.expected_trials - 1.0).abs() < 1e-9);
        assert!(swept.security_bits.is_finite());
    }

    #[test]
    fn percent_deltas_are_against_baseline() {
        let p = small();
        let swept = sweep(&p).unwrap();
        let baseline = Baseline::of(&p);
        let row = swept.rows.last().unwrap();
        let expected =
            100.0 * (row.fp_signing_calls - baseline.signing) / baseline.signing;
        assert!((row.signing_delta_pct - expected).abs() < 1e-9);
    }
}
