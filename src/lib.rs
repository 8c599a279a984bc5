//! # SPX-FP cost estimator
//!
//! Estimates the cost/size/security trade-offs of an SLH-DSA/SPHINCS+-style
//! hash-based signature in which the fixed-cost FORS few-time subcomponent
//! is replaced by a grinding-bounded PORS subcomponent: the signer retries
//! message hashing until the selected leaves need at most `m_max`
//! authentication hashes.
//!
//! ## Core engine
//!
//! The heart of the crate is exact: for a tournament tree of `t` leaf slots
//! with `k` uniform selections, [`distribution`] computes the full
//! probability distribution of the singles statistic `M` (authentication
//! hashes left unmerged as the tree collapses) via a memoized recursion
//! over a binary-tree decomposition with a three-valued boundary carry,
//! then inverts its CDF in log2 space into a table of
//! `(m_max, log2 expected trials)` pairs.
//!
//! ## Surrounding model
//!
//! [`costs`] holds the closed-form hash-call and size formulas for the
//! baseline and FP constructions plus security-bit estimates; [`report`]
//! assembles them into JSON-serializable reports, sweeps, and
//! constraint-driven threshold selectors. The `spx-fp` binary exposes all
//! of it on the command line.
//!
//! ```
//! use spx_fp::distribution::cost_table;
//!
//! // Two picks over a perfect four-slot tree: M = 1 with probability 1/3.
//! let table = cost_table(4, 2);
//! assert_eq!(table[0].m_max, 1);
//! assert!((table[0].log2_expected_trials - 3f64.log2()).abs() < 1e-9);
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod combinatorics;
pub mod costs;
pub mod distribution;
pub mod params;
pub mod report;

pub use distribution::{cost_table, singles_distribution, CostEntry, MergeCache, Pmf};
pub use params::{Params, ParamsError};
pub use report::{
    choose_by_signing_cap, choose_by_size_target, report, sweep, Report, ReportError, Selection,
    SelectionStatus, SizeSelection, Sweep, ThresholdMetrics,
};
