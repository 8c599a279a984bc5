//! SPX parameter set
//!
//! The seven classic SPHINCS+ knobs. Validation mirrors the constraints the
//! cost model assumes; everything downstream takes a validated set.

use serde::Serialize;
use thiserror::Error;

/// Errors raised by [`Params::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamsError {
    /// The hash output length must be positive.
    #[error("hash output length n must be positive")]
    ZeroHashLength,
    /// The Winternitz parameter must be a power of two of at least 2.
    #[error("Winternitz parameter w = {0} must be a power of two ≥ 2")]
    InvalidWinternitz(u32),
    /// The hypertree layer count must divide the total height.
    #[error("hypertree layers d = {d} must satisfy 1 ≤ d ≤ h and d | h (h = {h})")]
    InvalidLayering {
        /// Total hypertree height.
        h: u32,
        /// Requested layer count.
        d: u32,
    },
    /// Each few-time tree needs at least two leaves.
    #[error("leaf count t = {0} must be at least 2")]
    TreeTooSmall(u64),
    /// At least one leaf must be selected per signature.
    #[error("selection count k must be at least 1")]
    ZeroSelections,
    /// The signing-query bound must be positive.
    #[error("query bound q must be at least 1")]
    ZeroQueries,
}

/// SPX parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Params {
    /// Hash output length in bytes.
    pub n: u32,
    /// Winternitz parameter (power of two).
    pub w: u32,
    /// Total hypertree height.
    pub h: u32,
    /// Number of hypertree layers.
    pub d: u32,
    /// Leaf slots per few-time tree.
    pub t: u64,
    /// Leaves selected per signature.
    pub k: u64,
    /// Signing-query bound used for the security estimate.
    pub q: u64,
}

impl Params {
    /// Check the structural constraints the cost formulas assume.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.n == 0 {
            return Err(ParamsError::ZeroHashLength);
        }
        if self.w < 2 || !self.w.is_power_of_two() {
            return Err(ParamsError::InvalidWinternitz(self.w));
        }
        if self.d < 1 || self.d > self.h || self.h % self.d != 0 {
            return Err(ParamsError::InvalidLayering {
                h: self.h,
                d: self.d,
            });
        }
        if self.t < 2 {
            return Err(ParamsError::TreeTooSmall(self.t));
        }
        if self.k < 1 {
            return Err(ParamsError::ZeroSelections);
        }
        if self.q < 1 {
            return Err(ParamsError::ZeroQueries);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Params {
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
    fn accepts_well_formed_set() {
        assert_eq!(base().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_winternitz() {
        let mut p = base();
        p.w = 12;
        assert_eq!(p.validate(), Err(ParamsError::InvalidWinternitz(12)));
        p.w = 1;
        assert_eq!(p.validate(), Err(ParamsError::InvalidWinternitz(1)));
    }

    #[test]
    fn rejects_non_dividing_layers() {
        let mut p = base();
        p.d = 3;
        assert_eq!(
            p.validate(),
            Err(ParamsError::InvalidLayering { h: 8, d: 3 })
        );
        p.d = 0;
        assert!(p.validate().is_err());
        p.d = 9;
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_degenerate_counts() {
        let mut p = base();
        p.t = 1;
        assert_eq!(p.validate(), Err(ParamsError::TreeTooSmall(1)));
        let mut p = base();
        p.k = 0;
        assert_eq!(p.validate(), Err(ParamsError::ZeroSelections));
        let mut p = base();
        p.q = 0;
        assert_eq!(p.validate(), Err(ParamsError::ZeroQueries));
        let mut p = base();
        p.n = 0;
        assert_eq!(p.validate(), Err(ParamsError::ZeroHashLength));
    }
}
