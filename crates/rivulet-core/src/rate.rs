//! Exact output/input rate of a block.
//!
//! A block's relative rate is the ratio of output items produced to input
//! items consumed. It is stored as a reduced fraction so fixed-rate blocks can
//! convert item counts without floating-point drift, and so tag offsets can be
//! rescaled exactly.

use crate::error::BlockError;
use crate::math::gcd_u64;

/// Ratio of output items to input items, kept in lowest terms.
///
/// `RelativeRate::new(1, 2)` is a decimate-by-two block; `RelativeRate::new(3, 1)`
/// is an interpolate-by-three block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RelativeRate {
    interpolation: u64,
    decimation: u64,
}

impl RelativeRate {
    /// The 1:1 rate.
    pub const ONE: Self = Self {
        interpolation: 1,
        decimation: 1,
    };

    /// Creates a rate of `interpolation / decimation`, reduced to lowest terms.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError::ZeroRate`] if either term is zero.
    pub fn new(interpolation: u64, decimation: u64) -> Result<Self, BlockError> {
        if interpolation == 0 || decimation == 0 {
            return Err(BlockError::ZeroRate {
                interpolation,
                decimation,
            });
        }
        let g = gcd_u64(interpolation, decimation);
        Ok(Self {
            interpolation: interpolation / g,
            decimation: decimation / g,
        })
    }

    /// A decimate-by-`n` rate (`1/n`).
    pub fn decimate(n: u64) -> Result<Self, BlockError> {
        Self::new(1, n)
    }

    /// An interpolate-by-`n` rate (`n/1`).
    pub fn interpolate(n: u64) -> Result<Self, BlockError> {
        Self::new(n, 1)
    }

    /// Numerator: output items per `decimation()` input items.
    #[inline]
    pub fn interpolation(self) -> u64 {
        self.interpolation
    }

    /// Denominator: input items per `interpolation()` output items.
    #[inline]
    pub fn decimation(self) -> u64 {
        self.decimation
    }

    /// True for the exact 1:1 rate.
    #[inline]
    pub fn is_one(self) -> bool {
        self.interpolation == 1 && self.decimation == 1
    }

    /// The rate as a float, for diagnostics.
    pub fn as_f64(self) -> f64 {
        self.interpolation as f64 / self.decimation as f64
    }

    /// `floor(n × rate)`.
    #[inline]
    pub fn scale_down(self, n: u64) -> u64 {
        ((n as u128 * self.interpolation as u128) / self.decimation as u128) as u64
    }

    /// `ceil(n / rate)`: input items needed to produce `n` outputs.
    #[inline]
    pub fn inverse_ceil(self, n: u64) -> u64 {
        let num = n as u128 * self.decimation as u128;
        num.div_ceil(self.interpolation as u128) as u64
    }

    /// Rescales an absolute stream offset from the input stream's coordinate
    /// system into the output stream's.
    #[inline]
    pub fn rescale_offset(self, offset: u64) -> u64 {
        if self.is_one() {
            offset
        } else {
            self.scale_down(offset)
        }
    }
}

impl Default for RelativeRate {
    fn default() -> Self {
        Self::ONE
    }
}

impl core::fmt::Display for RelativeRate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.interpolation, self.decimation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduces_to_lowest_terms() {
        let r = RelativeRate::new(4, 8).unwrap();
        assert_eq!(r.interpolation(), 1);
        assert_eq!(r.decimation(), 2);
        assert_eq!(r.to_string(), "1/2");
    }

    #[test]
    fn zero_terms_rejected() {
        assert!(RelativeRate::new(0, 3).is_err());
        assert!(RelativeRate::new(3, 0).is_err());
    }

    #[test]
    fn scaling() {
        let half = RelativeRate::decimate(2).unwrap();
        assert_eq!(half.scale_down(101), 50);
        assert_eq!(half.inverse_ceil(50), 100);
        let triple = RelativeRate::interpolate(3).unwrap();
        assert_eq!(triple.scale_down(5), 15);
        assert_eq!(triple.inverse_ceil(16), 6);
        assert_eq!(RelativeRate::ONE.rescale_offset(1234), 1234);
        assert_eq!(half.rescale_offset(1234), 617);
    }
}
