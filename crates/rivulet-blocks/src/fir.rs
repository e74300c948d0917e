//! FIR filter with integer decimation.
//!
//! The block keeps `taps.len() - 1` items of look-back through the input
//! reader's history, so every output is a full dot product with no internal
//! delay line. Output `i` of a call is centred on input `i × decimation`:
//!
//! ```text
//! y[m] = Σ_j taps[j] · x[m·D − j]        (x[n] = 0 for n < 0)
//! ```
//!
//! Reference: R. E. Crochiere and L. R. Rabiner, *Multirate Digital Signal
//! Processing*, Prentice Hall, 1983, Section 3.3.

use core::f32::consts::PI;

use libm::{cosf, fabsf, sinf};
use rivulet_core::{Block, BlockDescriptor, BlockError, RelativeRate, WorkIo, WorkResult};

/// Windowed-sinc lowpass taps with a Blackman window, normalized to unity DC
/// gain.
///
/// `cutoff` is normalized to Nyquist (1.0 = fs/2). For a decimate-by-`D`
/// anti-alias filter use `1.0 / D`.
///
/// ```text
/// h[n] = sinc(cutoff · (n − M/2)) · (0.42 − 0.5·cos(2πn/M) + 0.08·cos(4πn/M))
/// ```
pub fn design_lowpass(num_taps: usize, cutoff: f32) -> Vec<f32> {
    if num_taps == 0 {
        return Vec::new();
    }
    let m = num_taps - 1;
    let mut taps: Vec<f32> = (0..num_taps)
        .map(|n| {
            let x = n as f32 - m as f32 / 2.0;
            let sinc = if fabsf(x) < 1e-7 {
                cutoff
            } else {
                sinf(PI * cutoff * x) / (PI * x)
            };
            let window = if m == 0 {
                1.0
            } else {
                let phase = 2.0 * PI * n as f32 / m as f32;
                0.42 - 0.5 * cosf(phase) + 0.08 * cosf(2.0 * phase)
            };
            sinc * window
        })
        .collect();

    let sum: f32 = taps.iter().sum();
    if fabsf(sum) > 1e-10 {
        for t in &mut taps {
            *t /= sum;
        }
    }
    taps
}

/// f32 FIR filter that keeps one output per `decimation` inputs.
///
/// History equals the tap count; the rate is fixed at `1/decimation`.
///
/// # Example
///
/// ```rust
/// use rivulet_blocks::FirDecimator;
/// use rivulet_core::Block;
///
/// let fir = FirDecimator::lowpass(4, 31)?;
/// assert_eq!(fir.descriptor().history(), 31);
/// assert_eq!(fir.fixed_rate_noutput_to_ninput(10), 40 + 30);
/// # Ok::<(), rivulet_core::BlockError>(())
/// ```
pub struct FirDecimator {
    desc: BlockDescriptor,
    /// Taps in reverse order, so output `i` is a forward dot product with
    /// the window starting at input `i × decimation`.
    reversed: Vec<f32>,
    decimation: usize,
}

impl FirDecimator {
    /// Creates a decimating filter from explicit taps.
    ///
    /// # Errors
    ///
    /// - [`BlockError::ZeroHistory`] for an empty tap set
    /// - [`BlockError::ZeroRate`] for `decimation == 0`
    pub fn new(taps: Vec<f32>, decimation: usize) -> Result<Self, BlockError> {
        let rate = RelativeRate::decimate(decimation as u64)?;
        let desc = BlockDescriptor::new("fir_decimator", &[4], &[4])
            .with_history(taps.len())?
            .with_fixed_rate(rate);
        let mut reversed = taps;
        reversed.reverse();
        Ok(Self {
            desc,
            reversed,
            decimation,
        })
    }

    /// Creates an anti-aliasing lowpass decimator with `num_taps` taps.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn lowpass(decimation: usize, num_taps: usize) -> Result<Self, BlockError> {
        let cutoff = 1.0 / decimation.max(1) as f32;
        Self::new(design_lowpass(num_taps, cutoff), decimation)
    }

    /// Renames the block.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.desc = self.desc.with_name(name);
        self
    }

    /// Filter taps in their natural order.
    pub fn taps(&self) -> Vec<f32> {
        self.reversed.iter().rev().copied().collect()
    }

    /// Decimation factor.
    pub fn decimation(&self) -> usize {
        self.decimation
    }
}

impl Block for FirDecimator {
    fn descriptor(&self) -> &BlockDescriptor {
        &self.desc
    }

    fn general_work(&mut self, noutput_items: usize, io: &mut WorkIo<'_>) -> WorkResult {
        let input = io.input_items::<f32>(0);
        let out = io.output_items::<f32>(0);
        let ntaps = self.reversed.len();
        for (i, y) in out[..noutput_items].iter_mut().enumerate() {
            let start = i * self.decimation;
            *y = input[start..start + ntaps]
                .iter()
                .zip(&self.reversed)
                .map(|(x, t)| x * t)
                .sum();
        }
        io.consume(0, noutput_items * self.decimation);
        WorkResult::Produced(noutput_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::run_chain;
    use crate::{VectorSink, VectorSource};

    fn filter(taps: Vec<f32>, decimation: usize, input: Vec<f32>) -> Vec<f32> {
        let sink = VectorSink::<f32>::new();
        let handle = sink.handle();
        run_chain(vec![
            Box::new(VectorSource::new(input)),
            Box::new(FirDecimator::new(taps, decimation).unwrap()),
            Box::new(sink),
        ]);
        handle.data()
    }

    fn impulse(len: usize) -> Vec<f32> {
        let mut v = vec![0.0; len];
        v[0] = 1.0;
        v
    }

    #[test]
    fn impulse_response_is_taps() {
        let out = filter(vec![1.0, 2.0, 3.0], 1, impulse(8));
        assert_eq!(out, vec![1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn decimated_impulse_response() {
        let out = filter(vec![1.0, 2.0, 3.0], 2, impulse(8));
        assert_eq!(out, vec![1.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn moving_average_settles_on_constant_input() {
        let out = filter(vec![0.25; 4], 4, vec![1.0; 4000]);
        assert_eq!(out.len(), 1000);
        assert!((out[0] - 0.25).abs() < 1e-6);
        assert!(out[1..].iter().all(|&y| (y - 1.0).abs() < 1e-6));
    }

    #[test]
    fn lowpass_design_is_symmetric_with_unity_dc_gain() {
        let taps = design_lowpass(31, 0.25);
        assert_eq!(taps.len(), 31);
        let sum: f32 = taps.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for k in 0..15 {
            assert!((taps[k] - taps[30 - k]).abs() < 1e-6);
        }
        assert!(taps[15] > taps[0]);
    }

    #[test]
    fn taps_round_trip_and_errors() {
        let fir = FirDecimator::new(vec![0.5, 0.25], 3).unwrap();
        assert_eq!(fir.taps(), vec![0.5, 0.25]);
        assert_eq!(fir.decimation(), 3);
        assert_eq!(
            FirDecimator::new(Vec::new(), 2).err(),
            Some(BlockError::ZeroHistory)
        );
        assert!(FirDecimator::new(vec![1.0], 0).is_err());
        assert!(design_lowpass(0, 0.5).is_empty());
    }
}
