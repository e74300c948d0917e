//! Property-based tests for rivulet-blocks.
//!
//! Checks the FIR decimator against a direct convolution for random taps,
//! decimation factors, input lengths and buffer sizes, and checks that the
//! integer-rate blocks preserve item counts.

use proptest::prelude::*;
use rivulet_blocks::{FirDecimator, KeepOneInN, Repeat, VectorSink, VectorSource};
use rivulet_core::{Block, BufferKind, ExecutorConfig, Scheduler, linear};

/// `y[m] = Σ_j taps[j] · x[m·D − j]`, with zeros before the stream start.
fn reference_fir(taps: &[f32], decimation: usize, x: &[f32]) -> Vec<f32> {
    (0..x.len() / decimation)
        .map(|m| {
            let pos = m * decimation;
            taps.iter()
                .enumerate()
                .filter(|(j, _)| *j <= pos)
                .map(|(j, t)| t * x[pos - j])
                .sum()
        })
        .collect()
}

fn run(blocks: Vec<Box<dyn Block>>, kind: BufferKind, bytes: usize) {
    let mut executors = linear(blocks, kind, bytes, ExecutorConfig::default()).unwrap();
    Scheduler::new().run(&mut executors).unwrap();
}

fn kind_strategy() -> impl Strategy<Value = BufferKind> {
    prop_oneof![Just(BufferKind::Auto), Just(BufferKind::SingleMapped)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Streaming FIR output matches a one-shot convolution regardless of
    /// buffer size and kind.
    #[test]
    fn fir_matches_direct_convolution(
        taps in prop::collection::vec(-1.0f32..1.0, 1..40),
        decimation in 1usize..9,
        input in prop::collection::vec(-1.0f32..1.0, 0..3000),
        bytes in 64usize..16_384,
        kind in kind_strategy(),
    ) {
        let expected = reference_fir(&taps, decimation, &input);
        let sink = VectorSink::<f32>::new();
        let handle = sink.handle();
        run(
            vec![
                Box::new(VectorSource::new(input)),
                Box::new(FirDecimator::new(taps, decimation).unwrap()),
                Box::new(sink),
            ],
            kind,
            bytes,
        );

        let got = handle.data();
        prop_assert_eq!(got.len(), expected.len());
        for (i, (g, e)) in got.iter().zip(&expected).enumerate() {
            prop_assert!((g - e).abs() < 1e-4, "output {}: {} vs {}", i, g, e);
        }
    }

    /// Repeating by N then keeping one in N restores the original stream.
    #[test]
    fn repeat_then_keep_is_identity(
        factor in 1usize..12,
        input in prop::collection::vec(any::<i32>(), 0..2000),
        bytes in 64usize..8192,
    ) {
        let sink = VectorSink::<i32>::new();
        let handle = sink.handle();
        run(
            vec![
                Box::new(VectorSource::new(input.clone())),
                Box::new(Repeat::<i32>::new(factor).unwrap()),
                Box::new(KeepOneInN::<i32>::new(factor).unwrap()),
                Box::new(sink),
            ],
            BufferKind::SingleMapped,
            bytes,
        );
        prop_assert_eq!(handle.data(), input);
    }
}
