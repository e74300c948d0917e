//! Decimation by dropping items.

use core::marker::PhantomData;

use rivulet_core::{Block, BlockDescriptor, BlockError, RelativeRate, StreamItem, WorkIo, WorkResult};

/// Keeps the last item of every group of `n`. Fixed rate `1/n`, no filtering.
///
/// Tag offsets are divided by `n` on the way through.
pub struct KeepOneInN<T: StreamItem> {
    desc: BlockDescriptor,
    n: usize,
    _item: PhantomData<T>,
}

impl<T: StreamItem> KeepOneInN<T> {
    /// Creates a `1/n` decimator.
    ///
    /// # Errors
    ///
    /// [`BlockError::ZeroRate`] for `n == 0`.
    pub fn new(n: usize) -> Result<Self, BlockError> {
        let rate = RelativeRate::decimate(n as u64)?;
        Ok(Self {
            desc: BlockDescriptor::new("keep_one_in_n", &[size_of::<T>()], &[size_of::<T>()])
                .with_fixed_rate(rate),
            n,
            _item: PhantomData,
        })
    }

    /// Renames the block.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.desc = self.desc.with_name(name);
        self
    }

    /// Decimation factor.
    pub fn factor(&self) -> usize {
        self.n
    }
}

impl<T: StreamItem> Block for KeepOneInN<T> {
    fn descriptor(&self) -> &BlockDescriptor {
        &self.desc
    }

    fn general_work(&mut self, noutput_items: usize, io: &mut WorkIo<'_>) -> WorkResult {
        let input = io.input_items::<T>(0);
        let out = io.output_items::<T>(0);
        for (o, group) in out[..noutput_items]
            .iter_mut()
            .zip(input.chunks_exact(self.n))
        {
            *o = group[self.n - 1];
        }
        io.consume(0, noutput_items * self.n);
        WorkResult::Produced(noutput_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::run_chain;
    use crate::{VectorSink, VectorSource};
    use rivulet_core::{Tag, TagValue};

    #[test]
    fn keeps_last_of_each_group() {
        let sink = VectorSink::<i64>::new();
        let handle = sink.handle();
        run_chain(vec![
            Box::new(VectorSource::new((0..10_000i64).collect())),
            Box::new(KeepOneInN::<i64>::new(7).unwrap()),
            Box::new(sink),
        ]);
        let expected: Vec<i64> = (0..10_000 / 7).map(|k| k * 7 + 6).collect();
        assert_eq!(handle.data(), expected);
    }

    #[test]
    fn tag_offsets_scale_down() {
        let source = VectorSource::new(vec![0u8; 400])
            .with_tags(vec![Tag::new(100, "t", TagValue::Bool(true))]);
        let sink = VectorSink::<u8>::new();
        let handle = sink.handle();
        run_chain(vec![
            Box::new(source),
            Box::new(KeepOneInN::<u8>::new(4).unwrap()),
            Box::new(sink),
        ]);
        assert_eq!(handle.len(), 100);
        assert_eq!(handle.tags()[0].offset, 25);
    }

    #[test]
    fn zero_factor_rejected() {
        assert!(KeepOneInN::<f32>::new(0).is_err());
    }
}
