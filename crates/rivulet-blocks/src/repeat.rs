//! Interpolation by repetition.

use core::marker::PhantomData;

use rivulet_core::{Block, BlockDescriptor, BlockError, RelativeRate, StreamItem, WorkIo, WorkResult};

/// Emits every input item `factor` times. Fixed rate `factor/1`, output
/// multiple `factor`.
pub struct Repeat<T: StreamItem> {
    desc: BlockDescriptor,
    factor: usize,
    _item: PhantomData<T>,
}

impl<T: StreamItem> Repeat<T> {
    /// Creates a block repeating each item `factor` times.
    ///
    /// # Errors
    ///
    /// [`BlockError::ZeroRate`] for `factor == 0`.
    pub fn new(factor: usize) -> Result<Self, BlockError> {
        let rate = RelativeRate::interpolate(factor as u64)?;
        let desc = BlockDescriptor::new("repeat", &[size_of::<T>()], &[size_of::<T>()])
            .with_fixed_rate(rate)
            .with_output_multiple(factor)?;
        Ok(Self {
            desc,
            factor,
            _item: PhantomData,
        })
    }

    /// Renames the block.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.desc = self.desc.with_name(name);
        self
    }

    /// Repetition count.
    pub fn factor(&self) -> usize {
        self.factor
    }
}

impl<T: StreamItem> Block for Repeat<T> {
    fn descriptor(&self) -> &BlockDescriptor {
        &self.desc
    }

    fn general_work(&mut self, noutput_items: usize, io: &mut WorkIo<'_>) -> WorkResult {
        let ninput = noutput_items / self.factor;
        let input = io.input_items::<T>(0);
        let out = io.output_items::<T>(0);
        for (group, &item) in out[..ninput * self.factor]
            .chunks_exact_mut(self.factor)
            .zip(&input[..ninput])
        {
            group.fill(item);
        }
        io.consume(0, ninput);
        WorkResult::Produced(ninput * self.factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::run_chain;
    use crate::{VectorSink, VectorSource};
    use rivulet_core::{Tag, TagValue};

    #[test]
    fn repeats_each_item() {
        let sink = VectorSink::<u32>::new();
        let handle = sink.handle();
        run_chain(vec![
            Box::new(VectorSource::new((0..1500u32).collect())),
            Box::new(Repeat::<u32>::new(3).unwrap()),
            Box::new(sink),
        ]);
        let expected: Vec<u32> = (0..1500u32).flat_map(|i| [i, i, i]).collect();
        assert_eq!(handle.data(), expected);
    }

    #[test]
    fn tag_offsets_scale_up() {
        let source = VectorSource::new(vec![1.0f64; 50])
            .with_tags(vec![Tag::new(20, "x", TagValue::Float(0.5))]);
        let sink = VectorSink::<f64>::new();
        let handle = sink.handle();
        run_chain(vec![
            Box::new(source),
            Box::new(Repeat::<f64>::new(5).unwrap()),
            Box::new(sink),
        ]);
        assert_eq!(handle.len(), 250);
        assert_eq!(handle.tags()[0].offset, 100);
    }

    #[test]
    fn output_multiple_matches_factor() {
        let block = Repeat::<i16>::new(4).unwrap();
        assert_eq!(block.descriptor().output_multiple(), 4);
        assert_eq!(block.fixed_rate_ninput_to_noutput(10), 40);
    }
}
