//! Element-wise sum of several streams.

use core::marker::PhantomData;
use core::ops::Add;

use rivulet_core::{Block, BlockDescriptor, RelativeRate, StreamItem, WorkIo, WorkResult};

/// Sums `ninputs` streams item by item into one output.
///
/// Every input advances in lockstep; the block runs as fast as its slowest
/// input allows.
pub struct AddBlock<T: StreamItem + Add<Output = T>> {
    desc: BlockDescriptor,
    _item: PhantomData<T>,
}

impl<T: StreamItem + Add<Output = T>> AddBlock<T> {
    /// Creates an adder with `ninputs` inputs.
    pub fn new(ninputs: usize) -> Self {
        let size = size_of::<T>();
        Self {
            desc: BlockDescriptor::new("add", &vec![size; ninputs], &[size])
                .with_fixed_rate(RelativeRate::ONE),
            _item: PhantomData,
        }
    }

    /// Renames the block.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.desc = self.desc.with_name(name);
        self
    }
}

impl<T: StreamItem + Add<Output = T>> Block for AddBlock<T> {
    fn descriptor(&self) -> &BlockDescriptor {
        &self.desc
    }

    fn general_work(&mut self, noutput_items: usize, io: &mut WorkIo<'_>) -> WorkResult {
        let inputs: Vec<&[T]> = (0..io.ninputs()).map(|i| io.input_items::<T>(i)).collect();
        let out = io.output_items::<T>(0);
        out[..noutput_items].copy_from_slice(&inputs[0][..noutput_items]);
        for input in &inputs[1..] {
            for (o, &x) in out[..noutput_items].iter_mut().zip(input.iter()) {
                *o = *o + x;
            }
        }
        io.consume_each(noutput_items);
        WorkResult::Produced(noutput_items)
    }

    fn check_topology(&self, ninputs: usize, noutputs: usize) -> bool {
        ninputs >= 1 && noutputs == 1
    }
}
