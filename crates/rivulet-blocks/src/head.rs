//! Pass-through that stops after a fixed number of items.

use rivulet_core::{Block, BlockDescriptor, WorkIo, WorkResult};

/// Copies the first `limit` items of its input, then finishes.
///
/// Finishing propagates both ways: downstream sees the end of the stream,
/// upstream sees that nobody reads any more.
pub struct Head {
    desc: BlockDescriptor,
    item_size: usize,
    remaining: u64,
}

impl Head {
    /// Passes `limit` items of `item_size` bytes.
    pub fn new(item_size: usize, limit: u64) -> Self {
        Self {
            desc: BlockDescriptor::new("head", &[item_size], &[item_size]),
            item_size,
            remaining: limit,
        }
    }

    /// Renames the block.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.desc = self.desc.with_name(name);
        self
    }

    /// Items still to pass.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Block for Head {
    fn descriptor(&self) -> &BlockDescriptor {
        &self.desc
    }

    fn general_work(&mut self, noutput_items: usize, io: &mut WorkIo<'_>) -> WorkResult {
        if self.remaining == 0 {
            return WorkResult::Done;
        }
        let n = noutput_items.min(self.remaining as usize);
        let bytes = n * self.item_size;
        let input = io.input(0).bytes();
        io.output(0).bytes_mut()[..bytes].copy_from_slice(&input[..bytes]);
        io.consume(0, n);
        io.produce(0, n);

        self.remaining -= n as u64;
        if self.remaining == 0 {
            WorkResult::Done
        } else {
            WorkResult::CalledProduce
        }
    }
}
