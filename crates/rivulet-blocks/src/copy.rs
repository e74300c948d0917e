//! 1:1 byte copy.

use rivulet_core::{Block, BlockDescriptor, RelativeRate, WorkIo, WorkResult};

/// Copies input to output unchanged. Tags pass through all-to-all.
///
/// While disabled the block still drains its input but produces nothing,
/// which turns it into a valve in a running chain.
pub struct CopyBlock {
    desc: BlockDescriptor,
    item_size: usize,
    enabled: bool,
}

impl CopyBlock {
    /// Creates an enabled copy block for `item_size`-byte items.
    pub fn new(item_size: usize) -> Self {
        Self {
            desc: BlockDescriptor::new("copy", &[item_size], &[item_size])
                .with_fixed_rate(RelativeRate::ONE),
            item_size,
            enabled: true,
        }
    }

    /// Renames the block.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.desc = self.desc.with_name(name);
        self
    }

    /// Enables or disables output.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// True while copying.
    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

impl Block for CopyBlock {
    fn descriptor(&self) -> &BlockDescriptor {
        &self.desc
    }

    fn general_work(&mut self, noutput_items: usize, io: &mut WorkIo<'_>) -> WorkResult {
        io.consume(0, noutput_items);
        if !self.enabled {
            return WorkResult::Produced(0);
        }
        let bytes = noutput_items * self.item_size;
        let input = io.input(0).bytes();
        io.output(0).bytes_mut()[..bytes].copy_from_slice(&input[..bytes]);
        WorkResult::Produced(noutput_items)
    }
}
