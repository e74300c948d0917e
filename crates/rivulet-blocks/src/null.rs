//! Null source and sink.
//!
//! Both work on raw bytes of any item size, so they fit any stream type.
//! [`NullSource`] never finishes on its own; bound it with a
//! [`Head`](crate::Head) or let downstream completion stop it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rivulet_core::{Block, BlockDescriptor, WorkIo, WorkResult};

/// Source of zero-valued items.
pub struct NullSource {
    desc: BlockDescriptor,
}

impl NullSource {
    /// Creates a source of `item_size`-byte zeros.
    pub fn new(item_size: usize) -> Self {
        Self {
            desc: BlockDescriptor::new("null_source", &[], &[item_size]),
        }
    }

    /// Renames the block.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.desc = self.desc.with_name(name);
        self
    }
}

impl Block for NullSource {
    fn descriptor(&self) -> &BlockDescriptor {
        &self.desc
    }

    fn general_work(&mut self, noutput_items: usize, io: &mut WorkIo<'_>) -> WorkResult {
        io.output(0).bytes_mut().fill(0);
        WorkResult::Produced(noutput_items)
    }
}

/// Shared count of items a [`NullSink`] has discarded.
#[derive(Clone, Debug, Default)]
pub struct ItemCount(Arc<AtomicU64>);

impl ItemCount {
    /// Items counted so far.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn add(&self, n: usize) {
        self.0.fetch_add(n as u64, Ordering::Relaxed);
    }
}

/// Sink that discards its input and counts it.
pub struct NullSink {
    desc: BlockDescriptor,
    count: ItemCount,
}

impl NullSink {
    /// Creates a sink for `item_size`-byte items.
    pub fn new(item_size: usize) -> Self {
        Self {
            desc: BlockDescriptor::new("null_sink", &[item_size], &[]),
            count: ItemCount::default(),
        }
    }

    /// Renames the block.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.desc = self.desc.with_name(name);
        self
    }

    /// Handle to the discarded-item counter.
    pub fn count(&self) -> ItemCount {
        self.count.clone()
    }
}

impl Block for NullSink {
    fn descriptor(&self) -> &BlockDescriptor {
        &self.desc
    }

    fn general_work(&mut self, noutput_items: usize, io: &mut WorkIo<'_>) -> WorkResult {
        io.consume(0, noutput_items);
        self.count.add(noutput_items);
        WorkResult::Produced(noutput_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::run_chain;
    use crate::{Head, VectorSink};

    #[test]
    fn null_source_emits_zeros() {
        let sink = VectorSink::<i32>::new();
        let handle = sink.handle();
        run_chain(vec![
            Box::new(NullSource::new(4)),
            Box::new(Head::new(4, 3000)),
            Box::new(sink),
        ]);
        assert_eq!(handle.data(), vec![0; 3000]);
    }

    #[test]
    fn null_sink_counts_everything() {
        let sink = NullSink::new(8);
        let count = sink.count();
        let report = run_chain(vec![
            Box::new(NullSource::new(8)),
            Box::new(Head::new(8, 12_345)),
            Box::new(sink),
        ]);
        assert_eq!(count.get(), 12_345);
        assert_eq!(report.block("null_sink").unwrap().stats.items_consumed, 12_345);
    }
}
