//! Vector-backed source and sink.
//!
//! [`VectorSource`] plays a `Vec<T>` into a stream, once or on repeat, with
//! optional tags. [`VectorSink`] records everything it consumes; the data is
//! read back through a [`SinkHandle`] that stays valid after the sink has
//! been moved into an executor.

use std::sync::Arc;

use parking_lot::Mutex;
use rivulet_core::{Block, BlockDescriptor, StreamItem, Tag, WorkIo, WorkResult};

/// Source that emits the items of a vector.
///
/// Tags given with [`with_tags`](Self::with_tags) use offsets relative to the
/// start of the vector and are re-emitted on every repetition. Tags at or
/// beyond the vector length are never emitted.
///
/// # Example
///
/// ```rust
/// use rivulet_blocks::VectorSource;
/// use rivulet_core::Block;
///
/// let source = VectorSource::new(vec![1i16, 2, 3]).repeating();
/// assert_eq!(source.descriptor().output_item_sizes(), &[2]);
/// ```
pub struct VectorSource<T: StreamItem> {
    desc: BlockDescriptor,
    data: Vec<T>,
    tags: Vec<Tag>,
    repeat: bool,
    pos: usize,
}

impl<T: StreamItem> VectorSource<T> {
    /// Plays `data` once, then finishes.
    pub fn new(data: Vec<T>) -> Self {
        Self {
            desc: BlockDescriptor::new("vector_source", &[], &[size_of::<T>()]),
            data,
            tags: Vec::new(),
            repeat: false,
            pos: 0,
        }
    }

    /// Loops over the data forever.
    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// Attaches tags, offsets relative to the start of the data.
    pub fn with_tags(mut self, mut tags: Vec<Tag>) -> Self {
        tags.sort_by_key(|t| t.offset);
        self.tags = tags;
        self
    }

    /// Renames the block.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.desc = self.desc.with_name(name);
        self
    }

    /// Rewinds to the start of the data.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }
}

impl<T: StreamItem> Block for VectorSource<T> {
    fn descriptor(&self) -> &BlockDescriptor {
        &self.desc
    }

    fn general_work(&mut self, noutput_items: usize, io: &mut WorkIo<'_>) -> WorkResult {
        if self.data.is_empty() || (!self.repeat && self.pos == self.data.len()) {
            return WorkResult::Done;
        }

        let first = io.output(0).nitems_written();
        let mut filled = 0;
        while filled < noutput_items {
            let take = (noutput_items - filled).min(self.data.len() - self.pos);
            let out = io.output_items::<T>(0);
            out[filled..filled + take].copy_from_slice(&self.data[self.pos..self.pos + take]);

            let span = self.pos as u64..(self.pos + take) as u64;
            let base = first + filled as u64;
            for tag in self.tags.iter().filter(|t| span.contains(&t.offset)) {
                io.add_tag(0, tag.at(base + (tag.offset - span.start)));
            }

            filled += take;
            self.pos += take;
            if self.pos == self.data.len() {
                if !self.repeat {
                    break;
                }
                self.pos = 0;
            }
        }
        WorkResult::Produced(filled)
    }
}

struct Captured<T> {
    items: Vec<T>,
    tags: Vec<Tag>,
}

/// Shared view of what a [`VectorSink`] has captured.
pub struct SinkHandle<T> {
    inner: Arc<Mutex<Captured<T>>>,
}

impl<T> Clone for SinkHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: StreamItem> SinkHandle<T> {
    /// Copy of every item captured so far.
    pub fn data(&self) -> Vec<T> {
        self.inner.lock().items.clone()
    }

    /// Copy of every tag captured so far, in stream order.
    pub fn tags(&self) -> Vec<Tag> {
        self.inner.lock().tags.clone()
    }

    /// Items captured so far.
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// True if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets everything captured so far.
    pub fn clear(&self) {
        let mut captured = self.inner.lock();
        captured.items.clear();
        captured.tags.clear();
    }
}

/// Sink that records its input and the tags on it.
pub struct VectorSink<T: StreamItem> {
    desc: BlockDescriptor,
    captured: SinkHandle<T>,
}

impl<T: StreamItem> VectorSink<T> {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self {
            desc: BlockDescriptor::new("vector_sink", &[size_of::<T>()], &[]),
            captured: SinkHandle {
                inner: Arc::new(Mutex::new(Captured {
                    items: Vec::new(),
                    tags: Vec::new(),
                })),
            },
        }
    }

    /// Renames the block.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.desc = self.desc.with_name(name);
        self
    }

    /// Handle for reading the captured data, valid after the sink is moved.
    pub fn handle(&self) -> SinkHandle<T> {
        self.captured.clone()
    }
}

impl<T: StreamItem> Default for VectorSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StreamItem> Block for VectorSink<T> {
    fn descriptor(&self) -> &BlockDescriptor {
        &self.desc
    }

    fn general_work(&mut self, noutput_items: usize, io: &mut WorkIo<'_>) -> WorkResult {
        let input = io.input_items::<T>(0);
        let port = io.input(0);
        let end = port.nitems_read() + noutput_items as u64;

        let mut captured = self.captured.inner.lock();
        captured.items.extend_from_slice(&input[..noutput_items]);
        captured
            .tags
            .extend(port.tags().iter().filter(|t| t.offset < end).cloned());
        drop(captured);

        io.consume(0, noutput_items);
        WorkResult::Produced(noutput_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::run_chain;
    use rivulet_core::TagValue;

    #[test]
    fn plays_vector_once() {
        let data: Vec<u32> = (0..5000).collect();
        let sink = VectorSink::<u32>::new();
        let handle = sink.handle();
        run_chain(vec![Box::new(VectorSource::new(data.clone())), Box::new(sink)]);
        assert_eq!(handle.data(), data);
    }

    #[test]
    fn empty_vector_finishes_immediately() {
        let sink = VectorSink::<f32>::new();
        let handle = sink.handle();
        let report = run_chain(vec![
            Box::new(VectorSource::<f32>::new(Vec::new()).repeating()),
            Box::new(sink),
        ]);
        assert!(handle.is_empty());
        assert_eq!(report.blocks[0].stats.items_produced, 0);
    }

    #[test]
    fn repeated_tags_land_on_every_cycle() {
        let source = VectorSource::new(vec![1.0f32, 2.0, 3.0, 4.0])
            .repeating()
            .with_tags(vec![Tag::new(1, "mark", TagValue::Null)]);
        let sink = VectorSink::<f32>::new();
        let handle = sink.handle();
        run_chain(vec![
            Box::new(source),
            Box::new(crate::Head::new(4, 10)),
            Box::new(sink),
        ]);

        assert_eq!(
            handle.data(),
            vec![1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 3.0, 4.0, 1.0, 2.0]
        );
        let offsets: Vec<u64> = handle.tags().iter().map(|t| t.offset).collect();
        assert_eq!(offsets, vec![1, 5, 9]);
    }

    #[test]
    fn handle_clear_resets_capture() {
        let sink = VectorSink::<u8>::new();
        let handle = sink.handle();
        run_chain(vec![Box::new(VectorSource::new(vec![7u8; 3])), Box::new(sink)]);
        assert_eq!(handle.len(), 3);
        handle.clear();
        assert!(handle.is_empty());
        assert!(handle.tags().is_empty());
    }
}
