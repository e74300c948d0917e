#![allow(unsafe_code)]
//! Reader side of a stream buffer.

use std::sync::Arc;

use parking_lot::MutexGuard;

use super::{BufferShared, BufferState};
use crate::item::{StreamItem, cast_slice};
use crate::tag::Tag;

/// One consumer's cursor into a [`Buffer`](super::Buffer).
///
/// Readers are independent: one reader consuming never changes what another
/// sees. Dropping a reader detaches it, which frees the space it was holding.
pub struct BufferReader {
    shared: Arc<BufferShared>,
    id: u64,
    history: usize,
}

impl BufferReader {
    pub(super) fn new(shared: Arc<BufferShared>, id: u64, history: usize) -> Self {
        Self {
            shared,
            id,
            history,
        }
    }

    /// History of the attached block (look-back is `history - 1` items).
    #[inline]
    pub fn history(&self) -> usize {
        self.history
    }

    /// Item size in bytes.
    #[inline]
    pub fn item_size(&self) -> usize {
        self.shared.item_size
    }

    /// Structural ceiling on [`items_available()`](Self::items_available).
    ///
    /// A block that needs more than this on one call can never run.
    #[inline]
    pub fn max_possible_items_available(&self) -> usize {
        self.shared.capacity
    }

    /// Locks the buffer for a brief snapshot of this reader's counters.
    pub fn lock(&self) -> ReaderGuard<'_> {
        ReaderGuard {
            shared: &self.shared,
            state: self.shared.state.lock(),
            id: self.id,
        }
    }

    /// Items readable right now, including the `history - 1` look-back items.
    pub fn items_available(&self) -> usize {
        self.lock().items_available()
    }

    /// Total items this reader has consumed, counted from the stream start.
    pub fn nitems_read(&self) -> u64 {
        self.lock().nitems_read()
    }

    /// True once the upstream writer has finished.
    pub fn done(&self) -> bool {
        self.shared.state.lock().done
    }

    /// Marks the downstream side finished and detaches the cursor.
    ///
    /// A finished consumer stops holding space or tags, so sibling readers of
    /// a fan-out keep flowing. Once every reader has finished, the writer
    /// observes [`Buffer::downstream_done`](super::Buffer::downstream_done).
    /// Must not be called with a read window outstanding.
    pub fn set_done(&self) {
        let mut st = self.shared.state.lock();
        debug_assert!(
            st.slot(self.id).is_none_or(|s| !s.pinned),
            "reader finished with a read window outstanding"
        );
        st.detach(self.id);
    }

    /// Physical item index of the read cursor.
    pub fn read_index(&self) -> usize {
        let st = self.shared.state.lock();
        let items_read = st.slot(self.id).map_or(st.items_written, |s| s.items_read);
        self.shared.physical(&st, items_read as i64)
    }

    /// Opens a window over everything currently readable.
    ///
    /// The window starts `history - 1` items before the read cursor. Close it
    /// with [`ReadWindow::finish`]; dropping it consumes nothing.
    ///
    /// # Panics
    ///
    /// Panics if a read window is already outstanding on this reader.
    pub fn begin_read(&self) -> ReadWindow<'_> {
        let mut st = self.shared.state.lock();
        let written = st.items_written;
        let (items_read, retained) = match st.slot(self.id) {
            Some(slot) => {
                assert!(!slot.pinned, "a read window is already outstanding");
                (slot.items_read, slot.retained_from())
            }
            None => (written, written as i64),
        };
        let nitems = (written as i64 - retained).max(0) as usize;
        let ptr = self.shared.item_ptr(&st, retained);
        if let Some(slot) = st.slot_mut(self.id) {
            slot.pinned = true;
        }
        ReadWindow {
            reader: self,
            ptr,
            nitems,
            nitems_read: items_read,
            closed: false,
        }
    }

    /// Advances the read cursor by `nitems` without opening a window.
    ///
    /// # Panics
    ///
    /// Panics if `nitems` exceeds the fresh items available.
    pub fn consume(&self, nitems: usize) {
        let mut st = self.shared.state.lock();
        advance(&mut st, self.id, nitems);
    }

    /// Tags on this stream with `start <= offset < end`, in offset order.
    pub fn tags_in_range(&self, start: u64, end: u64) -> Vec<Tag> {
        let st = self.shared.state.lock();
        let from = st.tags.partition_point(|t| t.offset < start);
        st.tags[from..]
            .iter()
            .take_while(|t| t.offset < end)
            .cloned()
            .collect()
    }

    /// Single-mapped compaction hook, called when `items_required` items
    /// (counted from the start of the look-back) cannot be contiguous.
    pub fn input_blocked_callback(&self, items_required: usize) -> bool {
        self.lock().input_blocked_callback(items_required)
    }

    /// Copies out and consumes up to `max` fresh items (look-back excluded).
    pub fn read_items<T: StreamItem>(&self, max: usize) -> Vec<T> {
        debug_assert_eq!(core::mem::size_of::<T>(), self.item_size());
        let window = self.begin_read();
        let skip = self.history - 1;
        let fresh = window.len().saturating_sub(skip);
        let n = fresh.min(max);
        let size = self.item_size();
        let items = cast_slice::<T>(&window.as_bytes()[skip * size..(skip + n) * size]).to_vec();
        window.finish(n);
        items
    }
}

impl Drop for BufferReader {
    fn drop(&mut self) {
        self.shared.state.lock().detach(self.id);
    }
}

impl core::fmt::Debug for BufferReader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufferReader")
            .field("id", &self.id)
            .field("history", &self.history)
            .field("nitems_read", &self.nitems_read())
            .finish()
    }
}

fn advance(st: &mut BufferState, id: u64, nitems: usize) {
    let written = st.items_written;
    if let Some(slot) = st.slot_mut(id) {
        let fresh = written - slot.items_read;
        assert!(
            nitems as u64 <= fresh,
            "consumed {nitems} items with only {fresh} fresh items available"
        );
        slot.items_read += nitems as u64;
        slot.pinned = false;
    }
    st.prune_tags();
}

/// Locked view of one reader's cursor.
pub struct ReaderGuard<'a> {
    shared: &'a BufferShared,
    state: MutexGuard<'a, BufferState>,
    id: u64,
}

impl ReaderGuard<'_> {
    /// Items readable right now, including look-back.
    pub fn items_available(&self) -> usize {
        let written = self.state.items_written as i64;
        self.state
            .slot(self.id)
            .map_or(0, |slot| (written - slot.retained_from()).max(0) as usize)
    }

    /// Total items consumed by this reader.
    pub fn nitems_read(&self) -> u64 {
        self.state
            .slot(self.id)
            .map_or(self.state.items_written, |slot| slot.items_read)
    }

    /// True once the upstream writer has finished.
    pub fn done(&self) -> bool {
        self.state.done
    }

    /// Compacts a single-mapped buffer when `items_required` items starting at
    /// this reader's look-back would run past the physical end of the array.
    /// Returns whether data moved.
    pub fn input_blocked_callback(&mut self, items_required: usize) -> bool {
        if self.shared.memory.is_mirrored() {
            return false;
        }
        let Some(slot) = self.state.slot(self.id) else {
            return false;
        };
        let start = (slot.retained_from() - self.state.origin).max(0) as usize;
        if start + items_required <= self.shared.capacity {
            return false;
        }
        self.shared.compact(&mut self.state)
    }
}

/// Contiguous readable span handed to a block.
pub struct ReadWindow<'r> {
    reader: &'r BufferReader,
    ptr: *mut u8,
    nitems: usize,
    nitems_read: u64,
    closed: bool,
}

impl ReadWindow<'_> {
    /// Items in the window, look-back included.
    pub fn len(&self) -> usize {
        self.nitems
    }

    /// True for an empty window.
    pub fn is_empty(&self) -> bool {
        self.nitems == 0
    }

    /// The reader's consumed count when the window was opened. The first
    /// fresh item in the window has this stream offset.
    pub fn nitems_read(&self) -> u64 {
        self.nitems_read
    }

    /// The window's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.nitems * self.reader.item_size();
        // SAFETY: the span was published by the writer before the window was
        // opened; the writer cannot reclaim it until this reader advances, and
        // the reader pin blocks compaction.
        unsafe { core::slice::from_raw_parts(self.ptr, len) }
    }

    /// Consumes `consumed` fresh items and closes the window.
    ///
    /// # Panics
    ///
    /// Panics if `consumed` exceeds the fresh items in the window.
    pub fn finish(mut self, consumed: usize) {
        self.close(consumed);
    }

    fn close(&mut self, consumed: usize) {
        if self.closed {
            return;
        }
        self.closed = true;
        let fresh = self.nitems.saturating_sub(self.reader.history - 1);
        assert!(
            consumed <= fresh,
            "consumed {consumed} items from a window with {fresh} fresh items"
        );
        let mut st = self.reader.shared.state.lock();
        advance(&mut st, self.reader.id, consumed);
    }
}

impl Drop for ReadWindow<'_> {
    fn drop(&mut self) {
        self.close(0);
    }
}

#[cfg(test)]
mod tests {
    use crate::buffer::{Buffer, BufferKind};
    use crate::tag::{Tag, TagValue};

    #[test]
    fn late_reader_sees_nothing_old() {
        let buf = Buffer::new(32, 4, BufferKind::SingleMapped).unwrap();
        buf.write_items(&[1u32, 2, 3]);
        let reader = buf.add_reader(1).unwrap();
        assert_eq!(reader.items_available(), 0);
        assert_eq!(reader.nitems_read(), 3);
    }

    #[test]
    fn window_starts_at_lookback() {
        let buf = Buffer::new(32, 4, BufferKind::SingleMapped).unwrap();
        let reader = buf.add_reader(3).unwrap();
        buf.write_items(&[10u32, 11, 12]);
        let window = reader.begin_read();
        assert_eq!(window.len(), 5);
        let items = crate::item::cast_slice::<u32>(window.as_bytes());
        assert_eq!(items, &[0, 0, 10, 11, 12]);
        window.finish(2);
        assert_eq!(reader.items_available(), 3);
        assert_eq!(reader.read_items::<u32>(8), vec![12]);
    }

    #[test]
    fn dropping_window_consumes_nothing() {
        let buf = Buffer::new(32, 4, BufferKind::SingleMapped).unwrap();
        let reader = buf.add_reader(1).unwrap();
        buf.write_items(&[1u32, 2]);
        drop(reader.begin_read());
        assert_eq!(reader.items_available(), 2);
    }

    #[test]
    #[should_panic(expected = "fresh items")]
    fn overconsume_panics() {
        let buf = Buffer::new(32, 4, BufferKind::SingleMapped).unwrap();
        let reader = buf.add_reader(1).unwrap();
        buf.write_items(&[1u32, 2]);
        reader.consume(3);
    }

    #[test]
    fn tags_in_range_is_half_open() {
        let buf = Buffer::new(32, 4, BufferKind::SingleMapped).unwrap();
        let reader = buf.add_reader(1).unwrap();
        for offset in [0, 4, 8] {
            buf.add_tag(Tag::new(offset, "k", TagValue::UInt(offset)));
        }
        let tags = reader.tags_in_range(4, 8);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].offset, 4);
    }

    #[test]
    fn tags_pruned_after_all_readers_pass() {
        let buf = Buffer::new(32, 4, BufferKind::SingleMapped).unwrap();
        let fast = buf.add_reader(1).unwrap();
        let slow = buf.add_reader(1).unwrap();
        buf.add_tag(Tag::new(1, "k", TagValue::Null));
        buf.write_items(&[0u32; 4]);
        fast.consume(4);
        assert_eq!(slow.tags_in_range(0, 4).len(), 1);
        slow.consume(4);
        assert!(fast.tags_in_range(0, 4).is_empty());
    }

    #[test]
    fn detaching_frees_space() {
        let buf = Buffer::new(16, 4, BufferKind::SingleMapped).unwrap();
        let keep = buf.add_reader(1).unwrap();
        let stalled = buf.add_reader(1).unwrap();
        buf.write_items(&[0u32; 12]);
        keep.consume(12);
        assert_eq!(buf.space_available(), 4);
        drop(stalled);
        buf.output_blocked_callback(1, true);
        assert_eq!(buf.space_available(), 16);
    }
}
