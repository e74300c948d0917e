#![allow(unsafe_code)]
//! Circular stream buffers with a flat, linearly addressable view.
//!
//! A [`Buffer`] is a fixed-capacity ring of fixed-size items with exactly one
//! writer and any number of [`BufferReader`]s. Each reader keeps its own read
//! cursor; the writer may only overwrite items that every reader has consumed.
//!
//! # Variants
//!
//! - **Double-mapped** ([`BufferKind::DoubleMapped`]): the ring is backed by a
//!   [`DoubleMappedRegion`], so a run of up to `capacity` items starting at any
//!   cursor is contiguous. No data ever moves.
//! - **Single-mapped** ([`BufferKind::SingleMapped`]): the ring is one flat
//!   array. Live data always occupies one contiguous span; when the writer
//!   reaches the physical end, [`compaction`](BufferGuard::output_blocked_callback)
//!   moves the live span back to offset 0.
//!
//! # Accounting
//!
//! All cursors are absolute item counts (`u64`), never wrapped. A reader with
//! history `h` keeps `h - 1` look-back items behind its read cursor, so the
//! window it is offered starts at `items_read - (h - 1)` and
//!
//! ```text
//! items_available = items_written - items_read + (h - 1)
//! space_available = capacity - max_over_readers(items_written - items_read + h - 1)
//! ```
//!
//! A freshly attached reader therefore sees `h - 1` look-back items (zeros on
//! a new buffer) and nothing else: late readers never see historical data.
//!
//! # Concurrency
//!
//! Cursor state sits behind one `parking_lot::Mutex` per buffer. Taking a
//! [`WriteWindow`] or [`ReadWindow`] pins the buffer; the window's bytes are
//! then accessed without the lock. Space accounting guarantees the writer's
//! window never overlaps any reader's window, and single-mapped compaction is
//! refused while any window is outstanding.

mod reader;
pub mod region;
mod sizing;

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::error::BufferError;
use crate::item::{StreamItem, as_bytes};
use crate::math::{granularity_items, round_up};
use crate::tag::Tag;

pub use reader::{BufferReader, ReadWindow, ReaderGuard};
pub use region::{DoubleMappedRegion, FlatRegion, allocate_double_mapped, page_size};
pub use sizing::{BufferSizing, ConsumerHint};

/// Which memory strategy a buffer uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Double-mapped when the platform supports it, single-mapped otherwise.
    #[default]
    Auto,
    /// Double-mapped only; construction fails if no backend is available.
    DoubleMapped,
    /// Single flat array with compaction.
    SingleMapped,
}

impl core::fmt::Display for BufferKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::DoubleMapped => write!(f, "double-mapped"),
            Self::SingleMapped => write!(f, "single-mapped"),
        }
    }
}

pub(crate) enum Memory {
    Mirrored(Box<dyn DoubleMappedRegion>),
    Flat(FlatRegion),
}

impl Memory {
    fn base(&self) -> *mut u8 {
        match self {
            Self::Mirrored(region) => region.as_mut_ptr(),
            Self::Flat(region) => region.as_mut_ptr(),
        }
    }

    fn is_mirrored(&self) -> bool {
        matches!(self, Self::Mirrored(_))
    }

    fn backend(&self) -> &'static str {
        match self {
            Self::Mirrored(region) => region.backend(),
            Self::Flat(_) => "flat",
        }
    }
}

/// Per-reader cursor state.
pub(crate) struct ReaderSlot {
    pub(crate) id: u64,
    pub(crate) items_read: u64,
    pub(crate) history: usize,
    /// A read window is outstanding.
    pub(crate) pinned: bool,
}

impl ReaderSlot {
    /// First stream position this reader still needs (including look-back).
    #[inline]
    pub(crate) fn retained_from(&self) -> i64 {
        self.items_read as i64 - (self.history as i64 - 1)
    }
}

pub(crate) struct BufferState {
    pub(crate) items_written: u64,
    pub(crate) done: bool,
    pub(crate) writer_pinned: bool,
    /// Stream position stored at physical index 0 (single-mapped only).
    pub(crate) origin: i64,
    pub(crate) readers: Vec<ReaderSlot>,
    pub(crate) had_readers: bool,
    /// Sorted by offset.
    pub(crate) tags: Vec<Tag>,
    pub(crate) compactions: u64,
    pub(crate) next_reader_id: u64,
}

impl BufferState {
    pub(crate) fn slot(&self, id: u64) -> Option<&ReaderSlot> {
        self.readers.iter().find(|r| r.id == id)
    }

    pub(crate) fn slot_mut(&mut self, id: u64) -> Option<&mut ReaderSlot> {
        self.readers.iter_mut().find(|r| r.id == id)
    }

    /// Removes reader `id`, releasing the space and tags it was holding.
    pub(crate) fn detach(&mut self, id: u64) {
        self.readers.retain(|r| r.id != id);
        self.prune_tags();
    }

    fn any_pinned(&self) -> bool {
        self.writer_pinned || self.readers.iter().any(|r| r.pinned)
    }

    /// Drops tags no current or future reader can observe.
    pub(crate) fn prune_tags(&mut self) {
        let horizon = self
            .readers
            .iter()
            .map(|r| r.items_read)
            .min()
            .unwrap_or(self.items_written);
        let keep_from = self.tags.partition_point(|t| t.offset < horizon);
        if keep_from > 0 {
            self.tags.drain(..keep_from);
        }
    }
}

pub(crate) struct BufferShared {
    pub(crate) item_size: usize,
    pub(crate) capacity: usize,
    pub(crate) memory: Memory,
    pub(crate) state: Mutex<BufferState>,
}

// Raw pointers inside `Memory` are covered by the region types' own Send/Sync
// impls; everything else is plain data or behind the mutex.

impl BufferShared {
    /// Physical item index of stream position `pos`.
    pub(crate) fn physical(&self, st: &BufferState, pos: i64) -> usize {
        if self.memory.is_mirrored() {
            pos.rem_euclid(self.capacity as i64) as usize
        } else {
            (pos - st.origin) as usize
        }
    }

    /// Pointer to the first byte of stream position `pos`.
    pub(crate) fn item_ptr(&self, st: &BufferState, pos: i64) -> *mut u8 {
        let offset = self.physical(st, pos) * self.item_size;
        // SAFETY: `physical` is < capacity for mirrored memory (whose mapping is
        // twice that long) and <= capacity for flat memory by the origin invariant.
        unsafe { self.memory.base().add(offset) }
    }

    pub(crate) fn space_available(&self, st: &mut BufferState) -> usize {
        if st.readers.is_empty() {
            if !self.memory.is_mirrored() && !st.writer_pinned {
                // Nobody can ever read what is stored; restart at offset 0.
                st.origin = st.items_written as i64;
            }
            return self.capacity;
        }
        let written = st.items_written as i64;
        let used = if self.memory.is_mirrored() {
            st.readers
                .iter()
                .map(|r| written - r.retained_from())
                .max()
                .unwrap_or(0)
        } else {
            written - st.origin
        };
        self.capacity.saturating_sub(used.max(0) as usize)
    }

    /// Moves the live span of a single-mapped buffer to offset 0.
    ///
    /// Every cursor is an absolute stream position, so only `origin` changes:
    /// the distance between the writer and each reader is untouched.
    pub(crate) fn compact(&self, st: &mut BufferState) -> bool {
        if self.memory.is_mirrored() || st.any_pinned() {
            return false;
        }
        let written = st.items_written as i64;
        let target = st
            .readers
            .iter()
            .map(|r| r.retained_from())
            .min()
            .unwrap_or(written);
        let shift = target - st.origin;
        if shift <= 0 {
            return false;
        }
        let live = (written - target) as usize;
        if live > 0 {
            let base = self.memory.base();
            // SAFETY: source span [shift, shift + live) and destination
            // [0, live) both lie inside the flat region; `copy` handles overlap
            // and no window is outstanding.
            unsafe {
                core::ptr::copy(
                    base.add(shift as usize * self.item_size),
                    base,
                    live * self.item_size,
                );
            }
        }
        st.origin = target;
        st.compactions += 1;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "buffer_compact: moved {live} items back by {shift}, {} compactions",
            st.compactions
        );
        true
    }

    pub(crate) fn attach(&self, st: &mut BufferState, history: usize) -> Result<u64, BufferError> {
        let history = history.max(1);
        if history > self.capacity {
            return Err(BufferError::HistoryExceedsCapacity {
                history,
                capacity: self.capacity,
            });
        }
        if st.any_pinned() {
            return Err(BufferError::AttachWhileActive);
        }

        let written = st.items_written as i64;
        let retained = written - (history as i64 - 1);
        if !self.memory.is_mirrored() && retained < st.origin {
            // Make room in front of the live span for the look-back items.
            let delta = (st.origin - retained) as usize;
            let live = (written - st.origin) as usize;
            if live + delta > self.capacity {
                return Err(BufferError::HistoryExceedsCapacity {
                    history,
                    capacity: self.capacity,
                });
            }
            let base = self.memory.base();
            // SAFETY: live + delta <= capacity, so both spans fit in the flat
            // region; nothing is pinned.
            unsafe {
                core::ptr::copy(base, base.add(delta * self.item_size), live * self.item_size);
                core::ptr::write_bytes(base, 0, delta * self.item_size);
            }
            st.origin = retained;
        }

        let id = st.next_reader_id;
        st.next_reader_id += 1;
        st.readers.push(ReaderSlot {
            id,
            items_read: st.items_written,
            history,
            pinned: false,
        });
        st.had_readers = true;
        Ok(id)
    }
}

/// Point-in-time view of a buffer's cursors, for reports and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferStats {
    /// Resolved memory strategy (never `Auto`).
    pub kind: BufferKind,
    /// Backend name (`memfd`, `posix-shm`, `flat`).
    pub backend: &'static str,
    /// Capacity in items.
    pub capacity: usize,
    /// Item size in bytes.
    pub item_size: usize,
    /// Total items ever written.
    pub items_written: u64,
    /// Total items consumed, per attached reader.
    pub items_read: Vec<u64>,
    /// Number of single-mapped compactions performed.
    pub compactions: u64,
}

/// Writer-side handle of a stream buffer.
///
/// Owned by the connection layer / the upstream executor. Readers are
/// attached with [`add_reader()`](Self::add_reader).
pub struct Buffer {
    shared: Arc<BufferShared>,
    kind: BufferKind,
}

impl Buffer {
    /// Creates a buffer of at least `capacity` items of `item_size` bytes.
    ///
    /// Double-mapped buffers round the capacity up so the byte size is a whole
    /// number of pages. `Auto` keeps that rounded capacity even when it falls
    /// back to single-mapped memory, so sizing never depends on the backend.
    ///
    /// # Errors
    ///
    /// - [`BufferError::ZeroItemSize`] / [`BufferError::ZeroCapacity`]
    /// - [`BufferError::MappingUnavailable`] for an explicit double-mapped
    ///   request on a platform without a backend
    /// - [`BufferError::Allocation`] if the OS refuses the memory
    pub fn new(capacity: usize, item_size: usize, kind: BufferKind) -> Result<Self, BufferError> {
        if item_size == 0 {
            return Err(BufferError::ZeroItemSize);
        }
        if capacity == 0 {
            return Err(BufferError::ZeroCapacity);
        }

        let (memory, capacity, resolved) = match kind {
            BufferKind::SingleMapped => {
                let region = FlatRegion::new(capacity * item_size)?;
                (Memory::Flat(region), capacity, BufferKind::SingleMapped)
            }
            BufferKind::DoubleMapped => {
                let capacity = round_up(capacity, granularity_items(item_size, page_size()));
                let region = allocate_double_mapped(capacity * item_size)?;
                (Memory::Mirrored(region), capacity, BufferKind::DoubleMapped)
            }
            BufferKind::Auto => {
                let capacity = round_up(capacity, granularity_items(item_size, page_size()));
                match allocate_double_mapped(capacity * item_size) {
                    Ok(region) => (Memory::Mirrored(region), capacity, BufferKind::DoubleMapped),
                    Err(BufferError::MappingUnavailable { reason }) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("buffer_new: falling back to single-mapped memory ({reason})");
                        #[cfg(not(feature = "tracing"))]
                        let _ = reason;
                        let region = FlatRegion::new(capacity * item_size)?;
                        (Memory::Flat(region), capacity, BufferKind::SingleMapped)
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "buffer_new: {capacity} items x {item_size} bytes, {resolved} ({})",
            memory.backend()
        );

        Ok(Self {
            shared: Arc::new(BufferShared {
                item_size,
                capacity,
                memory,
                state: Mutex::new(BufferState {
                    items_written: 0,
                    done: false,
                    writer_pinned: false,
                    origin: 0,
                    readers: Vec::new(),
                    had_readers: false,
                    tags: Vec::new(),
                    compactions: 0,
                    next_reader_id: 0,
                }),
            }),
            kind: resolved,
        })
    }

    /// Creates a buffer sized by a [`BufferSizing`] policy.
    pub fn with_sizing(
        item_size: usize,
        kind: BufferKind,
        sizing: &BufferSizing,
    ) -> Result<Self, BufferError> {
        Self::new(sizing.capacity_items(item_size), item_size, kind)
    }

    /// Capacity in items.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Item size in bytes.
    #[inline]
    pub fn item_size(&self) -> usize {
        self.shared.item_size
    }

    /// Resolved memory strategy (never `Auto`).
    #[inline]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Attaches a reader at the current write cursor.
    ///
    /// `history` is the downstream block's history (1 for no look-back).
    pub fn add_reader(&self, history: usize) -> Result<BufferReader, BufferError> {
        let mut st = self.shared.state.lock();
        let id = self.shared.attach(&mut st, history)?;
        drop(st);
        Ok(BufferReader::new(Arc::clone(&self.shared), id, history.max(1)))
    }

    /// Number of attached readers.
    pub fn reader_count(&self) -> usize {
        self.shared.state.lock().readers.len()
    }

    /// Locks the buffer for a brief snapshot of its writer-side counters.
    pub fn lock(&self) -> BufferGuard<'_> {
        BufferGuard {
            shared: &self.shared,
            state: self.shared.state.lock(),
        }
    }

    /// Items that can be written before the slowest reader would be overrun.
    pub fn space_available(&self) -> usize {
        self.lock().space_available()
    }

    /// Total items ever written.
    pub fn nitems_written(&self) -> u64 {
        self.shared.state.lock().items_written
    }

    /// Physical item index of the write cursor.
    pub fn write_index(&self) -> usize {
        let st = self.shared.state.lock();
        self.shared.physical(&st, st.items_written as i64)
    }

    /// Opens a write window of `nitems` items at the write cursor.
    ///
    /// The window is contiguous. It must be closed with
    /// [`WriteWindow::finish`]; dropping it publishes nothing.
    ///
    /// # Panics
    ///
    /// Panics if another write window is outstanding or `nitems` exceeds
    /// [`space_available()`](Self::space_available).
    pub fn begin_write(&self, nitems: usize) -> WriteWindow<'_> {
        let mut st = self.shared.state.lock();
        assert!(!st.writer_pinned, "a write window is already outstanding");
        let space = self.shared.space_available(&mut st);
        assert!(
            nitems <= space,
            "write window of {nitems} items exceeds available space {space}"
        );
        let ptr = self.shared.item_ptr(&st, st.items_written as i64);
        st.writer_pinned = true;
        WriteWindow {
            buffer: self,
            ptr,
            nitems,
            closed: false,
        }
    }

    /// Copies as many of `items` as fit and publishes them. Returns the count.
    pub fn write_items<T: StreamItem>(&self, items: &[T]) -> usize {
        debug_assert_eq!(core::mem::size_of::<T>(), self.item_size());
        let n = items.len().min(self.space_available());
        let mut window = self.begin_write(n);
        window
            .as_bytes_mut()
            .copy_from_slice(as_bytes(&items[..n]));
        window.finish(n);
        n
    }

    /// Attaches a tag to this stream. Tags are kept sorted by offset.
    pub fn add_tag(&self, tag: Tag) {
        let mut st = self.shared.state.lock();
        let at = st.tags.partition_point(|t| t.offset <= tag.offset);
        st.tags.insert(at, tag);
    }

    /// Marks the writer finished (`true`) or live again (`false`).
    pub fn set_done(&self, done: bool) {
        self.shared.state.lock().done = done;
    }

    /// True once the writer has finished.
    pub fn done(&self) -> bool {
        self.shared.state.lock().done
    }

    /// True once readers were attached and every one of them has finished.
    pub fn downstream_done(&self) -> bool {
        self.lock().downstream_done()
    }

    /// See [`BufferGuard::output_blocked_callback`].
    pub fn output_blocked_callback(&self, output_multiple: usize, force: bool) -> bool {
        self.lock().output_blocked_callback(output_multiple, force)
    }

    /// Snapshot of the buffer's counters.
    pub fn stats(&self) -> BufferStats {
        let st = self.shared.state.lock();
        BufferStats {
            kind: self.kind,
            backend: self.shared.memory.backend(),
            capacity: self.shared.capacity,
            item_size: self.shared.item_size,
            items_written: st.items_written,
            items_read: st.readers.iter().map(|r| r.items_read).collect(),
            compactions: st.compactions,
        }
    }
}

impl core::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let st = self.shared.state.lock();
        f.debug_struct("Buffer")
            .field("kind", &self.kind)
            .field("capacity", &self.shared.capacity)
            .field("item_size", &self.shared.item_size)
            .field("items_written", &st.items_written)
            .field("readers", &st.readers.len())
            .finish()
    }
}

/// Locked view of a buffer's writer-side state.
///
/// Hold it only for a snapshot; never across a block's work call.
pub struct BufferGuard<'a> {
    shared: &'a BufferShared,
    state: MutexGuard<'a, BufferState>,
}

impl BufferGuard<'_> {
    /// Items that can be written before the slowest reader would be overrun.
    pub fn space_available(&mut self) -> usize {
        self.shared.space_available(&mut self.state)
    }

    /// Total items ever written.
    pub fn nitems_written(&self) -> u64 {
        self.state.items_written
    }

    /// True once the writer has finished.
    pub fn done(&self) -> bool {
        self.state.done
    }

    /// True once readers were attached and every one of them has finished.
    ///
    /// Finished readers detach, so this is "had readers, has none left".
    pub fn downstream_done(&self) -> bool {
        self.state.had_readers && self.state.readers.is_empty()
    }

    /// Output-blocked compaction hook (single-mapped only).
    ///
    /// When fewer than `output_multiple` items fit before the physical end of
    /// the array (or `force` is set), moves the slowest reader's retained span
    /// back to offset 0. Returns whether data moved. Refused while any window
    /// is outstanding.
    pub fn output_blocked_callback(&mut self, output_multiple: usize, force: bool) -> bool {
        if self.shared.memory.is_mirrored() {
            return false;
        }
        let space = self.shared.space_available(&mut self.state);
        if !force && space >= output_multiple.max(1) {
            return false;
        }
        self.shared.compact(&mut self.state)
    }
}

/// Contiguous writable span handed to a block.
pub struct WriteWindow<'b> {
    buffer: &'b Buffer,
    ptr: *mut u8,
    nitems: usize,
    closed: bool,
}

impl WriteWindow<'_> {
    /// Capacity of the window in items.
    pub fn len(&self) -> usize {
        self.nitems
    }

    /// True for a zero-item window.
    pub fn is_empty(&self) -> bool {
        self.nitems == 0
    }

    /// Stream offset of the first item in the window.
    pub fn first_offset(&self) -> u64 {
        self.buffer.shared.state.lock().items_written
    }

    /// The window's bytes.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.nitems * self.buffer.item_size();
        // SAFETY: the window was carved out of free space under the lock and
        // the writer pin keeps it from being moved or handed out twice.
        unsafe { core::slice::from_raw_parts_mut(self.ptr, len) }
    }

    /// Publishes the first `produced` items and closes the window.
    ///
    /// # Panics
    ///
    /// Panics if `produced` exceeds the window length.
    pub fn finish(mut self, produced: usize) {
        self.close(produced);
    }

    fn close(&mut self, produced: usize) {
        if self.closed {
            return;
        }
        assert!(
            produced <= self.nitems,
            "produced {produced} items into a window of {}",
            self.nitems
        );
        let mut st = self.buffer.shared.state.lock();
        st.items_written += produced as u64;
        st.writer_pinned = false;
        if st.readers.is_empty() {
            st.prune_tags();
        }
        self.closed = true;
    }
}

impl Drop for WriteWindow<'_> {
    fn drop(&mut self) {
        self.close(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_items_u32() -> usize {
        granularity_items(4, page_size())
    }

    #[test]
    fn double_mapped_capacity_is_page_rounded() {
        let buf = Buffer::new(100, 4, BufferKind::Auto).unwrap();
        assert_eq!(buf.capacity() % page_items_u32(), 0);
        assert!(buf.capacity() >= 100);
    }

    #[test]
    fn single_mapped_keeps_requested_capacity() {
        let buf = Buffer::new(100, 4, BufferKind::SingleMapped).unwrap();
        assert_eq!(buf.capacity(), 100);
        assert_eq!(buf.kind(), BufferKind::SingleMapped);
    }

    #[test]
    fn zero_sizes_rejected() {
        assert!(matches!(
            Buffer::new(16, 0, BufferKind::SingleMapped),
            Err(BufferError::ZeroItemSize)
        ));
        assert!(matches!(
            Buffer::new(0, 4, BufferKind::SingleMapped),
            Err(BufferError::ZeroCapacity)
        ));
    }

    #[test]
    fn no_readers_means_full_capacity() {
        let buf = Buffer::new(64, 4, BufferKind::SingleMapped).unwrap();
        assert_eq!(buf.space_available(), 64);
        buf.write_items(&[1u32; 40]);
        assert_eq!(buf.space_available(), 64);
    }

    #[test]
    fn history_reduces_space() {
        let buf = Buffer::new(64, 4, BufferKind::SingleMapped).unwrap();
        let reader = buf.add_reader(5).unwrap();
        assert_eq!(buf.space_available(), 60);
        assert_eq!(reader.items_available(), 4);
    }

    #[test]
    fn history_larger_than_capacity_rejected() {
        let buf = Buffer::new(8, 4, BufferKind::SingleMapped).unwrap();
        assert!(matches!(
            buf.add_reader(9),
            Err(BufferError::HistoryExceedsCapacity { .. })
        ));
    }

    #[test]
    fn dropped_window_publishes_nothing() {
        let buf = Buffer::new(16, 4, BufferKind::SingleMapped).unwrap();
        let _reader = buf.add_reader(1).unwrap();
        {
            let _window = buf.begin_write(8);
        }
        assert_eq!(buf.nitems_written(), 0);
        assert_eq!(buf.space_available(), 16);
    }

    #[test]
    #[should_panic(expected = "exceeds available space")]
    fn oversized_window_panics() {
        let buf = Buffer::new(16, 4, BufferKind::SingleMapped).unwrap();
        let _reader = buf.add_reader(1).unwrap();
        let _window = buf.begin_write(17);
    }

    #[test]
    fn tags_sorted_and_pruned_without_readers() {
        let buf = Buffer::new(16, 4, BufferKind::SingleMapped).unwrap();
        buf.add_tag(Tag::new(5, "b", crate::TagValue::Null));
        buf.add_tag(Tag::new(2, "a", crate::TagValue::Null));
        {
            let st = buf.shared.state.lock();
            assert_eq!(st.tags[0].key, "a");
            assert_eq!(st.tags[1].key, "b");
        }
        buf.write_items(&[0u32; 4]);
        let st = buf.shared.state.lock();
        assert_eq!(st.tags.len(), 1);
        assert_eq!(st.tags[0].offset, 5);
    }

    #[test]
    fn downstream_done_needs_readers() {
        let buf = Buffer::new(16, 4, BufferKind::SingleMapped).unwrap();
        assert!(!buf.downstream_done());
        let reader = buf.add_reader(1).unwrap();
        assert!(!buf.downstream_done());
        reader.set_done();
        assert!(buf.downstream_done());
        drop(reader);
        assert!(buf.downstream_done());
    }
}
