//! Block contract consumed by the executor.
//!
//! A block is anything implementing [`Block`]: it exposes a
//! [`BlockDescriptor`] (ports, rate, history, multiples, tag policy) and a
//! `general_work` transform. Everything else has defaults derived from the
//! descriptor, so simple blocks implement two methods.
//!
//! ## Design Decisions
//!
//! - **Object-safe**: executors hold `Box<dyn Block>`; they never know the
//!   concrete block type.
//! - **Type-erased ports**: buffers move bytes. Blocks borrow typed views via
//!   [`WorkIo::input_items`] / [`WorkIo::output_items`], which are checked
//!   casts over [`StreamItem`] types.
//! - **Explicit bookkeeping**: blocks report what they consumed through
//!   [`WorkIo::consume`] and either return [`WorkResult::Produced`] or call
//!   [`WorkIo::produce`] themselves.
//!
//! # Example
//!
//! ```rust
//! use rivulet_core::{Block, BlockDescriptor, WorkIo, WorkResult};
//!
//! struct Negate {
//!     desc: BlockDescriptor,
//! }
//!
//! impl Block for Negate {
//!     fn descriptor(&self) -> &BlockDescriptor {
//!         &self.desc
//!     }
//!
//!     fn general_work(&mut self, noutput_items: usize, io: &mut WorkIo<'_>) -> WorkResult {
//!         let input = io.input_items::<f32>(0);
//!         let output = io.output_items::<f32>(0);
//!         for (o, i) in output[..noutput_items].iter_mut().zip(input) {
//!             *o = -*i;
//!         }
//!         io.consume_each(noutput_items);
//!         WorkResult::Produced(noutput_items)
//!     }
//! }
//!
//! let block = Negate {
//!     desc: BlockDescriptor::new("negate", &[4], &[4]),
//! };
//! assert_eq!(block.fixed_rate_noutput_to_ninput(10), 10);
//! ```

use crate::buffer::ConsumerHint;
use crate::error::BlockError;
use crate::item::{StreamItem, cast_slice, cast_slice_mut};
use crate::rate::RelativeRate;
use crate::tag::{Tag, TagPropagation};

/// Static metadata the executor reads on every call.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockDescriptor {
    name: String,
    input_item_sizes: Vec<usize>,
    output_item_sizes: Vec<usize>,
    history: usize,
    relative_rate: RelativeRate,
    fixed_rate: bool,
    output_multiple: usize,
    output_multiple_set: bool,
    alignment: usize,
    min_noutput_items: usize,
    max_noutput_items: Option<usize>,
    tag_propagation: TagPropagation,
}

impl BlockDescriptor {
    /// A 1:1 block with the given port item sizes (bytes), history 1 and
    /// all-to-all tag propagation.
    pub fn new(name: impl Into<String>, inputs: &[usize], outputs: &[usize]) -> Self {
        Self {
            name: name.into(),
            input_item_sizes: inputs.to_vec(),
            output_item_sizes: outputs.to_vec(),
            history: 1,
            relative_rate: RelativeRate::ONE,
            fixed_rate: false,
            output_multiple: 1,
            output_multiple_set: false,
            alignment: 1,
            min_noutput_items: 0,
            max_noutput_items: None,
            tag_propagation: TagPropagation::AllToAll,
        }
    }

    /// Sets the history (1 means no look-back).
    ///
    /// # Errors
    ///
    /// [`BlockError::ZeroHistory`] for 0.
    pub fn with_history(mut self, history: usize) -> Result<Self, BlockError> {
        if history == 0 {
            return Err(BlockError::ZeroHistory);
        }
        self.history = history;
        Ok(self)
    }

    /// Renames the block.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets an approximate relative rate (used for estimates only).
    pub fn with_relative_rate(mut self, rate: RelativeRate) -> Self {
        self.relative_rate = rate;
        self.fixed_rate = false;
        self
    }

    /// Sets an exact relative rate; the fixed-rate conversions apply.
    pub fn with_fixed_rate(mut self, rate: RelativeRate) -> Self {
        self.relative_rate = rate;
        self.fixed_rate = true;
        self
    }

    /// Requires output in multiples of `multiple` items.
    ///
    /// # Errors
    ///
    /// [`BlockError::ZeroOutputMultiple`] for 0.
    pub fn with_output_multiple(mut self, multiple: usize) -> Result<Self, BlockError> {
        if multiple == 0 {
            return Err(BlockError::ZeroOutputMultiple);
        }
        self.output_multiple = multiple;
        self.output_multiple_set = true;
        Ok(self)
    }

    /// Prefers output chunks aligned to `alignment` items. Ignored when an
    /// output multiple is set.
    ///
    /// # Errors
    ///
    /// [`BlockError::ZeroAlignment`] for 0.
    pub fn with_alignment(mut self, alignment: usize) -> Result<Self, BlockError> {
        if alignment == 0 {
            return Err(BlockError::ZeroAlignment);
        }
        self.alignment = alignment;
        Ok(self)
    }

    /// Smallest output request worth a call.
    pub fn with_min_noutput_items(mut self, min: usize) -> Self {
        self.min_noutput_items = min;
        self
    }

    /// Per-block cap on output items per call, overriding the executor default.
    pub fn with_max_noutput_items(mut self, max: usize) -> Self {
        self.max_noutput_items = Some(max.max(1));
        self
    }

    /// Builder form of [`set_tag_propagation`](Self::set_tag_propagation).
    pub fn with_tag_propagation(mut self, policy: TagPropagation) -> Result<Self, BlockError> {
        self.set_tag_propagation(policy)?;
        Ok(self)
    }

    /// Sets the tag propagation policy.
    ///
    /// # Errors
    ///
    /// [`BlockError::TagPortMismatch`] for [`TagPropagation::OneToOne`] when
    /// the block has different input and output port counts.
    pub fn set_tag_propagation(&mut self, policy: TagPropagation) -> Result<(), BlockError> {
        if policy == TagPropagation::OneToOne && self.ninputs() != self.noutputs() {
            return Err(BlockError::TagPortMismatch {
                ninputs: self.ninputs(),
                noutputs: self.noutputs(),
            });
        }
        self.tag_propagation = policy;
        Ok(())
    }

    /// Block name for logs and reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of input ports.
    pub fn ninputs(&self) -> usize {
        self.input_item_sizes.len()
    }

    /// Number of output ports.
    pub fn noutputs(&self) -> usize {
        self.output_item_sizes.len()
    }

    /// Item size in bytes per input port.
    pub fn input_item_sizes(&self) -> &[usize] {
        &self.input_item_sizes
    }

    /// Item size in bytes per output port.
    pub fn output_item_sizes(&self) -> &[usize] {
        &self.output_item_sizes
    }

    /// History (look-back is `history - 1` items).
    pub fn history(&self) -> usize {
        self.history
    }

    /// Output items per input item.
    pub fn relative_rate(&self) -> RelativeRate {
        self.relative_rate
    }

    /// True when the relative rate is exact.
    pub fn fixed_rate(&self) -> bool {
        self.fixed_rate
    }

    /// Output granularity (1 when unset).
    pub fn output_multiple(&self) -> usize {
        self.output_multiple
    }

    /// True if the output multiple was set explicitly.
    pub fn output_multiple_set(&self) -> bool {
        self.output_multiple_set
    }

    /// Preferred output alignment (1 when unset).
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Smallest output request worth a call.
    pub fn min_noutput_items(&self) -> usize {
        self.min_noutput_items
    }

    /// Per-block cap on output items per call, if any.
    pub fn max_noutput_items(&self) -> Option<usize> {
        self.max_noutput_items
    }

    /// Tag propagation policy.
    pub fn tag_propagation(&self) -> TagPropagation {
        self.tag_propagation
    }

    /// How this block consumes its inputs, for sizing the buffers feeding it.
    pub fn consumer_hint(&self) -> ConsumerHint {
        let rate = self.relative_rate;
        ConsumerHint {
            history: self.history,
            decimation: rate.decimation().div_ceil(rate.interpolation()).max(1),
            output_multiple: self.output_multiple,
        }
    }
}

/// Return convention of [`Block::general_work`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkResult {
    /// Produced this many items on every output.
    Produced(usize),
    /// The block recorded per-port production with [`WorkIo::produce`].
    CalledProduce,
    /// The block is permanently finished.
    Done,
}

/// One input port as seen during a work call.
pub struct InputPort<'a> {
    data: &'a [u8],
    item_size: usize,
    history: usize,
    nitems_read: u64,
    tags: Vec<Tag>,
}

impl<'a> InputPort<'a> {
    pub(crate) fn new(
        data: &'a [u8],
        item_size: usize,
        history: usize,
        nitems_read: u64,
        tags: Vec<Tag>,
    ) -> Self {
        Self {
            data,
            item_size,
            history,
            nitems_read,
            tags,
        }
    }

    /// Items in the window, look-back included.
    pub fn len(&self) -> usize {
        self.data.len() / self.item_size
    }

    /// True when the window is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Items past the look-back, i.e. the most that may be consumed.
    pub fn fresh(&self) -> usize {
        self.len().saturating_sub(self.history - 1)
    }

    /// Stream offset of the first fresh item (look-back items precede it).
    pub fn nitems_read(&self) -> u64 {
        self.nitems_read
    }

    /// Raw window bytes.
    pub fn bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Tags on the fresh items of this window, in offset order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }
}

/// One output port as seen during a work call.
pub struct OutputPort<'a> {
    data: &'a mut [u8],
    item_size: usize,
    nitems_written: u64,
}

impl<'a> OutputPort<'a> {
    pub(crate) fn new(data: &'a mut [u8], item_size: usize, nitems_written: u64) -> Self {
        Self {
            data,
            item_size,
            nitems_written,
        }
    }

    /// Writable items in the window.
    pub fn len(&self) -> usize {
        self.data.len() / self.item_size
    }

    /// True when the window is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Stream offset of the first item in the window.
    pub fn nitems_written(&self) -> u64 {
        self.nitems_written
    }

    /// Raw window bytes.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut *self.data
    }
}

/// Inputs, outputs and bookkeeping for one work call.
pub struct WorkIo<'a> {
    inputs: Vec<InputPort<'a>>,
    outputs: Vec<OutputPort<'a>>,
    consumed: Vec<usize>,
    produced: Vec<usize>,
    added_tags: Vec<Vec<Tag>>,
}

impl<'a> WorkIo<'a> {
    /// Wraps already-opened port windows.
    pub fn new(inputs: Vec<InputPort<'a>>, outputs: Vec<OutputPort<'a>>) -> Self {
        let (ni, no) = (inputs.len(), outputs.len());
        Self {
            inputs,
            outputs,
            consumed: vec![0; ni],
            produced: vec![0; no],
            added_tags: vec![Vec::new(); no],
        }
    }

    /// Number of input ports.
    pub fn ninputs(&self) -> usize {
        self.inputs.len()
    }

    /// Number of output ports.
    pub fn noutputs(&self) -> usize {
        self.outputs.len()
    }

    /// Input port `i`.
    pub fn input(&self, i: usize) -> &InputPort<'a> {
        &self.inputs[i]
    }

    /// Output port `i`.
    pub fn output(&mut self, i: usize) -> &mut OutputPort<'a> {
        &mut self.outputs[i]
    }

    /// Typed view of input `i`, look-back included. The slice outlives the
    /// borrow of `self`, so it can be held while writing outputs.
    pub fn input_items<T: StreamItem>(&self, i: usize) -> &'a [T] {
        cast_slice(self.inputs[i].data)
    }

    /// Typed view of output window `i`.
    pub fn output_items<T: StreamItem>(&mut self, i: usize) -> &mut [T] {
        cast_slice_mut(&mut *self.outputs[i].data)
    }

    /// Typed views of every output window at once.
    pub fn outputs_items<T: StreamItem>(&mut self) -> Vec<&mut [T]> {
        self.outputs
            .iter_mut()
            .map(|port| cast_slice_mut::<T>(&mut *port.data))
            .collect()
    }

    /// Records that `n` items of input `i` were consumed.
    pub fn consume(&mut self, i: usize, n: usize) {
        self.consumed[i] += n;
    }

    /// Records `n` consumed items on every input.
    pub fn consume_each(&mut self, n: usize) {
        for c in &mut self.consumed {
            *c += n;
        }
    }

    /// Records `n` produced items on output `o` (for [`WorkResult::CalledProduce`]).
    pub fn produce(&mut self, o: usize, n: usize) {
        self.produced[o] += n;
    }

    /// Attaches a tag to output `o` at an absolute offset.
    pub fn add_tag(&mut self, o: usize, tag: Tag) {
        self.added_tags[o].push(tag);
    }

    /// Items consumed so far, per input.
    pub fn consumed(&self) -> &[usize] {
        &self.consumed
    }

    /// Items produced via [`produce`](Self::produce) so far, per output.
    pub fn produced(&self) -> &[usize] {
        &self.produced
    }

    pub(crate) fn into_parts(self) -> IoOutcome {
        IoOutcome {
            consumed: self.consumed,
            produced: self.produced,
            added_tags: self.added_tags,
            input_tags: self.inputs.into_iter().map(|p| p.tags).collect(),
        }
    }
}

/// Bookkeeping left over after the port windows are released.
pub(crate) struct IoOutcome {
    pub(crate) consumed: Vec<usize>,
    pub(crate) produced: Vec<usize>,
    pub(crate) added_tags: Vec<Vec<Tag>>,
    pub(crate) input_tags: Vec<Vec<Tag>>,
}

/// A stream transform driven by a [`BlockExecutor`](crate::BlockExecutor).
pub trait Block: Send {
    /// Static metadata.
    fn descriptor(&self) -> &BlockDescriptor;

    /// Fills `ninput_items_required[i]` with the input items port `i` needs to
    /// produce `noutput_items`, look-back included.
    ///
    /// The default asks for `ceil(noutput_items / rate) + history - 1` on every
    /// port.
    fn forecast(&self, noutput_items: usize, ninput_items_required: &mut [usize]) {
        let desc = self.descriptor();
        let n = desc.relative_rate().inverse_ceil(noutput_items as u64) as usize + desc.history() - 1;
        ninput_items_required.fill(n);
    }

    /// Transforms input into at most `noutput_items` items per output.
    ///
    /// Every input holds at least what [`forecast`](Self::forecast) asked for.
    fn general_work(&mut self, noutput_items: usize, io: &mut WorkIo<'_>) -> WorkResult;

    /// Output items producible from `ninput_items` (look-back included).
    /// Only meaningful for fixed-rate blocks.
    fn fixed_rate_ninput_to_noutput(&self, ninput_items: usize) -> usize {
        let desc = self.descriptor();
        let usable = ninput_items.saturating_sub(desc.history() - 1);
        desc.relative_rate().scale_down(usable as u64) as usize
    }

    /// Input items (look-back included) needed for `noutput_items`.
    /// Only meaningful for fixed-rate blocks.
    fn fixed_rate_noutput_to_ninput(&self, noutput_items: usize) -> usize {
        let desc = self.descriptor();
        desc.relative_rate().inverse_ceil(noutput_items as u64) as usize + desc.history() - 1
    }

    /// Accepts or rejects the connected port counts.
    fn check_topology(&self, _ninputs: usize, _noutputs: usize) -> bool {
        true
    }

    /// Called once before the first work call.
    fn start(&mut self) -> bool {
        true
    }

    /// Called once after the last work call.
    fn stop(&mut self) -> bool {
        true
    }
}
