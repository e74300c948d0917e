//! Single-iteration block executor.
//!
//! [`BlockExecutor::run_one`] decides how many output items one block can
//! produce right now, calls its transform once, and reports an
//! [`ExecutorState`]. It never waits: every kind of "not now" is a returned
//! state, so one thread can multiplex many executors.
//!
//! # Per-call algorithm
//!
//! | Block kind | Output count comes from |
//! |------------|-------------------------|
//! | source (no inputs) | free output space, rounded to the output multiple |
//! | sink (no outputs) | largest input backlog × relative rate |
//! | regular | output space, then the fixed-rate estimate, then alignment |
//!
//! The candidate count is then checked against `forecast`; infeasible requests
//! are halved (never below the output multiple) until the inputs suffice or
//! the block is declared blocked on input. The pure parts of this pipeline,
//! [`apply_alignment`] and [`shrink_to_feasible`], are exposed for testing.
//!
//! # Locking
//!
//! Input availability, done flags and output space are read under each
//! buffer's own lock and then used lock-free. No lock is held while the block
//! runs: the port windows are pinned instead.

use crate::block::{Block, BlockDescriptor, InputPort, OutputPort, WorkIo, WorkResult};
use crate::buffer::{Buffer, BufferReader, ReadWindow, WriteWindow};
use crate::error::ExecutorError;
use crate::math::{round_down, round_up};
use crate::tag::{Tag, route_tags};

/// Default cap on output items per call.
pub const DEFAULT_MAX_NOUTPUT_ITEMS: usize = 100_000;

/// Settings shared by every executor in a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Cap on output items per work call, unless the block overrides it.
    pub max_noutput_items: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_noutput_items: DEFAULT_MAX_NOUTPUT_ITEMS,
        }
    }
}

/// Outcome of one [`BlockExecutor::run_one`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutorState {
    /// Permanently finished.
    Done,
    /// No room downstream.
    BlockedOnOutput,
    /// Not enough input yet; more may arrive.
    BlockedOnInput,
    /// Produced at least one output item.
    Ready,
    /// Ran but produced nothing (typically consumed input); retry right away.
    ReadyNoOutput,
}

impl ExecutorState {
    /// True for the two blocked states.
    pub fn is_blocked(self) -> bool {
        matches!(self, Self::BlockedOnInput | Self::BlockedOnOutput)
    }
}

impl core::fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::Done => "done",
            Self::BlockedOnOutput => "blocked on output",
            Self::BlockedOnInput => "blocked on input",
            Self::Ready => "ready",
            Self::ReadyNoOutput => "ready (no output)",
        };
        f.write_str(s)
    }
}

/// Alignment carry-over between calls.
///
/// `unaligned` counts items still to produce before the output stream is
/// back on an alignment boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AlignmentState {
    /// Items left to reach the next boundary.
    pub unaligned: usize,
    /// True while recovering alignment.
    pub is_unaligned: bool,
}

/// Adjusts a positive output request for `alignment` and returns the request
/// together with the state to carry into the next call.
///
/// - Recovering and `n >= unaligned`: finish the recovery plus whole aligned
///   chunks; alignment is restored.
/// - Recovering and `n < unaligned`: produce `n`, shrink the carry.
/// - Aligned and `n < alignment`: produce `n`, start recovering the shortfall.
/// - Aligned otherwise: round down to the alignment.
///
/// The short-request cases still hand out `n` rather than rounding down to
/// nothing, matching GNU Radio: a block that can only ever see fewer than
/// `alignment` items would otherwise never run again.
///
/// The returned state assumes all `n` items get produced. The executor may
/// shrink the request afterwards, so it recomputes the carry from the count
/// actually produced with [`advance_alignment`].
pub fn apply_alignment(
    noutput_items: usize,
    alignment: usize,
    state: AlignmentState,
) -> (usize, AlignmentState) {
    if noutput_items == 0 {
        return (0, state);
    }
    if state.is_unaligned {
        if noutput_items >= state.unaligned {
            let n = state.unaligned + round_down(noutput_items - state.unaligned, alignment);
            (n, AlignmentState::default())
        } else {
            (
                noutput_items,
                AlignmentState {
                    unaligned: state.unaligned - noutput_items,
                    is_unaligned: true,
                },
            )
        }
    } else if noutput_items < alignment {
        (
            noutput_items,
            AlignmentState {
                unaligned: alignment - noutput_items,
                is_unaligned: true,
            },
        )
    } else {
        (round_down(noutput_items, alignment), state)
    }
}

/// Carry-over after `produced` more items, starting from `state`.
///
/// Keeps `(items produced so far + unaligned) % alignment == 0`.
pub fn advance_alignment(
    state: AlignmentState,
    produced: usize,
    alignment: usize,
) -> AlignmentState {
    if produced == 0 || alignment <= 1 {
        return state;
    }
    let carry = if state.is_unaligned { state.unaligned } else { 0 };
    let unaligned = if produced <= carry {
        carry - produced
    } else {
        (alignment - (produced - carry) % alignment) % alignment
    };
    AlignmentState {
        unaligned,
        is_unaligned: unaligned > 0,
    }
}

/// Halves `noutput_items` (rounding up to `output_multiple`) until
/// `is_feasible` accepts it.
///
/// Returns `Ok(n)` for the first accepted count, or `Err(n)` with the last
/// count tried once no further shrinking is possible. Every count tried is
/// strictly smaller than the previous one and never below `output_multiple`,
/// so the loop runs at most `log2(noutput_items / output_multiple) + 1` times.
pub fn shrink_to_feasible(
    noutput_items: usize,
    output_multiple: usize,
    mut is_feasible: impl FnMut(usize) -> bool,
) -> Result<usize, usize> {
    let floor = output_multiple.max(1);
    let mut n = noutput_items;
    loop {
        if is_feasible(n) {
            return Ok(n);
        }
        if n <= floor {
            return Err(n);
        }
        n = round_up(n / 2, floor).max(floor);
    }
}

/// Per-executor counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    /// `run_one` calls.
    pub calls: u64,
    /// Calls that returned [`ExecutorState::Ready`].
    pub ready: u64,
    /// Calls that returned [`ExecutorState::ReadyNoOutput`].
    pub ready_no_output: u64,
    /// Calls that returned [`ExecutorState::BlockedOnInput`].
    pub blocked_on_input: u64,
    /// Calls that returned [`ExecutorState::BlockedOnOutput`].
    pub blocked_on_output: u64,
    /// Items consumed, summed over inputs.
    pub items_consumed: u64,
    /// Items produced, summed over outputs.
    pub items_produced: u64,
}

impl ExecutorStats {
    fn record(&mut self, state: ExecutorState) {
        match state {
            ExecutorState::Ready => self.ready += 1,
            ExecutorState::ReadyNoOutput => self.ready_no_output += 1,
            ExecutorState::BlockedOnInput => self.blocked_on_input += 1,
            ExecutorState::BlockedOnOutput => self.blocked_on_output += 1,
            ExecutorState::Done => {}
        }
    }

    /// Items moved in either direction; grows whenever the block made progress.
    pub fn items_moved(&self) -> u64 {
        self.items_consumed + self.items_produced
    }
}

enum OutputSpace {
    Items(usize),
    DownstreamDone,
}

enum Plan {
    Run(usize),
    Stop(ExecutorState),
}

/// Descriptor values read once per call.
#[derive(Clone, Copy)]
struct CallParams {
    history: usize,
    output_multiple: usize,
    output_multiple_set: bool,
    alignment: usize,
    min_noutput_items: usize,
    fixed_rate: bool,
}

impl CallParams {
    fn from_descriptor(desc: &BlockDescriptor) -> Self {
        Self {
            history: desc.history(),
            output_multiple: desc.output_multiple(),
            output_multiple_set: desc.output_multiple_set(),
            alignment: desc.alignment(),
            min_noutput_items: desc.min_noutput_items().max(1),
            fixed_rate: desc.fixed_rate(),
        }
    }
}

/// Drives one block against its input readers and output buffers.
pub struct BlockExecutor {
    block: Box<dyn Block>,
    name: String,
    inputs: Vec<BufferReader>,
    outputs: Vec<Buffer>,
    max_noutput_items: usize,
    alignment: AlignmentState,
    required: Vec<usize>,
    done: bool,
    stats: ExecutorStats,
}

impl BlockExecutor {
    /// Binds `block` to its ports.
    ///
    /// # Errors
    ///
    /// [`ExecutorError::Topology`] if the port counts, item sizes or reader
    /// histories disagree with the block's descriptor, or the block's
    /// `check_topology` refuses them.
    pub fn new(
        block: Box<dyn Block>,
        inputs: Vec<BufferReader>,
        outputs: Vec<Buffer>,
        config: ExecutorConfig,
    ) -> Result<Self, ExecutorError> {
        let desc = block.descriptor();
        let name = desc.name().to_string();
        let topology = |detail: String| ExecutorError::Topology {
            block: name.clone(),
            detail,
        };

        if inputs.len() != desc.ninputs() || outputs.len() != desc.noutputs() {
            return Err(topology(format!(
                "declares {} inputs and {} outputs, connected to {} and {}",
                desc.ninputs(),
                desc.noutputs(),
                inputs.len(),
                outputs.len()
            )));
        }
        if !block.check_topology(inputs.len(), outputs.len()) {
            return Err(topology(format!(
                "refused {} inputs and {} outputs",
                inputs.len(),
                outputs.len()
            )));
        }
        for (i, (reader, &size)) in inputs.iter().zip(desc.input_item_sizes()).enumerate() {
            if reader.item_size() != size {
                return Err(topology(format!(
                    "input {i} expects {size}-byte items, buffer holds {}",
                    reader.item_size()
                )));
            }
            if reader.history() != desc.history() {
                return Err(topology(format!(
                    "input {i} reader has history {}, block needs {}",
                    reader.history(),
                    desc.history()
                )));
            }
        }
        for (o, (buffer, &size)) in outputs.iter().zip(desc.output_item_sizes()).enumerate() {
            if buffer.item_size() != size {
                return Err(topology(format!(
                    "output {o} produces {size}-byte items, buffer holds {}",
                    buffer.item_size()
                )));
            }
        }

        let multiple = desc.output_multiple();
        let max = desc
            .max_noutput_items()
            .unwrap_or(config.max_noutput_items);
        let max_noutput_items = round_down(max, multiple).max(multiple);
        let ninputs = inputs.len();

        Ok(Self {
            block,
            name,
            inputs,
            outputs,
            max_noutput_items,
            alignment: AlignmentState::default(),
            required: vec![0; ninputs],
            done: false,
            stats: ExecutorStats::default(),
        })
    }

    /// Block name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The driven block.
    pub fn block(&self) -> &dyn Block {
        self.block.as_ref()
    }

    /// Input readers, in port order.
    pub fn inputs(&self) -> &[BufferReader] {
        &self.inputs
    }

    /// Output buffers, in port order.
    pub fn outputs(&self) -> &[Buffer] {
        &self.outputs
    }

    /// True once the executor has returned [`ExecutorState::Done`] or an error.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Counters so far.
    pub fn stats(&self) -> &ExecutorStats {
        &self.stats
    }

    /// Current alignment carry-over.
    pub fn alignment_state(&self) -> AlignmentState {
        self.alignment
    }

    /// Effective per-call output cap.
    pub fn max_noutput_items(&self) -> usize {
        self.max_noutput_items
    }

    /// Runs the block's `start` hook.
    pub fn start(&mut self) -> Result<(), ExecutorError> {
        if self.block.start() {
            Ok(())
        } else {
            Err(ExecutorError::Lifecycle {
                block: self.name.clone(),
                phase: "start",
            })
        }
    }

    /// Runs the block's `stop` hook.
    pub fn stop(&mut self) -> Result<(), ExecutorError> {
        if self.block.stop() {
            Ok(())
        } else {
            Err(ExecutorError::Lifecycle {
                block: self.name.clone(),
                phase: "stop",
            })
        }
    }

    /// Forces the executor to DONE and signals neighbours.
    pub fn mark_done(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        for out in &self.outputs {
            out.set_done(true);
        }
        for reader in &self.inputs {
            reader.set_done();
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("executor_done: {} after {} calls", self.name, self.stats.calls);
    }

    /// Attempts one batch of work.
    ///
    /// A fatal error forces the executor to DONE before it is returned.
    ///
    /// # Panics
    ///
    /// Panics if called after the executor is done.
    pub fn run_one(&mut self) -> Result<ExecutorState, ExecutorError> {
        assert!(!self.done, "run_one called on finished block '{}'", self.name);
        self.stats.calls += 1;
        let result = self.step();
        match &result {
            Ok(state) => {
                self.stats.record(*state);
                if *state == ExecutorState::Done {
                    self.mark_done();
                }
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::error!("executor_fatal: {_e}");
                self.mark_done();
            }
        }
        result
    }

    fn step(&mut self) -> Result<ExecutorState, ExecutorError> {
        let params = CallParams::from_descriptor(self.block.descriptor());
        let rate = self.block.descriptor().relative_rate();
        let max_items = self.max_noutput_items;
        let multiple = params.output_multiple;

        let mut available = Vec::with_capacity(self.inputs.len());
        let mut input_done = Vec::with_capacity(self.inputs.len());
        for reader in &self.inputs {
            let guard = reader.lock();
            available.push(guard.items_available());
            input_done.push(guard.done());
        }
        let max_items_avail = available.iter().copied().max().unwrap_or(0);

        let noutput_items = if self.inputs.is_empty() {
            match self.output_space(params, max_items) {
                OutputSpace::DownstreamDone => return Ok(ExecutorState::Done),
                OutputSpace::Items(0) => return Ok(ExecutorState::BlockedOnOutput),
                OutputSpace::Items(n) => n,
            }
        } else if self.outputs.is_empty() {
            let lookback = params.history - 1;
            for (&avail, &done) in available.iter().zip(&input_done) {
                if avail.saturating_sub(lookback) < multiple && done {
                    return Ok(ExecutorState::Done);
                }
            }
            let fresh = max_items_avail.saturating_sub(lookback);
            let n = round_down(rate.scale_down(fresh as u64) as usize, multiple).min(max_items);
            if n == 0 {
                return Ok(if input_done.iter().any(|&d| d) {
                    ExecutorState::Done
                } else {
                    ExecutorState::BlockedOnInput
                });
            }
            match self.plan_inputs(n, multiple, &available, &input_done)? {
                Plan::Run(n) => n,
                Plan::Stop(state) => return Ok(state),
            }
        } else {
            let mut n = match self.output_space(params, max_items) {
                OutputSpace::DownstreamDone => return Ok(ExecutorState::Done),
                OutputSpace::Items(0) => return Ok(ExecutorState::BlockedOnOutput),
                OutputSpace::Items(n) => n,
            };
            if params.fixed_rate {
                let mut wanted = self.block.fixed_rate_ninput_to_noutput(max_items_avail);
                if params.output_multiple_set {
                    wanted = round_down(wanted, multiple);
                }
                if wanted > 0 && wanted <= n {
                    n = wanted;
                }
            }
            if !params.output_multiple_set {
                n = apply_alignment(n, params.alignment, self.alignment).0;
            }
            match self.plan_inputs(n, multiple, &available, &input_done)? {
                Plan::Run(n) => n,
                Plan::Stop(state) => return Ok(state),
            }
        };

        let (state, produced) = self.call_work(noutput_items, &available)?;
        if !self.inputs.is_empty() && !self.outputs.is_empty() && !params.output_multiple_set {
            self.alignment = advance_alignment(self.alignment, produced, params.alignment);
        }
        Ok(state)
    }

    /// Smallest usable space across live outputs, rounded to the output
    /// multiple and capped at half of each buffer so producer and consumer
    /// overlap.
    ///
    /// An output whose readers have all finished takes whatever is written and
    /// drops it; once every output is in that state the block is done.
    fn output_space(&self, params: CallParams, max_items: usize) -> OutputSpace {
        let multiple = params.output_multiple;
        let mut n = max_items;
        let mut live = 0;
        for out in &self.outputs {
            let mut guard = out.lock();
            if guard.downstream_done() {
                n = n.min(round_down(out.capacity(), multiple).max(multiple));
                continue;
            }
            live += 1;
            let mut avail = round_down(guard.space_available(), multiple);
            if avail < params.min_noutput_items && guard.output_blocked_callback(multiple, false) {
                avail = round_down(guard.space_available(), multiple);
            }
            let best = round_down(out.capacity() / 2, multiple).max(multiple);
            let usable = avail.min(best);
            if usable < params.min_noutput_items {
                return OutputSpace::Items(0);
            }
            n = n.min(usable);
        }
        if live == 0 {
            return OutputSpace::DownstreamDone;
        }
        OutputSpace::Items(n)
    }

    fn plan_inputs(
        &mut self,
        noutput_items: usize,
        multiple: usize,
        available: &[usize],
        input_done: &[bool],
    ) -> Result<Plan, ExecutorError> {
        let block = &self.block;
        let required = &mut self.required;
        let fits = shrink_to_feasible(noutput_items, multiple, |n| {
            block.forecast(n, required);
            required.iter().zip(available).all(|(r, a)| r <= a)
        });
        if let Ok(n) = fits {
            return Ok(Plan::Run(n));
        }

        // `required` still holds the forecast for the last count tried.
        for (i, (&need, &avail)) in self.required.iter().zip(available).enumerate() {
            if need <= avail {
                continue;
            }
            if input_done[i] {
                return Ok(Plan::Stop(ExecutorState::Done));
            }
            let reader = &self.inputs[i];
            let max_possible = reader.max_possible_items_available();
            if need > max_possible {
                return Err(ExecutorError::UnsatisfiableInput {
                    block: self.name.clone(),
                    port: i,
                    required: need,
                    max_possible,
                });
            }
            reader.input_blocked_callback(need);
            return Ok(Plan::Stop(ExecutorState::BlockedOnInput));
        }
        Ok(Plan::Stop(ExecutorState::BlockedOnInput))
    }

    /// Runs the block once; also returns the largest count produced on any
    /// output.
    fn call_work(
        &mut self,
        noutput_items: usize,
        available: &[usize],
    ) -> Result<(ExecutorState, usize), ExecutorError> {
        for out in &self.outputs {
            if out.space_available() < noutput_items {
                return Ok((ExecutorState::BlockedOnOutput, 0));
            }
        }

        let read_windows: Vec<ReadWindow<'_>> =
            self.inputs.iter().map(BufferReader::begin_read).collect();
        let mut write_windows: Vec<WriteWindow<'_>> = self
            .outputs
            .iter()
            .map(|b| b.begin_write(noutput_items))
            .collect();

        let mut start_nitems_read = Vec::with_capacity(read_windows.len());
        let mut fresh = Vec::with_capacity(read_windows.len());
        let mut ports = Vec::with_capacity(read_windows.len());
        for ((window, reader), &avail) in read_windows.iter().zip(&self.inputs).zip(available) {
            let size = reader.item_size();
            let n = avail.min(window.len());
            let n_fresh = n.saturating_sub(reader.history() - 1);
            let start = window.nitems_read();
            let tags = reader.tags_in_range(start, start + n_fresh as u64);
            ports.push(InputPort::new(
                &window.as_bytes()[..n * size],
                size,
                reader.history(),
                start,
                tags,
            ));
            start_nitems_read.push(start);
            fresh.push(n_fresh);
        }
        let offsets: Vec<u64> = write_windows.iter().map(WriteWindow::first_offset).collect();
        let out_ports: Vec<OutputPort<'_>> = write_windows
            .iter_mut()
            .zip(&offsets)
            .zip(&self.outputs)
            .map(|((window, &offset), buffer)| {
                OutputPort::new(window.as_bytes_mut(), buffer.item_size(), offset)
            })
            .collect();

        let mut io = WorkIo::new(ports, out_ports);
        let result = self.block.general_work(noutput_items, &mut io);
        let outcome = io.into_parts();

        let produced = match result {
            WorkResult::Produced(n) => vec![n; self.outputs.len()],
            WorkResult::CalledProduce | WorkResult::Done => outcome.produced,
        };
        for (i, (&c, &f)) in outcome.consumed.iter().zip(&fresh).enumerate() {
            if c > f {
                return Err(ExecutorError::ContractViolation {
                    block: self.name.clone(),
                    detail: format!("consumed {c} items on input {i} with {f} available"),
                });
            }
        }
        for (o, &p) in produced.iter().enumerate() {
            if p > noutput_items {
                return Err(ExecutorError::ContractViolation {
                    block: self.name.clone(),
                    detail: format!("produced {p} items on output {o}, at most {noutput_items} allowed"),
                });
            }
        }

        // Tags on the consumed spans move downstream per the block's policy.
        let consumed_tags: Vec<Vec<Tag>> = outcome
            .input_tags
            .into_iter()
            .zip(&start_nitems_read)
            .zip(&outcome.consumed)
            .map(|((tags, &start), &c)| {
                tags.into_iter()
                    .filter(|t| t.offset < start + c as u64)
                    .collect()
            })
            .collect();
        let desc = self.block.descriptor();
        let routed = route_tags(
            desc.tag_propagation(),
            desc.relative_rate(),
            &consumed_tags,
            self.outputs.len(),
        );
        for ((buffer, added), routed) in self.outputs.iter().zip(outcome.added_tags).zip(routed) {
            for tag in added.into_iter().chain(routed) {
                buffer.add_tag(tag);
            }
        }

        for (window, &c) in read_windows.into_iter().zip(&outcome.consumed) {
            window.finish(c);
        }
        for (window, &p) in write_windows.into_iter().zip(&produced) {
            window.finish(p);
        }

        self.stats.items_consumed += outcome.consumed.iter().sum::<usize>() as u64;
        self.stats.items_produced += produced.iter().sum::<usize>() as u64;

        let most = produced.iter().copied().max().unwrap_or(0);
        if result == WorkResult::Done {
            return Ok((ExecutorState::Done, most));
        }
        if most > 0 {
            return Ok((ExecutorState::Ready, most));
        }
        if self.inputs.is_empty() {
            return Err(ExecutorError::SourceStalled {
                block: self.name.clone(),
            });
        }
        Ok((ExecutorState::ReadyNoOutput, 0))
    }
}

impl core::fmt::Debug for BlockExecutor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlockExecutor")
            .field("name", &self.name)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("done", &self.done)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_rounds_down_when_aligned() {
        let (n, state) = apply_alignment(37, 8, AlignmentState::default());
        assert_eq!(n, 32);
        assert_eq!(state, AlignmentState::default());
    }

    #[test]
    fn alignment_short_request_starts_recovery() {
        let (n, state) = apply_alignment(5, 8, AlignmentState::default());
        assert_eq!(n, 5);
        assert_eq!(
            state,
            AlignmentState {
                unaligned: 3,
                is_unaligned: true
            }
        );
    }

    #[test]
    fn alignment_recovery_finishes_with_enough_items() {
        let carry = AlignmentState {
            unaligned: 3,
            is_unaligned: true,
        };
        let (n, state) = apply_alignment(20, 8, carry);
        assert_eq!(n, 3 + 16);
        assert!(!state.is_unaligned);
    }

    #[test]
    fn alignment_recovery_shrinks_carry() {
        let carry = AlignmentState {
            unaligned: 6,
            is_unaligned: true,
        };
        let (n, state) = apply_alignment(4, 8, carry);
        assert_eq!(n, 4);
        assert_eq!(state.unaligned, 2);
        assert!(state.is_unaligned);
    }

    #[test]
    fn advance_tracks_shrunk_requests() {
        // Planned 8 aligned, produced only 4.
        let state = advance_alignment(AlignmentState::default(), 4, 8);
        assert_eq!(
            state,
            AlignmentState {
                unaligned: 4,
                is_unaligned: true
            }
        );
        let state = advance_alignment(state, 2, 8);
        assert_eq!(state.unaligned, 2);
        let state = advance_alignment(state, 2 + 16, 8);
        assert_eq!(state, AlignmentState::default());
        let state = advance_alignment(state, 3 + 16, 8);
        assert_eq!(state.unaligned, 5);
    }

    #[test]
    fn advance_agrees_with_apply() {
        let mut state = AlignmentState::default();
        for request in [37, 5, 2, 1, 20, 64, 3, 11] {
            let (n, planned) = apply_alignment(request, 8, state);
            state = advance_alignment(state, n, 8);
            assert_eq!(state, planned, "request {request}");
        }
    }

    #[test]
    fn shrink_halves_to_multiple() {
        let mut tried = Vec::new();
        let result = shrink_to_feasible(100, 4, |n| {
            tried.push(n);
            n <= 13
        });
        assert_eq!(result, Ok(8));
        assert_eq!(tried, vec![100, 52, 28, 16, 8]);
    }

    #[test]
    fn shrink_reports_floor_when_infeasible() {
        assert_eq!(shrink_to_feasible(64, 8, |_| false), Err(8));
        assert_eq!(shrink_to_feasible(1, 1, |_| false), Err(1));
    }

    #[test]
    fn stats_count_states() {
        let mut stats = ExecutorStats::default();
        stats.record(ExecutorState::Ready);
        stats.record(ExecutorState::BlockedOnInput);
        stats.record(ExecutorState::BlockedOnInput);
        assert_eq!(stats.ready, 1);
        assert_eq!(stats.blocked_on_input, 2);
    }
}
