//! Error types for buffers, block metadata, the executor and the schedulers.
//!
//! Flow-control outcomes (blocked on input/output, ready without output) are
//! never errors; they are [`ExecutorState`](crate::ExecutorState) values.
//! Everything here is structural: retrying would spin forever.

use thiserror::Error;

/// Errors raised while creating or attaching to a buffer.
#[derive(Debug, Error)]
pub enum BufferError {
    /// No double-mapping backend could be set up on this platform.
    #[error("double-mapped buffers are unavailable: {reason}")]
    MappingUnavailable {
        /// Why the last backend failed.
        reason: String,
    },

    /// The operating system refused a mapping or allocation.
    #[error("failed to allocate {bytes} bytes of buffer memory: {source}")]
    Allocation {
        /// Requested size in bytes.
        bytes: usize,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Item size of zero.
    #[error("item size must be non-zero")]
    ZeroItemSize,

    /// Requested capacity of zero items.
    #[error("buffer capacity must be non-zero")]
    ZeroCapacity,

    /// A reader's look-back cannot fit in the buffer.
    #[error("reader history {history} does not fit in a buffer of {capacity} items")]
    HistoryExceedsCapacity {
        /// Reader history (items).
        history: usize,
        /// Buffer capacity (items).
        capacity: usize,
    },

    /// A reader was attached while data slices were outstanding.
    #[error("cannot attach a reader while the buffer has outstanding slices")]
    AttachWhileActive,
}

/// Configuration errors raised when block metadata is set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockError {
    /// One-to-one tag propagation needs matching port counts.
    #[error("one-to-one tag propagation needs ninputs == noutputs, got {ninputs} inputs and {noutputs} outputs")]
    TagPortMismatch {
        /// Number of input ports.
        ninputs: usize,
        /// Number of output ports.
        noutputs: usize,
    },

    /// A relative rate with a zero term.
    #[error("relative rate {interpolation}/{decimation} has a zero term")]
    ZeroRate {
        /// Numerator.
        interpolation: u64,
        /// Denominator.
        decimation: u64,
    },

    /// Output multiple of zero.
    #[error("output multiple must be at least 1")]
    ZeroOutputMultiple,

    /// Alignment of zero.
    #[error("alignment must be at least 1")]
    ZeroAlignment,

    /// History of zero (a block with no look-back has history 1).
    #[error("history must be at least 1")]
    ZeroHistory,
}

/// Fatal errors from one executor iteration. The executor is DONE afterwards.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// An input requirement can never be met by the attached buffer.
    #[error(
        "block '{block}' needs {required} items on input {port} but the buffer can never hold more than {max_possible}"
    )]
    UnsatisfiableInput {
        /// Block name.
        block: String,
        /// Input port index.
        port: usize,
        /// Items requested by `forecast`.
        required: usize,
        /// Structural ceiling of the input buffer.
        max_possible: usize,
    },

    /// A source was given output space and produced nothing.
    #[error("source block '{block}' produced no output")]
    SourceStalled {
        /// Block name.
        block: String,
    },

    /// The block broke the work contract.
    #[error("block '{block}' violated the work contract: {detail}")]
    ContractViolation {
        /// Block name.
        block: String,
        /// What went wrong.
        detail: String,
    },

    /// Port counts or item sizes do not match the attached buffers.
    #[error("block '{block}' rejected its topology: {detail}")]
    Topology {
        /// Block name.
        block: String,
        /// What went wrong.
        detail: String,
    },

    /// The buffer behind one of the block's outputs could not be created.
    #[error("block '{block}' has no usable output buffer: {source}")]
    Buffer {
        /// Block name.
        block: String,
        /// Allocation or attachment failure.
        #[source]
        source: BufferError,
    },

    /// The block's `start()` or `stop()` hook returned false.
    #[error("block '{block}' failed to {phase}")]
    Lifecycle {
        /// Block name.
        block: String,
        /// `"start"` or `"stop"`.
        phase: &'static str,
    },
}

/// Errors from the reference schedulers.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Every live block is blocked and nothing can make progress.
    #[error("deadlock: blocks {blocked:?} are blocked with no progress possible")]
    Deadlock {
        /// Names of the blocks still live when the deadlock was detected.
        blocked: Vec<String>,
    },

    /// A block failed fatally.
    #[error(transparent)]
    Block(#[from] ExecutorError),

    /// A block thread panicked.
    #[error("block thread '{block}' panicked")]
    Panicked {
        /// Block name.
        block: String,
    },
}
