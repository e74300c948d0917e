//! Rivulet Core - block execution engine and stream buffers
//!
//! This crate runs streaming signal-processing graphs: blocks connected by
//! typed, rate-matched streams, each driven one iteration at a time by an
//! executor that works out how much the block can do right now.
//!
//! # Core Abstractions
//!
//! ## Buffers
//!
//! - [`Buffer`] - Single-writer, multi-reader ring of fixed-size items
//! - [`BufferReader`] - Independent read cursor with look-back (`history`)
//! - [`BufferKind`] - Double-mapped (mirrored pages) or single-mapped (compacting)
//! - [`BufferSizing`] - Capacity policy from consumer granularity and page size
//!
//! ## Blocks
//!
//! - [`Block`] - Object-safe block contract (`forecast`, `general_work`, rates)
//! - [`BlockDescriptor`] - Ports, history, rate, multiples, tag policy
//! - [`WorkIo`] - Port windows and consume/produce bookkeeping for one call
//!
//! ## Execution
//!
//! - [`BlockExecutor`] - Single-iteration state machine returning [`ExecutorState`]
//! - [`Scheduler`] / [`ThreadedScheduler`] - Reference drivers with deadlock detection
//!
//! ## Tags
//!
//! - [`Tag`] - Offset-indexed stream annotation
//! - [`TagPropagation`] - None, all-to-all, or one-to-one routing
//!
//! # Example
//!
//! ```rust
//! use rivulet_core::{Buffer, BufferKind};
//!
//! let buffer = Buffer::new(1024, 4, BufferKind::Auto)?;
//! let reader = buffer.add_reader(1)?;
//!
//! buffer.write_items(&[1.0f32, 2.0, 3.0]);
//! assert_eq!(reader.items_available(), 3);
//! assert_eq!(reader.read_items::<f32>(8), vec![1.0, 2.0, 3.0]);
//! # Ok::<(), rivulet_core::BufferError>(())
//! ```
//!
//! # Features
//!
//! - `tracing` (default) - `debug!` logs for sizing, compaction and state
//!   transitions, `error!` for fatal block errors.
//!
//! # Design Principles
//!
//! - **Never blocks**: waiting is a returned state, never a sleep or a condvar
//! - **Flat windows**: blocks always see contiguous slices, never a wrap
//! - **Explicit state**: alignment carry-over and feasibility are pure functions

pub mod block;
pub mod buffer;
pub mod connect;
pub mod error;
pub mod executor;
pub mod item;
pub mod math;
pub mod rate;
pub mod scheduler;
pub mod tag;

pub use block::{Block, BlockDescriptor, InputPort, OutputPort, WorkIo, WorkResult};
pub use buffer::{
    Buffer, BufferGuard, BufferKind, BufferReader, BufferSizing, BufferStats, ConsumerHint,
    DoubleMappedRegion, ReadWindow, ReaderGuard, WriteWindow, page_size,
};
pub use connect::{Connection, connect, linear};
pub use error::{BlockError, BufferError, ExecutorError, SchedulerError};
pub use executor::{
    AlignmentState, BlockExecutor, DEFAULT_MAX_NOUTPUT_ITEMS, ExecutorConfig, ExecutorState,
    ExecutorStats, advance_alignment, apply_alignment, shrink_to_feasible,
};
pub use item::{StreamItem, as_bytes, cast_slice, cast_slice_mut};
pub use math::{gcd, granularity_items, lcm, round_down, round_up};
pub use rate::RelativeRate;
pub use scheduler::{
    BlockReport, DEFAULT_STALL_TIMEOUT, RunReport, Scheduler, SchedulerConfig, ThreadedScheduler,
};
pub use tag::{Tag, TagPropagation, TagValue, route_tags};
