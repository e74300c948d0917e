//! Rivulet Blocks - reference stream blocks
//!
//! Small, well-understood blocks built on rivulet-core, used by tests,
//! benchmarks and the `rivulet` CLI:
//!
//! - [`VectorSource`] / [`VectorSink`] - Feed and capture typed items and tags
//! - [`NullSource`] / [`NullSink`] - Zeros in, everything discarded out
//! - [`Head`] - Pass the first N items, then finish
//! - [`CopyBlock`] - 1:1 byte copy with an enable switch
//! - [`KeepOneInN`] - Fixed-rate 1/N decimation without filtering
//! - [`Repeat`] - Fixed-rate N/1 interpolation by repetition
//! - [`FirDecimator`] - f32 FIR filter with integer decimation
//! - [`AddBlock`] - Element-wise sum of N inputs
//!
//! ## Example
//!
//! ```rust
//! use rivulet_blocks::{Head, NullSource, VectorSink};
//! use rivulet_core::{Block, BufferKind, ExecutorConfig, Scheduler, linear};
//!
//! let sink = VectorSink::<f32>::new();
//! let handle = sink.handle();
//! let blocks: Vec<Box<dyn Block>> = vec![
//!     Box::new(NullSource::new(4)),
//!     Box::new(Head::new(4, 1000)),
//!     Box::new(sink),
//! ];
//! let mut executors = linear(blocks, BufferKind::Auto, 32768, ExecutorConfig::default())?;
//! Scheduler::new().run(&mut executors)?;
//! assert_eq!(handle.len(), 1000);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod add;
pub mod copy;
pub mod fir;
pub mod head;
pub mod keep_one_in_n;
pub mod null;
pub mod repeat;
pub mod vector;

// Re-export main types at crate root
pub use add::AddBlock;
pub use copy::CopyBlock;
pub use fir::{FirDecimator, design_lowpass};
pub use head::Head;
pub use keep_one_in_n::KeepOneInN;
pub use null::{ItemCount, NullSink, NullSource};
pub use repeat::Repeat;
pub use vector::{SinkHandle, VectorSink, VectorSource};
