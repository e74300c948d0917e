//! Buffer creation for one block-to-block connection.
//!
//! The connection layer owns buffers and readers; executors borrow nothing
//! from each other. [`connect`] sizes one output port's buffer from the
//! consumers' descriptors and attaches one reader per consumer, ready to be
//! handed to the upstream and downstream executors.

use crate::block::{Block, BlockDescriptor};
use crate::buffer::{Buffer, BufferKind, BufferReader, BufferSizing, ConsumerHint};
use crate::error::{BufferError, ExecutorError};
use crate::executor::{BlockExecutor, ExecutorConfig};

/// A sized buffer and its attached readers, in consumer order.
#[derive(Debug)]
pub struct Connection {
    /// Writer side, for the upstream executor.
    pub buffer: Buffer,
    /// One reader per consumer, for the downstream executors.
    pub readers: Vec<BufferReader>,
}

/// Creates the buffer behind output `port` of `upstream` and attaches a reader
/// for each of `consumers`.
///
/// # Panics
///
/// Panics if `upstream` has no output `port`.
///
/// # Errors
///
/// Any [`BufferError`] from allocation or reader attachment.
pub fn connect(
    upstream: &BlockDescriptor,
    port: usize,
    consumers: &[&BlockDescriptor],
    kind: BufferKind,
    default_bytes: usize,
) -> Result<Connection, BufferError> {
    let item_size = upstream.output_item_sizes()[port];
    let hints: Vec<ConsumerHint> = consumers.iter().map(|c| c.consumer_hint()).collect();
    let sizing = BufferSizing::for_connection(default_bytes, upstream.output_multiple(), &hints);
    let buffer = Buffer::with_sizing(item_size, kind, &sizing)?;
    let readers = consumers
        .iter()
        .map(|c| buffer.add_reader(c.history()))
        .collect::<Result<Vec<_>, _>>()?;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "connect: {}:{port} -> {} consumers, {} items ({})",
        upstream.name(),
        readers.len(),
        buffer.capacity(),
        buffer.kind()
    );

    Ok(Connection { buffer, readers })
}

/// Connects `blocks` head to tail and wraps each in an executor.
///
/// The first block must be a source and the last a sink; every block in
/// between has exactly one input and one output. Executors come back in
/// chain order, ready for a scheduler.
///
/// # Errors
///
/// - [`ExecutorError::Topology`] if a block's ports do not fit a chain
/// - [`ExecutorError::Buffer`] if a connecting buffer cannot be created
pub fn linear(
    blocks: Vec<Box<dyn Block>>,
    kind: BufferKind,
    default_bytes: usize,
    config: ExecutorConfig,
) -> Result<Vec<BlockExecutor>, ExecutorError> {
    let mut executors = Vec::with_capacity(blocks.len());
    let mut pending_inputs = Vec::new();
    let mut blocks = blocks.into_iter().peekable();

    while let Some(block) = blocks.next() {
        let outputs = match blocks.peek() {
            Some(next) => {
                let desc = block.descriptor();
                if desc.noutputs() != 1 || next.descriptor().ninputs() != 1 {
                    return Err(ExecutorError::Topology {
                        block: desc.name().to_string(),
                        detail: format!(
                            "chain link to '{}' needs one output and one input",
                            next.descriptor().name()
                        ),
                    });
                }
                let conn = connect(desc, 0, &[next.descriptor()], kind, default_bytes).map_err(
                    |source| ExecutorError::Buffer {
                        block: desc.name().to_string(),
                        source,
                    },
                )?;
                let inputs = core::mem::replace(&mut pending_inputs, conn.readers);
                executors.push(BlockExecutor::new(block, inputs, vec![conn.buffer], config)?);
                continue;
            }
            None => Vec::new(),
        };
        let inputs = core::mem::take(&mut pending_inputs);
        executors.push(BlockExecutor::new(block, inputs, outputs, config)?);
    }
    Ok(executors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::RelativeRate;

    #[test]
    fn readers_carry_consumer_history() {
        let src = BlockDescriptor::new("src", &[], &[4]);
        let fir = BlockDescriptor::new("fir", &[4], &[4])
            .with_history(16)
            .unwrap()
            .with_fixed_rate(RelativeRate::decimate(3).unwrap());
        let sink = BlockDescriptor::new("sink", &[4], &[]);
        let conn = connect(&src, 0, &[&fir, &sink], BufferKind::SingleMapped, 4096).unwrap();
        assert_eq!(conn.readers.len(), 2);
        assert_eq!(conn.readers[0].history(), 16);
        assert_eq!(conn.readers[1].history(), 1);
        assert_eq!(conn.buffer.capacity() % 3, 0);
        assert_eq!(conn.buffer.item_size(), 4);
    }

    struct Stub(BlockDescriptor);

    impl Block for Stub {
        fn descriptor(&self) -> &BlockDescriptor {
            &self.0
        }

        fn general_work(
            &mut self,
            _noutput_items: usize,
            _io: &mut crate::block::WorkIo<'_>,
        ) -> crate::block::WorkResult {
            crate::block::WorkResult::Done
        }
    }

    #[test]
    fn linear_wires_chain_in_order() {
        let blocks: Vec<Box<dyn Block>> = vec![
            Box::new(Stub(BlockDescriptor::new("a", &[], &[4]))),
            Box::new(Stub(BlockDescriptor::new("b", &[4], &[4]))),
            Box::new(Stub(BlockDescriptor::new("c", &[4], &[]))),
        ];
        let executors =
            linear(blocks, BufferKind::SingleMapped, 4096, ExecutorConfig::default()).unwrap();
        let names: Vec<&str> = executors.iter().map(BlockExecutor::name).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(executors[0].outputs().len(), 1);
        assert_eq!(executors[1].inputs().len(), 1);
        assert!(executors[2].outputs().is_empty());
    }

    #[test]
    fn linear_rejects_sink_mid_chain() {
        let blocks: Vec<Box<dyn Block>> = vec![
            Box::new(Stub(BlockDescriptor::new("a", &[], &[4]))),
            Box::new(Stub(BlockDescriptor::new("sink", &[4], &[]))),
            Box::new(Stub(BlockDescriptor::new("c", &[4], &[]))),
        ];
        let err =
            linear(blocks, BufferKind::SingleMapped, 4096, ExecutorConfig::default()).unwrap_err();
        assert!(matches!(err, ExecutorError::Topology { block, .. } if block == "sink"));
    }
}
