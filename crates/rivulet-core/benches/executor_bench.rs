//! Criterion benchmarks for the block executor and schedulers.
//!
//! Measures scheduling overhead with trivial blocks (zero source, copy,
//! discard sink) so buffer bookkeeping dominates:
//!
//! - **Single-threaded** - round-robin over all executors
//! - **Threaded** - one thread per block
//!
//! Run with: `cargo bench -p rivulet-core -- executor/`
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rivulet_core::{
    Block, BlockDescriptor, BlockExecutor, BufferKind, Connection, ExecutorConfig, Scheduler,
    SchedulerConfig, ThreadedScheduler, WorkIo, WorkResult, connect,
};

const TOTAL_ITEMS: &[u64] = &[100_000, 1_000_000];
const BUFFER_BYTES: usize = 32 * 1024;

// ---------------------------------------------------------------------------
// Trivial blocks
// ---------------------------------------------------------------------------

/// Emits `remaining` zeros.
struct Zeros {
    desc: BlockDescriptor,
    remaining: u64,
}

impl Block for Zeros {
    fn descriptor(&self) -> &BlockDescriptor {
        &self.desc
    }

    fn general_work(&mut self, noutput_items: usize, io: &mut WorkIo<'_>) -> WorkResult {
        if self.remaining == 0 {
            return WorkResult::Done;
        }
        let n = noutput_items.min(self.remaining as usize);
        io.output_items::<f32>(0)[..n].fill(0.0);
        self.remaining -= n as u64;
        WorkResult::Produced(n)
    }
}

/// Copies input to output.
struct Passthrough {
    desc: BlockDescriptor,
}

impl Block for Passthrough {
    fn descriptor(&self) -> &BlockDescriptor {
        &self.desc
    }

    fn general_work(&mut self, noutput_items: usize, io: &mut WorkIo<'_>) -> WorkResult {
        let input = io.input_items::<f32>(0);
        io.output_items::<f32>(0)[..noutput_items].copy_from_slice(&input[..noutput_items]);
        io.consume_each(noutput_items);
        WorkResult::Produced(noutput_items)
    }
}

/// Discards its input.
struct Discard {
    desc: BlockDescriptor,
}

impl Block for Discard {
    fn descriptor(&self) -> &BlockDescriptor {
        &self.desc
    }

    fn general_work(&mut self, noutput_items: usize, io: &mut WorkIo<'_>) -> WorkResult {
        io.consume_each(noutput_items);
        WorkResult::Produced(noutput_items)
    }
}

fn make_chain(total: u64, copies: usize) -> Vec<BlockExecutor> {
    let source = Zeros {
        desc: BlockDescriptor::new("zeros", &[], &[4]),
        remaining: total,
    };
    let config = ExecutorConfig::default();
    let mut executors = Vec::with_capacity(copies + 2);
    let mut upstream: Box<dyn Block> = Box::new(source);
    let mut upstream_inputs = Vec::new();

    for i in 0..=copies {
        let downstream: Box<dyn Block> = if i == copies {
            Box::new(Discard {
                desc: BlockDescriptor::new("discard", &[4], &[]),
            })
        } else {
            Box::new(Passthrough {
                desc: BlockDescriptor::new(format!("copy{i}"), &[4], &[4]),
            })
        };
        let Connection { buffer, readers } = connect(
            upstream.descriptor(),
            0,
            &[downstream.descriptor()],
            BufferKind::Auto,
            BUFFER_BYTES,
        )
        .unwrap();
        executors.push(BlockExecutor::new(upstream, upstream_inputs, vec![buffer], config).unwrap());
        upstream = downstream;
        upstream_inputs = readers;
    }
    executors.push(BlockExecutor::new(upstream, upstream_inputs, Vec::new(), config).unwrap());
    executors
}

// ---------------------------------------------------------------------------
// Pipeline throughput
// ---------------------------------------------------------------------------

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("executor/pipeline");
    group.sample_size(20);

    for &total in TOTAL_ITEMS {
        group.throughput(Throughput::Elements(total));

        group.bench_with_input(BenchmarkId::new("single_copy3", total), &total, |b, &total| {
            b.iter_batched(
                || make_chain(total, 3),
                |mut executors| Scheduler::new().run(&mut executors).unwrap(),
                criterion::BatchSize::LargeInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("threaded_copy3", total), &total, |b, &total| {
            b.iter_batched(
                || make_chain(total, 3),
                |executors| {
                    ThreadedScheduler::new(SchedulerConfig::default())
                        .run(executors)
                        .unwrap()
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
