//! Criterion benchmarks for stream buffers.
//!
//! Measures one write + one read of a fixed chunk through a buffer with a
//! single reader, for both memory strategies:
//!
//! - **Mirrored** - double-mapped pages, wrap is free
//! - **Flat** - single-mapped array, periodic compaction
//!
//! Run with: `cargo bench -p rivulet-core -- buffer/`
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rivulet_core::{Buffer, BufferKind};

const CAPACITY: usize = 16384;
const CHUNK_SIZES: &[usize] = &[64, 256, 1024, 4096];

// ---------------------------------------------------------------------------
// Write/read round trip
// ---------------------------------------------------------------------------

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer/round_trip");

    for (label, kind) in [
        ("mirrored", BufferKind::DoubleMapped),
        ("flat", BufferKind::SingleMapped),
    ] {
        let Ok(buffer) = Buffer::new(CAPACITY, 4, kind) else {
            continue;
        };
        let reader = buffer.add_reader(1).unwrap();

        for &chunk in CHUNK_SIZES {
            let data = vec![0.25f32; chunk];
            group.throughput(Throughput::Elements(chunk as u64));
            group.bench_with_input(BenchmarkId::new(label, chunk), &chunk, |b, &chunk| {
                b.iter(|| {
                    if buffer.space_available() < chunk {
                        buffer.output_blocked_callback(chunk, false);
                    }
                    buffer.write_items(black_box(&data));
                    black_box(reader.read_items::<f32>(chunk));
                });
            });
        }
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Window open/close without copying
// ---------------------------------------------------------------------------

fn bench_windows(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer/windows");

    let buffer = Buffer::new(CAPACITY, 4, BufferKind::Auto).unwrap();
    let reader = buffer.add_reader(8).unwrap();

    group.bench_function("write_then_read_256", |b| {
        b.iter(|| {
            let mut window = buffer.begin_write(256);
            black_box(window.as_bytes_mut());
            window.finish(256);
            let read = reader.begin_read();
            let fresh = read.len() - 7;
            black_box(read.as_bytes());
            read.finish(fresh);
            buffer.output_blocked_callback(256, false);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_round_trip, bench_windows);
criterion_main!(benches);
