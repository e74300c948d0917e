//! Integration tests for rivulet-blocks.
//!
//! Runs multi-block chains through both schedulers and both buffer kinds and
//! checks that the results do not depend on how the work was chunked.

use rivulet_blocks::{
    CopyBlock, FirDecimator, Head, KeepOneInN, NullSink, NullSource, Repeat, VectorSink,
    VectorSource,
};
use rivulet_core::{
    Block, BlockExecutor, Buffer, BufferKind, BufferReader, Connection, ExecutorConfig, Scheduler,
    SchedulerConfig, Tag, TagValue, ThreadedScheduler, connect, linear,
};

// ============================================================================
// Helpers
// ============================================================================

fn ramp(len: usize) -> Vec<f32> {
    (0..len).map(|i| ((i % 97) as f32 - 48.0) / 48.0).collect()
}

/// source -> repeat x4 -> lowpass /4 -> keep 1 in 2 -> sink
fn resampling_chain(input: Vec<f32>) -> (Vec<Box<dyn Block>>, rivulet_blocks::SinkHandle<f32>) {
    let sink = VectorSink::<f32>::new();
    let handle = sink.handle();
    let blocks: Vec<Box<dyn Block>> = vec![
        Box::new(VectorSource::new(input)),
        Box::new(Repeat::<f32>::new(4).unwrap()),
        Box::new(FirDecimator::lowpass(4, 33).unwrap()),
        Box::new(KeepOneInN::<f32>::new(2).unwrap()),
        Box::new(sink),
    ];
    (blocks, handle)
}

fn run_single(blocks: Vec<Box<dyn Block>>, kind: BufferKind, bytes: usize) {
    let mut executors = linear(blocks, kind, bytes, ExecutorConfig::default()).unwrap();
    Scheduler::new().run(&mut executors).unwrap();
}

fn run_threaded(blocks: Vec<Box<dyn Block>>, kind: BufferKind, bytes: usize) {
    let executors = linear(blocks, kind, bytes, ExecutorConfig::default()).unwrap();
    ThreadedScheduler::new(SchedulerConfig::default())
        .run(executors)
        .unwrap();
}

// ============================================================================
// 1. Chains
// ============================================================================

#[test]
fn resampling_chain_is_chunking_independent() {
    let input = ramp(20_000);

    let (blocks, reference) = resampling_chain(input.clone());
    run_single(blocks, BufferKind::SingleMapped, 32 * 1024);
    let reference = reference.data();
    assert_eq!(reference.len(), 10_000);

    for (kind, bytes) in [
        (BufferKind::SingleMapped, 512),
        (BufferKind::Auto, 4096),
        (BufferKind::Auto, 64 * 1024),
    ] {
        let (blocks, handle) = resampling_chain(input.clone());
        run_single(blocks, kind, bytes);
        assert_eq!(handle.data(), reference, "{kind} / {bytes} bytes");

        let (blocks, handle) = resampling_chain(input.clone());
        run_threaded(blocks, kind, bytes);
        assert_eq!(handle.data(), reference, "threaded {kind} / {bytes} bytes");
    }
}

#[test]
fn null_chain_counts_through_threads() {
    let sink = NullSink::new(4);
    let count = sink.count();
    let blocks: Vec<Box<dyn Block>> = vec![
        Box::new(NullSource::new(4)),
        Box::new(Head::new(4, 1_000_000)),
        Box::new(FirDecimator::lowpass(8, 17).unwrap()),
        Box::new(sink),
    ];
    run_threaded(blocks, BufferKind::Auto, 32 * 1024);
    assert_eq!(count.get(), 125_000);
}

#[test]
fn tags_survive_mixed_rate_chain() {
    let source = VectorSource::new(vec![0.0f32; 1000]).with_tags(vec![
        Tag::new(0, "start", TagValue::Null),
        Tag::new(400, "mid", TagValue::Text("payload".into())),
    ]);
    let sink = VectorSink::<f32>::new();
    let handle = sink.handle();
    let blocks: Vec<Box<dyn Block>> = vec![
        Box::new(source),
        Box::new(Repeat::<f32>::new(3).unwrap()),
        Box::new(CopyBlock::new(4)),
        Box::new(KeepOneInN::<f32>::new(6).unwrap()),
        Box::new(sink),
    ];
    run_single(blocks, BufferKind::SingleMapped, 2048);

    assert_eq!(handle.len(), 500);
    let tags = handle.tags();
    let found: Vec<(&str, u64)> = tags.iter().map(|t| (t.key.as_str(), t.offset)).collect();
    assert_eq!(found, vec![("start", 0), ("mid", 200)]);
    assert_eq!(tags[1].value, TagValue::Text("payload".into()));
}

#[test]
fn head_stops_an_endless_source() {
    let sink = VectorSink::<u8>::new();
    let handle = sink.handle();
    let blocks: Vec<Box<dyn Block>> = vec![
        Box::new(VectorSource::new(vec![1u8, 2, 3]).repeating()),
        Box::new(Head::new(1, 10_000)),
        Box::new(sink),
    ];
    run_threaded(blocks, BufferKind::Auto, 4096);
    let data = handle.data();
    assert_eq!(data.len(), 10_000);
    assert!(data.chunks(3).all(|c| c.iter().zip([1u8, 2, 3]).all(|(a, b)| *a == b)));
}

#[test]
fn fan_out_keeps_flowing_after_head_branch_stops() {
    let data: Vec<u32> = (0..100_000).collect();
    for kind in [BufferKind::SingleMapped, BufferKind::Auto] {
        let source = VectorSource::new(data.clone());
        let head = Head::new(4, 10);
        let null = NullSink::new(4);
        let count = null.count();
        let sink = VectorSink::<u32>::new();
        let handle = sink.handle();

        let Connection { buffer: fanned, readers } = connect(
            source.descriptor(),
            0,
            &[head.descriptor(), sink.descriptor()],
            kind,
            4096,
        )
        .unwrap();
        let Connection { buffer: headed, readers: null_readers } =
            connect(head.descriptor(), 0, &[null.descriptor()], kind, 4096).unwrap();
        let mut readers = readers.into_iter();
        let build = |block: Box<dyn Block>, inputs: Vec<BufferReader>, outputs: Vec<Buffer>| {
            BlockExecutor::new(block, inputs, outputs, ExecutorConfig::default()).unwrap()
        };
        let mut executors = vec![
            build(Box::new(source), vec![], vec![fanned]),
            build(Box::new(head), readers.next().into_iter().collect(), vec![headed]),
            build(Box::new(null), null_readers, vec![]),
            build(Box::new(sink), readers.collect(), vec![]),
        ];

        Scheduler::new().run(&mut executors).unwrap();
        assert_eq!(count.get(), 10, "{kind}");
        assert_eq!(handle.data(), data, "{kind}");
    }
}
