//! Run the FIR decimation demo pipeline.
//!
//! `null source -> head -> lowpass FIR decimator -> null sink`

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use anyhow::Context;
use clap::{Args, ValueEnum};
use rivulet_blocks::{FirDecimator, Head, NullSink, NullSource};
use rivulet_config::{RuntimeConfig, SchedulerMode};
use rivulet_core::{Block, BufferKind, RunReport, Scheduler, ThreadedScheduler, linear};

use super::common::format_rate;

/// Buffer kind as spelled on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum BufferKindArg {
    Auto,
    Double,
    Single,
}

impl From<BufferKindArg> for BufferKind {
    fn from(arg: BufferKindArg) -> Self {
        match arg {
            BufferKindArg::Auto => BufferKind::Auto,
            BufferKindArg::Double => BufferKind::DoubleMapped,
            BufferKindArg::Single => BufferKind::SingleMapped,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Number of input items to push through the pipeline
    #[arg(long, default_value_t = 1_000_000)]
    items: u64,

    /// Decimation factor of the FIR stage
    #[arg(long, default_value_t = 4)]
    decimation: usize,

    /// Number of FIR taps (the FIR stage's history)
    #[arg(long, default_value_t = 63)]
    taps: usize,

    /// Buffer kind, overriding `[buffers] kind`
    #[arg(long, value_enum)]
    buffer_kind: Option<BufferKindArg>,

    /// Use the threaded scheduler, overriding `[scheduler] mode`
    #[arg(long)]
    threaded: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

/// Per-connection layout captured before the run.
struct Link {
    from: String,
    kind: BufferKind,
    backend: &'static str,
    capacity: usize,
}

pub fn run(args: RunArgs, config: &RuntimeConfig) -> anyhow::Result<()> {
    let kind = args
        .buffer_kind
        .map_or_else(|| config.buffer_kind(), BufferKind::from);
    let threaded = args.threaded || config.scheduler.mode == SchedulerMode::Threaded;

    let fir = FirDecimator::lowpass(args.decimation, args.taps)
        .context("building FIR decimator")?
        .with_name("fir");
    let sink = NullSink::new(4).with_name("sink");
    let count = sink.count();
    let blocks: Vec<Box<dyn Block>> = vec![
        Box::new(NullSource::new(4).with_name("source")),
        Box::new(Head::new(4, args.items).with_name("head")),
        Box::new(fir),
        Box::new(sink),
    ];

    let mut executors = linear(
        blocks,
        kind,
        config.buffers.default_bytes,
        config.executor_config(),
    )
    .context("connecting pipeline")?;

    let links: Vec<Link> = executors
        .iter()
        .flat_map(|ex| {
            ex.outputs().iter().map(move |buffer| {
                let stats = buffer.stats();
                Link {
                    from: ex.name().to_string(),
                    kind: stats.kind,
                    backend: stats.backend,
                    capacity: stats.capacity,
                }
            })
        })
        .collect();

    tracing::info!(
        "run: {} items, decimation {}, {} taps, {} scheduler",
        args.items,
        args.decimation,
        args.taps,
        if threaded { "threaded" } else { "single" }
    );

    let report = if threaded {
        ThreadedScheduler::new(config.scheduler_config()).run(executors)?
    } else {
        Scheduler::new().run(&mut executors)?
    };

    let output_items = count.get();
    if args.json {
        print_json(&args, threaded, &links, &report, output_items)?;
    } else {
        print_text(threaded, &links, &report, output_items);
    }
    Ok(())
}

fn throughput(items: u64, report: &RunReport) -> f64 {
    let secs = report.elapsed.as_secs_f64();
    if secs > 0.0 { items as f64 / secs } else { 0.0 }
}

fn print_text(threaded: bool, links: &[Link], report: &RunReport, output_items: u64) {
    let input_items = report
        .block("head")
        .map_or(0, |b| b.stats.items_produced);

    println!("Pipeline:    source -> head -> fir -> sink");
    println!(
        "Scheduler:   {}",
        if threaded { "threaded" } else { "single" }
    );
    println!("Input:       {input_items} items");
    println!("Output:      {output_items} items");
    println!("Elapsed:     {:.3} ms", report.elapsed.as_secs_f64() * 1e3);
    println!(
        "Throughput:  {}",
        format_rate(throughput(input_items, report))
    );
    println!();

    println!("Buffers:");
    for link in links {
        println!(
            "  {:8}  {:14}  {:10}  {} items",
            link.from,
            link.kind.to_string(),
            link.backend,
            link.capacity
        );
    }
    println!();

    println!(
        "  {:8}  {:>8}  {:>8}  {:>10}  {:>10}  {:>12}  {:>12}",
        "Block", "Calls", "Ready", "In-blocked", "Out-blocked", "Consumed", "Produced"
    );
    for block in &report.blocks {
        let s = &block.stats;
        println!(
            "  {:8}  {:>8}  {:>8}  {:>10}  {:>10}  {:>12}  {:>12}",
            block.name,
            s.calls,
            s.ready,
            s.blocked_on_input,
            s.blocked_on_output,
            s.items_consumed,
            s.items_produced
        );
    }
}

fn print_json(
    args: &RunArgs,
    threaded: bool,
    links: &[Link],
    report: &RunReport,
    output_items: u64,
) -> anyhow::Result<()> {
    let input_items = report
        .block("head")
        .map_or(0, |b| b.stats.items_produced);
    let json = serde_json::json!({
        "pipeline": {
            "items": args.items,
            "decimation": args.decimation,
            "taps": args.taps,
            "scheduler": if threaded { "threaded" } else { "single" },
        },
        "input_items": input_items,
        "output_items": output_items,
        "elapsed_secs": report.elapsed.as_secs_f64(),
        "items_per_sec": throughput(input_items, report),
        "buffers": links.iter().map(|l| serde_json::json!({
            "from": l.from,
            "kind": l.kind.to_string(),
            "backend": l.backend,
            "capacity": l.capacity,
        })).collect::<Vec<_>>(),
        "blocks": report.blocks.iter().map(|b| serde_json::json!({
            "name": b.name,
            "calls": b.stats.calls,
            "ready": b.stats.ready,
            "ready_no_output": b.stats.ready_no_output,
            "blocked_on_input": b.stats.blocked_on_input,
            "blocked_on_output": b.stats.blocked_on_output,
            "items_consumed": b.stats.items_consumed,
            "items_produced": b.stats.items_produced,
        })).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_kind_arg_maps_to_core() {
        assert_eq!(BufferKind::from(BufferKindArg::Auto), BufferKind::Auto);
        assert_eq!(
            BufferKind::from(BufferKindArg::Double),
            BufferKind::DoubleMapped
        );
        assert_eq!(
            BufferKind::from(BufferKindArg::Single),
            BufferKind::SingleMapped
        );
    }
}
