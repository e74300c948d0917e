//! Reference drivers for a set of executors.
//!
//! - [`Scheduler`]: one thread, round-robin. A full sweep in which no block
//!   moves an item or finishes is a deadlock.
//! - [`ThreadedScheduler`]: one scoped thread per block with spin/yield/sleep
//!   backoff while blocked. A global progress counter that stays still for
//!   `stall_timeout` is a deadlock.
//!
//! Both call `start` on every block before the first iteration and `stop`
//! after the last, and both stop the whole run on the first fatal block error.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::SchedulerError;
use crate::executor::{BlockExecutor, ExecutorState, ExecutorStats};

/// Default threaded stall window.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Scheduler settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// How long the threaded scheduler tolerates zero progress.
    pub stall_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            stall_timeout: DEFAULT_STALL_TIMEOUT,
        }
    }
}

/// Final state of one block after a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockReport {
    /// Block name.
    pub name: String,
    /// Counters at the end of the run.
    pub stats: ExecutorStats,
}

/// Summary of a completed run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// One entry per block, in the order the executors were given.
    pub blocks: Vec<BlockReport>,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl RunReport {
    fn collect(executors: &[BlockExecutor], elapsed: Duration) -> Self {
        Self {
            blocks: executors
                .iter()
                .map(|ex| BlockReport {
                    name: ex.name().to_string(),
                    stats: ex.stats().clone(),
                })
                .collect(),
            elapsed,
        }
    }

    /// Report entry for `name`, if present.
    pub fn block(&self, name: &str) -> Option<&BlockReport> {
        self.blocks.iter().find(|b| b.name == name)
    }
}

fn start_all(executors: &mut [BlockExecutor]) -> Result<(), SchedulerError> {
    for ex in executors.iter_mut() {
        ex.start()?;
    }
    Ok(())
}

fn stop_all(executors: &mut [BlockExecutor]) -> Result<(), SchedulerError> {
    let mut first = Ok(());
    for ex in executors.iter_mut() {
        let stopped = ex.stop();
        if first.is_ok() {
            first = stopped.map_err(SchedulerError::from);
        }
    }
    first
}

/// Single-threaded round-robin driver.
#[derive(Clone, Copy, Debug, Default)]
pub struct Scheduler;

impl Scheduler {
    /// Creates a scheduler.
    pub fn new() -> Self {
        Self
    }

    /// Runs every executor until all are done.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Block`] on the first fatal executor error
    /// - [`SchedulerError::Deadlock`] if a sweep makes no progress
    pub fn run(&self, executors: &mut [BlockExecutor]) -> Result<RunReport, SchedulerError> {
        let started = Instant::now();
        start_all(executors)?;
        let driven = Self::drive(executors);
        let stopped = stop_all(executors);
        driven?;
        stopped?;
        let report = RunReport::collect(executors, started.elapsed());
        #[cfg(feature = "tracing")]
        tracing::info!(
            "scheduler_run: {} blocks finished in {:?}",
            report.blocks.len(),
            report.elapsed
        );
        Ok(report)
    }

    fn drive(executors: &mut [BlockExecutor]) -> Result<(), SchedulerError> {
        loop {
            let mut live = 0usize;
            let mut progress = false;
            for ex in executors.iter_mut().filter(|ex| !ex.is_done()) {
                live += 1;
                let before = ex.stats().items_moved();
                let state = ex.run_one()?;
                if matches!(state, ExecutorState::Ready | ExecutorState::Done)
                    || ex.stats().items_moved() != before
                {
                    progress = true;
                }
            }
            if live == 0 {
                return Ok(());
            }
            if !progress {
                let blocked: Vec<String> = executors
                    .iter()
                    .filter(|ex| !ex.is_done())
                    .map(|ex| ex.name().to_string())
                    .collect();
                #[cfg(feature = "tracing")]
                tracing::error!("scheduler_deadlock: {blocked:?}");
                return Err(SchedulerError::Deadlock { blocked });
            }
        }
    }
}

/// Escalating wait while a block is blocked: spin, then yield, then sleep.
struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_STEPS: u32 = 6;
    const YIELD_STEPS: u32 = 10;
    const MAX_SLEEP: Duration = Duration::from_millis(1);

    fn new() -> Self {
        Self { step: 0 }
    }

    fn reset(&mut self) {
        self.step = 0;
    }

    fn wait(&mut self) {
        if self.step < Self::SPIN_STEPS {
            for _ in 0..(1u32 << self.step) {
                std::hint::spin_loop();
            }
        } else if self.step < Self::YIELD_STEPS {
            std::thread::yield_now();
        } else {
            let exp = (self.step - Self::YIELD_STEPS).min(10);
            let sleep = Duration::from_micros(1u64 << exp).min(Self::MAX_SLEEP);
            std::thread::sleep(sleep);
        }
        self.step = self.step.saturating_add(1);
    }
}

/// State shared by all block threads of one threaded run.
struct Shared {
    progress: AtomicU64,
    stop: AtomicBool,
    live: Mutex<BTreeSet<String>>,
}

/// Raises the stop flag if a block thread unwinds.
struct StopOnPanic<'a>(&'a AtomicBool);

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.store(true, Ordering::Release);
        }
    }
}

/// One-thread-per-block driver.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadedScheduler {
    config: SchedulerConfig,
}

impl ThreadedScheduler {
    /// Creates a scheduler.
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Runs every executor on its own thread until all are done.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Panicked`] if a block thread panicked
    /// - [`SchedulerError::Block`] on the first fatal executor error
    /// - [`SchedulerError::Deadlock`] if no block made progress for the
    ///   configured stall timeout
    pub fn run(&self, mut executors: Vec<BlockExecutor>) -> Result<RunReport, SchedulerError> {
        let started = Instant::now();
        start_all(&mut executors)?;

        let shared = Shared {
            progress: AtomicU64::new(0),
            stop: AtomicBool::new(false),
            live: Mutex::new(executors.iter().map(|ex| ex.name().to_string()).collect()),
        };
        let stall_timeout = self.config.stall_timeout;

        let names: Vec<String> = executors.iter().map(|ex| ex.name().to_string()).collect();
        let joined: Vec<(String, std::thread::Result<(BlockExecutor, Result<(), SchedulerError>)>)> =
            std::thread::scope(|s| {
                let handles: Vec<_> = executors
                    .into_iter()
                    .map(|ex| {
                        let shared = &shared;
                        s.spawn(move || Self::block_thread(ex, shared, stall_timeout))
                    })
                    .collect();
                names
                    .into_iter()
                    .zip(handles)
                    .map(|(name, h)| (name, h.join()))
                    .collect()
            });

        let mut finished = Vec::with_capacity(joined.len());
        let mut panicked = None;
        let mut failure = None;
        for (name, outcome) in joined {
            match outcome {
                Ok((ex, result)) => {
                    if let Err(e) = result {
                        let replace = match (&failure, &e) {
                            (None, _) => true,
                            // A block error explains a deadlock seen by its neighbours.
                            (Some(SchedulerError::Deadlock { .. }), SchedulerError::Block(_)) => true,
                            _ => false,
                        };
                        if replace {
                            failure = Some(e);
                        }
                    }
                    finished.push(ex);
                }
                Err(_) => {
                    panicked.get_or_insert(SchedulerError::Panicked { block: name });
                }
            }
        }

        let stopped = stop_all(&mut finished);
        if let Some(e) = panicked.or(failure) {
            return Err(e);
        }
        stopped?;

        let report = RunReport::collect(&finished, started.elapsed());
        #[cfg(feature = "tracing")]
        tracing::info!(
            "threaded_run: {} blocks finished in {:?}",
            report.blocks.len(),
            report.elapsed
        );
        Ok(report)
    }

    fn block_thread(
        mut ex: BlockExecutor,
        shared: &Shared,
        stall_timeout: Duration,
    ) -> (BlockExecutor, Result<(), SchedulerError>) {
        let _guard = StopOnPanic(&shared.stop);
        let mut backoff = Backoff::new();
        let mut seen = shared.progress.load(Ordering::Acquire);
        let mut seen_at = Instant::now();

        let result = loop {
            if shared.stop.load(Ordering::Acquire) {
                break Ok(());
            }
            let before = ex.stats().items_moved();
            let state = match ex.run_one() {
                Ok(state) => state,
                Err(e) => {
                    shared.stop.store(true, Ordering::Release);
                    break Err(SchedulerError::Block(e));
                }
            };
            if state == ExecutorState::Done {
                shared.progress.fetch_add(1, Ordering::AcqRel);
                break Ok(());
            }
            if state == ExecutorState::Ready || ex.stats().items_moved() != before {
                shared.progress.fetch_add(1, Ordering::AcqRel);
                backoff.reset();
                continue;
            }

            let now = shared.progress.load(Ordering::Acquire);
            if now != seen {
                seen = now;
                seen_at = Instant::now();
            } else if seen_at.elapsed() >= stall_timeout {
                shared.stop.store(true, Ordering::Release);
                let blocked: Vec<String> = shared.live.lock().iter().cloned().collect();
                #[cfg(feature = "tracing")]
                tracing::error!("threaded_deadlock: no progress for {stall_timeout:?}, live {blocked:?}");
                break Err(SchedulerError::Deadlock { blocked });
            }
            backoff.wait();
        };

        shared.live.lock().remove(ex.name());
        (ex, result)
    }
}
