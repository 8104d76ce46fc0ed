use std::{fmt::Debug, io::{Read, Write}, thread::{self, JoinHandle}, time::Duration};

use indicatif::ProgressBar;
use log::debug;

use crate::{
    cancel::CancelToken,
    completion::{self, CompletionWaiter},
    handoff::{ChannelHandoff, Handoff, QueueHandoff},
    shared_queue::WaitStrategy,
    stages::{self, Outcome, SinkState, StageKind, StageReport},
};

/// Size of each read from the source.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 100;
/// Size of the chunks that the rechunk stage splits its buffered data into.
pub const DEFAULT_RECHUNK_SIZE: usize = 20;
/// Artificial latency after each read, to simulate a slow source.
pub const DEFAULT_READ_DELAY: Duration = Duration::from_micros(10);
/// Artificial latency before each write, to simulate a slow sink.
pub const DEFAULT_WRITE_DELAY: Duration = Duration::from_micros(10);
/// Rendezvous: each send on a channel waits for the matching receive.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 0;

/// The two ways of connecting the stages together.
#[derive(Copy, Clone, PartialEq, Eq, Debug, clap::ValueEnum)]
pub enum Variant {
    /// Source -> channel -> rechunk -> channel -> sink. Sends block until the next stage is ready.
    Channel,
    /// Source -> shared queue -> sink. The source never blocks; the sink polls the queue.
    Queue,
}

#[derive(Clone)]
pub struct PipelineConfig {
    pub variant: Variant,
    pub read_chunk_size: usize,
    /// Only used by the channel variant.
    pub rechunk_size: usize,
    pub read_delay: Duration,
    pub write_delay: Duration,
    /// Only used by the channel variant.
    pub channel_capacity: usize,
    /// Only used by the queue variant.
    pub wait_strategy: WaitStrategy,
    /// Advanced by the sink as bytes are written. Hidden by default.
    pub progress: ProgressBar,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            variant: Variant::Channel,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            rechunk_size: DEFAULT_RECHUNK_SIZE,
            read_delay: DEFAULT_READ_DELAY,
            write_delay: DEFAULT_WRITE_DELAY,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            wait_strategy: WaitStrategy::Park,
            progress: ProgressBar::hidden(),
        }
    }
}

/// Reports from every stage of a finished pipeline.
#[derive(Clone, Debug)]
pub struct PipelineReport {
    pub source: StageReport,
    /// None if the pipeline had no rechunk stage.
    pub rechunk: Option<StageReport>,
    pub sink: StageReport,
}

impl PipelineReport {
    pub fn stages(&self) -> impl Iterator<Item = &StageReport> {
        std::iter::once(&self.source).chain(self.rechunk.iter()).chain(std::iter::once(&self.sink))
    }

    /// True if every stage ran to the end of its input.
    pub fn is_complete(&self) -> bool {
        self.stages().all(|s| s.outcome == Outcome::Completed)
    }
}

/// A running pipeline. Dropping this without calling `wait` leaves the stages running in the
/// background until they finish.
pub struct PipelineHandle {
    cancel: CancelToken,
    completion: CompletionWaiter<StageReport>,
    source_thread: JoinHandle<StageReport>,
    rechunk_thread: Option<JoinHandle<StageReport>>,
    sink_thread: JoinHandle<Vec<SinkState>>,
}

impl PipelineHandle {
    /// Asks every stage to stop as soon as possible. `wait` must still be called to collect the
    /// reports.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// True once the sink stage has finished (and so the whole pipeline has, or soon will).
    pub fn is_finished(&self) -> bool {
        self.sink_thread.is_finished()
    }

    /// Blocks until the sink signals completion, then collects the reports from every stage.
    pub fn wait(self) -> PipelineReport {
        let sink = match self.completion.wait() {
            Some(r) => r,
            None => {
                // The sink thread died without signalling, so make sure nothing upstream is left waiting for it
                self.cancel.cancel();
                StageReport::abnormal(StageKind::Sink, "Sink stage ended without signalling completion")
            }
        };
        // The report has already been delivered, so all that's left to get from this thread is
        // the states it went through
        if let Ok(states) = self.sink_thread.join() {
            debug!("Sink went through {:?}", states);
        }

        let source = join_stage(self.source_thread, StageKind::Source);
        let rechunk = self.rechunk_thread.map(|t| join_stage(t, StageKind::Rechunk));
        PipelineReport { source, rechunk, sink }
    }
}

fn join_stage(t: JoinHandle<StageReport>, stage: StageKind) -> StageReport {
    t.join().unwrap_or_else(|_| StageReport::abnormal(stage, "Stage thread panicked"))
}

fn spawn_stage<T: Send + 'static>(stage: StageKind, f: impl FnOnce() -> T + Send + 'static) -> Result<JoinHandle<T>, String> {
    thread::Builder::new().name(stage.to_string()).spawn(f)
        .map_err(|e| format!("Failed to spawn {stage} thread: {e}"))
}

/// Starts a pipeline copying from `source` to `sink`, connected as described by `config.variant`.
pub fn start<R, W>(source: R, sink: W, config: &PipelineConfig) -> Result<PipelineHandle, String>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    match config.variant {
        Variant::Channel => start_with(ChannelHandoff { capacity: config.channel_capacity },
            Some(config.rechunk_size), source, sink, config),
        Variant::Queue => start_with(QueueHandoff { wait: config.wait_strategy },
            None, source, sink, config),
    }
}

/// Starts a pipeline where every pair of adjacent stages is connected by the given kind of handoff.
/// If `rechunk_size` is provided, a rechunk stage is placed between the source and sink.
/// The `variant`, `rechunk_size`, `channel_capacity` and `wait_strategy` fields of `config` are ignored.
pub fn start_with<H, R, W>(handoff: H, rechunk_size: Option<usize>, source: R, sink: W,
    config: &PipelineConfig) -> Result<PipelineHandle, String>
where
    H: Handoff + Debug,
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    if config.read_chunk_size == 0 {
        return Err("Read chunk size must be greater than zero".to_string());
    }
    if rechunk_size == Some(0) {
        return Err("Rechunk size must be greater than zero".to_string());
    }

    debug!("Starting pipeline using {:?}, rechunk size {:?}", handoff, rechunk_size);

    let cancel = CancelToken::new();
    // If a later thread fails to start, make sure the ones already running give up
    let abort = |e: String| {
        cancel.cancel();
        e
    };
    let (completion_signal, completion) = completion::new();

    let (source_tx, source_rx) = handoff.open();
    let source_thread = {
        let cancel = cancel.clone();
        let chunk_size = config.read_chunk_size;
        let delay = config.read_delay;
        spawn_stage(StageKind::Source, move || stages::run_source(source, source_tx, chunk_size, delay, &cancel))
    }.map_err(abort)?;

    let (rechunk_thread, sink_rx) = match rechunk_size {
        Some(size) => {
            let (rechunk_tx, sink_rx) = handoff.open();
            let cancel = cancel.clone();
            let t = spawn_stage(StageKind::Rechunk, move || stages::run_rechunk(source_rx, rechunk_tx, size, &cancel))
                .map_err(abort)?;
            (Some(t), sink_rx)
        }
        None => (None, source_rx),
    };

    let sink_thread = {
        let cancel = cancel.clone();
        let delay = config.write_delay;
        let progress = config.progress.clone();
        spawn_stage(StageKind::Sink, move || stages::run_sink(sink, sink_rx, delay, &progress, &cancel, completion_signal))
    }.map_err(abort)?;

    Ok(PipelineHandle { cancel, completion, source_thread, rechunk_thread, sink_thread })
}

/// Runs a pipeline to completion. See `start`.
pub fn run<R, W>(source: R, sink: W, config: &PipelineConfig) -> Result<PipelineReport, String>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    Ok(start(source, sink, config)?.wait())
}
