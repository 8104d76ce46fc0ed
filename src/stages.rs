use std::{fmt::{self, Display}, io::{Read, Write}, thread, time::{Duration, Instant}};

use indicatif::ProgressBar;
use log::{debug, info, trace, warn};

use crate::{
    cancel::CancelToken,
    chunk::Chunk,
    completion::CompletionSignal,
    handoff::{HandoffReceiver, HandoffSender, Received},
};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum StageKind {
    Source,
    Rechunk,
    Sink,
}

impl StageKind {
    /// Verb used in the summary line, e.g. "read 3 times".
    fn verb(&self) -> &'static str {
        match self {
            StageKind::Source => "read",
            StageKind::Rechunk => "rechunked",
            StageKind::Sink => "wrote",
        }
    }
}

impl Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Source => write!(f, "source"),
            StageKind::Rechunk => write!(f, "rechunk"),
            StageKind::Sink => write!(f, "sink"),
        }
    }
}

/// How a stage's loop ended.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Outcome {
    /// Ran to the end of its input.
    Completed,
    /// Stopped early because of an I/O error, described by the string.
    Failed(String),
    /// Stopped early because the pipeline was cancelled, or the next stage went away.
    Cancelled,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed => write!(f, "completed"),
            Outcome::Failed(e) => write!(f, "failed: {e}"),
            Outcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What a single stage did, returned when it finishes.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StageReport {
    pub stage: StageKind,
    /// Chunks taken in: successful reads for the source, received chunks for the other stages.
    pub chunks_in: u64,
    /// Chunks passed on: sent chunks for the source and rechunk stages, successful writes for the sink.
    pub chunks_out: u64,
    /// Bytes passed on (sent, or written for the sink).
    pub bytes: u64,
    /// For the sink this is measured from the arrival of the first chunk, so that it doesn't
    /// include time spent waiting for the upstream stages to get going.
    pub elapsed: Duration,
    pub outcome: Outcome,
}

impl StageReport {
    fn new(stage: StageKind) -> Self {
        StageReport {
            stage,
            chunks_in: 0,
            chunks_out: 0,
            bytes: 0,
            elapsed: Duration::ZERO,
            outcome: Outcome::Completed,
        }
    }

    /// Report for a stage that didn't manage to produce one of its own (e.g. its thread panicked).
    pub(crate) fn abnormal(stage: StageKind, reason: &str) -> Self {
        StageReport { outcome: Outcome::Failed(reason.to_string()), ..StageReport::new(stage) }
    }

    /// The count shown in the summary: reads for the source, chunks re-emitted for the rechunk
    /// stage and writes for the sink.
    pub fn operations(&self) -> u64 {
        match self.stage {
            StageKind::Source => self.chunks_in,
            StageKind::Rechunk | StageKind::Sink => self.chunks_out,
        }
    }

    fn log_summary(&self) {
        info!("{}: {} {} times", self.stage, self.stage.verb(), self.operations());
        info!("{}: finished in {:?}", self.stage, self.elapsed);
    }
}

/// Progression of the sink stage. Each run visits these in order, possibly skipping some,
/// and always finishes in Done exactly once.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SinkState {
    WaitingForFirstItem,
    Running,
    /// The upstream has closed but there are still chunks in the handoff to write.
    Draining,
    Done,
}

/// Works out the sink's state after it has received a chunk.
pub fn next_sink_state(current: SinkState, upstream_closed: bool, upstream_closed_and_empty: bool) -> SinkState {
    match current {
        SinkState::Done => SinkState::Done,
        _ if upstream_closed && !upstream_closed_and_empty => SinkState::Draining,
        SinkState::WaitingForFirstItem => SinkState::Running,
        s => s,
    }
}

fn set_sink_state(state: &mut SinkState, visited: &mut Vec<SinkState>, next: SinkState) {
    if *state != next {
        trace!("sink: {:?} -> {:?}", *state, next);
        *state = next;
        visited.push(next);
    }
}

fn sleep_for(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

/// Reads `chunk_size` bytes at a time from the source and sends each chunk to `output`,
/// sleeping for `delay` after every read to simulate a slow source.
///
/// Stops at the end of the source. A read error is treated the same as the end of the source
/// (no retries, whatever the kind of error), other than being recorded in the report.
/// The output is closed when the stage finishes, however it finishes.
pub fn run_source<R: Read, S: HandoffSender>(mut source: R, output: S, chunk_size: usize,
    delay: Duration, cancel: &CancelToken) -> StageReport
{
    debug!("source: starting, chunk size {chunk_size}");
    let start = Instant::now();
    let mut report = StageReport::new(StageKind::Source);
    let mut buf = vec![0; chunk_size];

    loop {
        if cancel.is_cancelled() {
            report.outcome = Outcome::Cancelled;
            break;
        }

        // A zero-length read means end of stream, as our buffer is never empty.
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!("Error reading from source after {} bytes: {}", report.bytes, e);
                report.outcome = Outcome::Failed(format!("Read failed: {e}"));
                break;
            }
        };
        report.chunks_in += 1;

        if let Err(e) = output.send(Chunk::copy_from(&buf[..n]), cancel) {
            debug!("source: stopping: {e}");
            report.outcome = Outcome::Cancelled;
            break;
        }
        report.chunks_out += 1;
        report.bytes += n as u64;
        trace!("source: sent chunk {} ({} bytes)", report.chunks_out, n);

        sleep_for(delay);
    }

    output.close();
    report.elapsed = start.elapsed();
    report.log_summary();
    report
}

/// Collects everything from `input` into one buffer, then once the input has closed, sends it on
/// to `output` split into chunks of `chunk_size` bytes (the last one may be shorter).
///
/// Nothing is sent on until the whole input has arrived, so downstream sees nothing until the
/// source has finished.
pub fn run_rechunk<I: HandoffReceiver, O: HandoffSender>(input: I, output: O, chunk_size: usize,
    cancel: &CancelToken) -> StageReport
{
    debug!("rechunk: starting, chunk size {chunk_size}");
    let start = Instant::now();
    let mut report = StageReport::new(StageKind::Rechunk);
    let mut buffer = Vec::new();

    loop {
        match input.recv(cancel) {
            Received::Item(c) => {
                report.chunks_in += 1;
                buffer.extend_from_slice(&c);
            }
            Received::Closed => break,
            Received::Cancelled => {
                report.outcome = Outcome::Cancelled;
                break;
            }
        }
    }
    drop(input);

    if report.outcome == Outcome::Completed {
        debug!("rechunk: buffered {} bytes from {} chunks", buffer.len(), report.chunks_in);
        for piece in buffer.chunks(chunk_size) {
            if let Err(e) = output.send(Chunk::copy_from(piece), cancel) {
                debug!("rechunk: stopping: {e}");
                report.outcome = Outcome::Cancelled;
                break;
            }
            report.chunks_out += 1;
            report.bytes += piece.len() as u64;
        }
    }

    output.close();
    report.elapsed = start.elapsed();
    report.log_summary();
    report
}

/// Writes every chunk from `input` to the sink, sleeping for `delay` before each write to
/// simulate a slow sink, until the input has closed and been drained.
///
/// A write error stops the stage straight away and cancels the rest of the pipeline, so that
/// upstream stages aren't left blocked forever. However it finishes, the stage fires `completion`
/// exactly once with its report.
///
/// Returns the states the stage went through, in order.
pub fn run_sink<W: Write, I: HandoffReceiver>(mut sink: W, input: I, delay: Duration,
    progress: &ProgressBar, cancel: &CancelToken, completion: CompletionSignal<StageReport>) -> Vec<SinkState>
{
    debug!("sink: starting");
    let mut report = StageReport::new(StageKind::Sink);
    let mut state = SinkState::WaitingForFirstItem;
    let mut visited = vec![state];
    let mut first_item_time = None;

    let mut outcome = loop {
        let chunk = match input.recv(cancel) {
            Received::Item(c) => c,
            Received::Closed => break Outcome::Completed,
            Received::Cancelled => break Outcome::Cancelled,
        };
        report.chunks_in += 1;
        if first_item_time.is_none() {
            first_item_time = Some(Instant::now());
        }
        let next = next_sink_state(state, input.is_closed(), input.is_closed_and_empty());
        set_sink_state(&mut state, &mut visited, next);

        sleep_for(delay);
        if let Err(e) = sink.write_all(&chunk) {
            warn!("Error writing to sink after {} bytes: {}", report.bytes, e);
            break Outcome::Failed(format!("Write failed: {e}"));
        }
        report.chunks_out += 1;
        report.bytes += chunk.len() as u64;
        progress.inc(chunk.len() as u64);
    };

    if outcome == Outcome::Completed {
        if let Err(e) = sink.flush() {
            warn!("Error flushing sink: {}", e);
            outcome = Outcome::Failed(format!("Flush failed: {e}"));
        }
    }
    if let Outcome::Failed(_) = outcome {
        cancel.cancel();
    }
    // Dropping our end disconnects the handoff, which also unblocks an upstream send
    drop(input);

    set_sink_state(&mut state, &mut visited, SinkState::Done);
    report.outcome = outcome;
    report.elapsed = first_item_time.map(|t| t.elapsed()).unwrap_or_default();
    report.log_summary();
    completion.signal(report);
    visited
}
