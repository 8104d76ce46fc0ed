use std::{fs::File, io::Write, path::PathBuf, process::ExitCode};

use clap::Parser;
use env_logger::{Env, fmt::Color};
use indicatif::HumanBytes;
use log::{debug, error, info, warn};

use crate::{
    logger_and_progress::LoggerAndProgress,
    pipeline::{self, PipelineConfig, PipelineReport, Variant},
    shared_queue::WaitStrategy,
};

/// Exit code when the source file can't be opened.
const EXIT_SOURCE_OPEN_FAILED: u8 = 10;
/// Exit code when the destination file can't be created.
const EXIT_DEST_CREATE_FAILED: u8 = 11;
/// Exit code when the pipeline couldn't be started.
const EXIT_START_FAILED: u8 = 12;
/// Exit code when the pipeline ran, but at least one stage stopped early.
const EXIT_STAGE_FAILED: u8 = 13;

/// Copies a file to another file through a pipeline of reader, buffer and writer threads,
/// with an artificial delay on every read and write.
#[derive(clap::Parser, Debug)]
pub struct CliArgs {
    /// The file to read from.
    #[arg(default_value = "input.txt")]
    pub src: PathBuf,
    /// The file to write to. It is created if it doesn't exist, and truncated if it does.
    #[arg(default_value = "output.txt")]
    pub dest: PathBuf,

    /// How the reading and writing threads are connected.
    #[arg(value_enum, long, default_value_t=Variant::Channel)]
    pub variant: Variant,
    /// How the writing thread waits for more data. Only applies to the queue variant.
    #[arg(value_enum, long, default_value_t=WaitStrategy::Park)]
    pub wait: WaitStrategy,

    /// Outputs some additional statistics about each stage.
    #[arg(long)]
    pub stats: bool,
    /// Don't show the progress bar.
    #[arg(long)]
    pub no_progress: bool,
    /// Hides all output except warnings and errors.
    #[arg(short, long, group="verbosity")]
    pub quiet: bool,
    /// Shows additional output.
    #[arg(short, long, group="verbosity")]
    pub verbose: bool,
}

/// Sets up logging based on the --quiet/--verbose flags. RUST_LOG overrides these, which is
/// useful for seeing the trace output from individual stages.
fn init_logging(args: &CliArgs) -> &'static LoggerAndProgress<env_logger::Logger> {
    let args_level = match (args.quiet, args.verbose) {
        (true, false) => "warn",
        (false, true) => "debug",
        (false, false) => "info",
        (true, true) => panic!("Shouldn't be allowed by cmd args parser"),
    };
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(args_level));
    builder.format(|buf, record| {
        let target_color = match record.target() {
            "chunkpipe::stages" => Color::Cyan,
            "chunkpipe::pipeline" => Color::Rgb(255, 64, 255),
            "chunkpipe::frontend" => Color::Yellow,
            _ => Color::Green,
        };
        let target_style = buf.style().set_color(target_color).clone();

        let level_style = buf.default_level_style(record.level());

        if record.level() == log::Level::Info {
            // Info messages are the per-stage summaries that the user asked for, so keep them plain
            writeln!(
                buf,
                "{}",
                record.args()
            )
        } else {
            writeln!(
                buf,
                "{:5} | {}: {}",
                level_style.value(record.level()),
                target_style.value(record.target()),
                record.args()
            )
        }
    });

    let inner = builder.build();
    let max_level = inner.filter();
    let logger: &'static LoggerAndProgress<_> = Box::leak(Box::new(LoggerAndProgress::new(inner, !args.quiet && !args.no_progress)));
    log::set_logger(logger).expect("Logger already initialized");
    log::set_max_level(max_level);
    logger
}

pub fn frontend_main() -> ExitCode {
    let args = CliArgs::parse();
    let logger = init_logging(&args);

    let exit_code = transfer(&args, logger);

    logger.shutdown();
    ExitCode::from(exit_code)
}

fn transfer(args: &CliArgs, logger: &LoggerAndProgress<env_logger::Logger>) -> u8 {
    let src = match File::open(&args.src) {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to open source '{}': {}", args.src.display(), e);
            return EXIT_SOURCE_OPEN_FAILED;
        }
    };
    let src_len = src.metadata().ok().filter(|m| m.is_file()).map(|m| m.len());

    let dest = match File::create(&args.dest) {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to create destination '{}': {}", args.dest.display(), e);
            return EXIT_DEST_CREATE_FAILED;
        }
    };

    debug!("Copying '{}' => '{}' ({:?} variant, {} bytes)", args.src.display(), args.dest.display(),
        args.variant, src_len.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()));

    logger.start_transfer(src_len);
    let config = PipelineConfig {
        variant: args.variant,
        wait_strategy: args.wait,
        progress: logger.get_progress_bar().clone(),
        ..Default::default()
    };

    let report = match pipeline::run(src, dest, &config) {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to start pipeline: {}", e);
            return EXIT_START_FAILED;
        }
    };

    if args.stats {
        print_stats(&report);
    }

    exit_code_for(&report)
}

fn print_stats(report: &PipelineReport) {
    for s in report.stages() {
        let secs = s.elapsed.as_secs_f64();
        let rate = if secs > 0.0 { (s.bytes as f64 / secs) as u64 } else { 0 };
        info!("{}: {} chunks in, {} chunks out, {} ({}/s)", s.stage, s.chunks_in, s.chunks_out,
            HumanBytes(s.bytes), HumanBytes(rate));
    }
}

fn exit_code_for(report: &PipelineReport) -> u8 {
    if report.is_complete() {
        return 0;
    }
    for s in report.stages().filter(|s| s.outcome != crate::stages::Outcome::Completed) {
        warn!("The {} stage {}. The destination may be incomplete.", s.stage, s.outcome);
    }
    EXIT_STAGE_FAILED
}
