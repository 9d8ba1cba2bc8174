use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;
use xxhash_rust::xxh3::xxh3_64;

use blkz_codecs::codec_by_name;
use blkz_core::error::{EXIT_IO, EXIT_USAGE};
use blkz_core::filter::{self, DEFAULT_FILTER_CHUNK, DEFAULT_PLANES};
use blkz_core::format::{FrameReader, HEADER_LEN};
use blkz_core::{
    BlockFilter, BlockOptions, Compressor, Decompressor, Direction, PipelineConfig, PipelineError,
    DEFAULT_BLOCK_SIZE,
};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "blkz",
    about = "Parallel block compressor for blkz frame streams",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); logs go to stderr
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
    /// Do not print the run summary
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a stream into blkz frames
    Compress {
        /// Source file ("-" reads stdin)
        #[arg(default_value = "-")]
        input: PathBuf,
        /// Destination file ("-" writes stdout)
        #[arg(default_value = "-")]
        output: PathBuf,
        #[command(flatten)]
        stream: StreamArgs,
        /// Compression level (zstd 1-22, deflate 0-9)
        #[arg(long)]
        level: Option<i32>,
        /// Worker threads (default: two per CPU)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Favour speed over ratio
        #[arg(long)]
        fast: bool,
    },
    /// Decompress a blkz frame stream back to raw bytes
    Decompress {
        /// Source file ("-" reads stdin)
        #[arg(default_value = "-")]
        input: PathBuf,
        /// Destination file ("-" writes stdout)
        #[arg(default_value = "-")]
        output: PathBuf,
        #[command(flatten)]
        stream: StreamArgs,
    },
    /// Walk the frame sequence and print statistics
    Inspect {
        /// blkz stream ("-" reads stdin)
        #[arg(default_value = "-")]
        input: PathBuf,
        /// Largest block the stream may contain
        #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: usize,
        /// Print per-frame details
        #[arg(long)]
        frames: bool,
    },
    /// Run a standalone reversible filter over a stream
    Filter {
        /// Filter to apply
        kind: FilterKind,
        /// Source file ("-" reads stdin)
        #[arg(default_value = "-")]
        input: PathBuf,
        /// Destination file ("-" writes stdout)
        #[arg(default_value = "-")]
        output: PathBuf,
        /// Undo the filter instead of applying it
        #[arg(short, long)]
        reverse: bool,
        /// Byte planes for the byteplane filter
        #[arg(long, default_value_t = DEFAULT_PLANES)]
        planes: usize,
        /// Chunk size; byteplane output can only be reversed with the same value
        #[arg(long, default_value_t = DEFAULT_FILTER_CHUNK)]
        chunk: usize,
    },
}

/// Settings both directions must agree on.
#[derive(clap::Args)]
struct StreamArgs {
    /// Codec: zstd | lz4 | deflate | passthrough
    #[arg(short, long, default_value = "zstd")]
    codec: String,
    /// Raw bytes per block (max 8189)
    #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,
    /// Per-block filter applied before compression
    #[arg(long, value_enum, default_value_t = FilterKind::None)]
    filter: FilterKind,
    /// Byte planes for --filter byteplane
    #[arg(long, default_value_t = DEFAULT_PLANES)]
    planes: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterKind {
    None,
    Delta,
    Byteplane,
}

impl FilterKind {
    fn to_block_filter(self, planes: usize) -> BlockFilter {
        match self {
            FilterKind::None => BlockFilter::None,
            FilterKind::Delta => BlockFilter::Delta,
            FilterKind::Byteplane => BlockFilter::BytePlane(planes),
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_logging(level: &str) -> anyhow::Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => anyhow::bail!("unknown log level '{}'", other),
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_thread_names(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("installing log subscriber")?;
    Ok(())
}

fn is_stdio(path: &Path) -> bool {
    path.to_str() == Some("-")
}

fn open_input(path: &Path) -> anyhow::Result<Box<dyn Read>> {
    if is_stdio(path) {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("opening input file {:?}", path))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: &Path) -> anyhow::Result<Box<dyn Write>> {
    if is_stdio(path) {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    }
    let file = File::create(path).with_context(|| format!("creating output file {:?}", path))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn throughput(bytes: u64, elapsed: f64) -> String {
    if elapsed <= 0.0 {
        return "n/a".to_string();
    }
    format!("{}/s", human_bytes((bytes as f64 / elapsed) as u64))
}

/// Map an error to the process exit status for its kind.
fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<PipelineError>() {
        return e.exit_code();
    }
    if err.downcast_ref::<io::Error>().is_some() {
        return EXIT_IO;
    }
    EXIT_USAGE
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_compress(
    input: PathBuf,
    output: PathBuf,
    stream: StreamArgs,
    level: Option<i32>,
    workers: Option<usize>,
    fast: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let codec = codec_by_name(&stream.codec, level)?;
    let codec_display = codec.name();
    let mut config = PipelineConfig::default()
        .with_block_size(stream.block_size)
        .with_filter(stream.filter.to_block_filter(stream.planes));
    if let Some(workers) = workers {
        config = config.with_workers(workers);
    }
    if fast {
        config = config.with_options(BlockOptions::FAST);
    }
    let compressor = Compressor::new(codec, config)?;

    let src = open_input(&input)?;
    let dst = open_output(&output)?;

    let t0 = Instant::now();
    let summary = compressor.compress(src, dst)?;
    let elapsed = t0.elapsed().as_secs_f64();

    if !quiet {
        eprintln!("  codec       : {}", codec_display);
        eprintln!("  block size  : {}", human_bytes(stream.block_size as u64));
        eprintln!("  workers     : {} (peak {})", summary.workers, summary.peak_in_flight);
        eprintln!("  blocks      : {} ({} stored)", summary.blocks, summary.stored_blocks);
        eprintln!("  raw size    : {}", human_bytes(summary.raw_bytes));
        eprintln!("  compressed  : {}", human_bytes(summary.compressed_bytes));
        eprintln!("  ratio       : {:.2}x", summary.ratio());
        eprintln!("  reorder max : {}", summary.peak_reorder_depth);
        eprintln!("  throughput  : {}", throughput(summary.raw_bytes, elapsed));
        eprintln!("  elapsed     : {:.3}s", elapsed);
    }
    Ok(())
}

fn run_decompress(input: PathBuf, output: PathBuf, stream: StreamArgs, quiet: bool) -> anyhow::Result<()> {
    let codec = codec_by_name(&stream.codec, None)?;
    let config = PipelineConfig::default()
        .with_block_size(stream.block_size)
        .with_filter(stream.filter.to_block_filter(stream.planes));
    let decompressor = Decompressor::new(codec, config)?;

    let src = open_input(&input)?;
    let dst = open_output(&output)?;

    let t0 = Instant::now();
    let summary = decompressor.decompress(src, dst)?;
    let elapsed = t0.elapsed().as_secs_f64();

    if !quiet {
        eprintln!("  frames      : {} ({} stored)", summary.frames, summary.stored_frames);
        eprintln!("  compressed  : {}", human_bytes(summary.compressed_bytes));
        eprintln!("  raw size    : {}", human_bytes(summary.raw_bytes));
        eprintln!("  throughput  : {}", throughput(summary.raw_bytes, elapsed));
        eprintln!("  elapsed     : {:.3}s", elapsed);
    }
    Ok(())
}

fn run_inspect(input: PathBuf, block_size: usize, show_frames: bool) -> anyhow::Result<()> {
    PipelineConfig::default().with_block_size(block_size).validate()?;
    let src = open_input(&input)?;
    let mut reader = FrameReader::new(src, block_size);

    let mut offset = 0u64;
    let mut stored = 0u64;
    let mut payload_total = 0u64;
    let mut largest = 0usize;

    println!("=== blkz stream: {:?} ===", input);
    if show_frames {
        println!();
        println!(
            "  {:>8}  {:>12}  {:>6}  {:>8}  {:>16}",
            "frame", "offset", "flags", "payload", "checksum"
        );
        println!("  {}", "-".repeat(58));
    }

    loop {
        let index = reader.frames_read();
        let frame = match reader.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => return Err(PipelineError::frame(index, e).into()),
        };
        if frame.is_stored() {
            // Validates the sub-length even when not printing.
            frame
                .stored_literal(block_size)
                .map_err(|e| PipelineError::frame(index, e))?;
            stored += 1;
        }
        if show_frames {
            println!(
                "  {:>8}  {:>12}  {:>#6x}  {:>8}  {:016x}",
                index,
                offset,
                frame.options.bits(),
                frame.payload.len(),
                xxh3_64(&frame.payload)
            );
        }
        offset += (HEADER_LEN + frame.payload.len()) as u64;
        payload_total += frame.payload.len() as u64;
        largest = largest.max(frame.payload.len());
    }

    let frames = reader.frames_read();
    println!();
    println!("  frames         : {}", frames);
    println!("  stored frames  : {}", stored);
    println!("  stream size    : {}", human_bytes(offset));
    println!("  payload bytes  : {}", human_bytes(payload_total));
    println!("  header bytes   : {}", human_bytes(frames * HEADER_LEN as u64));
    println!("  largest frame  : {} B", largest);
    Ok(())
}

fn run_filter(
    kind: FilterKind,
    input: PathBuf,
    output: PathBuf,
    reverse: bool,
    planes: usize,
    chunk: usize,
) -> anyhow::Result<()> {
    let direction = if reverse {
        Direction::Reverse
    } else {
        Direction::Forward
    };
    let src = open_input(&input)?;
    let dst = open_output(&output)?;
    let total = filter::run_stream(kind.to_block_filter(planes), direction, chunk, src, dst)?;
    debug!(bytes = total, "filter finished");
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let quiet = cli.quiet;
    match cli.command {
        Commands::Compress {
            input,
            output,
            stream,
            level,
            workers,
            fast,
        } => run_compress(input, output, stream, level, workers, fast, quiet),
        Commands::Decompress {
            input,
            output,
            stream,
        } => run_decompress(input, output, stream, quiet),
        Commands::Inspect {
            input,
            block_size,
            frames,
        } => run_inspect(input, block_size, frames),
        Commands::Filter {
            kind,
            input,
            output,
            reverse,
            planes,
            chunk,
        } => run_filter(kind, input, output, reverse, planes, chunk),
    }
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logging(&cli.log_level) {
        eprintln!("blkz: {:#}", err);
        return ExitCode::from(EXIT_USAGE);
    }
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("blkz: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}
