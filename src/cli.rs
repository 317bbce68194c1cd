// Command-line interface for voxpack.
//
// Subcommands wrap the `io` helpers: encode a keyed JSON voxel map into an
// artifact, decode it back, inspect an artifact's header and metadata, and
// print the build configuration.

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::compress::artifact::CompressedArtifact;
use crate::compress::encoder::{CompressOptions, Compressor};
use crate::compress::entropy::{Algorithm, BROTLI_MAX_LEVEL, DEFAULT_LEVEL, GZIP_MAX_LEVEL};
use crate::compress::stream;
use crate::io::{self as fileio, IoError};

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Sparse voxel map compressor.
#[derive(Parser, Debug)]
#[command(
    name = "voxpack",
    version,
    about = "Voxel map compressor (spatial sort + delta + varint + entropy)",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compress a keyed JSON voxel map into an artifact.
    Encode(EncodeArgs),
    /// Decompress an artifact into a keyed JSON voxel map.
    Decode(DecodeArgs),
    /// Print an artifact's header and metadata.
    Inspect(InspectArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AlgorithmArg {
    Brotli,
    Gzip,
    None,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Brotli => Algorithm::Brotli,
            AlgorithmArg::Gzip => Algorithm::Gzip,
            AlgorithmArg::None => Algorithm::None,
        }
    }
}

#[derive(Args, Debug)]
struct EncodeTuningArgs {
    /// Entropy backend.
    #[arg(long, short = 'a', value_enum, default_value_t = AlgorithmArg::Brotli)]
    algorithm: AlgorithmArg,

    /// Backend quality level (brotli 0-11, gzip 0-9).
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(0..=11), default_value_t = DEFAULT_LEVEL)]
    level: u32,

    /// Store absolute positions instead of sorted deltas (implies --no-varint).
    #[arg(long = "no-delta")]
    no_delta: bool,

    /// Store fixed-width records instead of varints.
    #[arg(long = "no-varint")]
    no_varint: bool,

    /// Disable block-id run-length coding.
    #[arg(long = "no-rle")]
    no_rle: bool,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Input voxel map (`{"x,y,z": id, ...}`).
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output artifact (`.json` for the document form, otherwise binary).
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// JSON block-type dictionary stored in the artifact.
    #[arg(long, value_hint = ValueHint::FilePath)]
    blocks: Option<PathBuf>,

    /// JSON entity payload stored in the artifact.
    #[arg(long, value_hint = ValueHint::FilePath)]
    entities: Option<PathBuf>,

    #[command(flatten)]
    tuning: EncodeTuningArgs,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Input artifact (binary or JSON document).
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output voxel map.
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Artifact to inspect.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Check whether the artifact is still fresh against this voxel map.
    #[arg(long, value_hint = ValueHint::FilePath)]
    source: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Encode,
    Decode,
    Inspect,
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    algorithm: Algorithm,
    level: u32,
    use_delta: bool,
    use_varint: bool,
    rle_block_ids: bool,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    blocks_file: Option<PathBuf>,
    entities_file: Option<PathBuf>,
    source_file: Option<PathBuf>,
}

impl Options {
    fn new(command: Command, cli: &Cli) -> Self {
        Self {
            command,
            force: cli.force,
            quiet: cli.quiet,
            verbose: cli.verbose.min(2),
            json_output: cli.json_output,
            algorithm: Algorithm::default(),
            level: DEFAULT_LEVEL,
            use_delta: true,
            use_varint: true,
            rle_block_ids: true,
            input_file: None,
            output_file: None,
            blocks_file: None,
            entities_file: None,
            source_file: None,
        }
    }
}

fn resolve_options(cli: Cli) -> Options {
    match &cli.command {
        Cmd::Encode(args) => {
            let use_delta = !args.tuning.no_delta;
            Options {
                algorithm: args.tuning.algorithm.into(),
                level: args.tuning.level,
                use_delta,
                use_varint: use_delta && !args.tuning.no_varint,
                rle_block_ids: !args.tuning.no_rle,
                input_file: Some(args.input.clone()),
                output_file: Some(args.output.clone()),
                blocks_file: args.blocks.clone(),
                entities_file: args.entities.clone(),
                ..Options::new(Command::Encode, &cli)
            }
        }
        Cmd::Decode(args) => Options {
            input_file: Some(args.input.clone()),
            output_file: Some(args.output.clone()),
            ..Options::new(Command::Decode, &cli)
        },
        Cmd::Inspect(args) => Options {
            input_file: Some(args.input.clone()),
            source_file: args.source.clone(),
            ..Options::new(Command::Inspect, &cli)
        },
        Cmd::Config => Options::new(Command::Config, &cli),
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("voxpack".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let opts = resolve_options(cli);
        let _ = build_compress_options(&opts).validate();
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("voxpack version {version} (Rust)");

    let file_io = cfg!(feature = "file-io") as u8;
    let parallel = cfg!(feature = "parallel") as u8;

    eprintln!("FILE_IO={file_io}");
    eprintln!("PARALLEL_SORT={parallel}");
    eprintln!("ARTIFACT_VERSION={}", crate::compress::ARTIFACT_VERSION);
    eprintln!("DEFAULT_ALGORITHM={}", Algorithm::default());
    eprintln!("DEFAULT_LEVEL={DEFAULT_LEVEL}");
    eprintln!("BROTLI_MAX_LEVEL={BROTLI_MAX_LEVEL}");
    eprintln!("GZIP_MAX_LEVEL={GZIP_MAX_LEVEL}");
    eprintln!("MAX_RECORD_LEN={}", stream::MAX_RECORD_LEN);

    0
}

// ---------------------------------------------------------------------------
// Build CompressOptions from CLI options
// ---------------------------------------------------------------------------

fn build_compress_options(opts: &Options) -> CompressOptions {
    CompressOptions {
        use_delta: opts.use_delta,
        use_varint: opts.use_varint,
        rle_block_ids: opts.rle_block_ids,
        algorithm: opts.algorithm,
        level: opts.level,
    }
}

fn read_json_file(path: &Path) -> Result<serde_json::Value, IoError> {
    Ok(serde_json::from_slice(&std::fs::read(path)?)?)
}

/// Refuse to clobber an existing output unless `-f` was given.
fn check_output(opts: &Options, path: &Path) -> bool {
    if path.exists() && !opts.force {
        eprintln!(
            "voxpack: output file exists, use -f to overwrite: {}",
            path.display()
        );
        return false;
    }
    true
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("voxpack: json error: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Encode command
// ---------------------------------------------------------------------------

fn cmd_encode(opts: &Options) -> i32 {
    let (Some(input), Some(output)) = (&opts.input_file, &opts.output_file) else {
        eprintln!("voxpack: encode needs an input and an output file");
        return 1;
    };
    if !check_output(opts, output) {
        return 1;
    }

    let compress_opts = build_compress_options(opts);
    let mut compressor = match Compressor::new(compress_opts) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("voxpack: {e}");
            return 1;
        }
    };

    if let Some(path) = &opts.blocks_file {
        match read_json_file(path) {
            Ok(blocks) => compressor = compressor.with_block_types(blocks),
            Err(e) => {
                eprintln!("voxpack: blocks file: {}: {e}", path.display());
                return 1;
            }
        }
    }
    if let Some(path) = &opts.entities_file {
        match read_json_file(path) {
            Ok(entities) => compressor = compressor.with_entities(entities),
            Err(e) => {
                eprintln!("voxpack: entities file: {}: {e}", path.display());
                return 1;
            }
        }
    }

    let stats = match fileio::compress_file_with(input, output, compressor) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("voxpack: encode error: {}: {e}", input.display());
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "voxpack: encoder: records: {}, input size: {}, artifact size: {}",
            stats.record_count, stats.input_size, stats.artifact_size
        );
    }

    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "encode",
            "records": stats.record_count,
            "input_size": stats.input_size,
            "artifact_size": stats.artifact_size,
            "algorithm": opts.algorithm.name(),
            "level": opts.level,
            "source_sha256": stats.source_sha256,
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Decode command
// ---------------------------------------------------------------------------

fn cmd_decode(opts: &Options) -> i32 {
    let (Some(input), Some(output)) = (&opts.input_file, &opts.output_file) else {
        eprintln!("voxpack: decode needs an input and an output file");
        return 1;
    };
    if !check_output(opts, output) {
        return 1;
    }

    let stats = match fileio::decompress_file(input, output) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("voxpack: decode error: {}: {e}", input.display());
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "voxpack: decoder: records: {}, output size: {}",
            stats.record_count, stats.output_size
        );
    }

    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "decode",
            "records": stats.record_count,
            "artifact_size": stats.artifact_size,
            "output_size": stats.output_size,
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Inspect command
// ---------------------------------------------------------------------------

fn artifact_summary(artifact: &CompressedArtifact) -> serde_json::Value {
    let pipeline = match artifact.pipeline() {
        Ok(p) => format!("{p:?}"),
        Err(e) => format!("invalid ({e})"),
    };
    serde_json::json!({
        "version": artifact.version,
        "algorithm": artifact.algorithm.name(),
        "pipeline": pipeline,
        "useDelta": artifact.flags.use_delta(),
        "useVarint": artifact.flags.use_varint(),
        "bounds": artifact.bounds,
        "recordCount": artifact.metadata.record_count,
        "originalSize": artifact.metadata.original_size,
        "compressedSize": artifact.metadata.compressed_size,
        "ratio": artifact.metadata.ratio(),
        "elapsedMs": artifact.metadata.elapsed_us as f64 / 1000.0,
        "sourceHash": artifact.source_hash,
        "hasEntities": artifact.entities.is_some(),
    })
}

fn cmd_inspect(opts: &Options) -> i32 {
    let Some(input) = &opts.input_file else {
        eprintln!("voxpack: inspect needs an artifact file");
        return 1;
    };
    let artifact = match fileio::read_artifact(input) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("voxpack: {}: {e}", input.display());
            return 1;
        }
    };

    let fresh = match &opts.source_file {
        Some(source) => match fileio::is_fresh(&artifact, source) {
            Ok(fresh) => Some(fresh),
            Err(e) => {
                eprintln!("voxpack: source file: {}: {e}", source.display());
                return 1;
            }
        },
        None => None,
    };

    if opts.json_output {
        let mut summary = artifact_summary(&artifact);
        if let (Some(fresh), Some(obj)) = (fresh, summary.as_object_mut()) {
            obj.insert("fresh".into(), fresh.into());
        }
        print_json(&summary);
        return 0;
    }

    if opts.quiet {
        return 0;
    }

    let meta = &artifact.metadata;
    println!("VOXPACK artifact version:   {}", artifact.version);
    println!("VOXPACK algorithm:          {}", artifact.algorithm);
    match artifact.pipeline() {
        Ok(p) => println!("VOXPACK pipeline:           {p:?}"),
        Err(e) => println!("VOXPACK pipeline:           invalid ({e})"),
    }
    match &artifact.bounds {
        Some(b) => println!(
            "VOXPACK bounds:             ({}, {}, {}) .. ({}, {}, {})",
            b.min_x, b.min_y, b.min_z, b.max_x, b.max_y, b.max_z
        ),
        None => println!("VOXPACK bounds:             none (empty map)"),
    }
    println!("VOXPACK records:            {}", meta.record_count);
    println!("VOXPACK original size:      {}", meta.original_size);
    println!("VOXPACK compressed size:    {}", meta.compressed_size);
    println!("VOXPACK ratio:              {:.4}", meta.ratio());
    println!("VOXPACK elapsed:            {:?}", meta.elapsed());
    if let Some(hash) = &artifact.source_hash {
        println!("VOXPACK source hash:        {hash}");
    }
    if let Some(fresh) = fresh {
        println!("VOXPACK fresh:              {fresh}");
    }

    if opts.verbose > 0 {
        match crate::compress::decompress(&artifact) {
            Ok(map) => println!("VOXPACK decoded records:    {}", map.len()),
            Err(e) => {
                eprintln!("voxpack: {}: {e}", input.display());
                return 1;
            }
        }
    }

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    let filter = match (opts.quiet, opts.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match opts.command {
        Command::Encode => cmd_encode(&opts),
        Command::Decode => cmd_decode(&opts),
        Command::Inspect => cmd_inspect(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
