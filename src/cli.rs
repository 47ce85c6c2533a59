// Command-line interface for Oxicalldata.
//
// Subcommands drive a `Buffer` from files so encoder sessions can be
// reproduced and inspected outside the calling application.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::encoder::config::{MIN_REFERENCE_LEN, RESERVED_SELECTOR, RESERVED_SELECTOR_BYTES};
use crate::encoder::indexes::decode_hex;
use crate::encoder::{Buffer, BufferOptions, Indexes};
use crate::replay::Script;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Backreference-aware calldata buffer tools.
#[derive(Parser, Debug)]
#[command(
    name = "oxicalldata",
    version,
    about = "Calldata buffer replay and inspection",
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

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Replay a JSON script against a fresh buffer and print the stream.
    Replay(ReplayArgs),
    /// Search a committed stream for a byte pattern.
    Find(FindArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// JSON index tables (address, bytes32, bytes4).
    #[arg(long, short = 'i', value_hint = ValueHint::FilePath)]
    indexes: Option<PathBuf>,

    /// Enable contract-storage mode for the session.
    #[arg(long = "contract-storage")]
    contract_storage: bool,

    /// Write the raw committed stream to a file instead of printing hex.
    #[arg(long, short = 'o', value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Replay script.
    #[arg(value_hint = ValueHint::FilePath)]
    script: PathBuf,
}

#[derive(Args, Debug)]
struct FindArgs {
    /// Committed stream as hex (including the selector byte).
    #[arg(long)]
    stream: String,

    /// Pattern as hex.
    pattern: String,
}

// ---------------------------------------------------------------------------
// Resolved options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Options {
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
}

fn split_cli(cli: Cli) -> (Cmd, Options) {
    let opts = Options {
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose,
        json_output: cli.json_output,
    };
    (cli.command, opts)
}

fn log_filter(opts: &Options) -> &'static str {
    if opts.quiet {
        return "error";
    }
    match opts.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

// ---------------------------------------------------------------------------
// Replay command
// ---------------------------------------------------------------------------

fn cmd_replay(args: &ReplayArgs, opts: &Options) -> i32 {
    let indexes = match &args.indexes {
        Some(path) => {
            let text = match std::fs::read_to_string(path) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("oxicalldata: indexes: {}: {e}", path.display());
                    return 1;
                }
            };
            match Indexes::from_json(&text) {
                Ok(idx) => idx,
                Err(e) => {
                    eprintln!("oxicalldata: indexes: {}: {e}", path.display());
                    return 1;
                }
            }
        }
        None => Indexes::new(),
    };

    let text = match std::fs::read_to_string(&args.script) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("oxicalldata: replay: {}: {e}", args.script.display());
            return 1;
        }
    };
    let script = match Script::parse(&text) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("oxicalldata: replay: {}: {e}", args.script.display());
            return 1;
        }
    };

    let mut buf = Buffer::with_options(
        Arc::new(indexes),
        BufferOptions::with_contract_storage(args.contract_storage),
    );
    let report = match script.run(&mut buf) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("oxicalldata: replay: {e}");
            return 1;
        }
    };

    if report.pending_len > 0 && !opts.quiet {
        eprintln!(
            "oxicalldata: warning: {} pending bytes were never committed",
            report.pending_len
        );
    }

    if let Some(path) = &args.output {
        if path.exists() && !opts.force {
            eprintln!(
                "oxicalldata: output file exists, use -f to overwrite: {}",
                path.display()
            );
            return 1;
        }
        if let Err(e) = std::fs::write(path, buf.data()) {
            eprintln!("oxicalldata: replay: write: {e}");
            return 1;
        }
    } else {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if let Err(e) = writeln!(out, "0x{}", hex::encode(buf.data())) {
            eprintln!("oxicalldata: replay: write: {e}");
            return 1;
        }
    }

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "oxicalldata: replay: {} ops, {} commits, {} committed bytes",
            script.ops().len(),
            report.commits,
            report.committed_len
        );
    }

    if opts.json_output {
        let mut json = report.to_json();
        json["command"] = "replay".into();
        json["ops"] = script.ops().len().into();
        match serde_json::to_string_pretty(&json) {
            Ok(s) => eprintln!("{s}"),
            Err(e) => {
                eprintln!("oxicalldata: replay: json: {e}");
                return 1;
            }
        }
    }

    0
}

// ---------------------------------------------------------------------------
// Find command
// ---------------------------------------------------------------------------

/// Rebuild a buffer whose committed bytes are exactly `stream`.
///
/// `stream` must be non-empty and start with the reserved selector byte,
/// since every committed stream does.
fn buffer_from_stream(stream: &[u8]) -> Result<Buffer, &'static str> {
    match stream.first() {
        None => return Err("stream is empty"),
        Some(&b) if b != RESERVED_SELECTOR => {
            return Err("stream does not start with the reserved selector byte");
        }
        Some(_) => {}
    }
    let mut buf = Buffer::new(Arc::new(Indexes::new()), false);
    buf.write_bytes(&stream[RESERVED_SELECTOR_BYTES..]);
    buf.end(&[], crate::encoder::EncodeType::ReadStorage);
    Ok(buf)
}

fn cmd_find(args: &FindArgs, opts: &Options) -> i32 {
    let stream = match decode_hex(&args.stream) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("oxicalldata: find: --stream: {e}");
            return 1;
        }
    };
    let pattern = match decode_hex(&args.pattern) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("oxicalldata: find: pattern: {e}");
            return 1;
        }
    };
    let buf = match buffer_from_stream(&stream) {
        Ok(buf) => buf,
        Err(e) => {
            eprintln!("oxicalldata: find: --stream: {e}");
            return 1;
        }
    };
    let found = buf.find_past_data(&pattern);

    if opts.json_output {
        let json = serde_json::json!({
            "command": "find",
            "stream_len": buf.len(),
            "pattern_len": pattern.len(),
            "offset": found,
        });
        if let Ok(s) = serde_json::to_string_pretty(&json) {
            eprintln!("{s}");
        }
    }

    match found {
        Some(offset) => {
            println!("{offset}");
            0
        }
        None => {
            if !opts.quiet {
                println!("not found");
            }
            1
        }
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("oxicalldata version {version} (Rust)");

    let json = cfg!(feature = "json") as u8;
    let ptr_size = std::mem::size_of::<*const ()>();

    eprintln!("JSON={json}");
    eprintln!("RESERVED_SELECTOR_BYTES={RESERVED_SELECTOR_BYTES}");
    eprintln!("RESERVED_SELECTOR={RESERVED_SELECTOR:#04x}");
    eprintln!("MIN_REFERENCE_LEN={MIN_REFERENCE_LEN}");
    eprintln!("sizeof(usize)={ptr_size}");

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let (cmd, opts) = split_cli(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(&opts)))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match &cmd {
        Cmd::Replay(args) => cmd_replay(args, &opts),
        Cmd::Find(args) => cmd_find(args, &opts),
        Cmd::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
