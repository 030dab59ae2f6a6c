use clap::Parser;
use std::process;
use tracing::debug;

use tstamp::config::{PresentationMode, Resolution, TimestampMode};
use tstamp::supervise::{self, Invocation};

/// Timestamp and colorize the stdout and stderr streams of CLI programs.
#[derive(Parser)]
#[command(name = "tstamp", version)]
#[command(about = "Timestamp and colorize the stdout and stderr streams of CLI programs")]
struct Cli {
    /// Disable colorized output; lines get literal "stdout: "/"stderr: " markers instead
    #[arg(long)]
    no_color: bool,

    /// Use absolute wall-clock timestamps
    #[arg(short, long, conflicts_with_all = ["elapsed", "millis"])]
    absolute: bool,

    /// Show elapsed time from the start of the program instead of from the previous line
    #[arg(short, long)]
    elapsed: bool,

    /// Round relative timestamps to milliseconds instead of microseconds
    #[arg(long)]
    millis: bool,

    /// Merge stderr into stdout. Useful for later filtering with grep
    #[arg(short, long)]
    merge: bool,

    /// Raw output: "<elapsed_ns>,<text>" with no color or padding
    #[arg(short, long)]
    raw: bool,

    /// Do not timestamp the start of the execution
    #[arg(long)]
    no_start: bool,

    /// Do not timestamp the end of the execution
    #[arg(long)]
    no_end: bool,

    /// Re-exec the program through `stdbuf -i0 -o0 -e0` to defeat its output buffering
    #[arg(short, long)]
    unbuffer: bool,

    /// Enable verbose diagnostics on stderr (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// The program to run, followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mode = PresentationMode {
        colorize: !cli.no_color,
        timestamp_mode: if cli.absolute {
            TimestampMode::Absolute
        } else if cli.elapsed {
            TimestampMode::RelativeToStart
        } else {
            TimestampMode::RelativeToPrevious
        },
        resolution: if cli.millis {
            Resolution::Millisecond
        } else {
            Resolution::Microsecond
        },
        merge_err_into_out: cli.merge,
        raw_mode: cli.raw,
    };
    if let Err(e) = mode.validate() {
        eprintln!("tstamp: {e}");
        process::exit(2);
    }

    let mut command = cli.command;
    if cli.unbuffer {
        // stdbuf turns off libc stream buffering in the child so lines
        // arrive as they are printed, not when its buffers fill.
        let mut wrapped = vec![
            "stdbuf".to_string(),
            "-i0".to_string(),
            "-o0".to_string(),
            "-e0".to_string(),
        ];
        wrapped.append(&mut command);
        command = wrapped;
    }
    let program = command.remove(0);
    let invocation = Invocation {
        program,
        args: command,
        show_start: !cli.no_start,
        show_end: !cli.no_end,
    };

    debug!("running '{}'", invocation.command_line());
    let exit = match supervise::run(&invocation, mode).await {
        Ok(exit) => exit,
        Err(e) => {
            eprintln!("tstamp: {e:#}");
            process::exit(1);
        }
    };

    // An unconditional exit is safe here: the supervisor only returns
    // after the emission queue has been drained.
    process::exit(exit.exit_code());
}
