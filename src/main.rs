//! `repcrec` binary: parses the optional input-file argument, installs the
//! `tracing` subscriber, and delegates to `repcrec_cli::run` for the
//! actual file/pipe/REPL dispatch (§10.2, §10.4).

use std::process::ExitCode;

use clap::Parser;

/// Replicated available-copies transaction manager.
#[derive(Parser)]
#[command(name = "repcrec", about = "Available-copies transaction manager over logical sites")]
struct Args {
    /// Path to a command script to run. If omitted, reads from stdin
    /// (piped input is executed line by line; a TTY gets an interactive
    /// REPL).
    path: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match repcrec_cli::run(args.path.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("repcrec: {}", err);
            ExitCode::FAILURE
        }
    }
}
