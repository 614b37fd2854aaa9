//! Manual entry point for the scanner harness.
//!
//! Runs the same operations a test suite would call: scan commands exit with
//! the scanner's own status; `serve` keeps the mock target up until Ctrl-C.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use harness::io::config::load_config;
use harness::{MockServer, ProcessRunner, exit_codes, logging};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "harness",
    version,
    about = "Run the scanner with captured output, or serve a mock scan target"
)]
struct Cli {
    /// Harness config file (TOML). Defaults apply when missing.
    #[arg(long, default_value = "harness.toml")]
    config: PathBuf,

    /// Override the scanner binary path.
    #[arg(long)]
    binary: Option<PathBuf>,

    /// Do not echo scanner output.
    #[arg(short, long)]
    quiet: bool,

    /// Log harness spawn/exit and server lifecycle to stderr.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan one URL.
    Scan {
        #[arg(long)]
        signatures: PathBuf,
        #[arg(long, default_value = harness::process_runner::DEFAULT_THREADS)]
        threads: String,
        url: String,
    },
    /// Scan every URL listed in a file.
    ScanUrlFile {
        #[arg(long)]
        signatures: PathBuf,
        #[arg(long)]
        url_file: PathBuf,
    },
    /// List plugins defined by a signatures file.
    Plugins {
        #[arg(long)]
        signatures: PathBuf,
    },
    /// Serve the mock target until interrupted.
    Serve {
        #[arg(long)]
        port: u16,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(if cli.verbose {
        logging::VERBOSE
    } else {
        logging::QUIET
    });
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let mut cfg = load_config(&cli.config)?;
    if let Some(binary) = cli.binary {
        cfg.binary_path = binary;
    }
    if cli.quiet {
        cfg.echo_output = false;
    }

    match cli.command {
        Command::Scan {
            signatures,
            threads,
            url,
        } => {
            let mut runner = ProcessRunner::from_config(&cfg);
            Ok(runner.scan(&signatures, &url, Some(&threads))?)
        }
        Command::ScanUrlFile {
            signatures,
            url_file,
        } => {
            let mut runner = ProcessRunner::from_config(&cfg);
            Ok(runner.scan_url_file(&signatures, &url_file)?)
        }
        Command::Plugins { signatures } => {
            let mut runner = ProcessRunner::from_config(&cfg);
            Ok(runner.list_plugins(&signatures)?)
        }
        Command::Serve { port } => cmd_serve(MockServer::with_host(cfg.bind_ip()?), port),
    }
}

fn cmd_serve(mut server: MockServer, port: u16) -> Result<i32> {
    let addr = server.start(port)?;
    println!("Serving mock target on {addr}");

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build signal runtime")?
        .block_on(tokio::signal::ctrl_c())
        .context("wait for ctrl-c")?;

    info!("interrupt received");
    server.stop()?;
    Ok(exit_codes::OK)
}
