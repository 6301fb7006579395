//! Shared plumbing for the `countstates` and `test-save-restore` binaries:
//! argument definitions, logging setup, and program loading.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use statecount_explore::{prepare_root, FingerprintScheme, SearchKind, StopPolicy};
use statecount_sandbox::{Program, ProgramInstance, SandboxConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Exit status for malformed arguments.
pub const EXIT_USAGE: i32 = -1;
/// Exit status for a save/restore inconsistency.
pub const EXIT_INCONSISTENT: i32 = -2;

#[derive(Parser, Debug)]
#[command(name = "countstates")]
#[command(about = "Count the distinct states a program reaches, depth by depth", long_about = None)]
pub struct CountArgs {
    /// Program to load (.wasm or .wat)
    pub program: PathBuf,

    /// Maximum depth, or budget=<states> to deepen until that many states are known
    pub limit: StopPolicy,

    /// Search strategy (bfs, id)
    pub search: SearchKind,

    /// State equality (memory+aux, memory, full)
    #[arg(short, long, default_value = "memory+aux")]
    pub fingerprint: FingerprintScheme,

    /// Sandbox configuration as JSON
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// JSON lines instead of the CSV table
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(name = "test-save-restore")]
#[command(about = "Check that a program's save/restore reproduces its states", long_about = None)]
pub struct VerifyArgs {
    /// Program to load (.wasm or .wat)
    pub program: PathBuf,

    /// Number of pseudo-random actions to apply
    #[arg(default_value = "2")]
    pub num_actions: usize,

    /// Seed for the action sequence
    #[arg(long, default_value = "22")]
    pub seed: u64,

    /// Sandbox configuration as JSON
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse the command line, exiting with [`EXIT_USAGE`] on malformed
/// arguments. Help and version requests exit normally.
pub fn parse_or_exit<A: Parser>() -> A {
    match A::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            eprint!("{e}");
            std::process::exit(EXIT_USAGE);
        }
    }
}

/// Log filter: `--verbose` forces debug, otherwise `RUST_LOG` if it parses,
/// otherwise info.
pub fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Send tracing output to stderr so stdout carries only the report.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(verbose, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Sandbox settings from a JSON file, or the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<SandboxConfig> {
    let Some(path) = path else {
        return Ok(SandboxConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

/// Load and boot the program, then move it to the search root.
pub fn boot_program(path: &Path, config: &SandboxConfig) -> anyhow::Result<ProgramInstance> {
    let program = Program::from_file(config, path)
        .with_context(|| format!("Failed to load program {}", path.display()))?;
    let mut instance = program.boot()?;
    if let Some(action) = prepare_root(&mut instance)? {
        info!(%action, "applied warm-up action");
    }
    Ok(instance)
}
