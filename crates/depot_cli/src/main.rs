//! Command-line interface for Depot: inspect and maintain the incremental dependency store.
//!
//! Provides `depot import` to record compiled classes, `depot make` to plan
//! the rebuild after a recompile, `depot show` and `depot deps` to inspect
//! stored classes, and `depot remove` / `depot wipe` for maintenance.

#![warn(missing_docs)]

mod import;
mod inspect;
mod maintenance;
mod make;
mod session;

#[cfg(test)]
mod testing;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Depot: dependency tracking for incremental JVM builds.
#[derive(Parser, Debug)]
#[command(name = "depot", version, about = "Depot dependency store")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `depot.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Store directory, overriding `store.dir` from the configuration.
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record compiled classes and link their references.
    Import(ImportArgs),
    /// Plan the rebuild after classes were recompiled, then record them.
    Make(MakeArgs),
    /// Print what the store knows about a class.
    Show(ClassArgs),
    /// List the classes that depend on a class.
    Deps(ClassArgs),
    /// Remove a class from the store.
    Remove {
        /// Qualified class name, e.g. `com.example.Widget`.
        class: String,
    },
    /// Delete every record and index file.
    Wipe,
}

/// Arguments for the `depot import` subcommand.
#[derive(Parser, Debug)]
pub struct ImportArgs {
    /// Class files or directories to scan. Defaults to `classpath.roots`.
    pub paths: Vec<String>,
}

/// Arguments for the `depot make` subcommand.
#[derive(Parser, Debug)]
pub struct MakeArgs {
    /// Recompiled class files or directories.
    pub paths: Vec<String>,

    /// Qualified names of classes whose sources were deleted.
    #[arg(long, num_args = 1..)]
    pub removed: Vec<String>,

    /// Print the plan without updating the store.
    #[arg(long)]
    pub dry_run: bool,

    /// Output format for the rebuild plan.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for commands that take a single class.
#[derive(Parser, Debug)]
pub struct ClassArgs {
    /// Qualified class name, e.g. `com.example.Widget`.
    pub class: String,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
    /// Optional store directory override.
    pub store: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
        store: cli.store,
    };

    let result = session::Settings::resolve(&global).and_then(|settings| {
        init_logging(&global, &settings.log_directives);
        match cli.command {
            Command::Import(ref args) => import::run(args, &settings, &global),
            Command::Make(ref args) => make::run(args, &settings, &global),
            Command::Show(ref args) => inspect::show(args, &settings),
            Command::Deps(ref args) => inspect::deps(args, &settings),
            Command::Remove { ref class } => maintenance::remove(class, &settings, &global),
            Command::Wipe => maintenance::wipe(&settings, &global),
        }
    });

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the `tracing` subscriber.
///
/// `--verbose` forces `debug` and `--quiet` forces `error`. Otherwise
/// `RUST_LOG` wins over the configured directives.
fn init_logging(global: &GlobalArgs, configured: &str) {
    let filter = if global.verbose {
        EnvFilter::new("debug")
    } else if global.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(configured))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
