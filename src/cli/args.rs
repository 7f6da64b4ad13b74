//! Command-line arguments for the fitsuite binary, declared with clap's derive API.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "fitsuite",
    version,
    about = "Discover, filter and run acceptance-test suites."
)]
pub struct FitsuiteArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a suite and report its verdict.
    Run(RunArgs),
    /// List the pages a suite would run, without running them.
    List(RunArgs),
    /// Search page titles or contents.
    Search(SearchArgs),
}

/// Options shared by `run` and `list`. Flags override the config file.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// YAML suite configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
    /// Dotted name of the suite page, e.g. `MySuite.MySubSuite`.
    #[arg(long, short)]
    pub name: Option<String>,
    /// Directory containing the root page directory.
    #[arg(long)]
    pub root: Option<PathBuf>,
    /// Name of the root page directory.
    #[arg(long)]
    pub root_directory: Option<String>,
    /// Directory receiving the HTML results.
    #[arg(long, short, conflicts_with = "output_env")]
    pub output: Option<PathBuf>,
    /// Environment variable holding the results base directory.
    #[arg(long)]
    pub output_env: Option<String>,
    /// Path appended to the value of `--output-env`.
    #[arg(long, default_value = "")]
    pub output_extension: String,
    /// Include filter, e.g. `fast,smoke&!flaky`.
    #[arg(long)]
    pub suite_filter: Option<String>,
    /// Exclude filter.
    #[arg(long)]
    pub exclude_suite_filter: Option<String>,
    /// Run test systems in debug mode.
    #[arg(long)]
    pub debug: Option<bool>,
    #[arg(long)]
    pub port: Option<u16>,
    /// Environment variable overriding the port.
    #[arg(long)]
    pub port_env: Option<String>,
    /// Test system for pages without a TEST_SYSTEM define.
    #[arg(long)]
    pub test_system: Option<String>,
    /// Per-page deadline in milliseconds for the backend command.
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// Number of pages executed concurrently.
    #[arg(long, short)]
    pub jobs: Option<usize>,
    /// Run only these pages (full dotted paths), each on its own.
    #[arg(long = "only")]
    pub only: Vec<String>,
    /// Backend command and its arguments, after `--`.
    #[arg(last = true)]
    pub backend_command: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Directory containing the root page directory.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    #[arg(long)]
    pub root_directory: Option<String>,
    /// Page below which to search; the whole tree by default.
    #[arg(long, default_value = "")]
    pub scope: String,
    /// Search type hint; anything containing "title" searches titles.
    #[arg(long = "type", default_value = "title")]
    pub search_type: String,
    /// The string to look for.
    pub search_string: String,
}
