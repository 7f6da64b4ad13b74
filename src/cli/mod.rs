//! The fitsuite Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::args::{Command, FitsuiteArgs, RunArgs, SearchArgs};
use crate::cli::output::ConsoleListener;
use crate::config::{SuiteConfigFile, SuiteConfiguration, SuiteConfigurationBuilder};
use crate::prelude::*;
use crate::search::SearchRequest;
use crate::suite::SuiteRunner;
use crate::wiki::loader::{load_page_tree, DEFAULT_ROOT_DIRECTORY};
use crate::wiki::PagePath;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() -> ExitCode {
    init_tracing();
    let args = FitsuiteArgs::parse();

    // Dispatch to the appropriate subcommand handler.
    let result = match &args.command {
        Command::Run(run) => handle_run(run),
        Command::List(run) => handle_list(run),
        Command::Search(search) => handle_search(search),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            let report = miette::Report::new(e);
            eprintln!("{report:?}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Config file first, then every flag given on the command line.
fn configuration(args: &RunArgs) -> Result<SuiteConfigurationBuilder, SuiteError> {
    let mut builder = SuiteConfiguration::builder();
    if let Some(path) = &args.config {
        let file = SuiteConfigFile::load(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        builder = builder.merge_file(file, base_dir);
    }
    if let Some(name) = &args.name {
        builder = builder.suite_name(name.as_str());
    }
    if let Some(root) = &args.root {
        builder = builder.root_path(root);
    }
    if let Some(root_directory) = &args.root_directory {
        builder = builder.root_directory(root_directory.as_str());
    }
    if let Some(output) = &args.output {
        builder = builder.output_dir(output);
    }
    if let Some(variable) = &args.output_env {
        builder = builder.output_dir_from_env(variable.as_str(), args.output_extension.as_str());
    }
    if let Some(filter) = &args.suite_filter {
        builder = builder.suite_filter(filter.as_str());
    }
    if let Some(filter) = &args.exclude_suite_filter {
        builder = builder.exclude_suite_filter(filter.as_str());
    }
    if let Some(debug) = args.debug {
        builder = builder.debug(debug);
    }
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    if let Some(variable) = &args.port_env {
        builder = builder.port_from_env(variable.as_str());
    }
    if let Some(test_system) = &args.test_system {
        builder = builder.test_system(test_system.as_str());
    }
    if !args.backend_command.is_empty() {
        builder = builder.backend_command(args.backend_command.clone());
    }
    if let Some(ms) = args.timeout_ms {
        builder = builder.timeout(Duration::from_millis(ms));
    }
    if let Some(jobs) = args.jobs {
        builder = builder.parallelism(jobs);
    }
    Ok(builder)
}

fn suite_runner(args: &RunArgs) -> Result<SuiteRunner, SuiteError> {
    SuiteRunner::configure(configuration(args)?, |config| {
        load_page_tree(&config.root_path, &config.root_directory)
    })
}

/// Handles the `run` subcommand. Fails when any verdict fails.
fn handle_run(args: &RunArgs) -> Result<ExitCode, SuiteError> {
    let mut runner = suite_runner(args)?;
    runner.add_listener(Arc::new(ConsoleListener::default()));

    let verdicts = if args.only.is_empty() {
        vec![runner.run()]
    } else {
        runner.run_filtered(args.only.as_slice())?
    };

    for verdict in &verdicts {
        output::print_verdict(verdict);
    }
    if verdicts.iter().all(|verdict| verdict.is_success()) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Handles the `list` subcommand: the discovered pages, in run order.
fn handle_list(args: &RunArgs) -> Result<ExitCode, SuiteError> {
    let runner = suite_runner(args)?;
    let pages: Vec<String> = runner.children().map(|page| runner.describe_child(page)).collect();
    output::print_pages(&pages);
    Ok(ExitCode::SUCCESS)
}

/// Handles the `search` subcommand.
fn handle_search(args: &SearchArgs) -> Result<ExitCode, SuiteError> {
    let root_directory = args.root_directory.as_deref().unwrap_or(DEFAULT_ROOT_DIRECTORY);
    let tree = load_page_tree(&args.root, root_directory)?;
    let scope = if args.scope.is_empty() {
        tree.root()
    } else {
        tree.get(&PagePath::parse(&args.scope, "scope")?)?
    };
    let request = SearchRequest::new(args.search_string.as_str(), Some(args.search_type.as_str()));
    let response = request.respond(&tree, scope)?;
    output::print_search_response(&response);
    Ok(ExitCode::SUCCESS)
}
