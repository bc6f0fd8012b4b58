//! The Carinata Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::args::{CarinataArgs, Command, SuiteArgs};
use crate::config::Config;
use crate::errors::{print_error, CarinataError, SourceContext};
use crate::parser::parse_seeded;
use crate::suite::{fingerprint, suffix_seed, SuiteGenerator};

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = CarinataArgs::parse();
    init_logging(args.verbose, args.quiet);

    let result = Config::discover(args.config.as_deref()).and_then(|config| dispatch(args.command, config));

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            print_error(e);
            process::exit(1);
        }
    }
}

/// `RUST_LOG` wins over the verbosity flags when it is set.
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Runs one subcommand. `Ok(false)` means it completed but something failed along the way.
fn dispatch(command: Command, config: Config) -> Result<bool, CarinataError> {
    match command {
        Command::Generate { suite, force } => handle_generate(suite, config, force),
        Command::Run { suite, force } => handle_run(suite, config, force),
        Command::Clean { suite } => handle_clean(suite, config),
        Command::Check { suite } => handle_check(suite, config),
        Command::Tree { file, json } => handle_tree(&file, &config, json),
    }
}

/// Command-line flags override the configuration file.
fn apply_overrides(suite: &SuiteArgs, mut config: Config) -> Config {
    if let Some(dir) = &suite.output_dir {
        config.output_dir = Some(dir.clone());
    }
    if let Some(base) = &suite.base_class {
        config.base_class = base.clone();
    }
    if suite.line_markers {
        config.line_markers = true;
    }
    config
}

fn handle_generate(suite: SuiteArgs, config: Config, force: bool) -> Result<bool, CarinataError> {
    let generator = SuiteGenerator::new(apply_overrides(&suite, config), force);
    let colors = generator.config().use_colors();
    let reports = generator.generate(&suite.directories)?;
    let summary = output::print_reports(reports, colors);
    output::print_summary(&summary, colors);
    Ok(summary.failed == 0)
}

fn handle_run(suite: SuiteArgs, config: Config, force: bool) -> Result<bool, CarinataError> {
    let generator = SuiteGenerator::new(apply_overrides(&suite, config), force);
    let colors = generator.config().use_colors();
    let reports = generator.generate(&suite.directories)?;
    let modules: Vec<PathBuf> = reports
        .iter()
        .filter_map(|report| report.output().map(Path::to_path_buf))
        .collect();
    let summary = output::print_reports(reports, colors);
    output::print_summary(&summary, colors);

    let mut passed = summary.failed == 0;
    for module in &modules {
        if !generator.run_file(module)? {
            tracing::warn!(module = %module.display(), "tests failed");
            passed = false;
        }
    }
    Ok(passed)
}

fn handle_clean(suite: SuiteArgs, config: Config) -> Result<bool, CarinataError> {
    let generator = SuiteGenerator::new(apply_overrides(&suite, config), false);
    let colors = generator.config().use_colors();
    let reports = generator.clean(&suite.directories)?;
    let summary = output::print_reports(reports, colors);
    output::print_summary(&summary, colors);
    Ok(summary.failed == 0)
}

fn handle_check(suite: SuiteArgs, config: Config) -> Result<bool, CarinataError> {
    let generator = SuiteGenerator::new(apply_overrides(&suite, config), false);
    let colors = generator.config().use_colors();
    let reports = generator.check(&suite.directories)?;
    Ok(output::print_check(reports, colors))
}

/// Prints the parsed block tree. Suffixes match what `generate` would assign.
fn handle_tree(path: &Path, config: &Config, json: bool) -> Result<bool, CarinataError> {
    let content = fs::read_to_string(path).map_err(|e| CarinataError::io(path, e))?;
    let seed = suffix_seed(&fingerprint(&content, &config.generator_options()));
    let tree = parse_seeded(SourceContext::from_file(path.display().to_string(), content), seed)?;
    if json {
        let text = serde_json::to_string_pretty(&tree).map_err(|e| CarinataError::io(path, e))?;
        println!("{}", text);
    } else {
        print!("{}", tree.pretty());
    }
    Ok(true)
}
