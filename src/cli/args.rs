//! Defines the command-line arguments and subcommands for the carinata CLI.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "carinata",
    version,
    about = "Compile describe/context/it spec files into Python unittest modules."
)]
pub struct CarinataArgs {
    /// Configuration file (defaults to ./carinata.yaml when present).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log more; repeat for more detail.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command that works on a set of spec directories.
#[derive(Debug, Args)]
pub struct SuiteArgs {
    /// Directories to search for spec files (always recursive).
    #[arg(default_value = "carinata")]
    pub directories: Vec<PathBuf>,

    /// Where generated test files go (a temporary directory if not given).
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Dotted base class for generated test classes.
    #[arg(long, value_name = "CLASS")]
    pub base_class: Option<String>,

    /// Annotate generated code lines with their spec line numbers.
    #[arg(long)]
    pub line_markers: bool,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate test files from spec files.
    Generate {
        #[command(flatten)]
        suite: SuiteArgs,
        /// Regenerate even when the spec file has not changed.
        #[arg(short, long)]
        force: bool,
    },
    /// Generate test files, then run them.
    Run {
        #[command(flatten)]
        suite: SuiteArgs,
        /// Regenerate even when the spec file has not changed.
        #[arg(short, long)]
        force: bool,
    },
    /// Remove generated test files.
    Clean {
        #[command(flatten)]
        suite: SuiteArgs,
    },
    /// Show which generated files are missing or out of date, with diffs.
    Check {
        #[command(flatten)]
        suite: SuiteArgs,
    },
    /// Print the block tree of a single spec file.
    Tree {
        /// The spec file to parse.
        #[arg(required = true)]
        file: PathBuf,
        /// Print JSON instead of an indented outline.
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_defaults_to_carinata_directory() {
        let args = CarinataArgs::parse_from(["carinata", "generate"]);
        let Command::Generate { suite, force } = args.command else {
            panic!("expected generate");
        };
        assert_eq!(suite.directories, vec![PathBuf::from("carinata")]);
        assert!(!force);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = CarinataArgs::parse_from([
            "carinata", "run", "specs", "more", "-o", "out", "-f", "-vv",
        ]);
        assert_eq!(args.verbose, 2);
        let Command::Run { suite, force } = args.command else {
            panic!("expected run");
        };
        assert_eq!(suite.directories.len(), 2);
        assert_eq!(suite.output_dir, Some(PathBuf::from("out")));
        assert!(force);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        CarinataArgs::command().debug_assert();
    }
}
