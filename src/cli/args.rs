//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

/// Org chart toolkit: validate snapshots, show hierarchies, diff reorganisations
#[derive(Parser, Debug)]
#[command(name = "orgdelta")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity: -d info, -dd debug, -ddd trace
    #[arg(short = 'd', long = "debug", action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file (layered over the global config)
    #[arg(long, global = true, env = "ORGDELTA_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report structural problems in a snapshot
    Validate {
        /// Snapshot file (JSON array of rows)
        #[arg(value_hint = ValueHint::FilePath)]
        snapshot: PathBuf,
        /// Print findings as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the reporting hierarchy
    Tree {
        #[arg(value_hint = ValueHint::FilePath)]
        snapshot: PathBuf,
        #[command(flatten)]
        view: ViewArgs,
    },

    /// Print coordinates of the visible nodes as JSON
    Layout {
        #[arg(value_hint = ValueHint::FilePath)]
        snapshot: PathBuf,
        #[command(flatten)]
        view: ViewArgs,
    },

    /// Classify changes between two snapshots
    Diff {
        /// Earlier snapshot
        #[arg(value_hint = ValueHint::FilePath)]
        baseline: PathBuf,
        /// Later snapshot
        #[arg(value_hint = ValueHint::FilePath)]
        target: PathBuf,
        /// Print the analysis as JSON
        #[arg(long, conflicts_with = "tree")]
        json: bool,
        /// Also print the annotated target hierarchy
        #[arg(long)]
        tree: bool,
    },

    /// Write the records reachable from the root as JSON
    Export {
        #[arg(value_hint = ValueHint::FilePath)]
        snapshot: PathBuf,
        /// Output file
        #[arg(value_hint = ValueHint::FilePath)]
        out: PathBuf,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Which part of the hierarchy is visible.
#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// Expand every node
    #[arg(short, long)]
    pub all: bool,

    /// Expand this employee (repeatable)
    #[arg(short, long = "expand", value_name = "ID")]
    pub expand: Vec<String>,

    /// Expand every manager above this employee
    #[arg(short, long, value_name = "ID")]
    pub reveal: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a config template
    Template,
    /// Show the global config file location
    Path,
}
