//! Defines the command-line arguments and subcommands for the Yantra CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "yantra",
    version,
    about = "Run declarative binary-format grammars over files."
)]
pub struct YantraArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse a file with a grammar and print every value found.
    Parse {
        /// The grammar file (YAML).
        #[arg(short, long)]
        grammar: PathBuf,
        /// Engine configuration (YAML, or JSON by extension).
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Start of the window to parse, in bytes.
        #[arg(long)]
        offset: Option<u64>,
        /// Length of the window to parse; defaults to the rest of the file.
        #[arg(long)]
        length: Option<u64>,
        /// Print values as JSON instead of a tree.
        #[arg(long)]
        json: bool,
        /// Log every token attempt.
        #[arg(long)]
        trace: bool,
        /// The file to parse.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Build a grammar and report construction errors.
    Check {
        /// The grammar file (YAML).
        #[arg(short, long)]
        grammar: PathBuf,
    },
}

impl Command {
    pub fn trace(&self) -> bool {
        matches!(self, Command::Parse { trace: true, .. })
    }
}
