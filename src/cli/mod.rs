//! The Yantra Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use num_bigint::BigInt;
use tracing_subscriber::EnvFilter;

use crate::cli::args::{Command, YantraArgs};
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::grammar::GrammarFile;
use crate::source::{FileByteStream, Slice, Source};
use crate::state::ParseState;
use crate::{err_ctx, err_io, YantraResult};

pub mod args;
pub mod output;

/// Exit status when the grammar does not match the input.
const NO_MATCH: u8 = 2;

/// What a successful command run ended with.
enum Outcome {
    Matched,
    NoMatch,
}

/// The main entry point for the CLI.
pub fn run() -> ExitCode {
    let args = YantraArgs::parse();
    init_tracing(args.command.trace());

    // Dispatch to the appropriate subcommand handler.
    let result = match args.command {
        Command::Parse {
            grammar,
            config,
            offset,
            length,
            json,
            trace,
            file,
        } => handle_parse(&ParseRequest {
            grammar: &grammar,
            config: config.as_deref(),
            offset,
            length,
            json,
            trace,
            file: &file,
        }),
        Command::Check { grammar } => handle_check(&grammar),
    };

    match result {
        Ok(Outcome::Matched) => ExitCode::SUCCESS,
        Ok(Outcome::NoMatch) => {
            output::print_no_match();
            ExitCode::from(NO_MATCH)
        }
        Err(error) => {
            output::print_error(error);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(trace: bool) {
    let filter = if trace {
        EnvFilter::new("trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // a subscriber installed by an embedding program wins
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

struct ParseRequest<'a> {
    grammar: &'a Path,
    config: Option<&'a Path>,
    offset: Option<u64>,
    length: Option<u64>,
    json: bool,
    trace: bool,
    file: &'a Path,
}

/// Handles the `parse` subcommand.
fn handle_parse(request: &ParseRequest<'_>) -> YantraResult<Outcome> {
    let grammar = GrammarFile::load(request.grammar)?;
    let root = grammar.build()?;
    let mut config = match request.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.trace |= request.trace;

    let stream = FileByteStream::open(request.file).map_err(|cause| {
        err_io!(format!("cannot open {}", request.file.display()), cause)
    })?;
    let size = stream.size();
    let source = Source::stream(stream);
    let source = match (request.offset, request.length) {
        (None, None) => source,
        (offset, length) => {
            let offset = offset.unwrap_or(0);
            let length = length.unwrap_or_else(|| size.saturating_sub(offset));
            let window = Slice::create(source, BigInt::from(offset), BigInt::from(length))
                .ok_or_else(|| {
                    err_ctx!(
                        Io,
                        format!("window of {length} bytes at offset {offset} is outside the file"),
                        format!("the file is {size} bytes long")
                    )
                })?;
            Source::sub(window)
        }
    };

    let engine = Engine::with_config(config);
    let Some(state) = engine.parse(&root, ParseState::from_source(source, BigInt::from(0)))? else {
        return Ok(Outcome::NoMatch);
    };
    if request.json {
        output::print_json(state.order())?;
    } else {
        output::print_tree(state.order())?;
    }
    Ok(Outcome::Matched)
}

/// Handles the `check` subcommand.
fn handle_check(path: &Path) -> YantraResult<Outcome> {
    let root = GrammarFile::load(path)?.build()?;
    output::print_check_ok(&root.to_string());
    Ok(Outcome::Matched)
}
