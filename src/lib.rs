//! Yantra: a declarative engine for describing binary formats as compositions of
//! small grammar tokens and running them over byte sources.
//!
//! A grammar is a tree of [`Token`]s. Running one produces a [`ParseState`] whose
//! [`ParseGraph`] holds every named value found, in order. A token that does not
//! match returns `Ok(None)`; a [`YantraError`] means the grammar or the input source
//! is unusable.

pub use crate::diagnostics::{to_error_source, ErrorContext, ErrorType, YantraError, YantraResult};
pub use crate::encoding::{ByteOrder, Charset, Encoding, Sign};
pub use crate::engine::Engine;
pub use crate::environment::{Environment, ParseHook, TracingHook};
pub use crate::expression::{Comparison, Predicate, ValueExpr};
pub use crate::graph::{ParseGraph, ParseItem, ParseReference, ParseValue};
pub use crate::source::{ByteStream, Slice, Source};
pub use crate::state::ParseState;
pub use crate::token::{ParseResult, Token, TokenKind};
pub use crate::value::{CoreValue, Value, ValueList};

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod encoding;
pub mod engine;
pub mod environment;
pub mod expression;
pub mod grammar;
pub mod graph;
pub mod source;
pub mod state;
pub mod token;
pub mod trampoline;
pub mod value;
