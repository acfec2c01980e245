//!
//! # Overview
//!
//! This module defines the unified, `miette`-based error type for the Yantra engine.
//! Every fallible operation in the crate reports a [`YantraError`]. Ordinary parse
//! failures are *not* errors: a token that does not match returns `Ok(None)` and the
//! enclosing combinator is free to backtrack. A `YantraError` always unwinds past any
//! in-progress backtracking, because it means the grammar itself is ill-formed for
//! the input, or the byte source could not be read.
//!
//! # Error Construction Macros
//!
//! - **Use `err_msg!` for message-only errors.**
//!   - `err_msg!(Construction, "Def requires a name")`
//!   - `err_msg!(Evaluation, "size evaluated to {} values", n)`
//!
//! - **Use `err_ctx!` for errors with a help message, or with a source and span.**
//!   - `err_ctx!(Evaluation, "negative size", "sizes must be >= 0")`
//!   - `err_ctx!(Grammar, "invalid grammar", src, span)`
//!
//! - **Use `err_io!` to wrap an `std::io::Error` raised by a byte source.**
//!
//! Never build `ErrorContext` by hand when one of the macros fits.

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

// Type aliases for clarity and brevity
pub type SourceArc = Arc<NamedSource<String>>;
pub type YantraResult<T> = Result<T, YantraError>;

/// Byte range inside a textual source (grammar or configuration file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Type-safe error classification enum that corresponds to YantraError variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Grammar definition contract violated while building tokens
    Construction,
    /// Expression evaluated to something the grammar may never produce
    Evaluation,
    /// Byte source could not service a read
    Io,
    /// Grammar file could not be read or deserialized
    Grammar,
    /// Configuration file could not be read or deserialized
    Config,
    /// Internal engine invariants broken
    Internal,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Construction => "construction",
            ErrorType::Evaluation => "evaluation",
            ErrorType::Io => "io",
            ErrorType::Grammar => "grammar",
            ErrorType::Config => "config",
            ErrorType::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimal, composable error context for diagnostics.
#[derive(Debug, Default)]
pub struct ErrorContext {
    /// The textual source this error points into (if any).
    pub source: Option<SourceArc>,
    /// The primary span for this error (if any).
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
}

impl ErrorContext {
    /// Returns an empty error context (no source, span, or help).
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a context carrying only a help message.
    pub fn with_help(help: impl Into<String>) -> Self {
        Self {
            help: Some(help.into()),
            ..Self::default()
        }
    }

    /// Creates a context with both source and span.
    pub fn with_source_and_span(source: SourceArc, span: Span) -> Self {
        Self {
            source: Some(source),
            span: Some(span),
            help: None,
        }
    }
}

/// Unified error type for all Yantra engine failure modes.
#[derive(Debug, Error)]
pub enum YantraError {
    #[error("Construction error: {message}")]
    Construction {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Evaluation error: {message}")]
    Evaluation {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Source error: {message}")]
    Io {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Grammar error: {message}")]
    Grammar {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl YantraError {
    fn get_ctx(&self) -> &ErrorContext {
        match self {
            YantraError::Construction { ctx, .. } => ctx,
            YantraError::Evaluation { ctx, .. } => ctx,
            YantraError::Io { ctx, .. } => ctx,
            YantraError::Grammar { ctx, .. } => ctx,
            YantraError::Config { ctx, .. } => ctx,
            YantraError::Internal { ctx, .. } => ctx,
        }
    }

    fn message(&self) -> &str {
        match self {
            YantraError::Construction { message, .. }
            | YantraError::Evaluation { message, .. }
            | YantraError::Io { message, .. }
            | YantraError::Grammar { message, .. }
            | YantraError::Config { message, .. }
            | YantraError::Internal { message, .. } => message,
        }
    }

    /// Returns the type-safe error classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            YantraError::Construction { .. } => ErrorType::Construction,
            YantraError::Evaluation { .. } => ErrorType::Evaluation,
            YantraError::Io { .. } => ErrorType::Io,
            YantraError::Grammar { .. } => ErrorType::Grammar,
            YantraError::Config { .. } => ErrorType::Config,
            YantraError::Internal { .. } => ErrorType::Internal,
        }
    }

    /// Attaches the originating error, keeping the message and context.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        let slot = match &mut self {
            YantraError::Construction { source, .. }
            | YantraError::Evaluation { source, .. }
            | YantraError::Io { source, .. }
            | YantraError::Grammar { source, .. }
            | YantraError::Config { source, .. }
            | YantraError::Internal { source, .. } => source,
        };
        *slot = Some(Box::new(cause));
        self
    }
}

impl Diagnostic for YantraError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("yantra::{}", self.error_type())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.get_ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.get_ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.get_ctx().span?;
        let len = if span.end > span.start {
            span.end - span.start
        } else {
            1
        };
        let label = LabeledSpan::new(Some(self.message().to_string()), span.start, len);
        Some(Box::new(std::iter::once(label)))
    }
}

/// Converts a named text into an `Arc<NamedSource<String>>` for use in error contexts.
pub fn to_error_source(name: impl AsRef<str>, text: impl AsRef<str>) -> SourceArc {
    Arc::new(NamedSource::new(name.as_ref(), text.as_ref().to_string()))
}

/// Constructs a YantraError variant with a formatted message and no context.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $($fmt:tt)+) => {
        $crate::YantraError::$variant {
            message: format!($($fmt)+),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
}

/// Constructs a YantraError variant with a message and context.
///
/// - `err_ctx!(Variant, msg, help)` attaches a help message.
/// - `err_ctx!(Variant, msg, src, span)` points into a textual source.
#[macro_export]
macro_rules! err_ctx {
    ($variant:ident, $msg:expr, $src:expr, $span:expr) => {
        $crate::YantraError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_source_and_span(
                $crate::diagnostics::SourceArc::clone($src),
                $span,
            ),
            source: None,
        }
    };
    ($variant:ident, $msg:expr, $help:expr) => {
        $crate::YantraError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_help(format!("{}", $help)),
            source: None,
        }
    };
}

/// Wraps an `std::io::Error` raised while reading a byte source.
#[macro_export]
macro_rules! err_io {
    ($msg:expr, $cause:expr) => {
        $crate::YantraError::Io {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::none(),
            source: Some(Box::new($cause)),
        }
    };
}
