//! Read-only, addressable byte sources and the slices that window them.
//!
//! A [`Source`] is one of:
//!
//! - **Stream**: backed by an external [`ByteStream`] (file, memory, ...)
//! - **Constant**: owned bytes, used for literals and computed values
//! - **Sub**: a bounded view over a [`Slice`] of another source
//! - **Concatenated**: the logical concatenation of several values
//! - **DataExpression**: the bytes of a value obtained by re-evaluating an expression
//!   against a base parse state, materialized lazily once
//!
//! Sources are immutable. Equality is structural: two sources are equal when they are
//! the same variant over equal constituents. A stream's constituent is the shared
//! stream object itself, so streams compare by that object's address.

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use once_cell::unsync::OnceCell;

use crate::encoding::Encoding;
use crate::expression::ValueExpr;
use crate::state::ParseState;
use crate::value::{CoreValue, Value};
use crate::{err_io, err_msg, YantraResult};

pub mod stream;

pub use stream::{ByteStream, FileByteStream, InMemoryByteStream};

// ============================================================================
// SOURCE
// ============================================================================

#[derive(Clone, Debug)]
pub enum Source {
    Stream(Rc<dyn ByteStream>),
    Constant(Rc<[u8]>),
    Sub(Rc<Slice>),
    Concatenated(Rc<ConcatenatedSource>),
    DataExpression(Rc<DataExpressionSource>),
}

impl Source {
    pub fn stream(stream: impl ByteStream + 'static) -> Self {
        Source::Stream(Rc::new(stream))
    }

    pub fn constant(bytes: impl Into<Rc<[u8]>>) -> Self {
        Source::Constant(bytes.into())
    }

    /// A view exposing exactly the bytes of `slice`, addressed from zero.
    pub fn sub(slice: Slice) -> Self {
        Source::Sub(Rc::new(slice))
    }

    /// Concatenates values; `None` when any of them is `NotAValue`.
    pub fn concatenated(values: &[Value]) -> Option<Self> {
        let values = values
            .iter()
            .map(|value| value.as_core().cloned())
            .collect::<Option<Vec<_>>>()?;
        let length = values
            .iter()
            .fold(BigInt::zero(), |total, value| total + value.length());
        Some(Source::Concatenated(Rc::new(ConcatenatedSource { values, length })))
    }

    pub fn data_expression(
        expression: ValueExpr,
        index: usize,
        state: ParseState,
        encoding: Encoding,
    ) -> Self {
        Source::DataExpression(Rc::new(DataExpressionSource {
            expression,
            index,
            state,
            encoding,
            resolved: OnceCell::new(),
        }))
    }

    pub fn is_available(&self, offset: &BigInt, length: &BigInt) -> bool {
        if offset.is_negative() || length.is_negative() {
            return false;
        }
        match self {
            Source::Stream(stream) => stream.is_available(offset, length),
            Source::Constant(bytes) => offset + length <= BigInt::from(bytes.len()),
            Source::Sub(slice) => offset + length <= *slice.length(),
            Source::Concatenated(concatenated) => offset + length <= concatenated.length,
            Source::DataExpression(data) => data
                .resolve()
                .is_some_and(|slice| offset + length <= *slice.length()),
        }
    }

    pub fn read(&self, offset: &BigInt, length: &BigInt) -> YantraResult<Vec<u8>> {
        if !self.is_available(offset, length) {
            return Err(err_msg!(
                Io,
                "read of {} bytes at offset {} is outside the source",
                length,
                offset
            ));
        }
        match self {
            Source::Stream(stream) => stream.read(offset, length).map_err(|cause| {
                err_io!(
                    format!("stream read of {length} bytes at offset {offset} failed"),
                    cause
                )
            }),
            Source::Constant(bytes) => {
                let start = to_index(offset)?;
                let end = start + to_index(length)?;
                Ok(bytes[start..end].to_vec())
            }
            Source::Sub(slice) => slice.source().read(&(slice.offset() + offset), length),
            Source::Concatenated(concatenated) => concatenated.read(offset, length),
            Source::DataExpression(data) => {
                let slice = data.resolve().ok_or_else(|| {
                    err_msg!(Internal, "data expression no longer yields value {}", data.index)
                })?;
                slice.source().read(&(slice.offset() + offset), length)
            }
        }
    }
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Source::Stream(a), Source::Stream(b)) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            (Source::Constant(a), Source::Constant(b)) => a == b,
            (Source::Sub(a), Source::Sub(b)) => a == b,
            (Source::Concatenated(a), Source::Concatenated(b)) => a == b,
            (Source::DataExpression(a), Source::DataExpression(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Source {}

impl Hash for Source {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Source::Stream(stream) => (Rc::as_ptr(stream) as *const () as usize).hash(state),
            Source::Constant(bytes) => bytes.hash(state),
            Source::Sub(slice) => slice.hash(state),
            Source::Concatenated(concatenated) => concatenated.hash(state),
            Source::DataExpression(data) => data.hash(state),
        }
    }
}

/// Converts a non-negative range bound to a native index.
pub(crate) fn to_index(value: &BigInt) -> YantraResult<usize> {
    value
        .to_usize()
        .ok_or_else(|| err_msg!(Io, "offset {} does not fit in memory", value))
}

// ============================================================================
// CONCATENATED AND DATA-EXPRESSION SOURCES
// ============================================================================

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ConcatenatedSource {
    values: Vec<CoreValue>,
    length: BigInt,
}

impl ConcatenatedSource {
    pub fn values(&self) -> &[CoreValue] {
        &self.values
    }

    pub fn length(&self) -> &BigInt {
        &self.length
    }

    fn read(&self, offset: &BigInt, length: &BigInt) -> YantraResult<Vec<u8>> {
        let end = offset + length;
        let mut out = Vec::with_capacity(to_index(length)?);
        let mut start_of_value = BigInt::zero();
        for value in &self.values {
            let end_of_value = &start_of_value + value.length();
            let from = offset.max(&start_of_value);
            let to = (&end).min(&end_of_value);
            if from < to {
                let slice = value.slice();
                let part = slice
                    .source()
                    .read(&(slice.offset() + (from - &start_of_value)), &(to - from))?;
                out.extend(part);
            }
            if end_of_value >= end {
                break;
            }
            start_of_value = end_of_value;
        }
        Ok(out)
    }
}

#[derive(Debug)]
pub struct DataExpressionSource {
    expression: ValueExpr,
    index: usize,
    state: ParseState,
    encoding: Encoding,
    resolved: OnceCell<Option<Slice>>,
}

impl DataExpressionSource {
    // Tie evaluated the same expression against the same state before creating this
    // source, so a repeat evaluation cannot fail.
    fn resolve(&self) -> Option<&Slice> {
        self.resolved
            .get_or_init(|| {
                let values = self.expression.eval(&self.state, &self.encoding).ok()?;
                values.get(self.index)?.as_core().map(|value| value.slice().clone())
            })
            .as_ref()
    }
}

impl PartialEq for DataExpressionSource {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.encoding == other.encoding
            && self.expression == other.expression
            && self.state == other.state
    }
}

impl Eq for DataExpressionSource {}

impl Hash for DataExpressionSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.expression.hash(state);
        self.index.hash(state);
        self.encoding.hash(state);
        self.state.offset().hash(state);
    }
}

// ============================================================================
// SLICE
// ============================================================================

/// A byte window `(source, offset, length)` over a source.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Slice {
    source: Source,
    offset: BigInt,
    length: BigInt,
}

impl Slice {
    /// Creates the slice if the source can serve it.
    pub fn create(source: Source, offset: BigInt, length: BigInt) -> Option<Self> {
        source.is_available(&offset, &length).then_some(Self {
            source,
            offset,
            length,
        })
    }

    /// A slice covering all of `bytes`.
    pub fn constant(bytes: impl Into<Rc<[u8]>>) -> Self {
        let bytes: Rc<[u8]> = bytes.into();
        let length = BigInt::from(bytes.len());
        Self {
            source: Source::Constant(bytes),
            offset: BigInt::zero(),
            length,
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn offset(&self) -> &BigInt {
        &self.offset
    }

    pub fn length(&self) -> &BigInt {
        &self.length
    }

    pub fn end(&self) -> BigInt {
        &self.offset + &self.length
    }

    /// Reads the window's bytes from its source.
    pub fn data(&self) -> YantraResult<Vec<u8>> {
        self.source.read(&self.offset, &self.length)
    }
}
