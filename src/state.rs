//! The immutable parse state threaded through every token.
//!
//! A [`ParseState`] bundles the read position, the active source, the parse graph built
//! so far, the stack of iteration counters, the cycle-detection keys visible to the
//! current subtree, the scope depth and a name index over parsed values. Every
//! operation returns a new state that shares all unchanged parts with the original,
//! so a failed alternative is discarded simply by not using its state.

use std::rc::Rc;

use im::{HashMap, HashSet, Vector};
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

use crate::graph::{name_matches, ParseGraph, ParseItem, ParseReference, ParseValue};
use crate::source::{ByteStream, Slice, Source};
use crate::token::Token;
use crate::YantraResult;

/// Identifies a structure being parsed at a location, for cycle detection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReferenceKey {
    pub offset: BigInt,
    pub source: Source,
    pub definition: Token,
}

/// One level of the iteration stack.
#[derive(Clone, Debug, PartialEq)]
pub struct Iteration {
    pub token: Token,
    pub count: BigInt,
}

// ============================================================================
// NAME CACHE
// ============================================================================

/// Values indexed by full name. Entries carry an insertion ordinal so lookups that
/// merge several names stay in parse order.
#[derive(Clone, Debug, Default)]
struct ValueCache {
    entries: HashMap<Rc<str>, Vector<(u64, ParseValue)>>,
    next: u64,
}

impl ValueCache {
    fn add(&self, value: ParseValue) -> Self {
        let key: Rc<str> = Rc::from(value.name());
        let mut entries = self.entries.clone();
        entries
            .entry(key)
            .or_default()
            .push_back((self.next, value));
        Self {
            entries,
            next: self.next + 1,
        }
    }

    fn find(&self, name: &str) -> Vec<ParseValue> {
        let mut found: Vec<(u64, ParseValue)> = self
            .entries
            .iter()
            .filter(|(key, _)| name_matches(key, name))
            .flat_map(|(_, values)| values.iter().cloned())
            .collect();
        found.sort_by_key(|(ordinal, _)| *ordinal);
        found.into_iter().map(|(_, value)| value).collect()
    }
}

// ============================================================================
// PARSE STATE
// ============================================================================

#[derive(Clone, Debug)]
pub struct ParseState {
    offset: BigInt,
    source: Source,
    order: ParseGraph,
    iterations: Vector<Iteration>,
    references: HashSet<ReferenceKey>,
    scope_depth: usize,
    cache: ValueCache,
}

impl ParseState {
    pub fn from_source(source: Source, offset: BigInt) -> Self {
        Self {
            offset,
            source,
            order: ParseGraph::empty(),
            iterations: Vector::new(),
            references: HashSet::new(),
            scope_depth: 0,
            cache: ValueCache::default(),
        }
    }

    pub fn from_stream(stream: impl ByteStream + 'static) -> Self {
        Self::from_source(Source::stream(stream), BigInt::zero())
    }

    /// A state reading only the bytes of `slice`, addressed from zero.
    pub fn from_slice(slice: Slice) -> Self {
        Self::from_source(Source::sub(slice), BigInt::zero())
    }

    pub fn offset(&self) -> &BigInt {
        &self.offset
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn order(&self) -> &ParseGraph {
        &self.order
    }

    pub fn references(&self) -> &HashSet<ReferenceKey> {
        &self.references
    }

    pub fn scope_depth(&self) -> usize {
        self.scope_depth
    }

    /// Innermost iteration first.
    pub fn iterations(&self) -> &Vector<Iteration> {
        &self.iterations
    }

    /// The counter `level` loops out from the innermost one.
    pub fn current_iteration(&self, level: usize) -> Option<&BigInt> {
        self.iterations.get(level).map(|iteration| &iteration.count)
    }

    pub fn add(&self, value: ParseValue) -> Self {
        Self {
            cache: self.cache.add(value.clone()),
            order: self.order.add(ParseItem::Value(value)),
            ..self.clone()
        }
    }

    pub fn add_reference(&self, reference: ParseReference) -> Self {
        Self {
            order: self.order.add(ParseItem::Reference(reference)),
            ..self.clone()
        }
    }

    /// Opens a branch for `token`; iterable tokens also push a fresh counter and scope
    /// delimiters deepen the scope.
    pub fn add_branch(&self, token: &Token) -> Self {
        let mut iterations = self.iterations.clone();
        if token.is_iterable() {
            iterations.push_front(Iteration {
                token: token.clone(),
                count: BigInt::zero(),
            });
        }
        Self {
            order: self.order.add_branch(token),
            iterations,
            scope_depth: self.scope_depth + usize::from(token.is_scope_delimiter()),
            ..self.clone()
        }
    }

    /// Closes the branch opened by [`ParseState::add_branch`] for the same token.
    pub fn close_branch(&self, token: &Token) -> YantraResult<Self> {
        let mut iterations = self.iterations.clone();
        if token.is_iterable() {
            iterations.pop_front();
        }
        Ok(Self {
            order: self.order.close_branch(token)?,
            iterations,
            scope_depth: self.scope_depth - usize::from(token.is_scope_delimiter()),
            ..self.clone()
        })
    }

    /// Counts one more completed iteration of the innermost loop.
    pub fn iterate(&self) -> Self {
        let mut iterations = self.iterations.clone();
        if let Some(innermost) = iterations.front_mut() {
            innermost.count += BigInt::one();
        }
        Self {
            iterations,
            ..self.clone()
        }
    }

    /// Moves to `offset`; negative offsets do not exist.
    pub fn seek(&self, offset: BigInt) -> Option<Self> {
        if offset.is_negative() {
            return None;
        }
        Some(Self {
            offset,
            ..self.clone()
        })
    }

    pub fn with_source(&self, source: Source, offset: BigInt) -> Self {
        Self {
            source,
            offset,
            ..self.clone()
        }
    }

    pub fn with_reference(&self, key: ReferenceKey) -> Self {
        Self {
            references: self.references.update(key),
            ..self.clone()
        }
    }

    pub fn with_references(&self, references: HashSet<ReferenceKey>) -> Self {
        Self {
            references,
            ..self.clone()
        }
    }

    pub fn has_reference(&self, key: &ReferenceKey) -> bool {
        self.references.contains(key)
    }

    /// The next `length` bytes, if the source has them.
    pub fn slice(&self, length: &BigInt) -> Option<Slice> {
        Slice::create(self.source.clone(), self.offset.clone(), length.clone())
    }

    /// Values whose name matches `name`, oldest first, served from the name index.
    pub fn cached(&self, name: &str) -> Vec<ParseValue> {
        self.cache.find(name)
    }
}

impl PartialEq for ParseState {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
            && self.scope_depth == other.scope_depth
            && self.source == other.source
            && self.iterations == other.iterations
            && self.references == other.references
            && self.order == other.order
    }
}
