//! The persistent parse graph.
//!
//! A [`ParseGraph`] is an immutable, reference-counted cons list of [`ParseItem`]s,
//! newest first. Appending allocates one node that points at the unchanged tail, so
//! every earlier graph stays valid and backtracking is just dropping a reference.
//!
//! Nested structure is built with [`ParseGraph::add_branch`] and
//! [`ParseGraph::close_branch`]: opening pushes an empty graph owned by a token, every
//! later `add` lands in the innermost open branch, and closing folds it back into its
//! parent as one `Graph` item. Only the chain of open branches is path-copied.
//!
//! All traversals are loops over explicit stacks, and dropping a node unlinks its
//! successors iteratively, so graphs as long or as deep as the input never grow the
//! native stack.

use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;

use crate::source::{Slice, Source};
use crate::token::Token;
use crate::trampoline::Trampoline;
use crate::value::CoreValue;
use crate::{err_msg, YantraResult};

/// Separator between the segments of a dotted value name.
pub const SEPARATOR: char = '.';

/// True when `full` equals `requested` or ends with it at a segment boundary:
/// `"a.b"` matches `"x.a.b"` but never `"xa.b"`.
pub fn name_matches(full: &str, requested: &str) -> bool {
    if full == requested {
        return true;
    }
    full.len() > requested.len()
        && full.ends_with(requested)
        && full[..full.len() - requested.len()].ends_with(SEPARATOR)
}

// ============================================================================
// ITEMS
// ============================================================================

/// A named, successfully parsed leaf.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseValue {
    name: Rc<str>,
    definition: Token,
    value: CoreValue,
}

impl ParseValue {
    pub fn new(name: impl Into<Rc<str>>, definition: Token, value: CoreValue) -> Self {
        Self {
            name: name.into(),
            definition,
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &Token {
        &self.definition
    }

    pub fn value(&self) -> &CoreValue {
        &self.value
    }

    pub fn slice(&self) -> &Slice {
        self.value.slice()
    }

    pub fn matches(&self, requested: &str) -> bool {
        name_matches(&self.name, requested)
    }
}

/// A back-reference recorded instead of re-parsing a structure already being parsed
/// at the same location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseReference {
    location: BigInt,
    source: Source,
    definition: Token,
}

impl ParseReference {
    pub fn new(location: BigInt, source: Source, definition: Token) -> Self {
        Self {
            location,
            source,
            definition,
        }
    }

    pub fn location(&self) -> &BigInt {
        &self.location
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn definition(&self) -> &Token {
        &self.definition
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParseItem {
    Value(ParseValue),
    Graph(ParseGraph),
    Reference(ParseReference),
}

impl ParseItem {
    pub fn as_value(&self) -> Option<&ParseValue> {
        match self {
            ParseItem::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_graph(&self) -> Option<&ParseGraph> {
        match self {
            ParseItem::Graph(graph) => Some(graph),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&ParseReference> {
        match self {
            ParseItem::Reference(reference) => Some(reference),
            _ => None,
        }
    }
}

// ============================================================================
// GRAPH
// ============================================================================

struct Node {
    head: ParseItem,
    tail: Option<Rc<Node>>,
}

impl Drop for Node {
    fn drop(&mut self) {
        let mut pending: Vec<Rc<Node>> = Vec::new();
        pending.extend(self.tail.take());
        if let ParseItem::Graph(graph) = &mut self.head {
            pending.extend(graph.items.take());
        }
        while let Some(node) = pending.pop() {
            if let Ok(mut node) = Rc::try_unwrap(node) {
                pending.extend(node.tail.take());
                if let ParseItem::Graph(graph) = &mut node.head {
                    pending.extend(graph.items.take());
                }
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct ParseGraph {
    definition: Option<Token>,
    items: Option<Rc<Node>>,
    branched: bool,
    size: usize,
}

impl ParseGraph {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn for_definition(definition: Token) -> Self {
        Self {
            definition: Some(definition),
            ..Self::default()
        }
    }

    pub fn definition(&self) -> Option<&Token> {
        self.definition.as_ref()
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// True while the newest item is a nested graph that is still being built.
    pub fn is_branched(&self) -> bool {
        self.branched
    }

    pub fn head(&self) -> Option<&ParseItem> {
        self.items.as_ref().map(|node| &node.head)
    }

    /// Everything but the newest item.
    pub fn tail(&self) -> ParseGraph {
        match &self.items {
            None => self.clone(),
            Some(node) => ParseGraph {
                definition: self.definition.clone(),
                items: node.tail.clone(),
                branched: false,
                size: self.size - 1,
            },
        }
    }

    /// Items of this level, newest first.
    pub fn items(&self) -> Items<'_> {
        Items {
            node: self.items.as_ref(),
        }
    }

    /// Items of every level in depth-first order, newest first. Nested graphs are
    /// yielded before their contents.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![self.items.as_ref()],
        }
    }

    fn push(&self, head: ParseItem, branched: bool) -> ParseGraph {
        ParseGraph {
            definition: self.definition.clone(),
            items: Some(Rc::new(Node {
                head,
                tail: self.items.clone(),
            })),
            branched,
            size: self.size + 1,
        }
    }

    fn replace_head(&self, head: ParseItem, branched: bool) -> ParseGraph {
        ParseGraph {
            definition: self.definition.clone(),
            items: Some(Rc::new(Node {
                head,
                tail: self.items.as_ref().and_then(|node| node.tail.clone()),
            })),
            branched,
            size: self.size,
        }
    }

    fn open_branch(&self) -> Option<&ParseGraph> {
        if self.branched {
            self.head().and_then(ParseItem::as_graph)
        } else {
            None
        }
    }

    /// Follows open branches from `self` while `descend` holds. Returns the graphs
    /// passed through, outermost first, and the graph where the walk stopped.
    fn open_chain(
        &self,
        descend: impl Fn(&ParseGraph) -> bool,
    ) -> (Vec<&ParseGraph>, &ParseGraph) {
        let mut chain: Vec<&ParseGraph> = Vec::new();
        let mut current = self;
        while descend(current) {
            let Some(inner) = current.open_branch() else {
                break;
            };
            chain.push(current);
            current = inner;
        }
        (chain, current)
    }

    /// Path-copies `chain` back up around a replacement for its innermost graph.
    fn rebuild(mut chain: Vec<&ParseGraph>, mut rebuilt: ParseGraph) -> ParseGraph {
        while let Some(parent) = chain.pop() {
            rebuilt = parent.replace_head(ParseItem::Graph(rebuilt), true);
        }
        rebuilt
    }

    /// Prepends `item` to the innermost open branch.
    pub fn add(&self, item: ParseItem) -> ParseGraph {
        let (chain, innermost) = self.open_chain(|graph| graph.branched);
        let pushed = innermost.push(item, false);
        Self::rebuild(chain, pushed)
    }

    /// Opens a new, empty branch owned by `definition` inside the innermost open branch.
    pub fn add_branch(&self, definition: &Token) -> ParseGraph {
        let branch = ParseItem::Graph(ParseGraph::for_definition(definition.clone()));
        let (chain, innermost) = self.open_chain(|graph| graph.branched);
        let pushed = innermost.push(branch, true);
        Self::rebuild(chain, pushed)
    }

    /// Closes the innermost open branch, which must be owned by `definition`.
    pub fn close_branch(&self, definition: &Token) -> YantraResult<ParseGraph> {
        let (chain, parent) =
            self.open_chain(|graph| graph.open_branch().is_some_and(|inner| inner.branched));
        let branch = parent.open_branch().ok_or_else(|| {
            err_msg!(Internal, "no open branch to close for '{}'", definition.name())
        })?;
        if branch.definition.as_ref() != Some(definition) {
            return Err(err_msg!(
                Internal,
                "innermost open branch does not belong to '{}'",
                definition.name()
            ));
        }
        let closed = parent.replace_head(ParseItem::Graph(branch.clone()), false);
        Ok(Self::rebuild(chain, closed))
    }

    /// True when the newest `count` items equal the `count` items recorded before them.
    pub fn repeats_last(&self, count: usize) -> bool {
        if count == 0 || self.size < 2 * count {
            return false;
        }
        let newest = self.items().take(count);
        let before = self.items().skip(count).take(count);
        newest.zip(before).all(|(a, b)| a == b)
    }

    /// Open branches from the outermost to the innermost.
    pub fn open_branches(&self) -> Vec<&ParseGraph> {
        let mut chain = Vec::new();
        let mut current = self.open_branch();
        while let Some(graph) = current {
            chain.push(graph);
            current = graph.open_branch();
        }
        chain
    }

    /// The graph to search when looking back `scope` enclosing scope delimiters:
    /// 0 is the innermost open delimiter. Beyond the outermost, the whole graph.
    pub fn scoped(&self, scope: usize) -> ParseGraph {
        let delimiters: Vec<&ParseGraph> = self
            .open_branches()
            .into_iter()
            .filter(|graph| graph.definition.as_ref().is_some_and(Token::is_scope_delimiter))
            .collect();
        if scope < delimiters.len() {
            delimiters[delimiters.len() - 1 - scope].clone()
        } else {
            self.clone()
        }
    }

    /// All values, oldest first.
    pub fn values(&self) -> Vec<ParseValue> {
        let mut values: Vec<ParseValue> =
            self.walk().filter_map(ParseItem::as_value).cloned().collect();
        values.reverse();
        values
    }

    /// Values whose name equals `name` or ends with it at a dot boundary, oldest first.
    pub fn get(&self, name: &str) -> Vec<ParseValue> {
        let mut values: Vec<ParseValue> = self
            .walk()
            .filter_map(ParseItem::as_value)
            .filter(|value| value.matches(name))
            .cloned()
            .collect();
        values.reverse();
        values
    }

    /// Like [`ParseGraph::get`], restricted to `scope` enclosing scope delimiters.
    pub fn get_scoped(&self, name: &str, scope: usize) -> Vec<ParseValue> {
        self.scoped(scope).get(name)
    }

    /// Values produced by `definition`, oldest first.
    pub fn get_definition(&self, definition: &Token) -> Vec<ParseValue> {
        let mut values: Vec<ParseValue> = self
            .walk()
            .filter_map(ParseItem::as_value)
            .filter(|value| value.definition() == definition)
            .cloned()
            .collect();
        values.reverse();
        values
    }

    /// The most recently parsed value.
    pub fn current(&self) -> Option<ParseValue> {
        self.walk().find_map(ParseItem::as_value).cloned()
    }

    /// Finds the token definition named `name`: enclosing open branches first,
    /// innermost first, then everything else newest first.
    pub fn find_definition(&self, name: &str) -> Option<Token> {
        let mut open = self.open_branches();
        open.reverse();
        let enclosing = open
            .into_iter()
            .filter_map(|graph| graph.definition.as_ref())
            .find(|token| name_matches(token.name(), name));
        if let Some(token) = enclosing {
            return Some(token.clone());
        }
        self.walk()
            .find_map(|item| {
                let definition = match item {
                    ParseItem::Value(value) => Some(value.definition()),
                    ParseItem::Graph(graph) => graph.definition(),
                    ParseItem::Reference(reference) => Some(reference.definition()),
                };
                definition.filter(|token| name_matches(token.name(), name))
            })
            .cloned()
    }

    /// Finds the earlier occurrence a back-reference points at: the graph produced by
    /// the reference's definition whose first value starts at its location.
    pub fn resolve_reference(&self, reference: &ParseReference) -> Option<ParseGraph> {
        self.walk()
            .filter_map(ParseItem::as_graph)
            .find(|graph| {
                graph.definition() == Some(reference.definition())
                    && graph.values().first().is_some_and(|first| {
                        first.slice().offset() == reference.location()
                            && first.slice().source() == reference.source()
                    })
            })
            .cloned()
    }

    /// A deep copy with every level in chronological order (oldest item at the head).
    pub fn reversed(&self) -> ParseGraph {
        reverse_step(vec![ReverseFrame::new(self)]).run()
    }
}

struct ReverseFrame {
    pending: Vec<ParseItem>,
    built: ParseGraph,
}

impl ReverseFrame {
    fn new(graph: &ParseGraph) -> Self {
        let mut pending: Vec<ParseItem> = graph.items().cloned().collect();
        // popped newest first, so the oldest item ends up at the head
        pending.reverse();
        Self {
            pending,
            built: ParseGraph {
                definition: graph.definition.clone(),
                ..ParseGraph::default()
            },
        }
    }
}

fn reverse_step(mut frames: Vec<ReverseFrame>) -> Trampoline<'static, ParseGraph> {
    let Some(frame) = frames.last_mut() else {
        return Trampoline::done(ParseGraph::empty());
    };
    match frame.pending.pop() {
        Some(ParseItem::Graph(nested)) => frames.push(ReverseFrame::new(&nested)),
        Some(item) => frame.built = frame.built.push(item, false),
        None => {
            let finished = frames.pop().map(|frame| frame.built).unwrap_or_default();
            match frames.last_mut() {
                Some(parent) => parent.built = parent.built.push(ParseItem::Graph(finished), false),
                None => return Trampoline::done(finished),
            }
        }
    }
    Trampoline::bounce(move || reverse_step(frames))
}

impl PartialEq for ParseGraph {
    fn eq(&self, other: &Self) -> bool {
        let mut pending: Vec<(&ParseGraph, &ParseGraph)> = vec![(self, other)];
        while let Some((left, right)) = pending.pop() {
            if left.size != right.size
                || left.branched != right.branched
                || left.definition != right.definition
            {
                return false;
            }
            if let (Some(a), Some(b)) = (&left.items, &right.items) {
                if Rc::ptr_eq(a, b) {
                    continue;
                }
            }
            for (a, b) in left.items().zip(right.items()) {
                match (a, b) {
                    (ParseItem::Graph(a), ParseItem::Graph(b)) => pending.push((a, b)),
                    (ParseItem::Value(a), ParseItem::Value(b)) if a == b => {}
                    (ParseItem::Reference(a), ParseItem::Reference(b)) if a == b => {}
                    _ => return false,
                }
            }
        }
        true
    }
}

impl fmt::Debug for ParseGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseGraph")
            .field("definition", &self.definition.as_ref().map(Token::name))
            .field("size", &self.size)
            .field("branched", &self.branched)
            .finish()
    }
}

// ============================================================================
// ITERATORS
// ============================================================================

pub struct Items<'a> {
    node: Option<&'a Rc<Node>>,
}

impl<'a> Iterator for Items<'a> {
    type Item = &'a ParseItem;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.node?;
        self.node = node.tail.as_ref();
        Some(&node.head)
    }
}

pub struct Walk<'a> {
    stack: Vec<Option<&'a Rc<Node>>>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a ParseItem;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let cursor = self.stack.last_mut()?;
            let Some(node) = cursor.take() else {
                self.stack.pop();
                continue;
            };
            *cursor = node.tail.as_ref();
            if let ParseItem::Graph(graph) = &node.head {
                self.stack.push(graph.items.as_ref());
            }
            return Some(&node.head);
        }
    }
}
