//! Grammar primitives.
//!
//! A [`Token`] is a shared, immutable node of a grammar tree. Each one turns an
//! [`Environment`] into either a new [`ParseState`] (bytes consumed, graph extended)
//! or an ordinary failure, `Ok(None)`, which leaves the caller free to try something
//! else. `Err` is reserved for grammars that are wrong for the input and for source
//! I/O errors, and unwinds past every choice.
//!
//! Tokens compare and hash by the identity assigned at construction, never by
//! structure, so self-referential grammars built with [`Token::token_ref`] can be used
//! as map keys without recursing.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::encoding::Encoding;
use crate::environment::Environment;
use crate::expression::{Predicate, ValueExpr};
use crate::state::ParseState;
use crate::{err_ctx, err_msg, YantraError, YantraResult};

mod engine;
mod iterate;
mod jump;

/// Outcome of a parse: `Ok(Some(state))` on success, `Ok(None)` on an ordinary failure.
pub type ParseResult = Result<Option<ParseState>, YantraError>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
pub enum TokenKind {
    Def {
        size: ValueExpr,
    },
    DefUntil {
        initial: ValueExpr,
        step: ValueExpr,
        max: Option<ValueExpr>,
        terminator: Token,
    },
    Seq(Vec<Token>),
    Cho(Vec<Token>),
    Rep(Token),
    RepN {
        token: Token,
        n: ValueExpr,
    },
    While {
        token: Token,
        predicate: Predicate,
    },
    Pre {
        token: Token,
        predicate: Predicate,
    },
    Post {
        token: Token,
        predicate: Predicate,
    },
    Sub {
        token: Token,
        address: ValueExpr,
    },
    Tie {
        token: Token,
        data: ValueExpr,
    },
    TokenRef(String),
}

impl TokenKind {
    pub fn label(&self) -> &'static str {
        match self {
            TokenKind::Def { .. } => "def",
            TokenKind::DefUntil { .. } => "def_until",
            TokenKind::Seq(_) => "seq",
            TokenKind::Cho(_) => "cho",
            TokenKind::Rep(_) => "rep",
            TokenKind::RepN { .. } => "rep_n",
            TokenKind::While { .. } => "while",
            TokenKind::Pre { .. } => "pre",
            TokenKind::Post { .. } => "post",
            TokenKind::Sub { .. } => "sub",
            TokenKind::Tie { .. } => "tie",
            TokenKind::TokenRef(_) => "token_ref",
        }
    }
}

#[derive(Debug)]
pub struct TokenDef {
    id: u64,
    name: String,
    encoding: Option<Encoding>,
    kind: TokenKind,
}

#[derive(Clone)]
pub struct Token(Rc<TokenDef>);

impl Token {
    fn build(name: impl Into<String>, kind: TokenKind) -> Self {
        Token(Rc::new(TokenDef {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            encoding: None,
            kind,
        }))
    }

    fn required_name(name: impl Into<String>, kind: &str) -> YantraResult<String> {
        let name = name.into();
        if name.is_empty() {
            return Err(err_ctx!(
                Construction,
                format!("{kind} requires a non-empty name"),
                "give the token a name so its values can be referenced"
            ));
        }
        Ok(name)
    }

    fn required_children(tokens: Vec<Token>, kind: &str, name: &str) -> YantraResult<Vec<Token>> {
        if tokens.is_empty() {
            return Err(err_msg!(Construction, "{} '{}' needs at least one token", kind, name));
        }
        Ok(tokens)
    }

    // ------------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------------

    /// Reads `size` bytes into a value named by the full scope.
    pub fn def(name: impl Into<String>, size: ValueExpr) -> YantraResult<Token> {
        let name = Self::required_name(name, "def")?;
        Ok(Self::build(name, TokenKind::Def { size }))
    }

    /// A `def` whose value must also satisfy `predicate`.
    pub fn def_where(
        name: impl Into<String>,
        size: ValueExpr,
        predicate: Predicate,
    ) -> YantraResult<Token> {
        Self::post("", Self::def(name, size)?, predicate)
    }

    /// Grows a value from `initial` bytes by `step` until `terminator` parses right
    /// after it, within `max` when given.
    pub fn def_until(
        name: impl Into<String>,
        initial: ValueExpr,
        step: ValueExpr,
        max: Option<ValueExpr>,
        terminator: Token,
    ) -> YantraResult<Token> {
        let name = Self::required_name(name, "def_until")?;
        Ok(Self::build(
            name,
            TokenKind::DefUntil {
                initial,
                step,
                max,
                terminator,
            },
        ))
    }

    pub fn seq(name: impl Into<String>, tokens: Vec<Token>) -> YantraResult<Token> {
        let name = name.into();
        let tokens = Self::required_children(tokens, "seq", &name)?;
        Ok(Self::build(name, TokenKind::Seq(tokens)))
    }

    pub fn cho(name: impl Into<String>, tokens: Vec<Token>) -> YantraResult<Token> {
        let name = name.into();
        let tokens = Self::required_children(tokens, "cho", &name)?;
        Ok(Self::build(name, TokenKind::Cho(tokens)))
    }

    pub fn rep(name: impl Into<String>, token: Token) -> YantraResult<Token> {
        Ok(Self::build(name, TokenKind::Rep(token)))
    }

    pub fn rep_n(name: impl Into<String>, token: Token, n: ValueExpr) -> YantraResult<Token> {
        Ok(Self::build(name, TokenKind::RepN { token, n }))
    }

    pub fn while_(name: impl Into<String>, token: Token, predicate: Predicate) -> YantraResult<Token> {
        Ok(Self::build(name, TokenKind::While { token, predicate }))
    }

    pub fn pre(name: impl Into<String>, token: Token, predicate: Predicate) -> YantraResult<Token> {
        Ok(Self::build(name, TokenKind::Pre { token, predicate }))
    }

    pub fn post(name: impl Into<String>, token: Token, predicate: Predicate) -> YantraResult<Token> {
        Ok(Self::build(name, TokenKind::Post { token, predicate }))
    }

    /// Parses `token` at each offset `address` evaluates to.
    pub fn sub(name: impl Into<String>, token: Token, address: ValueExpr) -> YantraResult<Token> {
        Ok(Self::build(name, TokenKind::Sub { token, address }))
    }

    /// Parses `token` inside the bytes of each value `data` evaluates to.
    pub fn tie(name: impl Into<String>, token: Token, data: ValueExpr) -> YantraResult<Token> {
        Ok(Self::build(name, TokenKind::Tie { token, data }))
    }

    /// Refers to the enclosing definition named `name`, resolved while parsing.
    pub fn token_ref(name: impl Into<String>) -> YantraResult<Token> {
        let name = Self::required_name(name, "token_ref")?;
        Ok(Self::build("", TokenKind::TokenRef(name)))
    }

    /// A copy of this token under a new identity that parses with `encoding`.
    pub fn with_encoding(&self, encoding: Encoding) -> Token {
        Token(Rc::new(TokenDef {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name: self.0.name.clone(),
            encoding: Some(encoding),
            kind: self.0.kind.clone(),
        }))
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn encoding(&self) -> Option<&Encoding> {
        self.0.encoding.as_ref()
    }

    pub fn kind(&self) -> &TokenKind {
        &self.0.kind
    }

    pub(crate) fn is_reference(&self) -> bool {
        matches!(self.0.kind, TokenKind::TokenRef(_))
    }

    /// Bounds how far back a scoped `Ref` looks.
    pub fn is_scope_delimiter(&self) -> bool {
        matches!(
            self.0.kind,
            TokenKind::Seq(_) | TokenKind::Rep(_) | TokenKind::RepN { .. } | TokenKind::While { .. }
        )
    }

    /// Pushes an iteration counter while it parses.
    pub fn is_iterable(&self) -> bool {
        matches!(
            self.0.kind,
            TokenKind::Rep(_) | TokenKind::RepN { .. } | TokenKind::While { .. }
        )
    }

    /// False when parsing may jump elsewhere in the input, through a `Sub` or through
    /// a reference that could lead to one.
    pub fn is_local(&self) -> bool {
        let mut pending = vec![self];
        while let Some(token) = pending.pop() {
            match &token.0.kind {
                TokenKind::Sub { .. } | TokenKind::TokenRef(_) => return false,
                TokenKind::Def { .. } => {}
                TokenKind::DefUntil { terminator, .. } => pending.push(terminator),
                TokenKind::Seq(tokens) | TokenKind::Cho(tokens) => pending.extend(tokens),
                TokenKind::Rep(token)
                | TokenKind::RepN { token, .. }
                | TokenKind::While { token, .. }
                | TokenKind::Pre { token, .. }
                | TokenKind::Post { token, .. }
                | TokenKind::Tie { token, .. } => pending.push(token),
            }
        }
        true
    }

    /// The concrete definition this token stands for in `state`: a reference resolves
    /// against the graph, anything else is itself.
    pub fn canonical(&self, state: &ParseState) -> YantraResult<Token> {
        match &self.0.kind {
            TokenKind::TokenRef(name) => state.order().find_definition(name).ok_or_else(|| {
                err_ctx!(
                    Evaluation,
                    format!("token reference '{name}' does not resolve"),
                    "a reference must name a token that encloses it or was parsed before it"
                )
            }),
            _ => Ok(self.clone()),
        }
    }

    /// Parses this token in `environment`, reporting the attempt to its hook.
    pub fn parse(&self, environment: &Environment) -> ParseResult {
        let entered = environment.enter(self);
        let result = engine::parse_kind(self, &entered);
        if let Ok(after) = &result {
            entered.notify(self, after.as_ref());
        }
        result
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            TokenKind::TokenRef(name) => write!(f, "token_ref({name})"),
            kind if self.0.name.is_empty() => write!(f, "{}#{}", kind.label(), self.0.id),
            kind => write!(f, "{}({})", kind.label(), self.0.name),
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({self})")
    }
}
