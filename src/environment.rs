//! What a token sees while it parses: the state, the dotted scope it is named in,
//! the active encoding and an optional observer.

use std::fmt;
use std::rc::Rc;

use crate::encoding::Encoding;
use crate::graph::SEPARATOR;
use crate::state::ParseState;
use crate::token::Token;

/// Observer notified after every token attempt, successful or not.
///
/// Hooks only watch: nothing they do can change the outcome of a parse.
pub trait ParseHook {
    fn on_token(&self, token: &Token, before: &ParseState, after: Option<&ParseState>);
}

/// Reports every token attempt as a `trace` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHook;

impl ParseHook for TracingHook {
    fn on_token(&self, token: &Token, before: &ParseState, after: Option<&ParseState>) {
        match after {
            Some(after) => tracing::trace!(
                token = %token,
                from = %before.offset(),
                to = %after.offset(),
                "matched"
            ),
            None => tracing::trace!(token = %token, at = %before.offset(), "no match"),
        }
    }
}

#[derive(Clone)]
pub struct Environment {
    scope: Rc<str>,
    state: ParseState,
    encoding: Encoding,
    hook: Option<Rc<dyn ParseHook>>,
}

impl Environment {
    pub fn new(state: ParseState, encoding: Encoding) -> Self {
        Self {
            scope: Rc::from(""),
            state,
            encoding,
            hook: None,
        }
    }

    pub fn with_hook(self, hook: Rc<dyn ParseHook>) -> Self {
        Self {
            hook: Some(hook),
            ..self
        }
    }

    /// The dotted name of the token being parsed.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn state(&self) -> &ParseState {
        &self.state
    }

    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    /// The same scope, encoding and hook over another state.
    pub fn with_state(&self, state: ParseState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    /// The environment `token` parses in: its name appended to the scope and its
    /// encoding, if any, in force. References keep the scope of their caller.
    pub(crate) fn enter(&self, token: &Token) -> Self {
        let scope = if token.is_reference() || token.name().is_empty() {
            self.scope.clone()
        } else if self.scope.is_empty() {
            Rc::from(token.name())
        } else {
            Rc::from(format!("{}{}{}", self.scope, SEPARATOR, token.name()))
        };
        Self {
            scope,
            encoding: token.encoding().copied().unwrap_or(self.encoding),
            ..self.clone()
        }
    }

    pub(crate) fn notify(&self, token: &Token, after: Option<&ParseState>) {
        if let Some(hook) = &self.hook {
            hook.on_token(token, &self.state, after);
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("scope", &self.scope)
            .field("offset", self.state.offset())
            .field("encoding", &self.encoding)
            .field("hooked", &self.hook.is_some())
            .finish()
    }
}
