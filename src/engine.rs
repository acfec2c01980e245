//! Entry point for running a grammar over input.

use std::path::Path;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::Zero;

use crate::config::EngineConfig;
use crate::environment::{Environment, ParseHook, TracingHook};
use crate::err_io;
use crate::source::{FileByteStream, InMemoryByteStream, Source};
use crate::state::ParseState;
use crate::token::{ParseResult, Token};
use crate::YantraResult;

// ============================================================================
// ENGINE
// ============================================================================

/// Runs root tokens against byte sources under one configuration.
#[derive(Clone, Default)]
pub struct Engine {
    config: EngineConfig,
    hook: Option<Rc<dyn ParseHook>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config, hook: None }
    }

    /// Installs an observer for every token attempt. Replaces the tracing hook a
    /// `trace` configuration would install.
    pub fn with_hook(self, hook: Rc<dyn ParseHook>) -> Self {
        Self {
            hook: Some(hook),
            ..self
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn hook(&self) -> Option<Rc<dyn ParseHook>> {
        match &self.hook {
            Some(hook) => Some(Rc::clone(hook)),
            None if self.config.trace => Some(Rc::new(TracingHook)),
            None => None,
        }
    }

    /// Parses `root` starting from `state`.
    pub fn parse(&self, root: &Token, state: ParseState) -> ParseResult {
        let mut environment = Environment::new(state, self.config.encoding);
        if let Some(hook) = self.hook() {
            environment = environment.with_hook(hook);
        }
        tracing::debug!(root = %root, "parse started");
        let result = root.parse(&environment);
        if let Ok(outcome) = &result {
            tracing::debug!(
                root = %root,
                matched = outcome.is_some(),
                offset = ?outcome.as_ref().map(|state| state.offset().to_string()),
                "parse finished"
            );
        }
        result
    }

    pub fn parse_source(&self, root: &Token, source: Source) -> ParseResult {
        self.parse(root, ParseState::from_source(source, BigInt::zero()))
    }

    pub fn parse_bytes(&self, root: &Token, bytes: impl Into<Vec<u8>>) -> ParseResult {
        self.parse(root, ParseState::from_stream(InMemoryByteStream::new(bytes)))
    }

    pub fn parse_file(&self, root: &Token, path: impl AsRef<Path>) -> YantraResult<Option<ParseState>> {
        let path = path.as_ref();
        let stream = FileByteStream::open(path)
            .map_err(|cause| err_io!(format!("cannot open {}", path.display()), cause))?;
        self.parse(root, ParseState::from_stream(stream))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::encoding::Encoding;
    use crate::expression::ValueExpr;

    #[derive(Default)]
    struct Recorder {
        seen: RefCell<Vec<(String, bool)>>,
    }

    impl ParseHook for Recorder {
        fn on_token(&self, token: &Token, _before: &ParseState, after: Option<&ParseState>) {
            self.seen.borrow_mut().push((token.to_string(), after.is_some()));
        }
    }

    #[test]
    fn test_hook_sees_every_attempt() {
        let recorder = Rc::new(Recorder::default());
        let root = Token::cho(
            "c",
            vec![
                Token::def("big", ValueExpr::con_int(4)).unwrap(),
                Token::def("small", ValueExpr::con_int(1)).unwrap(),
            ],
        )
        .unwrap();
        let engine = Engine::new().with_hook(recorder.clone());
        assert!(engine.parse_bytes(&root, vec![1, 2]).unwrap().is_some());
        let seen = recorder.seen.borrow();
        assert_eq!(
            *seen,
            vec![
                ("def(big)".to_string(), false),
                ("def(small)".to_string(), true),
                ("cho(c)".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_config_encoding_applies() {
        let config = EngineConfig {
            encoding: Encoding::little_endian(),
            trace: false,
        };
        let root = Token::def("n", ValueExpr::con_int(2)).unwrap();
        let state = Engine::with_config(config)
            .parse_bytes(&root, vec![0x01, 0x02])
            .unwrap()
            .unwrap();
        let value = state.order().get("n").remove(0);
        assert_eq!(value.value().as_numeric().unwrap(), BigInt::from(0x0201));
    }
}
