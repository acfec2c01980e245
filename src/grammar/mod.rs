//! Grammar files.
//!
//! A grammar file is YAML naming a root token and, optionally, the encoding in force
//! around it:
//!
//! ```yaml
//! encoding: { byte_order: little_endian }
//! root:
//!   seq:
//!     name: packet
//!     tokens:
//!       - def: { name: len, size: 1 }
//!       - def: { name: data, size: { ref: len } }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{to_error_source, Span};
use crate::encoding::Encoding;
use crate::token::Token;
use crate::{err_ctx, err_io, YantraResult};

mod spec;

pub use spec::{
    CompareSpec, DefSpec, DefUntilSpec, ExprOp, ExprSpec, FoldSpec, GuardSpec, ListSpec,
    PredicateSpec, RefSpec, RepNSpec, RepSpec, SubSpec, TieSpec, TokenSpec,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrammarFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
    /// Tokens, expressions and predicates are written as single-key maps (`seq: ...`)
    /// at every depth rather than as YAML tags.
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub root: TokenSpec,
}

impl GrammarFile {
    /// Deserializes a grammar; `name` labels the source in diagnostics.
    pub fn from_yaml_str(name: &str, text: &str) -> YantraResult<Self> {
        serde_yaml::from_str(text).map_err(|error| {
            let message = format!("invalid grammar: {error}");
            match error.location() {
                Some(location) => {
                    let source = to_error_source(name, text);
                    let start = location.index().min(text.len());
                    let end = (start + 1).min(text.len()).max(start);
                    err_ctx!(Grammar, message, &source, Span { start, end })
                }
                None => err_ctx!(Grammar, message, "see the grammar file format in the crate docs"),
            }
        })
    }

    pub fn load(path: impl AsRef<Path>) -> YantraResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|cause| err_io!(format!("cannot read {}", path.display()), cause))?;
        Self::from_yaml_str(&path.display().to_string(), &text)
    }

    /// The encoding in force at the root.
    pub fn encoding(&self) -> Encoding {
        self.encoding.unwrap_or_default()
    }

    /// Builds the root token, surfacing construction errors.
    pub fn build(&self) -> YantraResult<Token> {
        let root = self.root.build(self.encoding())?;
        Ok(match self.encoding {
            Some(encoding) if root.encoding().is_none() => root.with_encoding(encoding),
            _ => root,
        })
    }
}
