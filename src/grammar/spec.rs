//! Serde model of tokens, expressions and predicates, and how each one builds.
//!
//! Every token spec maps onto one constructor of [`Token`]; every expression spec onto
//! one [`ValueExpr`]. A bare integer is shorthand for a numeric constant.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::encoding::Encoding;
use crate::expression::{BinaryOp, Comparison, Predicate, RefTarget, UnaryOp, ValueExpr};
use crate::token::Token;
use crate::value::Value;
use crate::YantraResult;

// ============================================================================
// TOKENS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSpec {
    Def(DefSpec),
    DefUntil(DefUntilSpec),
    Seq(ListSpec),
    Cho(ListSpec),
    Rep(RepSpec),
    RepN(RepNSpec),
    While(GuardSpec),
    Pre(GuardSpec),
    Post(GuardSpec),
    Sub(SubSpec),
    Tie(TieSpec),
    TokenRef(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefSpec {
    pub name: String,
    pub size: ExprSpec,
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub predicate: Option<PredicateSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefUntilSpec {
    pub name: String,
    #[serde(default = "ExprSpec::zero")]
    pub initial: ExprSpec,
    #[serde(default = "ExprSpec::one")]
    pub step: ExprSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<ExprSpec>,
    pub terminator: Box<TokenSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListSpec {
    #[serde(default)]
    pub name: String,
    pub tokens: Vec<TokenSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepSpec {
    #[serde(default)]
    pub name: String,
    pub token: Box<TokenSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepNSpec {
    #[serde(default)]
    pub name: String,
    pub token: Box<TokenSpec>,
    pub n: ExprSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardSpec {
    #[serde(default)]
    pub name: String,
    pub token: Box<TokenSpec>,
    pub predicate: PredicateSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubSpec {
    #[serde(default)]
    pub name: String,
    pub token: Box<TokenSpec>,
    pub address: ExprSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TieSpec {
    #[serde(default)]
    pub name: String,
    pub token: Box<TokenSpec>,
    pub data: ExprSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
}

impl TokenSpec {
    /// Builds the token tree. `encoding` is the one in force around this spec; it
    /// decides how text constants inside it are encoded.
    pub fn build(&self, encoding: Encoding) -> YantraResult<Token> {
        let own = self.encoding();
        let inner = own.unwrap_or(encoding);
        let token = match self {
            TokenSpec::Def(spec) => {
                let def = Token::def(spec.name.clone(), spec.size.build(inner))?;
                let Some(predicate) = &spec.predicate else {
                    return Ok(with_own_encoding(def, own));
                };
                // the encoding belongs to the def, the guard around it stays unnamed
                return Token::post("", with_own_encoding(def, own), predicate.build(inner));
            }
            TokenSpec::DefUntil(spec) => Token::def_until(
                spec.name.clone(),
                spec.initial.build(inner),
                spec.step.build(inner),
                spec.max.as_ref().map(|max| max.build(inner)),
                spec.terminator.build(inner)?,
            )?,
            TokenSpec::Seq(spec) => Token::seq(spec.name.clone(), build_all(&spec.tokens, inner)?)?,
            TokenSpec::Cho(spec) => Token::cho(spec.name.clone(), build_all(&spec.tokens, inner)?)?,
            TokenSpec::Rep(spec) => Token::rep(spec.name.clone(), spec.token.build(inner)?)?,
            TokenSpec::RepN(spec) => {
                Token::rep_n(spec.name.clone(), spec.token.build(inner)?, spec.n.build(inner))?
            }
            TokenSpec::While(spec) => Token::while_(
                spec.name.clone(),
                spec.token.build(inner)?,
                spec.predicate.build(inner),
            )?,
            TokenSpec::Pre(spec) => Token::pre(
                spec.name.clone(),
                spec.token.build(inner)?,
                spec.predicate.build(inner),
            )?,
            TokenSpec::Post(spec) => Token::post(
                spec.name.clone(),
                spec.token.build(inner)?,
                spec.predicate.build(inner),
            )?,
            TokenSpec::Sub(spec) => Token::sub(
                spec.name.clone(),
                spec.token.build(inner)?,
                spec.address.build(inner),
            )?,
            TokenSpec::Tie(spec) => {
                Token::tie(spec.name.clone(), spec.token.build(inner)?, spec.data.build(inner))?
            }
            TokenSpec::TokenRef(name) => Token::token_ref(name.clone())?,
        };
        Ok(with_own_encoding(token, own))
    }

    fn encoding(&self) -> Option<Encoding> {
        match self {
            TokenSpec::Def(spec) => spec.encoding,
            TokenSpec::DefUntil(spec) => spec.encoding,
            TokenSpec::Seq(spec) | TokenSpec::Cho(spec) => spec.encoding,
            TokenSpec::Rep(spec) => spec.encoding,
            TokenSpec::RepN(spec) => spec.encoding,
            TokenSpec::While(spec) | TokenSpec::Pre(spec) | TokenSpec::Post(spec) => spec.encoding,
            TokenSpec::Sub(spec) => spec.encoding,
            TokenSpec::Tie(spec) => spec.encoding,
            TokenSpec::TokenRef(_) => None,
        }
    }
}

fn with_own_encoding(token: Token, encoding: Option<Encoding>) -> Token {
    match encoding {
        Some(encoding) => token.with_encoding(encoding),
        None => token,
    }
}

fn build_all(specs: &[TokenSpec], encoding: Encoding) -> YantraResult<Vec<Token>> {
    specs.iter().map(|spec| spec.build(encoding)).collect()
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExprSpec {
    Int(i64),
    Op(Box<ExprOp>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprOp {
    ConstBytes(Vec<u8>),
    Str(String),
    NotAValue,
    Ref(RefSpec),
    #[serde(rename = "self")]
    SelfValue,
    CurrentOffset,
    Iteration(ExprSpec),
    Neg(ExprSpec),
    Not(ExprSpec),
    Add(ExprSpec, ExprSpec),
    Sub(ExprSpec, ExprSpec),
    Mul(ExprSpec, ExprSpec),
    Div(ExprSpec, ExprSpec),
    Mod(ExprSpec, ExprSpec),
    And(ExprSpec, ExprSpec),
    Or(ExprSpec, ExprSpec),
    Shl(ExprSpec, ExprSpec),
    Shr(ExprSpec, ExprSpec),
    Cat(ExprSpec, ExprSpec),
    Len(ExprSpec),
    Offset(ExprSpec),
    Count(ExprSpec),
    First(ExprSpec),
    Last(ExprSpec),
    Nth(ExprSpec, ExprSpec),
    Reverse(ExprSpec),
    Elvis(ExprSpec, ExprSpec),
    Bytes(ExprSpec),
    Expand(ExprSpec),
    FoldLeft(FoldSpec),
    FoldRight(FoldSpec),
    FoldCat(ExprSpec),
}

/// A reference is either a bare name or a name with a limit and scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefSpec {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<ExprSpec>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scope: Option<ExprSpec>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FoldSpec {
    pub values: ExprSpec,
    pub reducer: BinaryOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<ExprSpec>,
}

impl ExprSpec {
    fn zero() -> Self {
        ExprSpec::Int(0)
    }

    fn one() -> Self {
        ExprSpec::Int(1)
    }

    pub fn build(&self, encoding: Encoding) -> ValueExpr {
        match self {
            ExprSpec::Int(number) => ValueExpr::con_int(*number),
            ExprSpec::Op(op) => op.build(encoding),
        }
    }
}

impl ExprOp {
    fn build(&self, encoding: Encoding) -> ValueExpr {
        let one = |spec: &ExprSpec| Box::new(spec.build(encoding));
        let binary = |op: BinaryOp, left: &ExprSpec, right: &ExprSpec| {
            ValueExpr::Binary(op, one(left), one(right))
        };
        match self {
            ExprOp::ConstBytes(bytes) => ValueExpr::con_bytes(bytes.clone()),
            ExprOp::Str(text) => ValueExpr::con_str(text, encoding),
            ExprOp::NotAValue => ValueExpr::Const(Value::NotAValue),
            ExprOp::Ref(RefSpec::Name(name)) => ValueExpr::reference(name),
            ExprOp::Ref(RefSpec::Detailed { name, limit, scope }) => ValueExpr::Ref {
                target: RefTarget::Name(Rc::from(name.as_str())),
                limit: limit.as_ref().map(one),
                scope: scope.as_ref().map(one),
            },
            ExprOp::SelfValue => ValueExpr::SelfValue,
            ExprOp::CurrentOffset => ValueExpr::CurrentOffset,
            ExprOp::Iteration(level) => ValueExpr::CurrentIteration(one(level)),
            ExprOp::Neg(operand) => ValueExpr::Unary(UnaryOp::Neg, one(operand)),
            ExprOp::Not(operand) => ValueExpr::Unary(UnaryOp::Not, one(operand)),
            ExprOp::Add(left, right) => binary(BinaryOp::Add, left, right),
            ExprOp::Sub(left, right) => binary(BinaryOp::Sub, left, right),
            ExprOp::Mul(left, right) => binary(BinaryOp::Mul, left, right),
            ExprOp::Div(left, right) => binary(BinaryOp::Div, left, right),
            ExprOp::Mod(left, right) => binary(BinaryOp::Mod, left, right),
            ExprOp::And(left, right) => binary(BinaryOp::And, left, right),
            ExprOp::Or(left, right) => binary(BinaryOp::Or, left, right),
            ExprOp::Shl(left, right) => binary(BinaryOp::ShiftLeft, left, right),
            ExprOp::Shr(left, right) => binary(BinaryOp::ShiftRight, left, right),
            ExprOp::Cat(left, right) => binary(BinaryOp::Cat, left, right),
            ExprOp::Len(operand) => ValueExpr::Len(one(operand)),
            ExprOp::Offset(operand) => ValueExpr::Offset(one(operand)),
            ExprOp::Count(operand) => ValueExpr::Count(one(operand)),
            ExprOp::First(operand) => ValueExpr::First(one(operand)),
            ExprOp::Last(operand) => ValueExpr::Last(one(operand)),
            ExprOp::Nth(values, indices) => ValueExpr::Nth(one(values), one(indices)),
            ExprOp::Reverse(operand) => ValueExpr::Reverse(one(operand)),
            ExprOp::Elvis(left, right) => ValueExpr::Elvis(one(left), one(right)),
            ExprOp::Bytes(operand) => ValueExpr::Bytes(one(operand)),
            ExprOp::Expand(operand) => ValueExpr::Expand(one(operand)),
            ExprOp::FoldLeft(fold) => ValueExpr::fold_left(
                fold.values.build(encoding),
                fold.reducer,
                fold.initial.as_ref().map(|initial| initial.build(encoding)),
            ),
            ExprOp::FoldRight(fold) => ValueExpr::fold_right(
                fold.values.build(encoding),
                fold.reducer,
                fold.initial.as_ref().map(|initial| initial.build(encoding)),
            ),
            ExprOp::FoldCat(operand) => ValueExpr::FoldCat(one(operand)),
        }
    }
}

// ============================================================================
// PREDICATES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateSpec {
    /// `true` in YAML is a boolean, so the always-true predicate is spelled `always`.
    #[serde(rename = "always")]
    True,
    Not(Box<PredicateSpec>),
    And(Box<PredicateSpec>, Box<PredicateSpec>),
    Or(Box<PredicateSpec>, Box<PredicateSpec>),
    Eq(CompareSpec),
    EqNum(CompareSpec),
    EqStr(CompareSpec),
    GtNum(CompareSpec),
    LtNum(CompareSpec),
    GtEqNum(CompareSpec),
    LtEqNum(CompareSpec),
}

/// The right-hand side alone compares against the most recent value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompareSpec {
    Full { value: ExprSpec, to: ExprSpec },
    Short(ExprSpec),
}

impl PredicateSpec {
    pub fn build(&self, encoding: Encoding) -> Predicate {
        let compare = |op: Comparison, spec: &CompareSpec| match spec {
            CompareSpec::Full { value, to } => {
                Predicate::compare_with(op, value.build(encoding), to.build(encoding))
            }
            CompareSpec::Short(to) => Predicate::compare(op, to.build(encoding)),
        };
        match self {
            PredicateSpec::True => Predicate::True,
            PredicateSpec::Not(inner) => Predicate::not(inner.build(encoding)),
            PredicateSpec::And(left, right) => {
                Predicate::and(left.build(encoding), right.build(encoding))
            }
            PredicateSpec::Or(left, right) => Predicate::or(left.build(encoding), right.build(encoding)),
            PredicateSpec::Eq(spec) => compare(Comparison::Eq, spec),
            PredicateSpec::EqNum(spec) => compare(Comparison::EqNum, spec),
            PredicateSpec::EqStr(spec) => compare(Comparison::EqStr, spec),
            PredicateSpec::GtNum(spec) => compare(Comparison::GtNum, spec),
            PredicateSpec::LtNum(spec) => compare(Comparison::LtNum, spec),
            PredicateSpec::GtEqNum(spec) => compare(Comparison::GtEqNum, spec),
            PredicateSpec::LtEqNum(spec) => compare(Comparison::LtEqNum, spec),
        }
    }
}
