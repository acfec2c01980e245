//! List-valued expressions over the parse state.
//!
//! Every [`ValueExpr`] evaluates to an ordered [`ValueList`](crate::value::ValueList),
//! oldest result first, because a name reference may match many earlier values.
//! Unary and binary operators work element-wise; binary operators zip their operand
//! lists and pad the shorter one with `NotAValue`. Any position that touches
//! `NotAValue` stays `NotAValue` without running the operator.
//!
//! [`Predicate`]s turn expressions into the yes/no decisions used by `Pre`, `Post`
//! and `While`.

use std::rc::Rc;

use num_bigint::BigInt;

use crate::encoding::Encoding;
use crate::token::Token;
use crate::value::{CoreValue, Value};

mod eval;
mod predicate;
mod reference;

pub use predicate::{Comparison, Predicate};
pub(crate) use reference::single_count;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    ShiftLeft,
    ShiftRight,
    Cat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FoldDirection {
    Left,
    Right,
}

/// What a `Ref` looks up: values by dotted name, or values produced by a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefTarget {
    Name(Rc<str>),
    Definition(Token),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueExpr {
    Const(Value),
    Ref {
        target: RefTarget,
        limit: Option<Box<ValueExpr>>,
        scope: Option<Box<ValueExpr>>,
    },
    /// The most recently parsed value.
    SelfValue,
    CurrentOffset,
    /// Iteration counter `level` loops out from the innermost one.
    CurrentIteration(Box<ValueExpr>),
    Unary(UnaryOp, Box<ValueExpr>),
    Binary(BinaryOp, Box<ValueExpr>, Box<ValueExpr>),
    /// Byte length of each value.
    Len(Box<ValueExpr>),
    /// Offset of each value within its source.
    Offset(Box<ValueExpr>),
    /// Number of values, as a single value.
    Count(Box<ValueExpr>),
    First(Box<ValueExpr>),
    Last(Box<ValueExpr>),
    /// Values at the given indices; out-of-range indices yield `NotAValue`.
    Nth(Box<ValueExpr>, Box<ValueExpr>),
    Reverse(Box<ValueExpr>),
    /// Left value where present, otherwise the right value at the same position.
    Elvis(Box<ValueExpr>, Box<ValueExpr>),
    /// Every byte of every value as its own value.
    Bytes(Box<ValueExpr>),
    /// Splits concatenated values back into their parts.
    Expand(Box<ValueExpr>),
    Fold {
        direction: FoldDirection,
        values: Box<ValueExpr>,
        reducer: BinaryOp,
        initial: Option<Box<ValueExpr>>,
    },
    /// Concatenates every value into one.
    FoldCat(Box<ValueExpr>),
}

impl ValueExpr {
    pub fn con(value: Value) -> Self {
        ValueExpr::Const(value)
    }

    pub fn con_int(number: impl Into<BigInt>) -> Self {
        ValueExpr::Const(Value::from_numeric(&number.into(), Encoding::default()))
    }

    pub fn con_bytes(bytes: impl Into<Rc<[u8]>>) -> Self {
        ValueExpr::Const(Value::from_bytes(bytes, Encoding::default()))
    }

    pub fn con_str(text: &str, encoding: Encoding) -> Self {
        ValueExpr::Const(Value::Core(CoreValue::from_text(text, encoding)))
    }

    pub fn not_a_value() -> Self {
        ValueExpr::Const(Value::NotAValue)
    }

    pub fn reference(name: &str) -> Self {
        ValueExpr::Ref {
            target: RefTarget::Name(Rc::from(name)),
            limit: None,
            scope: None,
        }
    }

    pub fn definition_ref(token: Token) -> Self {
        ValueExpr::Ref {
            target: RefTarget::Definition(token),
            limit: None,
            scope: None,
        }
    }

    /// Restricts a `Ref` to its newest `limit` results. Other expressions are unchanged.
    pub fn limited(self, limit: ValueExpr) -> Self {
        match self {
            ValueExpr::Ref { target, scope, .. } => ValueExpr::Ref {
                target,
                limit: Some(Box::new(limit)),
                scope,
            },
            other => other,
        }
    }

    /// Restricts a `Ref` to `scope` enclosing scope delimiters. Other expressions are
    /// unchanged.
    pub fn scoped(self, scope: ValueExpr) -> Self {
        match self {
            ValueExpr::Ref { target, limit, .. } => ValueExpr::Ref {
                target,
                limit,
                scope: Some(Box::new(scope)),
            },
            other => other,
        }
    }

    pub fn current_iteration(level: usize) -> Self {
        ValueExpr::CurrentIteration(Box::new(ValueExpr::con_int(level)))
    }

    pub fn unary(op: UnaryOp, operand: ValueExpr) -> Self {
        ValueExpr::Unary(op, Box::new(operand))
    }

    pub fn binary(op: BinaryOp, left: ValueExpr, right: ValueExpr) -> Self {
        ValueExpr::Binary(op, Box::new(left), Box::new(right))
    }

    pub fn add(left: ValueExpr, right: ValueExpr) -> Self {
        Self::binary(BinaryOp::Add, left, right)
    }

    pub fn sub(left: ValueExpr, right: ValueExpr) -> Self {
        Self::binary(BinaryOp::Sub, left, right)
    }

    pub fn mul(left: ValueExpr, right: ValueExpr) -> Self {
        Self::binary(BinaryOp::Mul, left, right)
    }

    pub fn cat(left: ValueExpr, right: ValueExpr) -> Self {
        Self::binary(BinaryOp::Cat, left, right)
    }

    pub fn len(operand: ValueExpr) -> Self {
        ValueExpr::Len(Box::new(operand))
    }

    pub fn offset(operand: ValueExpr) -> Self {
        ValueExpr::Offset(Box::new(operand))
    }

    pub fn count(operand: ValueExpr) -> Self {
        ValueExpr::Count(Box::new(operand))
    }

    pub fn first(operand: ValueExpr) -> Self {
        ValueExpr::First(Box::new(operand))
    }

    pub fn last(operand: ValueExpr) -> Self {
        ValueExpr::Last(Box::new(operand))
    }

    pub fn nth(values: ValueExpr, indices: ValueExpr) -> Self {
        ValueExpr::Nth(Box::new(values), Box::new(indices))
    }

    pub fn elvis(left: ValueExpr, right: ValueExpr) -> Self {
        ValueExpr::Elvis(Box::new(left), Box::new(right))
    }

    pub fn fold_left(values: ValueExpr, reducer: BinaryOp, initial: Option<ValueExpr>) -> Self {
        ValueExpr::Fold {
            direction: FoldDirection::Left,
            values: Box::new(values),
            reducer,
            initial: initial.map(Box::new),
        }
    }

    pub fn fold_right(values: ValueExpr, reducer: BinaryOp, initial: Option<ValueExpr>) -> Self {
        ValueExpr::Fold {
            direction: FoldDirection::Right,
            values: Box::new(values),
            reducer,
            initial: initial.map(Box::new),
        }
    }

    pub fn fold_cat(values: ValueExpr) -> Self {
        ValueExpr::FoldCat(Box::new(values))
    }
}
