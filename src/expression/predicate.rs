//! Boolean conditions over value lists.

use std::cmp::Ordering;

use super::ValueExpr;
use crate::encoding::Encoding;
use crate::state::ParseState;
use crate::value::{CoreValue, Value};
use crate::YantraResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Byte-for-byte equality.
    Eq,
    EqNum,
    /// Equality of the decoded text.
    EqStr,
    GtNum,
    LtNum,
    GtEqNum,
    LtEqNum,
}

impl Comparison {
    fn holds(&self, left: &CoreValue, right: &CoreValue) -> YantraResult<bool> {
        let numeric = |expected: &[Ordering]| -> YantraResult<bool> {
            Ok(expected.contains(&left.as_numeric()?.cmp(&right.as_numeric()?)))
        };
        match self {
            Comparison::Eq => Ok(left.bytes()? == right.bytes()?),
            Comparison::EqStr => Ok(left.as_text()? == right.as_text()?),
            Comparison::EqNum => numeric(&[Ordering::Equal]),
            Comparison::GtNum => numeric(&[Ordering::Greater]),
            Comparison::LtNum => numeric(&[Ordering::Less]),
            Comparison::GtEqNum => numeric(&[Ordering::Greater, Ordering::Equal]),
            Comparison::LtEqNum => numeric(&[Ordering::Less, Ordering::Equal]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    True,
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    /// Compares `value` (the most recent value when absent) against `predicate`.
    Compare {
        op: Comparison,
        value: Option<ValueExpr>,
        predicate: ValueExpr,
    },
}

impl Predicate {
    pub fn not(predicate: Predicate) -> Self {
        Predicate::Not(Box::new(predicate))
    }

    pub fn and(left: Predicate, right: Predicate) -> Self {
        Predicate::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Predicate, right: Predicate) -> Self {
        Predicate::Or(Box::new(left), Box::new(right))
    }

    /// Compares the most recently parsed value with `predicate`.
    pub fn compare(op: Comparison, predicate: ValueExpr) -> Self {
        Predicate::Compare {
            op,
            value: None,
            predicate,
        }
    }

    pub fn compare_with(op: Comparison, value: ValueExpr, predicate: ValueExpr) -> Self {
        Predicate::Compare {
            op,
            value: Some(value),
            predicate,
        }
    }

    pub fn eq(predicate: ValueExpr) -> Self {
        Self::compare(Comparison::Eq, predicate)
    }

    pub fn eq_num(predicate: ValueExpr) -> Self {
        Self::compare(Comparison::EqNum, predicate)
    }

    pub fn eq_str(predicate: ValueExpr) -> Self {
        Self::compare(Comparison::EqStr, predicate)
    }

    /// A comparison holds when both sides are non-empty lists of equal length without
    /// `NotAValue` and every pair satisfies it. Conjunctions short-circuit left to right.
    pub fn eval(&self, state: &ParseState, encoding: &Encoding) -> YantraResult<bool> {
        match self {
            Predicate::True => Ok(true),
            Predicate::Not(inner) => Ok(!inner.eval(state, encoding)?),
            Predicate::And(left, right) => {
                Ok(left.eval(state, encoding)? && right.eval(state, encoding)?)
            }
            Predicate::Or(left, right) => {
                Ok(left.eval(state, encoding)? || right.eval(state, encoding)?)
            }
            Predicate::Compare {
                op,
                value,
                predicate,
            } => {
                let left = match value {
                    Some(value) => value.eval(state, encoding)?,
                    None => ValueExpr::SelfValue.eval(state, encoding)?,
                };
                let right = predicate.eval(state, encoding)?;
                if left.is_empty() || left.len() != right.len() {
                    return Ok(false);
                }
                for (a, b) in left.iter().zip(&right) {
                    let (Value::Core(a), Value::Core(b)) = (a, b) else {
                        return Ok(false);
                    };
                    if !op.holds(a, b)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}
