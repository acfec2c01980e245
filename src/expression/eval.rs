//! Evaluation of value expressions.

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use super::reference::eval_ref;
use super::{BinaryOp, FoldDirection, UnaryOp, ValueExpr};
use crate::encoding::Encoding;
use crate::source::{Slice, Source};
use crate::state::ParseState;
use crate::trampoline::Trampoline;
use crate::value::{CoreValue, Value, ValueList};
use crate::{err_msg, YantraResult};

/// Largest left shift, in bits, that still yields a value.
const MAX_SHIFT_LEFT: usize = 64 * 1024;

impl ValueExpr {
    /// Evaluates against `state`; computed numbers are encoded with `encoding`.
    pub fn eval(&self, state: &ParseState, encoding: &Encoding) -> YantraResult<ValueList> {
        match self {
            ValueExpr::Const(value) => Ok(vec![value.clone()]),
            ValueExpr::Ref {
                target,
                limit,
                scope,
            } => eval_ref(target, limit.as_deref(), scope.as_deref(), state, encoding),
            ValueExpr::SelfValue => Ok(vec![state
                .order()
                .current()
                .map_or(Value::NotAValue, |value| Value::Core(value.value().clone()))]),
            ValueExpr::CurrentOffset => Ok(vec![Value::from_numeric(state.offset(), *encoding)]),
            ValueExpr::CurrentIteration(level) => map_values(level.eval(state, encoding)?, |level| {
                let count = level
                    .as_numeric()?
                    .to_usize()
                    .and_then(|level| state.current_iteration(level));
                Ok(count.map_or(Value::NotAValue, |count| Value::from_numeric(count, *encoding)))
            }),
            ValueExpr::Unary(op, operand) => map_values(operand.eval(state, encoding)?, |value| {
                match op {
                    UnaryOp::Neg => Ok(Value::from_numeric(&-value.as_numeric()?, *encoding)),
                    // bitwise, at the operand's width and in its encoding
                    UnaryOp::Not => {
                        let inverted: Vec<u8> = value.bytes()?.iter().map(|byte| !byte).collect();
                        Ok(Value::Core(CoreValue::from_bytes(inverted, *value.encoding())))
                    }
                }
            }),
            ValueExpr::Binary(op, left, right) => zip_values(
                left.eval(state, encoding)?,
                right.eval(state, encoding)?,
                |a, b| apply_binary(*op, a, b, *encoding),
            ),
            ValueExpr::Len(operand) => map_values(operand.eval(state, encoding)?, |value| {
                Ok(Value::from_numeric(value.length(), *encoding))
            }),
            ValueExpr::Offset(operand) => map_values(operand.eval(state, encoding)?, |value| {
                Ok(Value::from_numeric(value.slice().offset(), *encoding))
            }),
            ValueExpr::Count(operand) => {
                let count = BigInt::from(operand.eval(state, encoding)?.len());
                Ok(vec![Value::from_numeric(&count, *encoding)])
            }
            ValueExpr::First(operand) => {
                Ok(operand.eval(state, encoding)?.into_iter().take(1).collect())
            }
            ValueExpr::Last(operand) => Ok(operand.eval(state, encoding)?.pop().into_iter().collect()),
            ValueExpr::Nth(values, indices) => {
                let values = values.eval(state, encoding)?;
                map_values(indices.eval(state, encoding)?, |index| {
                    Ok(index
                        .as_numeric()?
                        .to_usize()
                        .and_then(|index| values.get(index).cloned())
                        .unwrap_or(Value::NotAValue))
                })
            }
            ValueExpr::Reverse(operand) => {
                let mut values = operand.eval(state, encoding)?;
                values.reverse();
                Ok(values)
            }
            ValueExpr::Elvis(left, right) => {
                let left = left.eval(state, encoding)?;
                let right = right.eval(state, encoding)?;
                let length = left.len().max(right.len());
                Ok((0..length)
                    .map(|i| match left.get(i) {
                        Some(value @ Value::Core(_)) => value.clone(),
                        _ => right.get(i).cloned().unwrap_or(Value::NotAValue),
                    })
                    .collect())
            }
            ValueExpr::Bytes(operand) => {
                let mut out = Vec::new();
                for value in operand.eval(state, encoding)? {
                    match value {
                        Value::Core(value) => out.extend(split_bytes(&value)?),
                        Value::NotAValue => out.push(Value::NotAValue),
                    }
                }
                Ok(out)
            }
            ValueExpr::Expand(operand) => Ok(operand
                .eval(state, encoding)?
                .into_iter()
                .flat_map(expand)
                .collect()),
            ValueExpr::Fold {
                direction,
                values,
                reducer,
                initial,
            } => {
                let values = values.eval(state, encoding)?;
                let initial = match initial {
                    Some(initial) => initial.eval(state, encoding)?,
                    None => Vec::new(),
                };
                fold(*direction, values, *reducer, initial, *encoding)
            }
            ValueExpr::FoldCat(operand) => {
                let values = operand.eval(state, encoding)?;
                if values.is_empty() {
                    return Ok(values);
                }
                Ok(vec![Value::concatenate(&values, *encoding)])
            }
        }
    }
}

/// Applies `f` to each value; `NotAValue` passes through untouched.
fn map_values(
    values: ValueList,
    mut f: impl FnMut(&CoreValue) -> YantraResult<Value>,
) -> YantraResult<ValueList> {
    values
        .iter()
        .map(|value| match value {
            Value::Core(value) => f(value),
            Value::NotAValue => Ok(Value::NotAValue),
        })
        .collect()
}

/// Combines two lists position by position. The shorter list is padded with
/// `NotAValue` at its end.
fn zip_values(
    left: ValueList,
    right: ValueList,
    mut f: impl FnMut(&CoreValue, &CoreValue) -> YantraResult<Value>,
) -> YantraResult<ValueList> {
    let length = left.len().max(right.len());
    (0..length)
        .map(|i| match (left.get(i), right.get(i)) {
            (Some(Value::Core(a)), Some(Value::Core(b))) => f(a, b),
            _ => Ok(Value::NotAValue),
        })
        .collect()
}

pub(super) fn apply_binary(
    op: BinaryOp,
    left: &CoreValue,
    right: &CoreValue,
    encoding: Encoding,
) -> YantraResult<Value> {
    if op == BinaryOp::Cat {
        return Ok(Value::concatenate(
            &[Value::Core(left.clone()), Value::Core(right.clone())],
            encoding,
        ));
    }
    let a = left.as_numeric()?;
    let b = right.as_numeric()?;
    let result = match op {
        BinaryOp::Add => Some(a + b),
        BinaryOp::Sub => Some(a - b),
        BinaryOp::Mul => Some(a * b),
        BinaryOp::Div => (!b.is_zero()).then(|| a / b),
        // result takes the sign of the modulus, which must be positive
        BinaryOp::Mod => b.is_positive().then(|| ((a % &b) + &b) % &b),
        BinaryOp::And => Some(a & b),
        BinaryOp::Or => Some(a | b),
        BinaryOp::ShiftLeft => b
            .to_usize()
            .filter(|shift| *shift <= MAX_SHIFT_LEFT)
            .map(|shift| a << shift),
        BinaryOp::ShiftRight => b.to_usize().map(|shift| a >> shift),
        BinaryOp::Cat => None,
    };
    Ok(result.map_or(Value::NotAValue, |number| Value::from_numeric(&number, encoding)))
}

fn split_bytes(value: &CoreValue) -> YantraResult<Vec<Value>> {
    let slice = value.slice();
    let length = slice
        .length()
        .to_usize()
        .ok_or_else(|| err_msg!(Evaluation, "value of {} bytes is too large to split", slice.length()))?;
    Ok((0..length)
        .map(|i| {
            Slice::create(
                slice.source().clone(),
                slice.offset() + BigInt::from(i),
                BigInt::from(1),
            )
            .map_or(Value::NotAValue, |byte| {
                Value::Core(CoreValue::new(byte, *value.encoding()))
            })
        })
        .collect())
}

/// A value spanning a whole concatenation yields its parts; anything else itself.
fn expand(value: Value) -> Vec<Value> {
    if let Value::Core(core) = &value {
        let slice = core.slice();
        if let Source::Concatenated(concatenated) = slice.source() {
            if slice.offset().is_zero() && slice.length() == concatenated.length() {
                return concatenated.values().iter().cloned().map(Value::Core).collect();
            }
        }
    }
    vec![value]
}

fn fold(
    direction: FoldDirection,
    values: ValueList,
    reducer: BinaryOp,
    initial: ValueList,
    encoding: Encoding,
) -> YantraResult<ValueList> {
    let mut operands = match direction {
        FoldDirection::Left => initial.into_iter().chain(values).collect::<Vec<_>>(),
        FoldDirection::Right => values.into_iter().chain(initial).collect::<Vec<_>>(),
    };
    if operands.iter().any(Value::is_not_a_value) {
        return Ok(vec![Value::NotAValue]);
    }
    if direction == FoldDirection::Right {
        operands.reverse();
    }
    let mut operands = operands.into_iter();
    let Some(first) = operands.next() else {
        return Ok(Vec::new());
    };
    let folded = reduce_step(first, operands, reducer, direction, encoding).run()?;
    Ok(vec![folded])
}

fn reduce_step(
    accumulated: Value,
    mut rest: std::vec::IntoIter<Value>,
    reducer: BinaryOp,
    direction: FoldDirection,
    encoding: Encoding,
) -> Trampoline<'static, YantraResult<Value>> {
    let Some(next) = rest.next() else {
        return Trampoline::done(Ok(accumulated));
    };
    let (left, right) = match direction {
        FoldDirection::Left => (&accumulated, &next),
        FoldDirection::Right => (&next, &accumulated),
    };
    let combined = match (left, right) {
        (Value::Core(a), Value::Core(b)) => apply_binary(reducer, a, b, encoding),
        _ => Ok(Value::NotAValue),
    };
    match combined {
        Ok(value) => {
            Trampoline::bounce(move || reduce_step(value, rest, reducer, direction, encoding))
        }
        Err(error) => Trampoline::done(Err(error)),
    }
}
