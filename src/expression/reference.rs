//! Name and definition references into the parse graph.

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};

use super::{RefTarget, ValueExpr};
use crate::encoding::Encoding;
use crate::state::ParseState;
use crate::value::{Value, ValueList};
use crate::{err_msg, YantraResult};

/// Evaluates `expr` as a structural count: exactly one non-negative number.
/// Anything else means the grammar is wrong for this input.
pub(crate) fn single_count(
    expr: &ValueExpr,
    state: &ParseState,
    encoding: &Encoding,
    what: &str,
) -> YantraResult<BigInt> {
    let values = expr.eval(state, encoding)?;
    let [value] = values.as_slice() else {
        return Err(err_msg!(
            Evaluation,
            "{} must evaluate to exactly one value, got {}",
            what,
            values.len()
        ));
    };
    let Some(count) = value.numeric()? else {
        return Err(err_msg!(Evaluation, "{} evaluated to NOT_A_VALUE", what));
    };
    if count.is_negative() {
        return Err(err_msg!(Evaluation, "{} must not be negative, got {}", what, count));
    }
    Ok(count)
}

fn count_as_usize(
    expr: &ValueExpr,
    state: &ParseState,
    encoding: &Encoding,
    what: &str,
) -> YantraResult<usize> {
    // a count past usize::MAX keeps everything anyway
    Ok(single_count(expr, state, encoding, what)?
        .to_usize()
        .unwrap_or(usize::MAX))
}

pub(super) fn eval_ref(
    target: &RefTarget,
    limit: Option<&ValueExpr>,
    scope: Option<&ValueExpr>,
    state: &ParseState,
    encoding: &Encoding,
) -> YantraResult<ValueList> {
    let scope = scope
        .map(|scope| count_as_usize(scope, state, encoding, "reference scope"))
        .transpose()?;
    let limit = limit
        .map(|limit| count_as_usize(limit, state, encoding, "reference limit"))
        .transpose()?;
    let found = match (target, scope) {
        (RefTarget::Name(name), None) => state.cached(name),
        (RefTarget::Name(name), Some(scope)) => state.order().get_scoped(name, scope),
        (RefTarget::Definition(token), None) => state.order().get_definition(token),
        (RefTarget::Definition(token), Some(scope)) => {
            state.order().scoped(scope).get_definition(token)
        }
    };
    let skip = limit.map_or(0, |limit| found.len().saturating_sub(limit));
    Ok(found
        .into_iter()
        .skip(skip)
        .map(|value| Value::Core(value.value().clone()))
        .collect())
}
