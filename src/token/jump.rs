//! Tokens that parse somewhere other than the current position.
//!
//! `Sub` jumps to computed offsets and is where self-referential grammars could loop
//! forever on cyclic data. Before jumping into a child that is not local it builds a
//! [`ReferenceKey`] from the destination, the source and the child's canonical
//! definition. A key already present in the state means that structure is being
//! parsed at that spot further up this descent, so a back-reference is recorded
//! instead. Keys only live in the subtree that added them: the caller's set is put
//! back once the jump returns.

use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use super::{ParseResult, Token};
use crate::environment::Environment;
use crate::expression::ValueExpr;
use crate::graph::ParseReference;
use crate::source::Source;
use crate::state::ReferenceKey;

pub(super) fn parse_sub(
    token: &Token,
    child: &Token,
    address: &ValueExpr,
    environment: &Environment,
) -> ParseResult {
    let origin = environment.state();
    let addresses = address.eval(origin, environment.encoding())?;
    if addresses.is_empty() {
        return Ok(None);
    }
    let tracked = !child.is_local();
    let mut state = origin.add_branch(token);
    for address in &addresses {
        let Some(offset) = address.numeric()? else {
            return Ok(None);
        };
        if offset.is_negative() {
            return Ok(None);
        }
        let mut target = state.clone();
        if tracked {
            let key = ReferenceKey {
                offset: offset.clone(),
                source: state.source().clone(),
                definition: child.canonical(&state)?,
            };
            if state.has_reference(&key) {
                tracing::debug!(
                    token = %key.definition,
                    offset = %offset,
                    "cycle detected, recording back-reference"
                );
                state = state.add_reference(ParseReference::new(
                    key.offset,
                    key.source,
                    key.definition,
                ));
                continue;
            }
            target = target.with_reference(key);
        }
        let Some(target) = target.seek(offset) else {
            return Ok(None);
        };
        let Some(parsed) = child.parse(&environment.with_state(target))? else {
            return Ok(None);
        };
        state = parsed
            .with_references(state.references().clone())
            .with_source(state.source().clone(), state.offset().clone());
    }
    Ok(Some(state.close_branch(token)?))
}

pub(super) fn parse_tie(
    token: &Token,
    child: &Token,
    data: &ValueExpr,
    environment: &Environment,
) -> ParseResult {
    let origin = environment.state();
    let encoding = *environment.encoding();
    let values = data.eval(origin, &encoding)?;
    if values.iter().any(|value| value.is_not_a_value()) {
        return Ok(None);
    }
    let mut state = origin.add_branch(token);
    for index in 0..values.len() {
        let source = Source::data_expression(data.clone(), index, origin.clone(), encoding);
        let inner = state.with_source(source, BigInt::zero());
        let Some(parsed) = child.parse(&environment.with_state(inner))? else {
            return Ok(None);
        };
        state = parsed.with_source(origin.source().clone(), origin.offset().clone());
    }
    Ok(Some(state.close_branch(token)?))
}
