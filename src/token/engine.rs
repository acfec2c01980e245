//! Dispatch and the non-looping, non-jumping tokens.

use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use super::{iterate, jump, ParseResult, Token, TokenKind};
use crate::environment::Environment;
use crate::expression::{Predicate, ValueExpr};
use crate::graph::ParseValue;
use crate::value::{CoreValue, Value};
use crate::{err_msg, YantraResult};

pub(super) fn parse_kind(token: &Token, environment: &Environment) -> ParseResult {
    match token.kind() {
        TokenKind::Def { size } => parse_def(token, size, environment),
        TokenKind::DefUntil {
            initial,
            step,
            max,
            terminator,
        } => iterate::parse_def_until(token, initial, step, max.as_ref(), terminator, environment),
        TokenKind::Seq(tokens) => parse_seq(token, tokens, environment),
        TokenKind::Cho(tokens) => parse_cho(tokens, environment),
        TokenKind::Rep(child) => iterate::parse_rep(token, child, environment),
        TokenKind::RepN { token: child, n } => iterate::parse_rep_n(token, child, n, environment),
        TokenKind::While {
            token: child,
            predicate,
        } => iterate::parse_while(token, child, predicate, environment),
        TokenKind::Pre {
            token: child,
            predicate,
        } => parse_pre(child, predicate, environment),
        TokenKind::Post {
            token: child,
            predicate,
        } => parse_post(child, predicate, environment),
        TokenKind::Sub {
            token: child,
            address,
        } => jump::parse_sub(token, child, address, environment),
        TokenKind::Tie { token: child, data } => jump::parse_tie(token, child, data, environment),
        TokenKind::TokenRef(_) => parse_token_ref(token, environment),
    }
}

/// The single size a `def`-style token reads. `None` when the size is absent,
/// ambiguous or `NotAValue`; a negative size is an error.
pub(super) fn single_size(size: &[Value]) -> YantraResult<Option<BigInt>> {
    let [size] = size else {
        return Ok(None);
    };
    let Some(size) = size.numeric()? else {
        return Ok(None);
    };
    if size.is_negative() {
        return Err(err_msg!(Evaluation, "size must not be negative, got {}", size));
    }
    Ok(Some(size))
}

/// Slices `size` bytes at the current offset into a value named by the scope, then
/// moves past them. Zero bytes add nothing.
pub(super) fn read_value(token: &Token, size: &BigInt, environment: &Environment) -> ParseResult {
    let state = environment.state();
    if size.is_zero() {
        return Ok(Some(state.clone()));
    }
    let Some(slice) = state.slice(size) else {
        return Ok(None);
    };
    let end = slice.end();
    let value = ParseValue::new(
        environment.scope(),
        token.clone(),
        CoreValue::new(slice, *environment.encoding()),
    );
    Ok(state.add(value).seek(end))
}

fn parse_def(token: &Token, size: &ValueExpr, environment: &Environment) -> ParseResult {
    let sizes = size.eval(environment.state(), environment.encoding())?;
    match single_size(&sizes)? {
        Some(size) => read_value(token, &size, environment),
        None => Ok(None),
    }
}

fn parse_seq(token: &Token, tokens: &[Token], environment: &Environment) -> ParseResult {
    let mut state = environment.state().add_branch(token);
    for child in tokens {
        match child.parse(&environment.with_state(state))? {
            Some(next) => state = next,
            None => return Ok(None),
        }
    }
    Ok(Some(state.close_branch(token)?))
}

fn parse_cho(tokens: &[Token], environment: &Environment) -> ParseResult {
    for child in tokens {
        if let Some(state) = child.parse(environment)? {
            return Ok(Some(state));
        }
    }
    Ok(None)
}

fn parse_pre(child: &Token, predicate: &Predicate, environment: &Environment) -> ParseResult {
    if !predicate.eval(environment.state(), environment.encoding())? {
        return Ok(None);
    }
    child.parse(environment)
}

fn parse_post(child: &Token, predicate: &Predicate, environment: &Environment) -> ParseResult {
    let Some(state) = child.parse(environment)? else {
        return Ok(None);
    };
    if predicate.eval(&state, environment.encoding())? {
        Ok(Some(state))
    } else {
        Ok(None)
    }
}

fn parse_token_ref(token: &Token, environment: &Environment) -> ParseResult {
    token.canonical(environment.state())?.parse(environment)
}
