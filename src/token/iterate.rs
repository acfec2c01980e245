//! Repetition and growing reads.
//!
//! Loops run on the [`Trampoline`], one bounce per iteration, so a repetition over a
//! million items costs a million bounces and no native stack.

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

use super::engine::read_value;
use super::{ParseResult, Token};
use crate::environment::Environment;
use crate::expression::{single_count, Predicate, ValueExpr};
use crate::state::ParseState;
use crate::trampoline::Trampoline;
use crate::value::Value;
use crate::YantraResult;

/// What one iteration decided.
enum Loop {
    Next(ParseState),
    Stop(ParseState),
    Fail,
}

fn run_loop<'a>(
    state: ParseState,
    step: &'a dyn Fn(ParseState) -> YantraResult<Loop>,
) -> Trampoline<'a, ParseResult> {
    match step(state) {
        Ok(Loop::Next(next)) => Trampoline::bounce(move || run_loop(next, step)),
        Ok(Loop::Stop(state)) => Trampoline::done(Ok(Some(state))),
        Ok(Loop::Fail) => Trampoline::done(Ok(None)),
        Err(error) => Trampoline::done(Err(error)),
    }
}

/// Runs `step` inside a branch opened for `token` and closes it on success.
fn in_branch(
    token: &Token,
    environment: &Environment,
    step: &dyn Fn(ParseState) -> YantraResult<Loop>,
) -> ParseResult {
    let start = environment.state().add_branch(token);
    match run_loop(start, step).run()? {
        Some(state) => Ok(Some(state.close_branch(token)?)),
        None => Ok(None),
    }
}

pub(super) fn parse_rep(token: &Token, child: &Token, environment: &Environment) -> ParseResult {
    in_branch(token, environment, &|state| {
        let Some(next) = child.parse(&environment.with_state(state.clone()))? else {
            return Ok(Loop::Stop(state));
        };
        if next.offset() == state.offset() && repeats_previous(&state, &next) {
            tracing::debug!(token = %token, offset = %state.offset(), "repetition made no progress");
            return Ok(Loop::Stop(state));
        }
        Ok(Loop::Next(next.iterate()))
    })
}

/// An iteration that stayed in place repeats when it recorded nothing, or exactly what
/// the iteration before it recorded.
fn repeats_previous(before: &ParseState, after: &ParseState) -> bool {
    let recorded = |state: &ParseState| state.order().open_branches().last().map_or(0, |b| b.len());
    let added = recorded(after).saturating_sub(recorded(before));
    added == 0
        || after
            .order()
            .open_branches()
            .last()
            .is_some_and(|branch| branch.repeats_last(added))
}

pub(super) fn parse_rep_n(
    token: &Token,
    child: &Token,
    n: &ValueExpr,
    environment: &Environment,
) -> ParseResult {
    let count = single_count(n, environment.state(), environment.encoding(), "repetition count")?;
    in_branch(token, environment, &|state| {
        if state.current_iteration(0).is_some_and(|done| *done >= count) {
            return Ok(Loop::Stop(state));
        }
        match child.parse(&environment.with_state(state))? {
            Some(next) => Ok(Loop::Next(next.iterate())),
            None => Ok(Loop::Fail),
        }
    })
}

pub(super) fn parse_while(
    token: &Token,
    child: &Token,
    predicate: &Predicate,
    environment: &Environment,
) -> ParseResult {
    in_branch(token, environment, &|state| {
        if !predicate.eval(&state, environment.encoding())? {
            return Ok(Loop::Stop(state));
        }
        match child.parse(&environment.with_state(state))? {
            Some(next) => Ok(Loop::Next(next.iterate())),
            None => Ok(Loop::Fail),
        }
    })
}

// ============================================================================
// DEF UNTIL
// ============================================================================

pub(super) fn parse_def_until(
    token: &Token,
    initial: &ValueExpr,
    step: &ValueExpr,
    max: Option<&ValueExpr>,
    terminator: &Token,
    environment: &Environment,
) -> ParseResult {
    let state = environment.state();
    let encoding = environment.encoding();
    let initials = initial.eval(state, encoding)?;
    let steps = step.eval(state, encoding)?;
    let maxes: Vec<Option<Value>> = match max {
        Some(max) => max.eval(state, encoding)?.into_iter().map(Some).collect(),
        None => vec![None],
    };
    for initial in &initials {
        for step in &steps {
            for max in &maxes {
                let Some(bounds) = Bounds::new(initial, step, max.as_ref())? else {
                    continue;
                };
                if let Some(state) = try_candidates(token, bounds, terminator, environment)? {
                    return Ok(Some(state));
                }
            }
        }
    }
    tracing::debug!(token = %token, offset = %state.offset(), "no terminated candidate");
    Ok(None)
}

struct Bounds {
    initial: BigInt,
    step: BigInt,
    max: Option<BigInt>,
}

impl Bounds {
    /// `None` when any part is `NotAValue` or the step is zero.
    fn new(initial: &Value, step: &Value, max: Option<&Value>) -> YantraResult<Option<Self>> {
        let (Some(initial), Some(step)) = (initial.numeric()?, step.numeric()?) else {
            return Ok(None);
        };
        let max = match max {
            Some(max) => match max.numeric()? {
                Some(max) => Some(max),
                None => return Ok(None),
            },
            None => None,
        };
        if step.is_zero() {
            return Ok(None);
        }
        Ok(Some(Self { initial, step, max }))
    }

    fn growing(&self) -> bool {
        self.step.is_positive()
    }

    fn within(&self, size: &BigInt) -> bool {
        match &self.max {
            Some(max) if self.growing() => size <= max,
            Some(max) => size >= max,
            None => true,
        }
    }
}

fn try_candidates(
    token: &Token,
    bounds: Bounds,
    terminator: &Token,
    environment: &Environment,
) -> ParseResult {
    let mut size = bounds.initial.clone();
    while bounds.within(&size) && !size.is_negative() {
        let Some(candidate) = read_value(token, &size, environment)? else {
            // larger candidates cannot fit either
            if bounds.growing() {
                return Ok(None);
            }
            size += &bounds.step;
            continue;
        };
        if let Some(terminated) = terminator.parse(&environment.with_state(candidate.clone()))? {
            return Ok(Some(terminated));
        }
        if !size.is_zero() && at_end(&candidate) {
            return Ok(Some(candidate));
        }
        size += &bounds.step;
    }
    Ok(None)
}

fn at_end(state: &ParseState) -> bool {
    !state.source().is_available(state.offset(), &BigInt::one())
}
