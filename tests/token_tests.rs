//! Behavior of the token combinators over small in-memory inputs.
//!
//! These cover the guarantees grammars rely on: failures leave no trace, choices are
//! ordered, repetitions always succeed, and zero-length reads change nothing.

use num_bigint::BigInt;
use yantra::expression::ValueExpr;
use yantra::{Comparison, Engine, ErrorType, ParseState, Predicate, Token};

fn fixed(name: &str, size: i64) -> Token {
    Token::def(name, ValueExpr::con_int(size)).unwrap()
}

fn run(root: &Token, bytes: &[u8]) -> Option<ParseState> {
    Engine::new().parse_bytes(root, bytes.to_vec()).unwrap()
}

fn numbers(state: &ParseState, name: &str) -> Vec<BigInt> {
    state
        .order()
        .get(name)
        .iter()
        .map(|value| value.value().as_numeric().unwrap())
        .collect()
}

#[cfg(test)]
mod def_tests {
    use super::*;

    #[test]
    fn test_zero_length_read_changes_nothing() {
        let state = run(&fixed("empty", 0), &[1, 2]).unwrap();
        assert_eq!(state.offset(), &BigInt::from(0));
        assert!(state.order().is_empty());
    }

    #[test]
    fn test_read_past_end_fails() {
        assert!(run(&fixed("word", 4), &[1, 2]).is_none());
    }

    #[test]
    fn test_length_prefixed_data() {
        let root = Token::seq(
            "",
            vec![
                fixed("len", 1),
                Token::def("data", ValueExpr::reference("len")).unwrap(),
            ],
        )
        .unwrap();
        let state = run(&root, &[0x02, 0xAA, 0xBB]).unwrap();
        assert_eq!(state.offset(), &BigInt::from(3));
        let data = state.order().get("data");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].value().bytes().unwrap(), vec![0xAA, 0xBB]);
    }

    #[test]
    fn test_ambiguous_size_fails() {
        let root = Token::seq(
            "",
            vec![
                fixed("len", 1),
                fixed("len", 1),
                Token::def("data", ValueExpr::reference("len")).unwrap(),
            ],
        )
        .unwrap();
        assert!(run(&root, &[1, 1, 9]).is_none());
    }

    #[test]
    fn test_negative_size_is_an_error() {
        let root = Token::def("bad", ValueExpr::con_int(-1)).unwrap();
        let error = Engine::new().parse_bytes(&root, vec![1]).unwrap_err();
        assert_eq!(error.error_type(), ErrorType::Evaluation);
    }

    #[test]
    fn test_def_where_filters_value() {
        let magic = Token::def_where(
            "magic",
            ValueExpr::con_int(1),
            Predicate::eq(ValueExpr::con_bytes(vec![0x7F])),
        )
        .unwrap();
        assert!(run(&magic, &[0x7F]).is_some());
        assert!(run(&magic, &[0x7E]).is_none());
    }
}

#[cfg(test)]
mod structure_tests {
    use super::*;

    #[test]
    fn test_sequence_is_atomic() {
        let root = Token::seq("pair", vec![fixed("a", 1), fixed("b", 2)]).unwrap();
        assert!(run(&root, &[1, 2]).is_none());
    }

    #[test]
    fn test_choice_takes_first_success() {
        let root = Token::cho("either", vec![fixed("a", 1), fixed("b", 1)]).unwrap();
        let state = run(&root, &[5]).unwrap();
        assert_eq!(numbers(&state, "a"), vec![BigInt::from(5)]);
        assert!(state.order().get("b").is_empty());
    }

    #[test]
    fn test_failed_alternative_leaves_no_trace() {
        let long = Token::seq("long", vec![fixed("head", 1), fixed("body", 5)]).unwrap();
        let root = Token::cho("either", vec![long, fixed("short", 1)]).unwrap();
        let state = run(&root, &[7]).unwrap();
        assert!(state.order().get("head").is_empty());
        assert_eq!(numbers(&state, "short"), vec![BigInt::from(7)]);
        assert_eq!(state.order().values().len(), 1);
    }

    #[test]
    fn test_values_are_named_by_scope() {
        let root = Token::seq(
            "header",
            vec![Token::seq("version", vec![fixed("major", 1), fixed("minor", 1)]).unwrap()],
        )
        .unwrap();
        let state = run(&root, &[1, 2]).unwrap();
        let names: Vec<String> = state
            .order()
            .values()
            .iter()
            .map(|value| value.name().to_string())
            .collect();
        assert_eq!(names, vec!["header.version.major", "header.version.minor"]);
        assert_eq!(numbers(&state, "version.minor"), vec![BigInt::from(2)]);
        assert!(state.order().get("ersion.minor").is_empty());
    }

    #[test]
    fn test_pre_checks_before_parsing() {
        let guarded = Token::pre(
            "guarded",
            fixed("b", 1),
            Predicate::compare(Comparison::EqNum, ValueExpr::con_int(1)),
        )
        .unwrap();
        let root = Token::seq("", vec![fixed("a", 1), guarded]).unwrap();
        assert!(run(&root, &[1, 9]).is_some());
        assert!(run(&root, &[2, 9]).is_none());
    }

    #[test]
    fn test_unresolved_token_ref_is_an_error() {
        let root = Token::seq("a", vec![Token::token_ref("missing").unwrap()]).unwrap();
        let error = Engine::new().parse_bytes(&root, vec![0]).unwrap_err();
        assert_eq!(error.error_type(), ErrorType::Evaluation);
    }

    #[test]
    fn test_encoding_override_applies_to_children() {
        let root = Token::seq("le", vec![fixed("word", 2)])
            .unwrap()
            .with_encoding(yantra::Encoding::little_endian());
        let state = run(&root, &[0x01, 0x02]).unwrap();
        assert_eq!(numbers(&state, "word"), vec![BigInt::from(0x0201)]);
    }
}

#[cfg(test)]
mod repetition_tests {
    use super::*;

    #[test]
    fn test_rep_succeeds_on_empty_input() {
        let root = Token::rep("items", fixed("item", 1)).unwrap();
        let state = run(&root, &[]).unwrap();
        assert_eq!(state.offset(), &BigInt::from(0));
        assert!(state.order().values().is_empty());
    }

    #[test]
    fn test_rep_stops_at_first_failure() {
        let root = Token::rep("pairs", fixed("pair", 2)).unwrap();
        let state = run(&root, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(state.offset(), &BigInt::from(4));
        assert_eq!(state.order().get("pair").len(), 2);
    }

    #[test]
    fn test_rep_without_progress_terminates() {
        let root = Token::rep("nothing", fixed("empty", 0)).unwrap();
        let state = run(&root, &[1, 2, 3]).unwrap();
        assert_eq!(state.offset(), &BigInt::from(0));
    }

    #[test]
    fn test_rep_over_jumps_records_each_destination() {
        // every jump returns to offset 0, but each lands somewhere new
        let jump = Token::sub("jump", fixed("x", 1), ValueExpr::current_iteration(0)).unwrap();
        let root = Token::rep("jumps", jump).unwrap();
        let state = run(&root, &[1, 2, 3]).unwrap();
        assert_eq!(state.offset(), &BigInt::from(0));
        assert_eq!(
            numbers(&state, "x"),
            vec![BigInt::from(1), BigInt::from(2), BigInt::from(3)]
        );
    }

    #[test]
    fn test_rep_of_identical_jumps_terminates() {
        let jump = Token::sub("jump", fixed("x", 1), ValueExpr::con_int(0)).unwrap();
        let root = Token::rep("jumps", jump).unwrap();
        let state = run(&root, &[7]).unwrap();
        assert_eq!(numbers(&state, "x"), vec![BigInt::from(7)]);
    }

    #[test]
    fn test_rep_n_counts_exactly() {
        let root = Token::seq(
            "",
            vec![
                fixed("count", 1),
                Token::rep_n("items", fixed("item", 1), ValueExpr::reference("count")).unwrap(),
            ],
        )
        .unwrap();
        let state = run(&root, &[2, 10, 20, 30]).unwrap();
        assert_eq!(numbers(&state, "item"), vec![BigInt::from(10), BigInt::from(20)]);
        assert_eq!(state.offset(), &BigInt::from(3));
        assert!(run(&root, &[3, 10, 20]).is_none());
    }

    #[test]
    fn test_rep_n_with_bad_count_is_an_error() {
        let root = Token::rep_n("items", fixed("item", 1), ValueExpr::reference("absent")).unwrap();
        let error = Engine::new().parse_bytes(&root, vec![1]).unwrap_err();
        assert_eq!(error.error_type(), ErrorType::Evaluation);
    }

    #[test]
    fn test_while_checks_before_each_iteration() {
        let below_three = Predicate::compare_with(
            Comparison::LtNum,
            ValueExpr::current_iteration(0),
            ValueExpr::con_int(3),
        );
        let root = Token::while_("items", fixed("item", 1), below_three).unwrap();
        let state = run(&root, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(state.offset(), &BigInt::from(3));
        assert!(run(&root, &[1, 2]).is_none());
    }

    #[test]
    fn test_def_until_splits_lines() {
        let newline = Token::def_where(
            "newline",
            ValueExpr::con_int(1),
            Predicate::eq(ValueExpr::con_bytes(b"\n".to_vec())),
        )
        .unwrap();
        let line = Token::def_until(
            "line",
            ValueExpr::con_int(0),
            ValueExpr::con_int(1),
            None,
            newline,
        )
        .unwrap();
        let root = Token::rep("lines", line).unwrap();
        let state = run(&root, b"ab\ncd").unwrap();
        assert_eq!(state.offset(), &BigInt::from(5));
        let lines: Vec<(String, Vec<u8>)> = state
            .order()
            .get("line")
            .iter()
            .map(|value| (value.name().to_string(), value.value().bytes().unwrap()))
            .collect();
        assert_eq!(
            lines,
            vec![
                ("lines.line".to_string(), b"ab".to_vec()),
                ("lines.line".to_string(), b"cd".to_vec()),
            ]
        );
        assert_eq!(state.order().get("newline").len(), 1);
    }

    #[test]
    fn test_def_until_respects_max() {
        let zero = Token::def_where(
            "zero",
            ValueExpr::con_int(1),
            Predicate::eq_num(ValueExpr::con_int(0)),
        )
        .unwrap();
        let root = Token::def_until(
            "text",
            ValueExpr::con_int(1),
            ValueExpr::con_int(1),
            Some(ValueExpr::con_int(2)),
            zero,
        )
        .unwrap();
        assert!(run(&root, &[1, 2, 0]).is_some());
        assert!(run(&root, &[1, 2, 3, 0]).is_none());
    }

    fn zero_byte() -> Token {
        Token::def_where(
            "zero",
            ValueExpr::con_int(1),
            Predicate::eq_num(ValueExpr::con_int(0)),
        )
        .unwrap()
    }

    fn each_byte(bytes: &[u8]) -> ValueExpr {
        ValueExpr::Bytes(Box::new(ValueExpr::con_bytes(bytes.to_vec())))
    }

    fn text(state: &ParseState) -> Vec<u8> {
        state.order().get("text")[0].value().bytes().unwrap()
    }

    #[test]
    fn test_def_until_tries_initial_sizes_in_order() {
        let input = [1, 0, 2, 0];
        let root = |initials: &[u8]| {
            Token::def_until("text", each_byte(initials), ValueExpr::con_int(1), None, zero_byte())
                .unwrap()
        };
        assert_eq!(text(&run(&root(&[3, 1]), &input).unwrap()), vec![1, 0, 2]);
        assert_eq!(text(&run(&root(&[1, 3]), &input).unwrap()), vec![1]);
    }

    #[test]
    fn test_def_until_skips_zero_steps() {
        let root = |steps: ValueExpr| {
            Token::def_until("text", ValueExpr::con_int(1), steps, None, zero_byte()).unwrap()
        };
        assert!(run(&root(ValueExpr::con_int(0)), &[1, 2, 0]).is_none());
        let state = run(&root(each_byte(&[0, 1])), &[1, 2, 0]).unwrap();
        assert_eq!(text(&state), vec![1, 2]);
    }

    #[test]
    fn test_def_until_negative_step_shrinks() {
        let root = Token::def_until(
            "text",
            ValueExpr::con_int(3),
            ValueExpr::con_int(-1),
            None,
            zero_byte(),
        )
        .unwrap();
        assert_eq!(text(&run(&root, &[1, 2, 0, 0]).unwrap()), vec![1, 2, 0]);
        assert_eq!(text(&run(&root, &[1, 0, 2, 3]).unwrap()), vec![1]);
    }
}

#[cfg(test)]
mod tie_tests {
    use super::*;

    #[test]
    fn test_tie_parses_inside_value_bytes() {
        let root = Token::seq(
            "",
            vec![
                fixed("blob", 2),
                Token::tie("inner", fixed("first", 1), ValueExpr::reference("blob")).unwrap(),
                fixed("after", 1),
            ],
        )
        .unwrap();
        let state = run(&root, &[0xAA, 0xBB, 0xCC]).unwrap();
        assert_eq!(numbers(&state, "first"), vec![BigInt::from(0xAA)]);
        assert_eq!(numbers(&state, "after"), vec![BigInt::from(0xCC)]);
        assert_eq!(state.offset(), &BigInt::from(3));
    }

    #[test]
    fn test_tie_parses_each_value() {
        let root = Token::seq(
            "",
            vec![
                Token::rep_n("blobs", fixed("blob", 2), ValueExpr::con_int(2)).unwrap(),
                Token::tie("inner", fixed("first", 1), ValueExpr::reference("blob")).unwrap(),
            ],
        )
        .unwrap();
        let state = run(&root, &[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
        assert_eq!(numbers(&state, "first"), vec![BigInt::from(0xAA), BigInt::from(0xCC)]);
        assert_eq!(state.offset(), &BigInt::from(4));
    }

    #[test]
    fn test_tie_fails_when_any_value_fails() {
        let root = Token::seq(
            "",
            vec![
                fixed("part", 2),
                fixed("part", 1),
                Token::tie("inner", fixed("pair", 2), ValueExpr::reference("part")).unwrap(),
            ],
        )
        .unwrap();
        assert!(run(&root, &[1, 2, 3]).is_none());
    }

    #[test]
    fn test_tie_over_not_a_value_fails() {
        let root = Token::tie("inner", fixed("first", 1), ValueExpr::not_a_value()).unwrap();
        assert!(run(&root, &[1]).is_none());
    }
}
