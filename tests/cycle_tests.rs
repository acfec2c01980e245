//! Self-referential grammars over linked structures.
//!
//! A node is one `next` byte followed, unless it is zero, by a jump to the node at
//! that offset. Cyclic input must terminate with a back-reference instead of looping.

use num_bigint::BigInt;
use yantra::expression::ValueExpr;
use yantra::{Engine, ParseItem, ParseState, Predicate, Token};

fn jump() -> Token {
    Token::sub(
        "jump",
        Token::token_ref("node").unwrap(),
        ValueExpr::last(ValueExpr::reference("next")),
    )
    .unwrap()
}

/// A node that always follows its pointer.
fn looping_node() -> Token {
    Token::seq(
        "node",
        vec![Token::def("next", ValueExpr::con_int(1)).unwrap(), jump()],
    )
    .unwrap()
}

/// A node that stops at a zero pointer.
fn list_node() -> Token {
    let follow = Token::pre(
        "follow",
        jump(),
        Predicate::not(Predicate::eq_num(ValueExpr::con_int(0))),
    )
    .unwrap();
    let end = Token::def("end", ValueExpr::con_int(0)).unwrap();
    Token::seq(
        "node",
        vec![
            Token::def("next", ValueExpr::con_int(1)).unwrap(),
            Token::cho("link", vec![follow, end]).unwrap(),
        ],
    )
    .unwrap()
}

fn run(root: &Token, bytes: &[u8]) -> ParseState {
    Engine::new()
        .parse_bytes(root, bytes.to_vec())
        .unwrap()
        .expect("grammar should match")
}

fn next_offsets(state: &ParseState) -> Vec<BigInt> {
    state
        .order()
        .get("next")
        .iter()
        .map(|value| value.slice().offset().clone())
        .collect()
}

#[test]
fn test_self_loop_terminates_with_reference() {
    let root = looping_node();
    let state = run(&root, &[0x00]);
    assert_eq!(state.offset(), &BigInt::from(1));
    // the root is entered without a key, so only the jump back into it is tracked:
    // the node at 0 parses once as the root and once more as the first jump target
    assert_eq!(next_offsets(&state), vec![BigInt::from(0), BigInt::from(0)]);

    let references: Vec<_> = state
        .order()
        .walk()
        .filter_map(ParseItem::as_reference)
        .cloned()
        .collect();
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].location(), &BigInt::from(0));
    assert_eq!(references[0].definition(), &root);

    let target = state.order().resolve_reference(&references[0]).unwrap();
    assert_eq!(target.definition(), Some(&root));
}

#[test]
fn test_longer_cycle_revisits_once() {
    let state = run(&looping_node(), &[0x01, 0x00]);
    // 0 -> 1 -> 0 -> 1, where the second visit to 1 becomes a reference
    assert_eq!(
        next_offsets(&state),
        vec![BigInt::from(0), BigInt::from(1), BigInt::from(0)]
    );
    let references: Vec<_> = state
        .order()
        .walk()
        .filter_map(ParseItem::as_reference)
        .cloned()
        .collect();
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].location(), &BigInt::from(1));
}

#[test]
fn test_finite_chain_has_no_references() {
    let state = run(&list_node(), &[0x02, 0x00, 0x01]);
    assert_eq!(
        next_offsets(&state),
        vec![BigInt::from(0), BigInt::from(2), BigInt::from(1)]
    );
    assert!(state
        .order()
        .walk()
        .all(|item| item.as_reference().is_none()));
    // jumps return to where they started
    assert_eq!(state.offset(), &BigInt::from(1));
}

#[test]
fn test_jump_to_negative_offset_fails() {
    let root = Token::sub(
        "jump",
        Token::def("x", ValueExpr::con_int(1)).unwrap(),
        ValueExpr::con_int(-1),
    )
    .unwrap();
    assert!(Engine::new().parse_bytes(&root, vec![1]).unwrap().is_none());
}

#[test]
fn test_jump_without_addresses_fails() {
    let root = Token::sub(
        "jump",
        Token::def("x", ValueExpr::con_int(1)).unwrap(),
        ValueExpr::reference("absent"),
    )
    .unwrap();
    assert!(Engine::new().parse_bytes(&root, vec![1]).unwrap().is_none());
}

fn each_byte(bytes: &[u8]) -> ValueExpr {
    ValueExpr::Bytes(Box::new(ValueExpr::con_bytes(bytes.to_vec())))
}

#[test]
fn test_jump_to_every_listed_address() {
    let root = Token::seq(
        "",
        vec![
            Token::def("head", ValueExpr::con_int(1)).unwrap(),
            Token::sub(
                "jumps",
                Token::def("x", ValueExpr::con_int(1)).unwrap(),
                each_byte(&[2, 0, 1]),
            )
            .unwrap(),
        ],
    )
    .unwrap();
    let state = run(&root, &[0x09, 0x08, 0x07]);
    let xs: Vec<(BigInt, BigInt)> = state
        .order()
        .get("x")
        .iter()
        .map(|value| {
            (
                value.slice().offset().clone(),
                value.value().as_numeric().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        xs,
        vec![
            (BigInt::from(2), BigInt::from(7)),
            (BigInt::from(0), BigInt::from(9)),
            (BigInt::from(1), BigInt::from(8)),
        ]
    );
    // back where the jumps started
    assert_eq!(state.offset(), &BigInt::from(1));
}

#[test]
fn test_one_failing_address_fails_the_jump() {
    let root = Token::sub(
        "jumps",
        Token::def("x", ValueExpr::con_int(1)).unwrap(),
        each_byte(&[0, 5]),
    )
    .unwrap();
    assert!(Engine::new().parse_bytes(&root, vec![1, 2]).unwrap().is_none());
}
