//! Large inputs must not exhaust the native stack: loops, folds, graph traversal and
//! dropping a long graph all run iteratively.

use num_bigint::BigInt;
use yantra::expression::{BinaryOp, ValueExpr};
use yantra::{Encoding, Engine, Token};

const MANY: usize = 1_000_000;

fn bytes() -> Token {
    Token::rep("bytes", Token::def("byte", ValueExpr::con_int(1)).unwrap()).unwrap()
}

#[test]
fn test_million_iteration_repetition() {
    let input = vec![1u8; MANY];
    let state = Engine::new().parse_bytes(&bytes(), input).unwrap().unwrap();
    assert_eq!(state.offset(), &BigInt::from(MANY));
    assert_eq!(state.order().values().len(), MANY);

    let chronological = state.order().reversed();
    assert_eq!(chronological.values().len(), MANY);

    // both graphs drop here
}

#[test]
fn test_fold_over_many_values() {
    let input = vec![1u8; MANY / 10];
    let state = Engine::new().parse_bytes(&bytes(), input).unwrap().unwrap();
    let total = ValueExpr::fold_left(ValueExpr::reference("byte"), BinaryOp::Add, None);
    let values = total.eval(&state, &Encoding::default()).unwrap();
    assert_eq!(values[0].numeric().unwrap(), Some(BigInt::from(MANY / 10)));
}

#[test]
fn test_counted_repetition_of_many() {
    let root = Token::rep_n(
        "bytes",
        Token::def("byte", ValueExpr::con_int(1)).unwrap(),
        ValueExpr::con_int(MANY as i64),
    )
    .unwrap();
    let state = Engine::new().parse_bytes(&root, vec![0u8; MANY]).unwrap().unwrap();
    assert_eq!(state.offset(), &BigInt::from(MANY));
}
