//! Assertions over expression trees

use exprmap_core::{Expr, Lambda};

/// Assert two lambdas are structurally equal up to parameter renaming
///
/// # Panics
/// With both renderings when they differ
#[track_caller]
pub fn assert_lambda_eq(expected: &Lambda, actual: &Lambda) {
    assert!(
        expected.structurally_eq(actual),
        "lambdas differ\n  expected: {}\n    actual: {}",
        expected,
        actual
    );
}

/// Assert two expressions are structurally equal
#[track_caller]
pub fn assert_expr_eq(expected: &Expr, actual: &Expr) {
    assert!(
        expected.structurally_eq(actual),
        "expressions differ\n  expected: {}\n    actual: {}",
        expected,
        actual
    );
}

/// The projection lambda passed to a `Select` call
///
/// # Panics
/// When `expr` is not a call whose second argument is a (quoted) lambda
#[track_caller]
pub fn projection_of(expr: &Expr) -> Lambda {
    let call = expr
        .as_call()
        .unwrap_or_else(|| panic!("expected a call, found {}", expr));
    call.arguments
        .get(1)
        .and_then(Expr::as_lambda)
        .cloned()
        .unwrap_or_else(|| panic!("expected a projection argument in {}", expr))
}
