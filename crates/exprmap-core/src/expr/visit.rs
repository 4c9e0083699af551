//! Bottom-up tree rewriting.
//!
//! Rebuilding preserves sharing: when every child comes back as the same node
//! the parent is returned as is, so untouched subtrees keep their identity.

use super::{Assignment, Call, Constructor, Expr, ExprKind, Lambda, MemberInit};
use crate::errors::{MapError, Result};

/// A rewriting visitor. Override [`ExprRewriter::rewrite`] to intercept nodes
/// and call [`walk`] to descend into the ones you leave alone.
pub trait ExprRewriter {
    fn rewrite(&mut self, expr: &Expr) -> Result<Expr> {
        walk(self, expr)
    }
}

/// Rewrites the children of `expr` and rebuilds it if any of them changed.
pub fn walk<R: ExprRewriter + ?Sized>(rewriter: &mut R, expr: &Expr) -> Result<Expr> {
    let kind = match expr.kind() {
        ExprKind::Parameter(_) | ExprKind::Constant(_) | ExprKind::Default => {
            return Ok(expr.clone())
        }
        ExprKind::Member { object, member } => {
            let new_object = rewriter.rewrite(object)?;
            if new_object.ptr_eq(object) {
                return Ok(expr.clone());
            }
            ExprKind::Member {
                object: new_object,
                member: member.clone(),
            }
        }
        ExprKind::Unary { op, operand } => {
            let new_operand = rewriter.rewrite(operand)?;
            if new_operand.ptr_eq(operand) {
                return Ok(expr.clone());
            }
            ExprKind::Unary {
                op: *op,
                operand: new_operand,
            }
        }
        ExprKind::Binary { op, left, right } => {
            let new_left = rewriter.rewrite(left)?;
            let new_right = rewriter.rewrite(right)?;
            if new_left.ptr_eq(left) && new_right.ptr_eq(right) {
                return Ok(expr.clone());
            }
            ExprKind::Binary {
                op: *op,
                left: new_left,
                right: new_right,
            }
        }
        ExprKind::Conditional {
            test,
            if_true,
            if_false,
        } => {
            let new_test = rewriter.rewrite(test)?;
            let new_true = rewriter.rewrite(if_true)?;
            let new_false = rewriter.rewrite(if_false)?;
            if new_test.ptr_eq(test) && new_true.ptr_eq(if_true) && new_false.ptr_eq(if_false) {
                return Ok(expr.clone());
            }
            ExprKind::Conditional {
                test: new_test,
                if_true: new_true,
                if_false: new_false,
            }
        }
        ExprKind::Call(call) => {
            let receiver = match &call.receiver {
                Some(receiver) => Some(rewriter.rewrite(receiver)?),
                None => None,
            };
            let receiver_same = match (&receiver, &call.receiver) {
                (Some(new), Some(old)) => new.ptr_eq(old),
                _ => true,
            };
            let arguments = walk_all(rewriter, &call.arguments)?;
            if receiver_same && arguments.is_none() {
                return Ok(expr.clone());
            }
            ExprKind::Call(Call {
                operation: call.operation.clone(),
                receiver,
                arguments: arguments.unwrap_or_else(|| call.arguments.clone()),
            })
        }
        ExprKind::Lambda(lambda) => {
            let new_lambda = walk_lambda(rewriter, lambda)?;
            if new_lambda.ptr_eq(lambda) {
                return Ok(expr.clone());
            }
            return Ok(Expr::lambda(new_lambda));
        }
        ExprKind::Quote(lambda) => {
            let new_lambda = walk_lambda(rewriter, lambda)?;
            if new_lambda.ptr_eq(lambda) {
                return Ok(expr.clone());
            }
            return Ok(Expr::quote(new_lambda));
        }
        ExprKind::MemberInit(init) => {
            let arguments = walk_assignments(rewriter, &init.constructor.arguments)?;
            let assignments = walk_assignments(rewriter, &init.assignments)?;
            if arguments.is_none() && assignments.is_none() {
                return Ok(expr.clone());
            }
            ExprKind::MemberInit(MemberInit {
                constructor: Constructor {
                    ty: init.constructor.ty.clone(),
                    arguments: arguments.unwrap_or_else(|| init.constructor.arguments.clone()),
                },
                assignments: assignments.unwrap_or_else(|| init.assignments.clone()),
            })
        }
        ExprKind::OriginalValue { fallback } => match fallback {
            Some(fallback_expr) => {
                let new_fallback = rewriter.rewrite(fallback_expr)?;
                if new_fallback.ptr_eq(fallback_expr) {
                    return Ok(expr.clone());
                }
                ExprKind::OriginalValue {
                    fallback: Some(new_fallback),
                }
            }
            None => return Ok(expr.clone()),
        },
    };
    Ok(Expr::from_kind(kind, expr.ty().clone()))
}

/// Rewrites a lambda's parameters and body. A parameter must still be a
/// parameter after rewriting.
pub fn walk_lambda<R: ExprRewriter + ?Sized>(rewriter: &mut R, lambda: &Lambda) -> Result<Lambda> {
    let parameters = walk_all(rewriter, lambda.parameters())?;
    if let Some(parameters) = &parameters {
        for (old, new) in lambda.parameters().iter().zip(parameters) {
            if new.parameter_name().is_none() {
                return Err(MapError::InvalidParameterRewrite {
                    name: old.parameter_name().unwrap_or_default().to_string(),
                });
            }
        }
    }
    let body = rewriter.rewrite(lambda.body())?;
    if parameters.is_none() && body.ptr_eq(lambda.body()) {
        return Ok(lambda.clone());
    }
    Lambda::new(
        parameters.unwrap_or_else(|| lambda.parameters().to_vec()),
        body,
    )
}

/// Returns `None` when no element changed.
fn walk_all<R: ExprRewriter + ?Sized>(rewriter: &mut R, exprs: &[Expr]) -> Result<Option<Vec<Expr>>> {
    let mut changed = false;
    let mut rewritten = Vec::with_capacity(exprs.len());
    for expr in exprs {
        let new = rewriter.rewrite(expr)?;
        changed |= !new.ptr_eq(expr);
        rewritten.push(new);
    }
    Ok(changed.then_some(rewritten))
}

fn walk_assignments<R: ExprRewriter + ?Sized>(
    rewriter: &mut R,
    assignments: &[Assignment],
) -> Result<Option<Vec<Assignment>>> {
    let mut changed = false;
    let mut rewritten = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let value = rewriter.rewrite(&assignment.value)?;
        changed |= !value.ptr_eq(&assignment.value);
        rewritten.push(Assignment::new(assignment.member.clone(), value));
    }
    Ok(changed.then_some(rewritten))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Member, Type};

    struct Identity;
    impl ExprRewriter for Identity {}

    struct ParamToConstant;
    impl ExprRewriter for ParamToConstant {
        fn rewrite(&mut self, expr: &Expr) -> Result<Expr> {
            if expr.parameter_name().is_some() {
                return Ok(Expr::int(0));
            }
            walk(self, expr)
        }
    }

    #[test]
    fn test_identity_preserves_node() {
        let x = Expr::parameter("x", Type::object("Cat"));
        let body = Expr::new_object(Type::object("CatDto"))
            .assign(
                Member::new("CatDto", "Id", Type::Int),
                x.member(&Member::new("Cat", "Id", Type::Int)),
            )
            .build()
            .unwrap();
        let lambda = Lambda::unary(x, body).unwrap();
        let rewritten = walk_lambda(&mut Identity, &lambda).unwrap();
        assert!(rewritten.ptr_eq(&lambda));
    }

    #[test]
    fn test_parameter_rewritten_to_constant_is_rejected() {
        let x = Expr::parameter("x", Type::Int);
        let lambda = Lambda::unary(x.clone(), x).unwrap();
        let result = walk_lambda(&mut ParamToConstant, &lambda);
        assert!(matches!(
            result,
            Err(MapError::InvalidParameterRewrite { .. })
        ));
    }
}
