use super::{Assignment, Expr, ExprKind, Lambda};

/// Pairs of lambda parameters bound at the current depth, innermost last.
#[derive(Default)]
struct Scope {
    bound: Vec<(usize, usize)>,
}

pub(super) fn exprs_equal(left: &Expr, right: &Expr) -> bool {
    Scope::default().expr(left, right)
}

pub(super) fn lambdas_equal(left: &Lambda, right: &Lambda) -> bool {
    Scope::default().lambda(left, right)
}

impl Scope {
    fn expr(&mut self, a: &Expr, b: &Expr) -> bool {
        if a.ptr_eq(b) && self.bound.is_empty() {
            return true;
        }
        if a.ty() != b.ty() {
            return false;
        }
        match (a.kind(), b.kind()) {
            (ExprKind::Parameter(name_a), ExprKind::Parameter(name_b)) => {
                let (id_a, id_b) = (a.node_id(), b.node_id());
                match self.bound.iter().rev().find(|(l, _)| *l == id_a) {
                    Some((_, r)) => *r == id_b,
                    None => {
                        // free on the left, so must be free on the right too
                        !self.bound.iter().any(|(_, r)| *r == id_b) && name_a == name_b
                    }
                }
            }
            (ExprKind::Constant(va), ExprKind::Constant(vb)) => va == vb,
            (ExprKind::Default, ExprKind::Default) => true,
            (
                ExprKind::Member {
                    object: oa,
                    member: ma,
                },
                ExprKind::Member {
                    object: ob,
                    member: mb,
                },
            ) => ma == mb && self.expr(oa, ob),
            (
                ExprKind::Unary {
                    op: pa,
                    operand: oa,
                },
                ExprKind::Unary {
                    op: pb,
                    operand: ob,
                },
            ) => pa == pb && self.expr(oa, ob),
            (
                ExprKind::Binary {
                    op: pa,
                    left: la,
                    right: ra,
                },
                ExprKind::Binary {
                    op: pb,
                    left: lb,
                    right: rb,
                },
            ) => pa == pb && self.expr(la, lb) && self.expr(ra, rb),
            (
                ExprKind::Conditional {
                    test: ta,
                    if_true: ya,
                    if_false: na,
                },
                ExprKind::Conditional {
                    test: tb,
                    if_true: yb,
                    if_false: nb,
                },
            ) => self.expr(ta, tb) && self.expr(ya, yb) && self.expr(na, nb),
            (ExprKind::Call(ca), ExprKind::Call(cb)) => {
                ca.operation.key() == cb.operation.key()
                    && match (&ca.receiver, &cb.receiver) {
                        (Some(ra), Some(rb)) => self.expr(ra, rb),
                        (None, None) => true,
                        _ => false,
                    }
                    && self.all(&ca.arguments, &cb.arguments)
            }
            (ExprKind::Lambda(la), ExprKind::Lambda(lb))
            | (ExprKind::Quote(la), ExprKind::Quote(lb)) => self.lambda(la, lb),
            (ExprKind::MemberInit(ia), ExprKind::MemberInit(ib)) => {
                ia.constructor.ty == ib.constructor.ty
                    && self.assignments(&ia.constructor.arguments, &ib.constructor.arguments)
                    && self.assignments(&ia.assignments, &ib.assignments)
            }
            (
                ExprKind::OriginalValue { fallback: fa },
                ExprKind::OriginalValue { fallback: fb },
            ) => match (fa, fb) {
                (Some(fa), Some(fb)) => self.expr(fa, fb),
                (None, None) => true,
                _ => false,
            },
            _ => false,
        }
    }

    fn lambda(&mut self, a: &Lambda, b: &Lambda) -> bool {
        if a.parameters().len() != b.parameters().len() {
            return false;
        }
        let depth = self.bound.len();
        for (pa, pb) in a.parameters().iter().zip(b.parameters()) {
            if pa.ty() != pb.ty() {
                self.bound.truncate(depth);
                return false;
            }
            self.bound.push((pa.node_id(), pb.node_id()));
        }
        let equal = self.expr(a.body(), b.body());
        self.bound.truncate(depth);
        equal
    }

    fn all(&mut self, a: &[Expr], b: &[Expr]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.expr(x, y))
    }

    fn assignments(&mut self, a: &[Assignment], b: &[Assignment]) -> bool {
        a.len() == b.len()
            && a
                .iter()
                .zip(b)
                .all(|(x, y)| x.member == y.member && self.expr(&x.value, &y.value))
    }
}
