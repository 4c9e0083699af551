//! Identity-based node substitution.

use crate::errors::{MapError, Result};
use crate::expr::{walk, walk_lambda, Expr, ExprRewriter, Lambda};

struct Replacer<'a> {
    replacements: &'a [(Expr, Expr)],
}

impl ExprRewriter for Replacer<'_> {
    fn rewrite(&mut self, expr: &Expr) -> Result<Expr> {
        match self.replacements.iter().find(|(old, _)| old.ptr_eq(expr)) {
            // Children of the replacement are visited too, so replacements
            // compose when one new node contains another old node.
            Some((_, new)) => walk(self, new),
            None => walk(self, expr),
        }
    }
}

/// Collects the indices of the targets that occur in a tree. Matched nodes
/// are not descended into, as the replacer does not descend either.
struct OccurrenceFinder<'a> {
    targets: Vec<&'a Expr>,
    found: Vec<usize>,
}

impl ExprRewriter for OccurrenceFinder<'_> {
    fn rewrite(&mut self, expr: &Expr) -> Result<Expr> {
        match self.targets.iter().position(|target| target.ptr_eq(expr)) {
            Some(index) => {
                if !self.found.contains(&index) {
                    self.found.push(index);
                }
                Ok(expr.clone())
            }
            None => walk(self, expr),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Rejects replacement sets where an old node can be reached again from its
/// own replacement, directly or through other pairs.
fn check(replacements: &[(Expr, Expr)]) -> Result<()> {
    for (old, new) in replacements {
        if old.ptr_eq(new) {
            return Err(MapError::invalid_argument(
                "replacements",
                format!("`{}` would be replaced by itself", old),
            ));
        }
    }
    let edges = replacements
        .iter()
        .map(|(_, new)| {
            let mut finder = OccurrenceFinder {
                targets: replacements.iter().map(|(old, _)| old).collect(),
                found: Vec::new(),
            };
            // the replacer walks the children of a replacement, not the node
            walk(&mut finder, new)?;
            Ok(finder.found)
        })
        .collect::<Result<Vec<_>>>()?;
    let mut marks = vec![Mark::Unvisited; replacements.len()];
    for index in 0..replacements.len() {
        visit(index, &edges, &mut marks, replacements)?;
    }
    Ok(())
}

fn visit(
    index: usize,
    edges: &[Vec<usize>],
    marks: &mut [Mark],
    replacements: &[(Expr, Expr)],
) -> Result<()> {
    match marks[index] {
        Mark::Done => return Ok(()),
        Mark::InProgress => {
            return Err(MapError::invalid_argument(
                "replacements",
                format!("`{}` occurs in its own replacement", replacements[index].0),
            ))
        }
        Mark::Unvisited => {}
    }
    marks[index] = Mark::InProgress;
    for &next in &edges[index] {
        visit(next, edges, marks, replacements)?;
    }
    marks[index] = Mark::Done;
    Ok(())
}

/// Whether `node` occurs in `tree`, by identity.
pub fn occurs_in(tree: &Expr, node: &Expr) -> Result<bool> {
    let mut finder = OccurrenceFinder {
        targets: vec![node],
        found: Vec::new(),
    };
    finder.rewrite(tree)?;
    Ok(!finder.found.is_empty())
}

/// Replaces every occurrence of each old node, matched by identity, with its
/// new node. Nodes that merely look alike are left alone.
pub fn substitute(expr: &Expr, replacements: &[(Expr, Expr)]) -> Result<Expr> {
    check(replacements)?;
    Replacer { replacements }.rewrite(expr)
}

/// [`substitute`] over a lambda, parameters included.
pub fn substitute_lambda(lambda: &Lambda, replacements: &[(Expr, Expr)]) -> Result<Lambda> {
    check(replacements)?;
    walk_lambda(&mut Replacer { replacements }, lambda)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Member, Type};

    fn name() -> Member {
        Member::new("Cat", "Name", Type::String)
    }

    #[test]
    fn test_replaces_by_identity_only() {
        let x = Expr::parameter("x", Type::object("Cat"));
        let twin = Expr::parameter("x", Type::object("Cat"));
        let y = Expr::parameter("y", Type::object("Cat"));
        let expr = Expr::equal(x.member(&name()), twin.member(&name()));

        let result = substitute(&expr, &[(x.clone(), y.clone())]).unwrap();

        let expected = Expr::equal(y.member(&name()), twin.member(&name()));
        assert!(result.structurally_eq(&expected));
    }

    #[test]
    fn test_self_replacement_rejected() {
        let x = Expr::parameter("x", Type::Int);
        let err = substitute(&x, &[(x.clone(), x.clone())]).unwrap_err();
        assert!(matches!(err, MapError::InvalidArgument { .. }));
    }

    #[test]
    fn test_unmatched_tree_is_returned_unchanged() {
        let x = Expr::parameter("x", Type::object("Cat"));
        let expr = x.member(&name());
        let unrelated = Expr::parameter("z", Type::Int);
        let result = substitute(&expr, &[(unrelated, Expr::int(1))]).unwrap();
        assert!(result.ptr_eq(&expr));
    }

    #[test]
    fn test_replacement_children_are_visited() {
        let a = Expr::parameter("a", Type::Int);
        let b = Expr::parameter("b", Type::Int);
        let wrapped_b = Expr::equal(b.clone(), Expr::int(1));
        let result = substitute(&a, &[(a.clone(), wrapped_b), (b.clone(), Expr::int(7))]).unwrap();
        let expected = Expr::equal(Expr::int(7), Expr::int(1));
        assert!(result.structurally_eq(&expected));
    }

    #[test]
    fn test_replacement_containing_its_target_rejected() {
        let x = Expr::parameter("x", Type::object("Cat"));
        let err = substitute(&x, &[(x.clone(), x.member(&name()))]).unwrap_err();
        assert!(matches!(err, MapError::InvalidArgument { .. }));
    }

    #[test]
    fn test_replacement_cycle_through_pairs_rejected() {
        let a = Expr::parameter("a", Type::Int);
        let b = Expr::parameter("b", Type::Int);
        let err = substitute(
            &a,
            &[
                (a.clone(), Expr::equal(b.clone(), Expr::int(1))),
                (b.clone(), Expr::equal(a.clone(), Expr::int(2))),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, MapError::InvalidArgument { .. }));
    }

    #[test]
    fn test_substitute_lambda_renames_parameter() {
        let x = Expr::parameter("x", Type::object("Cat"));
        let y = Expr::parameter("y", Type::object("Cat"));
        let lambda = Lambda::unary(x.clone(), x.member(&name())).unwrap();
        let renamed = substitute_lambda(&lambda, &[(x, y.clone())]).unwrap();
        assert!(renamed.parameters()[0].ptr_eq(&y));
        assert_eq!(renamed.to_string(), "y => y.Name");
    }
}
