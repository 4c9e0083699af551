//! Field-wise merging of two construction lambdas.
//!
//! The extension overrides the source: its constructor, its parameters and
//! the values it assigns survive. Fields both sides assign with a nested
//! construction are merged recursively. An `OriginalValue` placeholder in an
//! extension value stands for the value the source assigned to that field.

use tracing::debug;

use super::substitute::substitute;
use crate::errors::{MapError, MergeSide, Result};
use crate::expr::{walk, Assignment, Expr, ExprKind, ExprRewriter, Lambda, MemberInit};
use crate::types::Member;

/// Merges `extension` over `source`. Both bodies must be constructions with
/// member initializers and both lambdas must take the same number of
/// parameters.
pub fn merge(source: &Lambda, extension: &Lambda) -> Result<Lambda> {
    let source_init = source
        .body()
        .as_member_init()
        .ok_or(MapError::InvalidTreeShape {
            side: MergeSide::Source,
        })?;
    let extension_init = extension
        .body()
        .as_member_init()
        .ok_or(MapError::InvalidTreeShape {
            side: MergeSide::Extension,
        })?;
    if source.parameters().len() != extension.parameters().len() {
        return Err(MapError::invalid_argument(
            "extension",
            format!(
                "takes {} parameters, the source takes {}",
                extension.parameters().len(),
                source.parameters().len()
            ),
        ));
    }

    let merged = merge_inits(source_init, extension_init)?;

    let replacements: Vec<(Expr, Expr)> = source
        .parameters()
        .iter()
        .zip(extension.parameters())
        .filter(|(old, new)| !old.ptr_eq(new))
        .map(|(old, new)| (old.clone(), new.clone()))
        .collect();
    let body = substitute(&merged, &replacements)?;

    debug!(
        source_fields = source_init.assignments.len(),
        extension_fields = extension_init.assignments.len(),
        "Merged construction expressions into {}",
        extension_init.constructor.ty
    );
    Lambda::new(extension.parameters().to_vec(), body)
}

fn merge_inits(source: &MemberInit, extension: &MemberInit) -> Result<Expr> {
    let mut assignments = Vec::with_capacity(source.assignments.len() + extension.assignments.len());

    for original in &source.assignments {
        let Some(replacement) = extension.assignment(&original.member) else {
            assignments.push(original.clone());
            continue;
        };
        let value = match (
            original.value.as_member_init(),
            replacement.value.as_member_init(),
        ) {
            (Some(inner_source), Some(inner_extension)) => {
                merge_inits(inner_source, inner_extension)?
            }
            _ => replacement.value.clone(),
        };
        let value = resolve_original_values(&value, Some(&original.value), &replacement.member)?;
        assignments.push(Assignment::new(replacement.member.clone(), value));
    }

    for added in &extension.assignments {
        if source.assignment(&added.member).is_some() {
            continue;
        }
        let value = resolve_original_values(&added.value, None, &added.member)?;
        assignments.push(Assignment::new(added.member.clone(), value));
    }

    Ok(Expr::member_init_unchecked(MemberInit {
        constructor: extension.constructor.clone(),
        assignments,
    }))
}

fn resolve_original_values(
    value: &Expr,
    original: Option<&Expr>,
    member: &Member,
) -> Result<Expr> {
    OriginalValueResolver { original, member }.rewrite(value)
}

struct OriginalValueResolver<'a> {
    original: Option<&'a Expr>,
    member: &'a Member,
}

impl ExprRewriter for OriginalValueResolver<'_> {
    fn rewrite(&mut self, expr: &Expr) -> Result<Expr> {
        let ExprKind::OriginalValue { fallback } = expr.kind() else {
            return walk(self, expr);
        };
        // the source value is spliced as is, never revisited
        match (self.original, fallback) {
            (Some(original), _) => Ok(original.clone()),
            (None, Some(fallback)) => self.rewrite(fallback),
            (None, None) => Err(MapError::OriginalValueMissing {
                member: self.member.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::BinaryOp;
    use crate::types::Type;

    fn thing() -> Type {
        Type::object("Thing")
    }

    fn dto() -> Type {
        Type::object("ThingDto")
    }

    fn src(name: &str, ty: Type) -> Member {
        Member::new("Thing", name, ty)
    }

    fn dst(name: &str, ty: Type) -> Member {
        Member::new("ThingDto", name, ty)
    }

    #[test]
    fn test_original_value_takes_source_assignment() {
        let x = Expr::parameter("x", thing());
        let source = Lambda::unary(
            x.clone(),
            Expr::new_object(dto())
                .assign(dst("Name", Type::String), x.member(&src("Name", Type::String)))
                .build()
                .unwrap(),
        )
        .unwrap();
        let y = Expr::parameter("y", thing());
        let extension = Lambda::unary(
            y.clone(),
            Expr::new_object(dto())
                .assign(
                    dst("Name", Type::String),
                    Expr::binary(
                        BinaryOp::Add,
                        Expr::original_value(Type::String),
                        Expr::string(" meow!"),
                    ),
                )
                .build()
                .unwrap(),
        )
        .unwrap();

        let merged = merge(&source, &extension).unwrap();

        assert!(merged.parameters()[0].ptr_eq(&y));
        assert_eq!(merged.to_string(), r#"y => new ThingDto { Name = (y.Name + " meow!") }"#);
    }

    #[test]
    fn test_original_value_without_source_uses_fallback() {
        let x = Expr::parameter("x", thing());
        let source = Lambda::unary(x.clone(), Expr::new_object(dto()).build().unwrap()).unwrap();
        let y = Expr::parameter("y", thing());
        let extension = Lambda::unary(
            y.clone(),
            Expr::new_object(dto())
                .assign(
                    dst("Name", Type::String),
                    Expr::original_value_or(Expr::string("unnamed")),
                )
                .build()
                .unwrap(),
        )
        .unwrap();

        let merged = merge(&source, &extension).unwrap();
        assert_eq!(merged.to_string(), r#"y => new ThingDto { Name = "unnamed" }"#);
    }

    #[test]
    fn test_original_value_without_source_or_fallback_fails() {
        let x = Expr::parameter("x", thing());
        let source = Lambda::unary(x.clone(), Expr::new_object(dto()).build().unwrap()).unwrap();
        let extension = Lambda::unary(
            x.clone(),
            Expr::new_object(dto())
                .assign(dst("Name", Type::String), Expr::original_value(Type::String))
                .build()
                .unwrap(),
        )
        .unwrap();

        let err = merge(&source, &extension).unwrap_err();
        assert!(matches!(err, MapError::OriginalValueMissing { .. }));
    }

    #[test]
    fn test_non_construction_source_rejected() {
        let x = Expr::parameter("x", thing());
        let source = Lambda::unary(x.clone(), x.member(&src("Id", Type::Int))).unwrap();
        let extension = Lambda::unary(x.clone(), Expr::new_object(dto()).build().unwrap()).unwrap();
        let err = merge(&source, &extension).unwrap_err();
        assert!(matches!(
            err,
            MapError::InvalidTreeShape {
                side: MergeSide::Source
            }
        ));
        let err = merge(&extension, &source).unwrap_err();
        assert!(matches!(
            err,
            MapError::InvalidTreeShape {
                side: MergeSide::Extension
            }
        ));
    }

    #[test]
    fn test_same_lambda_merges_with_itself() {
        let x = Expr::parameter("x", thing());
        let lambda = Lambda::unary(
            x.clone(),
            Expr::new_object(dto())
                .assign(dst("Id", Type::Int), x.member(&src("Id", Type::Int)))
                .build()
                .unwrap(),
        )
        .unwrap();
        let merged = merge(&lambda, &lambda).unwrap();
        assert!(merged.structurally_eq(&lambda));
    }
}
