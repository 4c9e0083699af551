//! Self-inclusion detection and null mapper arguments.

use std::sync::{Arc, OnceLock};

use exprmap_core::{
    calls, CallSiteRewriter, ErrorKind, Expr, Lambda, MapError, Mapper, MapperRef, MappingContext,
    ResolveRequest, RewriteSettings, TransformPipeline, Type,
};
use exprmap_test_helpers::fixtures::{cat, cat_dto, thing, thing_dto};
use exprmap_test_helpers::mocks::RecordingResolver;

fn thing_lambda(build: impl FnOnce(&Expr) -> Expr) -> Lambda {
    let x = Expr::parameter("x", thing::ty());
    let body = build(&x);
    Lambda::unary(x, body).unwrap()
}

// ============================================================================
// Self inclusion
// ============================================================================

#[test]
fn test_reference_including_itself_is_rejected() {
    let slot = MapperRef::new(thing::ty(), thing_dto::ty());
    let lambda = thing_lambda(|x| {
        Expr::new_object(thing_dto::ty())
            .assign(thing_dto::id(), x.member(&thing::id()))
            .assign(
                thing_dto::best_friend(),
                calls::map_with(x.member(&thing::best_friend()), Expr::mapper_ref(&slot))
                    .unwrap(),
            )
            .build()
            .unwrap()
    });

    let err = slot.use_expression(lambda).unwrap_err();

    assert!(matches!(err, MapError::RecursiveMapper));
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert!(!slot.is_initialized());
}

#[test]
fn test_reference_including_itself_through_include_is_rejected() {
    let slot = MapperRef::new(thing::ty(), thing_dto::ty());
    let lambda = thing_lambda(|x| {
        calls::include(x.member(&thing::best_friend()), Expr::mapper_ref(&slot)).unwrap()
    });

    let err = slot.use_expression(lambda).unwrap_err();

    assert!(matches!(err, MapError::RecursiveMapper));
}

#[test]
fn test_filled_foreign_reference_is_inlined() {
    let slot = MapperRef::new(cat::ty(), cat_dto::ty());
    slot.use_expression(exprmap_test_helpers::fixtures::cat_dto_lambda())
        .unwrap();

    let mapper = Mapper::new(thing_lambda(|x| {
        calls::include(x.member(&thing::favorite_cat()), Expr::mapper_ref(&slot)).unwrap()
    }))
    .unwrap();

    let expected = thing_lambda(|x| {
        exprmap_test_helpers::fixtures::cat_dto_body(&x.member(&thing::favorite_cat()))
    });
    exprmap_test_helpers::assertions::assert_lambda_eq(&expected, mapper.expression());
}

#[test]
fn test_resolved_mapper_matching_current_mapper_is_rejected() {
    let friend_mapper = Mapper::new(thing_lambda(|x| {
        Expr::new_object(thing_dto::ty())
            .assign(thing_dto::id(), x.member(&thing::id()))
            .build()
            .unwrap()
    }))
    .unwrap();
    let resolver = RecordingResolver::answering(friend_mapper.clone());
    let rewriter = CallSiteRewriter::with_settings(RewriteSettings::default().with_resolver(resolver));
    let lambda = thing_lambda(|x| {
        calls::include_resolved(x.member(&thing::best_friend()), thing_dto::ty()).unwrap()
    });

    let err = rewriter
        .rewrite_lambda(&lambda, &MappingContext::for_mapper(friend_mapper.id(), &lambda))
        .unwrap_err();

    assert!(matches!(err, MapError::RecursiveMapper));
}

#[test]
fn test_reference_resolving_to_itself_is_rejected() {
    let own_slot: Arc<OnceLock<MapperRef>> = Arc::new(OnceLock::new());
    let resolver = {
        let own_slot = Arc::clone(&own_slot);
        move |_: &ResolveRequest<'_>| own_slot.get().cloned()
    };
    let settings = RewriteSettings::default().with_resolver(Arc::new(resolver));
    let pipeline = TransformPipeline::new(Arc::new(CallSiteRewriter::with_settings(settings)));
    let slot = MapperRef::with_pipeline(thing::ty(), thing_dto::ty(), pipeline);
    own_slot.set(slot.clone()).unwrap();
    let lambda = thing_lambda(|x| {
        Expr::new_object(thing_dto::ty())
            .assign(
                thing_dto::best_friend(),
                calls::include_resolved(x.member(&thing::best_friend()), thing_dto::ty()).unwrap(),
            )
            .build()
            .unwrap()
    });

    let err = slot.use_expression(lambda).unwrap_err();

    assert!(matches!(err, MapError::RecursiveMapper));
    assert!(!slot.is_initialized());
}

#[test]
fn test_resolved_unfilled_foreign_reference_is_null_mapper() {
    let foreign = MapperRef::new(cat::ty(), cat_dto::ty());
    let resolver = RecordingResolver::answering(foreign);
    let rewriter = CallSiteRewriter::with_settings(RewriteSettings::default().with_resolver(resolver));
    let lambda = thing_lambda(|x| {
        calls::include_resolved(x.member(&thing::favorite_cat()), cat_dto::ty()).unwrap()
    });

    let err = rewriter
        .rewrite_lambda(&lambda, &MappingContext::for_lambda(&lambda))
        .unwrap_err();

    assert!(matches!(err, MapError::NullMapper));
}

// ============================================================================
// Null mappers
// ============================================================================

#[test]
fn test_unfilled_foreign_reference_is_null_mapper() {
    let slot = MapperRef::new(cat::ty(), cat_dto::ty());
    let lambda = thing_lambda(|x| {
        calls::map_with(x.member(&thing::favorite_cat()), Expr::mapper_ref(&slot)).unwrap()
    });

    let err = Mapper::new(lambda).unwrap_err();

    assert!(matches!(err, MapError::NullMapper));
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}

#[test]
fn test_null_mapper_constant_is_rejected() {
    let lambda = thing_lambda(|x| {
        calls::map(
            Expr::null(Type::mapper(cat::ty(), cat_dto::ty())),
            x.member(&thing::favorite_cat()),
        )
        .unwrap()
    });

    let err = Mapper::new(lambda).unwrap_err();

    assert!(matches!(err, MapError::NullMapper));
}

#[test]
fn test_unfilled_reference_cannot_map_values() {
    let slot = MapperRef::new(cat::ty(), cat_dto::ty());

    let err = slot
        .map(&exprmap_test_helpers::fixtures::sample_cat(1, "Tom", 3))
        .unwrap_err();

    assert!(matches!(err, MapError::NullMapper));
}

#[test]
fn test_rewriter_is_shareable_across_threads() {
    let rewriter = Arc::new(CallSiteRewriter::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let rewriter = Arc::clone(&rewriter);
            std::thread::spawn(move || {
                let cat_mapper = exprmap_test_helpers::fixtures::cat_dto_mapper();
                let lambda = thing_lambda(|x| {
                    calls::map_with(x.member(&thing::favorite_cat()), Expr::mapper(&cat_mapper))
                        .unwrap()
                });
                rewriter
                    .rewrite_lambda(&lambda, &MappingContext::for_lambda(&lambda))
                    .map(|l| l.to_string())
            })
        })
        .collect();

    let results: Vec<String> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();

    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(rewriter.cached_operations(), 1);
}
