use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use exprmap_core::{
    apply_transformations, calls, merge, Expr, Lambda, Mapper, Member, Type,
};

fn cat_mapper() -> Mapper {
    let c = Expr::parameter("c", Type::object("Cat"));
    let body = Expr::new_object(Type::object("CatDto"))
        .assign(
            Member::new("CatDto", "Id", Type::Int),
            c.member(&Member::new("Cat", "Id", Type::Int)),
        )
        .assign(
            Member::new("CatDto", "Name", Type::String),
            c.member(&Member::new("Cat", "Name", Type::String)),
        )
        .build()
        .unwrap();
    Mapper::new(Lambda::unary(c, body).unwrap()).unwrap()
}

/// `x => new ThingDto { Cat0 = x.Cat0.MapWith(m), ..., Cats = x.Cats.MapAllWith(m) }`
fn thing_lambda(mapper: &Mapper, fields: usize) -> Lambda {
    let x = Expr::parameter("x", Type::object("Thing"));
    let mut builder = Expr::new_object(Type::object("ThingDto"));
    for i in 0..fields {
        let name = format!("Cat{}", i);
        let source = x.member(&Member::new("Thing", &name, Type::object("Cat")));
        builder = builder.assign(
            Member::new("ThingDto", &name, Type::object("CatDto")),
            calls::map_with(source, Expr::mapper(mapper)).unwrap(),
        );
    }
    let cats = x.member(&Member::new("Thing", "Cats", Type::list(Type::object("Cat"))));
    builder = builder.assign(
        Member::new("ThingDto", "Cats", Type::enumerable(Type::object("CatDto"))),
        calls::map_all_with(cats, Expr::mapper(mapper)).unwrap(),
    );
    Lambda::unary(x, builder.build().unwrap()).unwrap()
}

fn bench_apply_transformations(c: &mut Criterion) {
    let mapper = cat_mapper();
    let mut group = c.benchmark_group("apply_transformations");
    for fields in [1, 8, 32] {
        let lambda = thing_lambda(&mapper, fields);
        group.bench_with_input(BenchmarkId::from_parameter(fields), &lambda, |b, lambda| {
            b.iter(|| apply_transformations(black_box(lambda)).ok())
        });
    }
    group.finish();
}

fn bench_nested_mapper_build(c: &mut Criterion) {
    let inner = cat_mapper();
    let middle = Mapper::new(thing_lambda(&inner, 4)).unwrap();

    c.bench_function("nested_mapper_build", |b| {
        b.iter(|| {
            let x = Expr::parameter("x", Type::object("Owner"));
            let source = x.member(&Member::new("Owner", "Thing", Type::object("Thing")));
            let body = calls::map_with(source, Expr::mapper(&middle)).unwrap();
            Mapper::new(Lambda::unary(x, body).unwrap()).ok()
        })
    });
}

fn bench_merge(c: &mut Criterion) {
    let mapper = cat_mapper();
    let source = mapper.expression().clone();
    let c_param = Expr::parameter("c", Type::object("Cat"));
    let extension = Lambda::unary(
        c_param,
        Expr::new_object(Type::object("CatDto"))
            .assign(
                Member::new("CatDto", "Name", Type::String),
                Expr::binary(
                    exprmap_core::BinaryOp::Add,
                    Expr::original_value(Type::String),
                    Expr::string(" meow!"),
                ),
            )
            .build()
            .unwrap(),
    )
    .unwrap();

    c.bench_function("merge_with_original_value", |b| {
        b.iter(|| merge(black_box(&source), black_box(&extension)).ok())
    });
}

criterion_group!(
    benches,
    bench_apply_transformations,
    bench_nested_mapper_build,
    bench_merge
);
criterion_main!(benches);
