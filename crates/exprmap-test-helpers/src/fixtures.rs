//! Test fixtures - the Thing/Cat entity schema and ready-made mappings
//!
//! `Thing` and `Cat` reference each other, which is what the recursion and
//! nested-inlining tests need.

use exprmap_core::{Expr, Lambda, Mapper, Object, Value};

pub mod thing {
    use exprmap_core::{Member, Type};

    pub fn ty() -> Type {
        Type::object("Thing")
    }

    pub fn id() -> Member {
        Member::new("Thing", "Id", Type::Int)
    }

    pub fn name() -> Member {
        Member::new("Thing", "Name", Type::String)
    }

    pub fn very_secret_string() -> Member {
        Member::new("Thing", "VerySecretString", Type::String)
    }

    pub fn favorite_cat() -> Member {
        Member::new("Thing", "FavoriteCat", super::cat::ty())
    }

    pub fn best_friend() -> Member {
        Member::new("Thing", "BestFriend", ty())
    }

    pub fn cats() -> Member {
        Member::new("Thing", "Cats", Type::list(super::cat::ty()))
    }
}

pub mod thing_dto {
    use exprmap_core::{Member, Type};

    pub fn ty() -> Type {
        Type::object("ThingDto")
    }

    pub fn id() -> Member {
        Member::new("ThingDto", "Id", Type::Int)
    }

    pub fn name() -> Member {
        Member::new("ThingDto", "Name", Type::String)
    }

    pub fn favorite_cat() -> Member {
        Member::new("ThingDto", "FavoriteCat", super::cat_dto::ty())
    }

    pub fn best_friend() -> Member {
        Member::new("ThingDto", "BestFriend", ty())
    }

    pub fn cats() -> Member {
        Member::new("ThingDto", "Cats", Type::list(super::cat_dto::ty()))
    }
}

pub mod cat {
    use exprmap_core::{Member, Type};

    pub fn ty() -> Type {
        Type::object("Cat")
    }

    pub fn id() -> Member {
        Member::new("Cat", "Id", Type::Int)
    }

    pub fn name() -> Member {
        Member::new("Cat", "Name", Type::String)
    }

    pub fn cuteness_level() -> Member {
        Member::new("Cat", "CutenessLevel", Type::Int)
    }

    pub fn weight() -> Member {
        Member::new("Cat", "Weight", Type::Float)
    }

    pub fn owner() -> Member {
        Member::new("Cat", "Owner", super::thing::ty())
    }
}

pub mod cat_dto {
    use exprmap_core::{Member, Type};

    pub fn ty() -> Type {
        Type::object("CatDto")
    }

    pub fn id() -> Member {
        Member::new("CatDto", "Id", Type::Int)
    }

    pub fn name() -> Member {
        Member::new("CatDto", "Name", Type::String)
    }

    pub fn cuteness_level() -> Member {
        Member::new("CatDto", "CutenessLevel", Type::Int)
    }

    pub fn owner() -> Member {
        Member::new("CatDto", "Owner", super::thing_dto::ty())
    }
}

/// `new CatDto { Id = source.Id, Name = source.Name, CutenessLevel = source.CutenessLevel }`
pub fn cat_dto_body(source: &Expr) -> Expr {
    Expr::new_object(cat_dto::ty())
        .assign(cat_dto::id(), source.member(&cat::id()))
        .assign(cat_dto::name(), source.member(&cat::name()))
        .assign(cat_dto::cuteness_level(), source.member(&cat::cuteness_level()))
        .build()
        .expect("cat dto construction is well formed")
}

pub fn cat_dto_lambda() -> Lambda {
    let c = Expr::parameter("c", cat::ty());
    Lambda::unary(c.clone(), cat_dto_body(&c)).expect("single parameter lambda")
}

pub fn cat_dto_mapper() -> Mapper {
    Mapper::new(cat_dto_lambda()).expect("cat mapper builds")
}

/// `new ThingDto { Id = source.Id, Name = source.Name }`
pub fn thing_dto_scalar_body(source: &Expr) -> Expr {
    Expr::new_object(thing_dto::ty())
        .assign(thing_dto::id(), source.member(&thing::id()))
        .assign(thing_dto::name(), source.member(&thing::name()))
        .build()
        .expect("thing dto construction is well formed")
}

pub fn sample_cat(id: i64, name: &str, cuteness_level: i64) -> Value {
    Object::new("Cat")
        .with("Id", Value::Int(id))
        .with("Name", Value::string(name))
        .with("CutenessLevel", Value::Int(cuteness_level))
        .with("Weight", Value::Float(4.5))
        .with("Owner", Value::Null)
        .into_value()
}

pub fn expected_cat_dto(id: i64, name: &str, cuteness_level: i64) -> Value {
    Object::new("CatDto")
        .with("Id", Value::Int(id))
        .with("Name", Value::string(name))
        .with("CutenessLevel", Value::Int(cuteness_level))
        .into_value()
}

/// A thing with scalar fields set and every reference field null.
pub fn sample_thing(id: i64, name: &str) -> Object {
    Object::new("Thing")
        .with("Id", Value::Int(id))
        .with("Name", Value::string(name))
        .with("VerySecretString", Value::string("hunter2"))
        .with("FavoriteCat", Value::Null)
        .with("BestFriend", Value::Null)
        .with("Cats", Value::list(Vec::new()))
}
