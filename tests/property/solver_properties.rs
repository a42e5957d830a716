use std::sync::Arc;

use proptest::prelude::*;
use sedna::decl::mangle_name;
use sedna::{
    Engine, FieldDecl, GenericItem, ImplRecord, InterfaceDecl, MethodBody, MethodSig, Scope,
    Session, TypeDecl, TypeExpr, UnitId, Value,
};

const APP: UnitId = UnitId(1);

fn shapes_engine() -> Engine {
    let mut session = Session::new();
    session
        .register_type(TypeDecl::product(
            "Circle",
            vec![FieldDecl::new("radius", TypeExpr::named("float"))],
            APP,
        ))
        .unwrap();
    session
        .register_type(TypeDecl::product("Square", vec![], APP))
        .unwrap();
    session
        .register_interface(InterfaceDecl::new(
            "Area",
            vec![MethodSig::new("area", vec![TypeExpr::SelfTy], TypeExpr::named("float"))],
            APP,
        ))
        .unwrap();
    session
        .register_impl(
            ImplRecord::of("Area", TypeExpr::named("Circle"), APP)
                .with_method("area", MethodBody::native(|_| Value::Float(0.0))),
        )
        .unwrap();
    session
        .register_generic_item(
            GenericItem::new("identity", vec!["T".into()], APP)
                .with_signature(vec![TypeExpr::param("T")], TypeExpr::param("T")),
        )
        .unwrap();
    session.finish().unwrap()
}

fn type_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9]{0,7}"
}

proptest! {
    #[test]
    fn mangling_is_deterministic(
        base in type_name(),
        args in prop::collection::vec(type_name(), 1..4),
    ) {
        let args: Vec<TypeExpr> = args.into_iter().map(TypeExpr::named).collect();
        prop_assert_eq!(mangle_name(&base, &args), mangle_name(&base, &args));
    }

    #[test]
    fn mangling_separates_single_arguments(base in type_name(), a in type_name(), b in type_name()) {
        prop_assume!(a != b);
        prop_assert_ne!(
            mangle_name(&base, &[TypeExpr::named(a)]),
            mangle_name(&base, &[TypeExpr::named(b)])
        );
    }

    #[test]
    fn satisfaction_is_referentially_transparent(
        subject in prop::sample::select(vec!["int", "float", "Circle", "Square"]),
        repeats in 1..10usize,
    ) {
        let engine = shapes_engine();
        let solver = engine.solver();
        let scope = Scope::new();
        let ty = TypeExpr::named(subject);

        let first = solver.satisfies(&ty, "Area", &[], &scope);
        for _ in 0..repeats {
            prop_assert_eq!(solver.satisfies(&ty, "Area", &[], &scope), first);
        }
        // Circle is the only implementor in this fixture.
        prop_assert_eq!(first, subject == "Circle");
    }

    #[test]
    fn specialization_is_idempotent(
        arg in prop::sample::select(vec!["int", "float", "bool", "string"]),
        repeats in 2..8usize,
    ) {
        let engine = shapes_engine();
        let ty = TypeExpr::named(arg);

        let first = engine.specialize("identity", &[ty.clone()]).unwrap();
        for _ in 0..repeats {
            let again = engine.specialize("identity", &[ty.clone()]).unwrap();
            prop_assert!(Arc::ptr_eq(&first, &again));
        }
        prop_assert_eq!(&first.mangled_name, &format!("identity__{arg}"));
    }
}
