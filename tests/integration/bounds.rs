mod common;

use common::APP;
use sedna::{
    Constraint, ConstraintSet, ImplRecord, InterfaceDecl, MethodBody, MethodSig, ResolveError,
    Scope, Session, TypeDecl, TypeExpr, Value,
};

#[test]
fn satisfies_follows_registered_impls() {
    let engine = common::shapes().finish().unwrap();
    let solver = engine.solver();
    let scope = Scope::new();

    assert!(solver.satisfies(&TypeExpr::named("Circle"), "Area", &[], &scope));
    assert!(!solver.satisfies(&TypeExpr::named("Square"), "Area", &[], &scope));
    assert!(!solver.satisfies(&TypeExpr::named("Circle"), "Ghost", &[], &scope));
}

#[test]
fn satisfies_is_deterministic() {
    let engine = common::shapes().finish().unwrap();
    let solver = engine.solver();
    let scope = Scope::new();

    let first = solver.satisfies(&TypeExpr::named("Circle"), "Area", &[], &scope);
    for _ in 0..10 {
        assert_eq!(solver.satisfies(&TypeExpr::named("Circle"), "Area", &[], &scope), first);
    }
}

#[test]
fn scope_substitutes_generic_subjects() {
    let engine = common::shapes().finish().unwrap();
    let solver = engine.solver();

    let mut scope = Scope::new();
    scope.insert("T".into(), TypeExpr::named("Circle"));
    assert!(solver.satisfies(&TypeExpr::param("T"), "Area", &[], &scope));

    scope.insert("T".into(), TypeExpr::named("Square"));
    assert!(!solver.satisfies(&TypeExpr::param("T"), "Area", &[], &scope));
}

#[test]
fn concrete_subject_ignores_scope() {
    let engine = common::shapes().finish().unwrap();
    let solver = engine.solver();
    let mut scope = Scope::new();
    scope.insert("T".into(), TypeExpr::named("Square"));

    // A fixed-subject constraint holds or fails independent of bindings.
    assert!(solver.satisfies(&TypeExpr::named("Circle"), "Area", &[], &scope));
}

#[test]
fn every_failing_constraint_is_reported() {
    let mut session = common::shapes();
    session
        .register_interface(InterfaceDecl::new(
            "Perimeter",
            vec![MethodSig::new("perimeter", vec![TypeExpr::SelfTy], TypeExpr::named("float"))],
            APP,
        ))
        .unwrap();
    let engine = session.finish().unwrap();

    let mut scope = Scope::new();
    scope.insert("T".into(), TypeExpr::named("Square"));
    let set = ConstraintSet::new()
        .with(Constraint::new(TypeExpr::param("T"), "Area"))
        .with(Constraint::new(TypeExpr::param("T"), "Perimeter"));

    let err = engine.solver().check_set(&set, &scope).unwrap_err();
    match err {
        ResolveError::UnsatisfiedBound { subject, interface, also_failed, .. } => {
            assert_eq!(subject, "T");
            assert_eq!(interface, "Area");
            assert_eq!(also_failed, vec!["T: Area".to_string(), "T: Perimeter".to_string()]);
        }
        other => panic!("expected UnsatisfiedBound, got {other:?}"),
    }
}

#[test]
fn partial_failure_still_fails() {
    let engine = common::shapes().finish().unwrap();
    let mut scope = Scope::new();
    scope.insert("T".into(), TypeExpr::named("Circle"));
    scope.insert("U".into(), TypeExpr::named("Square"));

    let set = ConstraintSet::new()
        .with(Constraint::new(TypeExpr::param("T"), "Area"))
        .with(Constraint::new(TypeExpr::param("U"), "Area"));
    let err = engine.solver().check_set(&set, &scope).unwrap_err();
    match err {
        ResolveError::UnsatisfiedBound { subject, also_failed, .. } => {
            assert_eq!(subject, "U");
            assert_eq!(also_failed.len(), 1);
        }
        other => panic!("expected UnsatisfiedBound, got {other:?}"),
    }
}

#[test]
fn supertype_obligations_are_transitive() {
    let mut session = common::shapes();
    session
        .register_interface(
            InterfaceDecl::new(
                "Shape",
                vec![MethodSig::new("name", vec![TypeExpr::SelfTy], TypeExpr::named("string"))],
                APP,
            )
            .with_supertypes(vec!["Area".into()]),
        )
        .unwrap();
    session
        .register_impl(
            ImplRecord::of("Shape", TypeExpr::named("Circle"), APP)
                .with_method("name", MethodBody::native(|_| Value::Str("circle".into()))),
        )
        .unwrap();
    session
        .register_impl(
            ImplRecord::of("Shape", TypeExpr::named("Square"), APP)
                .with_method("name", MethodBody::native(|_| Value::Str("square".into()))),
        )
        .unwrap();
    let engine = session.finish().unwrap();
    let solver = engine.solver();
    let scope = Scope::new();

    // Circle implements both Shape and its supertype Area.
    assert!(solver.satisfies(&TypeExpr::named("Circle"), "Shape", &[], &scope));
    // Square implements Shape but not the inherited Area obligation.
    assert!(!solver.satisfies(&TypeExpr::named("Square"), "Shape", &[], &scope));
}

#[test]
fn conditional_impl_checks_its_own_constraints() {
    let mut session = Session::new();
    session
        .register_type(TypeDecl::product("Box", vec![], APP).with_type_params(vec!["T".into()]))
        .unwrap();
    session
        .register_interface(InterfaceDecl::new(
            "Show",
            vec![MethodSig::new("show", vec![TypeExpr::SelfTy], TypeExpr::named("string"))],
            APP,
        ))
        .unwrap();
    session
        .register_impl(
            ImplRecord::of("Show", TypeExpr::named("int"), APP)
                .with_method("show", MethodBody::native(|_| Value::Str("int".into()))),
        )
        .unwrap();
    // Show for Box<T> only where T: Show.
    let boxed = TypeExpr::Applied { name: "Box".into(), args: vec![TypeExpr::param("T")] };
    session
        .register_impl(
            ImplRecord::of("Show", boxed, APP)
                .with_type_params(vec!["T".into()])
                .with_constraints(
                    ConstraintSet::new().with(Constraint::new(TypeExpr::param("T"), "Show")),
                )
                .with_method("show", MethodBody::native(|_| Value::Str("box".into()))),
        )
        .unwrap();
    let engine = session.finish().unwrap();
    let solver = engine.solver();
    let scope = Scope::new();

    let box_of = |inner: TypeExpr| TypeExpr::Applied { name: "Box".into(), args: vec![inner] };
    assert!(solver.satisfies(&box_of(TypeExpr::named("int")), "Show", &[], &scope));
    assert!(!solver.satisfies(&box_of(TypeExpr::named("float")), "Show", &[], &scope));
    // Nesting recurses through the conditional impl.
    assert!(solver.satisfies(&box_of(box_of(TypeExpr::named("int"))), "Show", &[], &scope));
}

#[test]
fn parameterized_interface_args_must_match() {
    let mut session = Session::new();
    session
        .register_interface(
            InterfaceDecl::new(
                "Convert",
                vec![MethodSig::new("convert", vec![TypeExpr::SelfTy], TypeExpr::param("R"))],
                APP,
            )
            .with_type_params(vec!["R".into()]),
        )
        .unwrap();
    session
        .register_impl(
            ImplRecord::of("Convert", TypeExpr::named("int"), APP)
                .with_interface_args(vec![TypeExpr::named("string")])
                .with_method("convert", MethodBody::native(|_| Value::Str("0".into()))),
        )
        .unwrap();
    let engine = session.finish().unwrap();
    let solver = engine.solver();
    let scope = Scope::new();

    let int = TypeExpr::named("int");
    assert!(solver.satisfies(&int, "Convert", &[TypeExpr::named("string")], &scope));
    assert!(!solver.satisfies(&int, "Convert", &[TypeExpr::named("float")], &scope));
    // Empty argument list matches any parameterization.
    assert!(solver.satisfies(&int, "Convert", &[], &scope));
}
