mod common;

use common::APP;
use sedna::{
    CallSite, ImplRecord, InterfaceDecl, MethodBody, MethodOrigin, MethodSig, ResolveError,
    TypeExpr, Value,
};

#[test]
fn resolved_interface_method_is_invocable() {
    let engine = common::shapes().finish().unwrap();
    let resolved = engine
        .resolver()
        .resolve(&TypeExpr::named("Circle"), "area", &["Area"])
        .unwrap();
    assert_eq!(resolved.origin, MethodOrigin::Override { interface: "Area".into() });

    let out = resolved.invoke(&[common::circle(2.0)]);
    match out {
        Value::Float(area) => assert!((area - 4.0 * std::f64::consts::PI).abs() < 1e-9),
        other => panic!("expected a float area, got {other:?}"),
    }
}

#[test]
fn interface_must_be_visible() {
    let engine = common::shapes().finish().unwrap();
    let err = engine
        .resolver()
        .resolve(&TypeExpr::named("Circle"), "area", &[])
        .unwrap_err();
    match err {
        ResolveError::MethodNotInScope { interface, method, .. } => {
            assert_eq!(interface, "Area");
            assert_eq!(method, "area");
        }
        other => panic!("expected MethodNotInScope, got {other:?}"),
    }
}

#[test]
fn inherent_method_wins_over_interface() {
    let mut session = common::shapes();
    session
        .register_impl(
            ImplRecord::inherent(TypeExpr::named("Circle"), APP)
                .with_method("area", MethodBody::native(|_| Value::Float(-1.0))),
        )
        .unwrap();
    let engine = session.finish().unwrap();

    let resolved = engine
        .resolver()
        .resolve(&TypeExpr::named("Circle"), "area", &["Area"])
        .unwrap();
    assert_eq!(resolved.origin, MethodOrigin::Inherent);
    assert_eq!(resolved.invoke(&[common::circle(2.0)]), Value::Float(-1.0));
}

#[test]
fn inherent_method_needs_no_visibility() {
    let mut session = common::shapes();
    session
        .register_impl(
            ImplRecord::inherent(TypeExpr::named("Square"), APP)
                .with_method("side", MethodBody::native(|args| {
                    args[0].field("side").cloned().unwrap_or(Value::Float(0.0))
                })),
        )
        .unwrap();
    let engine = session.finish().unwrap();

    let resolved = engine
        .resolver()
        .resolve(&TypeExpr::named("Square"), "side", &[])
        .unwrap();
    assert_eq!(resolved.origin, MethodOrigin::Inherent);
}

#[test]
fn default_body_is_used_when_not_overridden() {
    let mut session = common::shapes();
    session
        .register_interface(
            InterfaceDecl::new(
                "Describe",
                vec![MethodSig::new(
                    "describe",
                    vec![TypeExpr::SelfTy],
                    TypeExpr::named("string"),
                )],
                APP,
            )
            .with_default("describe", MethodBody::native(|_| Value::Str("a shape".into()))),
        )
        .unwrap();
    session
        .register_impl(ImplRecord::of("Describe", TypeExpr::named("Circle"), APP))
        .unwrap();
    session
        .register_impl(
            ImplRecord::of("Describe", TypeExpr::named("Square"), APP)
                .with_method("describe", MethodBody::native(|_| Value::Str("a square".into()))),
        )
        .unwrap();
    let engine = session.finish().unwrap();
    let resolver = engine.resolver();

    let on_circle = resolver
        .resolve(&TypeExpr::named("Circle"), "describe", &["Describe"])
        .unwrap();
    assert_eq!(on_circle.origin, MethodOrigin::Default { interface: "Describe".into() });
    assert_eq!(on_circle.invoke(&[common::circle(1.0)]), Value::Str("a shape".into()));

    let on_square = resolver
        .resolve(&TypeExpr::named("Square"), "describe", &["Describe"])
        .unwrap();
    assert_eq!(on_square.origin, MethodOrigin::Override { interface: "Describe".into() });
    assert_eq!(
        on_square.invoke(&[Value::Record { type_name: "Square".into(), fields: vec![] }]),
        Value::Str("a square".into())
    );
}

#[test]
fn unknown_method_is_reported() {
    let engine = common::shapes().finish().unwrap();
    let err = engine
        .resolver()
        .resolve(&TypeExpr::named("Circle"), "volume", &["Area"])
        .unwrap_err();
    assert!(matches!(err, ResolveError::NoSuchMethod { ref method, .. } if method == "volume"));
}

#[test]
fn resolution_is_stable_for_fixed_inputs() {
    let engine = common::shapes().finish().unwrap();
    let resolver = engine.resolver();
    let first = resolver
        .resolve(&TypeExpr::named("Circle"), "area", &["Area"])
        .unwrap();
    for _ in 0..5 {
        let again = resolver
            .resolve(&TypeExpr::named("Circle"), "area", &["Area"])
            .unwrap();
        assert_eq!(again.origin, first.origin);
        assert_eq!(again.source_impl, first.source_impl);
    }
}

#[test]
fn batch_checking_collects_every_outcome() {
    let engine = common::shapes().finish().unwrap();
    let sites = vec![
        CallSite::new(TypeExpr::named("Circle"), "area").with_visible(vec!["Area".into()]),
        CallSite::new(TypeExpr::named("Square"), "area").with_visible(vec!["Area".into()]),
        CallSite::new(TypeExpr::named("Circle"), "area"),
    ];

    let outcomes = engine.check_call_sites(&sites);
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].site, sites[0].id);
    assert!(outcomes[0].outcome.is_ok());
    // Square has no Area impl at all.
    assert!(matches!(outcomes[1].outcome, Err(ResolveError::NoSuchMethod { .. })));
    // Circle has one, but it is not visible at this site.
    assert!(matches!(outcomes[2].outcome, Err(ResolveError::MethodNotInScope { .. })));
}
