//! Coherence checking: the local-definition (orphan) rule, pairwise overlap
//! detection between implementations, and the supertype-cycle pass over the
//! contract graph. All checks run eagerly so conflicts surface at
//! registration time, never at a use site.

use std::collections::HashMap;

use crate::decl::{ImplRecord, TypeExpr};
use crate::diagnostics::ResolveError;
use crate::table::DeclTable;

/// Gate one ImplRecord before it is inserted into the table.
pub(crate) fn check_impl(table: &DeclTable, rec: &ImplRecord) -> Result<(), ResolveError> {
    let target_name = rec
        .target
        .head_name()
        .ok_or_else(|| ResolveError::unknown(rec.target.to_string(), rec.span))?;
    let target = table.lookup_type(target_name)?;

    match &rec.interface {
        Some(iface_name) => {
            let iface = table.lookup_interface(iface_name)?;
            // Every required signature needs a body or a default.
            for sig in &iface.methods {
                if !rec.methods.contains_key(&sig.name) && !iface.defaults.contains_key(&sig.name) {
                    return Err(ResolveError::IncompleteImplementation {
                        interface: iface_name.clone(),
                        target: target_name.to_string(),
                        missing: sig.name.clone(),
                        span: rec.span,
                    });
                }
            }
            // Local-definition rule: the interface or the target type must be
            // declared in the registering unit.
            if iface.unit != rec.unit && target.unit != rec.unit {
                return Err(ResolveError::ForeignImplementation {
                    interface: iface_name.clone(),
                    target: target_name.to_string(),
                    span: rec.span,
                });
            }
        }
        None => {
            // Inherent impls have no interface to anchor on: the type itself
            // must be local.
            if target.unit != rec.unit {
                return Err(ResolveError::ForeignImplementation {
                    interface: "(inherent)".to_string(),
                    target: target_name.to_string(),
                    span: rec.span,
                });
            }
        }
    }

    // Overlap: no two accepted records for the same (interface-or-none,
    // target head) may cover a common concrete type.
    for prior in table.impls_for(target_name) {
        if prior.interface == rec.interface && impls_overlap(prior, rec) {
            return Err(ResolveError::ConflictingImplementation {
                interface: rec.interface.clone(),
                target: target_name.to_string(),
                first_span: prior.span,
                second_span: rec.span,
            });
        }
    }

    Ok(())
}

/// Two records overlap when their targets and interface arguments unify
/// after renaming their generic parameters apart.
fn impls_overlap(a: &ImplRecord, b: &ImplRecord) -> bool {
    let a_target = tag_params(&a.target, "a");
    let b_target = tag_params(&b.target, "b");
    let mut bindings = HashMap::new();
    if !unify(&a_target, &b_target, &mut bindings) {
        return false;
    }
    if a.interface_args.len() != b.interface_args.len() {
        return false;
    }
    a.interface_args
        .iter()
        .zip(&b.interface_args)
        .all(|(x, y)| unify(&tag_params(x, "a"), &tag_params(y, "b"), &mut bindings))
}

/// Prefix every generic parameter so two records' parameters cannot capture
/// each other during unification.
pub(crate) fn tag_params(te: &TypeExpr, tag: &str) -> TypeExpr {
    match te {
        TypeExpr::Param(name) => TypeExpr::Param(format!("{tag}#{name}")),
        TypeExpr::Applied { name, args } => TypeExpr::Applied {
            name: name.clone(),
            args: args.iter().map(|a| tag_params(a, tag)).collect(),
        },
        TypeExpr::Named(_) | TypeExpr::SelfTy => te.clone(),
    }
}

/// Structural unification with parameter bindings accumulated in `bindings`.
/// Also used by the solver to match an implementation against a concrete
/// query type.
pub(crate) fn unify(
    a: &TypeExpr,
    b: &TypeExpr,
    bindings: &mut HashMap<String, TypeExpr>,
) -> bool {
    let a = follow(a, bindings);
    let b = follow(b, bindings);
    match (&a, &b) {
        (TypeExpr::Param(x), TypeExpr::Param(y)) if x == y => true,
        (TypeExpr::Param(x), other) | (other, TypeExpr::Param(x)) => {
            if occurs(x, other, bindings) {
                return false;
            }
            bindings.insert(x.clone(), (*other).clone());
            true
        }
        (TypeExpr::Named(x), TypeExpr::Named(y)) => x == y,
        (TypeExpr::SelfTy, TypeExpr::SelfTy) => true,
        (TypeExpr::Applied { name: n1, args: a1 }, TypeExpr::Applied { name: n2, args: a2 }) => {
            n1 == n2
                && a1.len() == a2.len()
                && a1.iter().zip(a2.iter()).all(|(x, y)| unify(x, y, bindings))
        }
        _ => false,
    }
}

fn follow(te: &TypeExpr, bindings: &HashMap<String, TypeExpr>) -> TypeExpr {
    if let TypeExpr::Param(name) = te {
        if let Some(bound) = bindings.get(name) {
            return follow(&bound.clone(), bindings);
        }
    }
    te.clone()
}

fn occurs(var: &str, te: &TypeExpr, bindings: &HashMap<String, TypeExpr>) -> bool {
    match follow(te, bindings) {
        TypeExpr::Param(name) => name == var,
        TypeExpr::Applied { args, .. } => args.iter().any(|a| occurs(var, a, bindings)),
        _ => false,
    }
}

/// Validate the contract supertype graph: every named supertype exists and
/// the graph is acyclic. Runs once over the closed declaration set.
pub(crate) fn check_contract_graph(table: &DeclTable) -> Result<(), ResolveError> {
    let mut names: Vec<&str> = table.interfaces().map(|i| i.name.as_str()).collect();
    names.sort_unstable();

    for iface in table.interfaces() {
        for sup in &iface.supertypes {
            if !table.has_interface(sup) {
                return Err(ResolveError::unknown(sup, iface.span));
            }
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut colors: HashMap<&str, Color> = names.iter().map(|&n| (n, Color::White)).collect();

    fn visit<'a>(
        name: &'a str,
        table: &'a DeclTable,
        colors: &mut HashMap<&'a str, Color>,
        path: &mut Vec<String>,
    ) -> Result<(), ResolveError> {
        colors.insert(name, Color::Gray);
        path.push(name.to_string());
        let iface = table.lookup_interface(name)?;
        for sup in &iface.supertypes {
            match colors.get(sup.as_str()).copied().unwrap_or(Color::White) {
                Color::Gray => {
                    let start = path.iter().position(|n| n == sup).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..].to_vec();
                    cycle.push(sup.clone());
                    return Err(ResolveError::CyclicContractRequirement { cycle });
                }
                Color::White => {
                    let sup_name = table.lookup_interface(sup)?.name.as_str();
                    visit(sup_name, table, colors, path)?;
                }
                Color::Black => {}
            }
        }
        path.pop();
        colors.insert(name, Color::Black);
        Ok(())
    }

    let mut path = Vec::new();
    for name in names {
        if colors[name] == Color::White {
            visit(name, table, &mut colors, &mut path)?;
        }
    }
    Ok(())
}
