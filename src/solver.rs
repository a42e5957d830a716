//! The Bound Solver: decides whether a type expression satisfies a
//! capability constraint, given the accepted implementations in the table.
//! Pure queries over an immutable declaration snapshot; safe to run from
//! many call sites in parallel.

use std::collections::HashMap;

use crate::coherence::unify;
use crate::decl::{Constraint, ConstraintSet, ImplRecord, TypeExpr};
use crate::diagnostics::ResolveError;
use crate::table::DeclTable;

/// Bindings from generic parameter names to their currently-assumed concrete
/// types, threaded through every solver query.
pub type Scope = HashMap<String, TypeExpr>;

pub struct BoundSolver<'a> {
    table: &'a DeclTable,
}

impl<'a> BoundSolver<'a> {
    pub fn new(table: &'a DeclTable) -> Self {
        Self { table }
    }

    /// True when `subject` (after scope substitution) has an accepted
    /// implementation of `interface` whose arguments match `iface_args`.
    /// An empty `iface_args` matches any parameterization.
    pub fn satisfies(
        &self,
        subject: &TypeExpr,
        interface: &str,
        iface_args: &[TypeExpr],
        scope: &Scope,
    ) -> bool {
        let concrete = subject.substitute(scope);
        let resolved_args: Vec<TypeExpr> =
            iface_args.iter().map(|a| a.substitute(scope)).collect();
        self.satisfies_concrete(&concrete, interface, &resolved_args)
    }

    fn satisfies_concrete(
        &self,
        concrete: &TypeExpr,
        interface: &str,
        iface_args: &[TypeExpr],
    ) -> bool {
        let Ok(iface) = self.table.lookup_interface(interface) else {
            return false;
        };
        if self.matching_impl(concrete, interface, iface_args).is_none() {
            return false;
        }
        // Transitive supertype obligations. The contract graph is acyclic
        // once the coherence pass has run, so this recursion terminates.
        iface
            .supertypes
            .iter()
            .all(|sup| self.satisfies_concrete(concrete, sup, &[]))
    }

    /// Find the first accepted implementation of `interface` covering
    /// `concrete`, together with the parameter bindings the match produced.
    pub(crate) fn matching_impl(
        &self,
        concrete: &TypeExpr,
        interface: &str,
        iface_args: &[TypeExpr],
    ) -> Option<(&'a ImplRecord, HashMap<String, TypeExpr>)> {
        let head = concrete.head_name()?;
        for rec in self.table.impls_for(head) {
            if rec.interface.as_deref() != Some(interface) {
                continue;
            }
            let mut bindings = HashMap::new();
            if !unify(&rec.target, concrete, &mut bindings) {
                continue;
            }
            if !iface_args.is_empty() {
                if rec.interface_args.len() != iface_args.len() {
                    continue;
                }
                let args_match = rec
                    .interface_args
                    .iter()
                    .zip(iface_args.iter())
                    .all(|(have, want)| unify(have, want, &mut bindings));
                if !args_match {
                    continue;
                }
            }
            // The implementation's own where-clauses must hold under the
            // bindings the match produced.
            if self.check_set(&rec.constraints, &bindings).is_ok() {
                return Some((rec, bindings));
            }
        }
        None
    }

    /// Check one constraint under `scope`.
    pub fn check_constraint(&self, c: &Constraint, scope: &Scope) -> Result<(), ResolveError> {
        if self.satisfies(&c.subject, &c.interface, &c.interface_args, scope) {
            Ok(())
        } else {
            Err(ResolveError::UnsatisfiedBound {
                subject: c.subject.to_string(),
                interface: c.interface.clone(),
                span: c.span,
                also_failed: vec![c.describe()],
            })
        }
    }

    /// Conjunction over a constraint set. The first failing constraint names
    /// the error; every failing constraint is accumulated for the diagnostic.
    pub fn check_set(&self, set: &ConstraintSet, scope: &Scope) -> Result<(), ResolveError> {
        let mut failed: Vec<&Constraint> = Vec::new();
        for c in set.iter() {
            if !self.satisfies(&c.subject, &c.interface, &c.interface_args, scope) {
                failed.push(c);
            }
        }
        match failed.first() {
            None => Ok(()),
            Some(first) => Err(ResolveError::UnsatisfiedBound {
                subject: first.subject.to_string(),
                interface: first.interface.clone(),
                span: first.span,
                also_failed: failed.iter().map(|c| c.describe()).collect(),
            }),
        }
    }
}
