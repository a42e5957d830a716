//! The Specializer: one statically-dispatched specialized unit per distinct
//! (generic item, concrete type argument tuple). The cache is the only
//! mutable shared state of the query phase; concurrent requests for the same
//! key serialize on a per-key slot so the unit is computed at most once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::coherence::{tag_params, unify};
use crate::decl::{mangle_name, TypeExpr};
use crate::diagnostics::ResolveError;
use crate::solver::{BoundSolver, Scope};
use crate::table::DeclTable;

/// Cache key: (generic item identity, ordered concrete type arguments).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecKey {
    pub item: String,
    pub args: Vec<TypeExpr>,
}

/// A specialized instantiation, ready for direct emission as a non-virtual,
/// statically addressed routine.
#[derive(Debug)]
pub struct SpecializedUnit {
    pub id: Uuid,
    pub item: String,
    pub mangled_name: String,
    pub type_args: Vec<TypeExpr>,
    /// Signature with every generic-parameter occurrence substituted.
    pub params: Vec<TypeExpr>,
    pub return_type: TypeExpr,
}

pub type UnitHandle = Arc<SpecializedUnit>;

#[derive(Debug, Default)]
pub struct Specializer {
    cache: Mutex<HashMap<SpecKey, Arc<Mutex<Option<UnitHandle>>>>>,
}

impl Specializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce (or reuse) the specialized unit for `item_name` at the given
    /// concrete type arguments. Repeat calls with an equal tuple return the
    /// identical cached handle.
    pub fn specialize(
        &self,
        table: &DeclTable,
        item_name: &str,
        args: &[TypeExpr],
    ) -> Result<UnitHandle, ResolveError> {
        let item = table.lookup_generic_item(item_name)?;
        if args.len() != item.type_params.len() {
            return Err(ResolveError::SpecializationArity {
                item: item_name.to_string(),
                expected: item.type_params.len(),
                got: args.len(),
            });
        }

        let key = SpecKey { item: item_name.to_string(), args: args.to_vec() };
        let slot = {
            let mut cache = self.cache.lock().unwrap();
            cache.entry(key).or_insert_with(|| Arc::new(Mutex::new(None))).clone()
        };
        // Per-key exclusive section: later requesters block here and then
        // observe the stored handle.
        let mut guard = slot.lock().unwrap();
        if let Some(handle) = guard.as_ref() {
            return Ok(handle.clone());
        }

        let scope: Scope = item
            .type_params
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();
        BoundSolver::new(table).check_set(&item.constraints, &scope)?;

        let unit = Arc::new(SpecializedUnit {
            id: Uuid::new_v4(),
            item: item_name.to_string(),
            mangled_name: mangle_name(item_name, args),
            type_args: args.to_vec(),
            params: item.params.iter().map(|p| p.substitute(&scope)).collect(),
            return_type: item.return_type.substitute(&scope),
        });
        *guard = Some(unit.clone());
        Ok(unit)
    }

    /// Inverse binding: a zero-argument generic item whose single parameter
    /// only appears in a constraint on a fixed concrete subject (for example
    /// `fn read<R>() -> R where int: Convert<R>`). The parameter is bound by
    /// enumerating the subject's implementations; `expected` narrows the
    /// candidates to a requested result type.
    pub fn specialize_inverse(
        &self,
        table: &DeclTable,
        item_name: &str,
        expected: Option<&TypeExpr>,
    ) -> Result<UnitHandle, ResolveError> {
        let item = table.lookup_generic_item(item_name)?;
        if item.type_params.len() != 1 {
            return Err(ResolveError::UnresolvableInverseBinding {
                item: item_name.to_string(),
                candidates: vec![],
            });
        }
        let param = item.type_params[0].as_str();

        let constraint = item.constraints.iter().find(|c| {
            c.subject.is_concrete() && c.interface_args.iter().any(|a| mentions_param(a, param))
        });
        let Some(c) = constraint else {
            return Err(ResolveError::UnresolvableInverseBinding {
                item: item_name.to_string(),
                candidates: vec![],
            });
        };
        let Some(head) = c.subject.head_name() else {
            return Err(ResolveError::UnresolvableInverseBinding {
                item: item_name.to_string(),
                candidates: vec![],
            });
        };

        let mut candidates: Vec<TypeExpr> = Vec::new();
        for rec in table.impls_for(head) {
            if rec.interface.as_deref() != Some(c.interface.as_str()) {
                continue;
            }
            if rec.interface_args.len() != c.interface_args.len() {
                continue;
            }
            let mut bindings = HashMap::new();
            if !unify(&tag_params(&rec.target, "i"), &c.subject, &mut bindings) {
                continue;
            }
            let args_match = c
                .interface_args
                .iter()
                .zip(rec.interface_args.iter())
                .all(|(want, have)| unify(want, &tag_params(have, "i"), &mut bindings));
            if !args_match {
                continue;
            }
            if let Some(bound) = bindings.get(param) {
                if bound.is_concrete() && !candidates.contains(bound) {
                    candidates.push(bound.clone());
                }
            }
        }

        if let Some(exp) = expected {
            candidates.retain(|t| t == exp);
        }

        match candidates.as_slice() {
            [] => Err(ResolveError::UnsatisfiedBound {
                subject: param.to_string(),
                interface: c.interface.clone(),
                span: c.span,
                also_failed: vec![c.describe()],
            }),
            [single] => {
                let arg = single.clone();
                self.specialize(table, item_name, &[arg])
            }
            many => Err(ResolveError::UnresolvableInverseBinding {
                item: item_name.to_string(),
                candidates: many.iter().map(|t| t.to_string()).collect(),
            }),
        }
    }

    /// Snapshot of every unit produced so far, ordered by mangled name for
    /// deterministic emission.
    pub fn units(&self) -> Vec<UnitHandle> {
        let cache = self.cache.lock().unwrap();
        let mut units: Vec<UnitHandle> = cache
            .values()
            .filter_map(|slot| slot.lock().unwrap().clone())
            .collect();
        units.sort_by(|a, b| a.mangled_name.cmp(&b.mangled_name));
        units
    }
}

fn mentions_param(te: &TypeExpr, param: &str) -> bool {
    match te {
        TypeExpr::Param(name) => name == param,
        TypeExpr::Applied { args, .. } => args.iter().any(|a| mentions_param(a, param)),
        TypeExpr::Named(_) | TypeExpr::SelfTy => false,
    }
}
