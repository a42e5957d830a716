//! Method resolution: map (receiver type, method name, visible interfaces)
//! to one concrete method body. Inherent implementations win unconditionally;
//! interface methods are only reachable through interfaces explicitly made
//! visible at the call site.

use uuid::Uuid;

use crate::decl::{ImplRecord, MethodBody, TypeExpr, Value};
use crate::diagnostics::ResolveError;
use crate::solver::BoundSolver;
use crate::table::DeclTable;

/// Where a resolved body came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodOrigin {
    Inherent,
    Override { interface: String },
    Default { interface: String },
}

#[derive(Debug, Clone)]
pub struct ResolvedMethod {
    pub body: MethodBody,
    pub origin: MethodOrigin,
    /// The ImplRecord the resolution went through.
    pub source_impl: Uuid,
}

impl ResolvedMethod {
    pub fn invoke(&self, args: &[Value]) -> Value {
        self.body.invoke(args)
    }
}

pub struct MethodResolver<'a> {
    table: &'a DeclTable,
}

impl<'a> MethodResolver<'a> {
    pub fn new(table: &'a DeclTable) -> Self {
        Self { table }
    }

    /// Resolve `method` on a value of static type `receiver`, with the given
    /// interfaces visible at the call site. Referentially transparent for a
    /// fixed table and visibility set.
    pub fn resolve(
        &self,
        receiver: &TypeExpr,
        method: &str,
        visible: &[&str],
    ) -> Result<ResolvedMethod, ResolveError> {
        let head = receiver
            .head_name()
            .ok_or_else(|| ResolveError::no_such_method(receiver.to_string(), method))?;
        self.table.lookup_type(head)?;
        let solver = BoundSolver::new(self.table);

        // (1) Inherent implementations win unconditionally. More than one
        // hit means the coherence checker failed its non-overlap guarantee.
        let inherent: Vec<&ImplRecord> = self
            .table
            .impls_for(head)
            .filter(|rec| rec.interface.is_none() && rec.methods.contains_key(method))
            .filter(|rec| covers(rec, receiver))
            .collect();
        if inherent.len() > 1 {
            return Err(ResolveError::AmbiguousInherentMethod {
                receiver: receiver.to_string(),
                method: method.to_string(),
            });
        }
        if let Some(rec) = inherent.first() {
            let body = rec.methods[method].clone();
            return Ok(ResolvedMethod { body, origin: MethodOrigin::Inherent, source_impl: rec.id });
        }

        // (2) Interfaces explicitly brought into scope, in visibility order.
        for iface_name in visible {
            let iface = self.table.lookup_interface(iface_name)?;
            if !iface.has_method(method) {
                continue;
            }
            if let Some((rec, _)) = solver.matching_impl(receiver, iface_name, &[]) {
                if let Some(body) = rec.methods.get(method) {
                    return Ok(ResolvedMethod {
                        body: body.clone(),
                        origin: MethodOrigin::Override { interface: iface.name.clone() },
                        source_impl: rec.id,
                    });
                }
                if let Some(default) = iface.default_body(method) {
                    return Ok(ResolvedMethod {
                        body: default.clone(),
                        origin: MethodOrigin::Default { interface: iface.name.clone() },
                        source_impl: rec.id,
                    });
                }
            }
        }

        // (3) An implementation exists, but its interface was not brought
        // into scope: capability-bringing is explicit, never ambient.
        for rec in self.table.impls_for(head) {
            let Some(iface_name) = rec.interface.as_deref() else {
                continue;
            };
            if visible.contains(&iface_name) || !covers(rec, receiver) {
                continue;
            }
            let iface = self.table.lookup_interface(iface_name)?;
            if iface.has_method(method)
                && (rec.methods.contains_key(method) || iface.defaults.contains_key(method))
            {
                return Err(ResolveError::MethodNotInScope {
                    receiver: receiver.to_string(),
                    method: method.to_string(),
                    interface: iface_name.to_string(),
                });
            }
        }

        // (4) Zero candidates anywhere.
        Err(ResolveError::no_such_method(receiver.to_string(), method))
    }
}

/// Whether an implementation's (possibly generic) target covers the concrete
/// receiver type.
fn covers(rec: &ImplRecord, receiver: &TypeExpr) -> bool {
    let mut bindings = std::collections::HashMap::new();
    crate::coherence::unify(&rec.target, receiver, &mut bindings)
}
