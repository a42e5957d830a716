//! sedna is a bound resolution and specialization engine. A front-end
//! registers types, capability contracts (interfaces), implementation
//! records, and generic items into a [`Session`]; every implementation is
//! coherence-checked on the way in. Closing the session yields an
//! [`Engine`], an immutable snapshot answering bound-satisfaction queries,
//! resolving methods at call sites, and producing specialized units through
//! a shared idempotent cache.
//!
//! The two-phase split is deliberate: registration is exclusive and ordered,
//! queries are pure and safe to run from many call sites concurrently.

pub mod coherence;
pub mod decl;
pub mod derive;
pub mod diagnostics;
mod prelude;
pub mod report;
pub mod solver;
pub mod span;
pub mod specialize;
pub mod table;

mod methods;

pub use decl::{
    Constraint, ConstraintSet, DeriveKind, FieldDecl, GenericItem, ImplRecord, InterfaceDecl,
    MethodBody, MethodSig, TypeDecl, TypeExpr, TypeKind, UnitId, Value, VariantDecl,
};
pub use diagnostics::{render_error, ResolveError};
pub use methods::{MethodOrigin, MethodResolver, ResolvedMethod};
pub use report::{Diagnostic, ResolutionReport};
pub use solver::{BoundSolver, Scope};
pub use span::{Span, Spanned};
pub use specialize::{SpecKey, SpecializedUnit, Specializer, UnitHandle};
pub use table::DeclTable;

use uuid::Uuid;

/// The registration phase. Declarations accumulate here; implementations are
/// gated through the coherence checker before insertion, so the table never
/// holds a conflicting or foreign record.
pub struct Session {
    table: DeclTable,
}

impl Session {
    /// A fresh session, pre-populated with the builtin primitives and the
    /// derivable contracts.
    pub fn new() -> Self {
        let mut table = DeclTable::new();
        prelude::install(&mut table).expect("builtin prelude is internally consistent");
        Self { table }
    }

    pub fn register_type(&mut self, decl: TypeDecl) -> Result<(), ResolveError> {
        self.table.register_type(decl)
    }

    pub fn register_interface(&mut self, decl: InterfaceDecl) -> Result<(), ResolveError> {
        self.table.register_interface(decl)
    }

    pub fn register_generic_item(&mut self, item: GenericItem) -> Result<(), ResolveError> {
        self.table.register_generic_item(item)
    }

    /// Coherence-gate and store one implementation record. Returns the
    /// record's identity on acceptance.
    pub fn register_impl(&mut self, rec: ImplRecord) -> Result<Uuid, ResolveError> {
        coherence::check_impl(&self.table, &rec)?;
        let id = rec.id;
        self.table.insert_impl(rec);
        Ok(id)
    }

    /// Synthesize the structural implementation of a derivable contract and
    /// register it like any hand-written one.
    pub fn derive(&mut self, kind: DeriveKind, type_name: &str) -> Result<Uuid, ResolveError> {
        let rec = derive::synthesize(&self.table, kind, type_name)?;
        self.register_impl(rec)
    }

    /// Close registration. The contract supertype graph is validated here,
    /// once, over the full declaration set.
    pub fn finish(self) -> Result<Engine, ResolveError> {
        coherence::check_contract_graph(&self.table)?;
        Ok(Engine { table: self.table, specializer: Specializer::new() })
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// One method invocation to resolve during batch checking.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub id: Uuid,
    pub receiver: TypeExpr,
    pub method: String,
    /// Interfaces explicitly brought into scope at this site.
    pub visible: Vec<String>,
    pub span: Span,
}

impl CallSite {
    pub fn new(receiver: TypeExpr, method: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            receiver,
            method: method.into(),
            visible: vec![],
            span: Span::dummy(),
        }
    }

    pub fn with_visible(mut self, visible: Vec<String>) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// Per-site outcome of a batch check.
#[derive(Debug)]
pub struct SiteResolution {
    pub site: Uuid,
    pub outcome: Result<ResolvedMethod, ResolveError>,
}

/// The query phase: an immutable declaration snapshot plus the
/// specialization cache. All query entry points take `&self`.
#[derive(Debug)]
pub struct Engine {
    table: DeclTable,
    specializer: Specializer,
}

impl Engine {
    pub fn table(&self) -> &DeclTable {
        &self.table
    }

    pub fn solver(&self) -> BoundSolver<'_> {
        BoundSolver::new(&self.table)
    }

    pub fn resolver(&self) -> MethodResolver<'_> {
        MethodResolver::new(&self.table)
    }

    /// Specialize `item_name` at concrete `args`; repeat calls with equal
    /// arguments return the identical cached handle.
    pub fn specialize(&self, item_name: &str, args: &[TypeExpr]) -> Result<UnitHandle, ResolveError> {
        self.specializer.specialize(&self.table, item_name, args)
    }

    /// Bind a return-position type parameter from the implementations of a
    /// fixed-subject constraint, then specialize.
    pub fn specialize_for_return(
        &self,
        item_name: &str,
        expected: Option<&TypeExpr>,
    ) -> Result<UnitHandle, ResolveError> {
        self.specializer.specialize_inverse(&self.table, item_name, expected)
    }

    /// Resolve every call site, collecting per-site outcomes instead of
    /// stopping at the first failure.
    pub fn check_call_sites(&self, sites: &[CallSite]) -> Vec<SiteResolution> {
        let resolver = self.resolver();
        sites
            .iter()
            .map(|site| {
                let visible: Vec<&str> = site.visible.iter().map(String::as_str).collect();
                SiteResolution {
                    site: site.id,
                    outcome: resolver.resolve(&site.receiver, &site.method, &visible),
                }
            })
            .collect()
    }

    /// Summarize the run: all accepted declarations, all specialized units,
    /// and a diagnostic per failing call site.
    pub fn report(&self, sites: &[CallSite]) -> ResolutionReport {
        let diagnostics = self
            .check_call_sites(sites)
            .into_iter()
            .zip(sites)
            .filter_map(|(res, site)| {
                res.outcome.err().map(|err| Diagnostic {
                    message: err.to_string(),
                    span: Some(site.span),
                    site: Some(site.id),
                })
            })
            .collect();
        ResolutionReport::build(&self.table, &self.specializer.units(), diagnostics)
    }
}
