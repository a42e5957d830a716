//! Built-in declarations injected into every session before user
//! registration: the primitive types and the fixed set of derivable
//! contracts, all owned by the reserved builtin unit.

use crate::decl::{DeriveKind, InterfaceDecl, MethodSig, TypeDecl, TypeExpr, UnitId};
use crate::diagnostics::ResolveError;
use crate::table::DeclTable;

pub(crate) const PRIMITIVES: [&str; 5] = ["int", "float", "bool", "string", "void"];

pub(crate) fn install(table: &mut DeclTable) -> Result<(), ResolveError> {
    for prim in PRIMITIVES {
        table.register_type(TypeDecl::primitive(prim))?;
    }
    for kind in DeriveKind::ALL {
        table.register_interface(InterfaceDecl::new(
            kind.contract_name(),
            vec![contract_sig(kind)],
            UnitId::BUILTIN,
        ))?;
    }
    Ok(())
}

fn contract_sig(kind: DeriveKind) -> MethodSig {
    let self_ty = TypeExpr::SelfTy;
    match kind {
        DeriveKind::Eq => MethodSig::new(
            "equals",
            vec![self_ty.clone(), self_ty],
            TypeExpr::named("bool"),
        ),
        DeriveKind::Ord => MethodSig::new(
            "compare",
            vec![self_ty.clone(), self_ty],
            TypeExpr::named("int"),
        ),
        DeriveKind::Hash => MethodSig::new("hash", vec![self_ty], TypeExpr::named("int")),
        DeriveKind::Clone => MethodSig::new("duplicate", vec![self_ty.clone()], self_ty),
        DeriveKind::Default => MethodSig::new("default", vec![], TypeExpr::SelfTy),
        DeriveKind::Debug => MethodSig::new("fmt", vec![self_ty], TypeExpr::named("string")),
    }
}
