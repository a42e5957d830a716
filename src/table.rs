//! The Declaration Table: append-only storage for all type, interface,
//! implementation, and generic-item declarations of one resolution run.
//! Pure storage and lookup; coherence gating happens in `coherence` before
//! an ImplRecord is inserted.

use std::collections::HashMap;

use crate::decl::{GenericItem, ImplRecord, InterfaceDecl, TypeDecl};
use crate::diagnostics::ResolveError;

#[derive(Debug, Default)]
pub struct DeclTable {
    types: HashMap<String, TypeDecl>,
    interfaces: HashMap<String, InterfaceDecl>,
    generic_items: HashMap<String, GenericItem>,
    /// All accepted ImplRecords, in registration order.
    impls: Vec<ImplRecord>,
    /// Target head type name -> indices into `impls`, registration order.
    impls_by_target: HashMap<String, Vec<usize>>,
}

impl DeclTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_type(&mut self, decl: TypeDecl) -> Result<(), ResolveError> {
        if self.types.contains_key(&decl.name) {
            return Err(ResolveError::duplicate("type", &decl.name, decl.span));
        }
        self.types.insert(decl.name.clone(), decl);
        Ok(())
    }

    pub fn register_interface(&mut self, decl: InterfaceDecl) -> Result<(), ResolveError> {
        if self.interfaces.contains_key(&decl.name) {
            return Err(ResolveError::duplicate("interface", &decl.name, decl.span));
        }
        self.interfaces.insert(decl.name.clone(), decl);
        Ok(())
    }

    pub fn register_generic_item(&mut self, item: GenericItem) -> Result<(), ResolveError> {
        if self.generic_items.contains_key(&item.name) {
            return Err(ResolveError::duplicate("generic item", &item.name, item.span));
        }
        self.generic_items.insert(item.name.clone(), item);
        Ok(())
    }

    /// Insert an ImplRecord that already passed the coherence gate.
    pub(crate) fn insert_impl(&mut self, rec: ImplRecord) {
        let head = rec
            .target
            .head_name()
            .unwrap_or_default()
            .to_string();
        let idx = self.impls.len();
        self.impls.push(rec);
        self.impls_by_target.entry(head).or_default().push(idx);
    }

    pub fn lookup_type(&self, name: &str) -> Result<&TypeDecl, ResolveError> {
        self.types
            .get(name)
            .ok_or_else(|| ResolveError::unknown(name, crate::span::Span::dummy()))
    }

    pub fn lookup_interface(&self, name: &str) -> Result<&InterfaceDecl, ResolveError> {
        self.interfaces
            .get(name)
            .ok_or_else(|| ResolveError::unknown(name, crate::span::Span::dummy()))
    }

    pub fn lookup_generic_item(&self, name: &str) -> Result<&GenericItem, ResolveError> {
        self.generic_items
            .get(name)
            .ok_or_else(|| ResolveError::unknown(name, crate::span::Span::dummy()))
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn has_interface(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    /// All ImplRecords whose target head resolves to `type_name`, in
    /// registration order.
    pub fn impls_for(&self, type_name: &str) -> impl Iterator<Item = &ImplRecord> {
        self.impls_by_target
            .get(type_name)
            .map(|v| v.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&i| &self.impls[i])
    }

    pub fn impls(&self) -> &[ImplRecord] {
        &self.impls
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.types.values()
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &InterfaceDecl> {
        self.interfaces.values()
    }

    pub fn generic_items(&self) -> impl Iterator<Item = &GenericItem> {
        self.generic_items.values()
    }
}
