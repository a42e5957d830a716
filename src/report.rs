//! Serializable summary of a resolution run: every declaration the table
//! accepted, every specialized unit produced, and any diagnostics collected
//! from batch call-site checking. Keyed maps use `BTreeMap` so the JSON
//! output is stable across runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decl::TypeKind;
use crate::span::Span;
use crate::specialize::UnitHandle;
use crate::table::DeclTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSummary {
    pub name: String,
    pub kind: String,
    pub unit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSummary {
    pub name: String,
    pub methods: Vec<String>,
    pub supertypes: Vec<String>,
    pub unit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplSummary {
    pub id: Uuid,
    pub interface: Option<String>,
    pub target: String,
    pub unit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSummary {
    pub id: Uuid,
    pub item: String,
    pub mangled_name: String,
    pub type_args: Vec<String>,
}

/// One failed query, attributed to the call site that raised it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub span: Option<Span>,
    pub site: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub types: BTreeMap<Uuid, TypeSummary>,
    pub interfaces: BTreeMap<Uuid, InterfaceSummary>,
    pub impls: Vec<ImplSummary>,
    pub specializations: Vec<UnitSummary>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResolutionReport {
    pub fn build(table: &DeclTable, units: &[UnitHandle], diagnostics: Vec<Diagnostic>) -> Self {
        let types = table
            .types()
            .map(|t| {
                let kind = match &t.kind {
                    TypeKind::Primitive => "primitive",
                    TypeKind::Product { .. } => "product",
                    TypeKind::Sum { .. } => "sum",
                };
                (t.id, TypeSummary { name: t.name.clone(), kind: kind.into(), unit: t.unit.0 })
            })
            .collect();

        let interfaces = table
            .interfaces()
            .map(|i| {
                let summary = InterfaceSummary {
                    name: i.name.clone(),
                    methods: i.methods.iter().map(|m| m.name.clone()).collect(),
                    supertypes: i.supertypes.clone(),
                    unit: i.unit.0,
                };
                (i.id, summary)
            })
            .collect();

        let impls = table
            .impls()
            .iter()
            .map(|rec| ImplSummary {
                id: rec.id,
                interface: rec.interface.clone(),
                target: rec.target.to_string(),
                unit: rec.unit.0,
            })
            .collect();

        let specializations = units
            .iter()
            .map(|u| UnitSummary {
                id: u.id,
                item: u.item.clone(),
                mangled_name: u.mangled_name.clone(),
                type_args: u.type_args.iter().map(|t| t.to_string()).collect(),
            })
            .collect();

        Self { types, interfaces, impls, specializations, diagnostics }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
