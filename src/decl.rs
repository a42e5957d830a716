//! Declarations handed to the engine by the front-end: types, capability
//! contracts (interfaces), implementation records, constraints, and generic
//! items. All are immutable after registration and owned by the
//! `DeclTable` for the lifetime of one resolution run.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::span::Span;

/// Identifier of the compilation unit a declaration came from. Unit 0 is
/// reserved for engine builtins (primitives and derivable contracts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl UnitId {
    pub const BUILTIN: UnitId = UnitId(0);
}

/// A type expression as written at a declaration or use site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeExpr {
    /// Concrete named type (`int`, `Circle`).
    Named(String),
    /// Generic parameter placeholder (`T`).
    Param(String),
    /// Generic type applied to arguments (`Pair<T, int>`).
    Applied { name: String, args: Vec<TypeExpr> },
    /// `Self` inside interface method signatures.
    SelfTy,
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn param(name: impl Into<String>) -> Self {
        Self::Param(name.into())
    }

    /// The head type constructor name, when this expression has one.
    pub fn head_name(&self) -> Option<&str> {
        match self {
            Self::Named(name) | Self::Applied { name, .. } => Some(name),
            Self::Param(_) | Self::SelfTy => None,
        }
    }

    /// True when no generic parameter or `Self` occurs anywhere.
    pub fn is_concrete(&self) -> bool {
        match self {
            Self::Named(_) => true,
            Self::Param(_) | Self::SelfTy => false,
            Self::Applied { args, .. } => args.iter().all(TypeExpr::is_concrete),
        }
    }

    /// Replace parameter occurrences according to `bindings`. Unbound
    /// parameters are left in place.
    pub fn substitute(&self, bindings: &HashMap<String, TypeExpr>) -> TypeExpr {
        match self {
            Self::Param(name) => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            Self::Applied { name, args } => Self::Applied {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
            Self::Named(_) | Self::SelfTy => self.clone(),
        }
    }

    /// Replace `Self` occurrences with a concrete receiver type.
    pub fn substitute_self(&self, receiver: &TypeExpr) -> TypeExpr {
        match self {
            Self::SelfTy => receiver.clone(),
            Self::Applied { name, args } => Self::Applied {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute_self(receiver)).collect(),
            },
            Self::Named(_) | Self::Param(_) => self.clone(),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) | Self::Param(name) => write!(f, "{name}"),
            Self::SelfTy => write!(f, "Self"),
            Self::Applied { name, args } => {
                write!(f, "{name}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
        }
    }
}

/// Runtime value model for method body invocation. The engine itself never
/// evaluates user code; bodies are opaque closures over these values, and
/// derived bodies are synthesized structural walks.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Record { type_name: String, fields: Vec<(String, Value)> },
    Variant { type_name: String, variant: String, fields: Vec<(String, Value)> },
}

impl Value {
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Record { fields, .. } | Self::Variant { fields, .. } => {
                fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }
}

/// An opaque, invocable method body supplied by the front-end or synthesized
/// by the derive pass.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

#[derive(Clone)]
pub struct MethodBody {
    func: NativeFn,
}

impl MethodBody {
    pub fn native(func: impl Fn(&[Value]) -> Value + Send + Sync + 'static) -> Self {
        Self { func: Arc::new(func) }
    }

    pub fn invoke(&self, args: &[Value]) -> Value {
        (self.func)(args)
    }
}

impl fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MethodBody(<native>)")
    }
}

/// A required method signature on an interface.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSig {
    pub name: String,
    pub params: Vec<TypeExpr>,
    pub return_type: TypeExpr,
}

impl MethodSig {
    pub fn new(name: impl Into<String>, params: Vec<TypeExpr>, return_type: TypeExpr) -> Self {
        Self { name: name.into(), params, return_type }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeExpr,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self { name: name.into(), ty }
    }
}

#[derive(Debug, Clone)]
pub struct VariantDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

impl VariantDecl {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDecl>) -> Self {
        Self { name: name.into(), fields }
    }
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Primitive,
    Product { fields: Vec<FieldDecl> },
    Sum { variants: Vec<VariantDecl> },
}

/// A type declaration. Created once, immutable thereafter.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub id: Uuid,
    pub name: String,
    pub kind: TypeKind,
    pub type_params: Vec<String>,
    pub unit: UnitId,
    pub span: Span,
}

impl TypeDecl {
    pub fn primitive(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: TypeKind::Primitive,
            type_params: vec![],
            unit: UnitId::BUILTIN,
            span: Span::dummy(),
        }
    }

    pub fn product(name: impl Into<String>, fields: Vec<FieldDecl>, unit: UnitId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: TypeKind::Product { fields },
            type_params: vec![],
            unit,
            span: Span::dummy(),
        }
    }

    pub fn sum(name: impl Into<String>, variants: Vec<VariantDecl>, unit: UnitId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: TypeKind::Sum { variants },
            type_params: vec![],
            unit,
            span: Span::dummy(),
        }
    }

    pub fn with_type_params(mut self, params: Vec<String>) -> Self {
        self.type_params = params;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// A capability contract: required method signatures, default bodies for a
/// subset of them, and supertype requirements.
#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub id: Uuid,
    pub name: String,
    pub type_params: Vec<String>,
    /// Contracts every implementor must also implement.
    pub supertypes: Vec<String>,
    pub methods: Vec<MethodSig>,
    pub defaults: HashMap<String, MethodBody>,
    pub unit: UnitId,
    pub span: Span,
}

impl InterfaceDecl {
    pub fn new(name: impl Into<String>, methods: Vec<MethodSig>, unit: UnitId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            type_params: vec![],
            supertypes: vec![],
            methods,
            defaults: HashMap::new(),
            unit,
            span: Span::dummy(),
        }
    }

    pub fn with_type_params(mut self, params: Vec<String>) -> Self {
        self.type_params = params;
        self
    }

    pub fn with_supertypes(mut self, supertypes: Vec<String>) -> Self {
        self.supertypes = supertypes;
        self
    }

    pub fn with_default(mut self, method: impl Into<String>, body: MethodBody) -> Self {
        self.defaults.insert(method.into(), body);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name == name)
    }

    pub fn default_body(&self, name: &str) -> Option<&MethodBody> {
        self.defaults.get(name)
    }
}

/// A single constraint: `subject` must implement `interface` (with the given
/// interface arguments). The subject may be a generic parameter or a fixed
/// concrete type.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub subject: TypeExpr,
    pub interface: String,
    pub interface_args: Vec<TypeExpr>,
    pub span: Span,
}

impl Constraint {
    pub fn new(subject: TypeExpr, interface: impl Into<String>) -> Self {
        Self { subject, interface: interface.into(), interface_args: vec![], span: Span::dummy() }
    }

    pub fn with_args(mut self, args: Vec<TypeExpr>) -> Self {
        self.interface_args = args;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn describe(&self) -> String {
        if self.interface_args.is_empty() {
            format!("{}: {}", self.subject, self.interface)
        } else {
            let args: Vec<String> = self.interface_args.iter().map(|a| a.to_string()).collect();
            format!("{}: {}<{}>", self.subject, self.interface, args.join(", "))
        }
    }
}

/// Ordered for diagnostics, semantically a conjunction.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn push(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

/// A binding of a type (and optionally an interface) to method bodies.
/// `interface: None` marks an inherent implementation.
#[derive(Debug, Clone)]
pub struct ImplRecord {
    pub id: Uuid,
    pub interface: Option<String>,
    /// Arguments for the interface's own type parameters.
    pub interface_args: Vec<TypeExpr>,
    pub target: TypeExpr,
    pub type_params: Vec<String>,
    pub constraints: ConstraintSet,
    pub methods: HashMap<String, MethodBody>,
    pub unit: UnitId,
    pub span: Span,
}

impl ImplRecord {
    pub fn of(interface: impl Into<String>, target: TypeExpr, unit: UnitId) -> Self {
        Self {
            id: Uuid::new_v4(),
            interface: Some(interface.into()),
            interface_args: vec![],
            target,
            type_params: vec![],
            constraints: ConstraintSet::new(),
            methods: HashMap::new(),
            unit,
            span: Span::dummy(),
        }
    }

    pub fn inherent(target: TypeExpr, unit: UnitId) -> Self {
        Self {
            id: Uuid::new_v4(),
            interface: None,
            interface_args: vec![],
            target,
            type_params: vec![],
            constraints: ConstraintSet::new(),
            methods: HashMap::new(),
            unit,
            span: Span::dummy(),
        }
    }

    pub fn with_interface_args(mut self, args: Vec<TypeExpr>) -> Self {
        self.interface_args = args;
        self
    }

    pub fn with_type_params(mut self, params: Vec<String>) -> Self {
        self.type_params = params;
        self
    }

    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_method(mut self, name: impl Into<String>, body: MethodBody) -> Self {
        self.methods.insert(name.into(), body);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Human-readable description for diagnostics.
    pub fn describe(&self) -> String {
        match &self.interface {
            Some(iface) => format!("{} for {}", iface, self.target),
            None => format!("inherent impl for {}", self.target),
        }
    }
}

/// A generic item (function) that the Specializer instantiates per distinct
/// concrete type argument tuple.
#[derive(Debug, Clone)]
pub struct GenericItem {
    pub id: Uuid,
    pub name: String,
    pub type_params: Vec<String>,
    pub constraints: ConstraintSet,
    pub params: Vec<TypeExpr>,
    pub return_type: TypeExpr,
    pub unit: UnitId,
    pub span: Span,
}

impl GenericItem {
    pub fn new(name: impl Into<String>, type_params: Vec<String>, unit: UnitId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            type_params,
            constraints: ConstraintSet::new(),
            params: vec![],
            return_type: TypeExpr::named("void"),
            unit,
            span: Span::dummy(),
        }
    }

    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_signature(mut self, params: Vec<TypeExpr>, return_type: TypeExpr) -> Self {
        self.params = params;
        self.return_type = return_type;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// The fixed set of structurally derivable contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeriveKind {
    Eq,
    Ord,
    Hash,
    Clone,
    Default,
    Debug,
}

impl DeriveKind {
    pub const ALL: [DeriveKind; 6] = [
        DeriveKind::Eq,
        DeriveKind::Ord,
        DeriveKind::Hash,
        DeriveKind::Clone,
        DeriveKind::Default,
        DeriveKind::Debug,
    ];

    pub fn contract_name(self) -> &'static str {
        match self {
            Self::Eq => "Eq",
            Self::Ord => "Ord",
            Self::Hash => "Hash",
            Self::Clone => "Clone",
            Self::Default => "Default",
            Self::Debug => "Debug",
        }
    }

    pub fn method_name(self) -> &'static str {
        match self {
            Self::Eq => "equals",
            Self::Ord => "compare",
            Self::Hash => "hash",
            Self::Clone => "duplicate",
            Self::Default => "default",
            Self::Debug => "fmt",
        }
    }

    pub fn from_contract(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.contract_name() == name)
    }
}

pub fn mangle_name(base: &str, type_args: &[TypeExpr]) -> String {
    let suffixes: Vec<String> = type_args.iter().map(mangle_type).collect();
    format!("{}__{}", base, suffixes.join("_"))
}

fn mangle_type(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Named(n) | TypeExpr::Param(n) => n.clone(),
        TypeExpr::SelfTy => "Self".into(),
        TypeExpr::Applied { name, args } => {
            let args: Vec<String> = args.iter().map(mangle_type).collect();
            format!("{}_{}", name, args.join("_"))
        }
    }
}
