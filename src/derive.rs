//! Structural derivation of the fixed contract set. Given a product or sum
//! type whose fields all satisfy the requested contract, synthesize an
//! `ImplRecord` whose single method body walks the value structurally. The
//! synthesized record goes through the same coherence gate as a hand-written
//! one, so a derive can still be rejected as conflicting.

use crate::decl::{
    DeriveKind, FieldDecl, ImplRecord, MethodBody, TypeExpr, TypeKind, Value,
};
use crate::diagnostics::ResolveError;
use crate::methods::{MethodResolver, ResolvedMethod};
use crate::solver::{BoundSolver, Scope};
use crate::table::DeclTable;

/// How one field contributes to the derived body: scalars are handled
/// directly, every other field type defers to its own resolved
/// implementation of the contract.
#[derive(Clone)]
enum FieldOp {
    Scalar { zero: Value },
    Method(ResolvedMethod),
}

impl FieldOp {
    fn eq(&self, a: &Value, b: &Value) -> bool {
        match self {
            Self::Scalar { .. } => scalar_eq(a, b),
            Self::Method(m) => m.invoke(&[a.clone(), b.clone()]) == Value::Bool(true),
        }
    }

    fn cmp(&self, a: &Value, b: &Value) -> i64 {
        match self {
            Self::Scalar { .. } => scalar_cmp(a, b),
            Self::Method(m) => match m.invoke(&[a.clone(), b.clone()]) {
                Value::Int(n) => n,
                _ => 0,
            },
        }
    }

    fn hash(&self, a: &Value) -> i64 {
        match self {
            Self::Scalar { .. } => scalar_hash(a),
            Self::Method(m) => match m.invoke(&[a.clone()]) {
                Value::Int(n) => n,
                _ => 0,
            },
        }
    }

    fn duplicate(&self, a: &Value) -> Value {
        match self {
            Self::Scalar { .. } => a.clone(),
            Self::Method(m) => m.invoke(&[a.clone()]),
        }
    }

    fn default(&self) -> Value {
        match self {
            Self::Scalar { zero } => zero.clone(),
            Self::Method(m) => m.invoke(&[]),
        }
    }

    fn fmt(&self, a: &Value) -> String {
        match self {
            Self::Scalar { .. } => scalar_fmt(a),
            Self::Method(m) => match m.invoke(&[a.clone()]) {
                Value::Str(s) => s,
                _ => "<opaque>".to_string(),
            },
        }
    }
}

type FieldOps = Vec<(String, FieldOp)>;

/// Synthesize the structural implementation of `kind` for `type_name`.
pub fn synthesize(
    table: &DeclTable,
    kind: DeriveKind,
    type_name: &str,
) -> Result<ImplRecord, ResolveError> {
    let decl = table.lookup_type(type_name)?;
    table.lookup_interface(kind.contract_name())?;

    let body = match &decl.kind {
        TypeKind::Primitive => scalar_body(kind, type_name),
        TypeKind::Product { fields } => {
            let ops = field_ops(table, kind, type_name, fields)?;
            product_body(kind, type_name.to_string(), ops)
        }
        TypeKind::Sum { variants } => {
            let mut per_variant: Vec<(String, FieldOps)> = Vec::new();
            for v in variants {
                per_variant.push((v.name.clone(), field_ops(table, kind, type_name, &v.fields)?));
            }
            sum_body(kind, type_name.to_string(), per_variant)
        }
    };

    Ok(ImplRecord::of(kind.contract_name(), TypeExpr::named(type_name), decl.unit)
        .with_method(kind.method_name(), body)
        .with_span(decl.span))
}

/// Classify every field and check the per-field obligation: each field type
/// must already satisfy the contract being derived.
fn field_ops(
    table: &DeclTable,
    kind: DeriveKind,
    type_name: &str,
    fields: &[FieldDecl],
) -> Result<FieldOps, ResolveError> {
    let solver = BoundSolver::new(table);
    let resolver = MethodResolver::new(table);
    let contract = kind.contract_name();

    let mut ops = Vec::with_capacity(fields.len());
    for field in fields {
        let op = match scalar_zero(&field.ty) {
            Some(zero) => FieldOp::Scalar { zero },
            None => {
                if !solver.satisfies(&field.ty, contract, &[], &Scope::new()) {
                    return Err(ResolveError::NonDerivableField {
                        type_name: type_name.to_string(),
                        field: field.name.clone(),
                        contract: contract.to_string(),
                    });
                }
                let resolved = resolver
                    .resolve(&field.ty, kind.method_name(), &[contract])
                    .map_err(|_| ResolveError::NonDerivableField {
                        type_name: type_name.to_string(),
                        field: field.name.clone(),
                        contract: contract.to_string(),
                    })?;
                FieldOp::Method(resolved)
            }
        };
        ops.push((field.name.clone(), op));
    }
    Ok(ops)
}

fn product_body(kind: DeriveKind, type_name: String, ops: FieldOps) -> MethodBody {
    match kind {
        DeriveKind::Eq => MethodBody::native(move |args| {
            for (name, op) in &ops {
                match (args[0].field(name), args[1].field(name)) {
                    (Some(a), Some(b)) if op.eq(a, b) => {}
                    _ => return Value::Bool(false),
                }
            }
            Value::Bool(true)
        }),
        DeriveKind::Ord => MethodBody::native(move |args| {
            for (name, op) in &ops {
                if let (Some(a), Some(b)) = (args[0].field(name), args[1].field(name)) {
                    let c = op.cmp(a, b);
                    if c != 0 {
                        return Value::Int(c.signum());
                    }
                }
            }
            Value::Int(0)
        }),
        DeriveKind::Hash => MethodBody::native(move |args| {
            let mut h: i64 = 17;
            for (name, op) in &ops {
                if let Some(a) = args[0].field(name) {
                    h = h.wrapping_mul(31).wrapping_add(op.hash(a));
                }
            }
            Value::Int(h)
        }),
        DeriveKind::Clone => MethodBody::native(move |args| Value::Record {
            type_name: type_name.clone(),
            fields: ops
                .iter()
                .map(|(name, op)| {
                    let dup = args[0]
                        .field(name)
                        .map(|v| op.duplicate(v))
                        .unwrap_or_else(|| op.default());
                    (name.clone(), dup)
                })
                .collect(),
        }),
        DeriveKind::Default => MethodBody::native(move |_| Value::Record {
            type_name: type_name.clone(),
            fields: ops.iter().map(|(name, op)| (name.clone(), op.default())).collect(),
        }),
        DeriveKind::Debug => MethodBody::native(move |args| {
            Value::Str(fmt_fields(&type_name, &ops, &args[0]))
        }),
    }
}

fn sum_body(kind: DeriveKind, type_name: String, variants: Vec<(String, FieldOps)>) -> MethodBody {
    match kind {
        DeriveKind::Eq => MethodBody::native(move |args| {
            let (Some((va, fa)), Some((vb, fb))) = (variant_of(&args[0]), variant_of(&args[1]))
            else {
                return Value::Bool(false);
            };
            if va != vb {
                return Value::Bool(false);
            }
            let Some((_, ops)) = variants.iter().find(|(name, _)| name == va) else {
                return Value::Bool(false);
            };
            for (name, op) in ops {
                match (field_in(fa, name), field_in(fb, name)) {
                    (Some(a), Some(b)) if op.eq(a, b) => {}
                    _ => return Value::Bool(false),
                }
            }
            Value::Bool(true)
        }),
        DeriveKind::Ord => MethodBody::native(move |args| {
            let (Some((va, fa)), Some((vb, fb))) = (variant_of(&args[0]), variant_of(&args[1]))
            else {
                return Value::Int(0);
            };
            // Declaration order decides between distinct variants.
            let ia = variants.iter().position(|(name, _)| name == va);
            let ib = variants.iter().position(|(name, _)| name == vb);
            if ia != ib {
                return Value::Int(if ia < ib { -1 } else { 1 });
            }
            let Some(idx) = ia else { return Value::Int(0) };
            for (name, op) in &variants[idx].1 {
                if let (Some(a), Some(b)) = (field_in(fa, name), field_in(fb, name)) {
                    let c = op.cmp(a, b);
                    if c != 0 {
                        return Value::Int(c.signum());
                    }
                }
            }
            Value::Int(0)
        }),
        DeriveKind::Hash => MethodBody::native(move |args| {
            let Some((va, fa)) = variant_of(&args[0]) else {
                return Value::Int(0);
            };
            let idx = variants.iter().position(|(name, _)| name == va);
            let mut h: i64 = 17_i64
                .wrapping_mul(31)
                .wrapping_add(idx.map(|i| i as i64).unwrap_or(-1));
            if let Some(i) = idx {
                for (name, op) in &variants[i].1 {
                    if let Some(a) = field_in(fa, name) {
                        h = h.wrapping_mul(31).wrapping_add(op.hash(a));
                    }
                }
            }
            Value::Int(h)
        }),
        DeriveKind::Clone => MethodBody::native(move |args| {
            let Some((va, fa)) = variant_of(&args[0]) else {
                return args[0].clone();
            };
            let Some((_, ops)) = variants.iter().find(|(name, _)| name == va) else {
                return args[0].clone();
            };
            Value::Variant {
                type_name: type_name.clone(),
                variant: va.to_string(),
                fields: ops
                    .iter()
                    .map(|(name, op)| {
                        let dup = field_in(fa, name)
                            .map(|v| op.duplicate(v))
                            .unwrap_or_else(|| op.default());
                        (name.clone(), dup)
                    })
                    .collect(),
            }
        }),
        // The first declared variant, with every field defaulted.
        DeriveKind::Default => MethodBody::native(move |_| match variants.first() {
            Some((variant, ops)) => Value::Variant {
                type_name: type_name.clone(),
                variant: variant.clone(),
                fields: ops.iter().map(|(name, op)| (name.clone(), op.default())).collect(),
            },
            None => Value::Variant {
                type_name: type_name.clone(),
                variant: String::new(),
                fields: vec![],
            },
        }),
        DeriveKind::Debug => MethodBody::native(move |args| {
            let Some((va, _)) = variant_of(&args[0]) else {
                return Value::Str(type_name.clone());
            };
            let label = format!("{type_name}::{va}");
            match variants.iter().find(|(name, _)| name == va) {
                Some((_, ops)) if !ops.is_empty() => {
                    Value::Str(fmt_fields(&label, ops, &args[0]))
                }
                _ => Value::Str(label),
            }
        }),
    }
}

fn variant_of(v: &Value) -> Option<(&str, &[(String, Value)])> {
    match v {
        Value::Variant { variant, fields, .. } => Some((variant, fields)),
        _ => None,
    }
}

fn field_in<'a>(fields: &'a [(String, Value)], name: &str) -> Option<&'a Value> {
    fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
}

fn fmt_fields(label: &str, ops: &FieldOps, value: &Value) -> String {
    if ops.is_empty() {
        return format!("{label} {{}}");
    }
    let parts: Vec<String> = ops
        .iter()
        .map(|(name, op)| {
            let rendered = value.field(name).map(|v| op.fmt(v)).unwrap_or_else(|| "?".into());
            format!("{name}: {rendered}")
        })
        .collect();
    format!("{label} {{ {} }}", parts.join(", "))
}

fn scalar_body(kind: DeriveKind, type_name: &str) -> MethodBody {
    let zero = scalar_zero(&TypeExpr::named(type_name)).unwrap_or(Value::Int(0));
    match kind {
        DeriveKind::Eq => MethodBody::native(|args| Value::Bool(scalar_eq(&args[0], &args[1]))),
        DeriveKind::Ord => MethodBody::native(|args| Value::Int(scalar_cmp(&args[0], &args[1]))),
        DeriveKind::Hash => MethodBody::native(|args| Value::Int(scalar_hash(&args[0]))),
        DeriveKind::Clone => MethodBody::native(|args| args[0].clone()),
        DeriveKind::Default => MethodBody::native(move |_| zero.clone()),
        DeriveKind::Debug => MethodBody::native(|args| Value::Str(scalar_fmt(&args[0]))),
    }
}

fn scalar_zero(ty: &TypeExpr) -> Option<Value> {
    match ty {
        TypeExpr::Named(name) => match name.as_str() {
            "int" => Some(Value::Int(0)),
            "float" => Some(Value::Float(0.0)),
            "bool" => Some(Value::Bool(false)),
            "string" => Some(Value::Str(String::new())),
            _ => None,
        },
        _ => None,
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        _ => false,
    }
}

fn scalar_cmp(a: &Value, b: &Value) -> i64 {
    let ord = match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => {
            x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        _ => std::cmp::Ordering::Equal,
    };
    ord as i64
}

fn scalar_hash(a: &Value) -> i64 {
    match a {
        Value::Int(n) => *n,
        Value::Float(f) => f.to_bits() as i64,
        Value::Bool(b) => *b as i64,
        Value::Str(s) => s
            .bytes()
            .fold(0_i64, |h, b| h.wrapping_mul(31).wrapping_add(b as i64)),
        _ => 0,
    }
}

fn scalar_fmt(a: &Value) -> String {
    match a {
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Str(s) => format!("{s:?}"),
        _ => "<opaque>".to_string(),
    }
}
