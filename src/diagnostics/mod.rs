use crate::span::Span;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("duplicate declaration: {kind} '{name}' is already registered")]
    DuplicateDeclaration { kind: &'static str, name: String, span: Span },

    #[error("unknown identifier '{name}'")]
    UnknownIdentifier { name: String, span: Span },

    #[error("conflicting implementation for '{target}': overlaps a previously accepted implementation")]
    ConflictingImplementation {
        interface: Option<String>,
        target: String,
        first_span: Span,
        second_span: Span,
    },

    #[error("foreign implementation: neither '{interface}' nor '{target}' is local to the registering unit")]
    ForeignImplementation { interface: String, target: String, span: Span },

    #[error("cyclic contract requirement: {}", cycle.join(" -> "))]
    CyclicContractRequirement { cycle: Vec<String> },

    #[error("incomplete implementation of '{interface}' for '{target}': missing method '{missing}'")]
    IncompleteImplementation { interface: String, target: String, missing: String, span: Span },

    #[error("ambiguous inherent method '{method}' on '{receiver}' (coherence invariant violated)")]
    AmbiguousInherentMethod { receiver: String, method: String },

    #[error("method '{method}' exists on '{receiver}' but its interface '{interface}' is not visible at this call site")]
    MethodNotInScope { receiver: String, method: String, interface: String },

    #[error("no method '{method}' on '{receiver}'")]
    NoSuchMethod { receiver: String, method: String },

    #[error("unsatisfied bound '{subject}: {interface}'")]
    UnsatisfiedBound {
        subject: String,
        interface: String,
        span: Span,
        /// Every failing constraint of the set, first one included.
        also_failed: Vec<String>,
    },

    #[error("cannot resolve inverse binding for '{item}': {} candidate implementations", candidates.len())]
    UnresolvableInverseBinding { item: String, candidates: Vec<String> },

    #[error("cannot derive '{contract}' for '{type_name}': field '{field}' does not satisfy '{contract}'")]
    NonDerivableField { type_name: String, field: String, contract: String },

    #[error("specialization of '{item}' expects {expected} type arguments, got {got}")]
    SpecializationArity { item: String, expected: usize, got: usize },
}

impl ResolveError {
    pub fn duplicate(kind: &'static str, name: impl Into<String>, span: Span) -> Self {
        Self::DuplicateDeclaration { kind, name: name.into(), span }
    }

    pub fn unknown(name: impl Into<String>, span: Span) -> Self {
        Self::UnknownIdentifier { name: name.into(), span }
    }

    pub fn no_such_method(receiver: impl Into<String>, method: impl Into<String>) -> Self {
        Self::NoSuchMethod { receiver: receiver.into(), method: method.into() }
    }

    /// The span most relevant to this diagnostic, when one exists.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::DuplicateDeclaration { span, .. }
            | Self::UnknownIdentifier { span, .. }
            | Self::ForeignImplementation { span, .. }
            | Self::IncompleteImplementation { span, .. }
            | Self::UnsatisfiedBound { span, .. } => Some(*span),
            Self::ConflictingImplementation { second_span, .. } => Some(*second_span),
            _ => None,
        }
    }

    /// True for errors that abort the whole run rather than a single call site.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DuplicateDeclaration { .. }
                | Self::UnknownIdentifier { .. }
                | Self::ConflictingImplementation { .. }
                | Self::ForeignImplementation { .. }
                | Self::CyclicContractRequirement { .. }
                | Self::IncompleteImplementation { .. }
                | Self::AmbiguousInherentMethod { .. }
        )
    }
}

/// Render a ResolveError with ariadne for nice terminal output.
pub fn render_error(source: &str, err: &ResolveError) {
    use ariadne::{Label, Report, ReportKind, Source};

    match err.span() {
        Some(span) => {
            let mut report = Report::build(ReportKind::Error, (), span.start)
                .with_message("resolution error")
                .with_label(Label::new(span.start..span.end).with_message(err.to_string()));
            if let ResolveError::UnsatisfiedBound { also_failed, .. } = err {
                for failed in also_failed.iter().skip(1) {
                    report = report.with_note(format!("also unsatisfied: {failed}"));
                }
            }
            if let ResolveError::ConflictingImplementation { first_span, .. } = err {
                report = report.with_label(
                    Label::new(first_span.start..first_span.end)
                        .with_message("first implementation registered here"),
                );
            }
            report.finish().eprint(Source::from(source)).unwrap();
        }
        None => {
            eprintln!("error: {err}");
        }
    }
}
