//! Abstract syntax tree for the lambdhall calculus.
//!
//! An [`Expr`] pairs a syntactic [`ExprKind`] with the substitution context
//! captured at construction or propagated by evaluation. Expressions are
//! immutable; every transformation produces a new value, and subtrees are
//! shared through [`Arc`].
//!
//! Three judgments are defined over this tree: α-normalization and
//! β-evaluation in [`crate::eval`], and type inference in [`crate::types`].

mod convert;
mod display;

use crate::environment::{Binding, ValueEnv};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The canonical name every bound variable is renamed to by
/// α-normalization, disambiguated by scope index.
pub const DEFAULT_VARIABLE_NAME: &str = "_";

/// An expression of the calculus, carrying its captured substitution
/// context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    /// The syntactic shape of the expression.
    pub kind: ExprKind,
    /// Substitution context captured at construction or merged in lazily
    /// by evaluation.
    pub context: ValueEnv,
}

/// The closed family of expression shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// λ-abstraction `λ(x : T) → body`.
    Lambda {
        /// Name of the bound parameter.
        parameter_name: String,
        /// Declared type of the parameter.
        parameter_type: Arc<Expr>,
        /// Body in which the parameter is bound.
        body: Arc<Expr>,
    },
    /// Dependent product `∀(x : T) → body`.
    ForAll {
        /// Name of the bound parameter.
        parameter_name: String,
        /// Declared type of the parameter.
        parameter_type: Arc<Expr>,
        /// Result type in which the parameter is bound.
        body: Arc<Expr>,
    },
    /// A variable occurrence; `scope` skips that many enclosing binders of
    /// the same name.
    Variable {
        /// Surface name of the variable.
        name: String,
        /// De-Bruijn-like disambiguation index.
        scope: usize,
    },
    /// `let x = v [: T] let … in body`.
    LetIn {
        /// Bindings, in order; later bindings see earlier ones.
        bindings: Vec<LetBinding>,
        /// Body in which all bindings are in scope.
        body: Arc<Expr>,
    },
    /// `if condition then if_true else if_false`.
    Conditional {
        /// The scrutinized boolean expression.
        condition: Arc<Expr>,
        /// Branch taken when the condition holds.
        if_true: Arc<Expr>,
        /// Branch taken otherwise.
        if_false: Arc<Expr>,
    },
    /// Type ascription `expression : annotation`.
    Annotation {
        /// The ascribed expression.
        expression: Arc<Expr>,
        /// The claimed type.
        annotation: Arc<Expr>,
    },
    /// Function application `(f a)`.
    Application {
        /// The applied expression.
        function: Arc<Expr>,
        /// The argument.
        argument: Arc<Expr>,
    },
    /// A binary operator application `(a op b)`.
    Operator {
        /// Which operator.
        op: BinOp,
        /// Left operand.
        lhs: Arc<Expr>,
        /// Right operand.
        rhs: Arc<Expr>,
    },
    /// Field or alternative selection `expr.label`.
    Select {
        /// Record literal or union type selected from.
        expression: Arc<Expr>,
        /// The selected label.
        label: String,
    },
    /// Record projection `expr.{a, b}`.
    Project {
        /// The projected record.
        expression: Arc<Expr>,
        /// Labels to keep.
        labels: Vec<String>,
    },
    /// `merge handlers union [: annotation]`.
    Merge {
        /// Record of one handler per union alternative.
        handlers: Arc<Expr>,
        /// The scrutinized union value.
        union: Arc<Expr>,
        /// Result type, required when the union has no alternatives.
        annotation: Option<Arc<Expr>>,
    },
    /// An unresolved import leaf. Opaque to the engine; an external
    /// resolver replaces it before evaluation or typing.
    Import {
        /// Opaque description of the import target.
        source: String,
    },
    /// A natural number literal.
    NaturalLit(u64),
    /// A double literal.
    DoubleLit(f64),
    /// A boolean literal.
    BoolLit(bool),
    /// A text literal as a sequence of chunks.
    TextLit(Vec<String>),
    /// A list literal; `element_type` is present exactly when `items` is
    /// empty.
    ListLit {
        /// The element expressions.
        items: Vec<Arc<Expr>>,
        /// Element type annotation for empty lists.
        element_type: Option<Arc<Expr>>,
    },
    /// An optional literal.
    OptionalLit {
        /// The wrapped value, if present.
        value: Option<Arc<Expr>>,
    },
    /// A record literal `{ a = 1 }`.
    RecordLit {
        /// Field values by label.
        fields: IndexMap<String, Arc<Expr>>,
    },
    /// A union literal `< L = v | R : T >`: a tagged value together with
    /// the types of its sibling alternatives.
    UnionLit {
        /// The inhabited alternative.
        label: String,
        /// The carried value.
        value: Arc<Expr>,
        /// Types of the remaining alternatives.
        alternatives: IndexMap<String, Arc<Expr>>,
    },
    /// The type `List T`.
    ListType(Arc<Expr>),
    /// The type `Optional T`.
    OptionalType(Arc<Expr>),
    /// A record type `{ a : T }`.
    RecordType {
        /// Field types by label.
        fields: IndexMap<String, Arc<Expr>>,
    },
    /// A union type `< A : T | B : U >`.
    UnionType {
        /// Alternative types by label.
        alternatives: IndexMap<String, Arc<Expr>>,
    },
    /// One of the built-in constants.
    Builtin(Builtin),
    /// `List/build` applied to its element type.
    ListBuildPartial(Arc<Expr>),
    /// `List/fold` applied to its element type.
    ListFoldPartial(Arc<Expr>),
}

/// A single `let` binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetBinding {
    /// Bound name.
    pub name: String,
    /// Bound value.
    pub value: Arc<Expr>,
    /// Optional type annotation, checked against the value's inferred type.
    pub annotation: Option<Arc<Expr>>,
}

impl LetBinding {
    /// Creates a binding without an annotation.
    pub fn new(name: impl Into<String>, value: Expr) -> Self {
        Self {
            name: name.into(),
            value: Arc::new(value),
            annotation: None,
        }
    }

    /// Creates a binding with a type annotation.
    pub fn annotated(name: impl Into<String>, value: Expr, annotation: Expr) -> Self {
        Self {
            name: name.into(),
            value: Arc::new(value),
            annotation: Some(Arc::new(annotation)),
        }
    }
}

/// Binary operators of the calculus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    /// `#` — list concatenation.
    ListAppend,
    /// `+` — natural addition.
    Plus,
    /// `*` — natural multiplication.
    Times,
    /// `||` — boolean disjunction.
    Or,
    /// `&&` — boolean conjunction.
    And,
}

impl BinOp {
    /// The operator's surface symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::ListAppend => "#",
            Self::Plus => "+",
            Self::Times => "*",
            Self::Or => "||",
            Self::And => "&&",
        }
    }
}

/// The closed set of built-in constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Builtin {
    /// The universe of kinds.
    Sort,
    /// The universe of types.
    Kind,
    /// The universe of values.
    Type,
    /// The boolean type.
    Bool,
    /// The natural number type.
    Natural,
    /// The double type.
    Double,
    /// The text type.
    Text,
    /// The list type constructor.
    List,
    /// `List/build` — materializes a list from a polymorphic builder.
    ListBuild,
    /// `List/fold` — the inverse of `List/build`.
    ListFold,
    /// `Double/show` — renders a double as text.
    DoubleShow,
}

impl Builtin {
    /// The builtin's surface name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sort => "Sort",
            Self::Kind => "Kind",
            Self::Type => "Type",
            Self::Bool => "Bool",
            Self::Natural => "Natural",
            Self::Double => "Double",
            Self::Text => "Text",
            Self::List => "List",
            Self::ListBuild => "List/build",
            Self::ListFold => "List/fold",
            Self::DoubleShow => "Double/show",
        }
    }
}

/// Equality is structural over the syntax tree; captured contexts are
/// evaluation bookkeeping and do not participate. Two expressions are
/// semantically equal when their evaluated, α-normalized forms compare
/// equal under this relation.
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Expr {
    /// Wraps a shape into an expression with an empty context.
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            context: ValueEnv::new(),
        }
    }

    /// Replaces the captured context.
    #[must_use]
    pub fn with_context(&self, context: ValueEnv) -> Self {
        Self {
            kind: self.kind.clone(),
            context,
        }
    }

    /// Shadows a single name in the captured context.
    #[must_use]
    pub fn substitute_single(&self, name: impl Into<String>, binding: Binding) -> Self {
        self.with_context(self.context.shadow_single(name, binding))
    }

    /// Merges an outer substitution environment into the captured context.
    #[must_use]
    pub fn substitute_many(&self, env: &ValueEnv) -> Self {
        if env.is_empty() {
            return self.clone();
        }
        self.with_context(self.context.join(env))
    }

    /// Reconstructs the expression, applying `f` to every direct
    /// subexpression. The captured context is preserved.
    #[must_use]
    pub fn map<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&Expr) -> Expr,
    {
        let kind = match &self.kind {
            ExprKind::Lambda {
                parameter_name,
                parameter_type,
                body,
            } => ExprKind::Lambda {
                parameter_name: parameter_name.clone(),
                parameter_type: Arc::new(f(parameter_type)),
                body: Arc::new(f(body)),
            },
            ExprKind::ForAll {
                parameter_name,
                parameter_type,
                body,
            } => ExprKind::ForAll {
                parameter_name: parameter_name.clone(),
                parameter_type: Arc::new(f(parameter_type)),
                body: Arc::new(f(body)),
            },
            ExprKind::Variable { .. }
            | ExprKind::Import { .. }
            | ExprKind::NaturalLit(_)
            | ExprKind::DoubleLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::TextLit(_)
            | ExprKind::Builtin(_) => self.kind.clone(),
            ExprKind::LetIn { bindings, body } => ExprKind::LetIn {
                bindings: bindings
                    .iter()
                    .map(|binding| LetBinding {
                        name: binding.name.clone(),
                        value: Arc::new(f(&binding.value)),
                        annotation: binding.annotation.as_ref().map(|t| Arc::new(f(t))),
                    })
                    .collect(),
                body: Arc::new(f(body)),
            },
            ExprKind::Conditional {
                condition,
                if_true,
                if_false,
            } => ExprKind::Conditional {
                condition: Arc::new(f(condition)),
                if_true: Arc::new(f(if_true)),
                if_false: Arc::new(f(if_false)),
            },
            ExprKind::Annotation {
                expression,
                annotation,
            } => ExprKind::Annotation {
                expression: Arc::new(f(expression)),
                annotation: Arc::new(f(annotation)),
            },
            ExprKind::Application { function, argument } => ExprKind::Application {
                function: Arc::new(f(function)),
                argument: Arc::new(f(argument)),
            },
            ExprKind::Operator { op, lhs, rhs } => ExprKind::Operator {
                op: *op,
                lhs: Arc::new(f(lhs)),
                rhs: Arc::new(f(rhs)),
            },
            ExprKind::Select { expression, label } => ExprKind::Select {
                expression: Arc::new(f(expression)),
                label: label.clone(),
            },
            ExprKind::Project { expression, labels } => ExprKind::Project {
                expression: Arc::new(f(expression)),
                labels: labels.clone(),
            },
            ExprKind::Merge {
                handlers,
                union,
                annotation,
            } => ExprKind::Merge {
                handlers: Arc::new(f(handlers)),
                union: Arc::new(f(union)),
                annotation: annotation.as_ref().map(|t| Arc::new(f(t))),
            },
            ExprKind::ListLit {
                items,
                element_type,
            } => ExprKind::ListLit {
                items: items.iter().map(|item| Arc::new(f(item))).collect(),
                element_type: element_type.as_ref().map(|t| Arc::new(f(t))),
            },
            ExprKind::OptionalLit { value } => ExprKind::OptionalLit {
                value: value.as_ref().map(|v| Arc::new(f(v))),
            },
            ExprKind::RecordLit { fields } => ExprKind::RecordLit {
                fields: fields
                    .iter()
                    .map(|(label, value)| (label.clone(), Arc::new(f(value))))
                    .collect(),
            },
            ExprKind::UnionLit {
                label,
                value,
                alternatives,
            } => ExprKind::UnionLit {
                label: label.clone(),
                value: Arc::new(f(value)),
                alternatives: alternatives
                    .iter()
                    .map(|(label, ty)| (label.clone(), Arc::new(f(ty))))
                    .collect(),
            },
            ExprKind::ListType(element) => ExprKind::ListType(Arc::new(f(element))),
            ExprKind::OptionalType(wrapped) => ExprKind::OptionalType(Arc::new(f(wrapped))),
            ExprKind::RecordType { fields } => ExprKind::RecordType {
                fields: fields
                    .iter()
                    .map(|(label, ty)| (label.clone(), Arc::new(f(ty))))
                    .collect(),
            },
            ExprKind::UnionType { alternatives } => ExprKind::UnionType {
                alternatives: alternatives
                    .iter()
                    .map(|(label, ty)| (label.clone(), Arc::new(f(ty))))
                    .collect(),
            },
            ExprKind::ListBuildPartial(element) => {
                ExprKind::ListBuildPartial(Arc::new(f(element)))
            }
            ExprKind::ListFoldPartial(element) => ExprKind::ListFoldPartial(Arc::new(f(element))),
        };
        Self {
            kind,
            context: self.context.clone(),
        }
    }
}

// Constructors, in rough order of the variant list.
impl Expr {
    /// `λ(name : parameter_type) → body`
    pub fn lambda(name: impl Into<String>, parameter_type: Expr, body: Expr) -> Self {
        Self::new(ExprKind::Lambda {
            parameter_name: name.into(),
            parameter_type: Arc::new(parameter_type),
            body: Arc::new(body),
        })
    }

    /// `∀(name : parameter_type) → body`
    pub fn for_all(name: impl Into<String>, parameter_type: Expr, body: Expr) -> Self {
        Self::new(ExprKind::ForAll {
            parameter_name: name.into(),
            parameter_type: Arc::new(parameter_type),
            body: Arc::new(body),
        })
    }

    /// A variable at scope 0.
    pub fn var(name: impl Into<String>) -> Self {
        Self::var_at(name, 0)
    }

    /// A variable at an explicit scope depth.
    pub fn var_at(name: impl Into<String>, scope: usize) -> Self {
        Self::new(ExprKind::Variable {
            name: name.into(),
            scope,
        })
    }

    /// `let … in body`
    pub fn let_in(bindings: Vec<LetBinding>, body: Expr) -> Self {
        Self::new(ExprKind::LetIn {
            bindings,
            body: Arc::new(body),
        })
    }

    /// `if condition then if_true else if_false`
    pub fn conditional(condition: Expr, if_true: Expr, if_false: Expr) -> Self {
        Self::new(ExprKind::Conditional {
            condition: Arc::new(condition),
            if_true: Arc::new(if_true),
            if_false: Arc::new(if_false),
        })
    }

    /// `expression : annotation`
    pub fn annotation(expression: Expr, annotation: Expr) -> Self {
        Self::new(ExprKind::Annotation {
            expression: Arc::new(expression),
            annotation: Arc::new(annotation),
        })
    }

    /// `(function argument)`
    pub fn application(function: Expr, argument: Expr) -> Self {
        Self::new(ExprKind::Application {
            function: Arc::new(function),
            argument: Arc::new(argument),
        })
    }

    /// `(lhs op rhs)`
    pub fn operator(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Self::new(ExprKind::Operator {
            op,
            lhs: Arc::new(lhs),
            rhs: Arc::new(rhs),
        })
    }

    /// `expression.label`
    pub fn select(expression: Expr, label: impl Into<String>) -> Self {
        Self::new(ExprKind::Select {
            expression: Arc::new(expression),
            label: label.into(),
        })
    }

    /// `expression.{labels}`
    pub fn project(expression: Expr, labels: Vec<String>) -> Self {
        Self::new(ExprKind::Project {
            expression: Arc::new(expression),
            labels,
        })
    }

    /// `merge handlers union [: annotation]`
    pub fn merge(handlers: Expr, union: Expr, annotation: Option<Expr>) -> Self {
        Self::new(ExprKind::Merge {
            handlers: Arc::new(handlers),
            union: Arc::new(union),
            annotation: annotation.map(Arc::new),
        })
    }

    /// An unresolved import leaf.
    pub fn import(source: impl Into<String>) -> Self {
        Self::new(ExprKind::Import {
            source: source.into(),
        })
    }

    /// A natural number literal.
    pub fn natural(value: u64) -> Self {
        Self::new(ExprKind::NaturalLit(value))
    }

    /// A double literal.
    pub fn double(value: f64) -> Self {
        Self::new(ExprKind::DoubleLit(value))
    }

    /// A boolean literal.
    pub fn boolean(value: bool) -> Self {
        Self::new(ExprKind::BoolLit(value))
    }

    /// A single-chunk text literal.
    pub fn text(chunk: impl Into<String>) -> Self {
        Self::new(ExprKind::TextLit(vec![chunk.into()]))
    }

    /// A text literal from chunks.
    pub fn text_chunks(chunks: Vec<String>) -> Self {
        Self::new(ExprKind::TextLit(chunks))
    }

    /// A list literal. `element_type` is required exactly when `items` is
    /// empty.
    pub fn list(items: Vec<Expr>, element_type: Option<Expr>) -> Self {
        Self::new(ExprKind::ListLit {
            items: items.into_iter().map(Arc::new).collect(),
            element_type: element_type.map(Arc::new),
        })
    }

    /// An inhabited optional literal.
    pub fn some(value: Expr) -> Self {
        Self::new(ExprKind::OptionalLit {
            value: Some(Arc::new(value)),
        })
    }

    /// The empty optional literal.
    pub fn none() -> Self {
        Self::new(ExprKind::OptionalLit { value: None })
    }

    /// A record literal from labeled values.
    pub fn record_lit<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Expr)>,
        S: Into<String>,
    {
        Self::new(ExprKind::RecordLit {
            fields: fields
                .into_iter()
                .map(|(label, value)| (label.into(), Arc::new(value)))
                .collect(),
        })
    }

    /// A union literal from its tag, value, and sibling alternatives.
    pub fn union_lit<I, S>(label: impl Into<String>, value: Expr, alternatives: I) -> Self
    where
        I: IntoIterator<Item = (S, Expr)>,
        S: Into<String>,
    {
        Self::new(ExprKind::UnionLit {
            label: label.into(),
            value: Arc::new(value),
            alternatives: alternatives
                .into_iter()
                .map(|(label, ty)| (label.into(), Arc::new(ty)))
                .collect(),
        })
    }

    /// The type `List element`.
    pub fn list_type(element: Expr) -> Self {
        Self::new(ExprKind::ListType(Arc::new(element)))
    }

    /// The type `Optional wrapped`.
    pub fn optional_type(wrapped: Expr) -> Self {
        Self::new(ExprKind::OptionalType(Arc::new(wrapped)))
    }

    /// A record type from labeled field types.
    pub fn record_type<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Expr)>,
        S: Into<String>,
    {
        Self::new(ExprKind::RecordType {
            fields: fields
                .into_iter()
                .map(|(label, ty)| (label.into(), Arc::new(ty)))
                .collect(),
        })
    }

    /// A union type from labeled alternative types.
    pub fn union_type<I, S>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = (S, Expr)>,
        S: Into<String>,
    {
        Self::new(ExprKind::UnionType {
            alternatives: alternatives
                .into_iter()
                .map(|(label, ty)| (label.into(), Arc::new(ty)))
                .collect(),
        })
    }

    /// A builtin constant.
    pub fn builtin(builtin: Builtin) -> Self {
        Self::new(ExprKind::Builtin(builtin))
    }
}

// Predicates and projections.
impl Expr {
    /// Whether this expression is the given builtin constant.
    #[must_use]
    pub fn is_builtin(&self, builtin: Builtin) -> bool {
        matches!(&self.kind, ExprKind::Builtin(b) if *b == builtin)
    }

    /// The natural value, if this is a natural literal.
    #[must_use]
    pub const fn as_natural(&self) -> Option<u64> {
        match &self.kind {
            ExprKind::NaturalLit(value) => Some(*value),
            _ => None,
        }
    }

    /// The boolean value, if this is a boolean literal.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match &self.kind {
            ExprKind::BoolLit(value) => Some(*value),
            _ => None,
        }
    }

    /// Whether this expression is a variable.
    #[must_use]
    pub const fn is_variable(&self) -> bool {
        matches!(&self.kind, ExprKind::Variable { .. })
    }
}
