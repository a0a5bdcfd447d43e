//! β-evaluation.
//!
//! Evaluation reduces an expression to normal form under its captured
//! substitution context. It never fails: an irreducible redex (such as an
//! application of a non-function) is rebuilt in place, so untyped terms
//! still evaluate to *some* expression. Reduction proceeds under binders,
//! with the bound variable held back by the [`Binding::Bound`] sentinel.

use crate::ast::{BinOp, Builtin, Expr, ExprKind, LetBinding};
use crate::environment::{Binding, ValueEnv};
use log::trace;
use std::sync::Arc;

impl Expr {
    /// The β-normal form of this expression under its captured context.
    #[must_use]
    pub fn evaluated(&self) -> Expr {
        match &self.kind {
            ExprKind::Lambda {
                parameter_name,
                parameter_type,
                body,
            } => Expr::lambda(
                parameter_name.clone(),
                parameter_type.substitute_many(&self.context).evaluated(),
                body.substitute_many(&self.context)
                    .substitute_single(parameter_name.clone(), Binding::Bound)
                    .evaluated(),
            ),
            ExprKind::ForAll {
                parameter_name,
                parameter_type,
                body,
            } => Expr::for_all(
                parameter_name.clone(),
                parameter_type.substitute_many(&self.context).evaluated(),
                body.substitute_many(&self.context)
                    .substitute_single(parameter_name.clone(), Binding::Bound)
                    .evaluated(),
            ),
            ExprKind::Variable { name, scope } => match self.context.get(name, *scope) {
                Some(Binding::Defined(value)) => value.evaluated(),
                _ => self.clone(),
            },
            ExprKind::LetIn { bindings, body } => {
                let mut context = self.context.clone();
                for binding in bindings {
                    let value = binding.value.substitute_many(&context);
                    context =
                        context.shadow_single(binding.name.clone(), Binding::Defined(value.into()));
                }
                body.substitute_many(&context).evaluated()
            }
            ExprKind::Conditional { .. } => {
                let new = self.eval_children();
                let ExprKind::Conditional {
                    condition,
                    if_true,
                    if_false,
                } = &new.kind
                else {
                    return new;
                };
                match condition.as_bool() {
                    Some(true) => (**if_true).clone(),
                    Some(false) => (**if_false).clone(),
                    None => new,
                }
            }
            ExprKind::Annotation { expression, .. } => {
                expression.substitute_many(&self.context).evaluated()
            }
            ExprKind::Application { .. } => {
                let new = self.eval_children();
                let ExprKind::Application { function, argument } = &new.kind else {
                    return new;
                };
                if function.can_apply_to(argument) {
                    trace!("applying `{function}` to `{argument}`");
                    function.apply(argument)
                } else {
                    new
                }
            }
            ExprKind::Operator { .. } => {
                let new = self.eval_children();
                let ExprKind::Operator { op, lhs, rhs } = &new.kind else {
                    return new;
                };
                reduce_operator(*op, lhs, rhs).unwrap_or(new)
            }
            ExprKind::Select { .. } => {
                let new = self.eval_children();
                let ExprKind::Select { expression, label } = &new.kind else {
                    return new;
                };
                if let ExprKind::RecordLit { fields } = &expression.kind {
                    if let Some(field) = fields.get(label) {
                        return (**field).clone();
                    }
                }
                new
            }
            ExprKind::Project { .. } => {
                let new = self.eval_children();
                let ExprKind::Project { expression, labels } = &new.kind else {
                    return new;
                };
                if let ExprKind::RecordLit { fields } = &expression.kind {
                    if labels.iter().all(|label| fields.contains_key(label)) {
                        return Expr::new(ExprKind::RecordLit {
                            fields: labels
                                .iter()
                                .map(|label| (label.clone(), fields[label].clone()))
                                .collect(),
                        });
                    }
                }
                new
            }
            ExprKind::Merge { .. } => {
                let new = self.eval_children();
                let ExprKind::Merge {
                    handlers, union, ..
                } = &new.kind
                else {
                    return new;
                };
                if let (
                    ExprKind::RecordLit { fields },
                    ExprKind::UnionLit { label, value, .. },
                ) = (&handlers.kind, &union.kind)
                {
                    if let Some(handler) = fields.get(label) {
                        if handler.can_apply_to(value) {
                            return handler.apply(value);
                        }
                    }
                }
                new
            }
            _ => self.eval_children(),
        }
    }

    /// Default evaluation: push the captured context down into every child
    /// and evaluate each, rebuilding the node with an empty context.
    fn eval_children(&self) -> Expr {
        let context = self.context.clone();
        self.with_context(ValueEnv::new())
            .map(|child| child.substitute_many(&context).evaluated())
    }

    /// Whether applying `self` to `argument` reduces.
    #[must_use]
    pub fn can_apply_to(&self, argument: &Expr) -> bool {
        match &self.kind {
            ExprKind::Lambda { .. } => true,
            ExprKind::Builtin(Builtin::List | Builtin::ListBuild | Builtin::ListFold) => true,
            ExprKind::Builtin(Builtin::DoubleShow) => {
                matches!(argument.kind, ExprKind::DoubleLit(_))
            }
            ExprKind::ListBuildPartial(_) => true,
            // A union type's selected alternative is its injection
            // constructor.
            ExprKind::Select { expression, label } => matches!(
                &expression.kind,
                ExprKind::UnionType { alternatives } if alternatives.contains_key(label)
            ),
            _ => false,
        }
    }

    /// Applies `self` to `argument`.
    ///
    /// For shapes where [`Expr::can_apply_to`] is false this rebuilds the
    /// application node instead of reducing.
    #[must_use]
    pub fn apply(&self, argument: &Expr) -> Expr {
        match &self.kind {
            ExprKind::Lambda {
                parameter_name,
                body,
                ..
            } => {
                let shifted_argument = argument.shifted(1, parameter_name, 0);
                body.bound_replaced(parameter_name, 0, &shifted_argument)
                    .shifted(-1, parameter_name, 0)
                    .evaluated()
            }
            ExprKind::Builtin(Builtin::List) => Expr::list_type(argument.clone()),
            ExprKind::Builtin(Builtin::ListBuild) => {
                Expr::new(ExprKind::ListBuildPartial(Arc::new(argument.clone())))
            }
            ExprKind::Builtin(Builtin::ListFold) => {
                Expr::new(ExprKind::ListFoldPartial(Arc::new(argument.clone())))
            }
            ExprKind::Builtin(Builtin::DoubleShow) => match &argument.kind {
                ExprKind::DoubleLit(value) => Expr::text(value.to_string()),
                _ => Expr::application(self.clone(), argument.clone()),
            },
            ExprKind::ListBuildPartial(element_type) => {
                self.apply_list_build(element_type, argument)
            }
            ExprKind::Select { expression, label } => match &expression.kind {
                ExprKind::UnionType { alternatives } if alternatives.contains_key(label) => {
                    let mut siblings = alternatives.clone();
                    siblings.shift_remove(label);
                    Expr::new(ExprKind::UnionLit {
                        label: label.clone(),
                        value: Arc::new(argument.clone()),
                        alternatives: siblings,
                    })
                }
                _ => Expr::application(self.clone(), argument.clone()),
            },
            _ => Expr::application(self.clone(), argument.clone()),
        }
    }

    /// `List/build element builder`: either fuse with `List/fold`, or run
    /// the builder against the list constructors.
    fn apply_list_build(&self, element_type: &Expr, builder: &Expr) -> Expr {
        // List/build T (List/fold T xs) reduces straight to xs.
        if let ExprKind::Application { function, argument } = &builder.kind {
            if matches!(function.kind, ExprKind::ListFoldPartial(_)) {
                return (**argument).clone();
            }
        }
        let list_type = Expr::list_type(element_type.clone());
        let cons = Expr::lambda(
            "a",
            element_type.clone(),
            Expr::lambda(
                "as",
                list_type.clone(),
                Expr::operator(
                    BinOp::ListAppend,
                    Expr::list(vec![Expr::var("a")], None),
                    Expr::var("as"),
                ),
            ),
        );
        let nil = Expr::list(vec![], Some(element_type.clone()));
        Expr::application(
            Expr::application(Expr::application(builder.clone(), list_type), cons),
            nil,
        )
        .evaluated()
    }
}

/// Per-operator reduction over evaluated operands. `None` means the
/// operator node is left in place.
fn reduce_operator(op: BinOp, lhs: &Expr, rhs: &Expr) -> Option<Expr> {
    match op {
        BinOp::ListAppend => match (&lhs.kind, &rhs.kind) {
            (
                ExprKind::ListLit {
                    items: left,
                    element_type: left_type,
                },
                ExprKind::ListLit {
                    items: right,
                    element_type: right_type,
                },
            ) => {
                let items: Vec<Arc<Expr>> = left.iter().chain(right).cloned().collect();
                let element_type = if items.is_empty() {
                    left_type.clone().or_else(|| right_type.clone())
                } else {
                    None
                };
                Some(Expr::new(ExprKind::ListLit {
                    items,
                    element_type,
                }))
            }
            _ => None,
        },
        BinOp::Plus => match (lhs.as_natural(), rhs.as_natural()) {
            (Some(a), Some(b)) => Some(Expr::natural(a + b)),
            _ => None,
        },
        BinOp::Times => match (lhs.as_natural(), rhs.as_natural()) {
            (Some(a), Some(b)) => Some(Expr::natural(a * b)),
            _ => None,
        },
        BinOp::Or => reduce_boolean(lhs, rhs, true),
        BinOp::And => reduce_boolean(lhs, rhs, false),
    }
}

/// `||` and `&&` are duals: `absorbing` is the literal that decides the
/// result on its own (`True` for `||`, `False` for `&&`).
fn reduce_boolean(lhs: &Expr, rhs: &Expr, absorbing: bool) -> Option<Expr> {
    if let Some(value) = lhs.as_bool() {
        return Some(if value == absorbing {
            Expr::boolean(absorbing)
        } else {
            rhs.clone()
        });
    }
    if let Some(value) = rhs.as_bool() {
        return Some(if value == absorbing {
            Expr::boolean(absorbing)
        } else {
            lhs.clone()
        });
    }
    if lhs.normalized() == rhs.normalized() {
        return Some(lhs.clone());
    }
    None
}

// Scope-index bookkeeping for β-substitution. Substituting under binders
// shifts the argument's free occurrences of the shadowed name so they keep
// pointing past the binder.
impl Expr {
    /// Adjusts free occurrences of `name` at scope ≥ `cutoff` by `delta`.
    fn shifted(&self, delta: i64, name: &str, cutoff: usize) -> Expr {
        match &self.kind {
            ExprKind::Variable { name: n, scope } if n == name && *scope >= cutoff => Expr {
                kind: ExprKind::Variable {
                    name: n.clone(),
                    scope: usize::try_from(*scope as i64 + delta).unwrap_or(0),
                },
                context: self.context.clone(),
            },
            ExprKind::Lambda {
                parameter_name,
                parameter_type,
                body,
            } => {
                let inner = cutoff + usize::from(parameter_name == name);
                Expr {
                    kind: ExprKind::Lambda {
                        parameter_name: parameter_name.clone(),
                        parameter_type: Arc::new(parameter_type.shifted(delta, name, cutoff)),
                        body: Arc::new(body.shifted(delta, name, inner)),
                    },
                    context: self.context.clone(),
                }
            }
            ExprKind::ForAll {
                parameter_name,
                parameter_type,
                body,
            } => {
                let inner = cutoff + usize::from(parameter_name == name);
                Expr {
                    kind: ExprKind::ForAll {
                        parameter_name: parameter_name.clone(),
                        parameter_type: Arc::new(parameter_type.shifted(delta, name, cutoff)),
                        body: Arc::new(body.shifted(delta, name, inner)),
                    },
                    context: self.context.clone(),
                }
            }
            ExprKind::LetIn { bindings, body } => {
                let mut cutoff = cutoff;
                let mut shifted_bindings = Vec::with_capacity(bindings.len());
                for binding in bindings {
                    shifted_bindings.push(LetBinding {
                        name: binding.name.clone(),
                        value: Arc::new(binding.value.shifted(delta, name, cutoff)),
                        annotation: binding
                            .annotation
                            .as_ref()
                            .map(|t| Arc::new(t.shifted(delta, name, cutoff))),
                    });
                    cutoff += usize::from(binding.name == name);
                }
                Expr {
                    kind: ExprKind::LetIn {
                        bindings: shifted_bindings,
                        body: Arc::new(body.shifted(delta, name, cutoff)),
                    },
                    context: self.context.clone(),
                }
            }
            _ => self.map(|child| child.shifted(delta, name, cutoff)),
        }
    }

    /// Replaces occurrences of `name` at exactly `scope` with `value`,
    /// shifting `value` as binders are crossed.
    fn bound_replaced(&self, name: &str, scope: usize, value: &Expr) -> Expr {
        match &self.kind {
            ExprKind::Variable { name: n, scope: s } if n == name && *s == scope => value.clone(),
            ExprKind::Lambda {
                parameter_name,
                parameter_type,
                body,
            } => {
                let inner_scope = scope + usize::from(parameter_name == name);
                let inner_value = value.shifted(1, parameter_name, 0);
                Expr {
                    kind: ExprKind::Lambda {
                        parameter_name: parameter_name.clone(),
                        parameter_type: Arc::new(
                            parameter_type.bound_replaced(name, scope, value),
                        ),
                        body: Arc::new(body.bound_replaced(name, inner_scope, &inner_value)),
                    },
                    context: self.context.clone(),
                }
            }
            ExprKind::ForAll {
                parameter_name,
                parameter_type,
                body,
            } => {
                let inner_scope = scope + usize::from(parameter_name == name);
                let inner_value = value.shifted(1, parameter_name, 0);
                Expr {
                    kind: ExprKind::ForAll {
                        parameter_name: parameter_name.clone(),
                        parameter_type: Arc::new(
                            parameter_type.bound_replaced(name, scope, value),
                        ),
                        body: Arc::new(body.bound_replaced(name, inner_scope, &inner_value)),
                    },
                    context: self.context.clone(),
                }
            }
            ExprKind::LetIn { bindings, body } => {
                let mut scope = scope;
                let mut value = value.clone();
                let mut replaced_bindings = Vec::with_capacity(bindings.len());
                for binding in bindings {
                    replaced_bindings.push(LetBinding {
                        name: binding.name.clone(),
                        value: Arc::new(binding.value.bound_replaced(name, scope, &value)),
                        annotation: binding
                            .annotation
                            .as_ref()
                            .map(|t| Arc::new(t.bound_replaced(name, scope, &value))),
                    });
                    scope += usize::from(binding.name == name);
                    value = value.shifted(1, &binding.name, 0);
                }
                Expr {
                    kind: ExprKind::LetIn {
                        bindings: replaced_bindings,
                        body: Arc::new(body.bound_replaced(name, scope, &value)),
                    },
                    context: self.context.clone(),
                }
            }
            _ => self.map(|child| child.bound_replaced(name, scope, value)),
        }
    }
}
