//! α-normalization.
//!
//! Every binder's parameter is renamed to [`DEFAULT_VARIABLE_NAME`] and
//! bound occurrences are re-indexed through [`RenameEnv::age`], so any two
//! α-equivalent expressions normalize to syntactically equal trees. Record
//! and union types additionally sort their members by label, giving the
//! canonical form used for structural comparison.

use crate::ast::{Expr, ExprKind, LetBinding, DEFAULT_VARIABLE_NAME};
use crate::environment::RenameEnv;
use indexmap::IndexMap;
use std::sync::Arc;

impl Expr {
    /// The α-normal form of this expression.
    #[must_use]
    pub fn normalized(&self) -> Expr {
        self.normalized_in(&RenameEnv::new())
    }

    /// α-normalizes under a renaming environment carrying the canonical
    /// names of enclosing binders.
    #[must_use]
    pub fn normalized_in(&self, ctx: &RenameEnv) -> Expr {
        match &self.kind {
            ExprKind::Lambda {
                parameter_name,
                parameter_type,
                body,
            } => Expr::lambda(
                DEFAULT_VARIABLE_NAME,
                parameter_type.normalized_in(ctx),
                body.normalized_in(
                    &ctx.shadow_single(parameter_name.clone(), DEFAULT_VARIABLE_NAME.to_string()),
                ),
            ),
            ExprKind::ForAll {
                parameter_name,
                parameter_type,
                body,
            } => Expr::for_all(
                DEFAULT_VARIABLE_NAME,
                parameter_type.normalized_in(ctx),
                body.normalized_in(
                    &ctx.shadow_single(parameter_name.clone(), DEFAULT_VARIABLE_NAME.to_string()),
                ),
            ),
            ExprKind::Variable { name, scope } => {
                match (ctx.get(name, *scope), ctx.age(name, *scope)) {
                    // Bound: take the canonical name and its current depth.
                    (Some(canonical), Some(age)) => Expr::var_at(canonical.clone(), age),
                    // Free: untouched.
                    _ => self.clone(),
                }
            }
            ExprKind::LetIn { bindings, body } => {
                let mut ctx = ctx.clone();
                let mut normalized_bindings = Vec::with_capacity(bindings.len());
                for binding in bindings {
                    normalized_bindings.push(LetBinding {
                        name: DEFAULT_VARIABLE_NAME.to_string(),
                        value: Arc::new(binding.value.normalized_in(&ctx)),
                        annotation: binding
                            .annotation
                            .as_ref()
                            .map(|t| Arc::new(t.normalized_in(&ctx))),
                    });
                    ctx = ctx
                        .shadow_single(binding.name.clone(), DEFAULT_VARIABLE_NAME.to_string());
                }
                Expr::new(ExprKind::LetIn {
                    bindings: normalized_bindings,
                    body: Arc::new(body.normalized_in(&ctx)),
                })
            }
            ExprKind::RecordType { fields } => Expr::new(ExprKind::RecordType {
                fields: sorted_by_label(fields, |ty| ty.normalized_in(ctx)),
            }),
            ExprKind::UnionType { alternatives } => Expr::new(ExprKind::UnionType {
                alternatives: sorted_by_label(alternatives, |ty| ty.normalized_in(ctx)),
            }),
            ExprKind::Builtin(_) => self.clone(),
            _ => self.map(|child| child.normalized_in(ctx)),
        }
    }
}

fn sorted_by_label<F>(members: &IndexMap<String, Arc<Expr>>, mut f: F) -> IndexMap<String, Arc<Expr>>
where
    F: FnMut(&Expr) -> Expr,
{
    let mut sorted: Vec<(String, Arc<Expr>)> = members
        .iter()
        .map(|(label, ty)| (label.clone(), Arc::new(f(ty))))
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted.into_iter().collect()
}
