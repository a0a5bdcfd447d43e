//! The per-variant typing rules.

use crate::ast::{BinOp, Builtin, Expr, ExprKind, DEFAULT_VARIABLE_NAME};
use crate::builtins;
use crate::diagnostics::{Error, Result};
use crate::environment::{Binding, TypeBinding, TypeEnv};
use indexmap::IndexMap;
use log::debug;
use std::sync::Arc;

/// α/β-equivalence: two expressions are equivalent when their evaluated,
/// α-normalized forms are structurally identical.
#[must_use]
pub fn equivalent(a: &Expr, b: &Expr) -> bool {
    a.evaluated().normalized() == b.evaluated().normalized()
}

/// Decides which universe a dependent product inhabits, given the
/// universes of its parameter and result.
///
/// Functions into values are values; polymorphism over types lives in
/// `Kind`; abstraction over kinds lives in `Sort`. Every other combination
/// is rejected.
pub fn function_check(parameter: &Expr, result: &Expr) -> Result<Expr> {
    if result.is_builtin(Builtin::Type) {
        return Ok(Expr::builtin(Builtin::Type));
    }
    if parameter.is_builtin(Builtin::Kind) && result.is_builtin(Builtin::Kind) {
        return Ok(Expr::builtin(Builtin::Kind));
    }
    if parameter.is_builtin(Builtin::Sort)
        && (result.is_builtin(Builtin::Kind) || result.is_builtin(Builtin::Sort))
    {
        return Ok(Expr::builtin(Builtin::Sort));
    }
    Err(Box::new(Error::function_check_failed(parameter, result)))
}

impl Expr {
    /// Infers the type of this expression under an empty typing
    /// environment.
    pub fn type_of(&self) -> Result<(Expr, TypeEnv)> {
        self.type_of_in(&TypeEnv::new())
    }

    /// Infers the type of this expression, returning it together with the
    /// environment in which the type is valid.
    ///
    /// Failures are wrapped with this expression's canonical form and the
    /// active typing context, building up a trace as inference unwinds.
    pub fn type_of_in(&self, ctx: &TypeEnv) -> Result<(Expr, TypeEnv)> {
        self.infer(ctx).map_err(|source| {
            debug!("type inference failed for `{self}`");
            Box::new(Error::type_inference(self, ctx, source))
        })
    }

    /// The inferred type, evaluated and α-normalized.
    pub fn normalized_type_in(&self, ctx: &TypeEnv) -> Result<Expr> {
        let (ty, _) = self.type_of_in(ctx)?;
        Ok(ty.evaluated().normalized())
    }

    fn infer(&self, ctx: &TypeEnv) -> Result<(Expr, TypeEnv)> {
        match &self.kind {
            ExprKind::Lambda {
                parameter_name,
                parameter_type,
                body,
            } => {
                let parameter_type = parameter_type.substitute_many(&self.context);
                let (body_type, _) = body.substitute_many(&self.context).type_of_in(
                    &ctx.shadow_single(
                        parameter_name.clone(),
                        TypeBinding::declared(parameter_type.clone(), ctx.clone()),
                    ),
                )?;
                let lambda_type = Expr::for_all(parameter_name.clone(), parameter_type, body_type);
                // The Π-type must itself typecheck; this enforces universe
                // consistency of the abstraction.
                lambda_type.type_of_in(ctx)?;
                Ok((lambda_type, ctx.clone()))
            }
            ExprKind::ForAll {
                parameter_name,
                parameter_type,
                body,
            } => {
                let parameter_type = parameter_type.substitute_many(&self.context);
                let parameter_universe = parameter_type.normalized_type_in(ctx)?;
                let body_universe = body.substitute_many(&self.context).normalized_type_in(
                    &ctx.shadow_single(
                        parameter_name.clone(),
                        TypeBinding::declared(parameter_type, ctx.clone()),
                    ),
                )?;
                Ok((
                    function_check(&parameter_universe, &body_universe)?,
                    TypeEnv::new(),
                ))
            }
            ExprKind::Variable { name, scope } => {
                if let Some(Binding::Defined(value)) = self.context.get(name, *scope) {
                    return value.type_of_in(ctx);
                }
                if let Some(binding) = ctx.get(name, *scope) {
                    if let Some(value) = &binding.value {
                        return value.type_of_in(&binding.covering);
                    }
                    if let Some(ty) = &binding.ty {
                        return Ok(((**ty).clone(), binding.covering.clone()));
                    }
                }
                Err(Box::new(Error::unbound_variable(self)))
            }
            ExprKind::LetIn { bindings, body } => {
                let mut context = self.context.clone();
                for binding in bindings {
                    let value = binding.value.substitute_many(&context);
                    let (value_type, _) = value.type_of_in(ctx)?;
                    if let Some(annotation) = &binding.annotation {
                        let annotation = annotation.substitute_many(&context);
                        annotation.type_of_in(ctx)?;
                        if !equivalent(&annotation, &value_type) {
                            return Err(Box::new(Error::annotation_mismatch(
                                &annotation,
                                &value_type,
                            )));
                        }
                    }
                    // Values stay transparent to later bindings and the
                    // body.
                    context = context.shadow_single(binding.name.clone(), Binding::Defined(value.into()));
                }
                body.substitute_many(&context).type_of_in(ctx)
            }
            ExprKind::Conditional {
                condition,
                if_true,
                if_false,
            } => {
                let condition = condition.substitute_many(&self.context);
                let condition_type = condition.normalized_type_in(ctx)?;
                if !condition_type.is_builtin(Builtin::Bool) {
                    return Err(Box::new(Error::type_error(format!(
                        "a conditional's condition must have type `Bool`, but `{condition}` has type `{condition_type}`"
                    ))));
                }
                let (true_type, true_ctx) =
                    if_true.substitute_many(&self.context).type_of_in(ctx)?;
                let (false_type, _) =
                    if_false.substitute_many(&self.context).type_of_in(ctx)?;
                if !equivalent(&true_type, &false_type) {
                    return Err(Box::new(Error::type_error(format!(
                        "both branches of a conditional must have the same type, but got `{true_type}` and `{false_type}`"
                    ))));
                }
                Ok((true_type, true_ctx))
            }
            ExprKind::Annotation {
                expression,
                annotation,
            } => {
                let annotation = annotation.substitute_many(&self.context);
                annotation.type_of_in(ctx)?;
                let (actual, _) = expression.substitute_many(&self.context).type_of_in(ctx)?;
                if !equivalent(&actual, &annotation) {
                    return Err(Box::new(Error::annotation_mismatch(&annotation, &actual)));
                }
                Ok((annotation, ctx.clone()))
            }
            ExprKind::Application { function, argument } => {
                let function = function.substitute_many(&self.context);
                let argument_expr = argument.substitute_many(&self.context);
                let function_type = function.normalized_type_in(ctx)?;
                let ExprKind::ForAll {
                    parameter_name,
                    parameter_type,
                    body,
                } = &function_type.kind
                else {
                    return Err(Box::new(Error::not_a_function(&function)));
                };
                let (argument_type, argument_type_ctx) = argument_expr.type_of_in(ctx)?;
                if !equivalent(&argument_type, parameter_type) {
                    return Err(Box::new(Error::argument_mismatch(
                        parameter_type,
                        &argument_type,
                    )));
                }
                Ok((
                    (**body).clone(),
                    ctx.shadow_single(
                        parameter_name.clone(),
                        TypeBinding::defined(argument.clone(), argument_type_ctx),
                    ),
                ))
            }
            ExprKind::Operator { op, lhs, rhs } => {
                self.infer_operator(*op, lhs, rhs, ctx)
            }
            ExprKind::Select { expression, label } => {
                let expression = expression.substitute_many(&self.context);
                let evaluated = expression.evaluated();
                match &evaluated.kind {
                    ExprKind::UnionType { alternatives } => {
                        evaluated.type_of_in(ctx)?;
                        let Some(payload) = alternatives.get(label) else {
                            return Err(Box::new(Error::missing_field(label, &evaluated)));
                        };
                        // Selecting an alternative yields the union's
                        // injection constructor.
                        Ok((
                            Expr::for_all(
                                DEFAULT_VARIABLE_NAME,
                                (**payload).clone(),
                                evaluated.clone(),
                            ),
                            ctx.shadow_single(DEFAULT_VARIABLE_NAME, TypeBinding::opaque()),
                        ))
                    }
                    ExprKind::RecordLit { fields } => {
                        evaluated.type_of_in(ctx)?;
                        let Some(field) = fields.get(label) else {
                            return Err(Box::new(Error::missing_field(label, &evaluated)));
                        };
                        field.type_of_in(ctx)
                    }
                    _ => Err(Box::new(Error::type_error(format!(
                        "can't select `{label}` from `{expression}`"
                    )))),
                }
            }
            ExprKind::Project { expression, labels } => {
                let expression = expression.substitute_many(&self.context);
                let expression_type = expression.normalized_type_in(ctx)?;
                let ExprKind::RecordType { fields } = &expression_type.kind else {
                    return Err(Box::new(Error::type_error(format!(
                        "an expression to project fields from must be a record, but `{expression}` has type `{expression_type}`"
                    ))));
                };
                let mut projected = IndexMap::new();
                for label in labels {
                    let Some(ty) = fields.get(label) else {
                        return Err(Box::new(Error::missing_field(label, &expression_type)));
                    };
                    projected.insert(label.clone(), ty.clone());
                }
                Ok((
                    Expr::new(ExprKind::RecordType { fields: projected }),
                    ctx.clone(),
                ))
            }
            ExprKind::Merge {
                handlers,
                union,
                annotation,
            } => self.infer_merge(handlers, union, annotation.as_deref(), ctx),
            ExprKind::Import { source } => {
                Err(Box::new(Error::unresolved_import(source.clone())))
            }
            ExprKind::NaturalLit(_) => Ok((Expr::builtin(Builtin::Natural), TypeEnv::new())),
            ExprKind::DoubleLit(_) => Ok((Expr::builtin(Builtin::Double), TypeEnv::new())),
            ExprKind::BoolLit(_) => Ok((Expr::builtin(Builtin::Bool), TypeEnv::new())),
            ExprKind::TextLit(_) => Ok((Expr::builtin(Builtin::Text), TypeEnv::new())),
            ExprKind::ListLit {
                items,
                element_type,
            } => {
                if items.is_empty() {
                    let Some(element_type) = element_type else {
                        return Err(Box::new(Error::type_error(
                            "an empty list needs an element type annotation",
                        )));
                    };
                    let element_type = element_type.substitute_many(&self.context);
                    let element_universe = element_type.normalized_type_in(ctx)?;
                    if !element_universe.is_builtin(Builtin::Type) {
                        return Err(Box::new(Error::type_error(format!(
                            "a list's element type must be a `Type`, but `{element_type}` has type `{element_universe}`"
                        ))));
                    }
                    return Ok((Expr::list_type(element_type), ctx.clone()));
                }
                let (first_type, _) = items[0].substitute_many(&self.context).type_of_in(ctx)?;
                for item in &items[1..] {
                    let (item_type, _) =
                        item.substitute_many(&self.context).type_of_in(ctx)?;
                    if !equivalent(&first_type, &item_type) {
                        return Err(Box::new(Error::type_error(format!(
                            "a list's elements must all have the same type, but got `{first_type}` and `{item_type}`"
                        ))));
                    }
                }
                Ok((Expr::list_type(first_type), ctx.clone()))
            }
            ExprKind::OptionalLit { value } => match value {
                Some(value) => {
                    let (value_type, _) =
                        value.substitute_many(&self.context).type_of_in(ctx)?;
                    Ok((Expr::optional_type(value_type), ctx.clone()))
                }
                None => Err(Box::new(Error::type_error(
                    "can't infer the type of an empty optional literal",
                ))),
            },
            ExprKind::RecordLit { fields } => {
                let mut field_types = IndexMap::new();
                for (label, value) in fields {
                    let (field_type, _) =
                        value.substitute_many(&self.context).type_of_in(ctx)?;
                    field_types.insert(label.clone(), Arc::new(field_type));
                }
                Ok((
                    Expr::new(ExprKind::RecordType {
                        fields: field_types,
                    }),
                    ctx.clone(),
                ))
            }
            ExprKind::UnionLit {
                label,
                value,
                alternatives,
            } => {
                if alternatives.contains_key(label) {
                    return Err(Box::new(Error::type_error("nonunique union labels")));
                }
                let (value_type, _) = value.substitute_many(&self.context).type_of_in(ctx)?;
                let mut union_alternatives = IndexMap::new();
                union_alternatives.insert(label.clone(), Arc::new(value_type));
                for (label, ty) in alternatives {
                    union_alternatives.insert(label.clone(), ty.clone());
                }
                Ok((
                    Expr::new(ExprKind::UnionType {
                        alternatives: union_alternatives,
                    }),
                    ctx.clone(),
                ))
            }
            ExprKind::ListType(element) => {
                let element = element.substitute_many(&self.context);
                let element_universe = element.normalized_type_in(ctx)?;
                if !element_universe.is_builtin(Builtin::Type) {
                    return Err(Box::new(Error::type_error(format!(
                        "a list's element type must be a `Type`, but `{element}` has type `{element_universe}`"
                    ))));
                }
                Ok((Expr::builtin(Builtin::Type), TypeEnv::new()))
            }
            ExprKind::OptionalType(wrapped) => {
                let wrapped = wrapped.substitute_many(&self.context);
                let wrapped_universe = wrapped.normalized_type_in(ctx)?;
                if !wrapped_universe.is_builtin(Builtin::Type) {
                    return Err(Box::new(Error::type_error(format!(
                        "an optional's wrapped type must be a `Type`, but `{wrapped}` has type `{wrapped_universe}`"
                    ))));
                }
                Ok((Expr::builtin(Builtin::Type), TypeEnv::new()))
            }
            ExprKind::RecordType { fields } => self.infer_record_type(fields, ctx),
            ExprKind::UnionType { alternatives } => self.infer_union_type(alternatives, ctx),
            ExprKind::Builtin(builtin) => match builtins::signature(*builtin) {
                Some(signature) => Ok((signature, TypeEnv::new())),
                None => match builtin {
                    Builtin::Sort => Err(Box::new(Error::SortHasNoType)),
                    _ => Err(Box::new(Error::type_error(format!(
                        "`{builtin}` is typed only after it is applied to an element type"
                    )))),
                },
            },
            ExprKind::ListBuildPartial(element) => {
                let element = element.substitute_many(&self.context);
                Ok((
                    Expr::for_all(
                        DEFAULT_VARIABLE_NAME,
                        builtins::builder_signature(element.clone()),
                        Expr::list_type(element),
                    ),
                    TypeEnv::new(),
                ))
            }
            ExprKind::ListFoldPartial(element) => {
                let element = element.substitute_many(&self.context);
                Ok((
                    Expr::for_all(
                        DEFAULT_VARIABLE_NAME,
                        Expr::list_type(element.clone()),
                        builtins::builder_signature(element),
                    ),
                    TypeEnv::new(),
                ))
            }
        }
    }

    fn infer_operator(
        &self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        ctx: &TypeEnv,
    ) -> Result<(Expr, TypeEnv)> {
        let lhs = lhs.substitute_many(&self.context);
        let rhs = rhs.substitute_many(&self.context);
        let lhs_type = lhs.normalized_type_in(ctx)?;
        let rhs_type = rhs.normalized_type_in(ctx)?;
        match op {
            BinOp::Plus | BinOp::Times => {
                for (operand, ty) in [(&lhs, &lhs_type), (&rhs, &rhs_type)] {
                    if !ty.is_builtin(Builtin::Natural) {
                        return Err(Box::new(Error::type_error(format!(
                            "`{op}` expects operands of type `Natural`, but `{operand}` has type `{ty}`"
                        ))));
                    }
                }
                Ok((Expr::builtin(Builtin::Natural), TypeEnv::new()))
            }
            BinOp::Or | BinOp::And => {
                for (operand, ty) in [(&lhs, &lhs_type), (&rhs, &rhs_type)] {
                    if !ty.is_builtin(Builtin::Bool) {
                        return Err(Box::new(Error::type_error(format!(
                            "`{op}` expects operands of type `Bool`, but `{operand}` has type `{ty}`"
                        ))));
                    }
                }
                Ok((Expr::builtin(Builtin::Bool), TypeEnv::new()))
            }
            BinOp::ListAppend => {
                if !matches!(lhs_type.kind, ExprKind::ListType(_)) {
                    return Err(Box::new(Error::type_error(format!(
                        "`#` expects list operands, but `{lhs}` has type `{lhs_type}`"
                    ))));
                }
                if !matches!(rhs_type.kind, ExprKind::ListType(_)) {
                    return Err(Box::new(Error::type_error(format!(
                        "`#` expects list operands, but `{rhs}` has type `{rhs_type}`"
                    ))));
                }
                if !equivalent(&lhs_type, &rhs_type) {
                    return Err(Box::new(Error::type_error(format!(
                        "can't concatenate lists of different types `{lhs_type}` and `{rhs_type}`"
                    ))));
                }
                Ok((lhs_type, ctx.clone()))
            }
        }
    }

    fn infer_merge(
        &self,
        handlers: &Expr,
        union: &Expr,
        annotation: Option<&Expr>,
        ctx: &TypeEnv,
    ) -> Result<(Expr, TypeEnv)> {
        let handlers = handlers.substitute_many(&self.context);
        let handlers_type = handlers.normalized_type_in(ctx)?;
        let ExprKind::RecordType {
            fields: handler_types,
        } = &handlers_type.kind
        else {
            return Err(Box::new(Error::type_error(format!(
                "expected a record as the first argument to `merge`, but `{handlers}` has type `{handlers_type}`"
            ))));
        };

        let union = union.substitute_many(&self.context);
        let union_type = union.normalized_type_in(ctx)?;
        let ExprKind::UnionType { alternatives } = &union_type.kind else {
            return Err(Box::new(Error::type_error(format!(
                "expected a union as the second argument to `merge`, but `{union}` has type `{union_type}`"
            ))));
        };

        // Normalization sorted both label sets, so they must line up
        // exactly.
        let handler_labels: Vec<&String> = handler_types.keys().collect();
        let union_labels: Vec<&String> = alternatives.keys().collect();
        if handler_labels != union_labels {
            return Err(Box::new(Error::type_error(
                "a merge's union and handlers must have exactly the same field names",
            )));
        }

        let mut output: Option<(Expr, TypeEnv)> = None;
        if let Some(annotation) = annotation {
            let annotation = annotation.substitute_many(&self.context);
            output = Some((annotation.evaluated(), ctx.clone()));
        }

        for (label, handler_type) in handler_types {
            let input_type = &alternatives[label];
            let ExprKind::ForAll {
                parameter_name,
                parameter_type,
                body,
            } = &handler_type.kind
            else {
                return Err(Box::new(Error::type_error(format!(
                    "the handler for field `{label}` is not a function, but `{handler_type}`"
                ))));
            };
            if !equivalent(parameter_type, input_type) {
                return Err(Box::new(Error::type_error(format!(
                    "the handler for field `{label}` expects `{parameter_type}` as input, but the union contains `{input_type}`"
                ))));
            }
            // The handler's parameter must not appear free in its output
            // type.
            let body_ctx = ctx.shadow_single(parameter_name.clone(), TypeBinding::opaque());
            if let Some((previous, _)) = &output {
                if previous.evaluated().normalized() != body.evaluated().normalized() {
                    return Err(Box::new(Error::type_error(format!(
                        "handler output types don't match: `{previous}` and `{body}`"
                    ))));
                }
            }
            output = Some(((**body).clone(), body_ctx));
        }

        match output {
            Some(output) => Ok(output),
            None => Err(Box::new(Error::type_error(
                "an empty merge expression needs a type annotation",
            ))),
        }
    }

    fn infer_record_type(
        &self,
        fields: &IndexMap<String, Arc<Expr>>,
        ctx: &TypeEnv,
    ) -> Result<(Expr, TypeEnv)> {
        if fields.is_empty() {
            return Ok((Expr::builtin(Builtin::Type), TypeEnv::new()));
        }
        let mut universes = Vec::with_capacity(fields.len());
        for (_, field) in fields {
            let field = field.substitute_many(&self.context);
            let universe = field.normalized_type_in(ctx)?;
            // The only inhabitant of `Sort` allowed as a field is `Kind`
            // itself.
            if universe.is_builtin(Builtin::Sort) && !equivalent(&field, &Expr::builtin(Builtin::Kind))
            {
                return Err(Box::new(Error::type_error(format!(
                    "expected `Kind` in a record type field, but got `{field}`"
                ))));
            }
            universes.push(universe);
        }
        if universes.iter().all(|u| u.is_builtin(Builtin::Type)) {
            return Ok((Expr::builtin(Builtin::Type), TypeEnv::new()));
        }
        if universes
            .iter()
            .all(|u| u.is_builtin(Builtin::Kind) || u.is_builtin(Builtin::Sort))
        {
            return Ok((Expr::builtin(Builtin::Sort), TypeEnv::new()));
        }
        Err(Box::new(Error::type_error(
            "all record type members must be of type `Type`, or all must be of type `Kind` or `Sort`",
        )))
    }

    fn infer_union_type(
        &self,
        alternatives: &IndexMap<String, Arc<Expr>>,
        ctx: &TypeEnv,
    ) -> Result<(Expr, TypeEnv)> {
        if alternatives.is_empty() {
            return Ok((Expr::builtin(Builtin::Type), TypeEnv::new()));
        }
        let mut universe: Option<Expr> = None;
        for (_, alternative) in alternatives {
            let alternative = alternative.substitute_many(&self.context);
            let alternative_universe = alternative.normalized_type_in(ctx)?;
            if !matches!(
                alternative_universe.kind,
                ExprKind::Builtin(Builtin::Type | Builtin::Kind | Builtin::Sort)
            ) {
                return Err(Box::new(Error::type_error(
                    "only `Type`, `Kind` and `Sort` are allowed as union type alternatives",
                )));
            }
            match &universe {
                None => universe = Some(alternative_universe),
                Some(first) => {
                    if *first != alternative_universe {
                        return Err(Box::new(Error::type_error(
                            "all alternatives of a union type must have the same type",
                        )));
                    }
                }
            }
        }
        let universe = universe.ok_or_else(|| {
            Box::new(Error::type_error(
                "only `Type`, `Kind` and `Sort` are allowed as union type alternatives",
            ))
        })?;
        Ok((universe, TypeEnv::new()))
    }
}
