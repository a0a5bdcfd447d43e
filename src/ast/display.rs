//! Canonical text rendering of expressions.
//!
//! This is the diagnostic surface form used in error messages and equality
//! traces; it is not a parser-grade pretty-printer.

use super::{BinOp, Builtin, Expr, ExprKind};
use std::fmt;

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Lambda {
                parameter_name,
                parameter_type,
                body,
            } => write!(f, "λ({parameter_name} : {parameter_type}) → {body}"),
            ExprKind::ForAll {
                parameter_name,
                parameter_type,
                body,
            } => write!(f, "∀({parameter_name} : {parameter_type}) → {body}"),
            ExprKind::Variable { name, scope } => {
                if *scope == 0 {
                    write!(f, "{name}")
                } else {
                    write!(f, "{name}@{scope}")
                }
            }
            ExprKind::LetIn { bindings, body } => {
                for binding in bindings {
                    match &binding.annotation {
                        Some(annotation) => write!(
                            f,
                            "let {} = {} : {} ",
                            binding.name, binding.value, annotation
                        )?,
                        None => write!(f, "let {} = {} ", binding.name, binding.value)?,
                    }
                }
                write!(f, "in {body}")
            }
            ExprKind::Conditional {
                condition,
                if_true,
                if_false,
            } => write!(f, "if {condition} then {if_true} else {if_false}"),
            ExprKind::Annotation {
                expression,
                annotation,
            } => write!(f, "{expression} : {annotation}"),
            ExprKind::Application { function, argument } => write!(f, "({function} {argument})"),
            ExprKind::Operator { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            ExprKind::Select { expression, label } => write!(f, "{expression}.{label}"),
            ExprKind::Project { expression, labels } => {
                write!(f, "{expression}.{{{}}}", labels.join(", "))
            }
            ExprKind::Merge {
                handlers,
                union,
                annotation,
            } => match annotation {
                Some(annotation) => write!(f, "merge {handlers} {union} : {annotation}"),
                None => write!(f, "merge {handlers} {union}"),
            },
            ExprKind::Import { source } => write!(f, "{source}"),
            ExprKind::NaturalLit(value) => write!(f, "{value}"),
            ExprKind::DoubleLit(value) => write!(f, "{value}"),
            ExprKind::BoolLit(value) => write!(f, "{}", if *value { "True" } else { "False" }),
            ExprKind::TextLit(chunks) => write!(f, "\"{}\"", chunks.concat()),
            ExprKind::ListLit {
                items,
                element_type,
            } => {
                if items.is_empty() {
                    match element_type {
                        Some(element_type) => write!(f, "[] : {element_type}"),
                        None => write!(f, "[]"),
                    }
                } else {
                    write!(f, "[")?;
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{item}")?;
                    }
                    write!(f, "]")
                }
            }
            ExprKind::OptionalLit { value } => match value {
                Some(value) => write!(f, "Some {value}"),
                None => write!(f, "None"),
            },
            ExprKind::RecordLit { fields } => {
                if fields.is_empty() {
                    return write!(f, "{{=}}");
                }
                write!(f, "{{ ")?;
                for (i, (label, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{label} = {value}")?;
                }
                write!(f, " }}")
            }
            ExprKind::UnionLit {
                label,
                value,
                alternatives,
            } => {
                write!(f, "< {label} = {value}")?;
                for (label, ty) in alternatives {
                    write!(f, " | {label} : {ty}")?;
                }
                write!(f, " >")
            }
            ExprKind::ListType(element) => write!(f, "List {element}"),
            ExprKind::OptionalType(wrapped) => write!(f, "Optional {wrapped}"),
            ExprKind::RecordType { fields } => {
                if fields.is_empty() {
                    return write!(f, "{{}}");
                }
                write!(f, "{{ ")?;
                for (i, (label, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{label} : {ty}")?;
                }
                write!(f, " }}")
            }
            ExprKind::UnionType { alternatives } => {
                if alternatives.is_empty() {
                    return write!(f, "<>");
                }
                write!(f, "< ")?;
                for (i, (label, ty)) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{label} : {ty}")?;
                }
                write!(f, " >")
            }
            ExprKind::Builtin(builtin) => write!(f, "{builtin}"),
            ExprKind::ListBuildPartial(element) => write!(f, "(List/build {element})"),
            ExprKind::ListFoldPartial(element) => write!(f, "(List/fold {element})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Expr;
    use crate::ast::{BinOp, Builtin};

    #[test]
    fn lambda_renders_with_arrow() {
        let expr = Expr::lambda("x", Expr::builtin(Builtin::Natural), Expr::var("x"));
        assert_eq!(expr.to_string(), "λ(x : Natural) → x");
    }

    #[test]
    fn variables_at_depth_render_with_scope() {
        assert_eq!(Expr::var("x").to_string(), "x");
        assert_eq!(Expr::var_at("x", 2).to_string(), "x@2");
    }

    #[test]
    fn operators_render_parenthesized() {
        let expr = Expr::operator(BinOp::Plus, Expr::var("x"), Expr::natural(1));
        assert_eq!(expr.to_string(), "(x + 1)");
    }

    #[test]
    fn empty_list_renders_its_element_type() {
        let expr = Expr::list(vec![], Some(Expr::builtin(Builtin::Natural)));
        assert_eq!(expr.to_string(), "[] : Natural");
    }

    #[test]
    fn union_type_renders_alternatives() {
        let expr = Expr::union_type([
            ("Left", Expr::builtin(Builtin::Natural)),
            ("Right", Expr::builtin(Builtin::Bool)),
        ]);
        assert_eq!(expr.to_string(), "< Left : Natural | Right : Bool >");
    }

    #[test]
    fn let_bindings_render_in_order() {
        let expr = Expr::let_in(
            vec![
                crate::ast::LetBinding::new("x", Expr::natural(1)),
                crate::ast::LetBinding::new("y", Expr::natural(2)),
            ],
            Expr::operator(BinOp::Plus, Expr::var("x"), Expr::var("y")),
        );
        assert_eq!(expr.to_string(), "let x = 1 let y = 2 in (x + y)");
    }
}
