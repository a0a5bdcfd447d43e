//! The builtin library.
//!
//! Builtins are looked up by surface name when the parser resolves an
//! identifier; `True` and `False` resolve directly to boolean literals.
//! The typing signatures of the builtins live here as well, expressed as
//! ordinary expressions of the calculus.

use crate::ast::{Builtin, Expr, DEFAULT_VARIABLE_NAME};
use once_cell::sync::Lazy;
use std::collections::HashMap;

static BUILTINS: Lazy<HashMap<&'static str, Expr>> = Lazy::new(|| {
    let mut builtins = HashMap::new();
    for builtin in [
        Builtin::Bool,
        Builtin::Natural,
        Builtin::Double,
        Builtin::DoubleShow,
        Builtin::Text,
        Builtin::List,
        Builtin::ListBuild,
        Builtin::ListFold,
        Builtin::Type,
        Builtin::Kind,
        Builtin::Sort,
    ] {
        builtins.insert(builtin.name(), Expr::builtin(builtin));
    }
    builtins.insert("True", Expr::boolean(true));
    builtins.insert("False", Expr::boolean(false));
    builtins
});

/// Looks up a builtin by surface name.
pub fn lookup(name: &str) -> Option<Expr> {
    BUILTINS.get(name).cloned()
}

/// Resolves an identifier to a builtin, or to a variable when no builtin
/// carries that name.
pub fn builtin_or_variable(name: &str) -> Expr {
    lookup(name).unwrap_or_else(|| Expr::var(name))
}

/// The type of a polymorphic list builder over the given element type:
/// `∀(list : Type) → ∀(cons : element → list → list) → ∀(nil : list) → list`.
pub(crate) fn builder_signature(element: Expr) -> Expr {
    Expr::for_all(
        "list",
        Expr::builtin(Builtin::Type),
        Expr::for_all(
            "cons",
            Expr::for_all(
                DEFAULT_VARIABLE_NAME,
                element,
                Expr::for_all(
                    DEFAULT_VARIABLE_NAME,
                    Expr::var("list"),
                    Expr::var("list"),
                ),
            ),
            Expr::for_all("nil", Expr::var("list"), Expr::var("list")),
        ),
    )
}

/// The typing signature of a builtin, or `None` for the two that have no
/// type of their own: `Sort` tops the universe hierarchy, and `List/fold`
/// is typed only after it is applied to an element type.
pub(crate) fn signature(builtin: Builtin) -> Option<Expr> {
    match builtin {
        Builtin::Sort => None,
        Builtin::Kind => Some(Expr::builtin(Builtin::Sort)),
        Builtin::Type => Some(Expr::builtin(Builtin::Kind)),
        Builtin::Bool | Builtin::Natural | Builtin::Double | Builtin::Text => {
            Some(Expr::builtin(Builtin::Type))
        }
        Builtin::List => Some(Expr::for_all(
            DEFAULT_VARIABLE_NAME,
            Expr::builtin(Builtin::Type),
            Expr::builtin(Builtin::Type),
        )),
        Builtin::DoubleShow => Some(Expr::for_all(
            DEFAULT_VARIABLE_NAME,
            Expr::builtin(Builtin::Double),
            Expr::builtin(Builtin::Text),
        )),
        Builtin::ListBuild => Some(Expr::for_all(
            "a",
            Expr::builtin(Builtin::Type),
            Expr::for_all(
                DEFAULT_VARIABLE_NAME,
                builder_signature(Expr::var("a")),
                Expr::list_type(Expr::var("a")),
            ),
        )),
        Builtin::ListFold => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExprKind;

    #[test]
    fn builtins_resolve_by_name() {
        assert_eq!(lookup("Natural"), Some(Expr::builtin(Builtin::Natural)));
        assert_eq!(lookup("List/build"), Some(Expr::builtin(Builtin::ListBuild)));
        assert_eq!(lookup("frobnicate"), None);
    }

    #[test]
    fn true_and_false_resolve_to_literals() {
        assert_eq!(builtin_or_variable("True"), Expr::boolean(true));
        assert_eq!(builtin_or_variable("False"), Expr::boolean(false));
    }

    #[test]
    fn unknown_names_resolve_to_variables() {
        let resolved = builtin_or_variable("x");
        assert!(matches!(
            resolved.kind,
            ExprKind::Variable { ref name, scope: 0 } if name == "x"
        ));
    }

    #[test]
    fn list_signature_is_a_type_constructor() {
        let expected = Expr::for_all(
            DEFAULT_VARIABLE_NAME,
            Expr::builtin(Builtin::Type),
            Expr::builtin(Builtin::Type),
        );
        assert_eq!(signature(Builtin::List), Some(expected));
    }

    #[test]
    fn untyped_builtins_have_no_signature() {
        assert_eq!(signature(Builtin::Sort), None);
        assert_eq!(signature(Builtin::ListFold), None);
    }
}
