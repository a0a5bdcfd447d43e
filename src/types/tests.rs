//! Unit tests for the type inference engine.

use crate::ast::{BinOp, Builtin, Expr, LetBinding};
use crate::diagnostics::Error;
use crate::environment::{TypeBinding, TypeEnv};
use crate::types::{equivalent, function_check};
use pretty_assertions::assert_eq;

/// Follows the inference trace down to the underlying failure.
fn root_cause(error: &Error) -> &Error {
    match error {
        Error::TypeInference { source, .. } => root_cause(source),
        other => other,
    }
}

/// Infers the normalized type of `expr` under an empty environment.
fn normalized_type(expr: &Expr) -> Expr {
    expr.normalized_type_in(&TypeEnv::new())
        .unwrap_or_else(|e| panic!("expected `{expr}` to typecheck, got: {e}"))
}

mod literals {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn primitive_literals_have_builtin_types() {
        assert_eq!(normalized_type(&Expr::natural(1)), Expr::builtin(Builtin::Natural));
        assert_eq!(normalized_type(&Expr::boolean(true)), Expr::builtin(Builtin::Bool));
        assert_eq!(normalized_type(&Expr::double(1.5)), Expr::builtin(Builtin::Double));
        assert_eq!(normalized_type(&Expr::text("hi")), Expr::builtin(Builtin::Text));
    }

    #[test]
    fn record_literals_have_record_types() {
        let record = Expr::record_lit([
            ("a", Expr::natural(1)),
            ("b", Expr::boolean(true)),
        ]);
        let expected = Expr::record_type([
            ("a", Expr::builtin(Builtin::Natural)),
            ("b", Expr::builtin(Builtin::Bool)),
        ]);
        assert_eq!(normalized_type(&record), expected.normalized());
    }

    #[test]
    fn union_literals_have_union_types() {
        let union = Expr::union_lit(
            "Left",
            Expr::natural(5),
            [("Right", Expr::builtin(Builtin::Bool))],
        );
        let expected = Expr::union_type([
            ("Left", Expr::builtin(Builtin::Natural)),
            ("Right", Expr::builtin(Builtin::Bool)),
        ]);
        assert_eq!(normalized_type(&union), expected.normalized());
    }

    #[test]
    fn nonunique_union_labels_are_rejected() {
        let union = Expr::union_lit(
            "Left",
            Expr::natural(5),
            [("Left", Expr::builtin(Builtin::Bool))],
        );
        let error = union.type_of().unwrap_err();
        assert!(matches!(
            root_cause(&error),
            Error::TypeError { message } if message.contains("nonunique")
        ));
    }

    #[test]
    fn list_literals_have_list_types() {
        let list = Expr::list(vec![Expr::natural(1), Expr::natural(2)], None);
        assert_eq!(
            normalized_type(&list),
            Expr::list_type(Expr::builtin(Builtin::Natural))
        );
    }

    #[test]
    fn empty_lists_use_their_annotation() {
        let list = Expr::list(vec![], Some(Expr::builtin(Builtin::Bool)));
        assert_eq!(
            normalized_type(&list),
            Expr::list_type(Expr::builtin(Builtin::Bool))
        );
    }

    #[test]
    fn heterogeneous_lists_are_rejected() {
        let list = Expr::list(vec![Expr::natural(1), Expr::boolean(true)], None);
        assert!(list.type_of().is_err());
    }

    #[test]
    fn optional_literals_have_optional_types() {
        let some = Expr::some(Expr::natural(1));
        assert_eq!(
            normalized_type(&some),
            Expr::optional_type(Expr::builtin(Builtin::Natural))
        );
        assert!(Expr::none().type_of().is_err());
    }
}

mod universes {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn the_universe_hierarchy_is_a_chain() {
        assert_eq!(
            normalized_type(&Expr::builtin(Builtin::Type)),
            Expr::builtin(Builtin::Kind)
        );
        assert_eq!(
            normalized_type(&Expr::builtin(Builtin::Kind)),
            Expr::builtin(Builtin::Sort)
        );
    }

    #[test]
    fn sort_has_no_type() {
        let error = Expr::builtin(Builtin::Sort).type_of().unwrap_err();
        assert!(matches!(root_cause(&error), Error::SortHasNoType));
    }

    #[test]
    fn function_check_accepts_the_defined_combinations() {
        let ty = Expr::builtin(Builtin::Type);
        let kind = Expr::builtin(Builtin::Kind);
        let sort = Expr::builtin(Builtin::Sort);
        assert_eq!(function_check(&ty, &ty).unwrap(), ty);
        assert_eq!(function_check(&kind, &ty).unwrap(), ty);
        assert_eq!(function_check(&sort, &ty).unwrap(), ty);
        assert_eq!(function_check(&kind, &kind).unwrap(), kind);
        assert_eq!(function_check(&sort, &kind).unwrap(), sort);
        assert_eq!(function_check(&sort, &sort).unwrap(), sort);
    }

    #[test]
    fn function_check_rejects_everything_else() {
        let ty = Expr::builtin(Builtin::Type);
        let kind = Expr::builtin(Builtin::Kind);
        let sort = Expr::builtin(Builtin::Sort);
        assert!(function_check(&ty, &kind).is_err());
        assert!(function_check(&ty, &sort).is_err());
        assert!(function_check(&kind, &sort).is_err());
    }

    #[test]
    fn primitive_types_are_types() {
        let product = Expr::for_all(
            "x",
            Expr::builtin(Builtin::Natural),
            Expr::builtin(Builtin::Bool),
        );
        assert_eq!(normalized_type(&product), Expr::builtin(Builtin::Type));
    }

    #[test]
    fn polymorphic_products_live_in_kind() {
        // ∀(a : Type) → Type
        let product = Expr::for_all("a", Expr::builtin(Builtin::Type), Expr::builtin(Builtin::Type));
        assert_eq!(normalized_type(&product), Expr::builtin(Builtin::Kind));
    }
}

mod variables {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unbound_variables_are_rejected() {
        let error = Expr::var("x").type_of().unwrap_err();
        assert!(matches!(
            root_cause(&error),
            Error::UnboundVariable { variable } if variable == "x"
        ));
    }

    #[test]
    fn declared_variables_use_their_declared_type() {
        let ctx = TypeEnv::new().shadow_single(
            "x",
            TypeBinding::declared(Expr::builtin(Builtin::Natural), TypeEnv::new()),
        );
        let (ty, _) = Expr::var("x").type_of_in(&ctx).unwrap();
        assert_eq!(ty, Expr::builtin(Builtin::Natural));
    }

    #[test]
    fn defined_variables_use_their_value() {
        let ctx = TypeEnv::new().shadow_single(
            "x",
            TypeBinding::defined(Expr::natural(2).into(), TypeEnv::new()),
        );
        let (ty, _) = Expr::var("x").type_of_in(&ctx).unwrap();
        assert_eq!(ty, Expr::builtin(Builtin::Natural));
    }
}

mod functions {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lambdas_have_dependent_product_types() {
        let identity = Expr::lambda("x", Expr::builtin(Builtin::Natural), Expr::var("x"));
        let expected = Expr::for_all(
            "x",
            Expr::builtin(Builtin::Natural),
            Expr::builtin(Builtin::Natural),
        );
        assert_eq!(normalized_type(&identity), expected.normalized());
    }

    #[test]
    fn applications_have_the_product_body_type() {
        let increment = Expr::lambda(
            "x",
            Expr::builtin(Builtin::Natural),
            Expr::operator(BinOp::Plus, Expr::var("x"), Expr::natural(1)),
        );
        let applied = Expr::application(increment, Expr::natural(2));
        assert_eq!(normalized_type(&applied), Expr::builtin(Builtin::Natural));
    }

    #[test]
    fn argument_type_mismatches_are_rejected() {
        let identity = Expr::lambda("x", Expr::builtin(Builtin::Natural), Expr::var("x"));
        let applied = Expr::application(identity, Expr::boolean(true));
        let error = applied.type_of().unwrap_err();
        assert!(matches!(
            root_cause(&error),
            Error::ArgumentMismatch { expected, actual }
                if expected == "Natural" && actual == "Bool"
        ));
    }

    #[test]
    fn applying_a_non_function_is_rejected() {
        let applied = Expr::application(Expr::natural(1), Expr::natural(2));
        let error = applied.type_of().unwrap_err();
        assert!(matches!(root_cause(&error), Error::NotAFunction { .. }));
    }

    #[test]
    fn type_preservation_under_evaluation() {
        let expr = Expr::application(
            Expr::lambda(
                "x",
                Expr::builtin(Builtin::Natural),
                Expr::operator(BinOp::Plus, Expr::var("x"), Expr::natural(1)),
            ),
            Expr::natural(2),
        );
        let before = normalized_type(&expr);
        let after = normalized_type(&expr.evaluated());
        assert!(equivalent(&before, &after));
    }
}

mod annotations {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn matching_annotations_are_returned() {
        let expr = Expr::annotation(Expr::natural(1), Expr::builtin(Builtin::Natural));
        assert_eq!(normalized_type(&expr), Expr::builtin(Builtin::Natural));
    }

    #[test]
    fn mismatched_annotations_are_rejected() {
        let expr = Expr::annotation(Expr::natural(1), Expr::builtin(Builtin::Bool));
        let error = expr.type_of().unwrap_err();
        assert!(matches!(
            root_cause(&error),
            Error::AnnotationMismatch { annotation, actual }
                if annotation == "Bool" && actual == "Natural"
        ));
    }
}

mod let_bindings {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bodies_are_typed_with_values_substituted() {
        let expr = Expr::let_in(
            vec![
                LetBinding::new("x", Expr::natural(1)),
                LetBinding::new("y", Expr::natural(2)),
            ],
            Expr::operator(BinOp::Plus, Expr::var("x"), Expr::var("y")),
        );
        assert_eq!(normalized_type(&expr), Expr::builtin(Builtin::Natural));
    }

    #[test]
    fn matching_binding_annotations_pass() {
        let expr = Expr::let_in(
            vec![LetBinding::annotated(
                "x",
                Expr::natural(1),
                Expr::builtin(Builtin::Natural),
            )],
            Expr::var("x"),
        );
        assert_eq!(normalized_type(&expr), Expr::builtin(Builtin::Natural));
    }

    #[test]
    fn mismatched_binding_annotations_are_rejected() {
        let expr = Expr::let_in(
            vec![LetBinding::annotated(
                "x",
                Expr::natural(1),
                Expr::builtin(Builtin::Bool),
            )],
            Expr::var("x"),
        );
        let error = expr.type_of().unwrap_err();
        assert!(matches!(root_cause(&error), Error::AnnotationMismatch { .. }));
    }

    #[test]
    fn let_bound_types_are_transparent() {
        // let t = Natural in (λ(x : t) → x) 1
        let expr = Expr::let_in(
            vec![LetBinding::new("t", Expr::builtin(Builtin::Natural))],
            Expr::application(
                Expr::lambda("x", Expr::var("t"), Expr::var("x")),
                Expr::natural(1),
            ),
        );
        assert_eq!(normalized_type(&expr), Expr::builtin(Builtin::Natural));
    }
}

mod conditionals {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn conditions_must_be_boolean() {
        let expr = Expr::conditional(Expr::natural(1), Expr::natural(1), Expr::natural(2));
        let error = expr.type_of().unwrap_err();
        assert!(matches!(
            root_cause(&error),
            Error::TypeError { message } if message.contains("Bool")
        ));
    }

    #[test]
    fn branches_must_agree() {
        let expr = Expr::conditional(Expr::boolean(true), Expr::natural(1), Expr::boolean(false));
        assert!(expr.type_of().is_err());
    }

    #[test]
    fn well_formed_conditionals_typecheck() {
        let expr = Expr::conditional(Expr::var("p"), Expr::natural(1), Expr::natural(2));
        let ctx = TypeEnv::new().shadow_single(
            "p",
            TypeBinding::declared(Expr::builtin(Builtin::Bool), TypeEnv::new()),
        );
        let (ty, _) = expr.type_of_in(&ctx).unwrap();
        assert_eq!(ty, Expr::builtin(Builtin::Natural));
    }
}

mod operators {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn natural_operators_require_naturals() {
        let expr = Expr::operator(BinOp::Plus, Expr::natural(1), Expr::boolean(true));
        assert!(expr.type_of().is_err());
        let expr = Expr::operator(BinOp::Times, Expr::natural(1), Expr::natural(2));
        assert_eq!(normalized_type(&expr), Expr::builtin(Builtin::Natural));
    }

    #[test]
    fn boolean_operators_require_booleans() {
        let expr = Expr::operator(BinOp::Or, Expr::boolean(true), Expr::natural(1));
        assert!(expr.type_of().is_err());
        let expr = Expr::operator(BinOp::And, Expr::boolean(true), Expr::boolean(false));
        assert_eq!(normalized_type(&expr), Expr::builtin(Builtin::Bool));
    }

    #[test]
    fn list_append_requires_matching_list_types() {
        let naturals = Expr::list(vec![Expr::natural(1)], None);
        let booleans = Expr::list(vec![Expr::boolean(true)], None);
        let expr = Expr::operator(BinOp::ListAppend, naturals.clone(), booleans);
        assert!(expr.type_of().is_err());
        let expr = Expr::operator(BinOp::ListAppend, naturals.clone(), naturals);
        assert_eq!(
            normalized_type(&expr),
            Expr::list_type(Expr::builtin(Builtin::Natural))
        );
    }
}

mod selection {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn selecting_from_a_union_type_yields_its_constructor() {
        let union_type = Expr::union_type([
            ("Left", Expr::builtin(Builtin::Natural)),
            ("Right", Expr::builtin(Builtin::Bool)),
        ]);
        let constructor = Expr::select(union_type.clone(), "Left");
        let expected = Expr::for_all("_", Expr::builtin(Builtin::Natural), union_type);
        assert_eq!(normalized_type(&constructor), expected.normalized());
    }

    #[test]
    fn selecting_from_a_record_literal_yields_the_field_type() {
        let record = Expr::record_lit([("a", Expr::natural(1))]);
        let expr = Expr::select(record, "a");
        assert_eq!(normalized_type(&expr), Expr::builtin(Builtin::Natural));
    }

    #[test]
    fn selecting_a_missing_field_is_rejected() {
        let record = Expr::record_lit([("a", Expr::natural(1))]);
        let error = Expr::select(record, "b").type_of().unwrap_err();
        assert!(matches!(
            root_cause(&error),
            Error::MissingField { label, .. } if label == "b"
        ));
    }

    #[test]
    fn selecting_from_a_non_record_is_rejected() {
        let error = Expr::select(Expr::natural(1), "a").type_of().unwrap_err();
        assert!(matches!(root_cause(&error), Error::TypeError { .. }));
    }

    #[test]
    fn applied_union_constructors_typecheck() {
        // < Left : Natural | Right : Bool >.Left 5 : < Left : Natural | Right : Bool >
        let union_type = Expr::union_type([
            ("Left", Expr::builtin(Builtin::Natural)),
            ("Right", Expr::builtin(Builtin::Bool)),
        ]);
        let applied = Expr::application(
            Expr::select(union_type.clone(), "Left"),
            Expr::natural(5),
        );
        assert_eq!(normalized_type(&applied), union_type.normalized());
    }
}

mod projection {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn projections_restrict_the_record_type() {
        let record = Expr::record_lit([
            ("a", Expr::natural(1)),
            ("b", Expr::boolean(true)),
            ("c", Expr::text("x")),
        ]);
        let expr = Expr::project(record, vec!["a".into(), "c".into()]);
        let expected = Expr::record_type([
            ("a", Expr::builtin(Builtin::Natural)),
            ("c", Expr::builtin(Builtin::Text)),
        ]);
        assert_eq!(normalized_type(&expr), expected.normalized());
    }

    #[test]
    fn projecting_a_missing_field_is_rejected() {
        let record = Expr::record_lit([("a", Expr::natural(1))]);
        let expr = Expr::project(record, vec!["a".into(), "b".into()]);
        let error = expr.type_of().unwrap_err();
        assert!(matches!(
            root_cause(&error),
            Error::MissingField { label, .. } if label == "b"
        ));
    }

    #[test]
    fn projecting_from_a_non_record_is_rejected() {
        let expr = Expr::project(Expr::natural(1), vec!["a".into()]);
        assert!(expr.type_of().is_err());
    }
}

mod merge_expressions {
    use super::*;
    use pretty_assertions::assert_eq;

    fn handlers() -> Expr {
        Expr::record_lit([
            (
                "Left",
                Expr::lambda("n", Expr::builtin(Builtin::Natural), Expr::var("n")),
            ),
            (
                "Right",
                Expr::lambda("b", Expr::builtin(Builtin::Bool), Expr::natural(0)),
            ),
        ])
    }

    fn union() -> Expr {
        Expr::union_lit(
            "Left",
            Expr::natural(5),
            [("Right", Expr::builtin(Builtin::Bool))],
        )
    }

    #[test]
    fn merge_types_to_the_common_handler_output() {
        let expr = Expr::merge(handlers(), union(), None);
        assert_eq!(normalized_type(&expr), Expr::builtin(Builtin::Natural));
    }

    #[test]
    fn label_sets_must_match_exactly() {
        let incomplete = Expr::record_lit([(
            "Left",
            Expr::lambda("n", Expr::builtin(Builtin::Natural), Expr::var("n")),
        )]);
        let error = Expr::merge(incomplete, union(), None).type_of().unwrap_err();
        assert!(matches!(
            root_cause(&error),
            Error::TypeError { message } if message.contains("same field names")
        ));
    }

    #[test]
    fn handlers_must_be_functions() {
        let bad = Expr::record_lit([
            ("Left", Expr::natural(1)),
            ("Right", Expr::natural(2)),
        ]);
        let error = Expr::merge(bad, union(), None).type_of().unwrap_err();
        assert!(matches!(
            root_cause(&error),
            Error::TypeError { message } if message.contains("not a function")
        ));
    }

    #[test]
    fn handler_inputs_must_match_the_alternatives() {
        let swapped = Expr::record_lit([
            (
                "Left",
                Expr::lambda("b", Expr::builtin(Builtin::Bool), Expr::natural(0)),
            ),
            (
                "Right",
                Expr::lambda("n", Expr::builtin(Builtin::Natural), Expr::var("n")),
            ),
        ]);
        let error = Expr::merge(swapped, union(), None).type_of().unwrap_err();
        assert!(matches!(
            root_cause(&error),
            Error::TypeError { message } if message.contains("as input")
        ));
    }

    #[test]
    fn handler_outputs_must_agree() {
        let disagreeing = Expr::record_lit([
            (
                "Left",
                Expr::lambda("n", Expr::builtin(Builtin::Natural), Expr::var("n")),
            ),
            (
                "Right",
                Expr::lambda("b", Expr::builtin(Builtin::Bool), Expr::var("b")),
            ),
        ]);
        let error = Expr::merge(disagreeing, union(), None).type_of().unwrap_err();
        assert!(matches!(
            root_cause(&error),
            Error::TypeError { message } if message.contains("output types")
        ));
    }

    #[test]
    fn empty_merges_need_an_annotation() {
        let ctx = TypeEnv::new().shadow_single(
            "impossible",
            TypeBinding::declared(Expr::union_type(Vec::<(String, Expr)>::new()), TypeEnv::new()),
        );
        let without = Expr::merge(Expr::record_lit(Vec::<(String, Expr)>::new()), Expr::var("impossible"), None);
        assert!(without.type_of_in(&ctx).is_err());
        let with = Expr::merge(
            Expr::record_lit(Vec::<(String, Expr)>::new()),
            Expr::var("impossible"),
            Some(Expr::builtin(Builtin::Natural)),
        );
        let (ty, _) = with.type_of_in(&ctx).unwrap();
        assert_eq!(ty, Expr::builtin(Builtin::Natural));
    }
}

mod record_and_union_types {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn record_types_of_types_are_types() {
        let record = Expr::record_type([
            ("a", Expr::builtin(Builtin::Natural)),
            ("b", Expr::builtin(Builtin::Bool)),
        ]);
        assert_eq!(normalized_type(&record), Expr::builtin(Builtin::Type));
    }

    #[test]
    fn record_types_of_kinds_are_sorts() {
        let record = Expr::record_type([("a", Expr::builtin(Builtin::Kind))]);
        assert_eq!(normalized_type(&record), Expr::builtin(Builtin::Sort));
    }

    #[test]
    fn mixed_universe_record_types_are_rejected() {
        let record = Expr::record_type([
            ("a", Expr::builtin(Builtin::Natural)),
            ("b", Expr::builtin(Builtin::Kind)),
        ]);
        assert!(record.type_of().is_err());
    }

    #[test]
    fn empty_record_types_are_types() {
        let record = Expr::record_type(Vec::<(String, Expr)>::new());
        assert_eq!(normalized_type(&record), Expr::builtin(Builtin::Type));
    }

    #[test]
    fn union_alternatives_must_share_a_universe() {
        let union = Expr::union_type([
            ("A", Expr::builtin(Builtin::Natural)),
            ("B", Expr::builtin(Builtin::Type)),
        ]);
        assert!(union.type_of().is_err());
    }

    #[test]
    fn union_types_of_types_are_types() {
        let union = Expr::union_type([
            ("A", Expr::builtin(Builtin::Natural)),
            ("B", Expr::builtin(Builtin::Bool)),
        ]);
        assert_eq!(normalized_type(&union), Expr::builtin(Builtin::Type));
    }
}

mod builtin_signatures {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn list_is_a_type_constructor() {
        let applied = Expr::application(
            Expr::builtin(Builtin::List),
            Expr::builtin(Builtin::Natural),
        );
        assert_eq!(normalized_type(&applied), Expr::builtin(Builtin::Type));
    }

    #[test]
    fn list_types_are_types() {
        let ty = Expr::list_type(Expr::builtin(Builtin::Natural));
        assert_eq!(normalized_type(&ty), Expr::builtin(Builtin::Type));
    }

    #[test]
    fn double_show_is_a_function_to_text() {
        let applied = Expr::application(Expr::builtin(Builtin::DoubleShow), Expr::double(1.5));
        assert_eq!(normalized_type(&applied), Expr::builtin(Builtin::Text));
    }

    #[test]
    fn bare_list_fold_has_no_type() {
        assert!(Expr::builtin(Builtin::ListFold).type_of().is_err());
    }

    #[test]
    fn imports_must_be_resolved_before_typing() {
        let error = Expr::import("./config.dhall").type_of().unwrap_err();
        assert!(matches!(
            root_cause(&error),
            Error::UnresolvedImport { source } if source == "./config.dhall"
        ));
    }
}
