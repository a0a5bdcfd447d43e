//! Error reporting for the lambdhall engine.
//!
//! Type inference reports the first failure it encounters, wrapping it at
//! every recursive step with the offending subexpression's canonical form
//! and a rendering of the active typing context, so the final message reads
//! as a trace from the root of the term down to the fault.

use crate::ast::Expr;
use crate::environment::TypeEnv;
use std::fmt;

/// Result type used throughout the lambdhall implementation.
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Error types for the lambdhall engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A variable with neither a value nor a declared type in scope.
    UnboundVariable {
        /// Canonical form of the variable.
        variable: String,
    },
    /// A type annotation that is not equivalent to the inferred type.
    AnnotationMismatch {
        /// The annotated type.
        annotation: String,
        /// The inferred type.
        actual: String,
    },
    /// Application of an expression whose type is not a function type.
    NotAFunction {
        /// The applied expression.
        expression: String,
    },
    /// An argument whose type differs from the function's parameter type.
    ArgumentMismatch {
        /// The parameter type the function expects.
        expected: String,
        /// The inferred argument type.
        actual: String,
    },
    /// A dependent product over an unsupported universe combination.
    FunctionCheckFailed {
        /// Universe of the parameter type.
        parameter: String,
        /// Universe of the result type.
        result: String,
    },
    /// `Sort` has no type.
    SortHasNoType,
    /// Selection or projection of a label that is not present.
    MissingField {
        /// The requested label.
        label: String,
        /// The container lacking it.
        container: String,
    },
    /// Any other violation of the typing rules.
    TypeError {
        /// Human-readable description.
        message: String,
    },
    /// A normalized expression that has no data representation.
    ConversionError {
        /// Human-readable description.
        message: String,
    },
    /// An import leaf that reached the engine unresolved.
    UnresolvedImport {
        /// The opaque import source.
        source: String,
    },
    /// A failure wrapped with the subexpression and context it arose in.
    TypeInference {
        /// Canonical form of the subexpression being typed.
        expression: String,
        /// Rendering of the active typing context.
        context: String,
        /// The underlying failure.
        source: Box<Error>,
    },
}

impl Error {
    /// Creates an unbound-variable error.
    pub fn unbound_variable(variable: &Expr) -> Self {
        Self::UnboundVariable {
            variable: variable.to_string(),
        }
    }

    /// Creates an annotation-mismatch error.
    pub fn annotation_mismatch(annotation: &Expr, actual: &Expr) -> Self {
        Self::AnnotationMismatch {
            annotation: annotation.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Creates a non-function application error.
    pub fn not_a_function(expression: &Expr) -> Self {
        Self::NotAFunction {
            expression: expression.to_string(),
        }
    }

    /// Creates an argument-mismatch error.
    pub fn argument_mismatch(expected: &Expr, actual: &Expr) -> Self {
        Self::ArgumentMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Creates a function-check error.
    pub fn function_check_failed(parameter: &Expr, result: &Expr) -> Self {
        Self::FunctionCheckFailed {
            parameter: parameter.to_string(),
            result: result.to_string(),
        }
    }

    /// Creates a missing-field error.
    pub fn missing_field(label: impl Into<String>, container: &Expr) -> Self {
        Self::MissingField {
            label: label.into(),
            container: container.to_string(),
        }
    }

    /// Creates a general type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError {
            message: message.into(),
        }
    }

    /// Creates a conversion error.
    pub fn conversion_error(message: impl Into<String>) -> Self {
        Self::ConversionError {
            message: message.into(),
        }
    }

    /// Creates an unresolved-import error.
    pub fn unresolved_import(source: impl Into<String>) -> Self {
        Self::UnresolvedImport {
            source: source.into(),
        }
    }

    /// Wraps a failure with the subexpression and typing context it arose
    /// in.
    pub fn type_inference(expression: &Expr, context: &TypeEnv, source: Box<Error>) -> Self {
        Self::TypeInference {
            expression: expression.to_string(),
            context: context_to_string(context),
            source,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnboundVariable { variable } => write!(f, "unbound variable `{variable}`"),
            Self::AnnotationMismatch { annotation, actual } => write!(
                f,
                "annotation\n\t`{annotation}` doesn't match expression type\n\t`{actual}`"
            ),
            Self::NotAFunction { expression } => {
                write!(f, "couldn't apply non-function `{expression}`")
            }
            Self::ArgumentMismatch { expected, actual } => write!(
                f,
                "function expects argument of type `{expected}`, but got `{actual}`"
            ),
            Self::FunctionCheckFailed { parameter, result } => {
                write!(f, "function check failed for `{parameter} ↝ {result}`")
            }
            Self::SortHasNoType => write!(f, "it's impossible to infer type of `Sort`"),
            Self::MissingField { label, container } => {
                write!(f, "field `{label}` is missing from `{container}`")
            }
            Self::TypeError { message } => write!(f, "{message}"),
            Self::ConversionError { message } => write!(f, "{message}"),
            Self::UnresolvedImport { source } => write!(f, "unresolved import `{source}`"),
            Self::TypeInference {
                expression,
                context,
                source,
            } => {
                writeln!(f, "when type-infering\n\t`{expression}`")?;
                if !context.is_empty() {
                    writeln!(f, "{context}")?;
                }
                write!(f, "{source}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TypeInference { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Renders a typing context for diagnostic display.
///
/// Bindings are listed per name in alphabetical order, one line per scope,
/// with the covering environment of each binding indented beneath it.
pub fn context_to_string(ctx: &TypeEnv) -> String {
    let mut parts = Vec::new();
    let mut names: Vec<&String> = ctx.names().collect();
    names.sort();
    for name in names {
        for (scope, binding) in ctx.scopes(name).enumerate() {
            let mut line = if let Some(value) = &binding.value {
                format!("`{name}@{scope}` has value `{value}`")
            } else if let Some(ty) = &binding.ty {
                format!("`{name}@{scope}` has type `{ty}`")
            } else {
                continue;
            };
            let covering = context_to_string(&binding.covering);
            if !covering.is_empty() {
                line.push_str(" where \n");
                line.push_str(&indent(&covering));
            }
            parts.push(line);
        }
    }
    parts.join("\n")
}

fn indent(text: &str) -> String {
    format!("\t{}", text.replace('\n', "\n\t"))
}
