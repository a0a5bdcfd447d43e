#![warn(missing_docs, rust_2018_idioms)]
//! # Lambdhall
//!
//! Lambdhall is the expression engine of a Dhall-style configuration
//! language: a pure, total, dependently-typed lambda calculus. The crate
//! provides three interlocking judgments over a single abstract syntax:
//!
//! 1. **α-normalization** — renaming bound variables to a canonical form so
//!    structurally equal expressions become syntactically equal
//! 2. **β-evaluation** — reducing redexes to normal form under a
//!    substitution environment
//! 3. **type inference** — computing the type of a well-formed expression
//!    and rejecting ill-formed ones
//!
//! Surface-syntax parsing, import resolution, and binary encoding are the
//! responsibility of external collaborators: the parser constructs
//! [`Expr`] values (resolving identifiers through
//! [`builtins::builtin_or_variable`]), an import resolver replaces
//! [`ast::ExprKind::Import`] leaves, and this crate evaluates and types the
//! result.
//!
//! ## Example
//!
//! ```
//! use lambdhall::{BinOp, Builtin, Expr};
//!
//! // (λ(x : Natural) → x + 1) 2
//! let increment = Expr::lambda(
//!     "x",
//!     Expr::builtin(Builtin::Natural),
//!     Expr::operator(BinOp::Plus, Expr::var("x"), Expr::natural(1)),
//! );
//! let applied = Expr::application(increment, Expr::natural(2));
//!
//! let (ty, _) = applied.type_of().unwrap();
//! assert_eq!(ty.evaluated().normalized(), Expr::builtin(Builtin::Natural));
//! assert_eq!(applied.evaluated(), Expr::natural(3));
//! ```
//!
//! Expressions and environments are immutable and persistent; sharing them
//! across threads is safe, and independent evaluations and type-checks
//! compose without locking.

// Core language components
/// Abstract syntax tree definitions and shared structural walks.
pub mod ast;
/// The builtin library and its lookup by surface name.
pub mod builtins;
/// Shadow environments for substitution, typing, and renaming.
pub mod environment;

// Judgments
/// α-normalization and β-evaluation.
pub mod eval;
/// Bidirectional type inference.
pub mod types;

// Utilities and diagnostics
/// Error handling and typing-context rendering.
pub mod diagnostics;

// Re-exports for convenience
pub use ast::{BinOp, Builtin, Expr, ExprKind, LetBinding, DEFAULT_VARIABLE_NAME};
pub use builtins::builtin_or_variable;
pub use diagnostics::{context_to_string, Error, Result};
pub use environment::{Binding, RenameEnv, ShadowEnv, TypeBinding, TypeEnv, ValueEnv};
pub use types::{equivalent, function_check};

/// Version information for the lambdhall implementation.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
