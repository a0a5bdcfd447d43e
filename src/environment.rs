//! Shadow environments for scoped variable bindings.
//!
//! A [`ShadowEnv`] maps a variable name to a stack of payloads indexed by
//! scope, where scope 0 is the innermost (most recently shadowed) binding.
//! The same structure is used as the substitution environment during
//! evaluation, as the typing environment during type inference, and as the
//! renaming environment during α-normalization; only the payload type
//! differs.
//!
//! Environments are persistent: every operation returns a new environment
//! and never mutates its input, so expressions and environments can be
//! shared freely, including across threads.

use crate::ast::Expr;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single pushed binding together with its insertion serial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Entry<T> {
    payload: T,
    /// Value of the environment's push counter when this binding was added.
    serial: u64,
}

/// A persistent, scope-indexed binding environment.
///
/// Lookups are O(scope) within a name; extending or joining environments
/// shares structure with the originals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize + Clone",
    deserialize = "T: Deserialize<'de> + Clone"
))]
pub struct ShadowEnv<T: Clone> {
    entries: im::HashMap<String, im::Vector<Entry<T>>>,
    /// Total number of bindings ever pushed into this environment.
    pushes: u64,
}

impl<T: Clone> ShadowEnv<T> {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self {
            entries: im::HashMap::new(),
            pushes: 0,
        }
    }

    /// Whether a binding exists for `name` at the given scope depth.
    #[must_use]
    pub fn has(&self, name: &str, scope: usize) -> bool {
        self.entries.get(name).is_some_and(|seq| seq.len() > scope)
    }

    /// Returns the payload bound to `name` at the given scope depth.
    pub fn get(&self, name: &str, scope: usize) -> Option<&T> {
        self.entries
            .get(name)
            .and_then(|seq| seq.get(scope))
            .map(|entry| &entry.payload)
    }

    /// How many bindings were pushed strictly after `(name, scope)` was.
    ///
    /// After α-renaming every binder to the canonical name, this is the
    /// scope index under which the original binding appears.
    pub fn age(&self, name: &str, scope: usize) -> Option<usize> {
        self.entries
            .get(name)
            .and_then(|seq| seq.get(scope))
            .map(|entry| (self.pushes - entry.serial - 1) as usize)
    }

    /// Pushes a single binding, shadowing any previous binding of `name`.
    #[must_use]
    pub fn shadow_single(&self, name: impl Into<String>, payload: T) -> Self {
        let name = name.into();
        let mut seq = self.entries.get(&name).cloned().unwrap_or_default();
        seq.push_front(Entry {
            payload,
            serial: self.pushes,
        });
        Self {
            entries: self.entries.update(name, seq),
            pushes: self.pushes + 1,
        }
    }

    /// Pushes a group of bindings, one after another.
    #[must_use]
    pub fn shadow<I>(&self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (String, T)>,
    {
        bindings
            .into_iter()
            .fold(self.clone(), |env, (name, payload)| {
                env.shadow_single(name, payload)
            })
    }

    /// Composes two environments, with `self`'s bindings innermost.
    ///
    /// For every name the scope stacks are concatenated; `outer`'s bindings
    /// end up at deeper scope indices than `self`'s.
    #[must_use]
    pub fn join(&self, outer: &Self) -> Self {
        if outer.entries.is_empty() {
            return self.clone();
        }
        if self.entries.is_empty() {
            return outer.clone();
        }
        let mut entries = outer.entries.clone();
        for (name, inner_seq) in &self.entries {
            let mut seq: im::Vector<Entry<T>> = inner_seq
                .iter()
                .map(|entry| Entry {
                    payload: entry.payload.clone(),
                    serial: entry.serial + outer.pushes,
                })
                .collect();
            if let Some(outer_seq) = outer.entries.get(name) {
                seq.append(outer_seq.clone());
            }
            entries.insert(name.clone(), seq);
        }
        Self {
            entries,
            pushes: self.pushes + outer.pushes,
        }
    }

    /// Whether the environment holds no bindings at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all bound names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Iterates over the payloads bound to `name`, innermost first.
    pub fn scopes(&self, name: &str) -> impl Iterator<Item = &T> {
        self.entries
            .get(name)
            .into_iter()
            .flat_map(|seq| seq.iter())
            .map(|entry| &entry.payload)
    }
}

impl<T: Clone> Default for ShadowEnv<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A value-context binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Binding {
    /// The variable is bound by an enclosing binder but has no value yet.
    ///
    /// Evaluation under a binder uses this sentinel so the bound variable is
    /// not substituted by an outer binding of the same name while reduction
    /// under the binder still proceeds.
    Bound,
    /// The variable is bound to a concrete expression.
    Defined(Arc<Expr>),
}

/// A typing-context binding: the declared type and/or the concrete value of
/// a variable, together with the environment they were typed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeBinding {
    /// Declared type of the variable, if any.
    pub ty: Option<Arc<Expr>>,
    /// Concrete value of the variable (for `let`-bound names), if any.
    pub value: Option<Arc<Expr>>,
    /// Environment under which `ty` and `value` were themselves typed.
    pub covering: TypeEnv,
}

impl TypeBinding {
    /// A binding carrying only a declared type.
    pub fn declared(ty: Expr, covering: TypeEnv) -> Self {
        Self {
            ty: Some(Arc::new(ty)),
            value: None,
            covering,
        }
    }

    /// A binding carrying a concrete value.
    pub fn defined(value: Arc<Expr>, covering: TypeEnv) -> Self {
        Self {
            ty: None,
            value: Some(value),
            covering,
        }
    }

    /// A binding with neither type nor value.
    ///
    /// Looking the variable up still succeeds, but using it fails as
    /// unbound; this marks names that must not occur free.
    pub fn opaque() -> Self {
        Self {
            ty: None,
            value: None,
            covering: TypeEnv::new(),
        }
    }
}

/// Substitution environment threaded through evaluation.
pub type ValueEnv = ShadowEnv<Binding>;

/// Typing environment threaded through type inference.
pub type TypeEnv = ShadowEnv<TypeBinding>;

/// Renaming environment threaded through α-normalization.
pub type RenameEnv = ShadowEnv<String>;
