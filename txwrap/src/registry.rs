//! Process-wide registry of transaction-carrying parameters.
//!
//! A wrapped function may declare that one of its positional arguments is
//! reserved for the transaction handle. The registry records that index
//! keyed by function identity; the wrapper consults it on every call to
//! decide between participating in a caller-supplied transaction and
//! injecting a freshly created one.

use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, PoisonError, RwLock};

/// Scope marker for functions declared outside any type.
pub const GLOBAL_SCOPE: &str = "global";

/// Identity of a wrapped function: the enclosing type's name (or
/// [`GLOBAL_SCOPE`] for free functions) plus the function name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeKey {
    scope: String,
    function: String,
}

impl ScopeKey {
    /// Key for a method of the type named `scope`.
    pub fn method(scope: impl Into<String>, function: impl Into<String>) -> Self {
        ScopeKey {
            scope: scope.into(),
            function: function.into(),
        }
    }

    /// Key for a free function.
    pub fn global(function: impl Into<String>) -> Self {
        Self::method(GLOBAL_SCOPE, function)
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn function(&self) -> &str {
        &self.function
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.scope, self.function)
    }
}

/// Maps function identity to the zero-based index of the parameter reserved
/// for the transaction handle.
///
/// Registration happens at declaration time (when wrappers are built) and
/// is unconditional; lookups are the only operation performed while calls
/// are in flight.
#[derive(Debug, Default)]
pub struct ParamRegistry {
    entries: RwLock<HashMap<ScopeKey, usize>>,
}

impl ParamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the reserved parameter of the function identified by `key`.
    ///
    /// Registering the same function twice keeps the most recent index.
    pub fn register(&self, key: ScopeKey, index: usize) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, index);
    }

    /// Returns the registered index, or `None` when the function has no
    /// transaction-carrying parameter.
    pub fn lookup(&self, key: &ScopeKey) -> Option<usize> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }

    /// The process-wide registry used by wrappers that are not given an
    /// explicit configuration.
    pub fn global() -> &'static ParamRegistry {
        static REGISTRY: OnceLock<ParamRegistry> = OnceLock::new();
        REGISTRY.get_or_init(ParamRegistry::new)
    }
}
