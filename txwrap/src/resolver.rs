//! Pluggable session-resolution strategies.
//!
//! A resolver locates the database session a new transaction should be
//! opened on, given the wrapped function's name and its captured arguments.
//! Resolution is synchronous and runs before any transaction is begun, so a
//! failed resolution never leaves a transaction behind.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::args::{Args, CallArg};
use crate::error::TxError;
use crate::session::Session;

/// Strategy that extracts a usable database session from a wrapped
/// function's call arguments.
#[cfg_attr(test, mockall::automock)]
pub trait ConnectionResolver: Send + Sync {
    /// Returns the session to begin a transaction on, or
    /// [`TxError::Resolution`] naming the function when no argument has the
    /// expected shape.
    fn resolve(&self, function: &str, args: &Args) -> Result<Arc<dyn Session>, TxError>;
}

/// Adapter that lets a plain function or closure act as a resolver.
pub struct ResolverFn<F>(pub F);

impl<F> ConnectionResolver for ResolverFn<F>
where
    F: Fn(&str, &Args) -> Result<Arc<dyn Session>, TxError> + Send + Sync,
{
    fn resolve(&self, function: &str, args: &Args) -> Result<Arc<dyn Session>, TxError> {
        (self.0)(function, args)
    }
}

/// Default strategy: picks the first argument that is itself a session.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectSessionResolver;

impl ConnectionResolver for DirectSessionResolver {
    fn resolve(&self, function: &str, args: &Args) -> Result<Arc<dyn Session>, TxError> {
        args.iter()
            .find_map(|arg| match arg {
                CallArg::Session(session) => Some(Arc::clone(session)),
                _ => None,
            })
            .ok_or_else(|| TxError::Resolution {
                function: function.to_string(),
            })
    }
}

/// Picks the first argument that is a datasource exposing a session under
/// the configured driver name, e.g. a value shaped like
/// `{ mssql: { session } }`.
#[derive(Debug, Clone)]
pub struct NestedSourceResolver {
    driver: String,
}

impl NestedSourceResolver {
    pub fn new(driver: impl Into<String>) -> Self {
        NestedSourceResolver {
            driver: driver.into(),
        }
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }
}

impl ConnectionResolver for NestedSourceResolver {
    fn resolve(&self, function: &str, args: &Args) -> Result<Arc<dyn Session>, TxError> {
        args.iter()
            .find_map(|arg| match arg {
                CallArg::Source(source) => source.session(&self.driver),
                _ => None,
            })
            .ok_or_else(|| TxError::Resolution {
                function: function.to_string(),
            })
    }
}

static ACTIVE_RESOLVER: OnceLock<RwLock<Arc<dyn ConnectionResolver>>> = OnceLock::new();

fn active_slot() -> &'static RwLock<Arc<dyn ConnectionResolver>> {
    ACTIVE_RESOLVER.get_or_init(|| RwLock::new(Arc::new(DirectSessionResolver)))
}

/// Replaces the process-wide resolver.
///
/// Takes effect for every subsequent wrapped call that does not pin its own
/// resolver through [`crate::TxConfig`]; calls already past resolution keep
/// the session they resolved.
pub fn init_resolver(resolver: Arc<dyn ConnectionResolver>) {
    *active_slot()
        .write()
        .unwrap_or_else(PoisonError::into_inner) = resolver;
}

/// The currently configured process-wide resolver.
pub fn active_resolver() -> Arc<dyn ConnectionResolver> {
    Arc::clone(
        &active_slot()
            .read()
            .unwrap_or_else(PoisonError::into_inner),
    )
}
