//! The transaction boundary wrapper.
//!
//! Wraps an async function so that every invocation runs inside exactly one
//! transaction: either one the caller already owns (the call participates
//! and performs no finalization) or one the wrapper creates, injects into
//! the declared transaction slot, and commits or rolls back depending on
//! the function's outcome.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::args::{Args, CallArg};
use crate::config::TxConfig;
use crate::error::TxError;
use crate::registry::ScopeKey;
use crate::resolver::ConnectionResolver;

type Inner<T, E> = Arc<dyn Fn(Args) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// Starts building a wrapper around the free function `name`.
pub fn wrap(name: impl Into<String>) -> TransactionalBuilder {
    TransactionalBuilder::new(ScopeKey::global(name))
}

/// Starts building a wrapper around a method of the type named `scope`.
pub fn wrap_method(scope: impl Into<String>, name: impl Into<String>) -> TransactionalBuilder {
    TransactionalBuilder::new(ScopeKey::method(scope, name))
}

/// An async function wrapped in a transaction boundary.
///
/// Built through [`wrap`] or [`wrap_method`]; invoked through
/// [`Transactional::call`]. The wrapper holds the function's identity (used
/// for registry lookups and resolver diagnostics) and the configuration
/// that supplies its registry and resolver.
pub struct Transactional<T, E> {
    key: ScopeKey,
    config: TxConfig,
    inner: Inner<T, E>,
}

impl<T, E> Clone for Transactional<T, E> {
    fn clone(&self) -> Self {
        Transactional {
            key: self.key.clone(),
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> Transactional<T, E> {
    /// Identity of the wrapped function.
    pub fn key(&self) -> &ScopeKey {
        &self.key
    }
}

impl<T, E> Transactional<T, E>
where
    E: From<TxError> + Into<anyhow::Error>,
{
    /// Runs the wrapped function inside its transaction boundary.
    ///
    /// When the registered transaction slot already carries a handle the
    /// call participates in the caller's transaction: the function runs
    /// with the argument list untouched and its outcome is forwarded
    /// without any commit or rollback. Otherwise the wrapper resolves a
    /// session from the arguments, begins a transaction, injects the handle
    /// into the slot when one is declared, and finalizes the transaction
    /// exactly once: commit on success, rollback on failure with the
    /// original error re-surfaced.
    pub async fn call(&self, args: impl Into<Args>) -> Result<T, E> {
        let mut args = args.into();
        let function = self.key.function();
        let index = self.config.registry().lookup(&self.key);

        if let Some(index) = index {
            if args.transaction(index).is_some() {
                tracing::debug!(key = %self.key, index, "participating in caller transaction");
                return (self.inner)(args).await;
            }
        }

        let session = self
            .config
            .resolver()
            .resolve(function, &args)
            .map_err(E::from)?;
        let tx = session.begin_transaction().await.map_err(|source| {
            E::from(TxError::Begin {
                function: function.to_string(),
                source,
            })
        })?;
        tracing::debug!(key = %self.key, "began local transaction");

        if let Some(index) = index {
            args.put(index, CallArg::Tx(Arc::clone(&tx)));
        }

        match (self.inner)(args).await {
            Ok(value) => {
                tx.commit().await.map_err(|source| {
                    E::from(TxError::Commit {
                        function: function.to_string(),
                        source,
                    })
                })?;
                tracing::debug!(key = %self.key, "committed local transaction");
                Ok(value)
            }
            Err(original) => match tx.rollback().await {
                Ok(()) => {
                    tracing::debug!(key = %self.key, "rolled back local transaction");
                    Err(original)
                }
                Err(source) => Err(E::from(TxError::Rollback {
                    function: function.to_string(),
                    source,
                    original: original.into(),
                })),
            },
        }
    }
}

/// Builder for [`Transactional`] wrappers.
pub struct TransactionalBuilder {
    key: ScopeKey,
    config: TxConfig,
    tx_param: Option<usize>,
}

impl TransactionalBuilder {
    fn new(key: ScopeKey) -> Self {
        TransactionalBuilder {
            key,
            config: TxConfig::new(),
            tx_param: None,
        }
    }

    /// Marks the zero-based position of the parameter reserved for the
    /// transaction handle. The index is recorded in the parameter registry
    /// when the wrapper is built.
    pub fn tx_param(mut self, index: usize) -> Self {
        self.tx_param = Some(index);
        self
    }

    /// Uses `config` instead of the process-wide defaults.
    pub fn config(mut self, config: TxConfig) -> Self {
        self.config = config;
        self
    }

    /// Shorthand for pinning a resolver on the current configuration.
    pub fn resolver(mut self, resolver: Arc<dyn ConnectionResolver>) -> Self {
        self.config = self.config.with_resolver(resolver);
        self
    }

    /// Builds the wrapper around `f`, registering the declared transaction
    /// parameter. Registration at build time mirrors declaration-time
    /// parameter marking; building two wrappers for the same function keeps
    /// the most recent declaration.
    pub fn build<F, Fut, T, E>(self, f: F) -> Transactional<T, E>
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if let Some(index) = self.tx_param {
            self.config.registry().register(self.key.clone(), index);
        }
        Transactional {
            key: self.key,
            config: self.config,
            inner: Arc::new(move |args| Box::pin(f(args))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ParamRegistry;
    use crate::resolver::MockConnectionResolver;
    use crate::session::TransactionHandle;
    use async_trait::async_trait;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, thiserror::Error)]
    enum TestError {
        #[error(transparent)]
        Tx(#[from] TxError),
    }

    #[derive(Default)]
    struct NoopTx {
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
    }

    #[async_trait]
    impl TransactionHandle for NoopTx {
        async fn commit(&self) -> anyhow::Result<()> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn rollback(&self) -> anyhow::Result<()> {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn isolated_config(resolver: MockConnectionResolver) -> TxConfig {
        TxConfig::new()
            .with_registry(Arc::new(ParamRegistry::new()))
            .with_resolver(Arc::new(resolver))
    }

    #[test]
    fn build_registers_the_declared_parameter() {
        let registry = Arc::new(ParamRegistry::new());
        let _wrapper: Transactional<(), TestError> = wrap("place_order")
            .tx_param(1)
            .config(TxConfig::new().with_registry(Arc::clone(&registry)))
            .build(|_args| async { Ok(()) });

        assert_eq!(registry.lookup(&ScopeKey::global("place_order")), Some(1));
    }

    #[tokio::test]
    async fn participating_call_never_touches_the_resolver() {
        // no expectations: any resolve() call fails the test
        let resolver = MockConnectionResolver::new();
        let wrapper: Transactional<usize, TestError> = wrap("place_order")
            .tx_param(1)
            .config(isolated_config(resolver))
            .build(|args| async move {
                assert!(args.transaction(1).is_some());
                Ok(7)
            });

        let inherited = Arc::new(NoopTx::default());
        let result = wrapper
            .call(vec![
                CallArg::value(42_u32),
                CallArg::Tx(Arc::clone(&inherited) as Arc<dyn TransactionHandle>),
            ])
            .await
            .expect("participating call");

        assert_eq!(result, 7);
        assert_eq!(inherited.commits.load(Ordering::SeqCst), 0);
        assert_eq!(inherited.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn resolver_receives_the_function_name_and_arguments() {
        let mut resolver = MockConnectionResolver::new();
        resolver.expect_resolve().returning(|function, args| {
            assert_eq!(function, "place_order");
            assert_eq!(args.len(), 1);
            assert_eq!(args.value::<u32>(0), Some(&42));
            Err(TxError::Resolution {
                function: function.to_string(),
            })
        });

        let wrapper: Transactional<usize, TestError> = wrap("place_order")
            .tx_param(1)
            .config(isolated_config(resolver))
            .build(|_args| async move { Ok(7) });

        let err = wrapper
            .call(vec![CallArg::value(42_u32)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TestError::Tx(TxError::Resolution { ref function }) if function == "place_order"
        ));
    }

    #[tokio::test]
    async fn method_wrappers_resolve_under_their_bare_function_name() {
        let mut resolver = MockConnectionResolver::new();
        resolver.expect_resolve().returning(|function, _args| {
            assert_eq!(function, "place_order");
            Err(TxError::Resolution {
                function: function.to_string(),
            })
        });

        let wrapper: Transactional<(), TestError> = wrap_method("OrderService", "place_order")
            .config(isolated_config(resolver))
            .build(|_args| async { Ok(()) });

        assert_eq!(wrapper.key().to_string(), "OrderService#place_order");

        let err = wrapper.call(Args::default()).await.unwrap_err();
        assert!(matches!(
            err,
            TestError::Tx(TxError::Resolution { ref function }) if function == "place_order"
        ));
    }
}
