//! Wrapper configuration.

use std::fmt;
use std::sync::Arc;

use crate::registry::ParamRegistry;
use crate::resolver::{self, ConnectionResolver};

/// Configuration shared by a group of wrapped functions.
///
/// The default configuration uses the process-wide parameter registry and
/// whatever resolver [`resolver::init_resolver`] has installed, looked up
/// at call time. Supplying an explicit registry or resolver scopes those
/// choices to the wrappers built from this configuration instead.
#[derive(Clone, Default)]
pub struct TxConfig {
    registry: Option<Arc<ParamRegistry>>,
    resolver: Option<Arc<dyn ConnectionResolver>>,
}

impl TxConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `registry` instead of the process-wide one.
    pub fn with_registry(mut self, registry: Arc<ParamRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Pins `resolver` for wrappers built from this configuration, instead
    /// of reading the process-wide resolver on each call.
    pub fn with_resolver(mut self, resolver: Arc<dyn ConnectionResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub(crate) fn registry(&self) -> &ParamRegistry {
        self.registry.as_deref().unwrap_or_else(|| ParamRegistry::global())
    }

    pub(crate) fn resolver(&self) -> Arc<dyn ConnectionResolver> {
        match &self.resolver {
            Some(resolver) => Arc::clone(resolver),
            None => resolver::active_resolver(),
        }
    }
}

impl fmt::Debug for TxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxConfig")
            .field("registry", &self.registry.is_some())
            .field("pinned_resolver", &self.resolver.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Args;
    use crate::error::TxError;
    use crate::resolver::ResolverFn;
    use crate::session::Session;

    #[test]
    fn default_config_uses_the_global_registry() {
        let config = TxConfig::new();
        assert!(std::ptr::eq(config.registry(), ParamRegistry::global()));
    }

    #[test]
    fn explicit_registry_overrides_the_global_one() {
        let registry = Arc::new(ParamRegistry::new());
        let config = TxConfig::new().with_registry(Arc::clone(&registry));
        assert!(std::ptr::eq(config.registry(), registry.as_ref()));
    }

    #[test]
    fn pinned_resolver_is_returned_as_is() {
        let pinned: Arc<dyn ConnectionResolver> = Arc::new(ResolverFn(
            |function: &str, _: &Args| -> Result<Arc<dyn Session>, TxError> {
                Err(TxError::Resolution {
                    function: function.to_string(),
                })
            },
        ));
        let config = TxConfig::new().with_resolver(Arc::clone(&pinned));
        assert!(Arc::ptr_eq(&config.resolver(), &pinned));
    }
}
