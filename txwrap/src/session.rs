//! Interfaces to the externally supplied database session.
//!
//! The wrapper never talks to a database directly; it only sequences calls
//! on these traits. Adapters for concrete drivers live in their own crates
//! (see `txwrap-postgres`).

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

/// A database session or connection pool capable of opening transactions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Session: Send + Sync {
    /// Begin a new transaction on this session.
    async fn begin_transaction(&self) -> anyhow::Result<Arc<dyn TransactionHandle>>;
}

/// An open transaction.
///
/// A handle is finalized at most once; implementations must make a second
/// commit or rollback on the same handle fail rather than reach the
/// database twice.
#[async_trait]
pub trait TransactionHandle: Send + Sync {
    /// Commit all work performed on this transaction.
    async fn commit(&self) -> anyhow::Result<()>;

    /// Undo all work performed on this transaction.
    async fn rollback(&self) -> anyhow::Result<()>;

    /// Access to the concrete handle, so wrapped functions can run their
    /// statements on the driver-specific transaction type.
    fn as_any(&self) -> &dyn Any;
}

/// A value bundling one or more named sessions, such as a datasource struct
/// that keeps a driver-specific pool under a well-known field.
///
/// This is the argument shape the nested-datasource resolver strategy scans
/// for.
pub trait SessionSource: Send + Sync {
    /// Returns the session registered under `driver`, if any.
    fn session(&self, driver: &str) -> Option<Arc<dyn Session>>;
}

impl SessionSource for HashMap<String, Arc<dyn Session>> {
    fn session(&self, driver: &str) -> Option<Arc<dyn Session>> {
        self.get(driver).cloned()
    }
}
