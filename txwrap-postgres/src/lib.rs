//! PostgreSQL session support for `txwrap`, backed by `sqlx`.
//!
//! Implements the [`Session`] contract on [`PgPool`], so a pool can be
//! passed directly as a call argument and picked up by the resolver
//! strategies.

use std::any::Any;
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use sqlx::postgres::PgTransaction;
use sqlx::PgPool;
use tokio::sync::{Mutex, MutexGuard};
use txwrap::{Session, TransactionHandle};

/// Handle over an open `sqlx` Postgres transaction.
///
/// The inner transaction sits behind a mutex so the wrapped function and
/// the boundary wrapper can share the handle. Finalization takes the
/// transaction out; a second commit or rollback on the same handle fails
/// instead of reaching the database twice.
pub struct PgTransactionHandle {
    inner: Mutex<Option<PgTransaction<'static>>>,
}

impl PgTransactionHandle {
    fn new(tx: PgTransaction<'static>) -> Self {
        PgTransactionHandle {
            inner: Mutex::new(Some(tx)),
        }
    }

    /// Locks the underlying transaction for running statements.
    ///
    /// The slot is `None` once the transaction has been finalized. Wrapped
    /// functions reach this through [`TransactionHandle::as_any`]:
    ///
    /// ```text
    /// let handle = args.transaction(1).unwrap();
    /// let pg = handle.as_any().downcast_ref::<PgTransactionHandle>().unwrap();
    /// let mut guard = pg.transaction().await;
    /// let tx = guard.as_deref_mut().unwrap();
    /// sqlx::query("...").execute(&mut **tx).await?;
    /// ```
    pub async fn transaction(&self) -> MutexGuard<'_, Option<PgTransaction<'static>>> {
        self.inner.lock().await
    }
}

#[async_trait]
impl TransactionHandle for PgTransactionHandle {
    async fn commit(&self) -> anyhow::Result<()> {
        let tx = self
            .inner
            .lock()
            .await
            .take()
            .context("transaction already finalized")?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&self) -> anyhow::Result<()> {
        let tx = self
            .inner
            .lock()
            .await
            .take()
            .context("transaction already finalized")?;
        tx.rollback().await?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl Session for PgPool {
    async fn begin_transaction(&self) -> anyhow::Result<Arc<dyn TransactionHandle>> {
        let tx = self.begin().await?;
        Ok(Arc::new(PgTransactionHandle::new(tx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pg_pool_satisfies_the_session_contract() {
        fn check_session<T: Session>() {}
        check_session::<PgPool>();
    }

    #[test]
    fn handle_is_send_sync() {
        fn check_send_sync<T: Send + Sync>() {}
        check_send_sync::<PgTransactionHandle>();
    }
}
