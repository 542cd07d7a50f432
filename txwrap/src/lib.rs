//! Transaction boundary management for async database work.
//!
//! `txwrap` wraps an async function so that every database operation it
//! performs runs inside a single transaction: the wrapper opens one on
//! entry and commits or rolls it back depending on the outcome. When the
//! caller already owns a transaction and passes its handle in the
//! function's reserved transaction slot, the call participates in that
//! transaction instead and leaves finalization to its owner, so wrapped
//! functions compose without nesting or double-committing.
//!
//! The moving parts:
//!
//! - [`wrap`] / [`wrap_method`]: entry points producing a [`Transactional`]
//!   wrapper through its builder.
//! - [`ParamRegistry`]: records which positional argument of a function is
//!   reserved for the transaction handle, declared via
//!   [`TransactionalBuilder::tx_param`].
//! - [`ConnectionResolver`]: pluggable strategy that finds the database
//!   session among a call's arguments. [`DirectSessionResolver`] (the
//!   default) picks the first argument that is a session;
//!   [`NestedSourceResolver`] digs a named session out of a datasource
//!   argument. [`init_resolver`] swaps the process-wide strategy,
//!   [`TxConfig`] pins one per wrapper group.
//! - [`Session`] / [`TransactionHandle`]: the interface a database driver
//!   adapter implements; the `txwrap-postgres` crate does so for
//!   `sqlx::PgPool`.

pub mod args;
pub mod config;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod wrapper;

pub use args::{Args, CallArg};
pub use config::TxConfig;
pub use error::TxError;
pub use registry::{ParamRegistry, ScopeKey, GLOBAL_SCOPE};
pub use resolver::{
    active_resolver, init_resolver, ConnectionResolver, DirectSessionResolver,
    NestedSourceResolver, ResolverFn,
};
pub use session::{Session, SessionSource, TransactionHandle};
pub use wrapper::{wrap, wrap_method, Transactional, TransactionalBuilder};
