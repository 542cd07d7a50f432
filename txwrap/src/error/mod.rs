use thiserror::Error;

/// Errors raised while managing a transaction boundary.
///
/// Failures coming out of the wrapped function itself are not represented
/// here; the wrapper returns them to the caller unchanged. Every variant
/// carries the name of the wrapped function so a failing call site can be
/// identified from the error alone.
#[derive(Debug, Error)]
pub enum TxError {
    /// The active resolver could not find a usable database session among
    /// the call arguments. Raised before any transaction is begun, so there
    /// is never anything to roll back.
    #[error("cannot find a database session among the arguments of `{function}`")]
    Resolution {
        /// Name of the wrapped function whose arguments were scanned.
        function: String,
    },

    /// Beginning a transaction on the resolved session failed.
    #[error("failed to begin a transaction for `{function}`")]
    Begin {
        function: String,
        #[source]
        source: anyhow::Error,
    },

    /// Committing after the wrapped function completed failed. No rollback
    /// is attempted; the transaction's state after a failed commit belongs
    /// to the session implementation.
    #[error("failed to commit the transaction opened for `{function}`")]
    Commit {
        function: String,
        #[source]
        source: anyhow::Error,
    },

    /// Rolling back after the wrapped function failed itself failed. The
    /// error that triggered the rollback is carried along so neither
    /// failure is lost.
    #[error("failed to roll back the transaction opened for `{function}` (while handling: {original})")]
    Rollback {
        function: String,
        #[source]
        source: anyhow::Error,
        /// The wrapped function's own error, which the rollback was
        /// cleaning up after.
        original: anyhow::Error,
    },
}

impl TxError {
    /// Name of the wrapped function the error originated from.
    pub fn function(&self) -> &str {
        match self {
            TxError::Resolution { function }
            | TxError::Begin { function, .. }
            | TxError::Commit { function, .. }
            | TxError::Rollback { function, .. } => function,
        }
    }
}
