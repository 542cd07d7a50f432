//! Call-argument capture and transaction-slot injection.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::session::{Session, SessionSource, TransactionHandle};

/// One positional argument of a wrapped call.
pub enum CallArg {
    /// An empty slot, typically a declared-but-unset transaction parameter.
    Null,
    /// A plain application value, opaque to the wrapper.
    Value(Box<dyn Any + Send + Sync>),
    /// A database session; the direct resolver strategy picks these up.
    Session(Arc<dyn Session>),
    /// A datasource bundling named sessions; input to the nested strategy.
    Source(Arc<dyn SessionSource>),
    /// An open transaction handle, injected by the wrapper or supplied by a
    /// caller that already owns a transaction.
    Tx(Arc<dyn TransactionHandle>),
}

impl CallArg {
    /// Wraps a plain value.
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        CallArg::Value(Box::new(value))
    }

    /// Wraps a session.
    pub fn session(session: Arc<dyn Session>) -> Self {
        CallArg::Session(session)
    }

    /// Wraps a datasource.
    pub fn source(source: Arc<dyn SessionSource>) -> Self {
        CallArg::Source(source)
    }

    /// Whether this slot is empty.
    pub fn is_null(&self) -> bool {
        matches!(self, CallArg::Null)
    }
}

impl fmt::Debug for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallArg::Null => f.write_str("Null"),
            CallArg::Value(_) => f.write_str("Value"),
            CallArg::Session(_) => f.write_str("Session"),
            CallArg::Source(_) => f.write_str("Source"),
            CallArg::Tx(_) => f.write_str("Tx"),
        }
    }
}

/// The ordered argument list captured for one invocation of a wrapped
/// function.
#[derive(Debug, Default)]
pub struct Args(Vec<CallArg>);

impl Args {
    pub fn new(args: Vec<CallArg>) -> Self {
        Args(args)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CallArg> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CallArg> {
        self.0.iter()
    }

    /// Typed access to a plain value argument.
    pub fn value<T: Any>(&self, index: usize) -> Option<&T> {
        match self.0.get(index) {
            Some(CallArg::Value(value)) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// The session at `index`, if that argument is one.
    pub fn session(&self, index: usize) -> Option<&Arc<dyn Session>> {
        match self.0.get(index) {
            Some(CallArg::Session(session)) => Some(session),
            _ => None,
        }
    }

    /// The transaction handle at `index`, if that argument is one.
    pub fn transaction(&self, index: usize) -> Option<&Arc<dyn TransactionHandle>> {
        match self.0.get(index) {
            Some(CallArg::Tx(tx)) => Some(tx),
            _ => None,
        }
    }

    /// Overwrites the argument at `index`, growing the list with empty
    /// slots when the call site passed fewer arguments than the declaration
    /// names.
    pub(crate) fn put(&mut self, index: usize, arg: CallArg) {
        if index >= self.0.len() {
            self.0.resize_with(index + 1, || CallArg::Null);
        }
        self.0[index] = arg;
    }
}

impl From<Vec<CallArg>> for Args {
    fn from(args: Vec<CallArg>) -> Self {
        Args(args)
    }
}

impl FromIterator<CallArg> for Args {
    fn from_iter<I: IntoIterator<Item = CallArg>>(iter: I) -> Self {
        Args(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_downcasts_to_the_stored_type() {
        let args = Args::new(vec![CallArg::value(42_u32), CallArg::value("id".to_string())]);
        assert_eq!(args.value::<u32>(0), Some(&42));
        assert_eq!(args.value::<String>(1), Some(&"id".to_string()));
        assert_eq!(args.value::<u32>(1), None);
        assert_eq!(args.value::<u32>(2), None);
    }

    #[test]
    fn put_grows_the_list_with_null_slots() {
        let mut args = Args::new(vec![CallArg::value(1_u8)]);
        args.put(3, CallArg::value(4_u8));
        assert_eq!(args.len(), 4);
        assert!(args.get(1).is_some_and(CallArg::is_null));
        assert!(args.get(2).is_some_and(CallArg::is_null));
        assert_eq!(args.value::<u8>(3), Some(&4));
    }

    #[test]
    fn put_overwrites_in_place() {
        let mut args = Args::new(vec![CallArg::value(1_u8), CallArg::value(2_u8)]);
        args.put(1, CallArg::Null);
        assert_eq!(args.len(), 2);
        assert!(args.get(1).is_some_and(CallArg::is_null));
    }

    #[test]
    fn typed_accessors_ignore_other_variants() {
        let args = Args::new(vec![CallArg::value(7_u8), CallArg::Null]);
        assert!(args.session(0).is_none());
        assert!(args.transaction(1).is_none());
    }
}
