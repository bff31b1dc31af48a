//! Access control by method name.

use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use super::Interceptor;
use crate::errors::{DispatchError, DispatchResult};
use crate::Value;

/// Closes the gate for a fixed set of method names.
///
/// A vetoed call yields `Null`. The decision made in `before_invoke` is kept
/// per thread until the matching `after_invoke`.
pub struct VetoInterceptor {
    vetoed: FxHashSet<String>,
    pending: Mutex<FxHashMap<ThreadId, Vec<bool>>>,
}

impl VetoInterceptor {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        VetoInterceptor {
            vetoed: names.into_iter().map(Into::into).collect(),
            pending: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn is_vetoed(&self, name: &str) -> bool {
        self.vetoed.contains(name)
    }

    fn settle(&self) {
        let mut pending = self.pending.lock();
        let id = thread::current().id();
        if let Some(decisions) = pending.get_mut(&id) {
            decisions.pop();
            if decisions.is_empty() {
                pending.remove(&id);
            }
        }
    }

    #[cfg(test)]
    pub(super) fn pending_decisions(&self) -> usize {
        self.pending.lock().values().map(Vec::len).sum()
    }
}

impl Interceptor for VetoInterceptor {
    fn before_invoke(&self, _receiver: &Value, name: &str, _args: &[Value]) -> DispatchResult {
        let allowed = !self.is_vetoed(name);
        if !allowed {
            tracing::debug!(name, "call vetoed");
        }
        self.pending
            .lock()
            .entry(thread::current().id())
            .or_default()
            .push(allowed);
        Ok(Value::Null)
    }

    fn do_invoke(&self) -> DispatchResult<bool> {
        Ok(self
            .pending
            .lock()
            .get(&thread::current().id())
            .and_then(|decisions| decisions.last().copied())
            .unwrap_or(true))
    }

    fn after_invoke(
        &self,
        _receiver: &Value,
        _name: &str,
        _args: &[Value],
        result: Value,
    ) -> DispatchResult {
        self.settle();
        Ok(result)
    }

    fn invoke_failed(
        &self,
        _receiver: &Value,
        _name: &str,
        _args: &[Value],
        _error: &DispatchError,
    ) {
        self.settle();
    }
}
