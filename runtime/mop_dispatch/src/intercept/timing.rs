//! Per-method call timing.

use std::collections::BTreeMap;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::Interceptor;
use crate::errors::{DispatchError, DispatchResult};
use crate::Value;

/// Calls and accumulated time of one method name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallStatistic {
    pub name: String,
    pub calls: u64,
    pub total: Duration,
}

impl CallStatistic {
    pub fn average(&self) -> Duration {
        match u32::try_from(self.calls) {
            Ok(0) => Duration::ZERO,
            Ok(calls) => self.total / calls,
            Err(_) => Duration::ZERO,
        }
    }
}

/// Records how often each method is called and how long it takes.
///
/// The gate is always open. Start times are kept per thread, so nested and
/// concurrent calls are timed independently. Failed calls are not counted.
#[derive(Default)]
pub struct CallTimingInterceptor {
    starts: Mutex<FxHashMap<ThreadId, Vec<Instant>>>,
    stats: Mutex<BTreeMap<String, (u64, Duration)>>,
}

impl CallTimingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics sorted by method name.
    pub fn statistics(&self) -> Vec<CallStatistic> {
        self.stats
            .lock()
            .iter()
            .map(|(name, (calls, total))| CallStatistic {
                name: name.clone(),
                calls: *calls,
                total: *total,
            })
            .collect()
    }

    pub fn reset(&self) {
        self.stats.lock().clear();
    }

    /// Start time of the innermost open call on this thread.
    fn pop_start(&self) -> Option<Instant> {
        let mut starts = self.starts.lock();
        let id = thread::current().id();
        let started = starts.get_mut(&id).and_then(Vec::pop);
        if starts.get(&id).is_some_and(Vec::is_empty) {
            starts.remove(&id);
        }
        started
    }

    #[cfg(test)]
    pub(super) fn open_calls(&self) -> usize {
        self.starts.lock().values().map(Vec::len).sum()
    }
}

impl Interceptor for CallTimingInterceptor {
    fn before_invoke(&self, _receiver: &Value, _name: &str, _args: &[Value]) -> DispatchResult {
        self.starts
            .lock()
            .entry(thread::current().id())
            .or_default()
            .push(Instant::now());
        Ok(Value::Null)
    }

    fn do_invoke(&self) -> DispatchResult<bool> {
        Ok(true)
    }

    fn after_invoke(
        &self,
        _receiver: &Value,
        name: &str,
        _args: &[Value],
        result: Value,
    ) -> DispatchResult {
        if let Some(started) = self.pop_start() {
            let elapsed = started.elapsed();
            let mut stats = self.stats.lock();
            let entry = stats.entry(name.to_owned()).or_default();
            entry.0 += 1;
            entry.1 += elapsed;
        }
        Ok(result)
    }

    fn invoke_failed(
        &self,
        _receiver: &Value,
        _name: &str,
        _args: &[Value],
        _error: &DispatchError,
    ) {
        self.pop_start();
    }
}
