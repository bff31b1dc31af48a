//! Call tracing through `tracing` events.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::Interceptor;
use crate::errors::{DispatchError, DispatchResult};
use crate::Value;

/// Emits an event on entry and exit of every call, indented by nesting.
///
/// Events use the `mop::trace` target at `DEBUG`, so
/// `RUST_LOG=mop::trace=debug` shows exactly the traced calls.
#[derive(Default)]
pub struct TracingInterceptor {
    depth: AtomicUsize,
}

impl TracingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    fn indent(depth: usize) -> String {
        "  ".repeat(depth)
    }
}

impl Interceptor for TracingInterceptor {
    fn before_invoke(&self, receiver: &Value, name: &str, args: &[Value]) -> DispatchResult {
        let depth = self.depth.fetch_add(1, Ordering::Relaxed);
        let args: Vec<String> = args.iter().map(Value::inspect).collect();
        tracing::debug!(
            target: "mop::trace",
            "{}-> {}.{}({})",
            Self::indent(depth),
            receiver.inspect(),
            name,
            args.join(", ")
        );
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
        let depth = self.depth.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        tracing::debug!(
            target: "mop::trace",
            "{}<- {} = {}",
            Self::indent(depth),
            name,
            result.inspect()
        );
        Ok(result)
    }

    fn invoke_failed(
        &self,
        _receiver: &Value,
        name: &str,
        _args: &[Value],
        error: &DispatchError,
    ) {
        let depth = self.depth.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        tracing::debug!(
            target: "mop::trace",
            "{}<- {} failed: {}",
            Self::indent(depth),
            name,
            error
        );
    }
}
