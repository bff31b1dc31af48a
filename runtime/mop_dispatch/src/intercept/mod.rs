//! Call interception.
//!
//! An [`InterceptingTable`] wraps the live table of a type and routes every
//! instance, static and constructor call through an [`Interceptor`]:
//!
//! ```text
//! before_invoke ──► do_invoke? ──yes──► wrapped call ──► after_invoke
//!   (provisional)        │                 (result)         (final)
//!                        └──no──────────────────────────────►
//! ```
//!
//! The gate is consulted exactly once per call. When it is closed the
//! provisional result from `before_invoke` flows to `after_invoke`, so both
//! hooks run either way. If the gate or the wrapped call fails, the error
//! goes to `invoke_failed` instead of `after_invoke` and then propagates.
//! Constructor calls use the name [`CONSTRUCTOR_CALL`]. Property access is
//! delegated to the wrapped table unchanged.

mod timing;
mod trace;
mod veto;

use std::sync::Arc;

use mop_ir::{TypeKey, TypeRef, WeakTypeRef};

use crate::errors::{DispatchError, DispatchResult};
use crate::table::{DispatchTable, ExtensionMethods};
use crate::{DispatchRegistry, MethodDescriptor, Value};

pub use timing::{CallStatistic, CallTimingInterceptor};
pub use trace::TracingInterceptor;
pub use veto::VetoInterceptor;

/// Method name interceptors see for constructor calls.
pub const CONSTRUCTOR_CALL: &str = "ctor";

/// Observer of calls on one type.
///
/// Implementations may keep state between hooks; calls can arrive from
/// several threads at once.
pub trait Interceptor: Send + Sync {
    /// Runs first. Its result is used when the gate is closed.
    fn before_invoke(&self, receiver: &Value, name: &str, args: &[Value]) -> DispatchResult;

    /// Whether the wrapped call runs. An error aborts the call.
    fn do_invoke(&self) -> DispatchResult<bool>;

    /// Runs last with the call's result; returns the final result.
    fn after_invoke(
        &self,
        receiver: &Value,
        name: &str,
        args: &[Value],
        result: Value,
    ) -> DispatchResult;

    /// Runs instead of `after_invoke` when the gate or the wrapped call
    /// failed. State pushed by `before_invoke` is released here.
    fn invoke_failed(
        &self,
        _receiver: &Value,
        _name: &str,
        _args: &[Value],
        _error: &DispatchError,
    ) {}
}

/// Table decorator routing calls through an interceptor.
pub struct InterceptingTable {
    owner: WeakTypeRef,
    inner: Arc<dyn DispatchTable>,
    interceptor: Arc<dyn Interceptor>,
}

impl InterceptingTable {
    pub fn new(
        ty: &TypeRef,
        inner: Arc<dyn DispatchTable>,
        interceptor: Arc<dyn Interceptor>,
    ) -> Self {
        InterceptingTable {
            owner: ty.downgrade(),
            inner,
            interceptor,
        }
    }

    pub fn interceptor(&self) -> &Arc<dyn Interceptor> {
        &self.interceptor
    }

    fn static_receiver(&self) -> Value {
        self.owner.upgrade().map_or(Value::Null, Value::Type)
    }

    fn intercept(
        &self,
        receiver: &Value,
        name: &str,
        args: &[Value],
        call: impl FnOnce() -> DispatchResult,
    ) -> DispatchResult {
        let provisional = self.interceptor.before_invoke(receiver, name, args)?;
        let outcome = match self.interceptor.do_invoke() {
            Ok(true) => call(),
            Ok(false) => {
                tracing::trace!(name, "interceptor closed the gate");
                Ok(provisional)
            }
            Err(e) => Err(e),
        };
        match outcome {
            Ok(result) => self.interceptor.after_invoke(receiver, name, args, result),
            Err(e) => {
                self.interceptor.invoke_failed(receiver, name, args, &e);
                Err(e)
            }
        }
    }
}

impl DispatchTable for InterceptingTable {
    fn type_key(&self) -> TypeKey {
        self.owner.key()
    }

    fn type_name(&self) -> &str {
        self.inner.type_name()
    }

    fn invoke_method(
        &self,
        registry: &DispatchRegistry,
        receiver: &Value,
        name: &str,
        args: &[Value],
    ) -> DispatchResult {
        self.intercept(receiver, name, args, || {
            self.inner.invoke_method(registry, receiver, name, args)
        })
    }

    fn invoke_static(
        &self,
        registry: &DispatchRegistry,
        name: &str,
        args: &[Value],
    ) -> DispatchResult {
        let receiver = self.static_receiver();
        self.intercept(&receiver, name, args, || {
            self.inner.invoke_static(registry, name, args)
        })
    }

    fn invoke_constructor(&self, registry: &DispatchRegistry, args: &[Value]) -> DispatchResult {
        let receiver = self.static_receiver();
        self.intercept(&receiver, CONSTRUCTOR_CALL, args, || {
            self.inner.invoke_constructor(registry, args)
        })
    }

    fn get_property(
        &self,
        registry: &DispatchRegistry,
        receiver: &Value,
        name: &str,
    ) -> DispatchResult {
        self.inner.get_property(registry, receiver, name)
    }

    fn set_property(
        &self,
        registry: &DispatchRegistry,
        receiver: &Value,
        name: &str,
        value: Value,
    ) -> DispatchResult<()> {
        self.inner.set_property(registry, receiver, name, value)
    }

    fn respond_to(
        &self,
        registry: &DispatchRegistry,
        receiver: &Value,
        name: &str,
        args: &[Value],
    ) -> DispatchResult<Option<MethodDescriptor>> {
        self.inner.respond_to(registry, receiver, name, args)
    }

    fn has_property(&self, registry: &DispatchRegistry, name: &str) -> bool {
        self.inner.has_property(registry, name)
    }

    fn methods(&self) -> Vec<MethodDescriptor> {
        self.inner.methods()
    }

    fn extensions(&self) -> ExtensionMethods {
        self.inner.extensions()
    }
}

#[cfg(test)]
mod tests;
