//! Per-type dispatch tables.
//!
//! # Architecture
//!
//! The registry talks to every table through the [`DispatchTable`] trait:
//!
//! - [`TypeTable`]: the table built from a type's declared members, its
//!   ancestors' tables and its registered extensions.
//! - `InterceptingTable`: wraps another table and routes calls through an
//!   interceptor.
//! - Host tables installed with `DispatchRegistry::install`.
//!
//! Tables receive the registry on every call so they can reach the core
//! types, the interner and other types' tables without owning them.

mod extensions;
mod properties;
mod type_table;

use mop_ir::TypeKey;

use crate::errors::DispatchResult;
use crate::{DispatchRegistry, MethodDescriptor, Value};

pub use extensions::{ExtensionKind, ExtensionMethods};
pub use type_table::TypeTable;

pub(crate) use extensions::ExtensionEntry;
pub(crate) use properties::capitalize;

/// Call surface of one type.
pub trait DispatchTable: Send + Sync {
    fn type_key(&self) -> TypeKey;

    fn type_name(&self) -> &str;

    /// Invoke an instance method on `receiver`, whose runtime type is this
    /// table's type.
    fn invoke_method(
        &self,
        registry: &DispatchRegistry,
        receiver: &Value,
        name: &str,
        args: &[Value],
    ) -> DispatchResult;

    fn invoke_static(&self, registry: &DispatchRegistry, name: &str, args: &[Value])
        -> DispatchResult;

    fn invoke_constructor(&self, registry: &DispatchRegistry, args: &[Value]) -> DispatchResult;

    fn get_property(&self, registry: &DispatchRegistry, receiver: &Value, name: &str)
        -> DispatchResult;

    fn set_property(
        &self,
        registry: &DispatchRegistry,
        receiver: &Value,
        name: &str,
        value: Value,
    ) -> DispatchResult<()>;

    /// The descriptor `invoke_method` would select, without invoking it.
    fn respond_to(
        &self,
        registry: &DispatchRegistry,
        receiver: &Value,
        name: &str,
        args: &[Value],
    ) -> DispatchResult<Option<MethodDescriptor>>;

    fn has_property(&self, registry: &DispatchRegistry, name: &str) -> bool;

    /// Instance methods, declared and imported, ordered by signature.
    fn methods(&self) -> Vec<MethodDescriptor>;

    /// Snapshot of the extensions descendant tables import.
    fn extensions(&self) -> ExtensionMethods;
}

#[cfg(test)]
mod tests;
