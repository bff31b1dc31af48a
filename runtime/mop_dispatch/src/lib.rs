//! mop dispatch - dynamic method dispatch for a dynamically typed runtime.
//!
//! Given a receiver, a method name and runtime arguments, this crate picks
//! the one callable to run and runs it.
//!
//! # Architecture
//!
//! - `DispatchRegistry`: weakly-retaining cache from runtime type to table,
//!   and the entry point of every dispatch operation
//! - `TypeTable`: a type's methods, statics, constructors and properties,
//!   built from introspection plus inherited and imported members
//! - `resolve`: overload resolution over runtime argument types
//! - `InterceptingTable` / `Interceptor`: before / gate / after call hooks
//! - `MemberCatalog` / `Introspect`: where declared members come from
//!
//! # Re-exports
//!
//! The identity types from `mop_ir` are re-exported for convenience:
//! - `Name`, `SharedInterner`, `StringInterner`
//! - `TypeRef`, `WeakTypeRef`, `TypeKey`, `TypeKind`, `PrimitiveKind`
//! - `Modifiers`, `Visibility`

mod core_types;
mod descriptor;
pub mod errors;
pub mod intercept;
mod introspect;
mod library;
mod registry;
pub mod resolver;
pub mod table;
pub mod tracing_setup;
mod value;

pub use mop_ir::{
    Modifiers, Name, PrimitiveKind, SharedInterner, StringInterner, TypeKey, TypeKind, TypeRef,
    Visibility, WeakTypeRef,
};

// Re-export error constructors for convenience (canonical path is mop_dispatch::errors::*)
pub use errors::{
    // Lookup failures
    ambiguous_overload, no_matching_constructor, no_such_method, no_such_property, null_receiver,
    // Property access
    read_only_property, write_only_property,
    // Access and registration
    access_denied, invalid_extension, table_build,
    // Raised by invoked code
    raised,
    DispatchError, DispatchErrorKind, DispatchResult, InvokeError,
};

pub use core_types::CoreTypes;
pub use descriptor::{DescriptorBuilder, Invoker, MethodDescriptor, ParamTypes, CONSTRUCTOR_NAME};
pub use intercept::{
    CallStatistic, CallTimingInterceptor, InterceptingTable, Interceptor, TracingInterceptor,
    VetoInterceptor, CONSTRUCTOR_CALL,
};
pub use introspect::{
    DeclaredMembers, Introspect, IntrospectionError, MemberCatalog, PropertyAccess, PropertyDecl,
};
pub use registry::{DispatchRegistry, RegistryBuilder};
pub use table::{DispatchTable, ExtensionKind, ExtensionMethods, TypeTable};
pub use tracing_setup::init_tracing;
pub use value::{Instance, MethodRef, Value};
