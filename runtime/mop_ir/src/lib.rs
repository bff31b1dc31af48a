//! mop IR - identity model for the dispatch runtime.
//!
//! This crate holds the small, dependency-light vocabulary every other part
//! of the runtime speaks:
//! - `Name` / `StringInterner` for interned method and property names
//! - `TypeRef` / `WeakTypeRef` handles to runtime types, with assignability
//! - `Modifiers` / `Visibility` for member flags
//!
//! # Design Philosophy
//!
//! - **Intern names**: method names are `Name(u32)` so overload maps hash and
//!   compare a single integer.
//! - **Types are handles**: a `TypeRef` is an `Arc` around an immutable record,
//!   compared by a process-unique `TypeKey`. Weak handles let caches forget
//!   types nobody references any more.

mod interner;
mod modifiers;
mod name;
mod types;

pub use interner::{InternError, SharedInterner, StringInterner};
pub use modifiers::{Modifiers, Visibility};
pub use name::Name;
pub use types::{PrimitiveKind, TypeKey, TypeKind, TypeRef, WeakTypeRef};
