//! The dispatch registry.
//!
//! Maps runtime types to their dispatch tables and is the entry point of
//! every dispatch operation. A registry is an ordinary value: hosts create
//! as many as they need and pass them by reference.
//!
//! # Cache
//!
//! Tables are built lazily on first use and cached under the type's key.
//! Entries hold their type weakly and are evicted once the type is gone,
//! on any cache miss or explicitly through [`DispatchRegistry::purge`].
//! Because extensions live in a durable store, a rebuilt table behaves
//! exactly like the evicted one.
//!
//! Each entry keeps the table built from introspection (`real`) and the
//! table calls go through (`live`). Installing a host table or an
//! interceptor changes `live` only; uninstalling restores `real`.
//!
//! # Concurrency
//!
//! Lookups take a read lock. A miss takes the type's build lock, checks the
//! cache again and builds, so racing callers all observe one table.
//!
//! Builds hold the registration gate shared from the extension snapshot
//! until the table is cached; registering an extension holds it exclusively
//! while it appends and propagates. A table is therefore either built
//! before a registration, and receives it by propagation, or built after
//! it, and imports it.

mod builder;
mod extension_store;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mop_ir::{SharedInterner, TypeKey, TypeRef, WeakTypeRef};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::core_types::CoreTypes;
use crate::errors::{invalid_extension, null_receiver, DispatchResult};
use crate::intercept::{InterceptingTable, Interceptor};
use crate::introspect::{DeclaredMembers, Introspect, IntrospectionError, MemberCatalog};
use crate::table::{DispatchTable, ExtensionEntry, ExtensionKind, TypeTable};
use crate::{MethodDescriptor, Value};

pub use builder::RegistryBuilder;
use extension_store::ExtensionStore;

struct CacheEntry {
    owner: WeakTypeRef,
    real: Arc<TypeTable>,
    live: Arc<dyn DispatchTable>,
}

impl CacheEntry {
    fn new(ty: &TypeRef, real: Arc<TypeTable>) -> Self {
        CacheEntry {
            owner: ty.downgrade(),
            live: real.clone(),
            real,
        }
    }
}

/// Weakly-retaining map from runtime type to dispatch table.
pub struct DispatchRegistry {
    interner: SharedInterner,
    core: CoreTypes,
    catalog: Arc<MemberCatalog>,
    /// Host introspector for non-library types; the catalog when `None`.
    introspector: Option<Arc<dyn Introspect>>,
    tables: RwLock<FxHashMap<TypeKey, CacheEntry>>,
    build_locks: Mutex<FxHashMap<TypeKey, Arc<Mutex<()>>>>,
    /// Shared by builds, exclusive for extension registration.
    registration: RwLock<()>,
    extensions: ExtensionStore,
    accessible_override: AtomicBool,
}

impl DispatchRegistry {
    /// A registry with default configuration.
    pub fn new() -> Self {
        RegistryBuilder::new().build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn core(&self) -> &CoreTypes {
        &self.core
    }

    /// The catalog describing library types, and host types unless a host
    /// introspector was configured.
    pub fn catalog(&self) -> &Arc<MemberCatalog> {
        &self.catalog
    }

    pub fn type_of(&self, value: &Value) -> TypeRef {
        self.core.type_of(value)
    }

    pub fn accessible_override(&self) -> bool {
        self.accessible_override.load(Ordering::Acquire)
    }

    /// Allow or forbid invoking non-public members.
    pub fn set_accessible_override(&self, enabled: bool) {
        self.accessible_override.store(enabled, Ordering::Release);
        tracing::debug!(enabled, "accessible override changed");
    }

    pub(crate) fn declared_members(
        &self,
        ty: &TypeRef,
    ) -> Result<DeclaredMembers, IntrospectionError> {
        match &self.introspector {
            Some(host) if !self.core.contains(ty) => host.declared_members(ty),
            _ => self.catalog.declared_members(ty),
        }
    }

    // Cache

    /// The table calls on `ty` go through, built on first request.
    pub fn table_for(&self, ty: &TypeRef) -> DispatchResult<Arc<dyn DispatchTable>> {
        if let Some(entry) = self.tables.read().get(&ty.key()) {
            return Ok(Arc::clone(&entry.live));
        }
        self.build_and_cache(ty).map(|(live, _)| live)
    }

    /// The table built from introspection, ignoring installed replacements.
    pub(crate) fn real_table_for(&self, ty: &TypeRef) -> DispatchResult<Arc<TypeTable>> {
        if let Some(entry) = self.tables.read().get(&ty.key()) {
            return Ok(Arc::clone(&entry.real));
        }
        self.build_and_cache(ty).map(|(_, real)| real)
    }

    fn build_lock(&self, key: TypeKey) -> Arc<Mutex<()>> {
        Arc::clone(self.build_locks.lock().entry(key).or_default())
    }

    /// Forget the build lock of `key` unless another thread is waiting on
    /// it. Callers finish every side effect first, so a later lock holder
    /// observes them.
    fn release_build_lock(&self, key: TypeKey, lock: &Arc<Mutex<()>>) {
        let mut locks = self.build_locks.lock();
        // The map's handle and the caller's
        if Arc::strong_count(lock) == 2 {
            locks.remove(&key);
        }
    }

    #[tracing::instrument(level = "debug", skip(self, ty), fields(type_name = ty.name()))]
    fn build_and_cache(
        &self,
        ty: &TypeRef,
    ) -> DispatchResult<(Arc<dyn DispatchTable>, Arc<TypeTable>)> {
        let key = ty.key();
        let lock = self.build_lock(key);
        let guard = lock.lock();

        let cached = self
            .tables
            .read()
            .get(&key)
            .map(|entry| (Arc::clone(&entry.live), Arc::clone(&entry.real)));
        let built = match cached {
            Some(handles) => Ok(handles),
            None => {
                // Recursive: ancestor tables are built under the same gate
                let _gate = self.registration.read_recursive();
                let stored = self.extensions.snapshot(key);
                TypeTable::build(self, ty, &stored).map(|table| {
                    let mut tables = self.tables.write();
                    evict_dead(&mut tables);
                    let entry = tables
                        .entry(key)
                        .or_insert_with(|| CacheEntry::new(ty, Arc::new(table)));
                    (Arc::clone(&entry.live), Arc::clone(&entry.real))
                })
            }
        };
        self.release_build_lock(key, &lock);
        drop(guard);
        built
    }

    /// Replace the table calls on `ty` go through.
    pub fn install(&self, ty: &TypeRef, table: Arc<dyn DispatchTable>) -> DispatchResult<()> {
        let real = self.real_table_for(ty)?;
        let mut tables = self.tables.write();
        let entry = tables
            .entry(ty.key())
            .or_insert_with(|| CacheEntry::new(ty, real));
        entry.live = table;
        tracing::debug!(type_name = ty.name(), "installed dispatch table");
        Ok(())
    }

    /// Restore the table built from introspection.
    pub fn uninstall(&self, ty: &TypeRef) {
        if let Some(entry) = self.tables.write().get_mut(&ty.key()) {
            entry.live = entry.real.clone();
            tracing::debug!(type_name = ty.name(), "restored dispatch table");
        }
    }

    /// Route every call on `ty` through `interceptor`, on top of whatever
    /// table is currently live.
    pub fn install_interceptor(
        &self,
        ty: &TypeRef,
        interceptor: Arc<dyn Interceptor>,
    ) -> DispatchResult<()> {
        let real = self.real_table_for(ty)?;
        let mut tables = self.tables.write();
        let entry = tables
            .entry(ty.key())
            .or_insert_with(|| CacheEntry::new(ty, real));
        entry.live = Arc::new(InterceptingTable::new(
            ty,
            Arc::clone(&entry.live),
            interceptor,
        ));
        tracing::debug!(type_name = ty.name(), "installed interceptor");
        Ok(())
    }

    /// Remove every interceptor and installed table from `ty`.
    pub fn uninstall_interceptor(&self, ty: &TypeRef) {
        self.uninstall(ty);
    }

    /// Drop the cached table of `ty`. Returns whether one was cached.
    pub fn remove(&self, ty: &TypeRef) -> bool {
        self.tables.write().remove(&ty.key()).is_some()
    }

    /// Drop every cached table.
    pub fn reset(&self) {
        self.tables.write().clear();
        tracing::debug!("dispatch cache reset");
    }

    /// Evict everything held for types that are gone. Returns how many
    /// tables were evicted.
    pub fn purge(&self) -> usize {
        let evicted = evict_dead(&mut self.tables.write());
        let extensions = self.extensions.purge();
        let catalog = self.catalog.purge();
        tracing::debug!(evicted, extensions, catalog, "purged dead types");
        evicted
    }

    /// Number of cached tables.
    pub fn cached_tables(&self) -> usize {
        self.tables.read().len()
    }

    // Extensions

    /// Add `method` to `target`'s overloads after the fact.
    ///
    /// An instance extension's first parameter is the receiver and must
    /// accept `target`. The extension is visible at once on `target` and on
    /// every cached table of a subtype; tables built later import it.
    #[tracing::instrument(
        level = "debug",
        skip(self, target, method),
        fields(target_type = target.name(), method = method.name_text())
    )]
    pub fn register_extension(
        &self,
        target: &TypeRef,
        method: MethodDescriptor,
        kind: ExtensionKind,
    ) -> DispatchResult<()> {
        if kind == ExtensionKind::Instance {
            match method.param(0) {
                None => {
                    return Err(invalid_extension(
                        method.name_text(),
                        target.name(),
                        "an instance extension needs a receiver parameter",
                    ))
                }
                Some(receiver) if !receiver.is_assignable_from(target) => {
                    return Err(invalid_extension(
                        method.name_text(),
                        target.name(),
                        format!("receiver parameter {receiver} does not accept {target}"),
                    ))
                }
                Some(_) => {}
            }
        }
        self.store_extension(target, kind, method);
        Ok(())
    }

    pub(crate) fn store_extension(
        &self,
        target: &TypeRef,
        kind: ExtensionKind,
        method: MethodDescriptor,
    ) {
        let gate = self.registration.write();
        let entry = ExtensionEntry {
            seq: self.extensions.next_seq(),
            method: method.as_extension(),
        };
        self.extensions.append(target, kind, entry.clone());
        for cached in self.tables.read().values() {
            let Some(owner) = cached.owner.upgrade() else {
                continue;
            };
            if target.is_assignable_from(&owner) {
                cached.real.add_extension(kind, entry.clone());
            }
        }
        drop(gate);
        tracing::debug!(
            target_type = target.name(),
            method = ?entry.method,
            ?kind,
            "registered extension"
        );
    }

    // Dispatch

    /// Invoke `name` on `receiver`.
    ///
    /// A type receiver dispatches statically; a bound method reference
    /// answers `call` by invoking the method it refers to.
    #[tracing::instrument(level = "debug", skip(self, receiver, args), fields(arity = args.len()))]
    pub fn invoke_method(&self, receiver: &Value, name: &str, args: &[Value]) -> DispatchResult {
        match receiver {
            Value::Null => Err(null_receiver(name)),
            Value::Type(ty) => self.invoke_static(ty, name, args),
            Value::Method(method) if name == "call" => {
                self.invoke_method(&method.receiver, &method.name, args)
            }
            _ => {
                let ty = self.type_of(receiver);
                self.table_for(&ty)?.invoke_method(self, receiver, name, args)
            }
        }
    }

    #[tracing::instrument(
        level = "debug",
        skip(self, ty, args),
        fields(type_name = ty.name(), arity = args.len())
    )]
    pub fn invoke_static(&self, ty: &TypeRef, name: &str, args: &[Value]) -> DispatchResult {
        self.table_for(ty)?.invoke_static(self, name, args)
    }

    #[tracing::instrument(
        level = "debug",
        skip(self, ty, args),
        fields(type_name = ty.name(), arity = args.len())
    )]
    pub fn invoke_constructor(&self, ty: &TypeRef, args: &[Value]) -> DispatchResult {
        self.table_for(ty)?.invoke_constructor(self, args)
    }

    #[tracing::instrument(level = "trace", skip(self, receiver))]
    pub fn get_property(&self, receiver: &Value, name: &str) -> DispatchResult {
        if receiver.is_null() {
            return Err(null_receiver(name));
        }
        let ty = self.type_of(receiver);
        self.table_for(&ty)?.get_property(self, receiver, name)
    }

    #[tracing::instrument(level = "trace", skip(self, receiver, value))]
    pub fn set_property(&self, receiver: &Value, name: &str, value: Value) -> DispatchResult<()> {
        if receiver.is_null() {
            return Err(null_receiver(name));
        }
        let ty = self.type_of(receiver);
        self.table_for(&ty)?.set_property(self, receiver, name, value)
    }

    // Queries

    /// The method `invoke_method` would select, without invoking it.
    pub fn responds_to(
        &self,
        receiver: &Value,
        name: &str,
        args: &[Value],
    ) -> DispatchResult<Option<MethodDescriptor>> {
        if receiver.is_null() {
            return Ok(None);
        }
        let ty = self.type_of(receiver);
        self.table_for(&ty)?.respond_to(self, receiver, name, args)
    }

    /// Whether `receiver`'s type has a bean property `name`.
    pub fn has_property(&self, receiver: &Value, name: &str) -> DispatchResult<bool> {
        if receiver.is_null() {
            return Ok(false);
        }
        let ty = self.type_of(receiver);
        Ok(self.table_for(&ty)?.has_property(self, name))
    }

    /// Instance methods callable on values of `ty`.
    pub fn methods_of(&self, ty: &TypeRef) -> DispatchResult<Vec<MethodDescriptor>> {
        Ok(self.table_for(ty)?.methods())
    }
}

impl Default for DispatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DispatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchRegistry")
            .field("cached_tables", &self.cached_tables())
            .field("accessible_override", &self.accessible_override())
            .finish_non_exhaustive()
    }
}

fn evict_dead(tables: &mut FxHashMap<TypeKey, CacheEntry>) -> usize {
    let before = tables.len();
    tables.retain(|_, entry| entry.owner.is_alive());
    let evicted = before - tables.len();
    if evicted > 0 {
        tracing::debug!(evicted, "evicted tables of dropped types");
    }
    evicted
}
