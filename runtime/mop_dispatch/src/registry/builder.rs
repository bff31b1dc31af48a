//! `RegistryBuilder` for creating registries with various configurations.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use mop_ir::SharedInterner;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use super::extension_store::ExtensionStore;
use super::DispatchRegistry;
use crate::core_types::CoreTypes;
use crate::introspect::{Introspect, MemberCatalog};
use crate::library;

/// Builder for [`DispatchRegistry`].
///
/// Defaults: accessible override off, library default methods registered,
/// a fresh interner and member catalog.
#[must_use]
pub struct RegistryBuilder {
    interner: Option<SharedInterner>,
    catalog: Option<Arc<MemberCatalog>>,
    introspector: Option<Arc<dyn Introspect>>,
    accessible_override: bool,
    default_methods: bool,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        RegistryBuilder {
            interner: None,
            catalog: None,
            introspector: None,
            accessible_override: false,
            default_methods: true,
        }
    }

    /// Share an interner with the host.
    pub fn interner(mut self, interner: SharedInterner) -> Self {
        self.interner = Some(interner);
        self
    }

    /// Use an existing catalog. It must share the registry's interner.
    pub fn catalog(mut self, catalog: Arc<MemberCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Describe host types with `introspector` instead of the catalog.
    ///
    /// Library types are always described by the catalog.
    pub fn introspector(mut self, introspector: Arc<dyn Introspect>) -> Self {
        self.introspector = Some(introspector);
        self
    }

    /// Allow invoking non-public members.
    pub fn accessible_override(mut self, enabled: bool) -> Self {
        self.accessible_override = enabled;
        self
    }

    /// Register the library-wide default extension methods.
    pub fn default_methods(mut self, enabled: bool) -> Self {
        self.default_methods = enabled;
        self
    }

    pub fn build(self) -> DispatchRegistry {
        let interner = self.interner.unwrap_or_default();
        let core = CoreTypes::new();
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(MemberCatalog::new(interner.clone())));
        library::define_core_members(&catalog, &core, &interner);

        let registry = DispatchRegistry {
            interner,
            core,
            catalog,
            introspector: self.introspector,
            tables: RwLock::new(FxHashMap::default()),
            build_locks: Mutex::new(FxHashMap::default()),
            registration: RwLock::new(()),
            extensions: ExtensionStore::new(),
            accessible_override: AtomicBool::new(self.accessible_override),
        };

        if self.default_methods {
            for (target, kind, method) in library::default_methods(&registry.core, &registry.interner)
            {
                registry.store_extension(&target, kind, method);
            }
        }

        tracing::debug!(
            accessible_override = self.accessible_override,
            default_methods = self.default_methods,
            "created dispatch registry"
        );
        registry
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
