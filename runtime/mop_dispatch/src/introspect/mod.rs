//! Introspection capability.
//!
//! Tables are built from what an [`Introspect`] implementation reports as a
//! type's declared members. Hosts that can enumerate their types some other
//! way implement the trait themselves; everyone else fills a
//! [`MemberCatalog`].

use std::sync::Arc;

use mop_ir::{Name, SharedInterner, TypeKey, TypeRef, WeakTypeRef};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::MethodDescriptor;

/// Failure to enumerate a type's members.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("introspection of {type_name} failed: {reason}")]
pub struct IntrospectionError {
    pub type_name: String,
    pub reason: String,
}

/// Whether a field-backed property accepts writes.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PropertyAccess {
    ReadWrite,
    ReadOnly,
}

/// Field-backed property declared on a type.
#[derive(Clone, Debug)]
pub struct PropertyDecl {
    pub name: Name,
    pub name_text: Arc<str>,
    /// Declared field type, held weakly like descriptor signatures.
    pub ty: Option<WeakTypeRef>,
    pub access: PropertyAccess,
}

/// Members a type declares itself, excluding anything inherited.
#[derive(Clone, Debug, Default)]
pub struct DeclaredMembers {
    pub methods: Vec<MethodDescriptor>,
    pub constructors: Vec<MethodDescriptor>,
    pub properties: Vec<PropertyDecl>,
}

/// Source of declared members for table construction.
///
/// Called while a table is being built, so an implementation must not
/// register extensions on the same registry.
pub trait Introspect: Send + Sync {
    fn declared_members(&self, ty: &TypeRef) -> Result<DeclaredMembers, IntrospectionError>;
}

enum CatalogEntry {
    Members(DeclaredMembers),
    /// The host cannot describe this type.
    Opaque(String),
}

struct CatalogSlot {
    owner: WeakTypeRef,
    entry: CatalogEntry,
}

/// Thread-safe, host-filled member catalog.
///
/// Types never defined here declare nothing. Entries hold their type weakly
/// and are dropped by [`MemberCatalog::purge`] once the type is gone.
pub struct MemberCatalog {
    interner: SharedInterner,
    slots: RwLock<FxHashMap<TypeKey, CatalogSlot>>,
}

impl MemberCatalog {
    pub fn new(interner: SharedInterner) -> Self {
        MemberCatalog {
            interner,
            slots: RwLock::new(FxHashMap::default()),
        }
    }

    fn update(&self, ty: &TypeRef, f: impl FnOnce(&mut DeclaredMembers)) {
        let mut slots = self.slots.write();
        let slot = slots.entry(ty.key()).or_insert_with(|| CatalogSlot {
            owner: ty.downgrade(),
            entry: CatalogEntry::Members(DeclaredMembers::default()),
        });
        if let CatalogEntry::Opaque(_) = slot.entry {
            slot.entry = CatalogEntry::Members(DeclaredMembers::default());
        }
        if let CatalogEntry::Members(members) = &mut slot.entry {
            f(members);
        }
    }

    /// Replace everything `ty` declares.
    pub fn define(&self, ty: &TypeRef, members: DeclaredMembers) {
        self.update(ty, |declared| *declared = members);
    }

    pub fn define_method(&self, ty: &TypeRef, method: MethodDescriptor) {
        self.update(ty, |members| members.methods.push(method));
    }

    pub fn define_constructor(&self, ty: &TypeRef, constructor: MethodDescriptor) {
        self.update(ty, |members| members.constructors.push(constructor));
    }

    pub fn define_property(
        &self,
        ty: &TypeRef,
        name: &str,
        prop_ty: Option<&TypeRef>,
        access: PropertyAccess,
    ) {
        let decl = PropertyDecl {
            name: self.interner.intern(name),
            name_text: Arc::from(name),
            ty: prop_ty.map(TypeRef::downgrade),
            access,
        };
        self.update(ty, |members| members.properties.push(decl));
    }

    /// Mark `ty` as impossible to introspect; building its table fails.
    pub fn mark_opaque(&self, ty: &TypeRef, reason: &str) {
        self.slots.write().insert(
            ty.key(),
            CatalogSlot {
                owner: ty.downgrade(),
                entry: CatalogEntry::Opaque(reason.to_owned()),
            },
        );
    }

    /// Drop entries whose type is gone. Returns how many were dropped.
    pub fn purge(&self) -> usize {
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|_, slot| slot.owner.is_alive());
        before - slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

impl Introspect for MemberCatalog {
    fn declared_members(&self, ty: &TypeRef) -> Result<DeclaredMembers, IntrospectionError> {
        match self.slots.read().get(&ty.key()).map(|slot| &slot.entry) {
            Some(CatalogEntry::Members(members)) => Ok(members.clone()),
            Some(CatalogEntry::Opaque(reason)) => Err(IntrospectionError {
                type_name: ty.name().to_owned(),
                reason: reason.clone(),
            }),
            None => Ok(DeclaredMembers::default()),
        }
    }
}

impl std::fmt::Debug for MemberCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberCatalog")
            .field("types", &self.slots.read().len())
            .finish_non_exhaustive()
    }
}
