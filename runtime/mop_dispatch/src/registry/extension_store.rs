//! Durable extension store.
//!
//! Extensions registered on a type outlive that type's cached table, so a
//! table evicted or removed from the cache is rebuilt with the same
//! extensions it had.

use std::sync::atomic::{AtomicU64, Ordering};

use mop_ir::{TypeKey, TypeRef, WeakTypeRef};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::table::{ExtensionEntry, ExtensionKind, ExtensionMethods};

struct StoredExtensions {
    owner: WeakTypeRef,
    methods: ExtensionMethods,
}

pub(crate) struct ExtensionStore {
    next_seq: AtomicU64,
    entries: RwLock<FxHashMap<TypeKey, StoredExtensions>>,
}

impl ExtensionStore {
    pub(crate) fn new() -> Self {
        ExtensionStore {
            next_seq: AtomicU64::new(0),
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// Registration order across the whole registry.
    pub(crate) fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn append(&self, target: &TypeRef, kind: ExtensionKind, entry: ExtensionEntry) {
        let mut entries = self.entries.write();
        let stored = entries
            .entry(target.key())
            .or_insert_with(|| StoredExtensions {
                owner: target.downgrade(),
                methods: ExtensionMethods::default(),
            });
        stored.methods.insert(kind, entry);
    }

    /// Extensions registered directly on `key`.
    pub(crate) fn snapshot(&self, key: TypeKey) -> ExtensionMethods {
        self.entries
            .read()
            .get(&key)
            .map(|stored| stored.methods.clone())
            .unwrap_or_default()
    }

    /// Forget extensions of types that are gone.
    pub(crate) fn purge(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, stored| stored.owner.is_alive());
        before - entries.len()
    }
}
