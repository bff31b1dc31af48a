//! Extension method lists.
//!
//! Every registration gets a registry-wide sequence number. Lists stay
//! sorted by it, so a table that imported an extension at build time and a
//! table that received it by propagation hold the same candidates in the
//! same order.

use mop_ir::Name;
use rustc_hash::FxHashMap;

use crate::MethodDescriptor;

/// How an extension is matched.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ExtensionKind {
    /// Callable on instances; the receiver is passed as the first argument.
    Instance,
    /// Callable on the type; matched against the arguments as given.
    Static,
}

#[derive(Clone, Debug)]
pub(crate) struct ExtensionEntry {
    pub seq: u64,
    pub method: MethodDescriptor,
}

/// Instance and static extensions by name.
#[derive(Clone, Debug, Default)]
pub struct ExtensionMethods {
    instance: FxHashMap<Name, Vec<ExtensionEntry>>,
    statics: FxHashMap<Name, Vec<ExtensionEntry>>,
}

impl ExtensionMethods {
    fn lists_mut(&mut self, kind: ExtensionKind) -> &mut FxHashMap<Name, Vec<ExtensionEntry>> {
        match kind {
            ExtensionKind::Instance => &mut self.instance,
            ExtensionKind::Static => &mut self.statics,
        }
    }

    /// Insert in sequence order. Returns `false` if the entry is already here.
    pub(crate) fn insert(&mut self, kind: ExtensionKind, entry: ExtensionEntry) -> bool {
        let list = self.lists_mut(kind).entry(entry.method.name()).or_default();
        match list.binary_search_by_key(&entry.seq, |e| e.seq) {
            Ok(_) => false,
            Err(pos) => {
                list.insert(pos, entry);
                true
            }
        }
    }

    /// Import everything from `other`.
    pub(crate) fn merge(&mut self, other: &ExtensionMethods) {
        for entries in other.instance.values() {
            for entry in entries {
                self.insert(ExtensionKind::Instance, entry.clone());
            }
        }
        for entries in other.statics.values() {
            for entry in entries {
                self.insert(ExtensionKind::Static, entry.clone());
            }
        }
    }

    pub fn instance(&self, name: Name) -> Vec<MethodDescriptor> {
        Self::candidates(&self.instance, name)
    }

    pub fn statics(&self, name: Name) -> Vec<MethodDescriptor> {
        Self::candidates(&self.statics, name)
    }

    fn candidates(
        lists: &FxHashMap<Name, Vec<ExtensionEntry>>,
        name: Name,
    ) -> Vec<MethodDescriptor> {
        lists
            .get(&name)
            .map(|entries| entries.iter().map(|e| e.method.clone()).collect())
            .unwrap_or_default()
    }

    pub fn all_instance(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.instance.values().flatten().map(|e| &e.method)
    }

    pub fn len(&self) -> usize {
        self.instance.values().map(Vec::len).sum::<usize>()
            + self.statics.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
