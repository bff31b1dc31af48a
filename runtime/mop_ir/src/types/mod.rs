//! Runtime type handles.
//!
//! A [`TypeRef`] is the identity the dispatch registry caches tables under.
//! Types form a DAG: a class has at most one supertype and any number of
//! interfaces, an interface extends any number of interfaces, and primitives
//! carry a handle to their boxed wrapper class. Parents are always created
//! before children, so the graph has no reference cycles.

use rustc_hash::FxHashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_TYPE_KEY: AtomicU64 = AtomicU64::new(1);

/// Process-unique type identity. Never reused, even after the type is dropped.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
pub struct TypeKey(u64);

impl TypeKey {
    fn fresh() -> Self {
        TypeKey(NEXT_TYPE_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Primitive value kinds.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PrimitiveKind {
    Int,
    Long,
    Double,
    Boolean,
    Void,
}

impl PrimitiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Void => "void",
        }
    }

    /// Position in the numeric widening order `int < long < double`.
    fn numeric_rank(self) -> Option<u8> {
        match self {
            Self::Int => Some(0),
            Self::Long => Some(1),
            Self::Double => Some(2),
            Self::Boolean | Self::Void => None,
        }
    }

    /// Whether a value of kind `from` may be passed where `self` is expected.
    pub fn widens_from(self, from: PrimitiveKind) -> bool {
        if self == from {
            return true;
        }
        match (self.numeric_rank(), from.numeric_rank()) {
            (Some(to), Some(from)) => to >= from,
            _ => false,
        }
    }

    pub fn is_integral(self) -> bool {
        matches!(self, Self::Int | Self::Long)
    }

    pub fn is_floating(self) -> bool {
        matches!(self, Self::Double)
    }
}

/// What sort of type a [`TypeRef`] denotes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeKind {
    Class,
    Interface,
    Primitive(PrimitiveKind),
}

struct TypeInfo {
    key: TypeKey,
    name: Arc<str>,
    kind: TypeKind,
    supertype: Option<TypeRef>,
    interfaces: Vec<TypeRef>,
    /// For boxed wrapper classes: the primitive they box.
    boxes: Option<PrimitiveKind>,
    /// For primitives: the wrapper class values are boxed into.
    boxed: Option<TypeRef>,
}

/// Cheap, cloneable handle to an immutable runtime type.
///
/// Equality and hashing use the [`TypeKey`] only.
#[derive(Clone)]
pub struct TypeRef(Arc<TypeInfo>);

impl TypeRef {
    fn from_info(info: TypeInfo) -> Self {
        TypeRef(Arc::new(info))
    }

    /// A class. A class without a supertype is a hierarchy root.
    pub fn class(name: &str, supertype: Option<&TypeRef>, interfaces: &[TypeRef]) -> Self {
        Self::from_info(TypeInfo {
            key: TypeKey::fresh(),
            name: Arc::from(name),
            kind: TypeKind::Class,
            supertype: supertype.cloned(),
            interfaces: interfaces.to_vec(),
            boxes: None,
            boxed: None,
        })
    }

    /// An interface extending `extends`.
    pub fn interface(name: &str, extends: &[TypeRef]) -> Self {
        Self::from_info(TypeInfo {
            key: TypeKey::fresh(),
            name: Arc::from(name),
            kind: TypeKind::Interface,
            supertype: None,
            interfaces: extends.to_vec(),
            boxes: None,
            boxed: None,
        })
    }

    /// A wrapper class boxing primitive values of `boxes`.
    pub fn boxed_class(
        name: &str,
        supertype: &TypeRef,
        interfaces: &[TypeRef],
        boxes: PrimitiveKind,
    ) -> Self {
        Self::from_info(TypeInfo {
            key: TypeKey::fresh(),
            name: Arc::from(name),
            kind: TypeKind::Class,
            supertype: Some(supertype.clone()),
            interfaces: interfaces.to_vec(),
            boxes: Some(boxes),
            boxed: None,
        })
    }

    /// A primitive type, optionally paired with its wrapper class.
    pub fn primitive(kind: PrimitiveKind, boxed: Option<&TypeRef>) -> Self {
        Self::from_info(TypeInfo {
            key: TypeKey::fresh(),
            name: Arc::from(kind.as_str()),
            kind: TypeKind::Primitive(kind),
            supertype: None,
            interfaces: Vec::new(),
            boxes: None,
            boxed: boxed.cloned(),
        })
    }

    #[inline]
    pub fn key(&self) -> TypeKey {
        self.0.key
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> TypeKind {
        self.0.kind
    }

    pub fn supertype(&self) -> Option<&TypeRef> {
        self.0.supertype.as_ref()
    }

    pub fn interfaces(&self) -> &[TypeRef] {
        &self.0.interfaces
    }

    pub fn is_interface(&self) -> bool {
        self.0.kind == TypeKind::Interface
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.0.kind, TypeKind::Primitive(_))
    }

    /// A class with no supertype (the universal `Object` of a hierarchy).
    pub fn is_root(&self) -> bool {
        self.0.kind == TypeKind::Class && self.0.supertype.is_none()
    }

    /// Primitive kind of a primitive, or the kind a wrapper class boxes.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.0.kind {
            TypeKind::Primitive(kind) => Some(kind),
            _ => self.0.boxes,
        }
    }

    /// Wrapper class of a primitive.
    pub fn boxed(&self) -> Option<&TypeRef> {
        self.0.boxed.as_ref()
    }

    pub fn downgrade(&self) -> WeakTypeRef {
        WeakTypeRef {
            key: self.key(),
            ptr: Arc::downgrade(&self.0),
        }
    }

    /// Whether a value whose type is `from` may be passed where `self` is
    /// declared.
    ///
    /// A primitive and its wrapper are mutually assignable, numeric kinds
    /// widen `int -> long -> double`, the root class accepts every
    /// non-primitive (and every boxed primitive), and otherwise `self` must be
    /// among `from`'s ancestors.
    pub fn is_assignable_from(&self, from: &TypeRef) -> bool {
        if self == from {
            return true;
        }

        if let (Some(to_kind), Some(from_kind)) = (self.primitive_kind(), from.primitive_kind()) {
            if to_kind.widens_from(from_kind) {
                return true;
            }
        }

        if self.is_primitive() {
            return false;
        }

        let from = match (from.kind(), from.boxed()) {
            (TypeKind::Primitive(_), Some(boxed)) => boxed,
            (TypeKind::Primitive(_), None) => return false,
            _ => from,
        };

        if self.is_root() {
            return true;
        }

        from.ancestors().any(|ancestor| ancestor == *self)
    }

    /// Supertypes and interfaces, transitively, nearest first. Excludes `self`.
    pub fn ancestors(&self) -> impl Iterator<Item = TypeRef> {
        let mut seen = FxHashSet::default();
        let mut queue: std::collections::VecDeque<TypeRef> = self.direct_parents().collect();
        std::iter::from_fn(move || {
            while let Some(next) = queue.pop_front() {
                if seen.insert(next.key()) {
                    queue.extend(next.direct_parents());
                    return Some(next);
                }
            }
            None
        })
    }

    /// Supertype first, then interfaces in declaration order.
    pub fn direct_parents(&self) -> impl Iterator<Item = TypeRef> + '_ {
        self.0
            .supertype
            .iter()
            .chain(self.0.interfaces.iter())
            .cloned()
    }

    /// Longest distance from the root of the hierarchy.
    ///
    /// The root class is 0, every other type one more than its deepest
    /// direct parent; a parentless interface sits just below the root. A
    /// type is always deeper than each of its ancestors.
    pub fn depth(&self) -> usize {
        match (self.direct_parents().map(|p| p.depth()).max(), self.0.kind) {
            (Some(deepest), _) => deepest + 1,
            (None, TypeKind::Interface) => 1,
            (None, _) => 0,
        }
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({}{})", self.name(), self.key())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Weak handle to a runtime type, remembering its key after the type is gone.
#[derive(Clone)]
pub struct WeakTypeRef {
    key: TypeKey,
    ptr: Weak<TypeInfo>,
}

impl WeakTypeRef {
    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn upgrade(&self) -> Option<TypeRef> {
        self.ptr.upgrade().map(TypeRef)
    }

    /// Whether the type is still referenced by anyone holding a `TypeRef`.
    pub fn is_alive(&self) -> bool {
        self.ptr.strong_count() > 0
    }
}

impl fmt::Debug for WeakTypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(ty) => write!(f, "WeakTypeRef({}{})", ty.name(), self.key),
            None => write!(f, "WeakTypeRef(<dropped>{})", self.key),
        }
    }
}
