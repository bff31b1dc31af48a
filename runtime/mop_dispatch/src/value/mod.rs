//! Dynamic values flowing through dispatch.
//!
//! `Value` is the receiver and argument currency of every dispatch
//! operation. Scalars are inline; strings, collections and instances are
//! `Arc`-shared so cloning a value never copies its payload.
//!
//! # Runtime Types
//!
//! A value does not carry its own [`TypeRef`] except for instances and type
//! receivers. The registry's `CoreTypes::type_of` maps every other variant to
//! its library type (`Integer`, `String`, `ArrayList`, ...).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mop_ir::{Name, TypeRef};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Dynamic value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    /// Integral number.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Plain text.
    Str(Arc<str>),
    /// Interpolated text. Accepted wherever `String` is declared and
    /// converted to `Str` when passed.
    Interpolated(Arc<str>),
    List(Arc<Vec<Value>>),
    /// Map with ordered string keys.
    Map(Arc<BTreeMap<String, Value>>),
    /// Instance of a host-defined type.
    Object(Instance),
    /// Method bound to a receiver, produced by property access on a
    /// zero-argument method name.
    Method(Arc<MethodRef>),
    /// A type used as a static receiver.
    Type(TypeRef),
}

impl Value {
    #[inline]
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    #[inline]
    pub fn string(s: String) -> Self {
        Value::Str(Arc::from(s))
    }

    #[inline]
    pub fn interpolated(s: &str) -> Self {
        Value::Interpolated(Arc::from(s))
    }

    #[inline]
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text of a plain or interpolated string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Interpolated(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Developer-facing rendering: strings quoted, nested values inspected.
    pub fn inspect(&self) -> String {
        match self {
            Value::Str(s) | Value::Interpolated(s) => format!("'{s}'"),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::inspect).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Map(entries) => {
                if entries.is_empty() {
                    return "[:]".to_owned();
                }
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{k}:{}", v.inspect()))
                    .collect();
                format!("[{}]", parts.join(", "))
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n:?}"),
            Value::Str(s) | Value::Interpolated(s) => f.write_str(s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                if entries.is_empty() {
                    return f.write_str("[:]");
                }
                write!(f, "[")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                write!(f, "]")
            }
            Value::Object(instance) => write!(f, "{instance}"),
            Value::Method(method) => write!(f, "{method}"),
            Value::Type(ty) => write!(f, "class {ty}"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(n) => write!(f, "Float({n:?})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Interpolated(s) => write!(f, "Interpolated({s:?})"),
            Value::List(items) => f.debug_tuple("List").field(&**items).finish(),
            Value::Map(entries) => f.debug_tuple("Map").field(&**entries).finish(),
            Value::Object(instance) => write!(f, "Object({instance})"),
            Value::Method(method) => write!(f, "Method({method})"),
            Value::Type(ty) => write!(f, "Type({ty:?})"),
        }
    }
}

/// Structural equality; instances compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (
                Value::Str(a) | Value::Interpolated(a),
                Value::Str(b) | Value::Interpolated(b),
            ) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.id() == b.id(),
            (Value::Method(a), Value::Method(b)) => a.receiver == b.receiver && a.name == b.name,
            (Value::Type(a), Value::Type(b)) => a == b,
            _ => false,
        }
    }
}

struct InstanceData {
    id: u64,
    ty: TypeRef,
    fields: RwLock<FxHashMap<Name, Value>>,
}

/// Instance of a host-defined type.
///
/// Holds its type strongly, so a type stays alive while any instance does.
/// Fields are interior-mutable; clones share the same instance.
#[derive(Clone)]
pub struct Instance(Arc<InstanceData>);

impl Instance {
    pub fn new(ty: &TypeRef) -> Self {
        Instance(Arc::new(InstanceData {
            id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            ty: ty.clone(),
            fields: RwLock::new(FxHashMap::default()),
        }))
    }

    /// Process-unique identity, also the default hash code.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.0.ty
    }

    /// Field value; unset fields read as `Null`.
    pub fn field(&self, name: Name) -> Value {
        self.0.fields.read().get(&name).cloned().unwrap_or(Value::Null)
    }

    pub fn set_field(&self, name: Name, value: Value) {
        self.0.fields.write().insert(name, value);
    }

    pub fn into_value(self) -> Value {
        Value::Object(self)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.0.ty.name(), self.0.id)
    }
}

/// A method name bound to its receiver.
pub struct MethodRef {
    pub receiver: Value,
    pub name: Arc<str>,
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.&{}", self.receiver, self.name)
    }
}
