//! Bean property discovery.

use mop_ir::{Name, PrimitiveKind, StringInterner};
use rustc_hash::FxHashMap;

use crate::introspect::{PropertyAccess, PropertyDecl};
use crate::MethodDescriptor;

/// How one side of a property is reached.
#[derive(Clone, Debug)]
pub(crate) enum Accessor {
    /// Instance field of the same name.
    Field(Name),
    Method(MethodDescriptor),
}

#[derive(Clone, Debug, Default)]
pub(crate) struct BeanProperty {
    pub getter: Option<Accessor>,
    pub setter: Option<Accessor>,
}

/// Properties from declared fields, then from `getFoo`/`isFoo`/`setFoo`
/// accessor methods, which take precedence over field access.
pub(crate) fn collect_properties(
    interner: &StringInterner,
    fields: &[PropertyDecl],
    instance_methods: &FxHashMap<Name, Vec<MethodDescriptor>>,
) -> FxHashMap<Name, BeanProperty> {
    let mut properties: FxHashMap<Name, BeanProperty> = FxHashMap::default();

    for field in fields {
        let prop = properties.entry(field.name).or_default();
        prop.getter = Some(Accessor::Field(field.name));
        if field.access == PropertyAccess::ReadWrite {
            prop.setter = Some(Accessor::Field(field.name));
        }
    }

    // Sorted so `getFoo` is seen before `isFoo`.
    let mut methods: Vec<&MethodDescriptor> = instance_methods.values().flatten().collect();
    methods.sort_by(|a, b| a.name_text().cmp(b.name_text()));

    for method in methods {
        let Some((kind, property)) = accessor_kind(method) else {
            continue;
        };
        let prop = properties.entry(interner.intern(&property)).or_default();
        match kind {
            AccessorKind::Get => prop.getter = Some(Accessor::Method(method.clone())),
            AccessorKind::Is => {
                if !matches!(prop.getter, Some(Accessor::Method(_))) {
                    prop.getter = Some(Accessor::Method(method.clone()));
                }
            }
            AccessorKind::Set => {
                if !matches!(prop.setter, Some(Accessor::Method(_))) {
                    prop.setter = Some(Accessor::Method(method.clone()));
                }
            }
        }
    }

    properties
}

enum AccessorKind {
    Get,
    Is,
    Set,
}

fn accessor_kind(method: &MethodDescriptor) -> Option<(AccessorKind, String)> {
    if method.is_static() {
        return None;
    }
    let name = method.name_text();
    let returns_void = method
        .return_type()
        .is_some_and(|ty| ty.primitive_kind() == Some(PrimitiveKind::Void));
    let (kind, rest) = if let Some(rest) = name.strip_prefix("get") {
        (method.arity() == 0 && !returns_void).then_some((AccessorKind::Get, rest))?
    } else if let Some(rest) = name.strip_prefix("is") {
        let returns_boolean = method
            .return_type()
            .is_some_and(|ty| ty.primitive_kind() == Some(PrimitiveKind::Boolean));
        (method.arity() == 0 && returns_boolean).then_some((AccessorKind::Is, rest))?
    } else if let Some(rest) = name.strip_prefix("set") {
        (method.arity() == 1).then_some((AccessorKind::Set, rest))?
    } else {
        return None;
    };
    if !rest.starts_with(|c: char| c.is_uppercase()) {
        return None;
    }
    Some((kind, decapitalize(rest)))
}

/// Bean-style decapitalization: `Name` → `name`, but `URL` stays `URL`.
pub(crate) fn decapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(first), Some(second)) if first.is_uppercase() && second.is_uppercase() => {
            s.to_owned()
        }
        (Some(first), _) => first.to_lowercase().chain(s[first.len_utf8()..].chars()).collect(),
        (None, _) => String::new(),
    }
}

/// `name` → `Name`.
pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
