use std::hash::{Hash, Hasher};

use mop_ir::StringInterner;
use rustc_hash::FxHasher;

use super::{count_value, index_of, items_of, text_of};
use crate::core_types::CoreTypes;
use crate::errors::InvokeError;
use crate::introspect::MemberCatalog;
use crate::{MethodDescriptor, Value};

fn hash_code(value: &Value) -> i64 {
    if let Some(instance) = value.as_object() {
        return i64::from_ne_bytes(instance.id().to_ne_bytes());
    }
    let mut hasher = FxHasher::default();
    value.to_string().hash(&mut hasher);
    i64::from_ne_bytes(hasher.finish().to_ne_bytes())
}

fn substring(text: &str, begin: usize, end: usize) -> Result<Value, InvokeError> {
    let chars: Vec<char> = text.chars().collect();
    if begin > end || end > chars.len() {
        return Err(InvokeError::raised(format!(
            "substring: range {begin}..{end} out of bounds for length {}",
            chars.len()
        )));
    }
    Ok(Value::string(chars[begin..end].iter().collect()))
}

pub(crate) fn define_core_members(
    catalog: &MemberCatalog,
    core: &CoreTypes,
    interner: &StringInterner,
) {
    let object = &core.object;
    catalog.define_method(
        object,
        MethodDescriptor::builder(interner, "toString", object)
            .returns(&core.string)
            .invoke(|receiver, _| Ok(Value::string(receiver.to_string()))),
    );
    catalog.define_method(
        object,
        MethodDescriptor::builder(interner, "hashCode", object)
            .returns(&core.prim_int)
            .invoke(|receiver, _| Ok(Value::Int(hash_code(receiver)))),
    );
    catalog.define_method(
        object,
        MethodDescriptor::builder(interner, "equals", object)
            .param(object)
            .returns(&core.prim_boolean)
            .invoke(|receiver, args| Ok(Value::Bool(*receiver == args[0]))),
    );

    let string = &core.string;
    catalog.define_method(
        string,
        MethodDescriptor::builder(interner, "length", string)
            .returns(&core.prim_int)
            .invoke(|receiver, _| {
                Ok(count_value(text_of(receiver, "length")?.chars().count()))
            }),
    );
    catalog.define_method(
        string,
        MethodDescriptor::builder(interner, "toUpperCase", string)
            .returns(string)
            .invoke(|receiver, _| {
                Ok(Value::string(text_of(receiver, "toUpperCase")?.to_uppercase()))
            }),
    );
    catalog.define_method(
        string,
        MethodDescriptor::builder(interner, "substring", string)
            .param(&core.prim_int)
            .returns(string)
            .invoke(|receiver, args| {
                let text = text_of(receiver, "substring")?;
                substring(text, index_of(&args[0], "substring")?, text.chars().count())
            }),
    );
    catalog.define_method(
        string,
        MethodDescriptor::builder(interner, "substring", string)
            .params(&[&core.prim_int, &core.prim_int])
            .returns(string)
            .invoke(|receiver, args| {
                let text = text_of(receiver, "substring")?;
                substring(
                    text,
                    index_of(&args[0], "substring")?,
                    index_of(&args[1], "substring")?,
                )
            }),
    );
    catalog.define_method(
        string,
        MethodDescriptor::builder(interner, "concat", string)
            .param(string)
            .returns(string)
            .invoke(|receiver, args| {
                let head = text_of(receiver, "concat")?;
                let tail = text_of(&args[0], "concat")?;
                Ok(Value::string(format!("{head}{tail}")))
            }),
    );

    let number = &core.number;
    catalog.define_method(
        number,
        MethodDescriptor::builder(interner, "intValue", number)
            .returns(&core.prim_int)
            .invoke(|receiver, _| match receiver {
                Value::Int(n) => Ok(Value::Int(*n)),
                #[expect(clippy::cast_possible_truncation, reason = "truncation toward zero")]
                Value::Float(f) => Ok(Value::Int(*f as i64)),
                other => Err(InvokeError::raised(format!("intValue: not a number: {other}"))),
            }),
    );
    catalog.define_method(
        number,
        MethodDescriptor::builder(interner, "doubleValue", number)
            .returns(&core.prim_double)
            .invoke(|receiver, _| match receiver {
                #[expect(clippy::cast_precision_loss, reason = "numeric widening")]
                Value::Int(n) => Ok(Value::Float(*n as f64)),
                Value::Float(f) => Ok(Value::Float(*f)),
                other => Err(InvokeError::raised(format!("doubleValue: not a number: {other}"))),
            }),
    );

    let array_list = &core.array_list;
    catalog.define_method(
        array_list,
        MethodDescriptor::builder(interner, "size", array_list)
            .returns(&core.prim_int)
            .invoke(|receiver, _| Ok(count_value(items_of(receiver, "size")?.len()))),
    );
    catalog.define_method(
        array_list,
        MethodDescriptor::builder(interner, "get", array_list)
            .param(&core.prim_int)
            .returns(&core.object)
            .invoke(|receiver, args| {
                let items = items_of(receiver, "get")?;
                let index = index_of(&args[0], "get")?;
                items.get(index).cloned().ok_or_else(|| {
                    InvokeError::raised(format!(
                        "get: index {index} out of bounds for length {}",
                        items.len()
                    ))
                })
            }),
    );
    catalog.define_constructor(
        array_list,
        MethodDescriptor::constructor(interner, array_list)
            .invoke(|_, _| Ok(Value::list(Vec::new()))),
    );

    let map = &core.linked_hash_map;
    catalog.define_method(
        map,
        MethodDescriptor::builder(interner, "size", map)
            .returns(&core.prim_int)
            .invoke(|receiver, _| {
                let entries = receiver
                    .as_map()
                    .ok_or_else(|| InvokeError::raised("size expects a map"))?;
                Ok(count_value(entries.len()))
            }),
    );
    // `get(String)` doubles as the generic getter: `map.key` reads an entry.
    catalog.define_method(
        map,
        MethodDescriptor::builder(interner, "get", map)
            .param(&core.string)
            .returns(&core.object)
            .invoke(|receiver, args| {
                let entries = receiver
                    .as_map()
                    .ok_or_else(|| InvokeError::raised("get expects a map"))?;
                let key = text_of(&args[0], "get")?;
                Ok(entries.get(key).cloned().unwrap_or(Value::Null))
            }),
    );
    catalog.define_method(
        map,
        MethodDescriptor::builder(interner, "containsKey", map)
            .param(&core.string)
            .returns(&core.prim_boolean)
            .invoke(|receiver, args| {
                let entries = receiver
                    .as_map()
                    .ok_or_else(|| InvokeError::raised("containsKey expects a map"))?;
                Ok(Value::Bool(entries.contains_key(text_of(&args[0], "containsKey")?)))
            }),
    );
}
