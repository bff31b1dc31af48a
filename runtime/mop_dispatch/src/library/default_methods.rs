use mop_ir::{StringInterner, TypeRef};

use super::{count_value, items_of};
use crate::core_types::CoreTypes;
use crate::errors::InvokeError;
use crate::table::ExtensionKind;
use crate::{MethodDescriptor, Value};

/// Library-wide extensions: `inspect`, `join`, `count`, `first`, `keys`.
pub(crate) fn default_methods(
    core: &CoreTypes,
    interner: &StringInterner,
) -> Vec<(TypeRef, ExtensionKind, MethodDescriptor)> {
    let instance = |target: &TypeRef, method: MethodDescriptor| {
        (target.clone(), ExtensionKind::Instance, method)
    };

    vec![
        instance(
            &core.object,
            MethodDescriptor::builder(interner, "inspect", &core.object)
                .param(&core.object)
                .returns(&core.string)
                .invoke(|_, args| Ok(Value::string(args[0].inspect()))),
        ),
        instance(
            &core.collection,
            MethodDescriptor::builder(interner, "join", &core.collection)
                .params(&[&core.collection, &core.string])
                .returns(&core.string)
                .invoke(|_, args| {
                    let items = items_of(&args[0], "join")?;
                    let separator = args[1].as_str().unwrap_or_default();
                    let parts: Vec<String> = items.iter().map(Value::to_string).collect();
                    Ok(Value::string(parts.join(separator)))
                }),
        ),
        instance(
            &core.collection,
            MethodDescriptor::builder(interner, "count", &core.collection)
                .params(&[&core.collection, &core.object])
                .returns(&core.prim_int)
                .invoke(|_, args| {
                    let items = items_of(&args[0], "count")?;
                    Ok(count_value(items.iter().filter(|v| **v == args[1]).count()))
                }),
        ),
        instance(
            &core.list,
            MethodDescriptor::builder(interner, "first", &core.list)
                .param(&core.list)
                .returns(&core.object)
                .invoke(|_, args| {
                    Ok(items_of(&args[0], "first")?
                        .first()
                        .cloned()
                        .unwrap_or(Value::Null))
                }),
        ),
        instance(
            &core.map,
            MethodDescriptor::builder(interner, "keys", &core.map)
                .param(&core.map)
                .returns(&core.list)
                .invoke(|_, args| {
                    let entries = args[0]
                        .as_map()
                        .ok_or_else(|| InvokeError::raised("keys expects a map"))?;
                    Ok(Value::list(entries.keys().map(|k| Value::str(k)).collect()))
                }),
        ),
    ]
}
