//! The table built from a type's members.

use std::sync::Arc;

use mop_ir::{Name, TypeKey, TypeRef, Visibility, WeakTypeRef};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::properties::{collect_properties, Accessor, BeanProperty};
use super::{capitalize, DispatchTable, ExtensionEntry, ExtensionKind, ExtensionMethods};
use crate::errors::{
    access_denied, no_matching_constructor, no_such_method, no_such_property, read_only_property,
    table_build, write_only_property, DispatchErrorKind, DispatchResult,
};
use crate::introspect::PropertyDecl;
use crate::resolver::{coerce_arguments, resolve};
use crate::value::MethodRef;
use crate::{DispatchRegistry, MethodDescriptor, Value};

/// How a selected descriptor is called.
#[derive(Copy, Clone, Debug)]
enum CallShape {
    /// Declared or inherited instance method.
    Instance,
    /// Instance extension; the receiver becomes the first argument.
    Extension,
    /// Static method or static extension.
    Static,
}

/// Dispatch table built from introspection.
///
/// Declared and inherited members are fixed at build time. Extension lists
/// grow for the table's whole lifetime.
pub struct TypeTable {
    owner: WeakTypeRef,
    type_name: Arc<str>,
    instance_methods: FxHashMap<Name, Vec<MethodDescriptor>>,
    static_methods: FxHashMap<Name, Vec<MethodDescriptor>>,
    constructors: Vec<MethodDescriptor>,
    /// Field-backed properties, own declarations first.
    fields: Vec<PropertyDecl>,
    properties: FxHashMap<Name, BeanProperty>,
    generic_getter: Option<MethodDescriptor>,
    generic_setter: Option<MethodDescriptor>,
    extensions: RwLock<ExtensionMethods>,
}

/// Add `method` unless an overload with identical parameters is present.
fn insert_overload(map: &mut FxHashMap<Name, Vec<MethodDescriptor>>, method: &MethodDescriptor) {
    let overloads = map.entry(method.name()).or_default();
    if !overloads.iter().any(|m| m.same_params(method)) {
        overloads.push(method.clone());
    }
}

impl TypeTable {
    /// Build the table of `ty`.
    ///
    /// Ancestor tables are fetched (and built if needed) through the
    /// registry. `stored` holds the extensions registered on `ty` itself.
    pub(crate) fn build(
        registry: &DispatchRegistry,
        ty: &TypeRef,
        stored: &ExtensionMethods,
    ) -> DispatchResult<TypeTable> {
        let declared = registry
            .declared_members(ty)
            .map_err(|e| table_build(ty.name(), e))?;

        let parents = ty
            .direct_parents()
            .map(|parent| registry.real_table_for(&parent))
            .collect::<DispatchResult<Vec<_>>>()
            .map_err(|e| e.with_note(format!("while building the table of {}", ty.name())))?;

        let string = &registry.core().string;
        let mut instance_methods = FxHashMap::default();
        let mut static_methods = FxHashMap::default();
        let mut generic_getter = None;
        let mut generic_setter = None;

        for method in &declared.methods {
            if method.is_static() {
                insert_overload(&mut static_methods, method);
                continue;
            }
            insert_overload(&mut instance_methods, method);
            match (method.name_text(), method.params().as_slice()) {
                ("get", [key]) if key == string && generic_getter.is_none() => {
                    generic_getter = Some(method.clone());
                }
                ("set", [key, _]) if key == string && generic_setter.is_none() => {
                    generic_setter = Some(method.clone());
                }
                _ => {}
            }
        }

        let mut fields = declared.properties;
        let mut extensions = stored.clone();
        for parent in &parents {
            for method in parent.instance_methods.values().flatten() {
                insert_overload(&mut instance_methods, method);
            }
            for method in parent.static_methods.values().flatten() {
                insert_overload(&mut static_methods, method);
            }
            generic_getter = generic_getter.or_else(|| parent.generic_getter.clone());
            generic_setter = generic_setter.or_else(|| parent.generic_setter.clone());
            for field in &parent.fields {
                if !fields.iter().any(|f| f.name == field.name) {
                    fields.push(field.clone());
                }
            }
            extensions.merge(&parent.extensions.read());
        }

        let properties = collect_properties(registry.interner(), &fields, &instance_methods);

        tracing::debug!(
            type_name = ty.name(),
            methods = instance_methods.len(),
            statics = static_methods.len(),
            constructors = declared.constructors.len(),
            properties = properties.len(),
            extensions = extensions.len(),
            "built dispatch table"
        );

        Ok(TypeTable {
            owner: ty.downgrade(),
            type_name: Arc::from(ty.name()),
            instance_methods,
            static_methods,
            constructors: declared.constructors,
            fields,
            properties,
            generic_getter,
            generic_setter,
            extensions: RwLock::new(extensions),
        })
    }

    /// Owning type, if it is still alive.
    pub fn owner(&self) -> Option<TypeRef> {
        self.owner.upgrade()
    }

    pub(crate) fn add_extension(&self, kind: ExtensionKind, entry: ExtensionEntry) {
        self.extensions.write().insert(kind, entry);
    }

    fn select(
        &self,
        registry: &DispatchRegistry,
        receiver: &Value,
        name: Name,
        name_text: &str,
        args: &[Value],
    ) -> DispatchResult<Option<(MethodDescriptor, CallShape)>> {
        let core = registry.core();
        if let Some(candidates) = self.instance_methods.get(&name) {
            if let Some(m) = resolve(core, name_text, &self.type_name, candidates, args)? {
                return Ok(Some((m, CallShape::Instance)));
            }
        }

        let extensions = self.extensions.read().instance(name);
        if !extensions.is_empty() {
            let with_receiver = prepend(receiver, args);
            if let Some(m) = resolve(core, name_text, &self.type_name, &extensions, &with_receiver)?
            {
                return Ok(Some((m, CallShape::Extension)));
            }
        }

        Ok(self
            .select_static(registry, name, name_text, args)?
            .map(|m| (m, CallShape::Static)))
    }

    fn select_static(
        &self,
        registry: &DispatchRegistry,
        name: Name,
        name_text: &str,
        args: &[Value],
    ) -> DispatchResult<Option<MethodDescriptor>> {
        let core = registry.core();
        if let Some(candidates) = self.static_methods.get(&name) {
            if let Some(m) = resolve(core, name_text, &self.type_name, candidates, args)? {
                return Ok(Some(m));
            }
        }
        let extensions = self.extensions.read().statics(name);
        resolve(core, name_text, &self.type_name, &extensions, args)
    }

    fn call(
        &self,
        registry: &DispatchRegistry,
        method: &MethodDescriptor,
        shape: CallShape,
        receiver: &Value,
        args: &[Value],
    ) -> DispatchResult {
        if method.visibility() != Visibility::Public && !registry.accessible_override() {
            return Err(access_denied(&method.signature(), &self.type_name));
        }
        let core = registry.core();
        let result = match shape {
            CallShape::Instance => {
                let args = coerce_arguments(core, method, args);
                method.invoker().call(receiver, &args)
            }
            CallShape::Extension => {
                let args = coerce_arguments(core, method, &prepend(receiver, args));
                method.invoker().call(&Value::Null, &args)
            }
            CallShape::Static => {
                let args = coerce_arguments(core, method, args);
                method.invoker().call(&Value::Null, &args)
            }
        };
        result.map_err(|e| e.into_dispatch_error(&method.signature(), &self.type_name))
    }

    fn read_field(&self, receiver: &Value, field: Name) -> Value {
        receiver
            .as_object()
            .map_or(Value::Null, |instance| instance.field(field))
    }

    fn write_field(
        &self,
        receiver: &Value,
        field: Name,
        name: &str,
        value: Value,
    ) -> DispatchResult<()> {
        match receiver.as_object() {
            Some(instance) => {
                instance.set_field(field, value);
                Ok(())
            }
            None => Err(no_such_property(name, &self.type_name)),
        }
    }

    fn has_zero_arg_method(&self, name: Name) -> bool {
        self.instance_methods
            .get(&name)
            .is_some_and(|overloads| overloads.iter().any(|m| m.arity() == 0))
            || self
                .extensions
                .read()
                .instance(name)
                .iter()
                .any(|m| m.arity() == 1)
    }
}

fn is_missing_method(kind: &DispatchErrorKind, method: &str) -> bool {
    matches!(kind, DispatchErrorKind::NoSuchMethod { name, .. } if name == method)
}

fn prepend(receiver: &Value, args: &[Value]) -> SmallVec<[Value; 4]> {
    let mut with_receiver = SmallVec::with_capacity(args.len() + 1);
    with_receiver.push(receiver.clone());
    with_receiver.extend(args.iter().cloned());
    with_receiver
}

impl DispatchTable for TypeTable {
    fn type_key(&self) -> TypeKey {
        self.owner.key()
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn invoke_method(
        &self,
        registry: &DispatchRegistry,
        receiver: &Value,
        name: &str,
        args: &[Value],
    ) -> DispatchResult {
        if let Some(id) = registry.interner().get(name) {
            if let Some((method, shape)) = self.select(registry, receiver, id, name, args)? {
                return self.call(registry, &method, shape, receiver, args);
            }
            // Last resort: spread a lone list into positional arguments.
            if let [Value::List(items)] = args {
                if let Some((method, shape)) = self.select(registry, receiver, id, name, items)? {
                    tracing::trace!(name, spread = items.len(), "spread list argument");
                    return self.call(registry, &method, shape, receiver, items);
                }
            }
        }
        Err(no_such_method(
            name,
            &self.type_name,
            registry.core().arg_type_names(args),
        ))
    }

    fn invoke_static(
        &self,
        registry: &DispatchRegistry,
        name: &str,
        args: &[Value],
    ) -> DispatchResult {
        if let Some(id) = registry.interner().get(name) {
            if let Some(method) = self.select_static(registry, id, name, args)? {
                return self.call(registry, &method, CallShape::Static, &Value::Null, args);
            }
        }
        Err(no_such_method(
            name,
            &self.type_name,
            registry.core().arg_type_names(args),
        ))
    }

    fn invoke_constructor(&self, registry: &DispatchRegistry, args: &[Value]) -> DispatchResult {
        let core = registry.core();
        let name = crate::descriptor::CONSTRUCTOR_NAME;
        if let Some(ctor) = resolve(core, name, &self.type_name, &self.constructors, args)? {
            return self.call(registry, &ctor, CallShape::Static, &Value::Null, args);
        }

        // Named-argument construction: no-arg constructor, then assign.
        if let [Value::Map(entries)] = args {
            if let Some(ctor) = self.constructors.iter().find(|c| c.arity() == 0) {
                let instance = self.call(registry, ctor, CallShape::Static, &Value::Null, &[])?;
                for (key, value) in entries.iter() {
                    registry.set_property(&instance, key, value.clone())?;
                }
                return Ok(instance);
            }
        }

        Err(no_matching_constructor(
            &self.type_name,
            core.arg_type_names(args),
        ))
    }

    fn get_property(
        &self,
        registry: &DispatchRegistry,
        receiver: &Value,
        name: &str,
    ) -> DispatchResult {
        let id = registry.interner().get(name);

        if let Some(property) = id.and_then(|id| self.properties.get(&id)) {
            return match &property.getter {
                Some(Accessor::Field(field)) => Ok(self.read_field(receiver, *field)),
                Some(Accessor::Method(getter)) => {
                    self.call(registry, getter, CallShape::Instance, receiver, &[])
                }
                None => Err(write_only_property(name, &self.type_name)),
            };
        }

        if let Some(getter) = &self.generic_getter {
            return self.call(
                registry,
                getter,
                CallShape::Instance,
                receiver,
                &[Value::str(name)],
            );
        }

        if id.is_some_and(|id| self.has_zero_arg_method(id)) {
            return Ok(Value::Method(Arc::new(MethodRef {
                receiver: receiver.clone(),
                name: Arc::from(name),
            })));
        }

        Err(no_such_property(name, &self.type_name))
    }

    fn set_property(
        &self,
        registry: &DispatchRegistry,
        receiver: &Value,
        name: &str,
        value: Value,
    ) -> DispatchResult<()> {
        let id = registry.interner().get(name);

        if let Some(property) = id.and_then(|id| self.properties.get(&id)) {
            return match &property.setter {
                Some(Accessor::Field(field)) => self.write_field(receiver, *field, name, value),
                Some(Accessor::Method(setter)) => self
                    .call(registry, setter, CallShape::Instance, receiver, &[value])
                    .map(|_| ()),
                None => Err(read_only_property(name, &self.type_name)),
            };
        }

        if let Some(setter) = &self.generic_setter {
            return self
                .call(
                    registry,
                    setter,
                    CallShape::Instance,
                    receiver,
                    &[Value::str(name), value],
                )
                .map(|_| ());
        }

        let setter_name = format!("set{}", capitalize(name));
        match self.invoke_method(registry, receiver, &setter_name, &[value]) {
            Ok(_) => Ok(()),
            Err(e) if is_missing_method(&e.kind, &setter_name) => {
                Err(no_such_property(name, &self.type_name))
            }
            Err(e) => Err(e),
        }
    }

    fn respond_to(
        &self,
        registry: &DispatchRegistry,
        receiver: &Value,
        name: &str,
        args: &[Value],
    ) -> DispatchResult<Option<MethodDescriptor>> {
        let Some(id) = registry.interner().get(name) else {
            return Ok(None);
        };
        Ok(self
            .select(registry, receiver, id, name, args)?
            .map(|(method, _)| method))
    }

    fn has_property(&self, registry: &DispatchRegistry, name: &str) -> bool {
        registry
            .interner()
            .get(name)
            .is_some_and(|id| self.properties.contains_key(&id))
    }

    fn methods(&self) -> Vec<MethodDescriptor> {
        let mut methods: Vec<MethodDescriptor> =
            self.instance_methods.values().flatten().cloned().collect();
        methods.extend(self.extensions.read().all_instance().cloned());
        methods.sort_by_cached_key(MethodDescriptor::signature);
        methods
    }

    fn extensions(&self) -> ExtensionMethods {
        self.extensions.read().clone()
    }
}

impl std::fmt::Debug for TypeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeTable")
            .field("type_name", &self.type_name)
            .field("methods", &self.instance_methods.len())
            .field("statics", &self.static_methods.len())
            .field("constructors", &self.constructors.len())
            .field("properties", &self.properties.len())
            .finish_non_exhaustive()
    }
}
