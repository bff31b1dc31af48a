use std::sync::Arc;

use mop_ir::{TypeRef, Visibility};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use crate::errors::DispatchErrorKind;
use crate::introspect::PropertyAccess;
use crate::{DispatchRegistry, Instance, MethodDescriptor, Value};

/// `Person` and its subclass `Employee`, described through the catalog.
struct Fixture {
    registry: DispatchRegistry,
    person: TypeRef,
    employee: TypeRef,
}

impl Fixture {
    fn new() -> Self {
        let registry = DispatchRegistry::builder().default_methods(false).build();
        let core = registry.core().clone();
        let person = TypeRef::class("Person", Some(&core.object), &[]);
        let employee = TypeRef::class("Employee", Some(&person), &[]);
        let fx = Fixture {
            registry,
            person,
            employee,
        };
        fx.define_person(&core);
        fx.define_employee(&core);
        fx
    }

    fn define_person(&self, core: &crate::CoreTypes) {
        let catalog = self.registry.catalog();
        let interner = self.registry.interner();
        let person = &self.person;

        catalog.define_property(person, "name", Some(&core.string), PropertyAccess::ReadWrite);
        catalog.define_property(person, "id", Some(&core.prim_int), PropertyAccess::ReadOnly);

        catalog.define_method(
            person,
            MethodDescriptor::builder(interner, "greet", person)
                .param(&core.string)
                .returns(&core.string)
                .invoke(|_, args| Ok(Value::string(format!("Hello, {}", args[0])))),
        );
        catalog.define_method(
            person,
            MethodDescriptor::builder(interner, "greet", person)
                .param(&core.object)
                .returns(&core.string)
                .invoke(|_, args| Ok(Value::string(format!("Hello, object {}", args[0])))),
        );
        catalog.define_method(
            person,
            MethodDescriptor::builder(interner, "getAge", person)
                .returns(&core.prim_int)
                .invoke(|_, _| Ok(Value::Int(42))),
        );
        let nick = interner.intern("nick");
        catalog.define_method(
            person,
            MethodDescriptor::builder(interner, "setNickname", person)
                .param(&core.string)
                .returns(&core.void)
                .invoke(move |receiver, args| {
                    if let Some(instance) = receiver.as_object() {
                        instance.set_field(nick, args[0].clone());
                    }
                    Ok(Value::Null)
                }),
        );
        catalog.define_method(
            person,
            MethodDescriptor::builder(interner, "add", person)
                .params(&[&core.prim_int, &core.prim_int])
                .returns(&core.prim_int)
                .invoke(|_, args| {
                    let (a, b) = (args[0].as_int(), args[1].as_int());
                    Ok(Value::Int(a.unwrap_or(0) + b.unwrap_or(0)))
                }),
        );
        catalog.define_method(
            person,
            MethodDescriptor::builder(interner, "describe", person)
                .returns(&core.string)
                .invoke(|receiver, _| Ok(Value::string(format!("a person: {receiver}")))),
        );
        catalog.define_method(
            person,
            MethodDescriptor::builder(interner, "secret", person)
                .visibility(Visibility::Private)
                .invoke(|_, _| Ok(Value::str("hidden"))),
        );
        catalog.define_method(
            person,
            MethodDescriptor::builder(interner, "species", person)
                .static_method()
                .returns(&core.string)
                .invoke(|receiver, _| {
                    assert!(receiver.is_null());
                    Ok(Value::str("human"))
                }),
        );

        let ty = person.clone();
        catalog.define_constructor(
            person,
            MethodDescriptor::constructor(interner, person)
                .invoke(move |_, _| Ok(Instance::new(&ty).into_value())),
        );
        let ty = person.clone();
        let name = interner.intern("name");
        catalog.define_constructor(
            person,
            MethodDescriptor::constructor(interner, person)
                .param(&core.string)
                .invoke(move |_, args| {
                    let instance = Instance::new(&ty);
                    instance.set_field(name, args[0].clone());
                    Ok(instance.into_value())
                }),
        );
    }

    fn define_employee(&self, core: &crate::CoreTypes) {
        let catalog = self.registry.catalog();
        let interner = self.registry.interner();
        let employee = &self.employee;

        catalog.define_property(employee, "title", Some(&core.string), PropertyAccess::ReadWrite);
        catalog.define_method(
            employee,
            MethodDescriptor::builder(interner, "greet", employee)
                .param(&core.string)
                .returns(&core.string)
                .invoke(|_, args| Ok(Value::string(format!("Hi, {}", args[0])))),
        );
    }

    fn person(&self) -> Value {
        Instance::new(&self.person).into_value()
    }

    fn employee(&self) -> Value {
        Instance::new(&self.employee).into_value()
    }

    fn kind(&self, result: crate::DispatchResult) -> DispatchErrorKind {
        match result {
            Ok(value) => panic!("expected an error, got {value:?}"),
            Err(e) => e.kind,
        }
    }
}

#[test]
fn test_declared_overloads_select_by_runtime_type() {
    let fx = Fixture::new();
    let bob = fx.person();
    assert_eq!(
        fx.registry.invoke_method(&bob, "greet", &[Value::str("Ann")]),
        Ok(Value::str("Hello, Ann"))
    );
    assert_eq!(
        fx.registry.invoke_method(&bob, "greet", &[Value::Int(7)]),
        Ok(Value::str("Hello, object 7"))
    );
    // GString arguments match String parameters
    assert_eq!(
        fx.registry
            .invoke_method(&bob, "greet", &[Value::interpolated("Ann")]),
        Ok(Value::str("Hello, Ann"))
    );
}

#[test]
fn test_subclass_shadows_and_inherits() {
    let fx = Fixture::new();
    let eve = fx.employee();
    assert_eq!(
        fx.registry.invoke_method(&eve, "greet", &[Value::str("Ann")]),
        Ok(Value::str("Hi, Ann"))
    );
    // The inherited Object overload is still reachable
    assert_eq!(
        fx.registry.invoke_method(&eve, "greet", &[Value::Int(1)]),
        Ok(Value::str("Hello, object 1"))
    );
    assert_eq!(fx.registry.invoke_method(&eve, "getAge", &[]), Ok(Value::Int(42)));
    // Library methods of the root type
    assert_eq!(
        fx.registry.invoke_method(&eve, "equals", &[eve.clone()]),
        Ok(Value::Bool(true))
    );
}

#[test]
fn test_field_and_accessor_properties() {
    let fx = Fixture::new();
    let bob = fx.person();

    assert_eq!(fx.registry.get_property(&bob, "name"), Ok(Value::Null));
    fx.registry
        .set_property(&bob, "name", Value::str("Bob"))
        .unwrap();
    assert_eq!(fx.registry.get_property(&bob, "name"), Ok(Value::str("Bob")));

    assert_eq!(fx.registry.get_property(&bob, "age"), Ok(Value::Int(42)));

    fx.registry
        .set_property(&bob, "nickname", Value::str("B"))
        .unwrap();
    let nick = fx.registry.interner().intern("nick");
    assert_eq!(bob.as_object().unwrap().field(nick), Value::str("B"));

    assert!(fx.registry.has_property(&bob, "name").unwrap());
    assert!(fx.registry.has_property(&bob, "age").unwrap());
    assert!(!fx.registry.has_property(&bob, "greet").unwrap());
}

#[test]
fn test_read_only_and_write_only_properties() {
    let fx = Fixture::new();
    let bob = fx.person();

    let err = fx.registry.set_property(&bob, "id", Value::Int(3)).unwrap_err();
    assert_eq!(
        err.kind,
        DispatchErrorKind::ReadOnlyProperty {
            name: "id".into(),
            type_name: "Person".into(),
        }
    );
    assert_eq!(
        fx.kind(fx.registry.get_property(&bob, "nickname")),
        DispatchErrorKind::WriteOnlyProperty {
            name: "nickname".into(),
            type_name: "Person".into(),
        }
    );
}

#[test]
fn test_inherited_fields_are_properties() {
    let fx = Fixture::new();
    let eve = fx.employee();
    fx.registry
        .set_property(&eve, "name", Value::str("Eve"))
        .unwrap();
    fx.registry
        .set_property(&eve, "title", Value::str("CTO"))
        .unwrap();
    assert_eq!(fx.registry.get_property(&eve, "name"), Ok(Value::str("Eve")));
    assert_eq!(fx.registry.get_property(&eve, "title"), Ok(Value::str("CTO")));
}

#[test]
fn test_unknown_property() {
    let fx = Fixture::new();
    let bob = fx.person();
    assert_eq!(
        fx.kind(fx.registry.get_property(&bob, "zip")),
        DispatchErrorKind::NoSuchProperty {
            name: "zip".into(),
            type_name: "Person".into(),
        }
    );
    let err = fx
        .registry
        .set_property(&bob, "zip", Value::Int(1))
        .unwrap_err();
    assert!(matches!(err.kind, DispatchErrorKind::NoSuchProperty { .. }));
}

#[test]
fn test_zero_arg_method_reads_as_method_reference() {
    let fx = Fixture::new();
    let bob = fx.person();
    let reference = fx.registry.get_property(&bob, "describe").unwrap();
    let Value::Method(method) = &reference else {
        panic!("expected a method reference, got {reference:?}");
    };
    assert_eq!(&*method.name, "describe");
    let described = fx.registry.invoke_method(&reference, "call", &[]).unwrap();
    assert!(described.as_str().unwrap().starts_with("a person: Person@"));
}

#[test]
fn test_generic_accessors() {
    let registry = DispatchRegistry::builder().default_methods(false).build();
    let core = registry.core().clone();
    let config = TypeRef::class("Config", Some(&core.object), &[]);
    let writes = Arc::new(Mutex::new(Vec::new()));

    let interner = registry.interner();
    registry.catalog().define_method(
        &config,
        MethodDescriptor::builder(interner, "get", &config)
            .param(&core.string)
            .invoke(|_, args| Ok(Value::string(format!("<{}>", args[0])))),
    );
    let log = Arc::clone(&writes);
    registry.catalog().define_method(
        &config,
        MethodDescriptor::builder(interner, "set", &config)
            .params(&[&core.string, &core.object])
            .returns(&core.void)
            .invoke(move |_, args| {
                log.lock().push(format!("{}={}", args[0], args[1]));
                Ok(Value::Null)
            }),
    );

    let value = Instance::new(&config).into_value();
    assert_eq!(registry.get_property(&value, "port"), Ok(Value::str("<port>")));
    registry
        .set_property(&value, "port", Value::Int(80))
        .unwrap();
    assert_eq!(*writes.lock(), vec!["port=80".to_owned()]);
}

#[test]
fn test_library_map_get_is_generic_getter() {
    let registry = DispatchRegistry::new();
    let map = Value::map([("host", Value::str("localhost"))]);
    assert_eq!(registry.get_property(&map, "host"), Ok(Value::str("localhost")));
    assert_eq!(registry.get_property(&map, "port"), Ok(Value::Null));
}

#[test]
fn test_constructors() {
    let fx = Fixture::new();
    let plain = fx.registry.invoke_constructor(&fx.person, &[]).unwrap();
    assert_eq!(fx.registry.type_of(&plain), fx.person);

    let named = fx
        .registry
        .invoke_constructor(&fx.person, &[Value::str("Ann")])
        .unwrap();
    assert_eq!(fx.registry.get_property(&named, "name"), Ok(Value::str("Ann")));

    assert_eq!(
        fx.kind(fx.registry.invoke_constructor(&fx.person, &[Value::Bool(true)])),
        DispatchErrorKind::NoMatchingConstructor {
            type_name: "Person".into(),
            arg_types: vec!["Boolean".into()],
        }
    );
}

#[test]
fn test_map_constructor_assigns_properties() {
    let fx = Fixture::new();
    let args = [Value::map([
        ("name", Value::str("Ann")),
        ("nickname", Value::str("A")),
    ])];
    let ann = fx.registry.invoke_constructor(&fx.person, &args).unwrap();
    assert_eq!(fx.registry.get_property(&ann, "name"), Ok(Value::str("Ann")));

    let args = [Value::map([("id", Value::Int(9))])];
    let err = fx.registry.invoke_constructor(&fx.person, &args).unwrap_err();
    assert!(matches!(err.kind, DispatchErrorKind::ReadOnlyProperty { .. }));
}

#[test]
fn test_spread_list_argument() {
    let fx = Fixture::new();
    let bob = fx.person();
    let pair = Value::list(vec![Value::Int(2), Value::Int(3)]);
    assert_eq!(
        fx.registry.invoke_method(&bob, "add", &[pair]),
        Ok(Value::Int(5))
    );
    // Only one level is spread
    let nested = Value::list(vec![Value::list(vec![Value::Int(2), Value::Int(3)])]);
    assert!(fx.registry.invoke_method(&bob, "add", &[nested]).is_err());
}

#[test]
fn test_non_public_members_need_override() {
    let fx = Fixture::new();
    let bob = fx.person();
    assert_eq!(
        fx.kind(fx.registry.invoke_method(&bob, "secret", &[])),
        DispatchErrorKind::AccessDenied {
            member: "secret()".into(),
            type_name: "Person".into(),
        }
    );
    fx.registry.set_accessible_override(true);
    assert_eq!(
        fx.registry.invoke_method(&bob, "secret", &[]),
        Ok(Value::str("hidden"))
    );
}

#[test]
fn test_static_methods() {
    let fx = Fixture::new();
    assert_eq!(
        fx.registry.invoke_static(&fx.person, "species", &[]),
        Ok(Value::str("human"))
    );
    // Statics are inherited
    assert_eq!(
        fx.registry.invoke_static(&fx.employee, "species", &[]),
        Ok(Value::str("human"))
    );
    // and callable through an instance
    assert_eq!(
        fx.registry.invoke_method(&fx.person(), "species", &[]),
        Ok(Value::str("human"))
    );
    // Instance methods are not statics
    assert!(fx
        .registry
        .invoke_static(&fx.person, "getAge", &[])
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_no_such_method_reports_argument_types() {
    let fx = Fixture::new();
    assert_eq!(
        fx.kind(
            fx.registry
                .invoke_method(&fx.person(), "fly", &[Value::Int(1), Value::Null])
        ),
        DispatchErrorKind::NoSuchMethod {
            name: "fly".into(),
            type_name: "Person".into(),
            arg_types: vec!["Integer".into(), "null".into()],
        }
    );
}

#[test]
fn test_methods_listing_is_sorted() {
    let fx = Fixture::new();
    let methods = fx.registry.methods_of(&fx.employee).unwrap();
    let signatures: Vec<String> = methods.iter().map(MethodDescriptor::signature).collect();
    let mut sorted = signatures.clone();
    sorted.sort();
    assert_eq!(signatures, sorted);
    assert!(signatures.contains(&"greet(String)".to_owned()));
    assert!(signatures.contains(&"toString()".to_owned()));
    // Shadowed overload is listed once, from the subclass
    let greet = methods
        .iter()
        .filter(|m| m.signature() == "greet(String)")
        .collect::<Vec<_>>();
    assert_eq!(greet.len(), 1);
    assert_eq!(greet[0].declaring_name(), "Employee");
}

#[test]
fn test_opaque_type_fails_to_build() {
    let fx = Fixture::new();
    fx.registry.catalog().mark_opaque(&fx.person, "no metadata");

    let err = fx.registry.table_for(&fx.person).err().unwrap();
    assert_eq!(
        err.kind,
        DispatchErrorKind::TableBuild {
            type_name: "Person".into(),
            cause: "introspection of Person failed: no metadata".into(),
        }
    );

    let err = fx.registry.table_for(&fx.employee).err().unwrap();
    assert!(matches!(err.kind, DispatchErrorKind::TableBuild { .. }));
    assert_eq!(err.notes, vec!["while building the table of Employee".to_owned()]);
}

#[test]
fn test_invoker_errors_carry_signature_note() {
    let registry = DispatchRegistry::builder().default_methods(false).build();
    let core = registry.core().clone();
    let broken = TypeRef::class("Broken", Some(&core.object), &[]);
    registry.catalog().define_method(
        &broken,
        MethodDescriptor::builder(registry.interner(), "explode", &broken)
            .invoke(|_, _| Err(crate::InvokeError::raised("boom").wrap())),
    );
    let value = Instance::new(&broken).into_value();
    let err = registry.invoke_method(&value, "explode", &[]).unwrap_err();
    assert_eq!(
        err.kind,
        DispatchErrorKind::Raised {
            message: "boom".into()
        }
    );
}
