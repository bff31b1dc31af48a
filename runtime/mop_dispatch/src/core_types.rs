//! Library types every registry knows about.
//!
//! Each registry owns one `CoreTypes` set; the types live as long as the
//! registry, so their tables are never evicted while it is in use.

use mop_ir::{PrimitiveKind, TypeRef};

use crate::Value;

/// The runtime's built-in type hierarchy.
///
/// ```text
/// Object
/// ├── Class, Closure
/// ├── Number ── Integer (int), Long (long), Double (double)
/// ├── Boolean (boolean)
/// ├── String : CharSequence
/// ├── GString : CharSequence
/// ├── ArrayList : List : Collection
/// └── LinkedHashMap : Map
/// ```
#[derive(Clone, Debug)]
pub struct CoreTypes {
    pub object: TypeRef,
    pub class: TypeRef,
    pub closure: TypeRef,
    pub number: TypeRef,
    pub integer: TypeRef,
    pub long: TypeRef,
    pub double: TypeRef,
    pub boolean: TypeRef,
    pub prim_int: TypeRef,
    pub prim_long: TypeRef,
    pub prim_double: TypeRef,
    pub prim_boolean: TypeRef,
    pub void: TypeRef,
    pub char_sequence: TypeRef,
    pub string: TypeRef,
    pub gstring: TypeRef,
    pub collection: TypeRef,
    pub list: TypeRef,
    pub array_list: TypeRef,
    pub map: TypeRef,
    pub linked_hash_map: TypeRef,
}

impl CoreTypes {
    pub fn new() -> Self {
        let object = TypeRef::class("Object", None, &[]);
        let class = TypeRef::class("Class", Some(&object), &[]);
        let closure = TypeRef::class("Closure", Some(&object), &[]);
        let number = TypeRef::class("Number", Some(&object), &[]);
        let integer = TypeRef::boxed_class("Integer", &number, &[], PrimitiveKind::Int);
        let long = TypeRef::boxed_class("Long", &number, &[], PrimitiveKind::Long);
        let double = TypeRef::boxed_class("Double", &number, &[], PrimitiveKind::Double);
        let boolean = TypeRef::boxed_class("Boolean", &object, &[], PrimitiveKind::Boolean);
        let prim_int = TypeRef::primitive(PrimitiveKind::Int, Some(&integer));
        let prim_long = TypeRef::primitive(PrimitiveKind::Long, Some(&long));
        let prim_double = TypeRef::primitive(PrimitiveKind::Double, Some(&double));
        let prim_boolean = TypeRef::primitive(PrimitiveKind::Boolean, Some(&boolean));
        let void = TypeRef::primitive(PrimitiveKind::Void, None);
        let char_sequence = TypeRef::interface("CharSequence", &[]);
        let string = TypeRef::class("String", Some(&object), std::slice::from_ref(&char_sequence));
        let gstring = TypeRef::class("GString", Some(&object), std::slice::from_ref(&char_sequence));
        let collection = TypeRef::interface("Collection", &[]);
        let list = TypeRef::interface("List", std::slice::from_ref(&collection));
        let array_list = TypeRef::class("ArrayList", Some(&object), std::slice::from_ref(&list));
        let map = TypeRef::interface("Map", &[]);
        let linked_hash_map =
            TypeRef::class("LinkedHashMap", Some(&object), std::slice::from_ref(&map));

        CoreTypes {
            object,
            class,
            closure,
            number,
            integer,
            long,
            double,
            boolean,
            prim_int,
            prim_long,
            prim_double,
            prim_boolean,
            void,
            char_sequence,
            string,
            gstring,
            collection,
            list,
            array_list,
            map,
            linked_hash_map,
        }
    }

    /// Runtime type of a value. `Null` reports the root type.
    pub fn type_of(&self, value: &Value) -> TypeRef {
        match value {
            Value::Null => self.object.clone(),
            Value::Bool(_) => self.boolean.clone(),
            Value::Int(_) => self.integer.clone(),
            Value::Float(_) => self.double.clone(),
            Value::Str(_) => self.string.clone(),
            Value::Interpolated(_) => self.gstring.clone(),
            Value::List(_) => self.array_list.clone(),
            Value::Map(_) => self.linked_hash_map.clone(),
            Value::Object(instance) => instance.type_ref().clone(),
            Value::Method(_) => self.closure.clone(),
            Value::Type(_) => self.class.clone(),
        }
    }

    /// Type name shown in diagnostics; `null` for `Null`.
    pub fn type_name_of(&self, value: &Value) -> String {
        match value {
            Value::Null => "null".to_owned(),
            other => self.type_of(other).name().to_owned(),
        }
    }

    /// Whether `ty` is one of this set's types.
    pub fn contains(&self, ty: &TypeRef) -> bool {
        self.members().contains(&ty)
    }

    fn members(&self) -> [&TypeRef; 21] {
        [
            &self.object,
            &self.class,
            &self.closure,
            &self.number,
            &self.integer,
            &self.long,
            &self.double,
            &self.boolean,
            &self.prim_int,
            &self.prim_long,
            &self.prim_double,
            &self.prim_boolean,
            &self.void,
            &self.char_sequence,
            &self.string,
            &self.gstring,
            &self.collection,
            &self.list,
            &self.array_list,
            &self.map,
            &self.linked_hash_map,
        ]
    }

    /// Diagnostic names of every argument.
    pub fn arg_type_names(&self, args: &[Value]) -> Vec<String> {
        args.iter().map(|arg| self.type_name_of(arg)).collect()
    }
}

impl Default for CoreTypes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_type_of_scalars() {
        let core = CoreTypes::new();
        assert_eq!(core.type_of(&Value::Int(1)), core.integer);
        assert_eq!(core.type_of(&Value::Float(1.5)), core.double);
        assert_eq!(core.type_of(&Value::str("a")), core.string);
        assert_eq!(core.type_of(&Value::interpolated("a")), core.gstring);
        assert_eq!(core.type_of(&Value::list(vec![])), core.array_list);
        assert_eq!(core.type_name_of(&Value::Null), "null");
    }

    #[test]
    fn test_hierarchy_shape() {
        let core = CoreTypes::new();
        assert!(core.collection.is_assignable_from(&core.array_list));
        assert!(core.char_sequence.is_assignable_from(&core.gstring));
        assert!(!core.string.is_assignable_from(&core.gstring));
        assert!(core.prim_double.is_assignable_from(&core.integer));
        assert!(core.number.is_assignable_from(&core.prim_long));
        assert!(core.contains(&core.gstring));
        assert!(!core.contains(&TypeRef::class("Object", None, &[])));
    }

    #[test]
    fn test_instances_report_own_type() {
        let core = CoreTypes::new();
        let point = TypeRef::class("Point", Some(&core.object), &[]);
        let value = crate::Instance::new(&point).into_value();
        assert_eq!(core.type_of(&value), point);
        assert_eq!(
            core.arg_type_names(&[value, Value::Bool(true)]),
            vec!["Point".to_owned(), "Boolean".to_owned()]
        );
    }
}
