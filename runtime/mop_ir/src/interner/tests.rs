use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_intern_is_idempotent() {
    let interner = StringInterner::new();
    let a = interner.intern("greet");
    let b = interner.intern("greet");
    assert_eq!(a, b);
    assert_eq!(interner.lookup(a), "greet");
}

#[test]
fn test_distinct_strings_get_distinct_names() {
    let interner = StringInterner::new();
    let a = interner.intern("getName");
    let b = interner.intern("setName");
    assert_ne!(a, b);
    assert_eq!(interner.lookup(a), "getName");
    assert_eq!(interner.lookup(b), "setName");
}

#[test]
fn test_get_does_not_insert() {
    let interner = StringInterner::new();
    let before = interner.len();
    assert_eq!(interner.get("neverDeclared"), None);
    assert_eq!(interner.len(), before);

    let name = interner.intern("neverDeclared");
    assert_eq!(interner.get("neverDeclared"), Some(name));
    assert_eq!(interner.len(), before + 1);
}

#[test]
fn test_vocabulary_is_pre_interned() {
    let interner = StringInterner::new();
    for word in ["get", "set", "call", "<init>", "ctor"] {
        assert!(interner.get(word).is_some(), "{word} should be pre-interned");
    }
    assert!(!interner.is_empty());
}

#[test]
fn test_empty_string_is_name_zero() {
    let interner = StringInterner::new();
    assert_eq!(interner.intern(""), Name::EMPTY);
    assert_eq!(interner.lookup(Name::EMPTY), "");
}

#[test]
fn test_shared_interner_clones_share_storage() {
    let shared = SharedInterner::new();
    let clone = shared.clone();
    let name = shared.intern("size");
    assert_eq!(clone.get("size"), Some(name));
}

#[test]
fn test_concurrent_interning_converges() {
    let shared = SharedInterner::new();
    let names: Vec<Name> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let interner = shared.clone();
                scope.spawn(move || interner.intern("racyName"))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(names.windows(2).all(|w| w[0] == w[1]));
}
