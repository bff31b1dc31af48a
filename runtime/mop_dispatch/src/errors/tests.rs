use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_no_such_method_message_lists_argument_types() {
    let err = no_such_method("greet", "Point", vec!["String".into(), "Integer".into()]);
    assert_eq!(
        err.to_string(),
        "no method 'greet' on type Point for arguments (String, Integer)"
    );
    assert!(err.is_not_found());
}

#[test]
fn test_ambiguous_message_lists_candidates() {
    let err = ambiguous_overload(
        "f",
        "Sample",
        vec!["f(String, Object)".into(), "f(Object, String)".into()],
    );
    assert_eq!(
        err.to_string(),
        "ambiguous method overloading for 'f' on type Sample: f(String, Object) vs f(Object, String)"
    );
    assert!(!err.is_not_found());
}

#[test]
fn test_notes_render_after_message() {
    let err = raised("boom").with_note("while calling Point.move");
    assert_eq!(err.to_string(), "boom\n  note: while calling Point.move");
}

#[test]
fn test_wrapped_layers_are_peeled() {
    let original = raised("disk full");
    let wrapped = InvokeError::Target(original.clone()).wrap().wrap();
    assert_eq!(wrapped.into_dispatch_error("save()", "Store"), original);
}

#[test]
fn test_illegal_access_becomes_access_denied() {
    let err = InvokeError::IllegalAccess {
        reason: "private member".into(),
    }
    .wrap()
    .into_dispatch_error("secret()", "Vault");
    assert_eq!(
        err.kind,
        DispatchErrorKind::AccessDenied {
            member: "secret()".into(),
            type_name: "Vault".into(),
        }
    );
    assert_eq!(err.notes, vec!["private member".to_owned()]);
}

#[test]
fn test_dispatch_error_converts_into_target() {
    let err = no_such_property("x", "Point");
    let invoke: InvokeError = err.clone().into();
    assert_eq!(invoke, InvokeError::Target(err));
}
