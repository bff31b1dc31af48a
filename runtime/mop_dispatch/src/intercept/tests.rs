use std::io;
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::Duration;

use mop_ir::TypeRef;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::*;
use crate::errors::{raised, DispatchErrorKind};
use crate::{DispatchRegistry, Instance};

fn registry_with_counter() -> (DispatchRegistry, TypeRef) {
    let registry = DispatchRegistry::builder().default_methods(false).build();
    let core = registry.core().clone();
    let counter = TypeRef::class("Counter", Some(&core.object), &[]);
    let interner = registry.interner();
    registry.catalog().define_method(
        &counter,
        MethodDescriptor::builder(interner, "next", &counter)
            .returns(&core.prim_int)
            .invoke(|_, _| Ok(Value::Int(1))),
    );
    registry.catalog().define_method(
        &counter,
        MethodDescriptor::builder(interner, "fail", &counter)
            .invoke(|_, _| Err(crate::InvokeError::raised("counter broke"))),
    );
    registry.catalog().define_method(
        &counter,
        MethodDescriptor::builder(interner, "zero", &counter)
            .static_method()
            .returns(&core.prim_int)
            .invoke(|_, _| Ok(Value::Int(0))),
    );
    let ty = counter.clone();
    registry.catalog().define_constructor(
        &counter,
        MethodDescriptor::constructor(interner, &counter)
            .invoke(move |_, _| Ok(Instance::new(&ty).into_value())),
    );
    (registry, counter)
}

/// Records hook calls into a shared log; the gate is fixed.
struct Recorder {
    tag: &'static str,
    open: bool,
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn new(tag: &'static str, open: bool, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Recorder {
            tag,
            open,
            log: Arc::clone(log),
        })
    }
}

impl Interceptor for Recorder {
    fn before_invoke(&self, receiver: &Value, name: &str, _args: &[Value]) -> DispatchResult {
        let kind = if matches!(receiver, Value::Type(_)) { "type" } else { "instance" };
        self.log.lock().push(format!("{} before {name} on {kind}", self.tag));
        Ok(Value::str("provisional"))
    }

    fn do_invoke(&self) -> DispatchResult<bool> {
        Ok(self.open)
    }

    fn after_invoke(
        &self,
        _receiver: &Value,
        name: &str,
        _args: &[Value],
        result: Value,
    ) -> DispatchResult {
        self.log
            .lock()
            .push(format!("{} after {name} = {result}", self.tag));
        Ok(result)
    }
}

#[test]
fn test_open_gate_runs_call() {
    let (registry, counter) = registry_with_counter();
    let log = Arc::new(Mutex::new(Vec::new()));
    registry
        .install_interceptor(&counter, Recorder::new("r", true, &log))
        .unwrap();

    let value = Instance::new(&counter).into_value();
    assert_eq!(registry.invoke_method(&value, "next", &[]), Ok(Value::Int(1)));
    assert_eq!(
        *log.lock(),
        vec!["r before next on instance".to_owned(), "r after next = 1".to_owned()]
    );
}

#[test]
fn test_closed_gate_uses_provisional_result() {
    let (registry, counter) = registry_with_counter();
    let log = Arc::new(Mutex::new(Vec::new()));
    registry
        .install_interceptor(&counter, Recorder::new("r", false, &log))
        .unwrap();

    let value = Instance::new(&counter).into_value();
    assert_eq!(
        registry.invoke_method(&value, "fail", &[]),
        Ok(Value::str("provisional"))
    );
    // Even unknown methods are answered
    assert_eq!(
        registry.invoke_method(&value, "missing", &[]),
        Ok(Value::str("provisional"))
    );
    assert_eq!(log.lock().len(), 4);
}

#[test]
fn test_call_error_skips_after_invoke() {
    let (registry, counter) = registry_with_counter();
    let log = Arc::new(Mutex::new(Vec::new()));
    registry
        .install_interceptor(&counter, Recorder::new("r", true, &log))
        .unwrap();

    let value = Instance::new(&counter).into_value();
    let err = registry.invoke_method(&value, "fail", &[]).unwrap_err();
    assert_eq!(
        err.kind,
        DispatchErrorKind::Raised {
            message: "counter broke".into()
        }
    );
    assert_eq!(*log.lock(), vec!["r before fail on instance".to_owned()]);
}

#[test]
fn test_statics_and_constructors_are_intercepted() {
    let (registry, counter) = registry_with_counter();
    let log = Arc::new(Mutex::new(Vec::new()));
    registry
        .install_interceptor(&counter, Recorder::new("r", true, &log))
        .unwrap();

    assert_eq!(registry.invoke_static(&counter, "zero", &[]), Ok(Value::Int(0)));
    let created = registry.invoke_constructor(&counter, &[]).unwrap();
    assert_eq!(registry.type_of(&created), counter);
    let log = log.lock();
    assert_eq!(log[0], "r before zero on type");
    assert_eq!(log[2], format!("r before {CONSTRUCTOR_CALL} on type"));
}

#[test]
fn test_interceptors_stack_and_uninstall_together() {
    let (registry, counter) = registry_with_counter();
    let log = Arc::new(Mutex::new(Vec::new()));
    registry
        .install_interceptor(&counter, Recorder::new("inner", true, &log))
        .unwrap();
    registry
        .install_interceptor(&counter, Recorder::new("outer", true, &log))
        .unwrap();

    let value = Instance::new(&counter).into_value();
    registry.invoke_method(&value, "next", &[]).unwrap();
    assert_eq!(
        *log.lock(),
        vec![
            "outer before next on instance".to_owned(),
            "inner before next on instance".to_owned(),
            "inner after next = 1".to_owned(),
            "outer after next = 1".to_owned(),
        ]
    );

    log.lock().clear();
    registry.uninstall_interceptor(&counter);
    registry.invoke_method(&value, "next", &[]).unwrap();
    assert!(log.lock().is_empty());
}

#[test]
fn test_properties_bypass_interceptor() {
    let (registry, counter) = registry_with_counter();
    let log = Arc::new(Mutex::new(Vec::new()));
    registry
        .install_interceptor(&counter, Recorder::new("r", false, &log))
        .unwrap();
    let value = Instance::new(&counter).into_value();
    assert!(matches!(
        registry.get_property(&value, "next"),
        Ok(Value::Method(_))
    ));
    assert!(log.lock().is_empty());
}

/// Fails in `before_invoke`.
struct Refuser;

impl Interceptor for Refuser {
    fn before_invoke(&self, _: &Value, name: &str, _: &[Value]) -> DispatchResult {
        Err(raised(format!("refused {name}")))
    }

    fn do_invoke(&self) -> DispatchResult<bool> {
        Ok(true)
    }

    fn after_invoke(&self, _: &Value, _: &str, _: &[Value], result: Value) -> DispatchResult {
        Ok(result)
    }
}

#[test]
fn test_before_invoke_error_aborts() {
    let (registry, counter) = registry_with_counter();
    registry.install_interceptor(&counter, Arc::new(Refuser)).unwrap();
    let value = Instance::new(&counter).into_value();
    let err = registry.invoke_method(&value, "next", &[]).unwrap_err();
    assert_eq!(err.to_string(), "refused next");
}

#[test]
fn test_timing_statistics() {
    let (registry, counter) = registry_with_counter();
    let timing = Arc::new(CallTimingInterceptor::new());
    registry
        .install_interceptor(&counter, Arc::clone(&timing) as Arc<dyn Interceptor>)
        .unwrap();

    let value = Instance::new(&counter).into_value();
    for _ in 0..3 {
        registry.invoke_method(&value, "next", &[]).unwrap();
    }
    registry.invoke_static(&counter, "zero", &[]).unwrap();

    let stats = timing.statistics();
    let summary: Vec<(&str, u64)> = stats.iter().map(|s| (s.name.as_str(), s.calls)).collect();
    assert_eq!(summary, vec![("next", 3), ("zero", 1)]);
    assert!(stats[0].average() <= stats[0].total);

    timing.reset();
    assert!(timing.statistics().is_empty());
}

#[test]
fn test_failed_nested_call_does_not_skew_timing() {
    let (registry, counter) = registry_with_counter();
    let registry = Arc::new(registry);
    let handle: Arc<OnceLock<Weak<DispatchRegistry>>> = Arc::default();
    let nested = Arc::clone(&handle);
    registry.catalog().define_method(
        &counter,
        MethodDescriptor::builder(registry.interner(), "outer", &counter).invoke(
            move |receiver, _| {
                thread::sleep(Duration::from_millis(30));
                if let Some(registry) = nested.get().and_then(Weak::upgrade) {
                    let swallowed = registry.invoke_method(receiver, "fail", &[]);
                    assert!(swallowed.is_err());
                }
                Ok(Value::Null)
            },
        ),
    );
    handle.set(Arc::downgrade(&registry)).unwrap();

    let timing = Arc::new(CallTimingInterceptor::new());
    registry
        .install_interceptor(&counter, Arc::clone(&timing) as Arc<dyn Interceptor>)
        .unwrap();
    let value = Instance::new(&counter).into_value();
    registry.invoke_method(&value, "outer", &[]).unwrap();

    let stats = timing.statistics();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].name, "outer");
    assert_eq!(stats[0].calls, 1);
    assert!(stats[0].total >= Duration::from_millis(30));
    assert_eq!(timing.open_calls(), 0);
}

#[test]
fn test_failed_call_releases_veto_decision() {
    let (registry, counter) = registry_with_counter();
    let veto = Arc::new(VetoInterceptor::new(["next"]));
    registry
        .install_interceptor(&counter, Arc::clone(&veto) as Arc<dyn Interceptor>)
        .unwrap();

    let value = Instance::new(&counter).into_value();
    for _ in 0..3 {
        assert!(registry.invoke_method(&value, "fail", &[]).is_err());
    }
    assert_eq!(veto.pending_decisions(), 0);
}

#[test]
fn test_veto() {
    let (registry, counter) = registry_with_counter();
    let veto = Arc::new(VetoInterceptor::new(["next"]));
    assert!(veto.is_vetoed("next"));
    registry.install_interceptor(&counter, veto).unwrap();

    let value = Instance::new(&counter).into_value();
    assert_eq!(registry.invoke_method(&value, "next", &[]), Ok(Value::Null));
    assert_eq!(registry.invoke_static(&counter, "zero", &[]), Ok(Value::Int(0)));
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_tracing_interceptor_emits_entry_and_exit() {
    let (registry, counter) = registry_with_counter();
    registry
        .install_interceptor(&counter, Arc::new(TracingInterceptor::new()))
        .unwrap();

    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_env_filter("mop::trace=debug")
        .with_ansi(false)
        .without_time()
        .finish();

    let value = Instance::new(&counter).into_value();
    tracing::subscriber::with_default(subscriber, || {
        registry.invoke_method(&value, "next", &[]).unwrap();
    });

    let output = String::from_utf8(captured.0.lock().clone()).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("-> Counter@"));
    assert!(lines[0].ends_with(".next()"));
    assert!(lines[1].ends_with("<- next = 1"));
}

#[test]
fn test_tracing_interceptor_reports_failure() {
    let (registry, counter) = registry_with_counter();
    registry
        .install_interceptor(&counter, Arc::new(TracingInterceptor::new()))
        .unwrap();

    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_env_filter("mop::trace=debug")
        .with_ansi(false)
        .without_time()
        .finish();

    let value = Instance::new(&counter).into_value();
    tracing::subscriber::with_default(subscriber, || {
        assert!(registry.invoke_method(&value, "fail", &[]).is_err());
        registry.invoke_method(&value, "next", &[]).unwrap();
    });

    let output = String::from_utf8(captured.0.lock().clone()).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].ends_with("<- fail failed: counter broke"));
    // Depth is back to zero after the failure
    assert!(lines[2].contains("mop::trace: -> Counter@"));
}
