//! Proxy request scenarios through the public API

use std::sync::Arc;

use interpose_engine::builtins;
use interpose_engine::proxy::{HandlerRef, OperationId, ProxyError};
use interpose_engine::{
    ClassBuilder, Failure, FailureKind, InitializerDef, InterfaceDef, MethodDef, Object, ObjectRef,
    TypeRef, Value, Visibility,
};
use interpose_runtime::{clear_last_raised_failure, last_raised_failure, Interposer};

fn empty_list() -> ObjectRef {
    Object::construct(&builtins::array_list_class(), &[]).unwrap()
}

/// Class whose only initializer is private and rejects anything but 10
fn picky_class() -> Arc<interpose_engine::Class> {
    ClassBuilder::new("demo.Picky")
        .field(interpose_engine::FieldDef::new("seed", TypeRef::I32))
        .initializer(
            InitializerDef::new()
                .param(TypeRef::I32)
                .visibility(Visibility::Private)
                .body(|this, args| match args[0] {
                    Value::I32(10) => {
                        this.set_field("seed", Value::I32(10))?;
                        Ok(Value::Null)
                    }
                    _ => Err(Failure::illegal_argument("seed must be 10")),
                }),
        )
        .method(
            MethodDef::new("seed")
                .returns(TypeRef::I32)
                .body(|this, _| this.get_field("seed")),
        )
        .method(
            MethodDef::new("shout")
                .param(TypeRef::Str)
                .returns(TypeRef::Str)
                .body(|_, args| {
                    let text = args[0].as_str().unwrap_or_default().to_uppercase();
                    Ok(Value::str(text))
                }),
        )
        .build()
}

#[test]
fn test_forwarding_proxy_raises_collections_own_failure() {
    let interposer = Interposer::with_defaults();
    let proxy = interposer.create_forwarding_proxy(&empty_list()).unwrap();

    let err = Object::invoke(&proxy, "get", &[Value::I32(0)]).unwrap_err();
    assert_eq!(err.kind(), &FailureKind::index_out_of_bounds());
    assert_eq!(err.message(), Some("index 0 out of bounds for length 0"));
}

#[test]
fn test_derived_forwarding_proxy_raises_collections_own_failure() {
    let interposer = Interposer::with_defaults();
    interposer.always_use_derived_type_proxy_for(&builtins::array_list_class());
    let proxy = interposer.create_forwarding_proxy(&empty_list()).unwrap();

    assert!(proxy.instance_of("collections.ArrayList"));
    let err = Object::invoke(&proxy, "get", &[Value::I32(0)]).unwrap_err();
    assert_eq!(err.kind(), &FailureKind::index_out_of_bounds());
}

#[test]
fn test_expected_kind_but_operation_returned() {
    let interposer = Interposer::with_defaults();
    let proxy = interposer
        .expect_failure_kind(FailureKind::index_out_of_bounds(), &empty_list())
        .unwrap();

    let err = Object::invoke(&proxy, "size", &[]).unwrap_err();
    assert_eq!(err.kind(), &FailureKind::assertion());
    assert_eq!(
        err.message(),
        Some("expected a failure of kind IndexOutOfBounds to be raised, but the operation returned 0")
    );
}

#[test]
fn test_unrelated_kind_is_reported_with_cause() {
    let interposer = Interposer::with_defaults();
    let proxy = interposer
        .expect_failure_kind(FailureKind::illegal_argument(), &empty_list())
        .unwrap();

    let err = Object::invoke(&proxy, "get", &[Value::I32(3)]).unwrap_err();
    assert_eq!(err.kind(), &FailureKind::assertion());
    let message = err.message().unwrap_or_default();
    assert!(message.contains("IllegalArgument"), "{message}");
    assert!(message.contains("IndexOutOfBounds"), "{message}");
    let cause = err.cause().expect("actual failure attached");
    assert_eq!(cause.kind(), &FailureKind::index_out_of_bounds());
    assert_eq!(cause.message(), Some("index 3 out of bounds for length 0"));
}

#[test]
fn test_expected_kind_is_accepted_and_recorded() {
    clear_last_raised_failure();
    let interposer = Interposer::with_defaults();
    let proxy = interposer
        .expect_failure_kind(FailureKind::runtime(), &empty_list())
        .unwrap();

    let value = Object::invoke(&proxy, "get", &[Value::I32(0)]).unwrap();
    assert!(value.is_null());
    let recorded = last_raised_failure().expect("failure recorded");
    assert_eq!(recorded.kind(), &FailureKind::index_out_of_bounds());
}

#[test]
fn test_exact_failure_expectation() {
    let interposer = Interposer::with_defaults();
    let list = empty_list();
    let proxy = interposer
        .expect_failure(Failure::index_out_of_bounds("index 1 out of bounds for length 0"), &list)
        .unwrap();
    assert!(Object::invoke(&proxy, "get", &[Value::I32(1)]).is_ok());

    let err = Object::invoke(&proxy, "get", &[Value::I32(2)]).unwrap_err();
    assert_eq!(
        err.message(),
        Some("expected a failure of kind IndexOutOfBounds with message \"index 1 out of bounds for length 0\" to be raised, but a failure of kind IndexOutOfBounds with message \"index 2 out of bounds for length 0\" was raised")
    );
}

#[test]
fn test_expect_any_failure() {
    let interposer = Interposer::with_defaults();
    let proxy = interposer.expect_any_failure(&empty_list()).unwrap();
    let err = Object::invoke(&proxy, "is_empty", &[]).unwrap_err();
    assert_eq!(
        err.message(),
        Some("expected a failure to be raised, but the operation returned true")
    );
}

#[test]
fn test_private_rejecting_initializer_is_bypassed() {
    let class = picky_class();
    let target = Object::construct(&class, &[Value::I32(10)]).unwrap();
    assert!(Object::construct(&class, &[Value::I32(9)]).is_err());

    let interposer = Interposer::with_defaults();
    let proxy = interposer.create_forwarding_proxy(&target).unwrap();

    assert!(proxy.instance_of("demo.Picky"));
    assert_eq!(Object::invoke(&proxy, "seed", &[]).unwrap(), Value::I32(10));
    assert_eq!(
        Object::invoke(&proxy, "shout", &[Value::str("hi")]).unwrap(),
        Value::str("HI")
    );
}

#[test]
fn test_handler_sees_target_and_can_rewrite() {
    let interposer = Interposer::with_defaults();
    let class = picky_class();
    let target = Object::construct(&class, &[Value::I32(10)]).unwrap();
    let expected_id = target.id();

    let handler: HandlerRef = Arc::new(
        move |this: &ObjectRef, op: &OperationId, args: &[Value]| -> Result<Value, Failure> {
            assert_eq!(this.id(), expected_id);
            match op.name() {
                "shout" => Ok(Value::str("rewritten")),
                _ => op.invoke_on(this, args),
            }
        },
    );
    let proxy = interposer.create_intercepting_proxy(&target, handler).unwrap();

    assert_eq!(
        Object::invoke(&proxy, "shout", &[Value::str("x")]).unwrap(),
        Value::str("rewritten")
    );
    assert_eq!(Object::invoke(&proxy, "seed", &[]).unwrap(), Value::I32(10));
}

#[test]
fn test_capability_proxy_routes_interface_operations() {
    let greeter = InterfaceDef::new("demo.Greeter")
        .operation(MethodDef::new("greet").param(TypeRef::Str).returns(TypeRef::Str))
        .build();
    let class = ClassBuilder::new("demo.English")
        .implements(&greeter)
        .method(
            MethodDef::new("greet")
                .param(TypeRef::Str)
                .returns(TypeRef::Str)
                .body(|_, args| Ok(Value::str(format!("hello {}", args[0].as_str().unwrap_or("?"))))),
        )
        .build();
    let target = Object::construct(&class, &[]).unwrap();

    let interposer = Interposer::with_defaults();
    let proxy = interposer.create_forwarding_proxy(&target).unwrap();

    assert!(proxy.instance_of("demo.Greeter"));
    assert!(!proxy.instance_of("demo.English"));
    assert_eq!(
        Object::invoke(&proxy, "greet", &[Value::str("bob")]).unwrap(),
        Value::str("hello bob")
    );
    assert_eq!(interposer.factory().capability_cache().len(), 1);
    assert!(interposer.factory().cache().is_empty());
}

#[test]
fn test_rejected_target_is_a_configuration_error() {
    let interposer = Interposer::with_defaults();
    let sealed = ClassBuilder::new("demo.Sealed").as_final().build();
    let target = Object::construct(&sealed, &[]).unwrap();

    let first = interposer.create_forwarding_proxy(&target).unwrap_err();
    let second = interposer.create_forwarding_proxy(&target).unwrap_err();
    assert!(matches!(first, ProxyError::SealedType { .. }));
    assert_eq!(first, second);
}

#[test]
fn test_default_interposer_free_functions() {
    let list = empty_list();
    let proxy = interpose_runtime::expect_failure_kind(FailureKind::index_out_of_bounds(), &list).unwrap();
    assert!(Object::invoke(&proxy, "get", &[Value::I32(0)]).is_ok());

    let forwarding = interpose_runtime::create_forwarding_proxy(&list).unwrap();
    assert_eq!(Object::invoke(&forwarding, "size", &[]).unwrap(), Value::I32(0));

    // both requests share the default interposer's capability cache
    assert!(interpose_runtime::interposer()
        .factory()
        .capability_cache()
        .get(&builtins::array_list_class())
        .is_some());
}
