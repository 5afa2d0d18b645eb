//! Invocation routing for generated operations
//!
//! Every override installed into a generated proxy type calls [`dispatch`].
//! Per call the router moves through
//!
//! ```text
//! Idle ─▶ RealCallAttempted ─▶ ReturnedNormally | RaisedFailure ─────▶ Done
//!  └────▶ RoutedToHandler   ─▶ HandlerReturned  | HandlerRaised ─────▶ Done
//! ```
//!
//! Exactly one source, the real call or the handler, decides the outcome.
//! A failure is never swallowed: it is normalized once and propagated.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::vm::{Class, Failure, FailureKind, Method, Object, ObjectRef, OperationSignature, Value};

/// Caller-supplied decision function consulted on every intercepted call
pub trait InvocationHandler: Send + Sync {
    /// Decide the outcome of `operation` invoked on `proxy` with `args`
    fn invoke(&self, proxy: &ObjectRef, operation: &OperationId, args: &[Value])
        -> Result<Value, Failure>;
}

impl<F> InvocationHandler for F
where
    F: Fn(&ObjectRef, &OperationId, &[Value]) -> Result<Value, Failure> + Send + Sync,
{
    fn invoke(
        &self,
        proxy: &ObjectRef,
        operation: &OperationId,
        args: &[Value],
    ) -> Result<Value, Failure> {
        self(proxy, operation, args)
    }
}

/// Shared handler reference
pub type HandlerRef = Arc<dyn InvocationHandler>;

/// Identity of an intercepted operation
#[derive(Clone)]
pub struct OperationId {
    signature: OperationSignature,
    origin: Arc<Class>,
    real: Option<Arc<Method>>,
}

impl OperationId {
    /// Operation backed by the implementation `real` declared in `origin`
    pub fn new(origin: Arc<Class>, real: Arc<Method>) -> Self {
        Self {
            signature: real.signature.clone(),
            origin,
            real: Some(real),
        }
    }

    /// Operation with no implementation of its own (capability interfaces)
    pub fn abstract_op(origin: Arc<Class>, signature: OperationSignature) -> Self {
        Self {
            signature,
            origin,
            real: None,
        }
    }

    /// Operation signature
    pub fn signature(&self) -> &OperationSignature {
        &self.signature
    }

    /// Operation name
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    /// Class declaring the real implementation (or the interface)
    pub fn origin(&self) -> &Arc<Class> {
        &self.origin
    }

    /// Run the overridden implementation itself against `this`, bypassing dispatch
    pub fn invoke_real(&self, this: &ObjectRef, args: &[Value]) -> Result<Value, Failure> {
        match &self.real {
            Some(method) => method.call(this, args),
            None => Err(Failure::new(
                FailureKind::abstract_method(),
                format!("{} has no implementation", self.signature),
            )),
        }
    }

    /// Invoke the operation on another object through virtual dispatch
    pub fn invoke_on(&self, target: &ObjectRef, args: &[Value]) -> Result<Value, Failure> {
        Object::invoke_signature(target, &self.signature, args)
    }
}

impl fmt::Debug for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperationId({})", self.signature)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.signature, f)
    }
}

/// Runs the real implementation on the proxy itself
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughHandler;

impl InvocationHandler for PassThroughHandler {
    fn invoke(&self, proxy: &ObjectRef, operation: &OperationId, args: &[Value]) -> Result<Value, Failure> {
        operation.invoke_real(proxy, args)
    }
}

/// Forwards every call to a target object
#[derive(Debug, Clone)]
pub struct ForwardingHandler {
    target: ObjectRef,
}

impl ForwardingHandler {
    /// Forward to `target`
    pub fn new(target: ObjectRef) -> Self {
        Self { target }
    }

    /// The forwarding target
    pub fn target(&self) -> &ObjectRef {
        &self.target
    }
}

impl InvocationHandler for ForwardingHandler {
    fn invoke(&self, _proxy: &ObjectRef, operation: &OperationId, args: &[Value]) -> Result<Value, Failure> {
        operation.invoke_on(&self.target, args)
    }
}

/// Presents `target` instead of the proxy to an inner handler
pub struct BoundHandler {
    target: ObjectRef,
    inner: HandlerRef,
}

impl BoundHandler {
    /// Bind `inner` to `target`
    pub fn new(target: ObjectRef, inner: HandlerRef) -> Self {
        Self { target, inner }
    }
}

impl InvocationHandler for BoundHandler {
    fn invoke(&self, _proxy: &ObjectRef, operation: &OperationId, args: &[Value]) -> Result<Value, Failure> {
        self.inner.invoke(&self.target, operation, args)
    }
}

/// Router state for a single call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    /// Not started
    Idle,
    /// No handler installed, real implementation running
    RealCallAttempted,
    /// Real implementation returned
    ReturnedNormally,
    /// Real implementation raised
    RaisedFailure,
    /// Handler deciding
    RoutedToHandler,
    /// Handler returned
    HandlerReturned,
    /// Handler raised
    HandlerRaised,
    /// Outcome delivered
    Done,
}

/// Route one call of `operation` on `this`; `slot` is the handler field index
pub fn dispatch(
    this: &ObjectRef,
    operation: &OperationId,
    slot: usize,
    args: &[Value],
) -> Result<Value, Failure> {
    trace!(op = %operation.name(), phase = ?CallPhase::Idle, "dispatch");
    let handler = match this.field_at(slot)? {
        Value::Handler(handler) => Some(handler),
        _ => None,
    };

    let (result, phase) = match handler {
        None => {
            trace!(op = %operation.name(), phase = ?CallPhase::RealCallAttempted, "dispatch");
            match operation.invoke_real(this, args) {
                Ok(value) => (Ok(value), CallPhase::ReturnedNormally),
                Err(failure) => (Err(failure), CallPhase::RaisedFailure),
            }
        }
        Some(handler) => {
            trace!(op = %operation.name(), phase = ?CallPhase::RoutedToHandler, "dispatch");
            let decided = handler
                .invoke(this, operation, args)
                .and_then(|value| operation.signature().return_type.coerce(value));
            match decided {
                Ok(value) => (Ok(value), CallPhase::HandlerReturned),
                Err(failure) => (Err(failure), CallPhase::HandlerRaised),
            }
        }
    };
    trace!(op = %operation.name(), ?phase, "dispatch");

    let result = result.map_err(|failure| normalize(failure, operation.signature()));
    trace!(op = %operation.name(), phase = ?CallPhase::Done, ok = result.is_ok(), "dispatch");
    result
}

/// Normalize a failure crossing the generated-operation boundary
///
/// Fatal, unchecked and declared failures pass unchanged; anything else is
/// wrapped in `UndeclaredFailure` carrying the original as cause.
pub fn normalize(failure: Failure, signature: &OperationSignature) -> Failure {
    let kind = failure.kind();
    if kind.is_unchecked() || signature.declares(kind) {
        return failure;
    }
    Failure::new(
        FailureKind::undeclared(),
        format!("{} raised undeclared {}", signature.name, kind),
    )
    .with_cause(failure)
}
