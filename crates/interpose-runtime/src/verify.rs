//! Verification protocol
//!
//! A [`ResultVerifier`] sees the tagged outcome of each invocation of an
//! intercepted operation and decides whether to retry it. [`drive`] runs the
//! loop:
//!
//! ```text
//! invoke ─▶ record last failure ─▶ verify ─┬─ Ok(true)  ─▶ invoke again
//!                                          ├─ Ok(false) ─▶ settle outcome
//!                                          └─ Err(f)    ─▶ raise f
//! ```

use std::fmt;

use interpose_engine::proxy::{InvocationHandler, OperationId};
use interpose_engine::{Failure, FailureKind, ObjectRef, Value};
use parking_lot::Mutex;
use tracing::trace;

use crate::last_failure;

/// Result of one invocation, as seen by a verifier
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The operation returned normally
    Returned(Value),
    /// The operation raised a failure
    Raised(Failure),
}

impl Outcome {
    /// The raised failure, if any
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Raised(failure) => Some(failure),
            Outcome::Returned(_) => None,
        }
    }

    /// Whether the operation raised
    pub fn is_raised(&self) -> bool {
        matches!(self, Outcome::Raised(_))
    }
}

impl From<Result<Value, Failure>> for Outcome {
    fn from(result: Result<Value, Failure>) -> Self {
        match result {
            Ok(value) => Outcome::Returned(value),
            Err(failure) => Outcome::Raised(failure),
        }
    }
}

/// Decides, per outcome, whether an intercepted operation is retried
///
/// `Ok(true)` retries, `Ok(false)` stops and accepts the outcome, `Err`
/// stops and raises (usually an assertion failure).
pub trait ResultVerifier: Send {
    /// Start a new assertion; called by [`drive`] before the first invocation
    fn begin(&mut self) {}

    /// Inspect `outcome` of `operation` called with `args`
    fn verify(
        &mut self,
        outcome: &Outcome,
        operation: &OperationId,
        args: &[Value],
    ) -> Result<bool, Failure>;
}

impl<F> ResultVerifier for F
where
    F: FnMut(&Outcome, &OperationId, &[Value]) -> Result<bool, Failure> + Send,
{
    fn verify(
        &mut self,
        outcome: &Outcome,
        operation: &OperationId,
        args: &[Value],
    ) -> Result<bool, Failure> {
        self(outcome, operation, args)
    }
}

/// Counters for one assertion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationState {
    /// Outcomes seen
    pub attempts: usize,
    /// Retries requested
    pub retries: usize,
    /// Most recent outcome
    pub last: Option<Outcome>,
}

impl VerificationState {
    /// Count `outcome`
    pub fn record(&mut self, outcome: &Outcome) {
        self.attempts += 1;
        self.last = Some(outcome.clone());
    }

    /// Count a retry
    pub fn retry(&mut self) {
        self.retries += 1;
    }

    /// Forget everything counted so far
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Run `operation` on `target` until `verifier` stops retrying
///
/// A returned value is delivered as-is; an accepted failure is delivered as the
/// default value of the declared return type and stays visible through
/// [`last_raised_failure`](crate::last_raised_failure).
pub fn drive<V>(
    verifier: &mut V,
    operation: &OperationId,
    target: &ObjectRef,
    args: &[Value],
) -> Result<Value, Failure>
where
    V: ResultVerifier + ?Sized,
{
    verifier.begin();
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        let outcome = Outcome::from(operation.invoke_on(target, args));
        last_failure::record(&outcome);
        trace!(op = %operation.name(), attempt, raised = outcome.is_raised(), "verifying outcome");

        if verifier.verify(&outcome, operation, args)? {
            continue;
        }
        return Ok(match outcome {
            Outcome::Returned(value) => value,
            Outcome::Raised(_) => operation.signature().return_type.default_value(),
        });
    }
}

/// What [`ExpectFailure`] expects to be raised
#[derive(Debug, Clone)]
pub enum Expectation {
    /// Any failure
    Any,
    /// A failure of this kind or a subkind
    Kind(FailureKind),
    /// A failure of exactly this kind with exactly this message
    Exact(Failure),
}

impl Expectation {
    fn matches(&self, failure: &Failure) -> bool {
        match self {
            Expectation::Any => true,
            Expectation::Kind(kind) => failure.is_a(kind),
            Expectation::Exact(expected) => {
                failure.kind() == expected.kind() && failure.message() == expected.message()
            }
        }
    }

    fn describe_actual(&self, failure: &Failure) -> String {
        match (self, failure.message()) {
            (Expectation::Exact(_), Some(message)) => format!(
                "a failure of kind {} with message \"{}\"",
                failure.kind(),
                message
            ),
            _ => format!("a failure of kind {}", failure.kind()),
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Any => f.write_str("a failure"),
            Expectation::Kind(kind) => write!(f, "a failure of kind {}", kind),
            Expectation::Exact(expected) => match expected.message() {
                Some(message) => write!(
                    f,
                    "a failure of kind {} with message \"{}\"",
                    expected.kind(),
                    message
                ),
                None => write!(f, "a failure of kind {}", expected.kind()),
            },
        }
    }
}

/// Asserts that the operation raises the expected failure
///
/// Never retries: a matching failure is accepted, anything else raises an
/// assertion failure carrying the real failure as cause.
#[derive(Debug, Clone)]
pub struct ExpectFailure {
    expectation: Expectation,
    state: VerificationState,
}

impl ExpectFailure {
    /// Expect `expectation`
    pub fn new(expectation: Expectation) -> Self {
        Self {
            expectation,
            state: VerificationState::default(),
        }
    }

    /// Expect any failure
    pub fn any() -> Self {
        Self::new(Expectation::Any)
    }

    /// Expect a failure of `kind`
    pub fn kind(kind: FailureKind) -> Self {
        Self::new(Expectation::Kind(kind))
    }

    /// Expect a failure equal in kind and message to `failure`
    pub fn exact(failure: Failure) -> Self {
        Self::new(Expectation::Exact(failure))
    }

    /// The expectation
    pub fn expectation(&self) -> &Expectation {
        &self.expectation
    }

    /// Counters of the latest assertion
    pub fn state(&self) -> &VerificationState {
        &self.state
    }
}

impl ResultVerifier for ExpectFailure {
    fn begin(&mut self) {
        self.state.reset();
    }

    fn verify(
        &mut self,
        outcome: &Outcome,
        _operation: &OperationId,
        _args: &[Value],
    ) -> Result<bool, Failure> {
        self.state.record(outcome);
        match outcome {
            Outcome::Returned(value) => Err(Failure::assertion(format!(
                "expected {} to be raised, but the operation returned {}",
                self.expectation,
                value.describe()
            ))),
            Outcome::Raised(failure) if self.expectation.matches(failure) => Ok(false),
            Outcome::Raised(failure) => Err(Failure::assertion(format!(
                "expected {} to be raised, but {} was raised",
                self.expectation,
                self.expectation.describe_actual(failure)
            ))
            .with_cause(failure.clone())),
        }
    }
}

/// Retries a raising operation until it returns, up to `max_attempts` invocations
#[derive(Debug, Clone)]
pub struct EventuallyReturns {
    max_attempts: usize,
    state: VerificationState,
}

impl EventuallyReturns {
    /// Allow at most `max_attempts` invocations (at least one)
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            state: VerificationState::default(),
        }
    }

    /// Counters of the latest assertion
    pub fn state(&self) -> &VerificationState {
        &self.state
    }
}

impl ResultVerifier for EventuallyReturns {
    fn begin(&mut self) {
        self.state.reset();
    }

    fn verify(
        &mut self,
        outcome: &Outcome,
        operation: &OperationId,
        _args: &[Value],
    ) -> Result<bool, Failure> {
        self.state.record(outcome);
        match outcome {
            Outcome::Returned(_) => Ok(false),
            Outcome::Raised(_) if self.state.attempts < self.max_attempts => {
                self.state.retry();
                Ok(true)
            }
            Outcome::Raised(failure) => Err(Failure::assertion(format!(
                "expected {} to eventually return, but it still raised after {} attempts",
                operation.name(),
                self.state.attempts
            ))
            .with_cause(failure.clone())),
        }
    }
}

/// Handler running the verification loop against a target object
pub struct VerifyingHandler<V> {
    target: ObjectRef,
    verifier: Mutex<V>,
}

impl<V: ResultVerifier> VerifyingHandler<V> {
    /// Verify calls forwarded to `target` with `verifier`
    pub fn new(target: ObjectRef, verifier: V) -> Self {
        Self {
            target,
            verifier: Mutex::new(verifier),
        }
    }

    /// The target object
    pub fn target(&self) -> &ObjectRef {
        &self.target
    }

    /// Run `f` with the verifier
    pub fn with_verifier<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        f(&self.verifier.lock())
    }
}

impl<V: ResultVerifier> InvocationHandler for VerifyingHandler<V> {
    fn invoke(
        &self,
        _proxy: &ObjectRef,
        operation: &OperationId,
        args: &[Value],
    ) -> Result<Value, Failure> {
        let mut verifier = self.verifier.lock();
        drive(&mut *verifier, operation, &self.target, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use interpose_engine::vm::{Class, Method};
    use interpose_engine::{ClassBuilder, MethodDef, Object, TypeRef};

    fn flaky(failures_before_success: usize) -> (Arc<Class>, Arc<Method>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let class = ClassBuilder::new("demo.Flaky")
            .method(MethodDef::new("fetch").returns(TypeRef::I32).body(move |_, _| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < failures_before_success {
                    Err(Failure::illegal_state(format!("attempt {}", n + 1)))
                } else {
                    Ok(Value::I32(n as i32))
                }
            }))
            .build();
        let method = class.declared_methods()[0].clone();
        (class, method, calls)
    }

    fn run<V: ResultVerifier>(verifier: &mut V, failures: usize) -> (Result<Value, Failure>, usize) {
        let (class, method, calls) = flaky(failures);
        let target = Object::allocate(&class);
        let op = OperationId::new(class, method);
        let result = drive(verifier, &op, &target, &[]);
        (result, calls.load(Ordering::SeqCst))
    }

    #[test]
    fn test_expect_failure_accepts_matching_kind() {
        let mut verifier = ExpectFailure::kind(FailureKind::runtime());
        let (result, calls) = run(&mut verifier, 1);
        assert_eq!(result.unwrap(), Value::I32(0));
        assert_eq!(calls, 1);
        assert_eq!(verifier.state().attempts, 1);
    }

    #[test]
    fn test_expect_failure_on_normal_return() {
        let mut verifier = ExpectFailure::kind(FailureKind::illegal_argument());
        let (result, _) = run(&mut verifier, 0);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), &FailureKind::assertion());
        assert_eq!(
            err.message(),
            Some("expected a failure of kind IllegalArgument to be raised, but the operation returned 0")
        );
        assert!(err.cause().is_none());
    }

    #[test]
    fn test_expect_failure_wrong_kind_keeps_cause() {
        let mut verifier = ExpectFailure::kind(FailureKind::illegal_argument());
        let (result, _) = run(&mut verifier, 1);
        let err = result.unwrap_err();
        assert_eq!(
            err.message(),
            Some("expected a failure of kind IllegalArgument to be raised, but a failure of kind IllegalState was raised")
        );
        assert_eq!(err.cause().map(|c| c.kind().clone()), Some(FailureKind::illegal_state()));
    }

    #[test]
    fn test_expect_exact_message() {
        let mut verifier = ExpectFailure::exact(Failure::illegal_state("attempt 2"));
        let (result, _) = run(&mut verifier, 1);
        let err = result.unwrap_err();
        assert_eq!(
            err.message(),
            Some("expected a failure of kind IllegalState with message \"attempt 2\" to be raised, but a failure of kind IllegalState with message \"attempt 1\" was raised")
        );

        let mut verifier = ExpectFailure::exact(Failure::illegal_state("attempt 1"));
        assert!(run(&mut verifier, 1).0.is_ok());
    }

    #[test]
    fn test_expect_any_on_return() {
        let mut verifier = ExpectFailure::any();
        let err = run(&mut verifier, 0).0.unwrap_err();
        assert_eq!(
            err.message(),
            Some("expected a failure to be raised, but the operation returned 0")
        );
    }

    #[test]
    fn test_eventually_returns_retries() {
        let mut verifier = EventuallyReturns::new(5);
        let (result, calls) = run(&mut verifier, 3);
        assert_eq!(result.unwrap(), Value::I32(3));
        assert_eq!(calls, 4);
        assert_eq!(verifier.state().retries, 3);
    }

    #[test]
    fn test_eventually_returns_gives_up() {
        let mut verifier = EventuallyReturns::new(2);
        let (result, calls) = run(&mut verifier, 10);
        let err = result.unwrap_err();
        assert_eq!(calls, 2);
        assert_eq!(err.kind(), &FailureKind::assertion());
        assert_eq!(err.cause().and_then(|c| c.message()), Some("attempt 2"));
    }

    #[test]
    fn test_eventually_returns_budget_is_per_assertion() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let flapping = ClassBuilder::new("demo.Flapping")
            .method(MethodDef::new("ping").returns(TypeRef::I32).body(move |_, _| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n % 2 == 0 {
                    Err(Failure::illegal_state("flap"))
                } else {
                    Ok(Value::I32(n as i32))
                }
            }))
            .build();
        let target = Object::allocate(&flapping);
        let op = OperationId::new(flapping.clone(), flapping.declared_methods()[0].clone());

        let mut verifier = EventuallyReturns::new(3);
        for expected in [1, 3, 5] {
            assert_eq!(drive(&mut verifier, &op, &target, &[]).unwrap(), Value::I32(expected));
            assert_eq!(verifier.state().attempts, 2);
            assert_eq!(verifier.state().retries, 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_closure_verifier_and_default_on_accepted_failure() {
        let mut seen = Vec::new();
        let mut verifier = |outcome: &Outcome, _: &OperationId, _: &[Value]| -> Result<bool, Failure> {
            seen.push(outcome.is_raised());
            Ok(false)
        };
        let (result, calls) = run(&mut verifier, 1);
        assert_eq!(result.unwrap(), Value::I32(0));
        assert_eq!(calls, 1);
        assert_eq!(seen, vec![true]);
    }
}
