//! Failures raised by operations
//!
//! A [`Failure`] is the object-model equivalent of a thrown exception. Every
//! failure has a [`FailureKind`]; kinds form a tree so that expectations can
//! match a kind and all of its descendants.
//!
//! ```text
//! Failure
//! ├── FatalError
//! │   ├── AssertionFailure
//! │   └── AbstractMethodError
//! └── Exception
//!     └── RuntimeFailure
//!         ├── IndexOutOfBounds
//!         ├── IllegalArgument
//!         ├── IllegalState
//!         ├── NullPointer
//!         ├── ClassCast
//!         ├── UnsupportedOperation
//!         └── UndeclaredFailure
//! ```

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

#[derive(Debug)]
struct KindInner {
    name: Arc<str>,
    parent: Option<FailureKind>,
}

/// A named failure kind with an optional parent kind
#[derive(Clone)]
pub struct FailureKind(Arc<KindInner>);

macro_rules! builtin_kind {
    ($fn_name:ident, $name:literal, $parent:expr) => {
        #[doc = concat!("The built-in `", $name, "` kind")]
        pub fn $fn_name() -> FailureKind {
            static KIND: Lazy<FailureKind> = Lazy::new(|| FailureKind::new($name, Some($parent)));
            KIND.clone()
        }
    };
}

static ROOT: Lazy<FailureKind> = Lazy::new(|| FailureKind::new("Failure", None));

impl FailureKind {
    /// Create a new kind
    pub fn new(name: impl AsRef<str>, parent: Option<FailureKind>) -> Self {
        FailureKind(Arc::new(KindInner {
            name: Arc::from(name.as_ref()),
            parent,
        }))
    }

    /// Create a new kind deriving from `parent`
    pub fn derive(name: impl AsRef<str>, parent: &FailureKind) -> Self {
        Self::new(name, Some(parent.clone()))
    }

    /// The root of every kind
    pub fn root() -> FailureKind {
        ROOT.clone()
    }

    builtin_kind!(fatal, "FatalError", FailureKind::root());
    builtin_kind!(assertion, "AssertionFailure", FailureKind::fatal());
    builtin_kind!(abstract_method, "AbstractMethodError", FailureKind::fatal());
    builtin_kind!(exception, "Exception", FailureKind::root());
    builtin_kind!(runtime, "RuntimeFailure", FailureKind::exception());
    builtin_kind!(index_out_of_bounds, "IndexOutOfBounds", FailureKind::runtime());
    builtin_kind!(illegal_argument, "IllegalArgument", FailureKind::runtime());
    builtin_kind!(illegal_state, "IllegalState", FailureKind::runtime());
    builtin_kind!(null_pointer, "NullPointer", FailureKind::runtime());
    builtin_kind!(class_cast, "ClassCast", FailureKind::runtime());
    builtin_kind!(unsupported_operation, "UnsupportedOperation", FailureKind::runtime());
    builtin_kind!(undeclared, "UndeclaredFailure", FailureKind::runtime());

    /// Kind name
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Parent kind
    pub fn parent(&self) -> Option<&FailureKind> {
        self.0.parent.as_ref()
    }

    /// Whether this kind is `other` or one of its descendants
    pub fn is_a(&self, other: &FailureKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    /// Fatal environment failures are never wrapped
    pub fn is_fatal(&self) -> bool {
        self.is_a(&FailureKind::fatal())
    }

    /// Unchecked failures may escape any operation
    pub fn is_unchecked(&self) -> bool {
        self.is_fatal() || self.is_a(&FailureKind::runtime())
    }
}

impl PartialEq for FailureKind {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for FailureKind {}

impl fmt::Debug for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FailureKind({})", self.0.name)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// A raised failure
#[derive(Clone, PartialEq)]
pub struct Failure {
    kind: FailureKind,
    message: Option<String>,
    cause: Option<Box<Failure>>,
}

impl Failure {
    /// Create a failure with a message
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
            cause: None,
        }
    }

    /// Create a failure without a message
    pub fn of_kind(kind: FailureKind) -> Self {
        Self {
            kind,
            message: None,
            cause: None,
        }
    }

    /// Attach an underlying cause
    pub fn with_cause(mut self, cause: Failure) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Shorthand for an `IndexOutOfBounds` failure
    pub fn index_out_of_bounds(message: impl Into<String>) -> Self {
        Self::new(FailureKind::index_out_of_bounds(), message)
    }

    /// Shorthand for an `IllegalArgument` failure
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::new(FailureKind::illegal_argument(), message)
    }

    /// Shorthand for an `IllegalState` failure
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(FailureKind::illegal_state(), message)
    }

    /// Shorthand for a `NullPointer` failure
    pub fn null_pointer(message: impl Into<String>) -> Self {
        Self::new(FailureKind::null_pointer(), message)
    }

    /// Shorthand for a `ClassCast` failure
    pub fn class_cast(message: impl Into<String>) -> Self {
        Self::new(FailureKind::class_cast(), message)
    }

    /// Shorthand for an `UnsupportedOperation` failure
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(FailureKind::unsupported_operation(), message)
    }

    /// Shorthand for an `AssertionFailure`
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::new(FailureKind::assertion(), message)
    }

    /// The failure kind
    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    /// The message, if any
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The underlying cause, if any
    pub fn cause(&self) -> Option<&Failure> {
        self.cause.as_deref()
    }

    /// Whether this is a fatal environment failure
    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    /// Whether the failure is of `kind` or a descendant of it
    pub fn is_a(&self, kind: &FailureKind) -> bool {
        self.kind.is_a(kind)
    }

    /// `Kind` or `Kind("message")`
    pub fn describe(&self) -> String {
        match &self.message {
            Some(m) => format!("{}(\"{}\")", self.kind, m),
            None => self.kind.to_string(),
        }
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Failure");
        s.field("kind", &self.kind.name());
        if let Some(m) = &self.message {
            s.field("message", m);
        }
        if let Some(c) = &self.cause {
            s.field("cause", c);
        }
        s.finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(m) => write!(f, "{}: {}", self.kind, m),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}
