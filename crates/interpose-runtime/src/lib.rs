//! Interpose Runtime
//!
//! Binds the proxy engine to the verification protocol:
//! - **API**: proxy requests for target objects (`api` module)
//! - **Verify**: outcome verifiers and the retry loop (`verify` module)
//! - **Strategy**: derived-type vs capability-interface selection (`strategy` module)
//! - **Last failure**: per-thread record of the last raised failure
//!
//! # Example
//!
//! ```rust,ignore
//! use interpose_runtime::{expect_failure_kind, last_raised_failure};
//!
//! let list = Object::construct(&builtins::array_list_class(), &[])?;
//! let proxy = expect_failure_kind(FailureKind::index_out_of_bounds(), &list)?;
//! Object::invoke(&proxy, "get", &[Value::I32(0)])?;
//! assert!(last_raised_failure().is_some());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod api;
mod last_failure;
pub mod strategy;
pub mod verify;

pub use api::{
    always_use_derived_type_proxy_for, create_forwarding_proxy, create_intercepting_proxy,
    create_verifying_proxy, expect_any_failure, expect_failure, expect_failure_kind, interposer,
    Interposer,
};
pub use last_failure::{clear_last_raised_failure, last_raised_failure};
pub use strategy::{ProxyStrategy, StrategyRegistry};
pub use verify::{
    drive, EventuallyReturns, ExpectFailure, Expectation, Outcome, ResultVerifier,
    VerificationState, VerifyingHandler,
};
