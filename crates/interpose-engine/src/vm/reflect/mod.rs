//! Reflection over the object model
//!
//! Introspection queries used by proxy generation: walking a class's
//! operations, filtering them down to the ones a derived type may override,
//! picking the initializer to delegate to, and validating the target.

mod eligibility;
mod introspection;

pub use eligibility::{EligibilityFilter, Exclusion};
pub use introspection::{
    ancestor_chain, choose_handler_slot, select_initializer, validate_target, walk_operations,
};
