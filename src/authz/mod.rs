//! Rule-based authorization of named operations.
//!
//! Each operation may be guarded by any number of rules. A request is
//! permitted only when every rule for its operation yields a true verdict;
//! an operation with no rules is unrestricted.

pub mod condition;
pub mod engine;
pub mod errors;
pub mod middleware;
pub mod predicate;
pub mod protocol;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::evaluate;
pub use errors::AuthzError;
pub use middleware::{Payload, RequestContext, RulesMiddleware};
pub use protocol::classify;
pub use store::RuleStore;
pub use types::{AuthzFailure, Condition, Decision, Protocol};
