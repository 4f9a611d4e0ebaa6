//! Runner availability
//!
//! Decides whether the Galen binary can be invoked directly or whether the
//! fallback bootstrap has to stand in for it.

mod resolver;

pub use resolver::{RunnerInvocation, RunnerResolver, RunnerStatus};
