//! Runner process execution
//!
//! Builds runner command lines and schedules one child process per test
//! unit, joining them before aggregation.

mod command;
mod scheduler;

pub use scheduler::ProcessScheduler;
