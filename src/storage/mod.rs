//! Data persistence and file operations

pub mod executions;
pub mod performance;

pub use executions::*;
pub use performance::*;
