//! Opportunity feed boundary

pub mod source;
pub mod simulated;

pub use source::*;
pub use simulated::*;
