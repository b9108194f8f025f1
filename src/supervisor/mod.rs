//! Component supervision and lifecycle

pub mod supervisor;

pub use supervisor::*;
