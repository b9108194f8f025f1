//! Risk evaluation and exposure limits

pub mod evaluator;

pub use evaluator::*;
