//! Evaluation engine: price resolution, market tax, per-candidate
//! classification, and result ordering.

pub mod evaluator;
pub mod pricing;
pub mod ranker;
pub mod tax;

pub use evaluator::Evaluator;
