//! Mapping engine
//!
//! Suggestion scoring, the transformation pipeline, and sample-based
//! validation of mappings.

pub mod score;
pub mod scorer;
pub mod suggest;
pub mod transform;
pub mod validate;
