//! Domain layer types and invariants.

pub mod error;
pub mod inputs;
pub mod resource;
