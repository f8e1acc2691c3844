#![forbid(unsafe_code)]

//! Script metadata model and the validation engine that compares what an SDK
//! reports against a curated deployment record.

pub mod engine;
pub mod model;

pub use engine::{ReferenceLookup, Validator, ValidatorOptions};
pub use model::*;
