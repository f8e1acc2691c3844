#![forbid(unsafe_code)]

//! Reference deployment records, loaded once and shared read-only.

mod store;

pub use store::*;
