#![forbid(unsafe_code)]

mod deployment;
mod descriptor;
mod kinds;
mod result;

pub use deployment::*;
pub use descriptor::*;
pub use kinds::*;
pub use result::*;
