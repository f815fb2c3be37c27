//! Error types for the sitemind protocol layer.

mod driver;
mod store;
mod translator;

pub use driver::*;
pub use store::*;
pub use translator::*;
