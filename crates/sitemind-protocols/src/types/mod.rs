//! Common types used across sitemind.

mod clock;
mod url;

pub use clock::*;
pub use url::*;
