#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod error;
pub use error::MergeError;

mod model;
pub use model::*;

mod transform;
pub use transform::*;

mod pipeline;
pub use pipeline::*;
