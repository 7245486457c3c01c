#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod align;
pub use align::*;

mod ops;
