#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// I/O utilities for reading and writing splat clouds and sparse models.
pub mod io;

/// Linear algebra utilities.
pub mod linalg;

/// Splat cloud container.
pub mod pointcloud;

/// Rotation and quaternion helpers.
pub mod transforms;
