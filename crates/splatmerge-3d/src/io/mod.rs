/// Colmap text model reader and writer.
pub mod colmap;

/// Binary PLY splat cloud reader and writer.
pub mod ply;
