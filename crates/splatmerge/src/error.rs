use std::path::PathBuf;

use splatmerge_3d::io::{colmap::ColmapError, ply::PlyError};
use splatmerge_icp::AlignError;

/// Error types for the merge pipelines.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// An input file or directory does not exist
    #[error("input not found: {0}")]
    NotFound(PathBuf),

    /// Failure in the point cloud codec
    #[error(transparent)]
    Ply(#[from] PlyError),

    /// Failure in the sparse model codec
    #[error(transparent)]
    Colmap(#[from] ColmapError),

    /// Failure in the alignment engine
    #[error(transparent)]
    Align(#[from] AlignError),

    /// A cross-reference inside a model does not resolve
    #[error("referential integrity violation: {0}")]
    Integrity(String),
}
