use std::path::Path;

use splatmerge_3d::io::colmap::{read_model, write_model};
use splatmerge_3d::io::ply::{read_ply_binary, write_ply_binary};
use splatmerge_icp::{align, AlignParams};

use crate::model::{merge_models, validate_model};
use crate::transform::{apply_transform, TransformOptions};
use crate::MergeError;

/// Options of the end-to-end splat merge pipeline.
#[derive(Debug, Clone, Default)]
pub struct SplatMergeOptions {
    /// Parameters of the ICP alignment stage.
    pub align: AlignParams,
    /// Options of the attribute transform stage.
    pub transform: TransformOptions,
}

/// Summary of a completed splat merge.
#[derive(Debug, Clone)]
pub struct SplatMergeSummary {
    /// Splat count of the first input.
    pub points_a: usize,
    /// Splat count of the second input.
    pub points_b: usize,
    /// Splat count of the merged output.
    pub points_out: usize,
    /// ICP iterations performed during alignment.
    pub num_iterations: usize,
    /// Final mean nearest-neighbor distance, in normalized coordinates.
    pub align_error: f64,
    /// Uniform scale applied to the second input.
    pub scale: f64,
}

/// Merge two binary splat PLY files into one, aligning the second onto
/// the first.
///
/// The second cloud is registered onto the first with scaled rigid ICP,
/// its positions and attributes are transformed accordingly, and the two
/// clouds are concatenated under the first cloud's schema. The inputs are
/// left untouched; the result is written to `output_path`.
pub fn merge_splat_files(
    path_a: impl AsRef<Path>,
    path_b: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    options: &SplatMergeOptions,
) -> Result<SplatMergeSummary, MergeError> {
    let path_a = path_a.as_ref();
    let path_b = path_b.as_ref();
    for path in [path_a, path_b] {
        if !path.exists() {
            return Err(MergeError::NotFound(path.to_path_buf()));
        }
    }

    let mut cloud_a = read_ply_binary(path_a)?;
    let mut cloud_b = read_ply_binary(path_b)?;
    log::info!(
        "loaded {} splats from {} and {} splats from {}",
        cloud_a.len(),
        path_a.display(),
        cloud_b.len(),
        path_b.display()
    );
    log::debug!("bounds a: {:?}", cloud_a.bounds()?);
    log::debug!("bounds b: {:?}", cloud_b.bounds()?);

    let positions_a = cloud_a.positions()?;
    let positions_b = cloud_b.positions()?;
    let result = align(&positions_b, &positions_a, &options.align)?;
    log::info!(
        "aligned in {} iterations, error {}, scale {}",
        result.num_iterations,
        result.error,
        result.scale
    );

    apply_transform(&mut cloud_b, &result.transform, &options.transform)?;

    let points_a = cloud_a.len();
    let points_b = cloud_b.len();
    cloud_a.append(cloud_b)?;
    write_ply_binary(output_path, &cloud_a)?;
    log::info!("wrote {} merged splats", cloud_a.len());

    Ok(SplatMergeSummary {
        points_a,
        points_b,
        points_out: cloud_a.len(),
        num_iterations: result.num_iterations,
        align_error: result.error,
        scale: result.scale,
    })
}

/// Summary of a completed sparse model merge.
#[derive(Debug, Clone)]
pub struct ModelMergeSummary {
    /// Camera count of the merged model.
    pub num_cameras: usize,
    /// Image count of the merged model.
    pub num_images: usize,
    /// 3D point count of the merged model.
    pub num_points3d: usize,
}

/// Merge two text-format sparse reconstruction directories into one.
///
/// Both models are integrity checked, model B is reinserted under offset
/// identifiers, and the merged model is written to `output_dir` as
/// `cameras.txt`, `images.txt` and `points3D.txt`. The geometry of both
/// models is taken as-is; they are expected to share a coordinate frame.
pub fn merge_model_dirs(
    dir_a: impl AsRef<Path>,
    dir_b: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
) -> Result<ModelMergeSummary, MergeError> {
    let dir_a = dir_a.as_ref();
    let dir_b = dir_b.as_ref();
    for dir in [dir_a, dir_b] {
        if !dir.is_dir() {
            return Err(MergeError::NotFound(dir.to_path_buf()));
        }
    }

    let model_a = read_model(dir_a)?;
    let model_b = read_model(dir_b)?;
    log::info!(
        "loaded models: {} + {} cameras, {} + {} images, {} + {} points3d",
        model_a.cameras.len(),
        model_b.cameras.len(),
        model_a.images.len(),
        model_b.images.len(),
        model_a.points3d.len(),
        model_b.points3d.len()
    );

    let merged = merge_models(&model_a, &model_b)?;
    validate_model(&merged)?;
    write_model(output_dir, &merged)?;

    Ok(ModelMergeSummary {
        num_cameras: merged.cameras.len(),
        num_images: merged.images.len(),
        num_points3d: merged.points3d.len(),
    })
}
