use splatmerge_3d::io::ply::PlyError;
use splatmerge_3d::linalg::transform_point_h;
use splatmerge_3d::pointcloud::SplatCloud;
use splatmerge_3d::transforms::{
    quaternion_mul, quaternion_normalize, rotation_matrix_to_quaternion,
};

use crate::MergeError;

/// Options controlling how splat attributes follow a spatial transform.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Rescale the Gaussian extents (`scale_*` properties) and opacities
    /// along with the uniform scale of the transform.
    pub rescale_attributes: bool,
    /// Rotate the `rot_0..rot_3` orientation quaternions by the rotation
    /// part of the transform. Off by default: renderers differ on the
    /// storage convention, and positions alone already dominate the
    /// visual alignment.
    pub rotate_orientations: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            rescale_attributes: true,
            rotate_orientations: false,
        }
    }
}

/// Apply a homogeneous `scale * R | t` transform to a splat cloud in place.
///
/// Positions go through the full transform. With `rescale_attributes` on,
/// every `scale_*` property is multiplied by `sqrt(scale)` and the
/// `opacity` property by `1 / sqrt(scale)`, clamped to `[0.1, 1.0]`, so
/// enlarged splats thin out instead of saturating. The uniform scale is
/// read off the transform as the mean absolute diagonal of its linear
/// block. All other properties pass through untouched.
pub fn apply_transform(
    cloud: &mut SplatCloud,
    transform: &[[f64; 4]; 4],
    options: &TransformOptions,
) -> Result<(), MergeError> {
    let ix = cloud
        .property_index("x")
        .ok_or(PlyError::MissingProperty("x"))?;
    let iy = cloud
        .property_index("y")
        .ok_or(PlyError::MissingProperty("y"))?;
    let iz = cloud
        .property_index("z")
        .ok_or(PlyError::MissingProperty("z"))?;

    let scale =
        (transform[0][0].abs() + transform[1][1].abs() + transform[2][2].abs()) / 3.0;
    let scale_indices = if options.rescale_attributes {
        cloud.property_indices_with_prefix("scale_")
    } else {
        Vec::new()
    };
    let opacity_index = if options.rescale_attributes {
        cloud.property_index("opacity")
    } else {
        None
    };

    let rotation_quat = if options.rotate_orientations {
        // the linear block is scale * R, so any column norm recovers the
        // scale exactly and leaves a proper rotation matrix behind
        let column_norm = (transform[0][0].powi(2)
            + transform[1][0].powi(2)
            + transform[2][0].powi(2))
        .sqrt();
        let mut rotation = [[0.0; 3]; 3];
        for (i, row) in rotation.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = transform[i][j] / column_norm;
            }
        }
        let quat_indices = [
            cloud
                .property_index("rot_0")
                .ok_or(PlyError::MissingProperty("rot_0"))?,
            cloud
                .property_index("rot_1")
                .ok_or(PlyError::MissingProperty("rot_1"))?,
            cloud
                .property_index("rot_2")
                .ok_or(PlyError::MissingProperty("rot_2"))?,
            cloud
                .property_index("rot_3")
                .ok_or(PlyError::MissingProperty("rot_3"))?,
        ];
        Some((rotation_matrix_to_quaternion(&rotation), quat_indices))
    } else {
        None
    };

    let scale_sqrt = scale.sqrt();
    for record in cloud.records_mut() {
        let mapped = transform_point_h(&[record[ix], record[iy], record[iz]], transform);
        record[ix] = mapped[0];
        record[iy] = mapped[1];
        record[iz] = mapped[2];

        for &i in &scale_indices {
            record[i] *= scale_sqrt;
        }
        if let Some(i) = opacity_index {
            record[i] = (record[i] / scale_sqrt).clamp(0.1, 1.0);
        }
        if let Some((quat, [i0, i1, i2, i3])) = rotation_quat {
            let q = [record[i0], record[i1], record[i2], record[i3]];
            let rotated = quaternion_normalize(&quaternion_mul(&quat, &q));
            record[i0] = rotated[0];
            record[i1] = rotated[1];
            record[i2] = rotated[2];
            record[i3] = rotated[3];
        }
    }

    Ok(())
}
