use std::collections::{HashMap, HashSet};

use splatmerge_3d::io::colmap::{ColmapModel, UNOBSERVED_POINT3D_ID};

use crate::MergeError;

/// Check that every cross-reference inside a model resolves.
///
/// Verified invariants:
/// - every image's `camera_id` names an existing camera,
/// - every non-sentinel observation `point3d_id` names an existing point,
/// - every track entry `(image_id, point2d_idx)` names an existing image
///   and an in-range observation, and that observation points back at the
///   owning 3D point.
///
/// Violations are reported as [`MergeError::Integrity`] naming the
/// offending entity; nothing is repaired silently.
pub fn validate_model(model: &ColmapModel) -> Result<(), MergeError> {
    let camera_ids: HashSet<u32> = model.cameras.iter().map(|c| c.camera_id).collect();
    let images_by_id: HashMap<u32, &_> =
        model.images.iter().map(|i| (i.image_id, i)).collect();
    let point_ids: HashSet<u64> = model.points3d.iter().map(|p| p.point3d_id).collect();

    for image in &model.images {
        if !camera_ids.contains(&image.camera_id) {
            return Err(MergeError::Integrity(format!(
                "image {} references missing camera {}",
                image.image_id, image.camera_id
            )));
        }
        for (obs_idx, (_, _, point3d_id)) in image.points2d.iter().enumerate() {
            if *point3d_id != UNOBSERVED_POINT3D_ID
                && !point_ids.contains(&(*point3d_id as u64))
            {
                return Err(MergeError::Integrity(format!(
                    "image {} observation {} references missing point3d {}",
                    image.image_id, obs_idx, point3d_id
                )));
            }
        }
    }

    for point in &model.points3d {
        for (image_id, point2d_idx) in &point.track {
            let image = images_by_id.get(image_id).ok_or_else(|| {
                MergeError::Integrity(format!(
                    "point3d {} track references missing image {}",
                    point.point3d_id, image_id
                ))
            })?;
            let observation =
                image.points2d.get(*point2d_idx as usize).ok_or_else(|| {
                    MergeError::Integrity(format!(
                        "point3d {} track references observation {} of image {}, which has only {}",
                        point.point3d_id,
                        point2d_idx,
                        image_id,
                        image.points2d.len()
                    ))
                })?;
            if observation.2 != point.point3d_id as i64 {
                return Err(MergeError::Integrity(format!(
                    "observation {} of image {} belongs to point3d {}, not {}",
                    point2d_idx, image_id, observation.2, point.point3d_id
                )));
            }
        }
    }

    Ok(())
}

/// Merge two sparse models into one identifier space.
///
/// Model B's cameras, images and points are reinserted under offset
/// identifiers (`max(id) + 1` per collection computed over model A), with
/// every cross-reference remapped consistently: image `camera_id`s, track
/// `image_id`s and observation `point3d_id`s. Observation indices inside a
/// track stay valid because observation lists are never reordered.
/// Duplicate or non-contiguous source identifiers are preserved as-is.
///
/// Model B's geometry is assumed to be expressed in model A's coordinate
/// frame already; no re-registration happens here. Both inputs are
/// integrity checked first.
pub fn merge_models(a: &ColmapModel, b: &ColmapModel) -> Result<ColmapModel, MergeError> {
    validate_model(a)?;
    validate_model(b)?;

    let camera_offset = a
        .cameras
        .iter()
        .map(|c| c.camera_id)
        .max()
        .map_or(0, |m| m + 1);
    let image_offset = a
        .images
        .iter()
        .map(|i| i.image_id)
        .max()
        .map_or(0, |m| m + 1);
    let point_offset = a
        .points3d
        .iter()
        .map(|p| p.point3d_id)
        .max()
        .map_or(0, |m| m + 1);

    let mut merged = a.clone();

    for camera in &b.cameras {
        let mut camera = camera.clone();
        camera.camera_id += camera_offset;
        merged.cameras.push(camera);
    }

    for image in &b.images {
        let mut image = image.clone();
        image.image_id += image_offset;
        image.camera_id += camera_offset;
        for obs in image.points2d.iter_mut() {
            if obs.2 != UNOBSERVED_POINT3D_ID {
                obs.2 += point_offset as i64;
            }
        }
        merged.images.push(image);
    }

    for point in &b.points3d {
        let mut point = point.clone();
        point.point3d_id += point_offset;
        for entry in point.track.iter_mut() {
            entry.0 += image_offset;
        }
        merged.points3d.push(point);
    }

    log::info!(
        "merged models: {} cameras, {} images, {} points3d",
        merged.cameras.len(),
        merged.images.len(),
        merged.points3d.len()
    );

    Ok(merged)
}
