use approx::assert_relative_eq;
use splatmerge::{
    merge_model_dirs, merge_splat_files, MergeError, SplatMergeOptions,
};
use splatmerge_3d::io::colmap::{
    read_model, write_model, CameraModelId, ColmapCamera, ColmapImage, ColmapModel,
    ColmapPoint3d,
};
use splatmerge_3d::io::ply::{
    read_ply_binary, write_ply_binary, PlyDataType, PlyPropertyDefinition,
};
use splatmerge_3d::pointcloud::SplatCloud;

fn splat_schema() -> Vec<PlyPropertyDefinition> {
    [
        "x", "y", "z", "scale_0", "scale_1", "scale_2", "rot_0", "rot_1", "rot_2",
        "rot_3", "opacity",
    ]
    .iter()
    .map(|name| PlyPropertyDefinition {
        name: name.to_string(),
        data_type: PlyDataType::Float32,
    })
    .collect()
}

/// Four separated clusters with deterministic jitter, as a splat cloud.
fn cluster_splats() -> SplatCloud {
    let centers = [
        [0.0, 0.0, 0.0],
        [2.0, 0.4, 0.0],
        [0.2, 2.6, 0.8],
        [0.6, 0.4, 2.2],
    ];
    let mut records = Vec::new();
    for (c, center) in centers.iter().enumerate() {
        for i in 0..25 {
            let jitter = |k: usize| ((c * 25 + i) * 31 + k * 7) % 13;
            let position = [
                center[0] + jitter(0) as f64 * 0.002,
                center[1] + jitter(1) as f64 * 0.002,
                center[2] + jitter(2) as f64 * 0.002,
            ];
            records.push(vec![
                position[0],
                position[1],
                position[2],
                0.01,
                0.02,
                0.03,
                1.0,
                0.0,
                0.0,
                0.0,
                0.8,
            ]);
        }
    }
    SplatCloud::new(splat_schema(), records).unwrap()
}

/// Scale and translate every position, leaving the other attributes alone.
fn scaled_splats(cloud: &SplatCloud, scale: f64, translation: [f64; 3]) -> SplatCloud {
    let records = cloud
        .records()
        .iter()
        .map(|r| {
            let mut r = r.clone();
            for i in 0..3 {
                r[i] = scale * r[i] + translation[i];
            }
            r
        })
        .collect();
    SplatCloud::new(cloud.schema().to_vec(), records).unwrap()
}

#[test]
fn test_merge_splat_files_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path_a = dir.path().join("a.ply");
    let path_b = dir.path().join("b.ply");
    let path_out = dir.path().join("merged.ply");

    let cloud_a = cluster_splats();
    // pure scale and translation, so the alignment recovers it exactly
    let cloud_b = scaled_splats(&cloud_a, 2.0, [1.0, 2.0, 3.0]);
    write_ply_binary(&path_a, &cloud_a)?;
    write_ply_binary(&path_b, &cloud_b)?;

    let summary =
        merge_splat_files(&path_a, &path_b, &path_out, &SplatMergeOptions::default())?;
    assert_eq!(summary.points_a, cloud_a.len());
    assert_eq!(summary.points_b, cloud_b.len());
    assert_eq!(summary.points_out, cloud_a.len() + cloud_b.len());
    assert_relative_eq!(summary.scale, 0.5, epsilon = 1e-4);

    let merged = read_ply_binary(&path_out)?;
    assert_eq!(merged.len(), cloud_a.len() + cloud_b.len());

    // the first block is cloud A verbatim; the second block is cloud B
    // mapped back onto A, so its positions must land on A's
    let positions = merged.positions()?;
    let expected = cloud_a.positions()?;
    for (p, e) in positions.iter().take(cloud_a.len()).zip(&expected) {
        for i in 0..3 {
            assert_relative_eq!(p[i], e[i], epsilon = 1e-5);
        }
    }
    for (p, e) in positions.iter().skip(cloud_a.len()).zip(&expected) {
        for i in 0..3 {
            assert_relative_eq!(p[i], e[i], epsilon = 1e-3);
        }
    }

    // opacities stay in the clamp range after attribute rescaling
    let opacity = merged.property_index("opacity").unwrap();
    for record in merged.records() {
        assert!(record[opacity] >= 0.1 && record[opacity] <= 1.0);
    }
    Ok(())
}

#[test]
fn test_merge_splat_files_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.ply");
    let out = dir.path().join("out.ply");
    let result =
        merge_splat_files(&missing, &missing, &out, &SplatMergeOptions::default());
    assert!(matches!(result, Err(MergeError::NotFound(path)) if path == missing));
}

fn sample_model(ids_from: u32) -> ColmapModel {
    let point_id = ids_from as u64 + 10;
    ColmapModel {
        cameras: vec![ColmapCamera {
            camera_id: ids_from,
            model_id: CameraModelId::Pinhole,
            width: 1920,
            height: 1080,
            params: vec![1200.0, 1200.0, 960.0, 540.0],
        }],
        images: vec![ColmapImage {
            image_id: ids_from,
            rotation: [1.0, 0.0, 0.0, 0.0],
            translation: [0.0, 0.0, 0.5],
            camera_id: ids_from,
            name: format!("frame_{ids_from}.jpg"),
            points2d: vec![(100.0, 200.0, point_id as i64), (5.0, 5.0, -1)],
        }],
        points3d: vec![ColmapPoint3d {
            point3d_id: point_id,
            xyz: [1.0, 2.0, 3.0],
            rgb: [120, 130, 140],
            error: 0.5,
            track: vec![(ids_from, 0)],
        }],
    }
}

#[test]
fn test_merge_model_dirs_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempfile::tempdir()?;
    let dir_a = root.path().join("a");
    let dir_b = root.path().join("b");
    let dir_out = root.path().join("merged");
    write_model(&dir_a, &sample_model(1))?;
    write_model(&dir_b, &sample_model(3))?;

    let summary = merge_model_dirs(&dir_a, &dir_b, &dir_out)?;
    assert_eq!(summary.num_cameras, 2);
    assert_eq!(summary.num_images, 2);
    assert_eq!(summary.num_points3d, 2);

    let merged = read_model(&dir_out)?;
    assert_eq!(merged.cameras.len(), 2);
    assert_ne!(merged.cameras[0].camera_id, merged.cameras[1].camera_id);
    assert_ne!(merged.images[0].image_id, merged.images[1].image_id);
    assert_ne!(
        merged.points3d[0].point3d_id,
        merged.points3d[1].point3d_id
    );

    // remapped track of model B's point still resolves to its image
    let point_b = &merged.points3d[1];
    let (image_id, obs_idx) = point_b.track[0];
    let image = merged
        .images
        .iter()
        .find(|i| i.image_id == image_id)
        .unwrap();
    assert_eq!(
        image.points2d[obs_idx as usize].2,
        point_b.point3d_id as i64
    );
    Ok(())
}

#[test]
fn test_merge_model_dirs_missing_input() {
    let root = tempfile::tempdir().unwrap();
    let missing = root.path().join("missing");
    let out = root.path().join("out");
    let result = merge_model_dirs(&missing, &missing, &out);
    assert!(matches!(result, Err(MergeError::NotFound(_))));
}
