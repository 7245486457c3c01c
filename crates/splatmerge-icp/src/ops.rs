use kiddo::immutable::float::kdtree::ImmutableKdTree;
use rand::rngs::StdRng;

use crate::AlignError;
use splatmerge_3d::linalg::{det3, matmul33, matvec3};

/// Center a point set on its centroid and divide by the largest absolute
/// coordinate, returning the normalized points together with the original
/// centroid and scale.
pub(crate) fn normalize_points(
    points: &[[f64; 3]],
) -> Result<(Vec<[f64; 3]>, [f64; 3], f64), AlignError> {
    if points.len() < 3 {
        return Err(AlignError::TooFewPoints(points.len()));
    }

    let center = centroid(points);
    let centered = points
        .iter()
        .map(|p| [p[0] - center[0], p[1] - center[1], p[2] - center[2]])
        .collect::<Vec<_>>();

    let scale = centered
        .iter()
        .flat_map(|p| p.iter())
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    if scale < 1e-12 {
        return Err(AlignError::DegeneratePointCloud);
    }

    let normalized = centered
        .iter()
        .map(|p| [p[0] / scale, p[1] / scale, p[2] / scale])
        .collect();

    Ok((normalized, center, scale))
}

/// Mean of a point set.
pub(crate) fn centroid(points: &[[f64; 3]]) -> [f64; 3] {
    let mut sum = [0.0; 3];
    for p in points {
        sum[0] += p[0];
        sum[1] += p[1];
        sum[2] += p[2];
    }
    let n = points.len() as f64;
    [sum[0] / n, sum[1] / n, sum[2] / n]
}

/// Draw a uniform random subset of `amount` points, or all of them when the
/// set is small enough. Sampling only trades accuracy of the iterative
/// phase for speed; the fitted rotation and scale apply to the full set.
pub(crate) fn subsample(points: &[[f64; 3]], amount: usize, rng: &mut StdRng) -> Vec<[f64; 3]> {
    if points.len() <= amount {
        return points.to_vec();
    }
    rand::seq::index::sample(rng, points.len(), amount)
        .into_iter()
        .map(|i| points[i])
        .collect()
}

/// For every source point, find its nearest neighbor in the target cloud.
///
/// Returns the matched target points in source order together with the
/// euclidean nearest-neighbor distances.
pub(crate) fn find_correspondences(
    source: &[[f64; 3]],
    target: &[[f64; 3]],
    kdtree: &ImmutableKdTree<f64, u32, 3, 32>,
) -> (Vec<[f64; 3]>, Vec<f64>) {
    let mut matched = Vec::with_capacity(source.len());
    let mut distances = Vec::with_capacity(source.len());
    for p in source {
        let nn = kdtree.nearest_one::<kiddo::SquaredEuclidean>(p);
        matched.push(target[nn.item as usize]);
        distances.push(nn.distance.sqrt());
    }
    (matched, distances)
}

/// Fit the rigid transformation mapping `points_in_src` onto
/// `points_in_dst` from known correspondences.
///
/// Cross-covariance of the centered correspondences, SVD, `R = V * U^T`
/// with the smallest singular vector flipped when `det(R) < 0` so a
/// reflection is never returned, `t = dst_centroid - R * src_centroid`.
pub(crate) fn fit_transformation(
    points_in_src: &[[f64; 3]],
    points_in_dst: &[[f64; 3]],
) -> Result<([[f64; 3]; 3], [f64; 3]), AlignError> {
    assert_eq!(points_in_src.len(), points_in_dst.len());
    if points_in_src.len() < 3 {
        return Err(AlignError::TooFewPoints(points_in_src.len()));
    }

    // identical correspondences need no fit
    if points_in_src == points_in_dst {
        let identity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        return Ok((identity, [0.0; 3]));
    }

    let src_centroid = centroid(points_in_src);
    let dst_centroid = centroid(points_in_dst);

    // cross covariance H = sum[(src - src_mean) * (dst - dst_mean)^T]
    let mut h = [[0.0f64; 3]; 3];
    for (p_src, p_dst) in points_in_src.iter().zip(points_in_dst.iter()) {
        let s = [
            p_src[0] - src_centroid[0],
            p_src[1] - src_centroid[1],
            p_src[2] - src_centroid[2],
        ];
        let d = [
            p_dst[0] - dst_centroid[0],
            p_dst[1] - dst_centroid[1],
            p_dst[2] - dst_centroid[2],
        ];
        for (i, si) in s.iter().enumerate() {
            for (j, dj) in d.iter().enumerate() {
                h[i][j] += si * dj;
            }
        }
    }
    if h.iter().flatten().any(|v| !v.is_finite()) {
        return Err(AlignError::NonFinite);
    }

    let (u, v) = svd3(&h);

    // R = V * U^T, rejecting reflections by flipping the smallest
    // singular vector (last column of V, singular values descending)
    let mut v = v;
    let mut r = matmul33(&v, &transpose3(&u));
    if det3(&r) < 0.0 {
        for row in v.iter_mut() {
            row[2] = -row[2];
        }
        r = matmul33(&v, &transpose3(&u));
    }

    let rc = matvec3(&r, &src_centroid);
    let t = [
        dst_centroid[0] - rc[0],
        dst_centroid[1] - rc[1],
        dst_centroid[2] - rc[2],
    ];

    Ok((r, t))
}

/// Singular value decomposition of a 3x3 matrix, returning `(U, V)`.
fn svd3(m: &[[f64; 3]; 3]) -> ([[f64; 3]; 3], [[f64; 3]; 3]) {
    let mat = faer::mat![
        [m[0][0], m[0][1], m[0][2]],
        [m[1][0], m[1][1], m[1][2]],
        [m[2][0], m[2][1], m[2][2]]
    ];
    let svd = mat.svd();
    let mut u = [[0.0; 3]; 3];
    let mut v = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            u[i][j] = svd.u().read(i, j);
            v[i][j] = svd.v().read(i, j);
        }
    }
    (u, v)
}

fn transpose3(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = m[j][i];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kiddo::immutable::float::kdtree::ImmutableKdTree;
    use rand::{Rng, SeedableRng};
    use splatmerge_3d::{linalg::transform_points, transforms::axis_angle_to_rotation_matrix};

    fn create_random_points(num_points: usize, seed: u64) -> Vec<[f64; 3]> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..num_points)
            .map(|_| {
                [
                    rng.random::<f64>() * 2.0,
                    rng.random::<f64>(),
                    rng.random::<f64>() * 0.5,
                ]
            })
            .collect()
    }

    #[test]
    fn test_normalize_points() {
        let points = vec![[1.0, 0.0, 0.0], [3.0, 0.0, 0.0], [1.0, 4.0, 0.0]];
        let (normalized, center, scale) = normalize_points(&points).unwrap();
        assert_relative_eq!(center[0], 5.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(center[1], 4.0 / 3.0, epsilon = 1e-12);
        // largest centered coordinate: |4 - 4/3| = 8/3
        assert_relative_eq!(scale, 8.0 / 3.0, epsilon = 1e-12);
        let max_abs = normalized
            .iter()
            .flat_map(|p| p.iter())
            .fold(0.0f64, |acc, v| acc.max(v.abs()));
        assert_relative_eq!(max_abs, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_points_degenerate() {
        let points = vec![[1.0, 1.0, 1.0]; 5];
        assert!(matches!(
            normalize_points(&points),
            Err(AlignError::DegeneratePointCloud)
        ));
        assert!(matches!(
            normalize_points(&[[0.0; 3]; 2]),
            Err(AlignError::TooFewPoints(2))
        ));
    }

    #[test]
    fn test_subsample_is_seeded() {
        let points = create_random_points(100, 7);
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let sample_a = subsample(&points, 10, &mut rng_a);
        let sample_b = subsample(&points, 10, &mut rng_b);
        assert_eq!(sample_a.len(), 10);
        assert_eq!(sample_a, sample_b);

        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(subsample(&points, 1000, &mut rng), points);
    }

    #[test]
    fn test_find_correspondences() {
        let points_src = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
        ];
        let points_dst = vec![[1.0, 0.0, 0.0], [1.0, 1.0, 0.0]];

        let kdtree = ImmutableKdTree::new_from_slice(&points_dst);
        let (matched, distances) = find_correspondences(&points_src, &points_dst, &kdtree);

        assert_eq!(matched.len(), 4);
        assert_relative_eq!(distances[0], 1.0);
        assert_relative_eq!(distances[1], 0.0);
        assert_relative_eq!(distances[2], 1.0);
        assert_relative_eq!(distances[3], 0.0);
        assert_eq!(matched[1], [1.0, 0.0, 0.0]);
        assert_eq!(matched[3], [1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_fit_transformation_identity() {
        let points = create_random_points(30, 1);
        let (rotation, translation) = fit_transformation(&points, &points).unwrap();

        let expected = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        for (res, exp) in rotation.iter().zip(expected.iter()) {
            for (r, e) in res.iter().zip(exp.iter()) {
                assert_relative_eq!(r, e, epsilon = 1e-9);
            }
        }
        for t in translation {
            assert_relative_eq!(t, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_fit_transformation_quarter_turn() -> Result<(), Box<dyn std::error::Error>> {
        let points_src = create_random_points(30, 2);
        let expected_rotation =
            axis_angle_to_rotation_matrix(&[0.0, 0.0, 1.0], std::f64::consts::PI / 2.0)?;
        let expected_translation = [1.0, 2.0, 3.0];

        let mut points_dst = vec![[0.0; 3]; points_src.len()];
        transform_points(
            &points_src,
            &expected_rotation,
            &expected_translation,
            &mut points_dst,
        );

        let (rotation, translation) = fit_transformation(&points_src, &points_dst)?;

        for (res, exp) in rotation.iter().zip(expected_rotation.iter()) {
            for (r, e) in res.iter().zip(exp.iter()) {
                assert_relative_eq!(r, e, epsilon = 1e-6);
            }
        }
        for (res, exp) in translation.iter().zip(expected_translation.iter()) {
            assert_relative_eq!(res, exp, epsilon = 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_fit_transformation_never_reflects() {
        // nearly planar correspondences with a flipped pairing push the
        // naive V * U^T toward a reflection
        let points_src = vec![
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, -1.0, 0.0],
        ];
        let points_dst = vec![
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, -1.0, 0.0],
            [-1.0, 0.0, 0.0],
        ];
        let (rotation, _) = fit_transformation(&points_src, &points_dst).unwrap();
        assert!(det3(&rotation) > 0.0);
    }
}
