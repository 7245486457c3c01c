/// Transform a set of points using a rotation and translation.
///
/// `dst_points` must be pre-allocated with the same length as `src_points`.
/// The rotation block is applied with a single faer matrix product over all
/// points, then the translation is added per point.
pub fn transform_points(
    src_points: &[[f64; 3]],
    dst_r_src: &[[f64; 3]; 3],
    dst_t_src: &[f64; 3],
    dst_points: &mut [[f64; 3]],
) {
    assert_eq!(src_points.len(), dst_points.len());

    let n = src_points.len();
    let rotation = faer::Mat::from_fn(3, 3, |i, j| dst_r_src[i][j]);
    let points = faer::Mat::from_fn(3, n, |i, j| src_points[j][i]);

    let mut rotated = faer::Mat::<f64>::zeros(3, n);
    faer::linalg::matmul::matmul(
        rotated.as_mut(),
        rotation.as_ref(),
        points.as_ref(),
        None,
        1.0,
        faer::Parallelism::None,
    );

    for (j, dst) in dst_points.iter_mut().enumerate() {
        for i in 0..3 {
            dst[i] = rotated.read(i, j) + dst_t_src[i];
        }
    }
}

/// Apply a 4x4 homogeneous transform to a single point.
pub fn transform_point_h(point: &[f64; 3], transform: &[[f64; 4]; 4]) -> [f64; 3] {
    let mut out = [0.0; 3];
    for (i, row) in transform.iter().take(3).enumerate() {
        out[i] = row[0] * point[0] + row[1] * point[1] + row[2] * point[2] + row[3];
    }
    out
}

/// Multiply two 3x3 matrices.
pub fn matmul33(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

/// Multiply a 3x3 matrix by a 3-vector.
pub fn matvec3(m: &[[f64; 3]; 3], v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Determinant of a 3x3 matrix.
pub fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// The 4x4 identity transform.
pub fn identity4() -> [[f64; 4]; 4] {
    let mut m = [[0.0; 4]; 4];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}
