use super::ColmapError;

/// Sentinel value marking a 2D observation with no triangulated 3D point.
pub const UNOBSERVED_POINT3D_ID: i64 = -1;

/// Camera projection models understood by the text codec.
///
/// The model name fixes the length of the parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraModelId {
    /// f, cx, cy
    SimplePinhole,
    /// fx, fy, cx, cy
    Pinhole,
    /// f, cx, cy, k
    SimpleRadial,
    /// f, cx, cy, k1, k2
    Radial,
    /// fx, fy, cx, cy, k1, k2, p1, p2
    OpenCV,
    /// fx, fy, cx, cy, k1, k2, k3, k4
    OpenCVFisheye,
    /// fx, fy, cx, cy, k1, k2, p1, p2, k3, k4, k5, k6
    FullOpenCV,
    /// fx, fy, cx, cy, omega
    Fov,
    /// f, cx, cy, k
    SimpleRadialFisheye,
    /// f, cx, cy, k1, k2
    RadialFisheye,
    /// fx, fy, cx, cy, k1, k2, p1, p2, k3, k4, sx1, sy1
    ThinPrismFisheye,
}

impl CameraModelId {
    /// The COLMAP model name as it appears in `cameras.txt`.
    pub fn name(&self) -> &'static str {
        match self {
            CameraModelId::SimplePinhole => "SIMPLE_PINHOLE",
            CameraModelId::Pinhole => "PINHOLE",
            CameraModelId::SimpleRadial => "SIMPLE_RADIAL",
            CameraModelId::Radial => "RADIAL",
            CameraModelId::OpenCV => "OPENCV",
            CameraModelId::OpenCVFisheye => "OPENCV_FISHEYE",
            CameraModelId::FullOpenCV => "FULL_OPENCV",
            CameraModelId::Fov => "FOV",
            CameraModelId::SimpleRadialFisheye => "SIMPLE_RADIAL_FISHEYE",
            CameraModelId::RadialFisheye => "RADIAL_FISHEYE",
            CameraModelId::ThinPrismFisheye => "THIN_PRISM_FISHEYE",
        }
    }

    /// Number of parameters the model carries.
    pub fn num_params(&self) -> usize {
        match self {
            CameraModelId::SimplePinhole => 3,
            CameraModelId::Pinhole => 4,
            CameraModelId::SimpleRadial => 4,
            CameraModelId::Radial => 5,
            CameraModelId::OpenCV => 8,
            CameraModelId::OpenCVFisheye => 8,
            CameraModelId::FullOpenCV => 12,
            CameraModelId::Fov => 5,
            CameraModelId::SimpleRadialFisheye => 4,
            CameraModelId::RadialFisheye => 5,
            CameraModelId::ThinPrismFisheye => 12,
        }
    }

    /// Parse a COLMAP model name.
    pub fn from_name(name: &str) -> Result<Self, ColmapError> {
        match name {
            "SIMPLE_PINHOLE" => Ok(CameraModelId::SimplePinhole),
            "PINHOLE" => Ok(CameraModelId::Pinhole),
            "SIMPLE_RADIAL" => Ok(CameraModelId::SimpleRadial),
            "RADIAL" => Ok(CameraModelId::Radial),
            "OPENCV" => Ok(CameraModelId::OpenCV),
            "OPENCV_FISHEYE" => Ok(CameraModelId::OpenCVFisheye),
            "FULL_OPENCV" => Ok(CameraModelId::FullOpenCV),
            "FOV" => Ok(CameraModelId::Fov),
            "SIMPLE_RADIAL_FISHEYE" => Ok(CameraModelId::SimpleRadialFisheye),
            "RADIAL_FISHEYE" => Ok(CameraModelId::RadialFisheye),
            "THIN_PRISM_FISHEYE" => Ok(CameraModelId::ThinPrismFisheye),
            _ => Err(ColmapError::InvalidCameraModel(name.to_string())),
        }
    }
}

/// Represents a camera in a Colmap model.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapCamera {
    /// Camera id, unique per model
    pub camera_id: u32,
    /// Camera model
    pub model_id: CameraModelId,
    /// Image width
    pub width: usize,
    /// Image height
    pub height: usize,
    /// Camera parameters, length fixed by the model
    pub params: Vec<f64>,
}

/// Represents a posed image in a Colmap model.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapImage {
    /// Image id, unique per model
    pub image_id: u32,
    /// Rotation as qw, qx, qy, qz
    pub rotation: [f64; 4],
    /// Translation
    pub translation: [f64; 3],
    /// Owning camera id
    pub camera_id: u32,
    /// Image name, used for cross-file correlation
    pub name: String,
    /// 2D observations as (x, y, point3d_id); point3d_id is
    /// [`UNOBSERVED_POINT3D_ID`] when the keypoint has no 3D point
    pub points2d: Vec<(f64, f64, i64)>,
}

/// Represents a triangulated 3D point in a Colmap model.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapPoint3d {
    /// Point3d id, unique per model
    pub point3d_id: u64,
    /// x, y, z coordinates
    pub xyz: [f64; 3],
    /// rgb color
    pub rgb: [u8; 3],
    /// Mean reprojection error
    pub error: f64,
    /// Track as (image_id, point2d_idx) pairs
    pub track: Vec<(u32, u32)>,
}

/// A full sparse reconstruction: cameras, posed images and 3D points.
///
/// Entities live in flat vectors; lookups by identifier are built where
/// needed (merge, validation) rather than being carried as cross-references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColmapModel {
    /// The cameras of the model.
    pub cameras: Vec<ColmapCamera>,
    /// The posed images of the model.
    pub images: Vec<ColmapImage>,
    /// The triangulated 3D points of the model.
    pub points3d: Vec<ColmapPoint3d>,
}
