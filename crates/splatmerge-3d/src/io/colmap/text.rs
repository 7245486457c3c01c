use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use super::{CameraModelId, ColmapCamera, ColmapError, ColmapImage, ColmapModel, ColmapPoint3d};

/// Utility function for parsing whitespace separated fields
fn parse_part<T: std::str::FromStr>(s: &str) -> Result<T, ColmapError>
where
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| ColmapError::ParseError(format!("{}: {}", s, e)))
}

/// Collect the data lines of a model text file, dropping comments and blanks.
fn data_lines(path: impl AsRef<Path>) -> Result<Vec<String>, ColmapError> {
    read_lines(path, false)
}

/// Like [`data_lines`] but keeps blank lines, which images.txt needs: an
/// image without keypoints still owns an (empty) observation line.
fn data_lines_with_blanks(path: impl AsRef<Path>) -> Result<Vec<String>, ColmapError> {
    read_lines(path, true)
}

fn read_lines(path: impl AsRef<Path>, keep_blanks: bool) -> Result<Vec<String>, ColmapError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            continue;
        }
        if trimmed.is_empty() && !keep_blanks {
            continue;
        }
        lines.push(line);
    }
    Ok(lines)
}

/// Parse a camera line.
/// NOTE: The number of parameters depends on the camera model.
///       CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[0], PARAMS[1], ...
fn parse_camera_line(line: &str) -> Result<ColmapCamera, ColmapError> {
    let parts = line.split_whitespace().collect::<Vec<_>>();

    if parts.len() < 5 {
        return Err(ColmapError::ParseError(format!(
            "camera line has {} fields, expected at least 5: `{}`",
            parts.len(),
            line
        )));
    }

    let model_id = CameraModelId::from_name(parts[1])?;
    let params = parts[4..]
        .iter()
        .map(|s| parse_part(s))
        .collect::<Result<Vec<f64>, _>>()?;

    if params.len() != model_id.num_params() {
        return Err(ColmapError::InvalidNumCameraParams {
            model: model_id.name(),
            expected: model_id.num_params(),
            actual: params.len(),
        });
    }

    Ok(ColmapCamera {
        camera_id: parse_part(parts[0])?,
        model_id,
        width: parse_part(parts[2])?,
        height: parse_part(parts[3])?,
        params,
    })
}

/// Parse the two lines describing one posed image.
/// #   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME
/// #   POINTS2D[] as (X, Y, POINT3D_ID)
fn parse_image_lines(line1: &str, line2: &str) -> Result<ColmapImage, ColmapError> {
    let parts1 = line1.split_whitespace().collect::<Vec<_>>();
    let parts2 = line2.split_whitespace().collect::<Vec<_>>();

    if parts1.len() < 10 {
        return Err(ColmapError::ParseError(format!(
            "image line has {} fields, expected at least 10: `{}`",
            parts1.len(),
            line1
        )));
    }
    if parts2.len() % 3 != 0 {
        return Err(ColmapError::ParseError(format!(
            "observation line has {} fields, expected a multiple of 3",
            parts2.len()
        )));
    }

    Ok(ColmapImage {
        image_id: parse_part(parts1[0])?,
        rotation: [
            parse_part(parts1[1])?,
            parse_part(parts1[2])?,
            parse_part(parts1[3])?,
            parse_part(parts1[4])?,
        ],
        translation: [
            parse_part(parts1[5])?,
            parse_part(parts1[6])?,
            parse_part(parts1[7])?,
        ],
        camera_id: parse_part(parts1[8])?,
        name: parts1[9].to_string(),
        points2d: parts2
            .chunks_exact(3)
            .map(|chunk| -> Result<(f64, f64, i64), ColmapError> {
                Ok((
                    parse_part(chunk[0])?,
                    parse_part(chunk[1])?,
                    parse_part(chunk[2])?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?,
    })
}

/// Parse a point3d line.
/// NOTE: POINT3D_ID, X, Y, Z, R, G, B, ERROR, TRACK[] as (IMAGE_ID, POINT2D_IDX)
fn parse_point3d_line(line: &str) -> Result<ColmapPoint3d, ColmapError> {
    let parts = line.split_whitespace().collect::<Vec<_>>();

    if parts.len() < 8 {
        return Err(ColmapError::ParseError(format!(
            "point3d line has {} fields, expected at least 8: `{}`",
            parts.len(),
            line
        )));
    }

    Ok(ColmapPoint3d {
        point3d_id: parse_part(parts[0])?,
        xyz: [
            parse_part(parts[1])?,
            parse_part(parts[2])?,
            parse_part(parts[3])?,
        ],
        rgb: [
            parse_part(parts[4])?,
            parse_part(parts[5])?,
            parse_part(parts[6])?,
        ],
        error: parse_part(parts[7])?,
        track: parts[8..]
            .chunks_exact(2)
            .map(|chunk| -> Result<(u32, u32), ColmapError> {
                Ok((parse_part(chunk[0])?, parse_part(chunk[1])?))
            })
            .collect::<Result<Vec<_>, _>>()?,
    })
}

/// Read a cameras.txt file.
pub fn read_cameras_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapCamera>, ColmapError> {
    data_lines(path)?
        .iter()
        .map(|line| parse_camera_line(line))
        .collect()
}

/// Read an images.txt file.
///
/// Each image spans two data lines: the pose line and the observation line.
pub fn read_images_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapImage>, ColmapError> {
    let lines = data_lines_with_blanks(path)?;
    if lines.len() % 2 != 0 {
        return Err(ColmapError::ParseError(format!(
            "images file has {} data lines, expected an even number",
            lines.len()
        )));
    }
    lines
        .chunks_exact(2)
        .map(|chunk| parse_image_lines(&chunk[0], &chunk[1]))
        .collect()
}

/// Read a points3D.txt file.
pub fn read_points3d_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapPoint3d>, ColmapError> {
    data_lines(path)?
        .iter()
        .map(|line| parse_point3d_line(line))
        .collect()
}

/// Read a full model from a directory holding cameras.txt, images.txt and
/// points3D.txt.
pub fn read_model(dir: impl AsRef<Path>) -> Result<ColmapModel, ColmapError> {
    let dir = dir.as_ref();
    Ok(ColmapModel {
        cameras: read_cameras_txt(dir.join("cameras.txt"))?,
        images: read_images_txt(dir.join("images.txt"))?,
        points3d: read_points3d_txt(dir.join("points3D.txt"))?,
    })
}

/// Write a cameras.txt file, sorted by camera id.
pub fn write_cameras_txt(
    path: impl AsRef<Path>,
    cameras: &[ColmapCamera],
) -> Result<(), ColmapError> {
    let mut writer = BufWriter::new(File::create(path)?);

    writeln!(writer, "# Camera list with one line of data per camera:")?;
    writeln!(writer, "#   CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[]")?;
    writeln!(writer, "# Number of cameras: {}", cameras.len())?;

    let mut sorted = cameras.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|c| c.camera_id);

    for camera in sorted {
        write!(
            writer,
            "{} {} {} {}",
            camera.camera_id,
            camera.model_id.name(),
            camera.width,
            camera.height
        )?;
        for param in &camera.params {
            write!(writer, " {}", param)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Write an images.txt file, sorted by image id, two lines per image.
pub fn write_images_txt(path: impl AsRef<Path>, images: &[ColmapImage]) -> Result<(), ColmapError> {
    let mut writer = BufWriter::new(File::create(path)?);

    let num_obs: usize = images.iter().map(|i| i.points2d.len()).sum();
    let mean_obs = if images.is_empty() {
        0.0
    } else {
        num_obs as f64 / images.len() as f64
    };

    writeln!(writer, "# Image list with two lines of data per image:")?;
    writeln!(
        writer,
        "#   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME"
    )?;
    writeln!(writer, "#   POINTS2D[] as (X, Y, POINT3D_ID)")?;
    writeln!(
        writer,
        "# Number of images: {}, mean observations per image: {}",
        images.len(),
        mean_obs
    )?;

    let mut sorted = images.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|i| i.image_id);

    for image in sorted {
        writeln!(
            writer,
            "{} {} {} {} {} {} {} {} {} {}",
            image.image_id,
            image.rotation[0],
            image.rotation[1],
            image.rotation[2],
            image.rotation[3],
            image.translation[0],
            image.translation[1],
            image.translation[2],
            image.camera_id,
            image.name
        )?;
        let mut first = true;
        for (x, y, point3d_id) in &image.points2d {
            if !first {
                write!(writer, " ")?;
            }
            write!(writer, "{} {} {}", x, y, point3d_id)?;
            first = false;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Write a points3D.txt file, sorted by point id.
pub fn write_points3d_txt(
    path: impl AsRef<Path>,
    points: &[ColmapPoint3d],
) -> Result<(), ColmapError> {
    let mut writer = BufWriter::new(File::create(path)?);

    let track_len: usize = points.iter().map(|p| p.track.len()).sum();
    let mean_track = if points.is_empty() {
        0.0
    } else {
        track_len as f64 / points.len() as f64
    };

    writeln!(writer, "# 3D point list with one line of data per point:")?;
    writeln!(
        writer,
        "#   POINT3D_ID, X, Y, Z, R, G, B, ERROR, TRACK[] as (IMAGE_ID, POINT2D_IDX)"
    )?;
    writeln!(
        writer,
        "# Number of points: {}, mean track length: {}",
        points.len(),
        mean_track
    )?;

    let mut sorted = points.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|p| p.point3d_id);

    for point in sorted {
        write!(
            writer,
            "{} {} {} {} {} {} {} {}",
            point.point3d_id,
            point.xyz[0],
            point.xyz[1],
            point.xyz[2],
            point.rgb[0],
            point.rgb[1],
            point.rgb[2],
            point.error
        )?;
        for (image_id, point2d_idx) in &point.track {
            write!(writer, " {} {}", image_id, point2d_idx)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Write a full model into a directory as cameras.txt, images.txt and
/// points3D.txt, creating the directory if needed.
pub fn write_model(dir: impl AsRef<Path>, model: &ColmapModel) -> Result<(), ColmapError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    write_cameras_txt(dir.join("cameras.txt"), &model.cameras)?;
    write_images_txt(dir.join("images.txt"), &model.images)?;
    write_points3d_txt(dir.join("points3D.txt"), &model.points3d)?;
    Ok(())
}
