use std::io::{BufRead, Read, Write};
use std::path::Path;

use super::{record_size, PlyDataType, PlyError, PlyPropertyDefinition};
use crate::pointcloud::SplatCloud;

struct PlyHeader {
    pub vertex_count: usize,
    pub properties: Vec<PlyPropertyDefinition>,
}

fn parse_header<R: BufRead>(reader: &mut R) -> Result<PlyHeader, PlyError> {
    let mut line = String::new();
    let mut vertex_count = None;
    let mut is_binary_little_endian = false;
    let mut is_ply = false;
    let mut terminated = false;
    let mut properties = Vec::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim();

        if trimmed == "ply" {
            is_ply = true;
            continue;
        }

        if trimmed == "end_header" {
            terminated = true;
            break;
        }

        if trimmed.starts_with("comment") {
            continue;
        }

        if trimmed.starts_with("format binary_little_endian") {
            is_binary_little_endian = true;
        } else if trimmed.starts_with("element vertex") {
            vertex_count = Some(
                trimmed
                    .split_whitespace()
                    .last()
                    .and_then(|s| s.parse().ok())
                    .ok_or(PlyError::MissingVertexElement)?,
            );
        } else if trimmed.starts_with("property") {
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            if parts.len() < 3 {
                return Err(PlyError::MalformedProperty(trimmed.to_string()));
            }
            let data_type = PlyDataType::from_token(parts[1])?;
            let name = parts[2].to_string();
            properties.push(PlyPropertyDefinition { name, data_type });
        }
    }

    if !is_ply {
        return Err(PlyError::MissingMagic);
    }
    if !terminated {
        return Err(PlyError::UnterminatedHeader);
    }
    if !is_binary_little_endian {
        return Err(PlyError::UnsupportedFormat);
    }

    let vertex_count = vertex_count.ok_or(PlyError::MissingVertexElement)?;

    Ok(PlyHeader {
        vertex_count,
        properties,
    })
}

/// Read a binary little-endian PLY file into a [`SplatCloud`].
///
/// The schema is taken from the header property list; every value is
/// widened to `f64` on decode. A trailing partial record or a record count
/// that disagrees with the header is an error, never a silent truncation.
pub fn read_ply_binary(path: impl AsRef<Path>) -> Result<SplatCloud, PlyError> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let header = parse_header(&mut reader)?;

    if header.properties.is_empty() {
        return Err(PlyError::EmptySchema);
    }
    let record_len = record_size(&header.properties);

    let mut body = Vec::new();
    reader.read_to_end(&mut body)?;

    if body.len() % record_len != 0 {
        return Err(PlyError::TruncatedRecord {
            body_len: body.len(),
            record_size: record_len,
        });
    }
    let actual = body.len() / record_len;
    if actual != header.vertex_count {
        return Err(PlyError::CountMismatch {
            declared: header.vertex_count,
            actual,
        });
    }

    let mut records = Vec::with_capacity(header.vertex_count);
    for chunk in body.chunks_exact(record_len) {
        let mut values = Vec::with_capacity(header.properties.len());
        let mut offset = 0;
        for prop in &header.properties {
            values.push(prop.data_type.read_le(&chunk[offset..]));
            offset += prop.data_type.size();
        }
        records.push(values);
    }

    SplatCloud::new(header.properties, records)
}

/// Write a [`SplatCloud`] as a binary little-endian PLY file.
///
/// Every property is written as a 32-bit float regardless of the type it
/// was decoded from; splat consumers expect single precision, so this
/// narrowing is part of the format contract. Property names and order are
/// preserved.
pub fn write_ply_binary(path: impl AsRef<Path>, cloud: &SplatCloud) -> Result<(), PlyError> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);

    writeln!(writer, "ply")?;
    writeln!(writer, "format binary_little_endian 1.0")?;
    writeln!(writer, "element vertex {}", cloud.len())?;
    for prop in cloud.schema() {
        writeln!(writer, "property float {}", prop.name)?;
    }
    writeln!(writer, "end_header")?;

    for record in cloud.records() {
        for value in record {
            writer.write_all(&(*value as f32).to_le_bytes())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SPLAT_HEADER: &str = "ply\nformat binary_little_endian 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nproperty float scale_0\nproperty float opacity\nend_header\n";

    fn write_splat_file(values: &[f32]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SPLAT_HEADER.as_bytes()).unwrap();
        for v in values {
            file.write_all(&v.to_le_bytes()).unwrap();
        }
        file
    }

    #[test]
    fn test_parse_header_basic() {
        let header_text = "ply\nformat binary_little_endian 1.0\nelement vertex 10\nproperty float x\nproperty float y\nproperty float z\nend_header\n";
        let mut reader = std::io::BufReader::new(header_text.as_bytes());
        let header = parse_header(&mut reader).unwrap();
        assert_eq!(header.vertex_count, 10);
        assert_eq!(header.properties.len(), 3);
        assert_eq!(header.properties[0].name, "x");
        assert_eq!(header.properties[0].data_type, PlyDataType::Float32);
    }

    #[test]
    fn test_parse_header_skips_comments() {
        let header_text = "ply\nformat binary_little_endian 1.0\ncomment made by nobody\nelement vertex 1\nproperty float x\nend_header\n";
        let mut reader = std::io::BufReader::new(header_text.as_bytes());
        let header = parse_header(&mut reader).unwrap();
        assert_eq!(header.vertex_count, 1);
        assert_eq!(header.properties.len(), 1);
    }

    #[test]
    fn test_parse_header_unterminated() {
        let header_text = "ply\nformat binary_little_endian 1.0\nelement vertex 10\nproperty float x\n";
        let mut reader = std::io::BufReader::new(header_text.as_bytes());
        assert!(matches!(
            parse_header(&mut reader),
            Err(PlyError::UnterminatedHeader)
        ));
    }

    #[test]
    fn test_parse_header_unknown_type() {
        let header_text = "ply\nformat binary_little_endian 1.0\nelement vertex 10\nproperty int16 x\nend_header\n";
        let mut reader = std::io::BufReader::new(header_text.as_bytes());
        assert!(matches!(
            parse_header(&mut reader),
            Err(PlyError::UnknownPropertyType(t)) if t == "int16"
        ));
    }

    #[test]
    fn test_parse_header_malformed_property() {
        let header_text =
            "ply\nformat binary_little_endian 1.0\nelement vertex 1\nproperty float\nend_header\n";
        let mut reader = std::io::BufReader::new(header_text.as_bytes());
        assert!(matches!(
            parse_header(&mut reader),
            Err(PlyError::MalformedProperty(line)) if line == "property float"
        ));
    }

    #[test]
    fn test_read_ply_binary_empty_schema() {
        let mut file = NamedTempFile::new().unwrap();
        let header = "ply\nformat binary_little_endian 1.0\nelement vertex 0\nend_header\n";
        file.write_all(header.as_bytes()).unwrap();
        assert!(matches!(
            read_ply_binary(file.path()),
            Err(PlyError::EmptySchema)
        ));
    }

    #[test]
    fn test_parse_header_ascii_rejected() {
        let header_text = "ply\nformat ascii 1.0\nelement vertex 10\nproperty float x\nend_header\n";
        let mut reader = std::io::BufReader::new(header_text.as_bytes());
        assert!(matches!(
            parse_header(&mut reader),
            Err(PlyError::UnsupportedFormat)
        ));
    }

    #[test]
    fn test_read_ply_binary() {
        let file = write_splat_file(&[
            1.0, 2.0, 3.0, 0.5, 0.9, //
            4.0, 5.0, 6.0, 0.25, 0.8,
        ]);

        let cloud = read_ply_binary(file.path()).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.schema().len(), 5);
        assert_eq!(cloud.records()[0][..3], [1.0, 2.0, 3.0]);
        assert_eq!(cloud.records()[1][4], 0.8f32 as f64);
    }

    #[test]
    fn test_read_ply_binary_partial_record() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SPLAT_HEADER.as_bytes()).unwrap();
        // two whole records plus 3 stray bytes
        for v in [1.0f32; 10] {
            file.write_all(&v.to_le_bytes()).unwrap();
        }
        file.write_all(&[0u8, 1, 2]).unwrap();

        assert!(matches!(
            read_ply_binary(file.path()),
            Err(PlyError::TruncatedRecord { body_len: 43, record_size: 20 })
        ));
    }

    #[test]
    fn test_read_ply_binary_count_mismatch() {
        // header says 2 records, body holds only 1
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SPLAT_HEADER.as_bytes()).unwrap();
        for v in [1.0f32; 5] {
            file.write_all(&v.to_le_bytes()).unwrap();
        }

        assert!(matches!(
            read_ply_binary(file.path()),
            Err(PlyError::CountMismatch { declared: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_write_read_roundtrip() {
        let file = write_splat_file(&[
            1.0, 2.0, 3.0, 0.5, 0.9, //
            4.0, 5.0, 6.0, 0.25, 0.8,
        ]);
        let cloud = read_ply_binary(file.path()).unwrap();

        let out = NamedTempFile::new().unwrap();
        write_ply_binary(out.path(), &cloud).unwrap();
        let reread = read_ply_binary(out.path()).unwrap();

        assert_eq!(reread.len(), cloud.len());
        assert_eq!(reread.schema(), cloud.schema());
        for (a, b) in cloud.records().iter().zip(reread.records()) {
            for (va, vb) in a.iter().zip(b) {
                assert!((*va as f32 - *vb as f32).abs() < f32::EPSILON);
            }
        }
    }

    #[test]
    fn test_roundtrip_narrows_doubles() {
        // a double property comes back as float after one write
        let mut file = NamedTempFile::new().unwrap();
        let header = "ply\nformat binary_little_endian 1.0\nelement vertex 1\nproperty double x\nproperty double y\nproperty double z\nend_header\n";
        file.write_all(header.as_bytes()).unwrap();
        for v in [1.00000001f64, 2.0, 3.0] {
            file.write_all(&v.to_le_bytes()).unwrap();
        }

        let cloud = read_ply_binary(file.path()).unwrap();
        let out = NamedTempFile::new().unwrap();
        write_ply_binary(out.path(), &cloud).unwrap();
        let reread = read_ply_binary(out.path()).unwrap();

        assert_eq!(reread.schema()[0].data_type, PlyDataType::Float32);
        assert!((reread.records()[0][0] - 1.00000001).abs() < 1e-6);
    }
}
