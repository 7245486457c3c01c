use crate::io::ply::{PlyError, PlyPropertyDefinition};

/// A Gaussian splat cloud: a property schema plus one decoded record per splat.
///
/// Every record holds exactly one `f64` value per schema property, in schema
/// order. Positions live in the properties named `x`, `y` and `z`; the rest
/// of the schema (normals, spherical harmonics, scales, rotation, opacity)
/// is carried opaquely so unknown layouts survive a merge untouched.
#[derive(Debug, Clone)]
pub struct SplatCloud {
    schema: Vec<PlyPropertyDefinition>,
    records: Vec<Vec<f64>>,
}

impl SplatCloud {
    /// Create a new splat cloud, checking that every record matches the schema width.
    pub fn new(
        schema: Vec<PlyPropertyDefinition>,
        records: Vec<Vec<f64>>,
    ) -> Result<Self, PlyError> {
        for record in &records {
            if record.len() != schema.len() {
                return Err(PlyError::RecordWidthMismatch {
                    expected: schema.len(),
                    actual: record.len(),
                });
            }
        }
        Ok(Self { schema, records })
    }

    /// Number of splats in the cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The property schema, in binary layout order.
    pub fn schema(&self) -> &[PlyPropertyDefinition] {
        &self.schema
    }

    /// The decoded records, one per splat.
    pub fn records(&self) -> &[Vec<f64>] {
        &self.records
    }

    /// Mutable access to the decoded records.
    pub fn records_mut(&mut self) -> &mut [Vec<f64>] {
        &mut self.records
    }

    /// Index of the property with the given name, if present.
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.schema.iter().position(|p| p.name == name)
    }

    /// Indices of every property whose name starts with the given prefix,
    /// in schema order.
    pub fn property_indices_with_prefix(&self, prefix: &str) -> Vec<usize> {
        self.schema
            .iter()
            .enumerate()
            .filter(|(_, p)| p.name.starts_with(prefix))
            .map(|(i, _)| i)
            .collect()
    }

    /// Extract the splat positions from the `x`, `y`, `z` properties.
    pub fn positions(&self) -> Result<Vec<[f64; 3]>, PlyError> {
        let ix = self
            .property_index("x")
            .ok_or(PlyError::MissingProperty("x"))?;
        let iy = self
            .property_index("y")
            .ok_or(PlyError::MissingProperty("y"))?;
        let iz = self
            .property_index("z")
            .ok_or(PlyError::MissingProperty("z"))?;

        Ok(self
            .records
            .iter()
            .map(|r| [r[ix], r[iy], r[iz]])
            .collect())
    }

    /// Append another cloud's records to this one.
    ///
    /// The schemas must agree on property names and order; the appended
    /// records keep their attribute values as-is.
    pub fn append(&mut self, other: SplatCloud) -> Result<(), PlyError> {
        let names = |schema: &[PlyPropertyDefinition]| {
            schema
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        };
        if self.schema.len() != other.schema.len()
            || self
                .schema
                .iter()
                .zip(&other.schema)
                .any(|(a, b)| a.name != b.name)
        {
            return Err(PlyError::SchemaMismatch {
                expected: names(&self.schema),
                actual: names(&other.schema),
            });
        }
        self.records.extend(other.records);
        Ok(())
    }

    /// Axis-aligned bounding box of the positions, `(min, max)`.
    ///
    /// Returns zeros for an empty cloud.
    pub fn bounds(&self) -> Result<([f64; 3], [f64; 3]), PlyError> {
        let positions = self.positions()?;
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        if let Some(first) = positions.first() {
            min = *first;
            max = *first;
        }
        for p in &positions {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Ok((min, max))
    }
}
