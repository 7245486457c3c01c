mod parser;
mod properties;

pub use parser::*;
pub use properties::*;

/// Error types for the PLY module.
#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    /// Failed to read or write the PLY file
    #[error("Failed to read or write the PLY file")]
    Io(#[from] std::io::Error),

    /// The file does not start with the `ply` magic line
    #[error("Missing `ply` magic line")]
    MissingMagic,

    /// The header declares a format other than binary little endian
    #[error("Unsupported PLY format, expected binary_little_endian")]
    UnsupportedFormat,

    /// The header ended before the `end_header` marker
    #[error("Unterminated PLY header")]
    UnterminatedHeader,

    /// The header declares no vertex element
    #[error("Missing `element vertex` declaration")]
    MissingVertexElement,

    /// A property line declares an unrecognized data type
    #[error("Unknown PLY property type `{0}`")]
    UnknownPropertyType(String),

    /// A property line is missing its type or name token
    #[error("Malformed PLY property line `{0}`")]
    MalformedProperty(String),

    /// The header declares no properties at all
    #[error("PLY header declares no properties")]
    EmptySchema,

    /// The binary body is not a whole multiple of the record size
    #[error("Truncated PLY record: body of {body_len} bytes is not a multiple of the {record_size} byte record")]
    TruncatedRecord {
        /// Length in bytes of the binary body.
        body_len: usize,
        /// Size in bytes of one record.
        record_size: usize,
    },

    /// The binary body holds a different number of records than declared
    #[error("PLY record count mismatch: header declares {declared}, body holds {actual}")]
    CountMismatch {
        /// Count declared in the header.
        declared: usize,
        /// Count derived from the body length.
        actual: usize,
    },

    /// A required property is absent from the schema
    #[error("Missing PLY property `{0}`")]
    MissingProperty(&'static str),

    /// Two clouds with different schemas cannot be combined
    #[error("PLY schema mismatch: `{expected}` vs `{actual}`")]
    SchemaMismatch {
        /// Property names of the first schema.
        expected: String,
        /// Property names of the second schema.
        actual: String,
    },

    /// A record holds a different number of values than the schema declares
    #[error("PLY record width mismatch: schema has {expected} properties, record has {actual} values")]
    RecordWidthMismatch {
        /// Number of properties in the schema.
        expected: usize,
        /// Number of values in the offending record.
        actual: usize,
    },
}
