/// Errors during IR document parsing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FormatError {
    #[error("failed to parse document: {0}")]
    Parse(String),

    #[error("Unsupported IR schema '{schema}'")]
    UnsupportedSchema { schema: String },

    #[error("Unsupported IR version {version}")]
    UnsupportedVersion { version: u32 },
}

/// Errors during container read/write.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("missing required entry '{name}'")]
    MissingEntry { name: String },

    #[error("'{path}' is a reserved container path")]
    ReservedPath { path: String },

    #[error("artifact path '{path}' must be relative, forward-slash, without '..' segments")]
    InvalidPath { path: String },

    #[error("hash mismatch for '{path}': manifest says {expected}, content is {found}")]
    HashMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("unsupported container schema '{schema}'")]
    UnsupportedSchema { schema: String },

    #[error(transparent)]
    Format(#[from] FormatError),
}
