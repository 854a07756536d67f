pub mod container;
pub mod document;
pub mod errors;
pub mod manifest;

pub use container::{read_container, write_container, Artifact, ContainerContents};
pub use document::{document_to_json, parse_document};
pub use errors::{ContainerError, FormatError};
pub use manifest::{
    sha256_hex, ArtifactBuild, ArtifactEntry, DocumentEntry, Manifest, CONTAINER_SCHEMA,
};
