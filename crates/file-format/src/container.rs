//! `.tfp` / `.tfc` content-addressed containers.
//!
//! A container is a ZIP archive holding exactly `manifest.json`,
//! `document.json`, and the artifact paths the manifest lists. Every entry
//! the manifest names carries a `sha256:` digest; readers recompute and
//! verify all of them.

use std::io::{Read, Seek, Write};

use chrono::Utc;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use trueform_types::IntentDocument;

use crate::document::{document_to_json, parse_document};
use crate::errors::ContainerError;
use crate::manifest::{
    sha256_hex, validate_artifact_path, ArtifactBuild, ArtifactEntry, DocumentEntry, Manifest,
    CONTAINER_SCHEMA,
};

/// One artifact to store in (or loaded from) a container.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub kind: String,
    pub path: String,
    pub bytes: Vec<u8>,
    pub build: Option<ArtifactBuild>,
}

/// Everything read back from a container, hashes verified.
#[derive(Debug, Clone)]
pub struct ContainerContents {
    pub manifest: Manifest,
    pub document: IntentDocument,
    pub artifacts: Vec<Artifact>,
}

/// Write a container to any seekable sink.
pub fn write_container<W: Write + Seek>(
    sink: W,
    document: &IntentDocument,
    artifacts: &[Artifact],
) -> Result<(), ContainerError> {
    for artifact in artifacts {
        validate_artifact_path(&artifact.path)?;
    }

    let document_json = document_to_json(document);
    let document_bytes = document_json.as_bytes();

    let manifest = Manifest {
        schema: CONTAINER_SCHEMA.to_string(),
        created_at: Utc::now(),
        document: DocumentEntry {
            path: "document.json".to_string(),
            schema: document.schema.clone(),
            hash: sha256_hex(document_bytes),
            bytes: document_bytes.len() as u64,
        },
        artifacts: if artifacts.is_empty() {
            None
        } else {
            Some(
                artifacts
                    .iter()
                    .map(|a| ArtifactEntry {
                        kind: a.kind.clone(),
                        path: a.path.clone(),
                        hash: sha256_hex(&a.bytes),
                        bytes: a.bytes.len() as u64,
                        build: a.build.clone(),
                    })
                    .collect(),
            )
        },
    };

    let mut writer = ZipWriter::new(sink);
    let options = FileOptions::default();

    writer.start_file("manifest.json", options)?;
    writer.write_all(
        serde_json::to_string_pretty(&manifest)
            .expect("manifest serialization never fails")
            .as_bytes(),
    )?;

    writer.start_file("document.json", options)?;
    writer.write_all(document_bytes)?;

    for artifact in artifacts {
        writer.start_file(&artifact.path, options)?;
        writer.write_all(&artifact.bytes)?;
    }

    writer.finish()?;
    Ok(())
}

/// Read and verify a container from any seekable source.
pub fn read_container<R: Read + Seek>(source: R) -> Result<ContainerContents, ContainerError> {
    let mut archive = ZipArchive::new(source)?;

    let manifest_json = read_entry(&mut archive, "manifest.json")?;
    let manifest: Manifest = serde_json::from_slice(&manifest_json)
        .map_err(|e| ContainerError::Manifest(e.to_string()))?;
    if manifest.schema != CONTAINER_SCHEMA {
        return Err(ContainerError::UnsupportedSchema {
            schema: manifest.schema,
        });
    }

    let document_bytes = read_entry(&mut archive, &manifest.document.path)?;
    verify_hash(
        &manifest.document.path,
        &manifest.document.hash,
        &document_bytes,
    )?;
    let document = parse_document(
        std::str::from_utf8(&document_bytes)
            .map_err(|e| ContainerError::Manifest(e.to_string()))?,
    )?;

    let mut artifacts = Vec::new();
    for entry in manifest.artifacts.iter().flatten() {
        validate_artifact_path(&entry.path)?;
        let bytes = read_entry(&mut archive, &entry.path)?;
        verify_hash(&entry.path, &entry.hash, &bytes)?;
        artifacts.push(Artifact {
            kind: entry.kind.clone(),
            path: entry.path.clone(),
            bytes,
            build: entry.build.clone(),
        });
    }

    Ok(ContainerContents {
        manifest,
        document,
        artifacts,
    })
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, ContainerError> {
    let mut file = archive.by_name(name).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => ContainerError::MissingEntry {
            name: name.to_string(),
        },
        other => ContainerError::Zip(other),
    })?;
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn verify_hash(path: &str, expected: &str, bytes: &[u8]) -> Result<(), ContainerError> {
    let found = sha256_hex(bytes);
    if found != expected {
        return Err(ContainerError::HashMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            found,
        });
    }
    Ok(())
}
