use trueform_types::{IntentDocument, IR_SCHEMA, SUPPORTED_IR_VERSIONS};

use crate::errors::FormatError;

/// Serialize a document to pretty-printed JSON.
pub fn document_to_json(doc: &IntentDocument) -> String {
    serde_json::to_string_pretty(doc).expect("IntentDocument serialization never fails")
}

/// Deserialize a document from JSON, validating the schema token and the
/// IR version.
pub fn parse_document(json: &str) -> Result<IntentDocument, FormatError> {
    let doc: IntentDocument =
        serde_json::from_str(json).map_err(|e| FormatError::Parse(e.to_string()))?;

    if doc.schema != IR_SCHEMA {
        return Err(FormatError::UnsupportedSchema {
            schema: doc.schema,
        });
    }
    if !SUPPORTED_IR_VERSIONS.contains(&doc.ir_version) {
        return Err(FormatError::UnsupportedVersion {
            version: doc.ir_version,
        });
    }
    Ok(doc)
}
