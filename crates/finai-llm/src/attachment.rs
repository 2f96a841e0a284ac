//! Reading files into inline document payloads

use crate::{DocumentSource, LLMError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;
use tracing::debug;

/// Read `path` and encode it as a [`DocumentSource`]
///
/// The media type is guessed from the file extension.
pub async fn load_document(path: &Path) -> Result<DocumentSource> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| LLMError::AttachmentError {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;

    let media_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();

    debug!(
        path = %path.display(),
        bytes = bytes.len(),
        media_type = %media_type,
        "encoded attachment"
    );

    Ok(DocumentSource {
        media_type,
        data: STANDARD.encode(&bytes),
        name: path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string),
    })
}
