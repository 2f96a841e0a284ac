//! Plain text sources (worked examples, notes)

use crate::error::{DataLoadError, Result};
use std::path::Path;

/// Return the file contents verbatim
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| DataLoadError::io(path, e))
}
