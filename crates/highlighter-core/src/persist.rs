use std::path::Path;

use crate::backend::{DocumentError, PdfDocument};

/// Save `doc` to `path`, then close it whether or not the save succeeded.
///
/// Takes ownership so the document cannot be used after persisting.
pub fn persist<D: PdfDocument>(mut doc: D, path: &Path) -> Result<(), DocumentError> {
    let result = doc.save(path);
    doc.close();
    match &result {
        Ok(()) => tracing::info!(path = %path.display(), "document saved"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "document save failed"),
    }
    result
}
