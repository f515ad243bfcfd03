//! Raster fragments: fetched tile files and their declared placement

use std::fs;
use std::path::PathBuf;

use log::{debug, warn};

use crate::coordinate::BoundingBox;
use crate::grid::PixelGrid;

/// One fetched tile on disk, with the rectangle and pixel grid it was
/// requested with
///
/// The declared rectangle is what drives mosaic placement; fragments are
/// never registered or aligned against each other.
#[derive(Debug, Clone)]
pub struct RasterFragment {
    /// Path of the fragment file
    pub path: PathBuf,
    /// The native rectangle this fragment was requested with
    pub bbox: BoundingBox,
    /// The pixel dimensions this fragment was requested with
    pub grid: PixelGrid,
}

impl RasterFragment {
    /// Create a fragment record
    pub fn new(path: PathBuf, bbox: BoundingBox, grid: PixelGrid) -> Self {
        RasterFragment { path, bbox, grid }
    }

    /// Delete the fragment file
    ///
    /// Deletion failure is logged, never escalated; a leftover temp file
    /// must not fail an export that already produced its output.
    pub fn delete(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Deleted fragment {}", self.path.display()),
            Err(e) => warn!("Could not delete fragment {}: {}", self.path.display(), e),
        }
    }
}

/// Delete a batch of fragment files, logging failures
pub fn cleanup_fragments(fragments: &[RasterFragment]) {
    for fragment in fragments {
        fragment.delete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part001.tif");
        fs::write(&path, b"bytes").unwrap();

        let fragment = RasterFragment::new(
            path.clone(),
            BoundingBox::new(0.0, 0.0, 1.0, 1.0, 2868),
            PixelGrid { width: 3, height: 3 },
        );
        fragment.delete();
        assert!(!path.exists());
    }

    #[test]
    fn test_delete_missing_file_does_not_panic() {
        let fragment = RasterFragment::new(
            PathBuf::from("/nonexistent/part001.tif"),
            BoundingBox::new(0.0, 0.0, 1.0, 1.0, 2868),
            PixelGrid { width: 3, height: 3 },
        );
        fragment.delete();
    }
}
