//! Tile export requests against the exportImage endpoint

use std::fs;
use std::path::Path;

use log::debug;

use super::descriptor::ServiceDescriptor;
use super::http::HttpClient;
use crate::coordinate::BoundingBox;
use crate::errors::ExportResult;
use crate::grid::PixelGrid;
use crate::mosaic::RasterFragment;

/// Fetches planned export tiles as raster fragment files
///
/// Every request pins both `bboxSR` and `imageSR` to the service's native
/// reference system (no reprojection on export) and asks for
/// nearest-neighbor resampling in an uncompressed-in-transit TIFF, so the
/// server hands back original pixel values untouched.
pub struct TileFetcher<'a> {
    client: &'a dyn HttpClient,
    service: &'a ServiceDescriptor,
    token: Option<&'a str>,
}

impl<'a> TileFetcher<'a> {
    /// Create a fetcher for a resolved service
    pub fn new(client: &'a dyn HttpClient, service: &'a ServiceDescriptor, token: Option<&'a str>) -> Self {
        TileFetcher { client, service, token }
    }

    /// Fetch one tile and write its bytes verbatim to `path`
    ///
    /// Any transport failure aborts the whole export; a silently missing
    /// tile would leave a hole in the mosaic.
    pub fn fetch(&self, bbox: &BoundingBox, grid: &PixelGrid, path: &Path) -> ExportResult<RasterFragment> {
        let url = self.build_url(bbox, grid);
        debug!("Requesting tile: {}", url);

        let bytes = self.client.get(&url)?;
        fs::write(path, &bytes)?;

        Ok(RasterFragment::new(path.to_path_buf(), *bbox, *grid))
    }

    /// Build the exportImage request URL for a tile
    fn build_url(&self, bbox: &BoundingBox, grid: &PixelGrid) -> String {
        let mut url = format!(
            "{}/exportImage?f=image&bbox={}&bboxSR={}&imageSR={}&size={}&format=tiff&interpolation=RSP_NearestNeighbor",
            self.service.url,
            bbox.to_param(),
            self.service.wkid,
            self.service.wkid,
            grid.to_param(),
        );
        if let Some(token) = self.token {
            url.push_str("&token=");
            url.push_str(token);
        }
        url
    }
}
