//! Main interface to the cogfetch library
//!
//! Ties the pipeline together: service resolution, area resolution, tile
//! planning, sequential fetching, and mosaic encoding. The CLI commands
//! are thin wrappers over this facade.

use std::path::{Path, PathBuf};

use log::{error, info};

use crate::cog::CogOptions;
use crate::coordinate::{AreaResolver, BoundingBox, BufferUnit, GeoExtent, GeoPoint, SpatialRef};
use crate::errors::{ExportError, ExportResult};
use crate::grid::GridPlanner;
use crate::mosaic::{cleanup_fragments, MosaicAssembler};
use crate::points::{read_points_csv, NamingStrategy};
use crate::service::{HttpClient, ReqwestClient, ServiceDescriptor, TileFetcher, DEFAULT_PIXEL_SIZE};
use crate::utils::logger::Logger;
use crate::utils::progress::ProgressTracker;

/// Timeout for metadata queries
const METADATA_TIMEOUT_SECS: u64 = 60;

/// Timeout for tile export requests, which can be slow on large tiles
const EXPORT_TIMEOUT_SECS: u64 = 180;

/// Caller-tunable export options
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Pixel size override in native units per pixel; when unset the
    /// service's published pixel size is used, then the 4-inch default
    pub pixel_size: Option<f64>,
    /// Internal block size of the output raster
    pub block_size: u32,
    /// Output compression scheme name
    pub compression: String,
    /// Keep intermediate fragment files after the mosaic
    pub keep_fragments: bool,
    /// Access token for secured services
    pub token: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            pixel_size: None,
            block_size: 512,
            compression: "DEFLATE".to_string(),
            keep_fragments: false,
            token: None,
        }
    }
}

/// Main interface to the cogfetch library
pub struct CogFetch {
    logger: Logger,
}

impl CogFetch {
    /// Create a new CogFetch instance
    ///
    /// # Arguments
    /// * `log_file` - Optional path to log file, defaults to "cogfetch.log"
    pub fn new(log_file: Option<&str>) -> ExportResult<Self> {
        let log_path = log_file.unwrap_or("cogfetch.log");
        let logger = Logger::new(log_path)?;
        Ok(CogFetch { logger })
    }

    /// Export one raster covering a WGS84 bounding box
    pub fn export_bbox(&self, service_url: &str, extent: &GeoExtent,
                       options: &ExportOptions, out_path: &Path) -> ExportResult<PathBuf> {
        let service = self.resolve_service(service_url)?;
        let bbox = self.area_resolver(&service)?.resolve_extent(extent)?;
        self.export_area(&service, &bbox, options, out_path)
    }

    /// Export one raster covering a buffered WGS84 point
    pub fn export_point(&self, service_url: &str, point: &GeoPoint, buffer: f64,
                        unit: BufferUnit, options: &ExportOptions,
                        out_path: &Path) -> ExportResult<PathBuf> {
        let service = self.resolve_service(service_url)?;
        let bbox = self.area_resolver(&service)?.resolve_point(point, buffer, unit)?;
        self.export_area(&service, &bbox, options, out_path)
    }

    /// Export one raster per row of a points CSV
    ///
    /// Output files are named by the default [`NamingStrategy`] and placed
    /// in `out_dir`. The first failing row aborts the run.
    pub fn export_points_csv(&self, service_url: &str, csv_path: &Path, buffer: f64,
                             unit: BufferUnit, options: &ExportOptions,
                             out_dir: &Path) -> ExportResult<Vec<PathBuf>> {
        let service = self.resolve_service(service_url)?;
        let resolver = self.area_resolver(&service)?;
        let records = read_points_csv(csv_path)?;
        let strategy = NamingStrategy::new();

        info!("Exporting {} point(s) from {}", records.len(), csv_path.display());
        std::fs::create_dir_all(out_dir)?;

        let mut outputs = Vec::with_capacity(records.len());
        for (row, record) in records.iter().enumerate() {
            let stem = strategy.stem(record, row);
            let out_path = out_dir.join(format!("{}.tif", stem));
            let bbox = resolver.resolve_point(&record.point, buffer, unit)?;
            outputs.push(self.export_area(&service, &bbox, options, &out_path)?);
        }

        Ok(outputs)
    }

    /// Resolve service metadata once per invocation
    fn resolve_service(&self, service_url: &str) -> ExportResult<ServiceDescriptor> {
        let client = ReqwestClient::with_timeout(METADATA_TIMEOUT_SECS)?;
        let service = ServiceDescriptor::resolve(&client, service_url)?;
        self.logger.log(&format!(
            "Resolved service wkid {} ({}), max export {}x{}",
            service.wkid, service.unit_name, service.max_width, service.max_height))?;
        Ok(service)
    }

    fn area_resolver(&self, service: &ServiceDescriptor) -> ExportResult<AreaResolver> {
        let spatial_ref = SpatialRef::from_wkid(service.wkid)?;
        Ok(AreaResolver::new(spatial_ref, service.extent))
    }

    /// Shared pipeline: plan, fetch sequentially, mosaic, clean up
    fn export_area(&self, service: &ServiceDescriptor, bbox: &BoundingBox,
                   options: &ExportOptions, out_path: &Path) -> ExportResult<PathBuf> {
        let (pixel_size_x, pixel_size_y) = pixel_sizes(service, options);
        info!("Using pixel size {} x {} ({} per pixel)",
              pixel_size_x, pixel_size_y, service.unit_name);

        let planner = GridPlanner::new(
            pixel_size_x, pixel_size_y, service.max_width, service.max_height);
        let plan = planner.plan(bbox);

        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let client = ReqwestClient::with_timeout(EXPORT_TIMEOUT_SECS)?;
        let fragments = self.fetch_tiles(&client, service, &plan, options, out_path);

        let result = fragments.and_then(|fragments| {
            let cog_options = CogOptions {
                block_size: options.block_size,
                compression: options.compression.clone(),
                verbose: false,
            };
            let assembler = MosaicAssembler::new(pixel_size_x, pixel_size_y, &cog_options);
            let output = assembler.assemble(bbox, &fragments, out_path);
            if !options.keep_fragments {
                cleanup_fragments(&fragments);
            }
            output
        });

        match &result {
            Ok(path) => {
                info!("Wrote {}", path.display());
                self.logger.log(&format!("Wrote {}", path.display()))?;
            }
            Err(e) => error!("Export failed: {}", e),
        }
        result
    }

    /// Fetch every planned tile in row-major order, one at a time
    ///
    /// A failed fetch cleans up the fragments already on disk (unless the
    /// caller keeps them) and aborts; there is no partial-mosaic mode.
    fn fetch_tiles(&self, client: &dyn HttpClient, service: &ServiceDescriptor,
                   plan: &crate::grid::TilePlan, options: &ExportOptions,
                   out_path: &Path) -> ExportResult<Vec<crate::mosaic::RasterFragment>> {
        let fetcher = TileFetcher::new(client, service, options.token.as_deref());
        let progress = ProgressTracker::new(plan.len() as u64, "Fetching tiles");

        let mut fragments = Vec::with_capacity(plan.len());
        for (i, tile) in plan.tiles.iter().enumerate() {
            info!("Exporting tile {}/{} ({}x{} px)",
                  i + 1, plan.len(), tile.grid.width, tile.grid.height);
            let path = fragment_path(out_path, i + 1);
            match fetcher.fetch(&tile.bbox, &tile.grid, &path) {
                Ok(fragment) => {
                    fragments.push(fragment);
                    progress.advance();
                }
                Err(e) => {
                    progress.finish("aborted");
                    if !options.keep_fragments {
                        cleanup_fragments(&fragments);
                    }
                    return Err(e);
                }
            }
        }

        progress.finish("done");
        Ok(fragments)
    }
}

/// Pick the effective pixel sizes: override, then service, then default
fn pixel_sizes(service: &ServiceDescriptor, options: &ExportOptions) -> (f64, f64) {
    if let Some(size) = options.pixel_size {
        return (size, size);
    }
    (
        service.pixel_size_x.unwrap_or(DEFAULT_PIXEL_SIZE),
        service.pixel_size_y.unwrap_or(DEFAULT_PIXEL_SIZE),
    )
}

/// Path for fragment `index` next to the eventual output file
fn fragment_path(out_path: &Path, index: usize) -> PathBuf {
    let stem = out_path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "export".to_string());
    let file_name = format!("{}_part{:03}.tif", stem, index);
    match out_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(file_name),
        _ => PathBuf::from(file_name),
    }
}

/// Validate an export options combination early
///
/// Catches bad compression names and block sizes before any network call.
pub fn validate_options(options: &ExportOptions) -> ExportResult<()> {
    crate::cog::codec_for_name(&options.compression)?;
    if options.block_size == 0 || options.block_size % 16 != 0 {
        return Err(ExportError::Parse(format!(
            "Block size must be a positive multiple of 16, got {}", options.block_size)));
    }
    Ok(())
}
