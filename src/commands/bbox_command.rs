//! Bounding box export command
//!
//! Exports a single cloud-optimized raster covering a WGS84 bounding box.

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::api::{validate_options, CogFetch, ExportOptions};
use crate::commands::command_traits::Command;
use crate::commands::export_options_from;
use crate::coordinate::GeoExtent;
use crate::errors::{ExportError, ExportResult};
use crate::utils::logger::Logger;

/// Command for exporting an area given as a WGS84 bounding box
pub struct BboxCommand<'a> {
    /// Image service endpoint URL
    service_url: String,
    /// The requested area
    extent: GeoExtent,
    /// Output raster path
    out_path: PathBuf,
    /// Shared export options
    options: ExportOptions,
    /// Logger for recording operations
    logger: &'a Logger,
}

impl<'a> BboxCommand<'a> {
    /// Create a new bbox command from CLI arguments
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> ExportResult<Self> {
        info!("Creating bbox export command from arguments");

        let service_url = args.get_one::<String>("service")
            .ok_or_else(|| ExportError::Parse("Missing --service URL".to_string()))?
            .clone();

        let bbox_values: Vec<&str> = args.get_many::<String>("bbox")
            .ok_or_else(|| ExportError::Parse("Missing --bbox values".to_string()))?
            .map(String::as_str)
            .collect();
        let extent = GeoExtent::from_values(&bbox_values)?;
        info!("Requested extent: lon {}..{}, lat {}..{}",
              extent.min_lon, extent.max_lon, extent.min_lat, extent.max_lat);

        let out_path = args.get_one::<String>("out")
            .map(PathBuf::from)
            .ok_or_else(|| ExportError::Parse("Missing --out path".to_string()))?;

        let options = export_options_from(args)?;
        validate_options(&options)?;

        Ok(BboxCommand { service_url, extent, out_path, options, logger })
    }
}

impl<'a> Command for BboxCommand<'a> {
    fn execute(&self) -> ExportResult<()> {
        let api = CogFetch::new(None)?;
        let output = api.export_bbox(
            &self.service_url, &self.extent, &self.options, &self.out_path)?;

        self.logger.log(&format!("Bbox export complete: {}", output.display()))?;
        Ok(())
    }
}
