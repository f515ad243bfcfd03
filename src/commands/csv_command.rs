//! CSV points export command
//!
//! Exports one cloud-optimized raster per point row, each covering a
//! square buffer around the point.

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::api::{validate_options, CogFetch, ExportOptions};
use crate::commands::command_traits::Command;
use crate::commands::export_options_from;
use crate::coordinate::BufferUnit;
use crate::errors::{ExportError, ExportResult};
use crate::utils::logger::Logger;

/// Command for exporting buffered points listed in a CSV file
pub struct CsvCommand<'a> {
    /// Image service endpoint URL
    service_url: String,
    /// Points CSV path
    csv_path: PathBuf,
    /// Buffer half-side around each point
    buffer: f64,
    /// Unit of the buffer distance
    buffer_unit: BufferUnit,
    /// Output directory
    out_dir: PathBuf,
    /// Shared export options
    options: ExportOptions,
    /// Logger for recording operations
    logger: &'a Logger,
}

impl<'a> CsvCommand<'a> {
    /// Create a new CSV command from CLI arguments
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> ExportResult<Self> {
        info!("Creating CSV export command from arguments");

        let service_url = args.get_one::<String>("service")
            .ok_or_else(|| ExportError::Parse("Missing --service URL".to_string()))?
            .clone();

        let csv_path = args.get_one::<String>("csv")
            .map(PathBuf::from)
            .ok_or_else(|| ExportError::Parse("Missing --csv path".to_string()))?;

        let buffer = args.get_one::<String>("buffer")
            .ok_or_else(|| ExportError::Parse("Missing --buffer distance".to_string()))?
            .parse::<f64>()
            .map_err(|_| ExportError::Parse("Invalid --buffer distance".to_string()))?;

        let buffer_unit = match args.get_one::<String>("buffer-unit").map(String::as_str) {
            Some("meters") => BufferUnit::Meters,
            // The documented assumption for foot-based deployments
            Some("feet") | None => BufferUnit::ServiceUnits,
            Some(other) => return Err(ExportError::Parse(format!(
                "Unknown buffer unit: {} (expected feet or meters)", other))),
        };
        info!("Buffer: {} ({:?})", buffer, buffer_unit);

        let out_dir = args.get_one::<String>("out-dir")
            .map(PathBuf::from)
            .ok_or_else(|| ExportError::Parse("Missing --out-dir path".to_string()))?;

        let options = export_options_from(args)?;
        validate_options(&options)?;

        Ok(CsvCommand { service_url, csv_path, buffer, buffer_unit, out_dir, options, logger })
    }
}

impl<'a> Command for CsvCommand<'a> {
    fn execute(&self) -> ExportResult<()> {
        let api = CogFetch::new(None)?;
        let outputs = api.export_points_csv(
            &self.service_url, &self.csv_path, self.buffer, self.buffer_unit,
            &self.options, &self.out_dir)?;

        self.logger.log(&format!("CSV export complete: {} file(s)", outputs.len()))?;
        Ok(())
    }
}
