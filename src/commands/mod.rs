//! CLI command implementations
//!
//! This module contains implementations of the commands supported by the
//! CLI application using the Command pattern.

pub mod command_traits;
pub mod bbox_command;
pub mod csv_command;

pub use command_traits::{Command, CommandFactory};
pub use bbox_command::BboxCommand;
pub use csv_command::CsvCommand;

use clap::ArgMatches;

use crate::api::ExportOptions;
use crate::errors::{ExportError, ExportResult};
use crate::utils::logger::Logger;

/// Factory for creating command instances based on CLI arguments
///
/// Examines the invoked subcommand and creates the matching command
/// instance for execution.
pub struct CogFetchCommandFactory;

impl CogFetchCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        CogFetchCommandFactory
    }
}

impl Default for CogFetchCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CommandFactory<'a> for CogFetchCommandFactory {
    fn create_command(&self, args: &ArgMatches, logger: &'a Logger) -> ExportResult<Box<dyn Command + 'a>> {
        match args.subcommand() {
            Some(("bbox", sub_args)) => Ok(Box::new(BboxCommand::new(sub_args, logger)?)),
            Some(("csv", sub_args)) => Ok(Box::new(CsvCommand::new(sub_args, logger)?)),
            _ => Err(ExportError::Parse(
                "No mode given; expected 'bbox' or 'csv'".to_string())),
        }
    }
}

/// Parse the export options shared by every mode
pub(crate) fn export_options_from(args: &ArgMatches) -> ExportResult<ExportOptions> {
    let mut options = ExportOptions::default();

    if let Some(pixel_size) = args.get_one::<String>("pixel-size") {
        let size = pixel_size.parse::<f64>()
            .map_err(|_| ExportError::Parse(format!("Invalid pixel size: {}", pixel_size)))?;
        if size <= 0.0 {
            return Err(ExportError::Parse(format!(
                "Pixel size must be positive, got {}", size)));
        }
        options.pixel_size = Some(size);
    }

    if let Some(block_size) = args.get_one::<String>("blocksize") {
        options.block_size = block_size.parse::<u32>()
            .map_err(|_| ExportError::Parse(format!("Invalid block size: {}", block_size)))?;
    }

    if let Some(compression) = args.get_one::<String>("compress") {
        options.compression = compression.clone();
    }

    options.keep_fragments = args.get_flag("keep-fragments");
    options.token = args.get_one::<String>("token").cloned();

    Ok(options)
}
