use clap::{Arg, ArgAction, Command as ClapCommand};
use log::error;
use std::process;

use cogfetch::commands::{CogFetchCommandFactory, CommandFactory};
use cogfetch::utils::logger::Logger;

fn main() {
    let matches = ClapCommand::new("CogFetch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Export ArcGIS ImageServer imagery as Cloud Optimized GeoTIFFs")
        .subcommand_required(true)
        .arg(
            Arg::new("token")
                .long("token")
                .help("ArcGIS access token (if the service requires one)")
                .value_name("TOKEN")
                .global(true),
        )
        .arg(
            Arg::new("compress")
                .long("compress")
                .help("Output compression (NONE, DEFLATE, ZSTD)")
                .value_name("NAME")
                .global(true),
        )
        .arg(
            Arg::new("blocksize")
                .long("blocksize")
                .help("Internal tile size of the output raster (typ. 256 or 512)")
                .value_name("PIXELS")
                .global(true),
        )
        .arg(
            Arg::new("keep-fragments")
                .long("keep-fragments")
                .help("Keep intermediate tile files after the mosaic")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("pixel-size")
                .long("pixel-size")
                .help("Override the service pixel size (native units per pixel). \
                       If omitted, the service's published size is used, \
                       falling back to 0.333333 (4 inches in feet)")
                .value_name("SIZE")
                .global(true),
        )
        .subcommand(
            ClapCommand::new("bbox")
                .about("Export a single raster for a WGS84 bounding box")
                .arg(
                    Arg::new("service")
                        .long("service")
                        .help("ImageServer URL (ends with /ImageServer)")
                        .value_name("URL")
                        .required(true),
                )
                .arg(
                    Arg::new("bbox")
                        .long("bbox")
                        .help("WGS84 bounding box")
                        .num_args(4)
                        .value_names(["minLon", "minLat", "maxLon", "maxLat"])
                        .required(true),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .help("Output raster path")
                        .value_name("FILE")
                        .required(true),
                ),
        )
        .subcommand(
            ClapCommand::new("csv")
                .about("Export one raster per point in a CSV (buffered square area)")
                .arg(
                    Arg::new("service")
                        .long("service")
                        .help("ImageServer URL (ends with /ImageServer)")
                        .value_name("URL")
                        .required(true),
                )
                .arg(
                    Arg::new("csv")
                        .long("csv")
                        .help("CSV with columns: lon, lat[, id, name]")
                        .value_name("FILE")
                        .required(true),
                )
                .arg(
                    Arg::new("buffer")
                        .long("buffer")
                        .help("Half-size of the square buffer around each point")
                        .value_name("DISTANCE")
                        .required(true),
                )
                .arg(
                    Arg::new("buffer-unit")
                        .long("buffer-unit")
                        .help("Unit for --buffer (feet or meters)")
                        .value_name("UNIT")
                        .default_value("feet"),
                )
                .arg(
                    Arg::new("out-dir")
                        .long("out-dir")
                        .help("Output directory for the rasters")
                        .value_name("DIR")
                        .required(true),
                ),
        )
        .get_matches();

    let log_file = "cogfetch.log";
    let logger = match Logger::new(log_file) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error initializing logger: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = Logger::init_global_logger("cogfetch-global.log") {
        eprintln!("Error setting up global logger: {}", e);
        process::exit(1);
    }

    let factory = CogFetchCommandFactory::new();

    match factory.create_command(&matches, &logger) {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}
