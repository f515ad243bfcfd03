//! CSV point input and output naming
//!
//! The CSV mode exports one raster per point row. Rows carry a WGS84
//! coordinate plus optional identifier and name columns that feed the
//! output naming strategy.

mod naming;

pub use self::naming::NamingStrategy;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::coordinate::GeoPoint;
use crate::errors::{ExportError, ExportResult};

/// One row of the points CSV
#[derive(Debug, Clone)]
pub struct PointRecord {
    /// The point's WGS84 coordinates
    pub point: GeoPoint,
    /// All columns of the row, keyed by lowercased header name
    pub columns: HashMap<String, String>,
}

impl PointRecord {
    /// Look up a column value by case-insensitive name
    pub fn column(&self, name: &str) -> Option<&str> {
        self.columns.get(&name.to_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Read point records from a CSV file
///
/// The header row is matched case-insensitively; `lon` and `lat` columns
/// are required. Fields must not contain embedded commas.
pub fn read_points_csv(path: &Path) -> ExportResult<Vec<PointRecord>> {
    let content = fs::read_to_string(path)?;
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());

    let header_line = lines.next()
        .ok_or_else(|| ExportError::Parse(format!("CSV {} is empty", path.display())))?;
    let headers: Vec<String> = header_line.split(',')
        .map(|h| h.trim().to_lowercase())
        .collect();

    if !headers.iter().any(|h| h == "lon") || !headers.iter().any(|h| h == "lat") {
        return Err(ExportError::Parse(
            "CSV must have columns: lon, lat[, id, name]".to_string()));
    }

    let mut records = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let mut columns = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            let value = fields.get(i).copied().unwrap_or("");
            columns.insert(header.clone(), value.to_string());
        }

        let lon = parse_coord(&columns, "lon", line_no)?;
        let lat = parse_coord(&columns, "lat", line_no)?;

        records.push(PointRecord {
            point: GeoPoint::new(lon, lat),
            columns,
        });
    }

    Ok(records)
}

fn parse_coord(columns: &HashMap<String, String>, name: &str, line_no: usize) -> ExportResult<f64> {
    columns.get(name)
        .and_then(|v| v.parse::<f64>().ok())
        .ok_or_else(|| ExportError::Parse(format!(
            "Row {}: invalid or missing {} value", line_no + 2, name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_reads_rows_with_ids() {
        let file = write_csv(
            "school_id,name,lon,lat\n101,Lincoln HS,-112.072,33.4501\n102,Roosevelt ES,-112.068,33.4482\n");
        let records = read_points_csv(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].point.lon, -112.072);
        assert_eq!(records[0].column("school_id"), Some("101"));
        assert_eq!(records[1].column("name"), Some("Roosevelt ES"));
    }

    #[test]
    fn test_headers_case_insensitive() {
        let file = write_csv("Lon,LAT\n-112.0,33.4\n");
        let records = read_points_csv(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].point.lat, 33.4);
    }

    #[test]
    fn test_missing_lon_column_fails() {
        let file = write_csv("x,lat\n-112.0,33.4\n");
        assert!(read_points_csv(file.path()).is_err());
    }

    #[test]
    fn test_bad_coordinate_names_row() {
        let file = write_csv("lon,lat\n-112.0,33.4\nnot-a-number,33.5\n");
        let err = read_points_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("Row 3"));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let file = write_csv("lon,lat\n\n-112.0,33.4\n\n");
        let records = read_points_csv(file.path()).unwrap();
        assert_eq!(records.len(), 1);
    }
}
