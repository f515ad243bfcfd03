//! Coordinate Reference System handling
//!
//! Resolves well-known ids against the bundled EPSG database and exposes
//! the properties the export pipeline needs: the proj definition string,
//! whether the system is geographic, and the linear unit.

use crate::errors::{ExportError, ExportResult};

/// Meters per international foot
const FOOT_TO_METER: f64 = 0.3048;

/// Meters per US survey foot
const US_FOOT_TO_METER: f64 = 0.304_800_609_601_219_2;

/// A resolved coordinate reference system
#[derive(Debug, Clone, Copy)]
pub struct SpatialRef {
    /// EPSG well-known id
    pub wkid: u32,
    proj4: &'static str,
}

impl SpatialRef {
    /// Resolve a wkid against the EPSG database
    ///
    /// Fails with a configuration error when the code is unknown; an export
    /// cannot proceed without a usable reference system definition.
    pub fn from_wkid(wkid: u32) -> ExportResult<Self> {
        let code = u16::try_from(wkid).ok()
            .and_then(crs_definitions::from_code)
            .ok_or_else(|| ExportError::Configuration(format!(
                "Reference system wkid {} is not in the EPSG database", wkid)))?;

        Ok(SpatialRef { wkid, proj4: code.proj4 })
    }

    /// The proj definition string for this reference system
    pub fn proj_string(&self) -> &'static str {
        self.proj4
    }

    /// Whether this is a geographic (lon/lat) reference system
    pub fn is_geographic(&self) -> bool {
        self.proj4.contains("+proj=longlat")
    }

    /// Meters per native linear unit, when the definition exposes one
    ///
    /// Geographic systems have no linear unit and return `None`; callers
    /// needing a conversion then fall back to an assumed factor.
    pub fn meters_per_unit(&self) -> Option<f64> {
        if self.is_geographic() {
            return None;
        }

        if let Some(value) = proj_param(self.proj4, "+to_meter=") {
            return value.parse::<f64>().ok();
        }

        match proj_param(self.proj4, "+units=") {
            Some("m") => Some(1.0),
            Some("ft") => Some(FOOT_TO_METER),
            Some("us-ft") => Some(US_FOOT_TO_METER),
            _ => None,
        }
    }

    /// Human-readable name of the native linear unit
    pub fn unit_name(&self) -> &'static str {
        if self.is_geographic() {
            return "degree";
        }

        match proj_param(self.proj4, "+units=") {
            Some("m") => "metre",
            Some("ft") => "foot",
            Some("us-ft") => "US survey foot",
            _ => {
                if proj_param(self.proj4, "+to_meter=").is_some() {
                    "custom"
                } else {
                    "unknown"
                }
            }
        }
    }
}

/// Extract the value of a `+key=` parameter from a proj definition string
fn proj_param<'a>(proj4: &'a str, key: &str) -> Option<&'a str> {
    proj4.split_whitespace()
        .find_map(|token| token.strip_prefix(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84_is_geographic() {
        let crs = SpatialRef::from_wkid(4326).unwrap();
        assert!(crs.is_geographic());
        assert_eq!(crs.unit_name(), "degree");
        assert!(crs.meters_per_unit().is_none());
    }

    #[test]
    fn test_web_mercator_is_metric() {
        let crs = SpatialRef::from_wkid(3857).unwrap();
        assert!(!crs.is_geographic());
        assert_eq!(crs.meters_per_unit(), Some(1.0));
        assert_eq!(crs.unit_name(), "metre");
    }

    #[test]
    fn test_state_plane_feet() {
        // Arizona Central, international feet
        let crs = SpatialRef::from_wkid(2868).unwrap();
        assert!(!crs.is_geographic());
        let per_unit = crs.meters_per_unit().unwrap();
        assert!((per_unit - 0.3048).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_wkid_fails() {
        assert!(SpatialRef::from_wkid(999_999).is_err());
    }

    #[test]
    fn test_proj_param_extraction() {
        assert_eq!(proj_param("+proj=merc +units=m +no_defs", "+units="), Some("m"));
        assert_eq!(proj_param("+proj=merc +no_defs", "+units="), None);
    }
}
